use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use shotvault::web::{WebApp, WebServer};
use shotvault::{
    CaptureConfig, NotifyConfig, PreferenceStore, Preferences, ScreenshotConfig, StorageConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "shotvault",
    about = "Web form that screenshots a URL, stores the image and remembers the last input"
)]
struct Cli {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "SHOTVAULT_BIND", default_value = "127.0.0.1:3000")]
    bind: String,

    /// Base URL of the Microlink API.
    #[arg(long, env = "MICROLINK_BASE_URL", default_value = "https://api.microlink.io")]
    microlink_base_url: String,

    /// Optional Microlink pro key.
    #[arg(long, env = "MICROLINK_API_KEY")]
    microlink_api_key: Option<String>,

    /// Base URL of the blob store.
    #[arg(long, env = "BLOB_BASE_URL", default_value = "https://blob.vercel-storage.com")]
    blob_base_url: String,

    /// Read/write token for the blob store.
    #[arg(long, env = "BLOB_READ_WRITE_TOKEN", hide_env_values = true)]
    blob_token: String,

    /// Base URL of the Resend API.
    #[arg(long, env = "RESEND_BASE_URL", default_value = "https://api.resend.com")]
    resend_base_url: String,

    /// Resend API key; without it no notification emails are sent.
    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    resend_api_key: Option<String>,

    /// Sender used for notification emails.
    #[arg(
        long,
        env = "SHOTVAULT_NOTIFY_FROM",
        default_value = "Screenshots <onboarding@resend.dev>"
    )]
    notify_from: String,

    /// Seconds before any remote call times out.
    #[arg(long, env = "SHOTVAULT_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Email prefilled when nothing has been remembered yet.
    #[arg(long, env = "SHOTVAULT_DEFAULT_EMAIL", default_value = "")]
    default_email: String,

    /// URL prefilled when nothing has been remembered yet.
    #[arg(long, env = "SHOTVAULT_DEFAULT_URL", default_value = "https://example.com/")]
    default_url: String,

    /// Request handler threads (defaults to the number of CPUs).
    #[arg(long, env = "SHOTVAULT_WORKERS")]
    workers: Option<usize>,

    /// Log filter, e.g. `info` or `shotvault=debug`.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log: String,
}

impl Cli {
    fn capture_config(&self) -> CaptureConfig {
        let notify = self
            .resend_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|key| NotifyConfig {
                base_url: self.resend_base_url.clone(),
                api_key: key.to_string(),
                from: self.notify_from.clone(),
            });

        CaptureConfig {
            timeout_ms: self.timeout_secs.saturating_mul(1000),
            screenshot: ScreenshotConfig {
                base_url: self.microlink_base_url.clone(),
                api_key: self.microlink_api_key.clone(),
            },
            storage: StorageConfig {
                base_url: self.blob_base_url.clone(),
                token: self.blob_token.clone(),
                ..Default::default()
            },
            notify,
            defaults: Preferences {
                email: self.default_email.clone(),
                url: self.default_url.clone(),
            },
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new().parse_filters(&cli.log).init();

    let config = cli.capture_config();
    let orchestrator =
        shotvault::new_orchestrator(&config).context("failed to set up capture pipeline")?;
    if !orchestrator.notifies() {
        info!("RESEND_API_KEY not set; notification emails disabled");
    }

    let app = WebApp::new(
        Arc::new(orchestrator),
        PreferenceStore::new(config.defaults.clone()),
    );
    let server = WebServer::bind(&cli.bind, app).context("failed to start HTTP server")?;
    server.serve(cli.workers.unwrap_or_else(num_cpus::get));
    Ok(())
}
