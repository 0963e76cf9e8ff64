//! Transactional email through the Resend API.

use super::{snippet, Notifier};
use crate::web::escape_html;
use crate::{ArtifactUrl, Error, NormalizedUrl, NotifyConfig, Result};
use log::debug;
use reqwest::blocking::Client;
use serde::Serialize;

const SUBJECT: &str = "Dein Screenshot ist gespeichert";

#[derive(Debug, Serialize)]
struct SendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

/// Sends one email per successful capture
pub struct ResendNotifier {
    client: Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl ResendNotifier {
    pub fn new(client: Client, config: &NotifyConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        }
    }
}

/// HTML body of the notification email.
pub fn render_body(url: &NormalizedUrl, artifact: &ArtifactUrl) -> String {
    let artifact = escape_html(artifact.as_str());
    format!(
        "<p>Screenshot von <strong>{}</strong> wurde gespeichert.</p>\
         <p><a href=\"{}\">Screenshot ansehen</a></p>",
        escape_html(url.as_str()),
        artifact
    )
}

impl Notifier for ResendNotifier {
    fn notify(&self, email: &str, url: &NormalizedUrl, artifact: &ArtifactUrl) -> Result<()> {
        let payload = SendEmail {
            from: &self.from,
            to: [email],
            subject: SUBJECT,
            html: render_body(url, artifact),
        };

        let res = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .map_err(|e| Error::NotificationFailed(format!("request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            return Err(Error::NotificationFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                snippet(&body)
            )));
        }
        debug!("notification sent to {}", email);
        Ok(())
    }
}
