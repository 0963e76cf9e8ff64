//! HTTP front end.
//!
//! Routes:
//! - `GET /` renders the form, prefilled from cookies or configured defaults
//! - `POST /` runs a capture from the form fields and re-renders the page
//! - `POST /api/capture` runs a capture and answers with JSON
//! - `GET /healthz` answers `ok`
//!
//! Request handling is split from the socket: [`WebApp::handle`] maps a
//! plain request description to a [`Reply`], and [`WebServer`] feeds it from
//! a `tiny_http` server with a fixed pool of worker threads.

use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::prefs::PreferenceStore;
use crate::{
    CaptureResult, Error, ErrorKind, NotificationOutcome, Orchestrator, Preferences, Result,
    Submission, SubmissionInput,
};
use log::{info, warn};
use serde::Serialize;
use tiny_http::{Header, Request, Response, Server};
use url::form_urlencoded;

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A response ready to be written to the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub set_cookies: Vec<String>,
}

impl Reply {
    fn new(status: u16, content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
            set_cookies: Vec::new(),
        }
    }
}

/// The parts of an incoming request the app looks at
#[derive(Debug, Clone, Copy)]
pub struct IncomingRequest<'a> {
    pub method: &'a str,
    /// Request target; any query string is ignored
    pub path: &'a str,
    pub content_type: Option<&'a str>,
    pub cookie: Option<&'a str>,
    pub body: &'a [u8],
}

#[derive(Serialize)]
struct ApiResponse<'a> {
    #[serde(flatten)]
    result: &'a CaptureResult,
    notification: &'a NotificationOutcome,
}

/// Request handling, independent of the transport
pub struct WebApp {
    orchestrator: Arc<Orchestrator>,
    prefs: PreferenceStore,
}

impl WebApp {
    pub fn new(orchestrator: Arc<Orchestrator>, prefs: PreferenceStore) -> Self {
        Self { orchestrator, prefs }
    }

    pub fn handle(&self, req: &IncomingRequest<'_>) -> Reply {
        let path = req.path.split('?').next().unwrap_or_default();
        match (req.method, path) {
            ("GET", "/") | ("HEAD", "/") => {
                let seed = self.prefs.seed(req.cookie);
                Reply::new(200, HTML, self.render_page(&seed, None))
            }
            ("POST", "/") => self.capture_form(req),
            ("POST", "/api/capture") => self.capture_api(req),
            ("GET", "/healthz") => Reply::new(200, TEXT, "ok"),
            (_, "/") | (_, "/api/capture") | (_, "/healthz") => {
                Reply::new(405, TEXT, "method not allowed")
            }
            _ => Reply::new(404, TEXT, "not found"),
        }
    }

    fn capture_form(&self, req: &IncomingRequest<'_>) -> Reply {
        let input = parse_form(req.body);
        let submission = self.orchestrator.submit(&input);

        // Failed runs keep what was typed in the form
        let shown = submission.preferences.clone().unwrap_or(Preferences {
            email: input.email.trim().to_string(),
            url: input.url.trim().to_string(),
        });
        let mut reply = Reply::new(200, HTML, self.render_page(&shown, Some(&submission)));
        reply.set_cookies = self.cookies_for(&submission);
        reply
    }

    fn capture_api(&self, req: &IncomingRequest<'_>) -> Reply {
        let is_json = req
            .content_type
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with(JSON))
            .unwrap_or(false);
        let input = if is_json {
            match serde_json::from_slice::<SubmissionInput>(req.body) {
                Ok(input) => input,
                Err(e) => {
                    warn!("rejecting malformed JSON body: {}", e);
                    let result = CaptureResult::failure(ErrorKind::UnexpectedError);
                    return json_reply(400, &result, &NotificationOutcome::Skipped);
                }
            }
        } else {
            parse_form(req.body)
        };

        let submission = self.orchestrator.submit(&input);
        let status = match submission.result.error_kind {
            None => 200,
            Some(kind) if kind.is_validation() => 422,
            Some(ErrorKind::UnexpectedError) => 500,
            Some(_) => 502,
        };
        let mut reply = json_reply(status, &submission.result, &submission.notification);
        reply.set_cookies = self.cookies_for(&submission);
        reply
    }

    fn cookies_for(&self, submission: &Submission) -> Vec<String> {
        submission
            .preferences
            .as_ref()
            .map(|p| self.prefs.set_cookie_headers(p))
            .unwrap_or_default()
    }

    fn render_page(&self, form: &Preferences, submission: Option<&Submission>) -> String {
        let result = submission.map(|s| &s.result);
        let mut feedback = String::new();

        if let Some(error) = result.and_then(|r| r.error.as_deref()) {
            feedback.push_str(&format!(
                "<p class=\"error\">&#9888;&#65039; {}</p>",
                escape_html(error)
            ));
        }
        if let Some(artifact) = result.and_then(|r| r.artifact_url.as_deref()) {
            let artifact = escape_html(artifact);
            feedback.push_str(&format!(
                "<section class=\"result\">\n\
                 <h2>Gespeichertes Bild</h2>\n\
                 <a href=\"{0}\" target=\"_blank\" rel=\"noreferrer\">In neuem Tab öffnen</a>\n\
                 <div class=\"frame\"><img src=\"{0}\" alt=\"Website Screenshot\"></div>\n\
                 </section>",
                artifact
            ));
        }
        match submission.map(|s| &s.notification) {
            Some(NotificationOutcome::Sent) => feedback.push_str(&format!(
                "<p class=\"note\">Benachrichtigung an {} gesendet.</p>",
                escape_html(&form.email)
            )),
            Some(NotificationOutcome::Failed { .. }) => feedback.push_str(
                "<p class=\"note\">Benachrichtigung konnte nicht gesendet werden.</p>",
            ),
            _ => {}
        }

        let used_email = result
            .and_then(|r| r.used_email.as_deref())
            .unwrap_or(form.email.as_str());
        let used_url = result
            .and_then(|r| r.used_url.as_deref())
            .unwrap_or(form.url.as_str());

        format!(
            r#"<!DOCTYPE html>
<html lang="de">
<head>
<meta charset="utf-8">
<title>URL Screenshot</title>
<meta name="description" content="Screenshot erstellen, speichern und direkt anzeigen.">
<style>
main {{ max-width: 720px; margin: 40px auto; padding: 0 16px; font-family: ui-sans-serif, system-ui; }}
form {{ display: grid; gap: 12px; }}
label {{ display: grid; gap: 6px; font-weight: 600; }}
input {{ padding: 10px 12px; border-radius: 8px; border: 1px solid #ccc; }}
button {{ padding: 12px 16px; border-radius: 10px; border: 1px solid #111; background: #111; color: white; font-weight: 600; width: fit-content; }}
.error {{ color: #b00020; margin-top: 16px; }}
.frame {{ border: 1px solid #eee; border-radius: 12px; overflow: hidden; }}
.frame img {{ display: block; width: 100%; height: auto; }}
footer {{ margin-top: 40px; font-size: 12px; color: #777; }}
</style>
</head>
<body>
<main>
<h1>URL Screenshot</h1>
<p>Gib eine E-Mail &amp; eine Website-URL ein. Wir erstellen einen Screenshot, speichern ihn und zeigen ihn hier an.</p>
<form method="post" action="/" data-prefs>
<label>E-Mail <input type="email" name="email" value="{email}" placeholder="E-Mail eingeben" required></label>
<label>URL <input type="url" name="url" value="{url}" placeholder="https://..." required></label>
<button type="submit">Screenshot erstellen &amp; speichern</button>
</form>
{feedback}
<footer>
<div>Letzte verwendete E-Mail: <strong>{used_email}</strong></div>
<div>Letzte verwendete URL: <strong>{used_url}</strong></div>
</footer>
</main>
<script>
{script}
</script>
</body>
</html>
"#,
            email = escape_html(&form.email),
            url = escape_html(&form.url),
            feedback = feedback,
            used_email = escape_html(used_email),
            used_url = escape_html(used_url),
            script = self.prefs.client_script(),
        )
    }
}

fn json_reply(status: u16, result: &CaptureResult, notification: &NotificationOutcome) -> Reply {
    let body = serde_json::to_string(&ApiResponse {
        result,
        notification,
    })
    .unwrap_or_else(|_| r#"{"ok":false,"error":"Unerwarteter Fehler."}"#.to_string());
    Reply::new(status, JSON, body)
}

/// Read `email` and `url` from an `application/x-www-form-urlencoded` body.
pub fn parse_form(body: &[u8]) -> SubmissionInput {
    let mut input = SubmissionInput::default();
    for (key, value) in form_urlencoded::parse(body) {
        match key.as_ref() {
            "email" => input.email = value.into_owned(),
            "url" => input.url = value.into_owned(),
            _ => {}
        }
    }
    input
}

/// A bound `tiny_http` server driving a [`WebApp`]
pub struct WebServer {
    server: Arc<Server>,
    app: Arc<WebApp>,
    workers: AtomicUsize,
}

impl WebServer {
    pub fn bind(addr: &str, app: WebApp) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| Error::ConfigError(format!("Failed to bind {}: {}", addr, e)))?;
        Ok(Self {
            server: Arc::new(server),
            app: Arc::new(app),
            workers: AtomicUsize::new(0),
        })
    }

    /// Address the server is listening on, e.g. `127.0.0.1:3000`
    pub fn addr(&self) -> String {
        self.server.server_addr().to_string()
    }

    /// Start `workers` threads that pull requests off the shared listener.
    pub fn spawn(&self, workers: usize) -> Vec<thread::JoinHandle<()>> {
        let workers = workers.max(1);
        self.workers.fetch_add(workers, Ordering::SeqCst);
        (0..workers)
            .map(|_| {
                let server = self.server.clone();
                let app = self.app.clone();
                thread::spawn(move || {
                    for request in server.incoming_requests() {
                        respond(&app, request);
                    }
                })
            })
            .collect()
    }

    /// Serve until the listener shuts down.
    pub fn serve(&self, workers: usize) {
        info!("listening on http://{} with {} workers", self.addr(), workers.max(1));
        for handle in self.spawn(workers) {
            let _ = handle.join();
        }
    }

    /// Make blocked workers return so [`WebServer::serve`] can finish.
    ///
    /// Each `unblock` releases exactly one worker, so one is queued per
    /// spawned thread.
    pub fn shutdown(&self) {
        let workers = self.workers.swap(0, Ordering::SeqCst);
        for _ in 0..workers {
            self.server.unblock();
        }
    }
}

fn header_value<'r>(request: &'r Request, name: &'static str) -> Option<&'r str> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str())
}

fn respond(app: &WebApp, mut request: Request) {
    let mut body = Vec::new();
    let read = request
        .as_reader()
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut body);
    let too_large = match read {
        Ok(n) => n > MAX_BODY_BYTES,
        Err(e) => {
            warn!("failed to read request body: {}", e);
            let _ = request.respond(Response::from_string("bad request").with_status_code(400u16));
            return;
        }
    };

    let method = request.method().as_str().to_string();
    let path = request.url().to_string();
    let reply = if too_large {
        Reply::new(413, TEXT, "payload too large")
    } else {
        app.handle(&IncomingRequest {
            method: &method,
            path: &path,
            content_type: header_value(&request, "Content-Type"),
            cookie: header_value(&request, "Cookie"),
            body: &body,
        })
    };
    info!("{} {} -> {}", method, path, reply.status);

    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(h) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(h);
    }
    for cookie in &reply.set_cookies {
        if let Ok(h) = Header::from_bytes(&b"Set-Cookie"[..], cookie.as_bytes()) {
            response = response.with_header(h);
        }
    }
    if let Err(e) = request.respond(response) {
        warn!("failed to write response: {}", e);
    }
}
