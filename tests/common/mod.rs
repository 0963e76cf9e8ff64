//! Shared fakes and a tiny_http mock server for the integration tests
#![allow(dead_code)]

use shotvault::remote::{ArtifactStore, ImageFetcher, Notifier, ScreenshotService};
use shotvault::{ArtifactUrl, Error, ImageLocation, NormalizedUrl, Orchestrator, Result};
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use tiny_http::{Header, Response, Server};

pub const PNG_BYTES: [u8; 8] = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

/// Per-service call counters
#[derive(Clone, Default)]
pub struct Calls {
    pub screenshot: Arc<AtomicUsize>,
    pub download: Arc<AtomicUsize>,
    pub store: Arc<AtomicUsize>,
    pub notify: Arc<AtomicUsize>,
}

impl Calls {
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.screenshot.load(Ordering::SeqCst),
            self.download.load(Ordering::SeqCst),
            self.store.load(Ordering::SeqCst),
            self.notify.load(Ordering::SeqCst),
        )
    }
}

pub struct FakeShot {
    pub location: Option<&'static str>,
    pub calls: Arc<AtomicUsize>,
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl ScreenshotService for FakeShot {
    fn request_screenshot(&self, url: &NormalizedUrl) -> Result<ImageLocation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(url.as_str().to_string());
        self.location
            .map(ImageLocation::new)
            .ok_or_else(|| Error::ScreenshotGenerationFailed("no image location".into()))
    }
}

pub struct FakeFetch {
    pub status: u16,
    pub calls: Arc<AtomicUsize>,
}

impl ImageFetcher for FakeFetch {
    fn download_image(&self, _location: &ImageLocation) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if (200..300).contains(&self.status) {
            Ok(PNG_BYTES.to_vec())
        } else {
            Err(Error::ScreenshotDownloadFailed(format!("HTTP {}", self.status)))
        }
    }
}

pub struct FakeStore {
    pub url: Option<&'static str>,
    pub calls: Arc<AtomicUsize>,
    pub uploads: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ArtifactStore for FakeStore {
    fn store_artifact(&self, bytes: &[u8], _content_type: &str) -> Result<ArtifactUrl> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.uploads.lock().unwrap().push(bytes.to_vec());
        self.url
            .map(ArtifactUrl::new)
            .ok_or_else(|| Error::StorageFailed("quota exceeded".into()))
    }
}

pub struct FakeNotifier {
    pub fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl Notifier for FakeNotifier {
    fn notify(&self, _email: &str, _url: &NormalizedUrl, _artifact: &ArtifactUrl) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::NotificationFailed("HTTP 500".into()))
        } else {
            Ok(())
        }
    }
}

/// What each fake should do
pub struct Script {
    pub location: Option<&'static str>,
    pub download_status: u16,
    pub stored_url: Option<&'static str>,
    /// `None` means no notifier is wired up
    pub notify_fails: Option<bool>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            location: Some("https://img.example/1.png"),
            download_status: 200,
            stored_url: Some("https://blob.example/screenshots/123.png"),
            notify_fails: None,
        }
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub calls: Calls,
    pub seen_urls: Arc<Mutex<Vec<String>>>,
    pub uploads: Arc<Mutex<Vec<Vec<u8>>>>,
}

pub fn harness(script: Script) -> Harness {
    let calls = Calls::default();
    let seen_urls = Arc::new(Mutex::new(Vec::new()));
    let uploads = Arc::new(Mutex::new(Vec::new()));

    let mut orchestrator = Orchestrator::new(
        Box::new(FakeShot {
            location: script.location,
            calls: calls.screenshot.clone(),
            seen: seen_urls.clone(),
        }),
        Box::new(FakeFetch {
            status: script.download_status,
            calls: calls.download.clone(),
        }),
        Box::new(FakeStore {
            url: script.stored_url,
            calls: calls.store.clone(),
            uploads: uploads.clone(),
        }),
    );
    if let Some(fail) = script.notify_fails {
        orchestrator = orchestrator.with_notifier(Box::new(FakeNotifier {
            fail,
            calls: calls.notify.clone(),
        }));
    }

    Harness {
        orchestrator,
        calls,
        seen_urls,
        uploads,
    }
}

/// A request as seen by the mock server
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Canned {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    pub fn bytes(status: u16, body: &[u8]) -> Self {
        Self {
            status,
            content_type: "image/png",
            body: body.to_vec(),
        }
    }
}

/// Start a mock HTTP server on an ephemeral port.
///
/// Returns its base URL (`http://127.0.0.1:<port>`) and a receiver yielding
/// every request it served.
pub fn mock_server<F>(handler: F) -> (String, Receiver<Recorded>)
where
    F: Fn(&Recorded) -> Canned + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut body = Vec::new();
            let _ = request.as_reader().read_to_end(&mut body);
            let recorded = Recorded {
                method: request.method().as_str().to_string(),
                url: request.url().to_string(),
                headers: request
                    .headers()
                    .iter()
                    .map(|h| (h.field.to_string(), h.value.to_string()))
                    .collect(),
                body,
            };

            let canned = handler(&recorded);
            let _ = tx.send(recorded);
            let response = Response::from_data(canned.body)
                .with_status_code(canned.status)
                .with_header(
                    Header::from_bytes(&b"Content-Type"[..], canned.content_type.as_bytes())
                        .unwrap(),
                );
            let _ = request.respond(response);
        }
    });

    (format!("http://{}", addr), rx)
}
