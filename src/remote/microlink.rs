//! Microlink screenshot client.
//!
//! `GET {base}/?url=<target>&screenshot=true` renders the page and answers
//! with JSON pointing at the hosted image. The image location lives under
//! `data.screenshot.url`; some responses only carry the generic
//! `data.image.url`, which is used as a fallback.

use super::{snippet, ScreenshotService};
use crate::{Error, ImageLocation, NormalizedUrl, Result, ScreenshotConfig};
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct MicrolinkResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<MicrolinkData>,
}

#[derive(Debug, Default, Deserialize)]
struct MicrolinkData {
    #[serde(default)]
    screenshot: Option<Asset>,
    #[serde(default)]
    image: Option<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    #[serde(default)]
    url: Option<String>,
}

impl Asset {
    fn location(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Screenshot service backed by the Microlink API
pub struct MicrolinkClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MicrolinkClient {
    pub fn new(client: Client, config: &ScreenshotConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

/// Pull the image location out of a Microlink payload, preferring the
/// dedicated screenshot field over the generic image field.
#[cfg(test)]
fn extract_location(payload: &serde_json::Value) -> Option<ImageLocation> {
    let parsed: MicrolinkResponse = serde_json::from_value(payload.clone()).ok()?;
    location_of(&parsed)
}

fn location_of(response: &MicrolinkResponse) -> Option<ImageLocation> {
    let data = response.data.as_ref()?;
    data.screenshot
        .as_ref()
        .and_then(Asset::location)
        .or_else(|| data.image.as_ref().and_then(Asset::location))
        .map(ImageLocation::new)
}

impl ScreenshotService for MicrolinkClient {
    fn request_screenshot(&self, url: &NormalizedUrl) -> Result<ImageLocation> {
        let mut req = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("url", url.as_str()), ("screenshot", "true")]);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        let res = req
            .send()
            .map_err(|e| Error::ScreenshotGenerationFailed(format!("request failed: {}", e)))?;
        let status = res.status();
        let body = res
            .text()
            .map_err(|e| Error::ScreenshotGenerationFailed(format!("failed to read body: {}", e)))?;

        let parsed: MicrolinkResponse = serde_json::from_str(&body).map_err(|e| {
            Error::ScreenshotGenerationFailed(format!(
                "unexpected response ({}): {}: {}",
                status,
                e,
                snippet(&body)
            ))
        })?;

        if !status.is_success() {
            return Err(Error::ScreenshotGenerationFailed(format!(
                "HTTP {} ({}): {}",
                status.as_u16(),
                parsed.status.as_deref().unwrap_or("unknown"),
                parsed.message.as_deref().unwrap_or("no message")
            )));
        }

        let location = location_of(&parsed).ok_or_else(|| {
            Error::ScreenshotGenerationFailed("response carried no image location".into())
        })?;
        debug!("screenshot for {} at {}", url, location.as_str());
        Ok(location)
    }
}
