//! Plain HTTP GET of the rendered image.

use super::ImageFetcher;
use crate::{Error, ImageLocation, Result};
use log::debug;
use reqwest::blocking::Client;

/// Downloads images with a single GET; bytes are passed through untouched.
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn download_image(&self, location: &ImageLocation) -> Result<Vec<u8>> {
        let res = self
            .client
            .get(location.as_str())
            .send()
            .map_err(|e| Error::ScreenshotDownloadFailed(format!("HTTP GET failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::ScreenshotDownloadFailed(format!(
                "HTTP {} for {}",
                status.as_u16(),
                location.as_str()
            )));
        }

        let bytes = res.bytes().map_err(|e| {
            Error::ScreenshotDownloadFailed(format!("Failed to read response body: {}", e))
        })?;
        debug!("downloaded {} bytes from {}", bytes.len(), location.as_str());
        Ok(bytes.to_vec())
    }
}
