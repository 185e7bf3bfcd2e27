//! QR encoder backed by a remote HTTP service.
//!
//! Speaks the `create-qr-code` query API (`?data=..&size=WxH&margin=N`) and
//! embeds the returned PNG as a data URI.

use std::time::Duration;

use async_trait::async_trait;
use layout_core::qr::{png_data_uri, QrEncoder};
use layout_core::{LayoutError, LayoutResult};
use reqwest::Client;
use thiserror::Error;
use url::Url;

/// Public `create-qr-code` service, usable as `--qr-service-url`.
///
/// Without that flag the server renders QR codes locally.
pub const DEFAULT_QR_SERVICE_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";

const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

/// Errors configuring the remote encoder.
#[derive(Debug, Error)]
pub enum RemoteQrError {
    /// The service URL is invalid.
    #[error("invalid QR service URL: {0}")]
    InvalidUrl(String),
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// [`QrEncoder`] calling a remote `create-qr-code` endpoint.
#[derive(Debug, Clone)]
pub struct HttpQrEncoder {
    http: Client,
    endpoint: Url,
    size: u32,
    margin: u32,
}

impl HttpQrEncoder {
    /// Create an encoder for `base_url` with a 200px image and 10px margin.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteQrError::InvalidUrl`] if the URL is malformed.
    /// Returns [`RemoteQrError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, RemoteQrError> {
        let endpoint =
            Url::parse(base_url.as_ref()).map_err(|e| RemoteQrError::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .user_agent(concat!("layout-forge/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            size: 200,
            margin: 10,
        })
    }

    /// Set the requested image side in pixels.
    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// The request URL for `text`.
    #[must_use]
    pub fn request_url(&self, text: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("data", text)
            .append_pair("size", &format!("{0}x{0}", self.size))
            .append_pair("margin", &self.margin.to_string());
        url
    }
}

#[async_trait]
impl QrEncoder for HttpQrEncoder {
    async fn encode(&self, text: &str) -> LayoutResult<String> {
        if text.is_empty() {
            return Err(LayoutError::QrEncode("nothing to encode".to_string()));
        }

        let response = self
            .http
            .get(self.request_url(text))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| LayoutError::QrEncode(format!("QR service request failed: {e}")))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| LayoutError::QrEncode(format!("QR service response unreadable: {e}")))?;

        if !body.starts_with(&PNG_MAGIC) {
            return Err(LayoutError::QrEncode(
                "QR service did not return a PNG image".to_string(),
            ));
        }

        tracing::debug!("Remote QR code generated ({} bytes)", body.len());
        Ok(png_data_uri(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_encodes_query() {
        let encoder = HttpQrEncoder::new(DEFAULT_QR_SERVICE_URL).expect("encoder");
        let url = encoder.request_url("Chassi: 9BW&Z");

        assert_eq!(url.path(), "/v1/create-qr-code/");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            [
                ("data".to_string(), "Chassi: 9BW&Z".to_string()),
                ("size".to_string(), "200x200".to_string()),
                ("margin".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_with_size() {
        let encoder = HttpQrEncoder::new("http://localhost:1/qr")
            .expect("encoder")
            .with_size(300);
        assert!(encoder.request_url("x").as_str().contains("size=300x300"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            HttpQrEncoder::new("not a url"),
            Err(RemoteQrError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_request() {
        let encoder = HttpQrEncoder::new("http://127.0.0.1:1/qr").expect("encoder");
        assert!(matches!(
            encoder.encode("").await,
            Err(LayoutError::QrEncode(_))
        ));
    }
}
