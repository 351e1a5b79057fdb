//! Client for the external image-hosting service.
//!
//! Report screenshots are forwarded to a third-party image host (an
//! Imgur-style API) rather than the local blob store. The client id is
//! supplied through configuration; when it is absent the feature is
//! disabled and uploads fail with a clear error instead of a hard-coded
//! key ever shipping in the binary.

use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct ImageHost {
    client: reqwest::Client,
    url: String,
    client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    link: String,
}

impl ImageHost {
    pub fn new(url: String, client_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            client_id,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some()
    }

    /// Upload a base64-encoded image, returning its public link.
    pub async fn upload_base64(&self, image: &str) -> Result<String, ApiError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| ApiError::ImageHost("image host not configured".to_string()))?;

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Client-ID {client_id}"))
            .json(&serde_json::json!({
                "image": image,
                "type": "base64",
            }))
            .send()
            .await
            .map_err(|e| ApiError::ImageHost(format!("upload failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ApiError::ImageHost(format!(
                "upload rejected with status {}",
                response.status()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ImageHost(format!("unexpected response: {e}")))?;

        tracing::debug!(link = %body.data.link, "image uploaded to external host");
        Ok(body.data.link)
    }
}
