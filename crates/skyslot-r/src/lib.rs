pub mod cloudinary;
pub mod notion;

pub use cloudinary::CloudinaryStore;
pub use notion::NotionStore;

use skyslot_engine::stores::StoreError;

/// Turn a non-2xx response into `StoreError::Rejected`, keeping the store's
/// own error message when it sends one.
pub(crate) async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// `{"message": ..}` (Notion) or `{"error": {"message": ..}}` (Cloudinary),
/// falling back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error").and_then(|e| e.get("message")))
        })
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

pub(crate) fn request_error(e: reqwest::Error) -> StoreError {
    StoreError::Request(e.to_string())
}
