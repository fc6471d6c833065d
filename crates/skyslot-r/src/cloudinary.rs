use crate::{check, request_error};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use skyslot_engine::config::{CloudinaryCredentials, SignatureAlgorithm};
use skyslot_engine::stores::{ArtifactStore, StoreError, UploadOptions, UploadedAsset};
use std::path::Path;
use tracing::debug;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Signed image uploads to Cloudinary.
pub struct CloudinaryStore {
    client: reqwest::Client,
    credentials: CloudinaryCredentials,
    algorithm: SignatureAlgorithm,
    base_url: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

impl CloudinaryStore {
    pub fn new(credentials: CloudinaryCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            algorithm: SignatureAlgorithm::default(),
            base_url: API_BASE.to_string(),
        }
    }

    /// Must match the account's signature setting; SHA-1 unless changed there.
    pub fn with_signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.base_url.trim_end_matches('/'),
            self.credentials.cloud_name
        )
    }
}

/// Parameters covered by the signature, sorted by name.
pub fn signed_params(options: &UploadOptions, timestamp: i64) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("public_id", options.public_id.clone()),
        ("timestamp", timestamp.to_string()),
    ];
    if options.overwrite {
        params.push(("overwrite", "true".to_string()));
    }
    if options.invalidate {
        params.push(("invalidate", "true".to_string()));
    }
    params.sort_by(|a, b| a.0.cmp(b.0));
    params
}

/// Hex digest of `k1=v1&k2=v2...` followed by the API secret.
pub fn sign(
    params: &[(&'static str, String)],
    api_secret: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    let to_sign = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    match algorithm {
        SignatureAlgorithm::Sha1 => digest::<Sha1>(&to_sign, api_secret),
        SignatureAlgorithm::Sha256 => digest::<Sha256>(&to_sign, api_secret),
    }
}

fn digest<D: Digest>(to_sign: &str, api_secret: &str) -> String {
    let mut hasher = D::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ArtifactStore for CloudinaryStore {
    async fn upload(
        &self,
        local_path: &Path,
        options: &UploadOptions,
    ) -> Result<UploadedAsset, StoreError> {
        let bytes = tokio::fs::read(local_path).await?;
        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture.png".to_string());

        let params = signed_params(options, chrono::Utc::now().timestamp());
        let signature = sign(&params, &self.credentials.api_secret, self.algorithm);

        let file = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/png")
            .map_err(request_error)?;
        let mut form = Form::new()
            .text("api_key", self.credentials.api_key.clone())
            .text("signature", signature)
            .part("file", file);
        for (key, value) in params {
            form = form.text(key, value);
        }
        if self.algorithm == SignatureAlgorithm::Sha256 {
            form = form.text("signature_algorithm", "sha256");
        }

        debug!("Uploading {} as {}", local_path.display(), options.public_id);
        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(request_error)?;
        let body: UploadResponse = check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        body.secure_url
            .or(body.url)
            .map(|url| UploadedAsset { url })
            .ok_or_else(|| StoreError::Decode("upload response has no url".into()))
    }
}
