use anyhow::{bail, Context, Result};
use artmint_contracts::mint::AssetMetadata;
use reqwest::blocking::multipart::{Form as MultipartForm, Part as MultipartPart};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::config::{EngineConfig, Secret};
use crate::http::{build_client, read_json};
use crate::providers::extension_for_mime;

/// Content-addressed storage for generated images.
///
/// `store` returns the storage-native URI of the image (`ipfs://...`).
pub trait StorageProvider: Send + Sync {
    fn name(&self) -> &str;
    fn store(&self, bytes: &[u8], mime_type: &str, metadata: &AssetMetadata) -> Result<String>;
}

pub struct NftStorageProvider {
    api_base: String,
    token: Option<Secret>,
    http: HttpClient,
}

impl NftStorageProvider {
    pub fn new(cfg: &EngineConfig) -> Result<Self> {
        Ok(Self {
            api_base: cfg.storage.api_base.clone(),
            token: cfg.storage.credential.clone(),
            http: build_client(cfg.request_timeout)?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/store", self.api_base)
    }
}

impl StorageProvider for NftStorageProvider {
    fn name(&self) -> &str {
        "nft.storage"
    }

    fn store(&self, bytes: &[u8], mime_type: &str, metadata: &AssetMetadata) -> Result<String> {
        let Some(token) = self.token.as_ref() else {
            bail!("NFT_STORAGE_API_KEY not set");
        };
        let endpoint = self.endpoint();
        let file_name = format!("image.{}", extension_for_mime(Some(mime_type)));
        let meta = json!({
            "name": metadata.name,
            "description": metadata.description,
        });
        let image_part = MultipartPart::bytes(bytes.to_vec())
            .file_name(file_name)
            .mime_str(mime_type)
            .context("invalid image MIME type")?;
        let form = MultipartForm::new()
            .text("meta", meta.to_string())
            .part("image", image_part);
        tracing::debug!(%endpoint, size = bytes.len(), "uploading image");

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(token.expose())
            .multipart(form)
            .send()
            .with_context(|| format!("nft.storage request failed ({endpoint})"))?;
        let payload = read_json("nft.storage", response)?;
        parse_store_response(&payload)
    }
}

/// Pull the stored image URI out of a `/store` response.
///
/// The image may be reported as a plain string or as `{ "href": ... }`.
pub(crate) fn parse_store_response(payload: &Value) -> Result<String> {
    if payload.get("ok").and_then(Value::as_bool) == Some(false) {
        let message = payload
            .get("error")
            .and_then(|err| err.get("message").or(Some(err)))
            .map(|value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("nft.storage rejected upload: {message}");
    }
    let image = payload
        .get("value")
        .and_then(|value| value.get("data"))
        .and_then(|data| data.get("image"));
    let uri = match image {
        Some(Value::String(uri)) => Some(uri.as_str()),
        Some(Value::Object(obj)) => obj.get("href").and_then(Value::as_str),
        _ => None,
    }
    .map(str::trim)
    .filter(|uri| !uri.is_empty());
    match uri {
        Some(uri) => Ok(uri.to_string()),
        None => bail!("nft.storage response missing value.data.image"),
    }
}

/// Offline storage: derives a stable pseudo-CID from the image bytes.
pub struct DryrunStorage;

impl StorageProvider for DryrunStorage {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn store(&self, bytes: &[u8], mime_type: &str, _metadata: &AssetMetadata) -> Result<String> {
        if bytes.is_empty() {
            bail!("refusing to store an empty image");
        }
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let cid = hex::encode(hasher.finalize());
        Ok(format!(
            "ipfs://{cid}/image.{}",
            extension_for_mime(Some(mime_type))
        ))
    }
}
