pub mod config;
mod http;
pub mod minting;
pub mod providers;
pub mod storage;
#[cfg(test)]
mod testing;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use artmint_contracts::error::{Service, WorkflowError};
use artmint_contracts::events::{EventPayload, EventWriter};
use artmint_contracts::ipfs::{gateway_url, ipfs_path};
use artmint_contracts::mint::{AssetMetadata, MintForm, MintReceipt, MintRequest};
use artmint_contracts::session::{GeneratedImage, Session};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::config::EngineConfig;
use crate::http::error_summary;
use crate::minting::{DryrunMinter, MintProvider, NftPortProvider};
use crate::providers::{
    default_image_providers, extension_for_mime, DryrunProvider, ImageBytes, ImageProvider,
};
use crate::storage::{DryrunStorage, NftStorageProvider, StorageProvider};

const ERROR_MESSAGE_MAX_CHARS: usize = 1024;

/// Sequences generate -> upload -> mint over one [`Session`].
///
/// Every mutating call takes `&mut self`, so a second action cannot start
/// while one is in flight.
pub struct Workflow {
    session: Session,
    images: Box<dyn ImageProvider>,
    storage: Box<dyn StorageProvider>,
    minter: Box<dyn MintProvider>,
    preview_dir: PathBuf,
    events: Option<EventWriter>,
}

impl Workflow {
    pub fn new(
        preview_dir: impl Into<PathBuf>,
        images: Box<dyn ImageProvider>,
        storage: Box<dyn StorageProvider>,
        minter: Box<dyn MintProvider>,
    ) -> Self {
        Self {
            session: Session::new(),
            images,
            storage,
            minter,
            preview_dir: preview_dir.into(),
            events: None,
        }
    }

    /// Live storage and minting, with the named image provider.
    pub fn from_config(
        cfg: &EngineConfig,
        image_provider: &str,
        preview_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let mut registry = default_image_providers(cfg)?;
        let available = registry.names().join(", ");
        let Some(images) = registry.take(image_provider) else {
            bail!("unknown image provider '{image_provider}' (available: {available})");
        };
        Ok(Self::new(
            preview_dir,
            images,
            Box::new(NftStorageProvider::new(cfg)?),
            Box::new(NftPortProvider::new(cfg)?),
        ))
    }

    /// Fully offline workflow.
    pub fn dryrun(preview_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            preview_dir,
            Box::new(DryrunProvider),
            Box::new(DryrunStorage),
            Box::new(DryrunMinter),
        )
    }

    /// Record stage transitions to a JSONL file.
    pub fn with_events(mut self, path: impl Into<PathBuf>) -> Self {
        self.events = Some(EventWriter::new(path, self.session.id()));
        self.emit_session_started();
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn preview_dir(&self) -> &Path {
        &self.preview_dir
    }

    pub fn event_writer(&self) -> Option<EventWriter> {
        self.events.clone()
    }

    pub fn provider_names(&self) -> [&str; 3] {
        [self.images.name(), self.storage.name(), self.minter.name()]
    }

    pub fn set_name(&mut self, name: &str) {
        self.session.set_name(name.trim());
    }

    pub fn set_description(&mut self, description: &str) {
        self.session.set_description(description.trim());
    }

    pub fn set_recipient_address(&mut self, address: &str) {
        self.session.set_recipient_address(address.trim());
    }

    /// Generate an image from `prompt` and keep it as the session preview.
    pub fn generate_art(&mut self, prompt: &str) -> Result<GeneratedImage, WorkflowError> {
        let prompt = self.session.begin_generation(prompt).inspect_err(|err| {
            tracing::debug!(error = %err, "generation rejected");
        })?;
        let provider = self.images.name().to_string();
        tracing::info!(%provider, "generating image");
        self.emit(
            "generation_started",
            json!({ "prompt": prompt, "provider": provider }),
        );

        let started = Instant::now();
        let generated = match self.images.generate(&prompt) {
            Ok(image) if image.bytes.is_empty() => {
                Err(anyhow!("inference returned no image bytes"))
            }
            other => other,
        };
        let image = match generated {
            Ok(image) => image,
            Err(err) => {
                let message = error_summary(&err, ERROR_MESSAGE_MAX_CHARS);
                let err = WorkflowError::upstream(Service::Inference, message);
                return Err(self.abort_generation(err));
            }
        };
        let image = match self.write_preview(image) {
            Ok(image) => image,
            Err(err) => {
                let message = error_summary(&err, ERROR_MESSAGE_MAX_CHARS);
                return Err(self.abort_generation(WorkflowError::Preview { message }));
            }
        };

        self.session.finish_generation(image.clone())?;
        self.emit(
            "artifact_created",
            json!({
                "preview_path": image.preview_path.to_string_lossy(),
                "preview_url": image.preview_url,
                "mime_type": image.mime_type,
                "size": image.bytes.len(),
                "latency_s": started.elapsed().as_secs_f64(),
            }),
        );
        Ok(image)
    }

    fn abort_generation(&mut self, err: WorkflowError) -> WorkflowError {
        self.session.fail_generation();
        tracing::error!(provider = self.images.name(), error = %err, "image generation failed");
        self.emit("generation_failed", json!({ "error": err.to_string() }));
        err
    }

    /// Upload the current image and return its fetchable gateway URL.
    ///
    /// Failures are logged and reported as `None`; callers must treat that
    /// as a hard stop.
    pub fn upload_art_to_storage(&self) -> Option<String> {
        let Some(image) = self.session.image() else {
            tracing::error!("no generated image to upload");
            return None;
        };
        let provider = self.storage.name();
        tracing::info!(%provider, "uploading image");
        let stored = self
            .storage
            .store(&image.bytes, &image.mime_type, &AssetMetadata::default())
            .and_then(|uri| {
                match ipfs_path(&uri) {
                    Some(path) if path.trim_matches('/').is_empty() => {
                        bail!("storage returned an ipfs URI without a CID: {uri}");
                    }
                    Some(_) => {}
                    None => tracing::debug!(%uri, "storage returned a non-ipfs URI"),
                }
                let url = gateway_url(&uri);
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    bail!("storage returned a URI that is not fetchable: {uri}");
                }
                Ok((uri, url))
            });
        match stored {
            Ok((uri, url)) => {
                self.emit("upload_finished", json!({ "uri": uri, "file_url": url }));
                Some(url)
            }
            Err(err) => {
                let message = error_summary(&err, ERROR_MESSAGE_MAX_CHARS);
                tracing::error!(%provider, error = %message, "upload failed");
                self.emit("upload_failed", json!({ "error": message }));
                None
            }
        }
    }

    /// Upload the preview and mint it to `recipient_address`.
    pub fn mint_nft(
        &mut self,
        name: &str,
        description: &str,
        recipient_address: &str,
    ) -> Result<MintReceipt, WorkflowError> {
        let form = MintForm::new(name.trim(), description.trim(), recipient_address.trim());
        self.session.begin_minting(form).inspect_err(|err| {
            tracing::debug!(error = %err, "mint rejected");
        })?;
        self.emit(
            "mint_started",
            json!({
                "name": self.session.form().name,
                "mint_to_address": self.session.form().recipient_address,
            }),
        );

        let Some(file_url) = self.upload_art_to_storage() else {
            self.session.fail_minting();
            self.emit("mint_failed", json!({ "error": "upload failed" }));
            return Err(WorkflowError::UploadFailed);
        };

        let request = MintRequest::new(file_url, self.session.form());
        let provider = self.minter.name().to_string();
        tracing::info!(%provider, chain = %request.chain, "minting");
        match self.minter.mint(&request) {
            Ok(receipt) => {
                let image = self.session.finish_minting(receipt.clone())?;
                self.release_preview(&image);
                tracing::info!(
                    %provider,
                    transaction = receipt.transaction_hash.as_deref().unwrap_or("-"),
                    "minted"
                );
                self.emit(
                    "mint_finished",
                    json!({
                        "chain": receipt.chain,
                        "file_url": receipt.file_url,
                        "mint_to_address": receipt.mint_to_address,
                        "transaction_hash": receipt.transaction_hash,
                        "transaction_external_url": receipt.transaction_external_url,
                    }),
                );
                Ok(receipt)
            }
            Err(err) => {
                self.session.fail_minting();
                let message = error_summary(&err, ERROR_MESSAGE_MAX_CHARS);
                tracing::error!(%provider, error = %message, "mint failed");
                self.emit("mint_failed", json!({ "error": message }));
                Err(WorkflowError::upstream(Service::Minting, message))
            }
        }
    }

    /// Mint using the name, description and address already in the session.
    pub fn mint_current_form(&mut self) -> Result<MintReceipt, WorkflowError> {
        let form = self.session.form().clone();
        self.mint_nft(&form.name, &form.description, &form.recipient_address)
    }

    /// Drop the preview and prompt. A minted session stays minted.
    pub fn reset(&mut self) -> Result<(), WorkflowError> {
        if let Some(image) = self.session.reset()? {
            self.release_preview(&image);
        }
        self.emit("session_reset", json!({ "minted": self.session.minted() }));
        Ok(())
    }

    /// Throw the whole session away, including a finished mint.
    pub fn restart(&mut self) {
        if let Some(image) = self.session.image().cloned() {
            self.release_preview(&image);
        }
        self.session = Session::new();
        self.events = self
            .events
            .as_ref()
            .map(|events| events.for_session(self.session.id()));
        self.emit_session_started();
    }

    fn write_preview(&self, image: ImageBytes) -> Result<GeneratedImage> {
        fs::create_dir_all(&self.preview_dir)
            .with_context(|| format!("failed to create {}", self.preview_dir.display()))?;
        let mime_type = image
            .mime_type
            .unwrap_or_else(|| "image/png".to_string());
        let path = self.preview_dir.join(format!(
            "artifact-{}-{}.{}",
            timestamp_millis(),
            short_id(&image.bytes),
            extension_for_mime(Some(&mime_type))
        ));
        fs::write(&path, &image.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        let preview_path = path.canonicalize().unwrap_or(path);
        Ok(GeneratedImage {
            preview_url: format!("file://{}", preview_path.display()),
            preview_path,
            bytes: image.bytes,
            mime_type,
        })
    }

    fn release_preview(&self, image: &GeneratedImage) {
        if let Err(err) = fs::remove_file(&image.preview_path) {
            tracing::debug!(
                path = %image.preview_path.display(),
                error = %err,
                "preview already gone"
            );
        }
    }

    fn emit_session_started(&self) {
        let [image, storage, minter] = self.provider_names();
        self.emit(
            "session_started",
            json!({
                "image_provider": image,
                "storage_provider": storage,
                "mint_provider": minter,
                "preview_dir": self.preview_dir.to_string_lossy(),
            }),
        );
    }

    fn emit(&self, event_type: &str, payload: Value) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        if let Err(err) = events.emit(event_type, map_object(payload)) {
            tracing::warn!(event = event_type, error = %err, "failed to record event");
        }
    }
}

impl Drop for Workflow {
    /// The preview only lives as long as the workflow that made it.
    fn drop(&mut self) {
        if let Some(image) = self.session.image() {
            self.release_preview(image);
        }
    }
}

fn short_id(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}

fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn map_object(value: Value) -> EventPayload {
    value.as_object().cloned().unwrap_or_default()
}
