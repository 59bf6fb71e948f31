use std::collections::BTreeMap;
use std::io::Cursor;

use anyhow::{bail, Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::ACCEPT;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::config::{EngineConfig, Secret};
use crate::http::{build_client, content_type, ensure_success, excerpt};

const DRYRUN_IMAGE_SIZE: u32 = 512;

/// Raw bytes returned by an inference service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, prompt: &str) -> Result<ImageBytes>;
}

#[derive(Default)]
pub struct ImageProviderRegistry {
    providers: BTreeMap<String, Box<dyn ImageProvider>>,
}

impl ImageProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: ImageProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Box::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ImageProvider> {
        self.providers.get(name).map(|provider| provider.as_ref())
    }

    /// Remove and return a provider so it can be owned by a workflow.
    pub fn take(&mut self, name: &str) -> Option<Box<dyn ImageProvider>> {
        self.providers.remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

pub fn default_image_providers(cfg: &EngineConfig) -> Result<ImageProviderRegistry> {
    let mut providers = ImageProviderRegistry::new();
    providers.register(DryrunProvider);
    providers.register(HuggingFaceProvider::new(cfg)?);
    Ok(providers)
}

/// Offline provider: a solid-colour PNG derived from the prompt.
pub struct DryrunProvider;

impl ImageProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, prompt: &str) -> Result<ImageBytes> {
        let (r, g, b) = color_from_prompt(prompt);
        let mut image = RgbImage::new(DRYRUN_IMAGE_SIZE, DRYRUN_IMAGE_SIZE);
        for pixel in image.pixels_mut() {
            *pixel = Rgb([r, g, b]);
        }
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .context("failed to encode dryrun image")?;
        Ok(ImageBytes {
            bytes: bytes.into_inner(),
            mime_type: Some("image/png".to_string()),
        })
    }
}

pub struct HuggingFaceProvider {
    api_base: String,
    model: String,
    token: Option<Secret>,
    http: HttpClient,
}

impl HuggingFaceProvider {
    pub fn new(cfg: &EngineConfig) -> Result<Self> {
        Ok(Self {
            api_base: cfg.inference.api_base.clone(),
            model: cfg.inference_model.clone(),
            token: cfg.inference.credential.clone(),
            http: build_client(cfg.request_timeout)?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.api_base, self.model)
    }
}

impl ImageProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn generate(&self, prompt: &str) -> Result<ImageBytes> {
        let Some(token) = self.token.as_ref() else {
            bail!("HUGGING_FACE_API_TOKEN not set");
        };
        let endpoint = self.endpoint();
        tracing::debug!(%endpoint, model = %self.model, "requesting image");

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(token.expose())
            .header(ACCEPT, "image/png")
            .json(&json!({ "inputs": prompt }))
            .send()
            .with_context(|| format!("Hugging Face request failed ({endpoint})"))?;
        let response = ensure_success("Hugging Face", response)?;

        let mime_type = content_type(&response);
        if !mime_type.is_empty() && !mime_type.starts_with("image/") {
            let body = response.text().unwrap_or_default();
            bail!(
                "Hugging Face returned {mime_type} instead of an image: {}",
                excerpt(&body, 512)
            );
        }
        let bytes = response
            .bytes()
            .context("failed reading Hugging Face image bytes")?
            .to_vec();
        if bytes.is_empty() {
            bail!("Hugging Face returned an empty image body");
        }
        Ok(ImageBytes {
            bytes,
            mime_type: (!mime_type.is_empty()).then_some(mime_type),
        })
    }
}

fn color_from_prompt(prompt: &str) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

pub(crate) fn extension_for_mime(mime: Option<&str>) -> &'static str {
    match mime.map(|value| value.split(';').next().unwrap_or("").trim()) {
        Some("image/jpeg") | Some("image/jpg") => "jpg",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        _ => "png",
    }
}
