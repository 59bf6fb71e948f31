//! Environment configuration for the three external services.
//!
//! Credentials only ever live inside [`Secret`], whose `Debug` and `Display`
//! never print the value.

use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_HUGGING_FACE_API_BASE: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_HUGGING_FACE_MODEL: &str = "runwayml/stable-diffusion-v1-5";
pub const DEFAULT_NFT_STORAGE_API_BASE: &str = "https://api.nft.storage";
pub const DEFAULT_NFTPORT_API_BASE: &str = "https://api.nftport.xyz";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub api_base: String,
    pub credential: Option<Secret>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub inference: ServiceConfig,
    pub inference_model: String,
    pub storage: ServiceConfig,
    pub minting: ServiceConfig,
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let base = |key: &str, default: &str| {
            get(key)
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| default.to_string())
        };

        let request_timeout = get("ARTMINT_REQUEST_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Self {
            inference: ServiceConfig {
                api_base: base("HUGGING_FACE_API_BASE", DEFAULT_HUGGING_FACE_API_BASE),
                credential: get("HUGGING_FACE_API_TOKEN")
                    .or_else(|| get("HF_TOKEN"))
                    .map(Secret::new),
            },
            inference_model: get("HUGGING_FACE_MODEL")
                .map(|value| value.trim_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_HUGGING_FACE_MODEL.to_string()),
            storage: ServiceConfig {
                api_base: base("NFT_STORAGE_API_BASE", DEFAULT_NFT_STORAGE_API_BASE),
                credential: get("NFT_STORAGE_API_KEY").map(Secret::new),
            },
            minting: ServiceConfig {
                api_base: base("NFTPORT_API_BASE", DEFAULT_NFTPORT_API_BASE),
                credential: get("NFTPORT_API_KEY").map(Secret::new),
            },
            request_timeout: Duration::from_secs(request_timeout),
        }
    }

    /// Names of credentials that are not configured.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.inference.credential.is_none() {
            missing.push("HUGGING_FACE_API_TOKEN");
        }
        if self.storage.credential.is_none() {
            missing.push("NFT_STORAGE_API_KEY");
        }
        if self.minting.credential.is_none() {
            missing.push("NFTPORT_API_KEY");
        }
        missing
    }
}
