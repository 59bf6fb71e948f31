use anyhow::{bail, Context, Result};
use artmint_contracts::mint::{MintReceipt, MintRequest};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::{EngineConfig, Secret};
use crate::http::{build_client, read_json};

pub trait MintProvider: Send + Sync {
    fn name(&self) -> &str;
    fn mint(&self, request: &MintRequest) -> Result<MintReceipt>;
}

/// Gasless "easy mint" from a file URL.
pub struct NftPortProvider {
    api_base: String,
    api_key: Option<Secret>,
    http: HttpClient,
}

impl NftPortProvider {
    pub fn new(cfg: &EngineConfig) -> Result<Self> {
        Ok(Self {
            api_base: cfg.minting.api_base.clone(),
            api_key: cfg.minting.credential.clone(),
            http: build_client(cfg.request_timeout)?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v0/mints/easy/urls", self.api_base)
    }
}

impl MintProvider for NftPortProvider {
    fn name(&self) -> &str {
        "nftport"
    }

    fn mint(&self, request: &MintRequest) -> Result<MintReceipt> {
        let Some(api_key) = self.api_key.as_ref() else {
            bail!("NFTPORT_API_KEY not set");
        };
        if request.file_url.trim().is_empty() {
            bail!("refusing to mint without a file URL");
        }
        let endpoint = self.endpoint();
        tracing::debug!(%endpoint, chain = %request.chain, "submitting mint");

        // NFTPort takes the bare key, not a bearer token.
        let response = self
            .http
            .post(&endpoint)
            .header(AUTHORIZATION, api_key.expose())
            .json(request)
            .send()
            .with_context(|| format!("NFTPort request failed ({endpoint})"))?;
        let payload = read_json("NFTPort", response)?;
        parse_mint_response(&payload, request)
    }
}

pub(crate) fn parse_mint_response(payload: &Value, request: &MintRequest) -> Result<MintReceipt> {
    let status = payload
        .get("response")
        .and_then(Value::as_str)
        .map(|value| value.trim().to_ascii_uppercase())
        .unwrap_or_default();
    if status != "OK" {
        let reason = payload
            .get("error")
            .or_else(|| payload.get("message"))
            .map(|value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| payload.to_string());
        bail!("NFTPort mint was not accepted: {reason}");
    }
    let text = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    Ok(MintReceipt {
        chain: text("chain").unwrap_or_else(|| request.chain.clone()),
        file_url: text("file_url").unwrap_or_else(|| request.file_url.clone()),
        mint_to_address: text("mint_to_address")
            .unwrap_or_else(|| request.mint_to_address.clone()),
        transaction_hash: text("transaction_hash"),
        transaction_external_url: text("transaction_external_url"),
    })
}

/// Offline minter with a deterministic fake transaction hash.
pub struct DryrunMinter;

impl MintProvider for DryrunMinter {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn mint(&self, request: &MintRequest) -> Result<MintReceipt> {
        let mut hasher = Sha256::new();
        hasher.update(request.file_url.as_bytes());
        hasher.update(request.mint_to_address.as_bytes());
        Ok(MintReceipt {
            chain: request.chain.clone(),
            file_url: request.file_url.clone(),
            mint_to_address: request.mint_to_address.clone(),
            transaction_hash: Some(format!("0x{}", hex::encode(hasher.finalize()))),
            transaction_external_url: None,
        })
    }
}
