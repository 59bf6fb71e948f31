use serde::{Deserialize, Serialize};

pub const MINT_CHAIN: &str = "polygon";

/// Static metadata attached to every storage upload.
pub const STORAGE_ASSET_NAME: &str = "AI NFT";
pub const STORAGE_ASSET_DESCRIPTION: &str = "AI generated NFT";

/// Body of an easy-mint call. Built at mint time, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    pub file_url: String,
    pub chain: String,
    pub name: String,
    pub description: String,
    pub mint_to_address: String,
}

impl MintRequest {
    pub fn new(file_url: impl Into<String>, form: &MintForm) -> Self {
        Self {
            file_url: file_url.into(),
            chain: MINT_CHAIN.to_string(),
            name: form.name.clone(),
            description: form.description.clone(),
            mint_to_address: form.recipient_address.clone(),
        }
    }
}

/// User-entered fields for a mint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintForm {
    pub name: String,
    pub description: String,
    pub recipient_address: String,
}

impl MintForm {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        recipient_address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            recipient_address: recipient_address.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    pub chain: String,
    pub file_url: String,
    pub mint_to_address: String,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub transaction_external_url: Option<String>,
}

/// Metadata sent alongside the image bytes on upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub name: String,
    pub description: String,
}

impl Default for AssetMetadata {
    fn default() -> Self {
        Self {
            name: STORAGE_ASSET_NAME.to_string(),
            description: STORAGE_ASSET_DESCRIPTION.to_string(),
        }
    }
}
