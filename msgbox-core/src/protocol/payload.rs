use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::crypto::{EncryptionEnvelope, EncryptionType, PublicEncryptionKey};
use crate::error::{MsgBoxError, Result};
use crate::keys::KeyFamily;

pub const PUBLIC_KEY_TYPE: &str = "PUBLIC_KEY";
pub const ENCRYPTED_MESSAGE_TYPE: &str = "ENCRYPTED_MESSAGE";

/// The published key either as bare text or wrapped in an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublishedKey {
    Text(String),
    Structured {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        curve: Option<String>,
    },
}

impl PublishedKey {
    pub fn key_text(&self) -> &str {
        match self {
            PublishedKey::Text(text) => text,
            PublishedKey::Structured { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub public_key: PublishedKey,
    pub encryption_type: EncryptionType,
}

impl PublicKeyPayload {
    pub fn new(public_key: &PublicEncryptionKey) -> Result<Self> {
        Ok(Self {
            kind: PUBLIC_KEY_TYPE.to_string(),
            public_key: PublishedKey::Text(public_key.to_published()?),
            encryption_type: public_key.encryption_type(),
        })
    }

    /// Parse the published key for encryption.
    pub fn encryption_key(&self) -> Result<PublicEncryptionKey> {
        Ok(PublicEncryptionKey::from_published(
            self.encryption_type,
            self.public_key.key_text(),
        )?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipProof {
    pub account_id: String,
    /// Hex of the signer's raw public key.
    pub signer_public_key: String,
    pub signer_key_type: KeyFamily,
    /// Hex signature over the canonical payload.
    pub signature: String,
}

/// Root-of-trust record written as a box's first entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstEntry {
    pub payload: PublicKeyPayload,
    pub proof: OwnershipProof,
}

/// Encoding used on the wire for a sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Json,
    Cbor,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Json => "json",
            WireFormat::Cbor => "cbor",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = MsgBoxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(WireFormat::Json),
            "cbor" => Ok(WireFormat::Cbor),
            other => Err(MsgBoxError::InvalidData(format!("unknown wire format: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub format: WireFormat,
    pub data: EncryptionEnvelope,
}

impl EncryptedEnvelope {
    pub fn new(format: WireFormat, data: EncryptionEnvelope) -> Self {
        Self {
            kind: ENCRYPTED_MESSAGE_TYPE.to_string(),
            format,
            data,
        }
    }

    /// Serialize as JSON text or binary codec bytes, per `format`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_value(self)?;
        match self.format {
            WireFormat::Json => Ok(serde_json::to_vec(&json)?),
            WireFormat::Cbor => Ok(codec::encode(&codec::Value::from(&json))),
        }
    }

    /// Recognize an envelope in decoded JSON. Returns `Ok(None)` when the
    /// value is not tagged as an encrypted message.
    pub fn from_json(value: &serde_json::Value) -> Result<Option<Self>> {
        if value.get("type").and_then(|t| t.as_str()) != Some(ENCRYPTED_MESSAGE_TYPE) {
            return Ok(None);
        }
        let format = match value.get("format").and_then(|f| f.as_str()) {
            Some(format) => format.parse()?,
            None => WireFormat::Json,
        };
        let data = value
            .get("data")
            .ok_or_else(|| MsgBoxError::InvalidData("encrypted message without data".into()))?;
        Ok(Some(Self::new(format, EncryptionEnvelope::from_json(data)?)))
    }
}
