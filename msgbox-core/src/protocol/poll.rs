use serde_json::Value;

use super::chunks::{reassemble_chunks, AssembledEntry};
use super::client::MessageBoxClient;
use super::payload::{EncryptedEnvelope, WireFormat};
use super::sniff::{sniff_format, DecodedPayload};
use crate::constants::PAGE_SIZE;
use crate::crypto::{decrypt_message, KeyPair};
use crate::error::Result;
use crate::traits::ledger::{Order, RawEntry};

/// Caller-owned polling cursor for one box.
///
/// The first poll only records the latest sequence number; later polls
/// deliver everything after the cursor.
#[derive(Debug, Clone)]
pub struct PollState {
    box_id: String,
    key_pair: KeyPair,
    first_call: bool,
    cursor: u64,
}

impl PollState {
    pub fn new(box_id: impl Into<String>, key_pair: KeyPair) -> Self {
        Self {
            box_id: box_id.into(),
            key_pair,
            first_call: true,
            cursor: 0,
        }
    }

    pub fn box_id(&self) -> &str {
        &self.box_id
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    /// Highest sequence number already seen.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn is_first_call(&self) -> bool {
        self.first_call
    }

    fn advance(&mut self, sequence: u64) {
        self.cursor = self.cursor.max(sequence);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// An encrypted message opened with the box key.
    Decrypted { text: String, format: WireFormat },
    /// Structured data that is not an encrypted message.
    Structured(Value),
    PlainText(String),
    /// An encrypted message this key pair cannot open.
    Undecryptable { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    pub sequence_number: u64,
    pub last_sequence_number: u64,
    pub consensus_timestamp: String,
    pub body: MessageBody,
}

impl<'a> MessageBoxClient<'a> {
    /// Fetch and decode whatever arrived since the last poll.
    pub async fn poll(&self, state: &mut PollState) -> Result<Vec<ReceivedMessage>> {
        if state.first_call {
            let latest = self.query.latest_sequence(&state.box_id).await?.unwrap_or(0);
            state.advance(latest);
            state.first_call = false;
            tracing::debug!(box_id = %state.box_id, cursor = state.cursor, "Poll cursor initialized");
            return Ok(Vec::new());
        }

        let raw = self.fetch_range(&state.box_id, state.cursor + 1, None).await?;
        let entries = reassemble_chunks(raw);
        if let Some(last) = entries.iter().map(|e| e.last_sequence_number).max() {
            state.advance(last);
        }

        let messages: Vec<ReceivedMessage> = entries
            .iter()
            .map(|entry| decode_entry(entry, &state.key_pair))
            .collect();
        if !messages.is_empty() {
            tracing::info!(box_id = %state.box_id, count = messages.len(), cursor = state.cursor, "Received messages");
        }
        Ok(messages)
    }

    /// Decode every entry with a sequence number in `[start, end]`, or from
    /// `start` onward when `end` is `None`.
    pub async fn range_query(
        &self,
        box_id: &str,
        start: u64,
        end: Option<u64>,
        key_pair: &KeyPair,
    ) -> Result<Vec<ReceivedMessage>> {
        let raw = self.fetch_range(box_id, start, end).await?;
        Ok(reassemble_chunks(raw)
            .iter()
            .map(|entry| decode_entry(entry, key_pair))
            .collect())
    }

    /// Page through the log from `start` in `PAGE_SIZE` steps.
    async fn fetch_range(&self, box_id: &str, start: u64, end: Option<u64>) -> Result<Vec<RawEntry>> {
        let mut collected = Vec::new();
        if end.is_some_and(|end| end < start) {
            return Ok(collected);
        }

        let mut after = start.saturating_sub(1);
        loop {
            let page = self
                .query
                .fetch_entries(box_id, after, PAGE_SIZE, Order::Asc)
                .await?;
            let short_page = page.len() < PAGE_SIZE;
            let mut past_end = false;

            for entry in page {
                if entry.sequence_number <= after {
                    continue;
                }
                after = entry.sequence_number;
                if end.is_some_and(|end| entry.sequence_number > end) {
                    past_end = true;
                    break;
                }
                if entry.sequence_number >= start {
                    collected.push(entry);
                }
            }

            if short_page || past_end {
                break;
            }
        }
        Ok(collected)
    }
}

/// Decode one logical entry into a message. Never fails: entries that cannot
/// be decrypted are reported as such.
pub fn decode_entry(entry: &AssembledEntry, key_pair: &KeyPair) -> ReceivedMessage {
    let body = match entry.payload() {
        Ok(bytes) => decode_body(&bytes, key_pair),
        Err(e) => MessageBody::Undecryptable {
            reason: e.to_string(),
        },
    };
    if let MessageBody::Undecryptable { reason } = &body {
        tracing::warn!(sequence = entry.sequence_number, reason = %reason, "Skipping undecryptable entry");
    }
    ReceivedMessage {
        sequence_number: entry.sequence_number,
        last_sequence_number: entry.last_sequence_number,
        consensus_timestamp: entry.consensus_timestamp.clone(),
        body,
    }
}

fn decode_body(bytes: &[u8], key_pair: &KeyPair) -> MessageBody {
    let json = match sniff_format(bytes) {
        DecodedPayload::PlainText(text) => return MessageBody::PlainText(text),
        decoded => decoded.to_json().unwrap_or(Value::Null),
    };

    let envelope = match EncryptedEnvelope::from_json(&json) {
        Ok(Some(envelope)) => envelope,
        Ok(None) => return MessageBody::Structured(json),
        Err(e) => {
            return MessageBody::Undecryptable {
                reason: e.to_string(),
            }
        }
    };

    match decrypt_message(&envelope.data, key_pair) {
        Ok(plaintext) => match String::from_utf8(plaintext) {
            Ok(text) => MessageBody::Decrypted {
                text,
                format: envelope.format,
            },
            Err(_) => MessageBody::Undecryptable {
                reason: "decrypted message is not UTF-8".into(),
            },
        },
        Err(e) => MessageBody::Undecryptable {
            reason: e.to_string(),
        },
    }
}
