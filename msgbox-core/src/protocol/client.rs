use super::chunks::{reassemble_chunks, AssembledEntry};
use super::memo::{extract_box_id, with_box_id};
use super::payload::{EncryptedEnvelope, WireFormat};
use super::proof::{
    build_first_entry, check_authority, check_identity, check_signature, check_structure,
    AccountSigner,
};
use super::sniff::sniff_format;
use super::{BoxProblem, SecurityViolation};
use crate::constants::{BOX_LOG_MEMO, KEY_MATCH_PROBE, PAGE_SIZE};
use crate::crypto::{decrypt_message, encrypt_message, EncryptionType, KeyPair, PublicEncryptionKey};
use crate::error::{MsgBoxError, Result};
use crate::traits::ledger::{ChunkInfo, Ledger, LogQuery, Order, RawEntry};
use crate::traits::random::SecureRandom;

/// Operator decision on whether to create a fresh box when the existing one
/// is missing or unusable.
pub trait CreateDecision {
    fn confirm_create(&self, problem: &BoxProblem) -> bool;
}

/// A fixed answer, for unattended runs.
#[derive(Debug, Clone, Copy)]
pub struct AutoCreate(pub bool);

impl CreateDecision for AutoCreate {
    fn confirm_create(&self, _problem: &BoxProblem) -> bool {
        self.0
    }
}

impl<F> CreateDecision for F
where
    F: Fn(&BoxProblem) -> bool,
{
    fn confirm_create(&self, problem: &BoxProblem) -> bool {
        self(problem)
    }
}

/// A box that is usable with `key_pair`.
#[derive(Debug, Clone)]
pub struct BoxReady {
    pub box_id: String,
    pub key_pair: KeyPair,
    /// Whether setup had to create the box.
    pub created: bool,
}

pub struct MessageBoxClient<'a> {
    pub(super) ledger: &'a dyn Ledger,
    pub(super) query: &'a dyn LogQuery,
    pub(super) rng: &'a dyn SecureRandom,
}

impl<'a> MessageBoxClient<'a> {
    pub fn new(ledger: &'a dyn Ledger, query: &'a dyn LogQuery, rng: &'a dyn SecureRandom) -> Self {
        Self { ledger, query, rng }
    }

    /// Make sure `signer`'s account has a box whose published key matches
    /// the local key pair, creating one if the operator agrees.
    ///
    /// An existing key pair of the requested scheme is reused; otherwise RSA
    /// generates a fresh pair and ECIES derives it from the signing key.
    pub async fn setup(
        &self,
        signer: &AccountSigner,
        encryption: EncryptionType,
        existing: Option<KeyPair>,
        decision: &dyn CreateDecision,
    ) -> Result<BoxReady> {
        let key_pair = resolve_key_pair(signer, encryption, existing)?;
        let memo = self.ledger.account_memo(&signer.account_id).await?;

        let problem = match extract_box_id(&memo) {
            None => BoxProblem::NotFound,
            Some(box_id) => match self.find_box_problem(&box_id, &key_pair).await? {
                None => {
                    tracing::info!(account = %signer.account_id, box_id = %box_id, "Message box ready");
                    return Ok(BoxReady {
                        box_id,
                        key_pair,
                        created: false,
                    });
                }
                Some(problem) => problem,
            },
        };

        tracing::warn!(account = %signer.account_id, problem = %problem, "Existing message box unusable");
        if !decision.confirm_create(&problem) {
            return Err(MsgBoxError::SetupAborted(problem));
        }

        let box_id = self.create_box(signer, &key_pair, &memo).await?;
        Ok(BoxReady {
            box_id,
            key_pair,
            created: true,
        })
    }

    /// Encrypt `message` to the recipient's box and publish it, returning the
    /// sequence number of the new entry.
    ///
    /// The box's first entry must pass the structure, identity, authority and
    /// signature checks, in that order, before its key is used.
    pub async fn send(&self, recipient_account_id: &str, message: &str, format: WireFormat) -> Result<u64> {
        let memo = self.ledger.account_memo(recipient_account_id).await?;
        let box_id = extract_box_id(&memo)
            .ok_or_else(|| MsgBoxError::BoxNotFound(recipient_account_id.to_string()))?;

        let first = self
            .fetch_first_entry(&box_id)
            .await?
            .ok_or(SecurityViolation::MissingStructure)?;
        let checked = check_structure(&first)?;
        check_identity(&checked, recipient_account_id)?;
        let ledger_key = self.ledger.account_public_key(recipient_account_id).await?;
        check_authority(&checked, &ledger_key)?;
        check_signature(&checked)?;

        let recipient_key = checked.entry.payload.encryption_key()?;
        let data = encrypt_message(message.as_bytes(), &recipient_key, self.rng)?;
        let bytes = EncryptedEnvelope::new(format, data).to_bytes()?;
        let sequence = self.ledger.append_entry(&box_id, &bytes).await?;

        tracing::info!(
            recipient = %recipient_account_id,
            box_id = %box_id,
            sequence,
            format = %format,
            "Message sent"
        );
        Ok(sequence)
    }

    /// The box's first entry as JSON, reassembled if the ledger chunked it.
    pub async fn fetch_first_entry(&self, box_id: &str) -> Result<Option<serde_json::Value>> {
        let Some(first) = self.query.fetch_entry(box_id, 1).await? else {
            return Ok(None);
        };

        let entry = match &first.chunk_info {
            Some(info) if info.total > 1 => {
                let chunks = self.collect_chunks(box_id, info).await?;
                reassemble_chunks(chunks)
                    .into_iter()
                    .find(|e| e.sequence_number == first.sequence_number)
            }
            _ => Some(AssembledEntry::from(first)),
        };

        let Some(entry) = entry else {
            return Ok(None);
        };
        Ok(sniff_format(&entry.payload()?).to_json())
    }

    /// Chunks of one transaction, paging past entries interleaved between them.
    async fn collect_chunks(&self, box_id: &str, info: &ChunkInfo) -> Result<Vec<RawEntry>> {
        let total = info.total as usize;
        let mut chunks = Vec::with_capacity(total);
        let mut after = 0;
        loop {
            let page = self
                .query
                .fetch_entries(box_id, after, PAGE_SIZE, Order::Asc)
                .await?;
            let short_page = page.len() < PAGE_SIZE;
            if let Some(last) = page.last() {
                after = last.sequence_number;
            }
            chunks.extend(page.into_iter().filter(|entry| {
                entry
                    .chunk_info
                    .as_ref()
                    .is_some_and(|c| c.initial_transaction_id == info.initial_transaction_id)
            }));
            if short_page || chunks.len() >= total {
                break;
            }
        }
        Ok(chunks)
    }

    async fn find_box_problem(&self, box_id: &str, key_pair: &KeyPair) -> Result<Option<BoxProblem>> {
        let Some(first) = self.fetch_first_entry(box_id).await? else {
            return Ok(Some(BoxProblem::Malformed("box has no readable first entry".into())));
        };
        let checked = match check_structure(&first) {
            Ok(checked) => checked,
            Err(e) => return Ok(Some(BoxProblem::Malformed(e.to_string()))),
        };

        let payload = &checked.entry.payload;
        if payload.encryption_type != key_pair.encryption_type() {
            tracing::debug!(
                published = %payload.encryption_type,
                local = %key_pair.encryption_type(),
                "Box uses a different encryption scheme"
            );
            return Ok(Some(BoxProblem::KeyMismatch));
        }
        let published = match payload.encryption_key() {
            Ok(key) => key,
            Err(e) => return Ok(Some(BoxProblem::Malformed(e.to_string()))),
        };

        if self.key_matches(&published, key_pair)? {
            Ok(None)
        } else {
            Ok(Some(BoxProblem::KeyMismatch))
        }
    }

    /// Encrypt a probe to the published key and require the local key to
    /// open it.
    fn key_matches(&self, published: &PublicEncryptionKey, key_pair: &KeyPair) -> Result<bool> {
        let envelope = encrypt_message(KEY_MATCH_PROBE.as_bytes(), published, self.rng)?;
        Ok(matches!(
            decrypt_message(&envelope, key_pair),
            Ok(plaintext) if plaintext == KEY_MATCH_PROBE.as_bytes()
        ))
    }

    async fn create_box(&self, signer: &AccountSigner, key_pair: &KeyPair, memo: &str) -> Result<String> {
        let box_id = self.ledger.create_log(BOX_LOG_MEMO).await?;
        let first = build_first_entry(signer, &key_pair.public_key())?;
        let bytes = serde_json::to_vec(&first)?;
        self.ledger.append_entry(&box_id, &bytes).await?;
        self.ledger
            .update_account_memo(&signer.account_id, &with_box_id(memo, &box_id))
            .await?;

        tracing::info!(
            account = %signer.account_id,
            box_id = %box_id,
            encryption = %key_pair.encryption_type(),
            "Created message box"
        );
        Ok(box_id)
    }
}

fn resolve_key_pair(
    signer: &AccountSigner,
    encryption: EncryptionType,
    existing: Option<KeyPair>,
) -> Result<KeyPair> {
    match existing {
        Some(key_pair) if key_pair.encryption_type() == encryption => return Ok(key_pair),
        Some(key_pair) => tracing::warn!(
            stored = %key_pair.encryption_type(),
            requested = %encryption,
            "Ignoring stored key pair of another scheme"
        ),
        None => {}
    }
    let key_pair = match encryption {
        EncryptionType::Rsa => KeyPair::generate_rsa()?,
        EncryptionType::Ecies => KeyPair::ecies_from_signing_key(signer.private_key(), signer.family)?,
    };
    Ok(key_pair)
}
