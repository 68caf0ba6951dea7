use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{MsgBoxError, Result};
use crate::traits::ledger::RawEntry;

/// One logical entry after chunk reassembly.
///
/// For a reassembled group `sequence_number` is the lowest sequence of its
/// chunks and `last_sequence_number` the highest; for a plain entry both are
/// the entry's own sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledEntry {
    pub sequence_number: u64,
    pub last_sequence_number: u64,
    pub consensus_timestamp: String,
    /// Base64 of the full payload.
    pub message: String,
}

impl AssembledEntry {
    pub fn payload(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.message)
            .map_err(|e| MsgBoxError::InvalidData(format!("entry payload is not base64: {e}")))
    }
}

impl From<RawEntry> for AssembledEntry {
    fn from(entry: RawEntry) -> Self {
        Self {
            sequence_number: entry.sequence_number,
            last_sequence_number: entry.sequence_number,
            consensus_timestamp: entry.consensus_timestamp,
            message: entry.message,
        }
    }
}

struct ChunkGroup {
    slots: Vec<Option<Vec<u8>>>,
    min_sequence: u64,
    max_sequence: u64,
    first_timestamp: Option<String>,
}

impl ChunkGroup {
    fn new(total: usize) -> Self {
        Self {
            slots: vec![None; total],
            min_sequence: u64::MAX,
            max_sequence: 0,
            first_timestamp: None,
        }
    }

    fn received(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.as_ref().is_some_and(|bytes| !bytes.is_empty()))
            .count()
    }

    fn assemble(self) -> Option<AssembledEntry> {
        let timestamp = self.first_timestamp?;
        let mut payload = Vec::new();
        for slot in self.slots {
            match slot {
                Some(bytes) if !bytes.is_empty() => payload.extend_from_slice(&bytes),
                _ => return None,
            }
        }
        Some(AssembledEntry {
            sequence_number: self.min_sequence,
            last_sequence_number: self.max_sequence,
            consensus_timestamp: timestamp,
            message: BASE64.encode(payload),
        })
    }
}

/// Merge chunked entries back into logical entries, sorted by sequence.
///
/// Chunks are grouped by their initial transaction id. A group is delivered
/// only when chunk 1 is present and every slot holds a non-empty payload;
/// anything else is dropped with a warning.
pub fn reassemble_chunks(entries: Vec<RawEntry>) -> Vec<AssembledEntry> {
    let mut assembled = Vec::with_capacity(entries.len());
    let mut groups: HashMap<String, ChunkGroup> = HashMap::new();

    for entry in entries {
        let info = match &entry.chunk_info {
            Some(info) if info.total > 1 => info.clone(),
            _ => {
                assembled.push(AssembledEntry::from(entry));
                continue;
            }
        };

        let total = info.total as usize;
        let group = groups
            .entry(info.initial_transaction_id.clone())
            .or_insert_with(|| ChunkGroup::new(total));

        if group.slots.len() != total || info.number == 0 || info.number as usize > total {
            tracing::warn!(
                transaction_id = %info.initial_transaction_id,
                sequence = entry.sequence_number,
                number = info.number,
                total = info.total,
                "Ignoring chunk with inconsistent numbering"
            );
            continue;
        }

        let index = info.number as usize - 1;
        if group.slots[index].is_some() {
            tracing::debug!(
                transaction_id = %info.initial_transaction_id,
                number = info.number,
                "Duplicate chunk ignored"
            );
            continue;
        }

        match BASE64.decode(&entry.message) {
            Ok(bytes) => group.slots[index] = Some(bytes),
            Err(e) => {
                tracing::warn!(sequence = entry.sequence_number, error = %e, "Chunk payload is not base64");
                continue;
            }
        }
        group.min_sequence = group.min_sequence.min(entry.sequence_number);
        group.max_sequence = group.max_sequence.max(entry.sequence_number);
        if index == 0 {
            group.first_timestamp = Some(entry.consensus_timestamp);
        }
    }

    for (transaction_id, group) in groups {
        let received = group.received();
        let total = group.slots.len();
        match group.assemble() {
            Some(entry) => assembled.push(entry),
            None => {
                let err = MsgBoxError::ChunkIncomplete {
                    transaction_id,
                    received,
                    total,
                };
                tracing::warn!(error = %err, "Dropping incomplete chunk group");
            }
        }
    }

    assembled.sort_by_key(|entry| entry.sequence_number);
    assembled
}
