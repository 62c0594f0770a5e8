//! Tamper-evident journal of engine events
//!
//! Each emitted [`ElectionEvent`] becomes an [`EventRecord`] carrying a
//! sequence number, a Blake3 hash of its content and the hash of the record
//! before it. Integrations read the journal to follow elections; the hash
//! chain lets them detect edits or gaps.

use crate::types::{
    Address, Amount, ElectionId, ElectionState, ElectionTerm, Hash, MerkleRoot, RandomNumber,
    Region, Timestamp, VaultId, Weight,
};
use crate::{Result, internal_error};
use serde::{Deserialize, Serialize};

/// Observable engine events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionEvent {
    ElectionInitialized {
        term: ElectionTerm,
        region: Region,
        start_time: Timestamp,
    },
    VaultInitialized {
        election_id: ElectionId,
        vault_id: VaultId,
    },
    VaultClosed {
        election_id: ElectionId,
    },
    BeneficiaryRegistered {
        election_id: ElectionId,
        beneficiary: Address,
        bond: Amount,
    },
    VoteCast {
        election_id: ElectionId,
        voter: Address,
        beneficiary: Address,
        weight: Weight,
    },
    ElectionStateChanged {
        election_id: ElectionId,
        from: ElectionState,
        to: ElectionState,
    },
    RandomNumberRequested {
        election_id: ElectionId,
        seed: u64,
    },
    RandomNumberResolved {
        election_id: ElectionId,
        random_number: RandomNumber,
    },
    FinalizationProposed {
        election_id: ElectionId,
        merkle_root: MerkleRoot,
    },
    IncentivePaid {
        election_id: ElectionId,
        recipient: Address,
        amount: Amount,
    },
    ElectionFinalized {
        election_id: ElectionId,
        merkle_root: MerkleRoot,
    },
}

/// Journal entry wrapping one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the journal, starting at 1
    pub sequence_number: u64,
    pub timestamp: Timestamp,
    pub previous_hash: Option<Hash>,
    pub content_hash: Hash,
    pub event: ElectionEvent,
}

impl EventRecord {
    fn new(
        sequence_number: u64,
        timestamp: Timestamp,
        previous_hash: Option<Hash>,
        event: ElectionEvent,
    ) -> Result<Self> {
        let content_hash = Self::hash_content(sequence_number, timestamp, &event)?;

        Ok(Self {
            sequence_number,
            timestamp,
            previous_hash,
            content_hash,
            event,
        })
    }

    fn hash_content(sequence_number: u64, timestamp: Timestamp, event: &ElectionEvent) -> Result<Hash> {
        let content = serde_json::to_vec(&(sequence_number, timestamp, event))?;
        Ok(blake3::hash(&content).into())
    }

    /// Hash of the whole record, chained into the next one
    pub fn record_hash(&self) -> Result<Hash> {
        let content = serde_json::to_vec(self)?;
        Ok(blake3::hash(&content).into())
    }

    /// Whether the stored content hash still matches the event
    pub fn verify_integrity(&self) -> Result<bool> {
        let expected = Self::hash_content(self.sequence_number, self.timestamp, &self.event)?;
        Ok(expected == self.content_hash)
    }
}

/// Outcome of a full journal check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalIntegrityReport {
    pub records_checked: usize,
    /// Sequence numbers whose content or chain link failed verification
    pub violations: Vec<u64>,
}

impl JournalIntegrityReport {
    pub fn is_intact(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Append-only event journal
#[derive(Debug, Clone, Default)]
pub struct EventJournal {
    records: Vec<EventRecord>,
    last_hash: Option<Hash>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `event` and log it
    pub fn emit(&mut self, timestamp: Timestamp, event: ElectionEvent) -> Result<&EventRecord> {
        let sequence_number = self.records.len() as u64 + 1;
        let record = EventRecord::new(sequence_number, timestamp, self.last_hash, event)?;
        self.last_hash = Some(record.record_hash()?);

        tracing::debug!(seq = sequence_number, event = ?record.event, "event emitted");

        self.records.push(record);
        self.records
            .last()
            .ok_or_else(|| internal_error!("journal empty after append"))
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records emitted after sequence number `after`
    pub fn since(&self, after: u64) -> &[EventRecord] {
        let start = (after as usize).min(self.records.len());
        &self.records[start..]
    }

    /// Walk the chain and report broken records
    pub fn verify(&self) -> Result<JournalIntegrityReport> {
        let mut violations = Vec::new();
        let mut previous_hash: Option<Hash> = None;

        for (index, record) in self.records.iter().enumerate() {
            let in_sequence = record.sequence_number == index as u64 + 1;
            if !in_sequence || !record.verify_integrity()? || record.previous_hash != previous_hash {
                violations.push(record.sequence_number);
            }
            previous_hash = Some(record.record_hash()?);
        }

        Ok(JournalIntegrityReport {
            records_checked: self.records.len(),
            violations,
        })
    }

    /// JSON export for external consumers
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    #[cfg(test)]
    pub(crate) fn records_mut(&mut self) -> &mut Vec<EventRecord> {
        &mut self.records
    }
}
