//! Bounded retry queue for pending attestations.
//!
//! The queue is a versioned checkpoint keyed by space id, always read and
//! written as a whole. Entries are processed in stored order; an entry is
//! dropped after [`MAX_ATTESTATION_RETRIES`] failed attempts. Persistence
//! failures never propagate into the voting flow.

use alloy_primitives::B256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use verdict_storage::{CheckpointStore, JsonCheckpointStore};

use crate::{AttestationQueueEntry, AttestationResult};

/// Attempts after which an entry is dropped instead of retried.
pub const MAX_ATTESTATION_RETRIES: u32 = 3;

const CHECKPOINT_VERSION: u32 = 1;

/// Whole-value persisted state of the retry queue for one space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueCheckpoint {
    pub version: u32,
    pub space_id: String,
    pub pending: Vec<AttestationQueueEntry>,
}

impl QueueCheckpoint {
    pub fn new(space_id: &str) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            space_id: space_id.to_string(),
            pending: Vec::new(),
        }
    }

    /// Storage key for a space's queue checkpoint.
    pub fn key(space_id: &str) -> String {
        format!("attestations-{space_id}")
    }
}

/// One attestation attempt for a queued entry.
///
/// The production implementation runs encode → sign → route → submit; tests
/// substitute programmable outcomes.
#[async_trait]
pub trait AttestationSubmitter: Send + Sync {
    async fn submit_attestation(&self, entry: &AttestationQueueEntry) -> AttestationResult<B256>;
}

/// Process queued entries in stored order and return those still pending.
///
/// Entries at the retry limit are dropped with a warning and no attempt.
/// Successful entries are removed; failed entries come back with
/// `retry_count` incremented by one. The returned sequence is the new
/// checkpoint state.
pub async fn flush(
    submitter: &dyn AttestationSubmitter,
    entries: Vec<AttestationQueueEntry>,
) -> Vec<AttestationQueueEntry> {
    let mut still_pending = Vec::new();

    for mut entry in entries {
        if entry.retry_count >= MAX_ATTESTATION_RETRIES {
            warn!(
                proposal_id = %entry.proposal_id,
                space_id = %entry.space_id,
                retry_count = entry.retry_count,
                "dropping attestation after too many failed attempts"
            );
            continue;
        }

        match submitter.submit_attestation(&entry).await {
            Ok(tx_hash) => {
                info!(
                    proposal_id = %entry.proposal_id,
                    %tx_hash,
                    "pending attestation confirmed"
                );
            }
            Err(e) => {
                entry.retry_count += 1;
                warn!(
                    proposal_id = %entry.proposal_id,
                    retry_count = entry.retry_count,
                    error = %e,
                    "attestation attempt failed; keeping entry queued"
                );
                still_pending.push(entry);
            }
        }
    }

    still_pending
}

/// Load a space's queue checkpoint, or an empty one when none exists or the
/// stored record cannot be read.
pub async fn load_checkpoint(store: &dyn CheckpointStore, space_id: &str) -> QueueCheckpoint {
    match store
        .get_json::<QueueCheckpoint>(&QueueCheckpoint::key(space_id))
        .await
    {
        Ok(Some(checkpoint)) => checkpoint,
        Ok(None) => QueueCheckpoint::new(space_id),
        Err(e) => {
            warn!(space_id, error = %e, "could not load attestation checkpoint; starting empty");
            QueueCheckpoint::new(space_id)
        }
    }
}

/// Persist a queue checkpoint, logging and swallowing any failure.
///
/// The vote-cast outcome and the queue outcome are decoupled; a write
/// failure must never fail the voting flow.
pub async fn persist_checkpoint(store: &dyn CheckpointStore, checkpoint: &QueueCheckpoint) {
    let key = QueueCheckpoint::key(&checkpoint.space_id);
    if let Err(e) = store.put_json(&key, checkpoint).await {
        warn!(
            space_id = %checkpoint.space_id,
            pending = checkpoint.pending.len(),
            error = %e,
            "failed to persist attestation checkpoint"
        );
    }
}
