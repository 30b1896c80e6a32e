//! Batch processing with dependency-based partitioning for async replay
//!
//! This module provides the `BatchProcessor` struct, which applies one batch of
//! replay commands with as much parallelism as the commands allow.
//!
//! # Design
//!
//! Two commands depend on each other when they touch a common account name or
//! reference label ([`LedgerCommand::keys`](crate::core::replay::LedgerCommand::keys)).
//! The batch is split into the connected components of that relation with a
//! union-find; each component keeps its commands in input order and runs on its
//! own blocking task, while independent components run concurrently.
//!
//! Ledger calls block (the SQLite backend holds a connection mutex), so groups
//! run on tokio's blocking pool rather than on the async workers.
//!
//! # Thread Safety
//!
//! The processor is cloneable and shares one `Replayer` through an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error};

use crate::core::replay::{Replayer, SequencedCommand};
use crate::types::LedgerError;

/// Batch processor with dependency-based partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    replayer: Arc<Replayer>,

    /// Upper bound on groups applied at the same time
    max_concurrent: usize,
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra.max(rb)] = ra.min(rb);
    }
}

fn apply_group(replayer: &Replayer, group: Vec<SequencedCommand>) -> Result<(), LedgerError> {
    for item in group {
        replayer.apply_or_skip(item.line, item.command)?;
    }
    Ok(())
}

impl BatchProcessor {
    /// Create a new BatchProcessor
    ///
    /// # Arguments
    ///
    /// * `replayer` - Shared replayer the commands are applied to
    /// * `max_concurrent` - Maximum number of groups in flight (at least 1)
    pub fn new(replayer: Arc<Replayer>, max_concurrent: usize) -> Self {
        Self {
            replayer,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Partition a batch into independent groups
    ///
    /// # Guarantees
    ///
    /// - Each command appears in exactly one group
    /// - Commands sharing a key are in the same group
    /// - Commands within a group keep their input order
    /// - Groups are ordered by their first command
    pub fn partition(batch: Vec<SequencedCommand>) -> Vec<Vec<SequencedCommand>> {
        let mut parent: Vec<usize> = (0..batch.len()).collect();
        let mut first_seen: HashMap<String, usize> = HashMap::new();

        for (i, item) in batch.iter().enumerate() {
            for key in item.command.keys() {
                match first_seen.get(&key) {
                    Some(&j) => union(&mut parent, i, j),
                    None => {
                        first_seen.insert(key, i);
                    }
                }
            }
        }

        let mut groups: Vec<Vec<SequencedCommand>> = Vec::new();
        let mut slots: HashMap<usize, usize> = HashMap::new();
        for (i, item) in batch.into_iter().enumerate() {
            let root = find(&mut parent, i);
            let slot = *slots.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(item);
        }

        groups
    }

    /// Apply a batch and wait for every group to finish
    ///
    /// Rejected commands are logged and skipped inside their group.
    ///
    /// # Errors
    ///
    /// Returns the first fatal (storage or consistency) error raised by any group.
    /// A group stops at its fatal error; other groups run to completion.
    pub async fn process_batch(&self, batch: Vec<SequencedCommand>) -> Result<(), LedgerError> {
        let groups = Self::partition(batch);
        debug!(groups = groups.len(), "Batch partitioned");

        let mut tasks = stream::iter(groups.into_iter().map(|group| {
            let replayer = Arc::clone(&self.replayer);
            tokio::task::spawn_blocking(move || apply_group(&replayer, group))
        }))
        .buffer_unordered(self.max_concurrent);

        let mut outcome = Ok(());
        while let Some(joined) = tasks.next().await {
            let result = joined.unwrap_or_else(|e| {
                error!(error = %e, "Replay task panicked");
                Err(LedgerError::consistency_fault("replay", e.to_string()))
            });
            if let Err(e) = result {
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        }
        outcome
    }
}
