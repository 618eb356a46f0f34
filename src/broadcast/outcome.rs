//! Terminal broadcast results and where they go.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::chains::ChainFamily;

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BroadcastResult {
    Accepted { network_id: String },
    Failed { reason: String },
}

/// One finished submission job.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastOutcome {
    pub job_id: Uuid,
    pub chain: String,
    pub family: ChainFamily,
    pub sender: String,
    pub local_tx_id: String,
    pub result: BroadcastResult,
    pub attempts: u32,
    pub finished_at: SystemTime,
}

impl BroadcastOutcome {
    pub fn new(
        chain: &str,
        family: ChainFamily,
        sender: &str,
        local_tx_id: &str,
        result: BroadcastResult,
        attempts: u32,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            chain: chain.to_string(),
            family,
            sender: sender.to_string(),
            local_tx_id: local_tx_id.to_string(),
            result,
            attempts,
            finished_at: SystemTime::now(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.result, BroadcastResult::Accepted { .. })
    }

    /// Metrics label.
    pub fn label(&self) -> &'static str {
        if self.is_accepted() {
            "accepted"
        } else {
            "failed"
        }
    }
}

/// Receives every terminal outcome.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    async fn record(&self, outcome: &BroadcastOutcome);
}

/// Logs outcomes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingOutcomeSink;

#[async_trait]
impl OutcomeSink for TracingOutcomeSink {
    async fn record(&self, outcome: &BroadcastOutcome) {
        match &outcome.result {
            BroadcastResult::Accepted { network_id } => tracing::info!(
                chain = %outcome.chain,
                tx_hash = %outcome.local_tx_id,
                network_id = %network_id,
                attempts = outcome.attempts,
                "Broadcast accepted"
            ),
            BroadcastResult::Failed { reason } => tracing::error!(
                chain = %outcome.chain,
                tx_hash = %outcome.local_tx_id,
                sender = %outcome.sender,
                attempts = outcome.attempts,
                reason = %reason,
                "Broadcast failed"
            ),
        }
    }
}

/// Default number of outcomes an `OutcomeStore` keeps.
pub const DEFAULT_OUTCOME_CAPACITY: usize = 10_000;

/// In-memory outcome index keyed by local transaction id.
///
/// Holds at most `capacity` entries; recording past that evicts the oldest.
#[derive(Debug)]
pub struct OutcomeStore {
    outcomes: DashMap<String, BroadcastOutcome>,
    order: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl Default for OutcomeStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_OUTCOME_CAPACITY)
    }
}

impl OutcomeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, local_tx_id: &str) -> Option<BroadcastOutcome> {
        self.outcomes.get(local_tx_id).map(|o| o.clone())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    fn insert(&self, outcome: &BroadcastOutcome) {
        let mut order = match self.order.lock() {
            Ok(order) => order,
            Err(poisoned) => poisoned.into_inner(),
        };
        let previous = self
            .outcomes
            .insert(outcome.local_tx_id.clone(), outcome.clone());
        if previous.is_some() {
            order.retain(|id| id != &outcome.local_tx_id);
        }
        order.push_back(outcome.local_tx_id.clone());

        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.outcomes.remove(&oldest);
                tracing::debug!(tx_hash = %oldest, "Evicted broadcast outcome");
            }
        }
    }
}

#[async_trait]
impl OutcomeSink for OutcomeStore {
    async fn record(&self, outcome: &BroadcastOutcome) {
        self.insert(outcome);
    }
}
