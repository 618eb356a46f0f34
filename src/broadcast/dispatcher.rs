//! Broadcast dispatcher: bounded retry, detached tasks, outcome delivery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::broadcast::outcome::{BroadcastOutcome, BroadcastResult, OutcomeSink};
use crate::broadcast::TxSubmitter;
use crate::chains::ChainFamily;
use crate::config::schema::BroadcastConfig;
use crate::error::{EngineError, EngineResult};
use crate::observability::metrics;
use crate::resilience::{retry_async, RetryPolicy};
use crate::transaction::SignedTransaction;

/// Rejections that mean the network already holds these exact bytes.
const ALREADY_KNOWN: &[&str] = &["already known", "known transaction", "already imported"];

/// Decide whether a submission error still means the bytes reached the network.
///
/// "nonce too low" on a retry means an earlier attempt landed. Some EVM nodes
/// answer a successful `eth_sendRawTransaction` with a body the client fails
/// to decode; the error then quotes the `result` hash.
fn accepted_despite_error(family: ChainFamily, error: &EngineError, attempt: u32) -> bool {
    let message = error.to_string().to_ascii_lowercase();
    if ALREADY_KNOWN.iter().any(|m| message.contains(m)) {
        return true;
    }
    if family == ChainFamily::Evm && message.contains("result") && message.contains("0x") {
        return true;
    }
    attempt > 1 && message.contains("nonce too low")
}

/// Decrements the in-flight counter when a detached job ends, however it ends.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Submits signed transactions with bounded retry.
#[derive(Clone)]
pub struct BroadcastDispatcher {
    policy: RetryPolicy,
    sinks: Arc<Vec<Arc<dyn OutcomeSink>>>,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
}

impl BroadcastDispatcher {
    pub fn new(config: &BroadcastConfig, sinks: Vec<Arc<dyn OutcomeSink>>) -> Self {
        Self {
            policy: RetryPolicy::linear(config.max_attempts, config.retry_base_delay_ms),
            sinks: Arc::new(sinks),
            permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Detached jobs not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Submit in a background task and return the local id immediately.
    ///
    /// The task is not tied to the caller; dropping the caller's future does
    /// not cancel it. Its result reaches the outcome sinks only.
    pub fn dispatch_detached(
        &self,
        tx: SignedTransaction,
        sender: String,
        submitter: Arc<dyn TxSubmitter>,
    ) -> String {
        let local_tx_id = tx.local_tx_id.clone();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(self.in_flight.clone());
        let dispatcher = self.clone();

        tokio::spawn(async move {
            let _guard = guard;
            let _permit = match dispatcher.permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let outcome = BroadcastOutcome::new(
                        &tx.chain,
                        tx.family,
                        &sender,
                        &tx.local_tx_id,
                        BroadcastResult::Failed {
                            reason: "dispatcher closed".to_string(),
                        },
                        0,
                    );
                    dispatcher.deliver(&outcome).await;
                    return;
                }
            };
            let _ = dispatcher.run(&tx, &sender, submitter.as_ref()).await;
        });

        tracing::debug!(tx_hash = %local_tx_id, "Broadcast dispatched");
        local_tx_id
    }

    /// Submit and wait. Returns the network-reported id, or `BroadcastFailed`
    /// once the attempt budget is spent.
    pub async fn submit_now(
        &self,
        tx: &SignedTransaction,
        sender: &str,
        submitter: &dyn TxSubmitter,
    ) -> EngineResult<String> {
        self.run(tx, sender, submitter).await
    }

    async fn run(
        &self,
        tx: &SignedTransaction,
        sender: &str,
        submitter: &dyn TxSubmitter,
    ) -> EngineResult<String> {
        let family = tx.family.as_str();
        let mut attempts = 0;
        let result = retry_async(&self.policy, "broadcast", |attempt| {
            attempts = attempt;
            async move {
                metrics::record_broadcast_attempt(family);
                match submitter.submit(tx).await {
                    Ok(network_id) => Ok(network_id),
                    Err(e) if accepted_despite_error(tx.family, &e, attempt) => {
                        tracing::info!(chain = %tx.chain, tx_hash = %tx.local_tx_id, error = %e, "Treating rejection as already accepted");
                        Ok(tx.local_tx_id.clone())
                    }
                    Err(e) => Err(e),
                }
            }
        })
        .await;

        let (outcome_result, returned) = match result {
            Ok(network_id) => {
                if !network_id.eq_ignore_ascii_case(&tx.local_tx_id) {
                    tracing::warn!(
                        chain = %tx.chain,
                        local_tx_id = %tx.local_tx_id,
                        network_id = %network_id,
                        "Network reported a different transaction id"
                    );
                }
                (
                    BroadcastResult::Accepted {
                        network_id: network_id.clone(),
                    },
                    Ok(network_id),
                )
            }
            Err(e) => {
                let reason = e.last.to_string();
                (
                    BroadcastResult::Failed {
                        reason: reason.clone(),
                    },
                    Err(EngineError::BroadcastFailed {
                        attempts: e.attempts,
                        reason,
                    }),
                )
            }
        };

        let outcome = BroadcastOutcome::new(
            &tx.chain,
            tx.family,
            sender,
            &tx.local_tx_id,
            outcome_result,
            attempts,
        );
        metrics::record_broadcast_outcome(family, outcome.label());
        self.deliver(&outcome).await;
        returned
    }

    async fn deliver(&self, outcome: &BroadcastOutcome) {
        for sink in self.sinks.iter() {
            sink.record(outcome).await;
        }
    }

    /// Wait for detached jobs to finish. Returns false if `timeout` elapsed first.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = self.in_flight();
            if remaining == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(remaining, "Drain timed out with broadcasts in flight");
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl std::fmt::Debug for BroadcastDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastDispatcher")
            .field("policy", &self.policy)
            .field("sinks", &self.sinks.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
