use std::time::Duration;
use tracing::{debug, warn};

use crate::{Error, Result};

/// How often a failed commit is attempted again before the request gives up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Version conflicts tolerated per operation.
    pub max_conflicts: u32,
    /// Store outages tolerated per operation.
    pub max_outages: u32,
    /// Delay before the first retry after an outage. Doubles on each further outage.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_conflicts: 16,
            max_outages: 3,
            backoff: Duration::from_millis(25),
        }
    }
}

/// Retry bookkeeping for one read-modify-write loop.
pub(crate) struct Attempts<'a> {
    policy: &'a RetryPolicy,
    operation: &'static str,
    conflicts: u32,
    outages: u32,
}

impl<'a> Attempts<'a> {
    pub(crate) fn new(policy: &'a RetryPolicy, operation: &'static str) -> Self {
        Self {
            policy,
            operation,
            conflicts: 0,
            outages: 0,
        }
    }

    /// Returns `Ok` when the loop should run again, or the error to hand back to the caller.
    pub(crate) async fn retry(&mut self, err: Error) -> Result<()> {
        match err {
            Error::LedgerConflict => {
                self.conflicts += 1;
                if self.conflicts > self.policy.max_conflicts {
                    warn!(operation = self.operation, "giving up after repeated conflicts");
                    return Err(Error::Storage(format!(
                        "{} did not converge after {} conflicting updates",
                        self.operation, self.policy.max_conflicts
                    )));
                }
                debug!(
                    operation = self.operation,
                    attempt = self.conflicts,
                    "retrying after conflict"
                );
                Ok(())
            }
            Error::Storage(reason) => {
                self.outages += 1;
                if self.outages > self.policy.max_outages {
                    warn!(operation = self.operation, %reason, "store unavailable, giving up");
                    return Err(Error::Storage(reason));
                }
                let delay = self.policy.backoff * 2u32.saturating_pow(self.outages - 1);
                warn!(
                    operation = self.operation,
                    %reason,
                    attempt = self.outages,
                    ?delay,
                    "store unavailable, retrying"
                );
                tokio::time::sleep(delay).await;
                Ok(())
            }
            err => Err(err),
        }
    }
}
