use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// How an atom retries a `swap` whose compare-and-set lost a race.
///
/// The default retries forever without pausing. Under sustained contention an
/// unbounded swap may never return; `limit` bounds `try_swap`, and `backoff`
/// spins then yields between attempts using [`crossbeam_utils::Backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of CAS attempts made by `try_swap`. `None` is unbounded.
    #[serde(default)]
    pub limit: Option<NonZeroUsize>,
    /// Back off between failed attempts.
    #[serde(default)]
    pub backoff: bool,
}

impl RetryPolicy {
    /// Retry forever, immediately.
    pub const fn unbounded() -> Self {
        Self {
            limit: None,
            backoff: false,
        }
    }

    /// Give up after `attempts` CAS attempts in `try_swap`.
    #[must_use]
    pub const fn with_limit(mut self, attempts: NonZeroUsize) -> Self {
        self.limit = Some(attempts);
        self
    }

    /// Back off between failed attempts.
    #[must_use]
    pub const fn with_backoff(mut self) -> Self {
        self.backoff = true;
        self
    }
}
