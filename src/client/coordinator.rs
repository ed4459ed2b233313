/// Single-flight refresh coordination
///
/// When an access token expires mid-session, every in-flight request
/// fails at once. The coordinator collapses that wave into one refresh
/// call: the first caller to observe the failure installs the refresh
/// future, every concurrent caller awaits a shared handle to the same
/// future, and all of them resume strictly after it settles. The state
/// is owned by the coordinator instance (injected, not module-global) so
/// independent clients and tests get independent latches.
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::sync::Mutex;

/// Failure of a refresh wave. Cloneable because one failure is fanned
/// out to every caller queued on the wave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    pub message: String,
}

impl RefreshFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session refresh failed: {}", self.message)
    }
}

impl std::error::Error for RefreshFailure {}

type SharedRefresh = Shared<BoxFuture<'static, Result<(), RefreshFailure>>>;

struct InFlight {
    /// Bumped when a new wave starts; guards latch clearing so a caller
    /// from a settled wave cannot clear a newer one.
    generation: u64,
    refresh: Option<SharedRefresh>,
}

pub struct RefreshCoordinator {
    inner: Mutex<InFlight>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(InFlight {
                generation: 0,
                refresh: None,
            }),
        }
    }

    /// Join the current refresh wave, starting one if none is in flight.
    ///
    /// `start` runs at most once per wave. Every caller, leader and
    /// queued alike, resumes only after the wave settles, with the
    /// wave's result.
    pub async fn refresh<F, Fut>(&self, start: F) -> Result<(), RefreshFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), RefreshFailure>> + Send + 'static,
    {
        let (wave, generation) = {
            let mut inner = self.inner.lock().unwrap();
            match &inner.refresh {
                Some(wave) => (wave.clone(), inner.generation),
                None => {
                    inner.generation += 1;
                    let wave = start().boxed().shared();
                    inner.refresh = Some(wave.clone());
                    (wave, inner.generation)
                }
            }
        };

        let result = wave.await;

        // The first caller out of a settled wave drops the latch so the
        // next expiry starts a fresh wave.
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.generation == generation {
                inner.refresh = None;
            }
        }

        result
    }

    /// True while a wave is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.lock().unwrap().refresh.is_some()
    }
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
