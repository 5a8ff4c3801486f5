use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{hub_store::HubStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Exponential backoff between [`INITIAL_DELAY`] and [`MAX_DELAY`].
struct Backoff {
    delay: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            delay: INITIAL_DELAY,
        }
    }

    fn reset(&mut self) {
        self.delay = INITIAL_DELAY;
    }

    async fn wait(&mut self) {
        sleep(self.delay).await;
        self.delay = (self.delay * 2).min(MAX_DELAY);
    }
}

/// Connect to the storage backend, then keep it healthy; the shared state stays in degraded
/// mode whenever no working store is installed.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn HubStore>, StorageError>> + Send,
{
    let mut backoff = Backoff::new();

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                backoff.wait().await;
                continue;
            }
        };

        state.set_store(store.clone()).await;
        info!("storage connection established; leaving degraded mode");
        backoff.reset();

        watch_store(&state, store.as_ref()).await;
        warn!("exhausted storage reconnect attempts; opening a fresh connection");
        backoff.wait().await;
    }
}

/// Poll the store until it fails and cannot be recovered in place.
async fn watch_store(state: &SharedState, store: &dyn HubStore) {
    loop {
        sleep(HEALTH_POLL_INTERVAL).await;
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded().await {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed; entering degraded mode");
                state.update_degraded(true).await;
                if !reconnect(state, store).await {
                    return;
                }
            }
        }
    }
}

async fn reconnect(state: &SharedState, store: &dyn HubStore) -> bool {
    let mut backoff = Backoff::new();
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded");
                state.update_degraded(false).await;
                return true;
            }
            Err(err) => {
                warn!(attempt, error = %err, "storage reconnect attempt failed");
                backoff.wait().await;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::{config::AppConfig, dao::hub_store::memory::MemoryHubStore, state::AppState};

    #[tokio::test]
    async fn installs_store_after_failed_attempt() {
        let state = AppState::new(AppConfig::new("secret"));
        assert!(state.is_degraded().await);

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let supervisor = tokio::spawn(run(state.clone(), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    let io = std::io::Error::other("connection refused");
                    Err(StorageError::unavailable("first attempt".into(), io))
                } else {
                    Ok(Arc::new(MemoryHubStore::new()) as Arc<dyn HubStore>)
                }
            }
        }));

        tokio::time::timeout(Duration::from_secs(5), async {
            while state.store().await.is_none() {
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();

        assert!(!state.is_degraded().await);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        supervisor.abort();
    }
}
