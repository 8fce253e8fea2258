use crate::session::store::SessionStore;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval, timeout},
};
use tracing::{debug, info, warn};

/// Delete expired tokens once. Failures are logged and reported as zero.
pub async fn sweep_once(store: &dyn SessionStore, limit: Duration) -> u64 {
    match timeout(limit, store.reap_expired(Utc::now())).await {
        Ok(Ok(reaped)) => {
            if reaped > 0 {
                info!("Reaped {reaped} expired session tokens");
            } else {
                debug!("No expired session tokens to reap");
            }
            reaped
        }
        Ok(Err(err)) => {
            warn!("Expired session token sweep failed: {err:#}");
            0
        }
        Err(_) => {
            warn!("Expired session token sweep timed out after {:?}", limit);
            0
        }
    }
}

/// Handle to a running sweep; dropping it stops the sweep.
#[derive(Debug)]
pub struct Sweeper {
    handle: JoinHandle<()>,
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn the periodic sweep. The first sweep runs one `every` after start.
///
/// Returns `None` for a zero interval, which disables sweeping.
#[must_use]
pub fn spawn(store: Arc<dyn SessionStore>, every: Duration, limit: Duration) -> Option<Sweeper> {
    if every.is_zero() {
        debug!("Session token sweep disabled");
        return None;
    }

    let handle = tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately on the first tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            sweep_once(store.as_ref(), limit).await;
            debug!("Next session token sweep in {} seconds", every.as_secs());
        }
    });

    Some(Sweeper { handle })
}
