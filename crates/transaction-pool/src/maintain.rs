//! The timer-driven maintenance of the pool: periodic cleanup sweeps and re-announcement of
//! pool content to peers that have not seen it.

use crate::{traits::Clock, Pool, StateView};
use elc_peers::PeerPool;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Spawns the maintenance task. The task runs until aborted by
/// [`Pool::stop`](crate::Pool::stop).
pub(crate) fn spawn_maintenance<S, C>(pool: Pool<S, C>, peers: Arc<PeerPool>) -> JoinHandle<()>
where
    S: StateView + 'static,
    C: Clock,
{
    tokio::spawn(async move {
        let mut cleanup = tokio::time::interval(pool.config().cleanup_interval);
        let mut reannounce = tokio::time::interval(pool.config().reannounce_interval);
        // intervals fire immediately on the first tick, skip that one
        cleanup.tick().await;
        reannounce.tick().await;

        loop {
            tokio::select! {
                _ = cleanup.tick() => {
                    trace!("running pool cleanup sweep");
                    pool.cleanup().await;
                }
                _ = reannounce.tick() => {
                    trace!("re-announcing pool content");
                    pool.reannounce(&peers).await;
                }
            }
        }
    })
}
