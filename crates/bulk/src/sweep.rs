use super::SessionStore;
use mkw_core::SWEEP_INTERVAL;

/// Spawn the background expiry sweep: every 15 minutes, open sessions
/// past their TTL flip to `expired`. Stops once a shutdown interrupt is
/// raised.
pub fn sweeper(store: SessionStore) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SWEEP_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            if mkw_core::interrupted() {
                log::info!("expiry sweep stopping");
                break;
            }
            if let Err(e) = store.sweep_expired().await {
                log::error!("expiry sweep failed: {}", e);
            }
        }
    })
}
