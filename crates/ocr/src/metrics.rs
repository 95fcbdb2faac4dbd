use super::Tier;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

/// Scans remembered for summaries; overflow drops the oldest.
const METRICS_CAPACITY: usize = 1024;
/// Interval between checkpoint log lines.
const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(60);

struct Scan {
    tier: Tier,
    wait: Duration,
    run: Duration,
    ok: bool,
}

/// Per-tier aggregate view of the metrics ring.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TierSummary {
    pub scans: usize,
    pub failures: usize,
    pub mean_wait: Duration,
    pub mean_run: Duration,
}

/// Lossy append-only scan telemetry.
///
/// Writers only push; the single consumer summarizes. Dropped samples
/// under pressure are acceptable.
#[derive(Default)]
pub struct Metrics {
    ring: Mutex<VecDeque<Scan>>,
    prior: Mutex<Option<(Instant, usize)>>,
    total: std::sync::atomic::AtomicUsize,
}

impl Metrics {
    pub fn record(&self, tier: Tier, wait: Duration, run: Duration, ok: bool) {
        self.total
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let mut ring = self.ring.lock().expect("metrics lock");
        if ring.len() == METRICS_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(Scan {
            tier,
            wait,
            run,
            ok,
        });
    }

    /// Scans recorded since startup.
    pub fn total(&self) -> usize {
        self.total.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn summary(&self, tier: Tier) -> TierSummary {
        let ring = self.ring.lock().expect("metrics lock");
        let scans = ring.iter().filter(|s| s.tier == tier).collect::<Vec<_>>();
        let n = scans.len();
        if n == 0 {
            return TierSummary::default();
        }
        TierSummary {
            scans: n,
            failures: scans.iter().filter(|s| !s.ok).count(),
            mean_wait: scans.iter().map(|s| s.wait).sum::<Duration>() / n as u32,
            mean_run: scans.iter().map(|s| s.run).sum::<Duration>() / n as u32,
        }
    }

    /// Periodic progress line, or None inside the log interval.
    pub fn checkpoint(&self) -> Option<String> {
        let mut prior = self.prior.lock().expect("metrics lock");
        let now = Instant::now();
        let current = self.total();
        match *prior {
            Some((at, _)) if now.duration_since(at) < METRICS_LOG_INTERVAL => None,
            Some((at, count)) => {
                let secs = now.duration_since(at).as_secs().max(1) as f64;
                let rate = (current - count) as f64 / secs;
                *prior = Some((now, current));
                Some(format!(
                    "{:<24}{:<24}{:<24}",
                    format!("scans {}", current),
                    format!("scans/sec {:.2}", rate),
                    format!(
                        "express wait {:?}",
                        self.summary(Tier::Express).mean_wait
                    ),
                ))
            }
            None => {
                *prior = Some((now, current));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_are_per_tier() {
        let metrics = Metrics::default();
        metrics.record(
            Tier::Express,
            Duration::from_millis(10),
            Duration::from_millis(100),
            true,
        );
        metrics.record(
            Tier::Express,
            Duration::from_millis(30),
            Duration::from_millis(200),
            false,
        );
        metrics.record(
            Tier::Background,
            Duration::from_millis(500),
            Duration::from_millis(100),
            true,
        );
        let express = metrics.summary(Tier::Express);
        assert_eq!(express.scans, 2);
        assert_eq!(express.failures, 1);
        assert_eq!(express.mean_wait, Duration::from_millis(20));
        assert_eq!(express.mean_run, Duration::from_millis(150));
        assert_eq!(metrics.summary(Tier::Standard), TierSummary::default());
        assert_eq!(metrics.total(), 3);
    }

    #[test]
    fn ring_is_bounded() {
        let metrics = Metrics::default();
        for _ in 0..METRICS_CAPACITY + 50 {
            metrics.record(Tier::Standard, Duration::ZERO, Duration::ZERO, true);
        }
        assert_eq!(metrics.summary(Tier::Standard).scans, METRICS_CAPACITY);
        assert_eq!(metrics.total(), METRICS_CAPACITY + 50);
    }

    #[test]
    fn first_checkpoint_only_arms_the_timer() {
        let metrics = Metrics::default();
        metrics.record(Tier::Express, Duration::ZERO, Duration::ZERO, true);
        assert!(metrics.checkpoint().is_none());
        assert!(metrics.checkpoint().is_none());
    }
}
