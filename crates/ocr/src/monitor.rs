use super::Tier;
use std::collections::VecDeque;
use std::time::Duration;
use std::time::Instant;

/// Adaptive scheduling mode selected from recent workload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    SingleFocused,
    BulkHeavy,
    Balanced,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleFocused => f.write_str("single_focused"),
            Self::BulkHeavy => f.write_str("bulk_heavy"),
            Self::Balanced => f.write_str("balanced"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single_focused" => Ok(Self::SingleFocused),
            "bulk_heavy" => Ok(Self::BulkHeavy),
            "balanced" => Ok(Self::Balanced),
            other => Err(format!("unknown ocr mode {}", other)),
        }
    }
}

/// Minimum submissions in a window before the shape is trusted.
const MIN_SAMPLES: usize = 10;
/// Express share of submissions above which the workload reads as
/// interactive; below one minus this, as bulk.
const SHARE_TRIGGER: f64 = 0.7;
/// Consecutive windows a trigger must hold before the mode switches.
const HYSTERESIS_WINDOWS: u8 = 2;
/// Bounded sample ring; overflow drops the oldest observation.
const RING_CAPACITY: usize = 4096;

struct Sample {
    tier: Tier,
    wait: Duration,
    at: Instant,
}

/// Rolling-window workload monitor with hysteretic mode selection.
///
/// Append-only ring with one consumer ([`Monitor::evaluate`]); old
/// samples may be dropped under pressure, a lossy read is fine here.
pub struct Monitor {
    window: Duration,
    samples: VecDeque<Sample>,
    mode: Mode,
    candidate: Mode,
    streak: u8,
}

impl Monitor {
    pub fn new(window: Duration, mode: Mode) -> Self {
        Self {
            window,
            samples: VecDeque::with_capacity(RING_CAPACITY),
            mode,
            candidate: mode,
            streak: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn observe(&mut self, tier: Tier, wait: Duration, at: Instant) {
        if self.samples.len() == RING_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample { tier, wait, at });
    }

    /// Close one observation window. Returns the new mode when a trigger
    /// has held for [`HYSTERESIS_WINDOWS`] consecutive evaluations.
    pub fn evaluate(&mut self, now: Instant) -> Option<Mode> {
        let cutoff = now.checked_sub(self.window);
        self.samples
            .retain(|s| cutoff.is_none_or(|earliest| s.at >= earliest));
        let trigger = self.shape();
        if trigger == self.mode {
            self.candidate = self.mode;
            self.streak = 0;
            return None;
        }
        if trigger == self.candidate {
            self.streak += 1;
        } else {
            self.candidate = trigger;
            self.streak = 1;
        }
        if self.streak >= HYSTERESIS_WINDOWS {
            self.mode = trigger;
            self.streak = 0;
            return Some(trigger);
        }
        None
    }

    /// Workload shape of the current window.
    fn shape(&self) -> Mode {
        let total = self.samples.len();
        if total < MIN_SAMPLES {
            return Mode::Balanced;
        }
        let express = self
            .samples
            .iter()
            .filter(|s| matches!(s.tier, Tier::Express))
            .count();
        let share = express as f64 / total as f64;
        if share >= SHARE_TRIGGER {
            Mode::SingleFocused
        } else if share <= 1.0 - SHARE_TRIGGER {
            Mode::BulkHeavy
        } else {
            Mode::Balanced
        }
    }

    /// Mean queue wait over the current window, per tier class.
    pub fn mean_waits(&self) -> (Duration, Duration) {
        let mean = |tiers: &[Tier]| {
            let waits = self
                .samples
                .iter()
                .filter(|s| tiers.contains(&s.tier))
                .map(|s| s.wait)
                .collect::<Vec<_>>();
            match waits.len() {
                0 => Duration::ZERO,
                n => waits.iter().sum::<Duration>() / n as u32,
            }
        };
        (
            mean(&[Tier::Express]),
            mean(&[Tier::Standard, Tier::Background]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(monitor: &mut Monitor, tier: Tier, count: usize, at: Instant) {
        for _ in 0..count {
            monitor.observe(tier, Duration::from_millis(5), at);
        }
    }

    #[test]
    fn needs_two_windows_before_switching() {
        let now = Instant::now();
        let mut monitor = Monitor::new(Duration::from_secs(3600), Mode::Balanced);
        feed(&mut monitor, Tier::Express, 20, now);
        assert_eq!(monitor.evaluate(now), None);
        assert_eq!(monitor.mode(), Mode::Balanced);
        feed(&mut monitor, Tier::Express, 20, now);
        assert_eq!(monitor.evaluate(now), Some(Mode::SingleFocused));
        assert_eq!(monitor.mode(), Mode::SingleFocused);
    }

    #[test]
    fn interrupted_streak_resets() {
        let now = Instant::now();
        let mut monitor = Monitor::new(Duration::from_secs(3600), Mode::Balanced);
        feed(&mut monitor, Tier::Express, 20, now);
        assert_eq!(monitor.evaluate(now), None);
        // A bulk-shaped window breaks the single_focused streak.
        feed(&mut monitor, Tier::Background, 60, now);
        assert_eq!(monitor.evaluate(now), None);
        feed(&mut monitor, Tier::Express, 200, now);
        assert_eq!(monitor.evaluate(now), None);
        assert_eq!(monitor.mode(), Mode::Balanced);
    }

    #[test]
    fn bulk_heavy_trigger() {
        let now = Instant::now();
        let mut monitor = Monitor::new(Duration::from_secs(3600), Mode::Balanced);
        for _ in 0..2 {
            feed(&mut monitor, Tier::Background, 15, now);
            feed(&mut monitor, Tier::Standard, 5, now);
            feed(&mut monitor, Tier::Express, 2, now);
        }
        assert_eq!(monitor.evaluate(now), None);
        assert_eq!(monitor.evaluate(now), Some(Mode::BulkHeavy));
    }

    #[test]
    fn sparse_windows_read_as_balanced() {
        let now = Instant::now();
        let mut monitor = Monitor::new(Duration::from_secs(3600), Mode::Balanced);
        feed(&mut monitor, Tier::Express, 3, now);
        assert_eq!(monitor.evaluate(now), None);
        assert_eq!(monitor.mode(), Mode::Balanced);
    }

    #[test]
    fn old_samples_age_out() {
        let start = Instant::now();
        let mut monitor = Monitor::new(Duration::from_secs(60), Mode::Balanced);
        feed(&mut monitor, Tier::Express, 20, start);
        let later = start + Duration::from_secs(120);
        assert_eq!(monitor.evaluate(later), None);
        assert_eq!(monitor.mean_waits(), (Duration::ZERO, Duration::ZERO));
    }

    #[test]
    fn ring_is_bounded() {
        let now = Instant::now();
        let mut monitor = Monitor::new(Duration::from_secs(3600), Mode::Balanced);
        feed(&mut monitor, Tier::Express, RING_CAPACITY + 100, now);
        assert_eq!(monitor.samples.len(), RING_CAPACITY);
    }

    #[test]
    fn mode_strings_round_trip() {
        for mode in [Mode::SingleFocused, Mode::BulkHeavy, Mode::Balanced] {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
        assert!("turbo".parse::<Mode>().is_err());
    }
}
