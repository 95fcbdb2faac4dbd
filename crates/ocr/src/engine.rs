use super::Backend;
use super::Metrics;
use super::Mode;
use super::Monitor;
use super::OcrOutput;
use mkw_core::MODE_BOOST;
use mkw_core::OcrTuning;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;
use tokio::sync::OwnedSemaphorePermit;
use tokio::sync::Semaphore;

/// Priority tier of an OCR submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Express,
    Standard,
    Background,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Express, Tier::Standard, Tier::Background];
    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Express => 0,
            Self::Standard => 1,
            Self::Background => 2,
        }
    }
    /// Lower-priority tiers this tier may borrow idle permits from.
    pub fn donors(&self) -> &'static [Tier] {
        match self {
            Self::Express => &[Tier::Standard, Tier::Background],
            Self::Standard => &[Tier::Background],
            Self::Background => &[],
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Express => f.write_str("express"),
            Self::Standard => f.write_str("standard"),
            Self::Background => f.write_str("background"),
        }
    }
}

/// Engine tuning resolved from [`OcrTuning`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub express: usize,
    pub standard: usize,
    pub background: usize,
    pub borrowing: bool,
    pub borrow_threshold: f64,
    pub adaptation: bool,
    pub window: Duration,
    pub timeout: Duration,
    pub bulk_threshold: usize,
    pub mode: Mode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&OcrTuning::default())
    }
}

impl From<&OcrTuning> for EngineConfig {
    fn from(tuning: &OcrTuning) -> Self {
        Self {
            express: tuning.express_permits,
            standard: tuning.standard_permits,
            background: tuning.background_permits,
            borrowing: tuning.borrowing,
            borrow_threshold: tuning.borrow_threshold,
            adaptation: tuning.adaptation,
            window: tuning.window,
            timeout: tuning.timeout,
            bulk_threshold: tuning.bulk_threshold,
            mode: tuning.mode.parse().unwrap_or(Mode::Balanced),
        }
    }
}

impl EngineConfig {
    /// Permit count configured for `tier` before any mode adjustment.
    pub fn permits(&self, tier: Tier) -> usize {
        match tier {
            Tier::Express => self.express,
            Tier::Standard => self.standard,
            Tier::Background => self.background,
        }
    }
    /// Tier for a bulk batch of `images` images. Single images are
    /// submitted at EXPRESS by their interactive call sites.
    pub fn bulk_tier(&self, images: usize) -> Tier {
        match images >= self.bulk_threshold {
            true => Tier::Background,
            false => Tier::Standard,
        }
    }
    /// Permit targets for a mode: favored tier raised by [`MODE_BOOST`],
    /// background never starved below one permit.
    pub(crate) fn targets(&self, mode: Mode) -> [usize; 3] {
        match mode {
            Mode::Balanced => [self.express, self.standard, self.background],
            Mode::SingleFocused => [
                self.express + MODE_BOOST,
                self.standard,
                self.background.saturating_sub(MODE_BOOST).max(1),
            ],
            Mode::BulkHeavy => [self.express, self.standard, self.background + MODE_BOOST],
        }
    }
}

struct TierState {
    semaphore: Arc<Semaphore>,
    configured: AtomicUsize,
}

impl TierState {
    fn new(permits: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            configured: AtomicUsize::new(permits),
        }
    }
    /// Fraction of configured permits currently held.
    fn utilization(&self) -> f64 {
        let configured = self.configured.load(Ordering::Relaxed);
        if configured == 0 {
            return 1.0;
        }
        let available = self.semaphore.available_permits().min(configured);
        1.0 - available as f64 / configured as f64
    }
}

/// Priority-scheduled OCR executor.
///
/// Holding a tier permit never blocks on another tier's permit: borrowing
/// uses non-blocking `try_acquire` against donors only, so strict mode
/// cannot deadlock across tiers.
pub struct Engine {
    backend: Arc<dyn Backend>,
    tiers: [TierState; 3],
    config: EngineConfig,
    metrics: Arc<Metrics>,
    monitor: Mutex<Monitor>,
}

impl Engine {
    pub fn new(backend: Arc<dyn Backend>, config: EngineConfig) -> Self {
        let monitor = Monitor::new(config.window, config.mode);
        let tiers = [
            TierState::new(config.targets(config.mode)[0]),
            TierState::new(config.targets(config.mode)[1]),
            TierState::new(config.targets(config.mode)[2]),
        ];
        Self {
            backend,
            tiers,
            config,
            metrics: Arc::new(Metrics::default()),
            monitor: Mutex::new(monitor),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
    /// Currently selected adaptive mode.
    pub fn mode(&self) -> Mode {
        self.monitor.lock().expect("monitor lock").mode()
    }
    /// Permits currently configured for `tier` (mode adjustments applied).
    pub fn permits(&self, tier: Tier) -> usize {
        self.tiers[tier.index()].configured.load(Ordering::Relaxed)
    }

    /// Run OCR on one image under `tier`'s scheduling rules.
    ///
    /// The returned future is safe to drop while waiting for a permit; a
    /// drop after dispatch lets the in-flight recognition finish on the
    /// blocking pool and discards its result. Timeouts (queue wait
    /// included) resolve to a `status: error("timeout")` output.
    pub async fn submit(&self, tier: Tier, image: Vec<u8>) -> OcrOutput {
        let submitted = Instant::now();
        let deadline = submitted + self.config.timeout;
        let permit = match tokio::time::timeout_at(deadline.into(), self.acquire(tier)).await {
            Ok(permit) => permit,
            Err(_) => {
                log::warn!("ocr wait budget exhausted ({})", tier);
                self.observe(tier, submitted.elapsed());
                return OcrOutput::error("timeout");
            }
        };
        let waited = submitted.elapsed();
        let backend = self.backend.clone();
        let work = tokio::task::spawn_blocking(move || backend.recognize(&image));
        let result = tokio::time::timeout_at(deadline.into(), work).await;
        drop(permit);
        let output = match result {
            Err(_) => OcrOutput::error("timeout"),
            Ok(Err(join)) => OcrOutput::error(format!("ocr worker failed: {}", join)),
            Ok(Ok(Err(backend))) => OcrOutput::error(backend.to_string()),
            Ok(Ok(Ok(boxes))) => OcrOutput::from_boxes(boxes),
        };
        self.metrics
            .record(tier, waited, submitted.elapsed() - waited, output.ok());
        self.observe(tier, waited);
        output
    }

    /// Take a permit for `tier`: own tier first, then an idle donor when
    /// borrowing is on, then queue on the own tier.
    async fn acquire(&self, tier: Tier) -> OwnedSemaphorePermit {
        let own = &self.tiers[tier.index()];
        if let Ok(permit) = own.semaphore.clone().try_acquire_owned() {
            return permit;
        }
        if self.config.borrowing {
            for donor in tier.donors() {
                let state = &self.tiers[donor.index()];
                if state.utilization() <= self.config.borrow_threshold {
                    if let Ok(permit) = state.semaphore.clone().try_acquire_owned() {
                        log::debug!("{} borrowing a {} permit", tier, donor);
                        return permit;
                    }
                }
            }
        }
        own.semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("tier semaphore closed")
    }

    fn observe(&self, tier: Tier, wait: Duration) {
        if !self.config.adaptation {
            return;
        }
        let mut monitor = self.monitor.lock().expect("monitor lock");
        monitor.observe(tier, wait, Instant::now());
    }

    /// Evaluate the usage window and apply a mode switch if the monitor
    /// has seen the trigger for two consecutive windows.
    pub fn adapt(&self) {
        if !self.config.adaptation {
            return;
        }
        let switched = {
            let mut monitor = self.monitor.lock().expect("monitor lock");
            monitor.evaluate(Instant::now())
        };
        if let Some(mode) = switched {
            log::info!("ocr engine switching to {} mode", mode);
            let targets = self.config.targets(mode);
            for tier in Tier::ALL {
                self.resize(tier, targets[tier.index()]);
            }
        }
    }

    fn resize(&self, tier: Tier, target: usize) {
        let state = &self.tiers[tier.index()];
        let current = state.configured.swap(target, Ordering::Relaxed);
        if target > current {
            state.semaphore.add_permits(target - current);
        } else {
            for _ in 0..current - target {
                let semaphore = state.semaphore.clone();
                tokio::spawn(async move {
                    semaphore
                        .acquire_owned()
                        .await
                        .expect("tier semaphore closed")
                        .forget();
                });
            }
        }
    }

    /// Spawn the periodic adaptation tick. One tick per window.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = self;
        let window = engine.config.window;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(window);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                engine.adapt();
                if let Some(line) = engine.metrics.checkpoint() {
                    log::info!("{}", line);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendError;
    use crate::OcrStatus;
    use crate::TextBox;
    use std::sync::atomic::AtomicUsize;

    /// Scripted backend: sleeps, then returns one box per configured name.
    struct Scripted {
        delay: Duration,
        names: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(delay: Duration, names: Vec<&'static str>) -> Self {
            Self {
                delay,
                names,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Backend for Scripted {
        fn recognize(&self, _image: &[u8]) -> Result<Vec<TextBox>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            Ok(self
                .names
                .iter()
                .enumerate()
                .map(|(i, name)| TextBox::new(name.to_string(), (0, i as i32 * 20, 80, 16), 92.0))
                .collect())
        }
    }

    struct Failing;
    impl Backend for Failing {
        fn recognize(&self, _image: &[u8]) -> Result<Vec<TextBox>, BackendError> {
            Err(BackendError::Process("boom".to_string()))
        }
    }

    fn config(express: usize, standard: usize, background: usize) -> EngineConfig {
        EngineConfig {
            express,
            standard,
            background,
            borrowing: true,
            borrow_threshold: 0.8,
            adaptation: false,
            window: Duration::from_secs(3600),
            timeout: Duration::from_secs(5),
            bulk_threshold: 10,
            mode: Mode::Balanced,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn express_borrows_idle_standard_permit() {
        let backend = Arc::new(Scripted::new(Duration::from_millis(300), vec!["Alpha 90"]));
        let engine = Arc::new(Engine::new(backend, config(1, 1, 1)));
        // Occupy BACKGROUND and EXPRESS.
        let bg = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.submit(Tier::Background, vec![]).await })
        };
        let ex = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.submit(Tier::Express, vec![]).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        // EXPRESS is saturated; STANDARD is idle at 0.0 utilization, so
        // this runs immediately on a borrowed STANDARD permit.
        let started = Instant::now();
        let out = engine.submit(Tier::Express, vec![]).await;
        assert!(out.ok());
        assert!(started.elapsed() < Duration::from_millis(450));
        // Borrowed permit went back to STANDARD.
        assert_eq!(engine.tiers[Tier::Standard.index()].semaphore.available_permits(), 1);
        bg.await.unwrap();
        ex.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn strict_tiers_queue_when_borrowing_disabled() {
        let backend = Arc::new(Scripted::new(Duration::from_millis(200), vec!["Alpha 90"]));
        let mut cfg = config(1, 1, 1);
        cfg.borrowing = false;
        let engine = Arc::new(Engine::new(backend, cfg));
        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.submit(Tier::Express, vec![]).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let started = Instant::now();
        let out = engine.submit(Tier::Express, vec![]).await;
        // Had to wait for the first express scan despite standard being idle.
        assert!(out.ok());
        assert!(started.elapsed() >= Duration::from_millis(100));
        first.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn background_never_borrows() {
        let backend = Arc::new(Scripted::new(Duration::from_millis(200), vec!["Alpha 90"]));
        let engine = Arc::new(Engine::new(backend, config(1, 1, 1)));
        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.submit(Tier::Background, vec![]).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let started = Instant::now();
        let out = engine.submit(Tier::Background, vec![]).await;
        assert!(out.ok());
        // Express and standard permits were free the whole time.
        assert!(started.elapsed() >= Duration::from_millis(100));
        first.await.unwrap();
    }

    #[tokio::test]
    async fn empty_output_is_tagged_empty() {
        let backend = Arc::new(Scripted::new(Duration::ZERO, vec![]));
        let engine = Engine::new(backend, config(1, 1, 1));
        let out = engine.submit(Tier::Express, vec![]).await;
        assert_eq!(out.status, OcrStatus::Empty);
    }

    #[tokio::test]
    async fn backend_error_is_tagged_error() {
        let engine = Engine::new(Arc::new(Failing), config(1, 1, 1));
        let out = engine.submit(Tier::Express, vec![]).await;
        match out.status {
            OcrStatus::Error(message) => assert!(message.contains("boom")),
            other => panic!("expected error status, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn budget_expiry_resolves_to_timeout_error() {
        let backend = Arc::new(Scripted::new(Duration::from_millis(400), vec!["Alpha 90"]));
        let mut cfg = config(1, 1, 1);
        cfg.timeout = Duration::from_millis(50);
        let engine = Engine::new(backend, cfg);
        let out = engine.submit(Tier::Express, vec![]).await;
        assert_eq!(out.status, OcrStatus::Error("timeout".to_string()));
    }

    #[test]
    fn bulk_tier_threshold() {
        let cfg = config(4, 2, 1);
        assert_eq!(cfg.bulk_tier(2), Tier::Standard);
        assert_eq!(cfg.bulk_tier(9), Tier::Standard);
        assert_eq!(cfg.bulk_tier(10), Tier::Background);
        assert_eq!(cfg.bulk_tier(100), Tier::Background);
    }

    #[test]
    fn mode_targets_respect_background_floor() {
        let cfg = config(4, 2, 1);
        assert_eq!(cfg.targets(Mode::Balanced), [4, 2, 1]);
        assert_eq!(cfg.targets(Mode::SingleFocused), [6, 2, 1]);
        assert_eq!(cfg.targets(Mode::BulkHeavy), [4, 2, 3]);
    }
}
