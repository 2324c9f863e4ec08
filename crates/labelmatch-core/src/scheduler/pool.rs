//! Worker cap sizing and the in-flight gauge.

use crate::config::SchedulerConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Number of workers allowed for `available` cores: `floor(available * fraction)`,
/// never less than one.
pub fn worker_cap(available: usize, fraction: f64) -> usize {
    let cap = (available as f64 * fraction).floor();
    if cap.is_finite() && cap >= 1.0 {
        cap as usize
    } else {
        1
    }
}

/// Cores the process may run on, or 1 when the platform cannot say.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Resolve the cap for a run. An explicit `max_workers` wins over the
/// core fraction.
pub fn resolve_cap(config: &SchedulerConfig) -> usize {
    match config.max_workers {
        Some(n) => n.max(1),
        None => worker_cap(available_parallelism(), config.cpu_fraction),
    }
}

/// Counts workers currently running and remembers the peak.
#[derive(Debug, Clone)]
pub(crate) struct InFlight {
    inner: Arc<Gauge>,
}

#[derive(Debug)]
struct Gauge {
    cap: usize,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            inner: Arc::new(Gauge {
                cap,
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Mark one worker as started. The worker is counted until the guard drops.
    pub(crate) fn enter(&self) -> InFlightGuard {
        let now = self.inner.current.fetch_add(1, Ordering::SeqCst) + 1;
        debug_assert!(
            now <= self.inner.cap,
            "{now} workers in flight with a cap of {}",
            self.inner.cap
        );
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            inner: self.inner.clone(),
        }
    }

    pub(crate) fn current(&self) -> usize {
        self.inner.current.load(Ordering::SeqCst)
    }

    pub(crate) fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub(crate) struct InFlightGuard {
    inner: Arc<Gauge>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.current.fetch_sub(1, Ordering::SeqCst);
    }
}
