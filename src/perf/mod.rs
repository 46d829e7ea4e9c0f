/// Performance measurement utilities
/// Culling stages can be timed and logged through `tracing` for optimization analysis
pub mod profiling;

pub use profiling::{CounterSnapshot, CullCounters};

use std::time::{Duration, Instant};

pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        tracing::debug!(target: "occlusion_culler::perf", scope = self.name, elapsed_us = elapsed.as_micros() as u64);
    }
}

/// Time the rest of the enclosing scope (only when profiling feature is enabled)
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        #[cfg(feature = "profiling")]
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}
