/// Instrumentation counters for the culling pipeline
/// Counters are per context and only incremented when the `profiling` feature is enabled

/// Plain event counters owned by one occlusion context.
///
/// A context is single-threaded, so these are ordinary integers; independent contexts keep
/// independent counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullCounters {
    // Submission
    pub surfaces: u64,
    pub triangles_submitted: u64,

    // Clipping
    pub triangles_rejected: u64,
    pub triangles_clipped: u64,
    pub clip_emitted: u64,

    // Setup and rasterization
    pub triangles_backfacing: u64,
    pub triangles_rasterized: u64,
    pub records_visited: u64,
    pub records_updated: u64,
    pub records_depth_rejected: u64,

    // Queries
    pub occludee_early_exits: u64,
    pub rect_tests: u64,

    pub clears: u64,
}

impl CullCounters {
    pub const fn new() -> Self {
        Self {
            surfaces: 0,
            triangles_submitted: 0,
            triangles_rejected: 0,
            triangles_clipped: 0,
            clip_emitted: 0,
            triangles_backfacing: 0,
            triangles_rasterized: 0,
            records_visited: 0,
            records_updated: 0,
            records_depth_rejected: 0,
            occludee_early_exits: 0,
            rect_tests: 0,
            clears: 0,
        }
    }

    /// Reset all counters to zero
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot { counters: *self }
    }
}

/// Counter values at a point in time, detached from the context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub counters: CullCounters,
}

impl CounterSnapshot {
    /// Sum of several snapshots, e.g. one per worker context
    pub fn merged<'a>(snapshots: impl IntoIterator<Item = &'a CounterSnapshot>) -> Self {
        let mut total = CullCounters::new();
        for s in snapshots {
            let c = &s.counters;
            total.surfaces += c.surfaces;
            total.triangles_submitted += c.triangles_submitted;
            total.triangles_rejected += c.triangles_rejected;
            total.triangles_clipped += c.triangles_clipped;
            total.clip_emitted += c.clip_emitted;
            total.triangles_backfacing += c.triangles_backfacing;
            total.triangles_rasterized += c.triangles_rasterized;
            total.records_visited += c.records_visited;
            total.records_updated += c.records_updated;
            total.records_depth_rejected += c.records_depth_rejected;
            total.occludee_early_exits += c.occludee_early_exits;
            total.rect_tests += c.rect_tests;
            total.clears += c.clears;
        }
        Self { counters: total }
    }

    /// Print formatted report
    pub fn print_report(&self) {
        let c = &self.counters;
        println!("\n=== Culling Counters Report ===");
        println!("\nSubmission:");
        println!("  surfaces:                   {:12}", c.surfaces);
        println!("  triangles submitted:        {:12}", c.triangles_submitted);

        println!("\nClipping:");
        println!("  trivially rejected:         {:12}", c.triangles_rejected);
        println!("  clipped:                    {:12}", c.triangles_clipped);
        println!("  emitted by clipping:        {:12}", c.clip_emitted);

        println!("\nRasterization:");
        println!("  backfacing / degenerate:    {:12}", c.triangles_backfacing);
        println!("  rasterized:                 {:12}", c.triangles_rasterized);
        println!("  tile records visited:       {:12}", c.records_visited);
        println!("  tile records updated:       {:12}", c.records_updated);
        println!("  depth rejected:             {:12}", c.records_depth_rejected);
        if c.records_visited > 0 {
            let reject_rate = (c.records_depth_rejected as f64 / c.records_visited as f64) * 100.0;
            println!("  depth reject rate:          {:11.2}%", reject_rate);
        }

        println!("\nQueries:");
        println!("  occludee early exits:       {:12}", c.occludee_early_exits);
        println!("  rect tests:                 {:12}", c.rect_tests);
        println!("  clears:                     {:12}", c.clears);

        println!();
    }
}

/// Increment a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count {
    ($counter:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter += 1;
        }
        #[cfg(not(feature = "profiling"))]
        {
            let _ = &$counter;
        }
    };
}

/// Add to a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_add {
    ($counter:expr, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter += $value as u64;
        }
        #[cfg(not(feature = "profiling"))]
        {
            let _ = (&$counter, &$value);
        }
    };
}

/// Hardware performance counter wrapper for benchmarking
#[cfg(all(feature = "profiling", target_os = "linux"))]
pub mod hardware {
    use perf_event::events::Hardware;
    use perf_event::{Builder, Counter};

    const EVENTS: [Hardware; 6] = [
        Hardware::CPU_CYCLES,
        Hardware::INSTRUCTIONS,
        Hardware::CACHE_REFERENCES,
        Hardware::CACHE_MISSES,
        Hardware::BRANCH_INSTRUCTIONS,
        Hardware::BRANCH_MISSES,
    ];

    /// One optional counter per event; events the kernel refuses stay `None` and read as 0
    pub struct PerfCounters {
        counters: [Option<Counter>; 6],
    }

    impl Default for PerfCounters {
        fn default() -> Self {
            Self::new()
        }
    }

    impl PerfCounters {
        pub fn new() -> Self {
            Self {
                counters: EVENTS.map(|event| Builder::new().kind(event).build().ok()),
            }
        }

        pub fn enable_all(&mut self) {
            for c in self.counters.iter_mut().flatten() {
                let _ = c.enable();
            }
        }

        pub fn disable_all(&mut self) {
            for c in self.counters.iter_mut().flatten() {
                let _ = c.disable();
            }
        }

        pub fn reset_all(&mut self) {
            for c in self.counters.iter_mut().flatten() {
                let _ = c.reset();
            }
        }

        pub fn read_all(&mut self) -> PerfSnapshot {
            let [cpu_cycles, instructions, cache_references, cache_misses, branch_instructions, branch_misses] =
                self.counters
                    .each_mut()
                    .map(|c| c.as_mut().and_then(|c| c.read().ok()).unwrap_or(0));

            PerfSnapshot {
                cpu_cycles,
                instructions,
                cache_references,
                cache_misses,
                branch_instructions,
                branch_misses,
            }
        }
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct PerfSnapshot {
        pub cpu_cycles: u64,
        pub instructions: u64,
        pub cache_references: u64,
        pub cache_misses: u64,
        pub branch_instructions: u64,
        pub branch_misses: u64,
    }

    impl PerfSnapshot {
        pub fn print_report(&self) {
            println!("\n=== Hardware Performance Counters ===");
            println!("CPU Cycles:            {:16}", self.cpu_cycles);
            println!("Instructions:          {:16}", self.instructions);
            if self.cpu_cycles > 0 {
                println!("IPC:                   {:16.3}", self.instructions as f64 / self.cpu_cycles as f64);
            }

            println!("Cache References:      {:16}", self.cache_references);
            println!("Cache Misses:          {:16}", self.cache_misses);
            if self.cache_references > 0 {
                let miss_rate = self.cache_misses as f64 / self.cache_references as f64 * 100.0;
                println!("Cache Miss Rate:       {:15.2}%", miss_rate);
            }

            println!("Branch Instructions:   {:16}", self.branch_instructions);
            println!("Branch Misses:         {:16}", self.branch_misses);
            if self.branch_instructions > 0 {
                let miss_rate = self.branch_misses as f64 / self.branch_instructions as f64 * 100.0;
                println!("Branch Miss Rate:      {:15.2}%", miss_rate);
            }
            println!();
        }
    }
}
