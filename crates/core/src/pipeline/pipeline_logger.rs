use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for per-tick pipeline events.
///
/// Keeps stage timing and counters out of the orchestration code so the
/// CLI can aggregate them while tests stay silent.
pub trait PipelineLogger: Send {
    /// Mark the start of a tick for the given frame.
    fn tick(&mut self, frame_index: usize);

    /// Record how long a named stage took for one tick.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Count an event (e.g. crop failure, stale result).
    fn count(&mut self, name: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn tick(&mut self, _frame_index: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn count(&mut self, _name: &str) {}
}

/// Running aggregate of one stage's durations.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageStats {
    pub count: usize,
    pub total_ms: f64,
    pub max_ms: f64,
}

impl StageStats {
    fn record(&mut self, duration_ms: f64) {
        self.count += 1;
        self.total_ms += duration_ms;
        self.max_ms = self.max_ms.max(duration_ms);
    }

    pub fn avg_ms(&self) -> f64 {
        self.total_ms / self.count.max(1) as f64
    }
}

/// CLI logger that aggregates per-stage timing and event counts and
/// reports them through `log` when the session ends.
///
/// A running tick count is logged every `report_every` ticks at debug level.
/// Memory stays constant however long the session runs.
pub struct StdoutPipelineLogger {
    report_every: usize,
    timings: HashMap<String, StageStats>,
    counts: HashMap<String, usize>,
    start_time: Instant,
    ticks: usize,
}

impl StdoutPipelineLogger {
    pub fn new(report_every: usize) -> Self {
        Self {
            report_every: report_every.max(1),
            timings: HashMap::new(),
            counts: HashMap::new(),
            start_time: Instant::now(),
            ticks: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if nothing ran.
    pub fn summary_string(&self) -> Option<String> {
        if self.ticks == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let ticks = self.ticks;
        let mut lines = Vec::new();

        lines.push(format!(
            "Session summary ({ticks} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stats = &self.timings[stage];
            lines.push(format!(
                "  {stage:12}: avg {:6.1}ms  max {:6.1}ms",
                stats.avg_ms(),
                stats.max_ms
            ));
        }

        let mut names: Vec<_> = self.counts.keys().collect();
        names.sort();
        for name in names {
            lines.push(format!("  {name}: {}", self.counts[name]));
        }

        if elapsed_ms > 0.0 {
            let fps = ticks as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&StageStats> {
        self.timings.get(stage)
    }

    pub fn count_for(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn tick(&mut self, frame_index: usize) {
        self.ticks += 1;
        if self.ticks % self.report_every == 0 {
            log::debug!("Processed {} frames (current frame {frame_index})", self.ticks);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn count(&mut self, name: &str) {
        *self.counts.entry(name.to_string()).or_default() += 1;
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
