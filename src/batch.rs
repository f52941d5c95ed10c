//! Parallel processing of the subjects of a partition.
//!
//! Subjects are independent: each one reads its own stays table and writes
//! output files whose names are unique to the subject. They are processed on
//! a local Rayon pool and the outcomes are collected in input order, so the
//! manifest never depends on thread scheduling.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    BatchProcessor                               │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                 Rayon Thread Pool (local)                 │  │
//! │  │                                                           │  │
//! │  │  Subject 10006   Subject 10011   Subject N                │  │
//! │  │       │               │              │                    │  │
//! │  │       ▼               ▼              ▼                    │  │
//! │  │  StayProcessor   StayProcessor   StayProcessor  (shared)  │  │
//! │  │       │               │              │                    │  │
//! │  │  [outcomes]      [outcomes]      [outcomes]               │  │
//! │  └───────────────────────┬───────────────────────────────────┘  │
//! │                          ▼  (input order)                       │
//! │                     BatchOutput                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use decompensation_builder::batch::{BatchConfig, BatchProcessor};
//!
//! let processor = BatchProcessor::new(StayProcessor::default(), BatchConfig::new().with_threads(8));
//! let output = processor.process_subjects(&source, "train", &subjects, &exporter)?;
//! println!("{} accepted, {} skipped", output.accepted_count(), output.skipped_count());
//! ```
//!
//! The first fatal error aborts the partition; skips never do.

use crate::error::{DatasetError, Result};
use crate::export::{SampleTriple, TimelineExporter};
use crate::processor::{SkipDiagnostic, StayOutcome, StayProcessor};
use crate::source::{StaySource, SubjectStays};
use rayon::prelude::*;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for parallel subject processing.
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    /// Number of threads to use.
    ///
    /// - `None`: Use Rayon default (typically num_cpus)
    /// - `Some(n)`: Use exactly n threads
    pub num_threads: Option<usize>,

    /// Install a [`ConsoleProgress`] reporter.
    pub report_progress: bool,
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of threads to use.
    ///
    /// # Panics
    ///
    /// Panics if threads is 0.
    pub fn with_threads(mut self, threads: usize) -> Self {
        assert!(threads > 0, "Thread count must be > 0");
        self.num_threads = Some(threads);
        self
    }

    /// Enable or disable console progress reporting.
    pub fn with_progress(mut self, report: bool) -> Self {
        self.report_progress = report;
        self
    }

    /// Configured threads or Rayon's default.
    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(rayon::current_num_threads)
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcomes of one partition, in subject then episode order.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub partition: String,
    pub outcomes: Vec<StayOutcome>,
    pub subjects_processed: usize,

    /// Wall clock time.
    pub elapsed: Duration,
    pub threads_used: usize,
}

impl BatchOutput {
    pub fn accepted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.accepted_count()
    }

    /// Accepted samples, in processing order.
    pub fn samples(&self) -> impl Iterator<Item = &SampleTriple> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            StayOutcome::Accepted(sample) => Some(sample),
            StayOutcome::Skipped(_) => None,
        })
    }

    pub fn skips(&self) -> impl Iterator<Item = &SkipDiagnostic> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            StayOutcome::Skipped(skip) => Some(skip),
            StayOutcome::Accepted(_) => None,
        })
    }

    /// Split into accepted samples and skip diagnostics.
    pub fn into_parts(self) -> (Vec<SampleTriple>, Vec<SkipDiagnostic>) {
        let mut samples = Vec::new();
        let mut skips = Vec::new();
        for outcome in self.outcomes {
            match outcome {
                StayOutcome::Accepted(sample) => samples.push(sample),
                StayOutcome::Skipped(skip) => skips.push(skip),
            }
        }
        (samples, skips)
    }
}

// ============================================================================
// Progress Reporting
// ============================================================================

/// Progress information for callbacks.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub partition: String,

    /// Subject about to be processed.
    pub current_subject: String,
    pub total_subjects: usize,

    /// Subjects finished so far.
    pub completed: usize,

    /// Elapsed time since start.
    pub elapsed: Duration,
}

impl ProgressInfo {
    /// Completion percentage (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        if self.total_subjects == 0 {
            100.0
        } else {
            self.completed as f64 / self.total_subjects as f64 * 100.0
        }
    }

    /// Estimate remaining time based on current progress.
    pub fn estimated_remaining(&self) -> Option<Duration> {
        if self.completed == 0 {
            return None;
        }
        let remaining = self.total_subjects.saturating_sub(self.completed);
        let avg_time = self.elapsed.as_secs_f64() / self.completed as f64;
        Some(Duration::from_secs_f64(avg_time * remaining as f64))
    }
}

/// Receives progress updates while a partition is processed.
///
/// Called from worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Called when starting a subject.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called once the partition completes.
    fn on_complete(&self, output: &BatchOutput);
}

/// Single-line console progress reporter.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl ConsoleProgress {
    pub fn new() -> Self {
        Self
    }

    fn status_line(info: &ProgressInfo) -> String {
        let eta = match info.estimated_remaining() {
            Some(remaining) => format!("{}s", remaining.as_secs()),
            None => "?".to_string(),
        };
        format!(
            "Iterating over patients in {}: [{:5}/{:5}] {:.1}% (ETA {})",
            info.partition,
            info.completed,
            info.total_subjects,
            info.percent_complete(),
            eta
        )
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        print!("\r{}", Self::status_line(info));
        std::io::stdout().flush().ok();
    }

    fn on_complete(&self, output: &BatchOutput) {
        println!();
        println!(
            "  {}: {} subjects, {} accepted, {} skipped in {:?} ({} threads)",
            output.partition,
            output.subjects_processed,
            output.accepted_count(),
            output.skipped_count(),
            output.elapsed,
            output.threads_used
        );
    }
}

// ============================================================================
// Batch Processor
// ============================================================================

/// Runs a [`StayProcessor`] over the subjects of a partition in parallel.
///
/// The processor is shared read-only across threads; no mutable state
/// crosses subjects.
pub struct BatchProcessor {
    processor: StayProcessor,
    batch_config: BatchConfig,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl BatchProcessor {
    /// Create a batch processor.
    ///
    /// A [`ConsoleProgress`] reporter is installed when
    /// `batch_config.report_progress` is set.
    pub fn new(processor: StayProcessor, batch_config: BatchConfig) -> Self {
        let progress_callback: Option<Arc<dyn ProgressCallback>> = if batch_config.report_progress
        {
            Some(Arc::new(ConsoleProgress::new()))
        } else {
            None
        };
        Self {
            processor,
            batch_config,
            progress_callback,
        }
    }

    /// Replace the progress callback.
    pub fn with_progress_callback(mut self, callback: Box<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(Arc::from(callback));
        self
    }

    pub fn batch_config(&self) -> &BatchConfig {
        &self.batch_config
    }

    pub fn processor(&self) -> &StayProcessor {
        &self.processor
    }

    /// Process `subjects` and return their outcomes in input order.
    pub fn process_subjects<S: StaySource + ?Sized>(
        &self,
        source: &S,
        partition: &str,
        subjects: &[SubjectStays],
        exporter: &TimelineExporter,
    ) -> Result<BatchOutput> {
        let start = Instant::now();
        let total_subjects = subjects.len();
        let threads_used = self.batch_config.effective_threads();
        let completed = AtomicUsize::new(0);

        // Local pool: build_global() only works once per process.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads_used)
            .build()
            .map_err(|e| DatasetError::generic(format!("Failed to create thread pool: {}", e)))?;

        let per_subject: Vec<Vec<StayOutcome>> = pool.install(|| {
            subjects
                .par_iter()
                .map(|subject| -> Result<Vec<StayOutcome>> {
                    if let Some(ref callback) = self.progress_callback {
                        callback.on_progress(&ProgressInfo {
                            partition: partition.to_string(),
                            current_subject: subject.subject.clone(),
                            total_subjects,
                            completed: completed.load(Ordering::Relaxed),
                            elapsed: start.elapsed(),
                        });
                    }
                    let outcomes = self
                        .processor
                        .process_subject(source, partition, subject, exporter)?;
                    completed.fetch_add(1, Ordering::Relaxed);
                    Ok(outcomes)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let output = BatchOutput {
            partition: partition.to_string(),
            outcomes: per_subject.into_iter().flatten().collect(),
            subjects_processed: total_subjects,
            elapsed: start.elapsed(),
            threads_used,
        };

        if let Some(ref callback) = self.progress_callback {
            callback.on_complete(&output);
        }

        Ok(output)
    }
}

// ============================================================================
// Tests
// ============================================================================
