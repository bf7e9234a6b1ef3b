//! Progress tracking and callbacks for registration stages.
//!
//! Training always runs its configured number of iterations; callbacks only
//! observe it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Progress information for training iterations.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which fit is running, e.g. `"affine/linear"`.
    pub phase: String,
    /// Current iteration number (1-based).
    pub iteration: usize,
    /// Total number of iterations (if known).
    pub total_iterations: Option<usize>,
    /// Summed batch loss of this iteration.
    pub loss: f64,
    /// Time elapsed since start.
    pub elapsed: Duration,
    /// Estimated remaining time.
    pub estimated_remaining: Option<Duration>,
    /// Current learning rate.
    pub learning_rate: f64,
}

impl ProgressInfo {
    /// Create new progress information.
    pub fn new(
        phase: impl Into<String>,
        iteration: usize,
        total_iterations: Option<usize>,
        loss: f64,
        elapsed: Duration,
        learning_rate: f64,
    ) -> Self {
        Self {
            phase: phase.into(),
            iteration,
            total_iterations,
            loss,
            elapsed,
            estimated_remaining: None,
            learning_rate,
        }
    }

    /// Calculate progress percentage.
    pub fn progress_percent(&self) -> Option<f64> {
        self.total_iterations
            .filter(|&total| total > 0)
            .map(|total| (self.iteration as f64 / total as f64) * 100.0)
    }

    /// Calculate estimated remaining time.
    pub fn calculate_remaining(&mut self) {
        if let Some(total) = self.total_iterations {
            if self.iteration > 0 {
                let avg_time_per_iter = self.elapsed.as_secs_f64() / self.iteration as f64;
                let remaining_iters = total.saturating_sub(self.iteration);
                self.estimated_remaining =
                    Some(Duration::from_secs_f64(avg_time_per_iter * remaining_iters as f64));
            }
        }
    }
}

/// Progress callback trait for monitoring training.
pub trait ProgressCallback: Send + Sync {
    /// Called at each iteration with progress information.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called when a fit starts.
    fn on_start(&self, _phase: &str) {}

    /// Called when a fit completes.
    fn on_complete(&self, _info: &ProgressInfo) {}

    /// Called when a fit fails.
    fn on_error(&self, _error: &str) {}
}

/// Console progress callback that logs to tracing.
#[derive(Debug, Clone)]
pub struct ConsoleProgressCallback {
    /// Log interval (iterations).
    pub log_interval: usize,
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self { log_interval: 50 }
    }
}

impl ConsoleProgressCallback {
    /// Create a new console progress callback.
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.iteration % self.log_interval == 0 || info.total_iterations == Some(info.iteration) {
            let remaining = info
                .estimated_remaining
                .map(|d| format!("{:.2}s", d.as_secs_f64()))
                .unwrap_or_else(|| "N/A".to_string());

            tracing::info!(
                "[{}] Iter {}/{} ({:.1}%) | Loss: {:.6} | LR: {:.2e} | Elapsed: {:.2}s | ETA: {}",
                info.phase,
                info.iteration,
                info.total_iterations
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                info.progress_percent().unwrap_or(0.0),
                info.loss,
                info.learning_rate,
                info.elapsed.as_secs_f64(),
                remaining
            );
        }
    }

    fn on_start(&self, phase: &str) {
        tracing::info!("[{}] training started", phase);
    }

    fn on_complete(&self, info: &ProgressInfo) {
        tracing::info!(
            "[{}] training completed in {:.2}s with final loss: {:.6}",
            info.phase,
            info.elapsed.as_secs_f64(),
            info.loss
        );
    }

    fn on_error(&self, error: &str) {
        tracing::error!("Training failed: {}", error);
    }
}

/// History callback that records all progress information.
#[derive(Debug, Clone, Default)]
pub struct HistoryCallback {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl HistoryCallback {
    /// Create a new history callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the recorded history.
    pub fn get_history(&self) -> Vec<ProgressInfo> {
        lock(&self.history).clone()
    }

    /// Loss of every recorded iteration, in order.
    pub fn losses(&self) -> Vec<f64> {
        lock(&self.history).iter().map(|info| info.loss).collect()
    }

    /// Clear the history.
    pub fn clear(&self) {
        lock(&self.history).clear();
    }
}

impl ProgressCallback for HistoryCallback {
    fn on_progress(&self, info: &ProgressInfo) {
        lock(&self.history).push(info.clone());
    }
}

/// Progress tracker that manages multiple callbacks.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    phase: String,
    start_time: Arc<Mutex<Option<Instant>>>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("callbacks", &self.callbacks.len())
            .field("phase", &self.phase)
            .finish()
    }
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback.
    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    /// Copy of this tracker reporting under another phase label.
    pub fn for_phase(&self, phase: impl Into<String>) -> Self {
        Self {
            callbacks: self.callbacks.clone(),
            phase: phase.into(),
            start_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Get the phase label.
    pub fn phase(&self) -> &str {
        &self.phase
    }

    fn elapsed(&self) -> Duration {
        lock(&self.start_time)
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Start tracking.
    pub fn start(&self) {
        *lock(&self.start_time) = Some(Instant::now());
        for callback in &self.callbacks {
            callback.on_start(&self.phase);
        }
    }

    /// Update progress.
    pub fn update(&self, iteration: usize, total_iterations: Option<usize>, loss: f64, learning_rate: f64) {
        let mut info = ProgressInfo::new(
            self.phase.clone(),
            iteration,
            total_iterations,
            loss,
            self.elapsed(),
            learning_rate,
        );
        info.calculate_remaining();

        for callback in &self.callbacks {
            callback.on_progress(&info);
        }
    }

    /// Complete tracking.
    pub fn complete(&self, iterations: usize, final_loss: f64, learning_rate: f64) {
        let info = ProgressInfo::new(
            self.phase.clone(),
            iterations,
            Some(iterations),
            final_loss,
            self.elapsed(),
            learning_rate,
        );

        for callback in &self.callbacks {
            callback.on_complete(&info);
        }
    }

    /// Report error.
    pub fn error(&self, error: &str) {
        for callback in &self.callbacks {
            callback.on_error(error);
        }
    }
}
