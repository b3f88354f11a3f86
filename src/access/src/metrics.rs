//! Scope resolution metrics

use crate::types::AccessLevel;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Scope resolver counters and latency summary
#[derive(Debug, Clone, Default)]
pub struct ScopeMetrics {
    /// Total scope resolutions
    pub total_resolutions: u64,

    /// Resolutions per enforced access level
    pub resolutions_by_level: HashMap<AccessLevel, u64>,

    /// Resolutions answered by the wildcard or an `all` level
    pub full_access_shortcuts: u64,

    /// Missing or unrecognized level configuration replaced by `own`
    pub defaulted_levels: u64,

    /// Filters compiled to the fail-closed predicate
    pub fail_closed_filters: u64,

    /// Resolutions that failed
    pub error_count: u64,

    /// Latency summary
    pub avg_latency_ms: f64,
    pub latency_p50_ms: f64,
    pub latency_p99_ms: f64,
}

impl ScopeMetrics {
    /// Resolutions recorded at a level
    pub fn resolutions_at(&self, level: AccessLevel) -> u64 {
        self.resolutions_by_level.get(&level).copied().unwrap_or(0)
    }

    /// Fraction of resolutions that failed
    pub fn error_rate(&self) -> f64 {
        let total = self.total_resolutions + self.error_count;
        if total == 0 {
            0.0
        } else {
            self.error_count as f64 / total as f64
        }
    }
}

/// Metrics collector shared by concurrent requests
pub struct MetricsCollector {
    metrics: Arc<RwLock<ScopeMetrics>>,

    /// Recent latency samples for percentile calculation
    latency_samples: Arc<RwLock<Vec<f64>>>,

    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(ScopeMetrics::default())),
            latency_samples: Arc::new(RwLock::new(Vec::with_capacity(10_000))),
            max_samples: 10_000,
        }
    }

    /// Record a completed resolution
    pub async fn record_resolution(&self, level: AccessLevel, full_access: bool, defaulted: bool) {
        let mut metrics = self.metrics.write().await;
        metrics.total_resolutions += 1;
        *metrics.resolutions_by_level.entry(level).or_insert(0) += 1;

        if full_access {
            metrics.full_access_shortcuts += 1;
        }
        if defaulted {
            metrics.defaulted_levels += 1;
        }
    }

    /// Record a filter that matches nothing
    pub async fn record_fail_closed(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.fail_closed_filters += 1;
    }

    /// Record a failed resolution
    pub async fn record_error(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.error_count += 1;
    }

    /// Record resolution latency
    pub async fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.write().await;
        samples.push(latency_ms);

        // Keep only recent samples
        if samples.len() > self.max_samples {
            samples.drain(0..1_000);
        }

        let mut sorted = samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut metrics = self.metrics.write().await;
        metrics.avg_latency_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
        metrics.latency_p50_ms = Self::percentile(&sorted, 0.50);
        metrics.latency_p99_ms = Self::percentile(&sorted, 0.99);
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> ScopeMetrics {
        self.metrics.read().await.clone()
    }

    /// Reset all counters and samples
    pub async fn reset(&self) {
        *self.metrics.write().await = ScopeMetrics::default();
        self.latency_samples.write().await.clear();
    }

    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }
        let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
