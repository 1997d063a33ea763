use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::error::ErrorKind;

const LATENCY_CAPACITY: usize = 1000;

/// プロセス内メトリクス収集器
pub struct Metrics {
    counters: Mutex<MetricsCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct MetricsCounters {
    photos_received: u64,
    generations_requested: u64,
    generations_succeeded: u64,
    enhancer_fallbacks: u64,
    errors_content_policy: u64,
    errors_quota: u64,
    errors_upstream: u64,
    errors_malformed: u64,
    errors_prompt_too_long: u64,
    errors_unclassified: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub phase: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー（終了時ログ用）
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub photos_received: u64,
    pub generations_requested: u64,
    pub generations_succeeded: u64,
    pub enhancer_fallbacks: u64,
    pub error_counts: ErrorCounts,
    pub avg_latency_ms: AvgLatency,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorCounts {
    pub content_policy: u64,
    pub quota: u64,
    pub upstream_unavailable: u64,
    pub malformed_response: u64,
    pub prompt_too_long: u64,
    pub unclassified: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvgLatency {
    pub enhance: Option<f64>,
    pub generate: Option<f64>,
    pub edit: Option<f64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(MetricsCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn inc_photos_received(&self) {
        self.counters.lock().photos_received += 1;
    }

    pub fn inc_generations_requested(&self) {
        self.counters.lock().generations_requested += 1;
    }

    pub fn inc_generations_succeeded(&self) {
        self.counters.lock().generations_succeeded += 1;
    }

    pub fn inc_enhancer_fallbacks(&self) {
        self.counters.lock().enhancer_fallbacks += 1;
    }

    pub fn inc_error(&self, kind: ErrorKind) {
        let mut c = self.counters.lock();
        match kind {
            ErrorKind::ContentPolicyViolation => c.errors_content_policy += 1,
            ErrorKind::QuotaExceeded => c.errors_quota += 1,
            ErrorKind::UpstreamUnavailable => c.errors_upstream += 1,
            ErrorKind::MalformedUpstreamResponse => c.errors_malformed += 1,
            ErrorKind::PromptTooLong => c.errors_prompt_too_long += 1,
            ErrorKind::Unclassified => c.errors_unclassified += 1,
        }
    }

    pub fn record_latency(&self, phase: &str, duration_ms: u64) {
        let record = LatencyRecord {
            phase: phase.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock();
        latencies.push(record);
        if latencies.len() > LATENCY_CAPACITY {
            let excess = latencies.len() - LATENCY_CAPACITY;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let c = self.counters.lock();
        let latencies = self.latencies.lock();

        let avg = |phase: &str| -> Option<f64> {
            let vals: Vec<f64> = latencies
                .iter()
                .filter(|r| r.phase == phase)
                .map(|r| r.duration_ms as f64)
                .collect();
            if vals.is_empty() {
                None
            } else {
                Some(vals.iter().sum::<f64>() / vals.len() as f64)
            }
        };

        MetricsSummary {
            photos_received: c.photos_received,
            generations_requested: c.generations_requested,
            generations_succeeded: c.generations_succeeded,
            enhancer_fallbacks: c.enhancer_fallbacks,
            error_counts: ErrorCounts {
                content_policy: c.errors_content_policy,
                quota: c.errors_quota,
                upstream_unavailable: c.errors_upstream,
                malformed_response: c.errors_malformed,
                prompt_too_long: c.errors_prompt_too_long,
                unclassified: c.errors_unclassified,
            },
            avg_latency_ms: AvgLatency {
                enhance: avg("enhance"),
                generate: avg("generate"),
                edit: avg("edit"),
            },
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
