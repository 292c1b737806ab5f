use metrics::{counter, gauge, histogram};
use std::time::Instant;

use crate::error::SyncStage;

pub struct SyncTelemetry;

impl SyncTelemetry {
    pub fn record_success(duration_ms: f64) {
        counter!("registry_sync_runs_total", "outcome" => "success").increment(1);
        histogram!("registry_sync_duration_ms").record(duration_ms);
    }

    pub fn record_failure(stage: SyncStage, duration_ms: f64) {
        counter!("registry_sync_runs_total", "outcome" => "failure", "stage" => stage.to_string())
            .increment(1);
        histogram!("registry_sync_duration_ms").record(duration_ms);
    }

    pub fn record_skipped(stage: SyncStage, count: usize) {
        if count > 0 {
            counter!("registry_sync_skipped_chains_total", "stage" => stage.to_string())
                .increment(count as u64);
        }
    }

    pub fn set_loaded_chains(count: usize) {
        gauge!("registry_chains_loaded").set(count as f64);
    }
}

pub struct SyncTimer {
    start: Instant
}

impl SyncTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now()
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_millis() as f64
    }
}
