//! Prometheus metrics.
//!
//! HTTP traffic is recorded by [`metrics_middleware`]; the `track_*` helpers
//! record business events. Everything is a no-op when
//! `OBSERVABILITY_ENABLED=false`.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing::warn;

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true)
    })
}

/// Installs the Prometheus recorder and its upkeep task. Returns `None` when
/// observability is off or a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    let builder = match PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("http_request_duration_seconds".to_string()),
        &[
            0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
        ],
    ) {
        Ok(builder) => builder,
        Err(e) => {
            warn!(error = %e, "Invalid histogram buckets, metrics disabled");
            return None;
        }
    };

    let handle = match builder.install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
            return None;
        }
    };

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Some(handle)
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status.to_string()).increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path).record(latency);

    let status_category = match status {
        200..=299 => "2xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };
    counter!("http_requests_by_status", "status_category" => status_category).increment(1);

    gauge!("http_requests_active").decrement(1.0);

    response
}

/// Router for the separate metrics listener.
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

pub fn track_user_login_success(role: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "role" => role.to_string(), "status" => "success").increment(1);
}

pub fn track_user_login_failure(reason: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("user_logins_total", "role" => "unknown", "status" => "failure", "reason" => reason.to_string()).increment(1);
}

pub fn track_jwt_issued() {
    if !is_observability_enabled() {
        return;
    }
    counter!("jwt_tokens_issued_total").increment(1);
}

pub fn track_user_created(role: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("users_created_total", "role" => role.to_string()).increment(1);
}

pub fn track_enrollment_created() {
    if !is_observability_enabled() {
        return;
    }
    counter!("enrollments_created_total").increment(1);
}

/// `reason` is a short label such as `full`, `duplicate` or `closed`.
pub fn track_enrollment_rejected(reason: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("enrollments_rejected_total", "reason" => reason.to_string()).increment(1);
}

pub fn track_slots_generated(count: usize) {
    if !is_observability_enabled() {
        return;
    }
    counter!("slots_generated_total").increment(count as u64);
}

pub fn track_document_generated(kind: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("documents_generated_total", "kind" => kind.to_string()).increment(1);
}

pub fn track_bulk_job_finished(kind: &str, status: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("document_jobs_finished_total", "kind" => kind.to_string(), "status" => status.to_string()).increment(1);
}

pub fn track_email(sent: bool) {
    if !is_observability_enabled() {
        return;
    }
    let status = if sent { "sent" } else { "failed" };
    counter!("emails_total", "status" => status).increment(1);
}

/// `event` is one of `requested`, `reminded`, `signed`, `declined` or `cancelled`.
pub fn track_signature_event(event: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("signature_requests_total", "event" => event.to_string()).increment(1);
}

pub fn track_payment_recorded(method: &str, amount: f64) {
    if !is_observability_enabled() {
        return;
    }
    counter!("payments_recorded_total", "method" => method.to_string()).increment(1);
    histogram!("payment_amount", "method" => method.to_string()).record(amount);
}
