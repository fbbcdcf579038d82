//! Telemetry 指标快照（MVP）。
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dcr_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            gateway_updates: snapshot.gateway_updates,
            gateway_lookups_served: snapshot.gateway_lookups_served,
            gateway_lookups_missed: snapshot.gateway_lookups_missed,
            instance_registrations: snapshot.instance_registrations,
            instance_removals: snapshot.instance_removals,
            removal_precondition_failures: snapshot.removal_precondition_failures,
            instance_lookups_served: snapshot.instance_lookups_served,
            instance_lookups_missed: snapshot.instance_lookups_missed,
            cache_failures: snapshot.cache_failures,
            lookup_latency_ms_total: snapshot.lookup_latency_ms_total,
            lookup_latency_ms_count: snapshot.lookup_latency_ms_count,
        })),
    )
        .into_response()
}
