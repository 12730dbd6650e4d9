//! Prometheus metrics for forum-service.
//!
//! Exposes forum-specific collectors and an HTTP handler for the `/metrics`
//! endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Posts created through the service, segmented by resolved type.
    pub static ref POSTS_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "forum_posts_created_total",
        "Posts created segmented by resolved post type",
        &["ptype"]
    )
    .expect("failed to register forum_posts_created_total");

    /// Vote toggles, segmented by vote type and whether the vote was
    /// applied or retracted.
    pub static ref VOTES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "forum_votes_total",
        "Vote toggles segmented by vote type and action",
        &["vtype", "action"]
    )
    .expect("failed to register forum_votes_total");

    /// View events, segmented by whether they were counted or deduplicated
    /// by the time window.
    pub static ref POST_VIEWS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "forum_post_views_total",
        "Post view events segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register forum_post_views_total");

    /// Legacy transfer records, segmented by stream and outcome.
    pub static ref TRANSFER_RECORDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "forum_transfer_records_total",
        "Legacy transfer records segmented by stream and outcome",
        &["stream", "outcome"]
    )
    .expect("failed to register forum_transfer_records_total");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
