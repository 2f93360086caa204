//! Router assembly
//!
//! [`create_router`] wires the endpoints and the WebSocket admission layer.
//! [`create_app`] adds the outer CORS, rate limiting and security header
//! layers used by the server binary.

pub mod api;
pub mod realtime;

use std::sync::Arc;

use anyhow::anyhow;
use axum::{Router, middleware};
use http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::middleware::connection_limit_middleware;
use crate::state::AppState;

/// Rates at or above this disable the rate limiter (load testing)
pub const RATE_LIMIT_DISABLED_THRESHOLD: u32 = 100_000;

/// Endpoints plus connection admission for the relay socket.
///
/// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let realtime_routes = realtime::create_realtime_router().layer(
        middleware::from_fn_with_state(state.clone(), connection_limit_middleware),
    );

    api::create_api_router()
        .merge(realtime_routes)
        .with_state(state)
}

/// Full application: [`create_router`] plus CORS, rate limiting and
/// security headers.
pub fn create_app(state: Arc<AppState>) -> anyhow::Result<Router> {
    let rate_limit_rps = state.config.rate_limit_requests_per_second;
    let rate_limit_burst = state.config.rate_limit_burst_size;
    let cors_layer = cors_layer(state.config.cors_allowed_origins.as_deref());

    // Configure rate limiting (disabled at very high rates for performance testing)
    let governor_layer = if rate_limit_rps < RATE_LIMIT_DISABLED_THRESHOLD {
        // One quota cell is replenished every period
        let period_ms = (1000 / u64::from(rate_limit_rps.max(1))).max(1);
        let governor_config = GovernorConfigBuilder::default()
            .per_millisecond(period_ms)
            .burst_size(rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("Invalid rate limiter configuration"))?;
        Some(GovernorLayer::new(governor_config))
    } else {
        info!("Rate limiting disabled (rate >= {RATE_LIMIT_DISABLED_THRESHOLD}/s)");
        None
    };

    // Security headers
    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("DENY"),
        ));

    Ok(create_router(state)
        .layer(cors_layer)
        .layer(tower::util::option_layer(governor_layer))
        .layer(security_headers))
}

fn cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(false),
        Some(origins) => {
            // Parse comma-separated origins
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(true)
        }
        None => {
            info!(
                "CORS not configured, defaulting to same-origin only. \
                 Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
            );
            CorsLayer::new()
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(false)
        }
    }
}
