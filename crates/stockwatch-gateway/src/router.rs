//! Axum router wiring.
//!
//! The request middleware is added with `Router::layer`, so it runs after
//! routing and sees the matched path template. Unrouted requests hit the
//! fallback, which is wrapped the same way but has no template, so they are
//! labelled `METHOD unmatched`. A known path with the wrong method answers
//! through [`api::method_not_allowed`], so it is classified like any other
//! handler error.

use axum::{
    handler::Handler,
    middleware,
    routing::{self, MethodRouter},
    Router,
};

use crate::{api, app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::root))
        .route("/stock/:ticker/price", get(api::stock::price))
        .route("/stock/:ticker/historical", get(api::stock::historical))
        .route("/stock/:ticker/options", get(api::stock::options))
        .route("/stock/:ticker/dividends", get(api::stock::dividends))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .fallback(api::not_found)
        .layer(middleware::from_fn_with_state(
            state.metrics().clone(),
            obs::track_requests,
        ))
        .with_state(state)
}

fn get<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    routing::get(handler).fallback(api::method_not_allowed)
}
