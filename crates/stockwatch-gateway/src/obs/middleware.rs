//! axum middleware wrapping every routed request in
//! [`ServiceMetrics::instrument`].
//!
//! Installed with `Router::layer`, so it runs after routing and sees the
//! matched path template. Handlers report failure by returning an
//! `ApiError`, which stamps an [`ErrorKind`] into the response extensions;
//! that is how a response is told apart from a failure here. The response
//! itself always passes through unchanged.

use axum::{
    extract::{MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use stockwatch_core::error::ErrorKind;

use super::metrics::{Failure, ServiceMetrics};

pub async fn track_requests(
    State(metrics): State<ServiceMetrics>,
    matched: Option<MatchedPath>,
    req: Request,
    next: Next,
) -> Response {
    let route = route_label(req.method(), matched.as_ref().map(MatchedPath::as_str));

    let outcome = metrics
        .instrument(&route, async move {
            let response = next.run(req).await;
            match response.extensions().get::<ErrorKind>().copied() {
                Some(kind) => Err(FailedResponse { kind, response }),
                None => Ok(response),
            }
        })
        .await;

    match outcome {
        Ok(response) => response,
        Err(failed) => failed.response,
    }
}

/// `METHOD /path/:template`, or `METHOD unmatched` when no route matched.
///
/// Clients choose the method, so anything outside the standard set folds
/// into `OTHER`.
pub fn route_label(method: &Method, template: Option<&str>) -> String {
    format!("{} {}", method_label(method), template.unwrap_or("unmatched"))
}

fn method_label(method: &Method) -> &'static str {
    match method.as_str() {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "PATCH" => "PATCH",
        "DELETE" => "DELETE",
        "OPTIONS" => "OPTIONS",
        _ => "OTHER",
    }
}

struct FailedResponse {
    kind: ErrorKind,
    response: Response,
}

impl Failure for FailedResponse {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_use_template() {
        assert_eq!(
            route_label(&Method::GET, Some("/stock/:ticker/price")),
            "GET /stock/:ticker/price"
        );
        assert_eq!(route_label(&Method::POST, None), "POST unmatched");
    }

    #[test]
    fn extension_methods_fold_into_other() {
        for m in ["X1", "PURGE", "get"] {
            let method = Method::from_bytes(m.as_bytes()).unwrap();
            assert_eq!(route_label(&method, Some("/healthz")), "OTHER /healthz");
        }
        assert_eq!(route_label(&Method::TRACE, None), "OTHER unmatched");
    }
}
