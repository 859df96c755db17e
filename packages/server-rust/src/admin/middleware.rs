//! Tower middleware stack for the admin surface.
//!
//! Ordering follows the outer-to-inner convention: the first layer listed
//! processes the request first on the way in and the response last on the
//! way out.

use axum::http::header::HeaderName;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::network::AdminConfig;

/// The composed layer stack produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        TimeoutLayer,
        tower::layer::util::Stack<
            TraceLayer<
                tower_http::classify::SharedClassifier<
                    tower_http::classify::ServerErrorsAsFailures,
                >,
            >,
            tower::layer::util::Stack<
                SetRequestIdLayer<MakeRequestUuid>,
                tower::layer::util::Identity,
            >,
        >,
    >,
>;

/// Builds the admin middleware: request id, tracing, and a per-request
/// timeout. The admin plane binds loopback, so CORS and compression stay
/// out of the stack.
#[must_use]
pub fn build_http_layers(config: &AdminConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_default_config() {
        let _layers = build_http_layers(&AdminConfig::default());
    }

    #[test]
    fn builds_with_custom_timeout() {
        let config = AdminConfig {
            request_timeout: std::time::Duration::from_secs(2),
            ..AdminConfig::default()
        };
        let _layers = build_http_layers(&config);
    }
}
