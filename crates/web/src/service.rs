//! The adapter boundary between the engine and the framework layer above.
//!
//! The engine resolves routing, hands a [`RequestContext`] to the
//! application's [`Service`], and serializes whatever [`Response`] comes
//! back. Routing misses travel through as structured values so the layer
//! above can render its own 404/405 pages; [`default_error_response`] is the
//! stock rendering.

use std::sync::Arc;

use carafe_http::protocol::Response;
use http::StatusCode;

use crate::request::Request;
use crate::routing::{MatchError, RouteMatch};

/// Everything a service gets per request: the lazily-derived request view
/// plus the routing outcome.
#[derive(Debug)]
pub struct RequestContext {
    pub request: Request,
    pub route: Result<RouteMatch, MatchError>,
}

/// The application boundary. Called once per request; the engine knows
/// nothing about what happens inside.
pub trait Service: Send + Sync + 'static {
    fn call(&self, context: RequestContext) -> Response;
}

impl<S: Service + ?Sized> Service for Arc<S> {
    fn call(&self, context: RequestContext) -> Response {
        (**self).call(context)
    }
}

/// Wraps a plain function or closure as a [`Service`].
pub fn service_fn<F>(f: F) -> ServiceFn<F>
where
    F: Fn(RequestContext) -> Response + Send + Sync + 'static,
{
    ServiceFn { f }
}

pub struct ServiceFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for ServiceFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ServiceFn")
    }
}

impl<F> Service for ServiceFn<F>
where
    F: Fn(RequestContext) -> Response + Send + Sync + 'static,
{
    fn call(&self, context: RequestContext) -> Response {
        (self.f)(context)
    }
}

/// The engine's stock rendering of a routing miss: 404, 405 with an `Allow`
/// header, or a 308 redirect to the canonical slashed path.
pub fn default_error_response(error: &MatchError) -> Response {
    match error {
        MatchError::NotFound => {
            Response::text("Not Found").with_status(StatusCode::NOT_FOUND)
        }
        MatchError::MethodNotAllowed { allowed } => Response::text("Method Not Allowed")
            .with_status(StatusCode::METHOD_NOT_ALLOWED)
            .with_header("Allow", allowed.to_allow_header()),
        MatchError::RequestRedirect { target } => Response::text("Permanent Redirect")
            .with_status(StatusCode::PERMANENT_REDIRECT)
            .with_header("Location", target.clone()),
    }
}
