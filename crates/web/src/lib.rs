//! Request routing and connection serving for the carafe web engine.
//!
//! This crate sits on top of `carafe-http` and provides:
//!
//! - [`routing`]: compiled URL rules, typed segment converters, and the
//!   two-phase matcher (static hash index, then ordered dynamic scan)
//! - [`Request`]: a request view with lazily-derived args, form fields,
//!   files, cookies and JSON
//! - [`Service`]: the adapter boundary the framework layer implements
//! - [`Server`]: the event-driven tokio backend and a blocking fallback,
//!   over TCP or a UNIX-domain socket
//!
//! # Example
//!
//! ```no_run
//! use carafe_http::protocol::Response;
//! use carafe_web::routing::{BindContext, RouteMap, Rule};
//! use carafe_web::{Server, default_error_response, service_fn};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut map = RouteMap::new();
//!     map.add(Rule::builder("/", "index").build()?);
//!     map.add(Rule::builder("/user/<name>", "user").build()?);
//!     let matcher = map.bind(BindContext::default());
//!
//!     let service = service_fn(|context| match context.route {
//!         Ok(hit) if hit.endpoint == "index" => Response::text("welcome"),
//!         Ok(hit) => Response::text(format!("hello {}", hit.values["name"])),
//!         Err(e) => default_error_response(&e),
//!     });
//!
//!     let server = Server::builder().host("127.0.0.1").port(5000).workers(4).build();
//!     server.run(matcher, service)?;
//!     Ok(())
//! }
//! ```

pub mod routing;

mod request;
pub use request::Request;

mod service;
pub use service::RequestContext;
pub use service::Service;
pub use service::ServiceFn;
pub use service::default_error_response;
pub use service::service_fn;

mod server;
pub use server::BoundServer;
pub use server::ServeError;
pub use server::Server;
pub use server::ServerBuilder;
