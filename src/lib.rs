//! Per-exchange HTTP context.
//!
//! Normalizes one inbound/outbound exchange into a request view, a response
//! view and a facade composing both. The response view owns the body-type
//! coercion and header-consistency engine: whatever a handler assigns as the
//! body, the content headers and status are re-derived so they stay mutually
//! consistent. MIME lookup, content negotiation, freshness comparison and
//! cookie storage are injected capabilities, not implemented here, and so is
//! everything below the flush boundary (sockets, routing, middleware).
//!
//! A host constructs one [`Context`] per exchange, handlers mutate it, and
//! the host flushes the accumulated [`Response`] state when the exchange
//! ends or [`Context::on_error`] closes it.

#![warn(missing_debug_implementations)]

pub mod body;
pub mod caps;
pub mod context;
pub mod error;
pub mod headers;
pub mod request;
pub mod response;
pub mod status;

pub use body::Body;
pub use context::Context;
pub use error::Error;
pub use request::{Conn, Request, Settings};
pub use response::{Response, TypeState};
pub use status::InvalidStatusName;

pub use http::{Method, StatusCode, Uri};
