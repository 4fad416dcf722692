//! Injected collaborator capabilities.
//!
//! MIME lookup, content negotiation, freshness comparison and cookie storage
//! are consumed through these traits rather than wired to a registry, so the
//! views stay testable with fakes and hosts can plug whatever they run.
use http::HeaderMap;
use std::{fmt, sync::Arc};

use crate::error::Error;

/// Maps an extension or short name to a canonical media type.
pub trait MimeResolver: Send + Sync {
    /// Canonical `type/subtype` for a name or extension, if known.
    fn resolve(&self, name_or_ext: &str) -> Option<String>;

    /// Default character encoding for a media type, if any.
    fn default_charset(&self, mime_type: &str) -> Option<String>;
}

/// Ranks candidates against a quality-weighted Accept-family header.
pub trait Negotiator: Send + Sync {
    /// Candidates ordered by descending preference.
    ///
    /// An empty candidate list asks for the full preference order parsed
    /// from the header.
    fn rank(&self, raw_header: &str, candidates: &[String]) -> Vec<String>;
}

/// Conditional-request freshness comparison (ETag / Last-Modified).
pub trait Freshness: Send + Sync {
    fn is_fresh(&self, request: &HeaderMap, response: &HeaderMap) -> bool;
}

/// Opaque per-exchange cookie jar.
pub trait CookieJar: Send {
    fn get(&self, name: &str) -> Option<String>;

    fn set(&mut self, name: &str, value: &str);
}

/// Application-level fault log.
pub trait FaultSink: Send + Sync {
    fn fault(&self, err: &Error, post_flush: bool);
}

/// Default fault sink, forwarding to [`log::error!`].
#[derive(Debug, Default)]
pub struct LogSink;

impl FaultSink for LogSink {
    fn fault(&self, err: &Error, post_flush: bool) {
        if post_flush {
            log::error!("fault after headers sent: {err}");
        } else {
            log::error!("fault: {err}");
        }
    }
}

// ===== Caps =====

/// The capability bundle handed to every exchange.
#[derive(Clone)]
pub struct Caps {
    pub mime: Arc<dyn MimeResolver>,
    pub negotiator: Arc<dyn Negotiator>,
    pub freshness: Arc<dyn Freshness>,
    pub faults: Arc<dyn FaultSink>,
}

impl Caps {
    pub fn new(
        mime: Arc<dyn MimeResolver>,
        negotiator: Arc<dyn Negotiator>,
        freshness: Arc<dyn Freshness>,
        faults: Arc<dyn FaultSink>,
    ) -> Self {
        Self { mime, negotiator, freshness, faults }
    }
}

impl fmt::Debug for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caps").finish_non_exhaustive()
    }
}

// ===== Test fakes =====
