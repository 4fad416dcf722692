//! Status code name table.
//!
//! Fixed bidirectional mapping between numeric status codes, their canonical
//! lower-case names, and human reason phrases. Response views accept a name
//! wherever they accept a code.
use http::StatusCode;
use std::fmt;

macro_rules! status_table {
    ($($code:literal $name:literal $reason:literal;)*) => {
        const TABLE: &[(u16, &str, &str)] = &[
            $(($code, $name, $reason),)*
        ];
    };
}

// https://www.iana.org/assignments/http-status-codes
status_table! {
    100 "continue" "Continue";
    101 "switching protocols" "Switching Protocols";
    102 "processing" "Processing";
    200 "ok" "OK";
    201 "created" "Created";
    202 "accepted" "Accepted";
    203 "non-authoritative information" "Non-Authoritative Information";
    204 "no content" "No Content";
    205 "reset content" "Reset Content";
    206 "partial content" "Partial Content";
    207 "multi-status" "Multi-Status";
    300 "multiple choices" "Multiple Choices";
    301 "moved permanently" "Moved Permanently";
    302 "found" "Found";
    303 "see other" "See Other";
    304 "not modified" "Not Modified";
    305 "use proxy" "Use Proxy";
    307 "temporary redirect" "Temporary Redirect";
    308 "permanent redirect" "Permanent Redirect";
    400 "bad request" "Bad Request";
    401 "unauthorized" "Unauthorized";
    402 "payment required" "Payment Required";
    403 "forbidden" "Forbidden";
    404 "not found" "Not Found";
    405 "method not allowed" "Method Not Allowed";
    406 "not acceptable" "Not Acceptable";
    407 "proxy authentication required" "Proxy Authentication Required";
    408 "request timeout" "Request Timeout";
    409 "conflict" "Conflict";
    410 "gone" "Gone";
    411 "length required" "Length Required";
    412 "precondition failed" "Precondition Failed";
    413 "payload too large" "Payload Too Large";
    414 "uri too long" "URI Too Long";
    415 "unsupported media type" "Unsupported Media Type";
    416 "range not satisfiable" "Range Not Satisfiable";
    417 "expectation failed" "Expectation Failed";
    422 "unprocessable entity" "Unprocessable Entity";
    423 "locked" "Locked";
    424 "failed dependency" "Failed Dependency";
    426 "upgrade required" "Upgrade Required";
    428 "precondition required" "Precondition Required";
    429 "too many requests" "Too Many Requests";
    431 "request header fields too large" "Request Header Fields Too Large";
    500 "internal server error" "Internal Server Error";
    501 "not implemented" "Not Implemented";
    502 "bad gateway" "Bad Gateway";
    503 "service unavailable" "Service Unavailable";
    504 "gateway timeout" "Gateway Timeout";
    505 "http version not supported" "HTTP Version Not Supported";
    507 "insufficient storage" "Insufficient Storage";
    508 "loop detected" "Loop Detected";
    510 "not extended" "Not Extended";
    511 "network authentication required" "Network Authentication Required";
}

/// Resolve a canonical lower-case status name to its code.
///
/// The lookup is case-insensitive.
pub fn code_by_name(name: &str) -> Option<StatusCode> {
    TABLE
        .iter()
        .find(|(_, n, _)| n.eq_ignore_ascii_case(name))
        .and_then(|(c, ..)| StatusCode::from_u16(*c).ok())
}

/// Canonical lower-case name for `code`, if the code is known.
pub fn name(code: StatusCode) -> Option<&'static str> {
    TABLE
        .iter()
        .find(|(c, ..)| *c == code.as_u16())
        .map(|(_, n, _)| *n)
}

/// Human reason phrase for `code`.
///
/// Unknown codes fall back to a generic phrase.
pub fn reason(code: StatusCode) -> &'static str {
    TABLE
        .iter()
        .find(|(c, ..)| *c == code.as_u16())
        .map(|(.., r)| *r)
        .or(code.canonical_reason())
        .unwrap_or("Unknown Status")
}

// ===== Error =====

/// A string status assignment matched no known status name.
#[derive(Debug)]
pub struct InvalidStatusName {
    name: Box<str>,
}

impl InvalidStatusName {
    pub(crate) fn new(name: &str) -> Self {
        Self { name: name.into() }
    }

    /// The rejected name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for InvalidStatusName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "invalid status string {:?}, try:", self.name)?;
        writeln!(f)?;
        for (code, name, _) in TABLE {
            writeln!(f, "  - {code} {name:?}")?;
        }
        Ok(())
    }
}

impl std::error::Error for InvalidStatusName {}
