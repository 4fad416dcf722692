//! Response view: body coercion and header consistency.
use http::{
    HeaderMap, StatusCode,
    header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue},
};

use crate::{
    body::Body,
    caps::Caps,
    error::Error,
    headers::{self, FieldEntry},
    request::Request,
    status::{self, InvalidStatusName},
};

const TEXT_HTML_UTF8: &str = "text/html; charset=utf-8";
const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";
const APPLICATION_JSON: &str = "application/json";

/// Provenance of the current `Content-Type` value.
///
/// Body assignment only infers a type over `Unset`; an explicit type call is
/// never overwritten by inference, except by the unconditional JSON branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeState {
    Unset,
    Inferred,
    Explicit,
}

/// The outbound half of an exchange.
///
/// Owns the accumulated status, headers and body until the host transport
/// flushes them. Every body assignment re-derives the content headers from
/// the assigned value; see [`set_body`][Response::set_body].
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
    type_state: TypeState,
    sent: bool,
    caps: Caps,
}

impl Response {
    pub fn new(caps: Caps) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::Empty,
            type_state: TypeState::Unset,
            sent: false,
            caps,
        }
    }

    // ===== Status =====

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Human reason phrase for the current status.
    pub fn reason(&self) -> &'static str {
        status::reason(self.status)
    }

    /// Canonical lower-case name for the current status, if known.
    pub fn status_name(&self) -> Option<&'static str> {
        status::name(self.status)
    }

    /// Set the status code.
    ///
    /// Setting 204 or 304 while a body is present clears the body and every
    /// content-describing header; other codes leave the body alone.
    pub fn set_status(&mut self, status: StatusCode) {
        if self.guard_sent() {
            return;
        }
        self.status = status;
        if no_content(status) && !self.body.is_empty() {
            self.clear_body();
        }
    }

    /// Set the status by canonical name, case-insensitively.
    pub fn set_status_name(&mut self, name: &str) -> Result<(), InvalidStatusName> {
        match status::code_by_name(name) {
            Some(code) => {
                self.set_status(code);
                Ok(())
            }
            None => Err(InvalidStatusName::new(name)),
        }
    }

    // ===== Body =====

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Take the body out for flushing, leaving `Empty` behind.
    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    /// Assign the response body, re-deriving content headers.
    ///
    /// - `Empty` collapses the status to 204 (kept at 304) and removes
    ///   `Content-Type`, `Content-Length` and `Transfer-Encoding`.
    /// - `Text` infers `text/html; charset=utf-8` when the string contains
    ///   `<`, else `text/plain; charset=utf-8`, and always writes the UTF-8
    ///   byte length.
    /// - `Binary` and `Stream` infer `application/octet-stream`; only
    ///   `Binary` has a known length.
    /// - `Structured` forces `application/json`, even over an explicitly set
    ///   type.
    ///
    /// Inference never replaces a `Content-Type` that is already present,
    /// whatever wrote it. Assigning a non-empty body while the status is
    /// 204/304 collapses to the empty branch.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        if self.guard_sent() {
            return;
        }
        let value = body.into();
        if value.is_empty() || no_content(self.status) {
            self.clear_body();
            return;
        }

        let unset = !self.headers.contains_key(CONTENT_TYPE);
        match &value {
            Body::Text(s) => {
                if unset {
                    let mime = if s.contains('<') { TEXT_HTML_UTF8 } else { TEXT_PLAIN_UTF8 };
                    self.infer_type(mime);
                }
                self.write_length(s.len() as u64);
            }
            Body::Binary(b) => {
                if unset {
                    self.infer_type(OCTET_STREAM);
                }
                self.write_length(b.len() as u64);
            }
            Body::Stream(_) => {
                if unset {
                    self.infer_type(OCTET_STREAM);
                }
                // length unknown a priori; the transport delivers chunked
            }
            Body::Structured(_) => self.infer_type(APPLICATION_JSON),
            Body::Empty => unreachable!("handled above"),
        }
        self.body = value;
    }

    fn clear_body(&mut self) {
        self.status = if self.status == StatusCode::NOT_MODIFIED {
            StatusCode::NOT_MODIFIED
        } else {
            StatusCode::NO_CONTENT
        };
        self.headers.remove(CONTENT_TYPE);
        self.headers.remove(CONTENT_LENGTH);
        self.headers.remove(http::header::TRANSFER_ENCODING);
        self.type_state = TypeState::Unset;
        self.body = Body::Empty;
    }

    fn infer_type(&mut self, mime: &'static str) {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime));
        self.type_state = TypeState::Inferred;
    }

    fn write_length(&mut self, n: u64) {
        let mut buf = itoa::Buffer::new();
        if let Ok(value) = HeaderValue::from_str(buf.format(n)) {
            self.headers.insert(CONTENT_LENGTH, value);
        }
    }

    // ===== Content-Type / Content-Length =====

    /// Current media type, parameters stripped.
    pub fn content_type(&self) -> Option<&str> {
        headers::get(&self.headers, "content-type")
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
    }

    /// Provenance of the current `Content-Type`.
    pub fn type_state(&self) -> TypeState {
        self.type_state
    }

    /// Set `Content-Type`, marking it explicitly chosen.
    ///
    /// A value without `/` is treated as a MIME short name and resolved
    /// through the MIME capability; when the resolver reports a default
    /// charset it is appended lowercased. A full media type is used
    /// verbatim.
    pub fn set_content_type(&mut self, value: &str) -> Result<(), Error> {
        if self.guard_sent() {
            return Ok(());
        }
        let full = if value.contains('/') {
            value.to_owned()
        } else {
            let mime = self
                .caps
                .mime
                .resolve(value)
                .unwrap_or_else(|| OCTET_STREAM.to_owned());
            match self.caps.mime.default_charset(&mime) {
                Some(cs) => format!("{mime}; charset={}", cs.to_lowercase()),
                None => mime,
            }
        };
        headers::set(&mut self.headers, "content-type", full.as_str())?;
        self.type_state = TypeState::Explicit;
        Ok(())
    }

    /// Parsed `Content-Length` (non-numeric coerces to 0), else the byte
    /// length of a text/binary body, else absent.
    pub fn length(&self) -> Option<u64> {
        if let Some(len) = headers::get(&self.headers, "content-length") {
            return Some(len.trim().parse().unwrap_or(0));
        }
        self.body.len()
    }

    pub fn set_length(&mut self, n: u64) {
        if self.guard_sent() {
            return;
        }
        self.write_length(n);
    }

    // ===== Headers =====

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup, first entry.
    pub fn header(&self, name: &str) -> Option<&str> {
        headers::get(&self.headers, name)
    }

    /// Overwrite a header with a scalar or sequence value.
    pub fn set(&mut self, name: &str, value: impl FieldEntry) -> Result<(), Error> {
        if self.guard_sent() {
            return Ok(());
        }
        headers::set(&mut self.headers, name, value)?;
        if name.eq_ignore_ascii_case("content-type") {
            self.type_state = TypeState::Explicit;
        }
        Ok(())
    }

    /// Apply [`set`][Response::set] for every pair, in order.
    pub fn set_all<N, V>(&mut self, pairs: impl IntoIterator<Item = (N, V)>) -> Result<(), Error>
    where
        N: AsRef<str>,
        V: FieldEntry,
    {
        for (name, value) in pairs {
            self.set(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Append to a comma-separated header, suppressing duplicate tokens.
    pub fn append(&mut self, name: &str, value: &str) -> Result<(), Error> {
        if self.guard_sent() {
            return Ok(());
        }
        headers::append(&mut self.headers, name, value)?;
        Ok(())
    }

    pub fn remove(&mut self, name: &str) {
        if self.guard_sent() {
            return;
        }
        headers::remove(&mut self.headers, name);
        if name.eq_ignore_ascii_case("content-type") {
            self.type_state = TypeState::Unset;
        }
    }

    /// Vary on `field`.
    pub fn vary(&mut self, field: &str) -> Result<(), Error> {
        self.append("vary", field)
    }

    // ===== Helpers =====

    /// Redirect to `url`.
    ///
    /// `"back"` resolves to the request's Referrer, then `alt`, then `"/"`.
    /// The status is forced to 302 unless already a redirect code. The body
    /// is an HTML anchor when the client accepts `html`, else plain text.
    pub fn redirect(&mut self, req: &Request, url: &str, alt: Option<&str>) -> Result<(), Error> {
        if self.guard_sent() {
            return Ok(());
        }
        let target = if url == "back" {
            req.header("referrer")
                .or(alt)
                .unwrap_or("/")
                .to_owned()
        } else {
            url.to_owned()
        };

        self.set("location", target.as_str())?;
        if !matches!(self.status.as_u16(), 300 | 301 | 302 | 303 | 305 | 307) {
            self.set_status(StatusCode::FOUND);
        }

        let accept = req.header("accept").unwrap_or("*/*");
        let html = !self
            .caps
            .negotiator
            .rank(accept, &["text/html".to_owned()])
            .is_empty();
        if html {
            let escaped = escape_html(&target);
            self.set("content-type", TEXT_HTML_UTF8)?;
            self.set_body(format!("Redirecting to <a href=\"{escaped}\">{escaped}</a>."));
        } else {
            self.set_body(format!("Redirecting to {target}."));
        }
        Ok(())
    }

    /// Mark the response as a download.
    ///
    /// With a filename, its extension is resolved to a `Content-Type` and
    /// the final path segment becomes the `filename` parameter.
    pub fn attachment(&mut self, filename: Option<&str>) -> Result<(), Error> {
        if self.guard_sent() {
            return Ok(());
        }
        match filename {
            Some(name) => {
                let base = name.rsplit('/').next().unwrap_or(name);
                if let Some((_, ext)) = base.rsplit_once('.') {
                    self.set_content_type(ext)?;
                }
                let disposition = format!("attachment; filename=\"{base}\"");
                self.set("content-disposition", disposition.as_str())
            }
            None => self.set("content-disposition", "attachment"),
        }
    }

    // ===== Flush boundary =====

    /// Whether the headers were handed to the transport.
    pub fn headers_sent(&self) -> bool {
        self.sent
    }

    /// Record that the transport flushed the headers. All further mutation
    /// of this response is an observable no-op.
    pub fn mark_sent(&mut self) {
        self.sent = true;
    }

    fn guard_sent(&self) -> bool {
        if self.sent {
            log::warn!("response mutation ignored: headers already sent");
        }
        self.sent
    }
}

fn no_content(status: StatusCode) -> bool {
    matches!(status.as_u16(), 204 | 304)
}

/// Escape `&`, `"`, `<` and `>` as named entities, in that order.
fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::caps::fake;
    use crate::request::{Conn, Settings};
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::Arc;

    fn response() -> Response {
        Response::new(fake::caps())
    }

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = http::Request::builder().method(http::Method::GET).uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        Request::new(parts, Conn::default(), Arc::new(Settings::default()), fake::caps())
    }

    #[test]
    fn text_body_infers_html_on_angle_bracket() {
        let mut res = response();
        res.set_body("<h1>Tobi</h1>");
        assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(res.header("content-length"), Some("13"));
        assert_eq!(res.type_state(), TypeState::Inferred);
    }

    #[test]
    fn text_body_infers_plain_otherwise() {
        let mut res = response();
        res.set_body("Tobi");
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(res.header("content-length"), Some("4"));
    }

    #[test]
    fn text_length_is_utf8_byte_length() {
        let mut res = response();
        res.set_body("日本語");
        assert_eq!(res.header("content-length"), Some("9"));
    }

    #[test]
    fn inference_never_overwrites_a_present_type() {
        let mut res = response();
        res.set_content_type("application/xml").unwrap();
        res.set_body("<root/>");
        assert_eq!(res.header("content-type"), Some("application/xml"));
        assert_eq!(res.type_state(), TypeState::Explicit);
    }

    #[test]
    fn prior_inferred_type_also_blocks_inference() {
        let mut res = response();
        res.set_body("plain");
        res.set_body("<h1>html now</h1>");
        // still the first inference; "already set" ignores provenance
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn binary_body_infers_octet_stream() {
        let mut res = response();
        res.set_body(Bytes::from_static(b"\x00\x01\x02"));
        assert_eq!(res.header("content-type"), Some("application/octet-stream"));
        assert_eq!(res.header("content-length"), Some("3"));
    }

    #[test]
    fn stream_body_leaves_length_unset() {
        struct Silent;

        impl futures_core::Stream for Silent {
            type Item = std::io::Result<Bytes>;

            fn poll_next(
                self: std::pin::Pin<&mut Self>,
                _: &mut std::task::Context<'_>,
            ) -> std::task::Poll<Option<Self::Item>> {
                std::task::Poll::Ready(None)
            }
        }

        let mut res = response();
        res.set_body(Body::stream(Silent));
        assert_eq!(res.header("content-type"), Some("application/octet-stream"));
        assert_eq!(res.header("content-length"), None);
    }

    #[test]
    fn structured_body_forces_json_over_explicit_type() {
        let mut res = response();
        res.set_content_type("text/html; charset=utf-8").unwrap();
        res.set_body(json!({"foo": "bar"}));
        assert_eq!(res.header("content-type"), Some("application/json"));
    }

    #[test]
    fn structured_body_sets_no_length() {
        let mut res = response();
        res.set_body(json!([1, 2, 3]));
        assert_eq!(res.header("content-length"), None);
    }

    #[test]
    fn empty_body_clears_content_headers() {
        let mut res = response();
        res.set("transfer-encoding", "chunked").unwrap();
        res.set_body("<h1>Tobi</h1>");
        res.set_body(Body::Empty);
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(res.header("content-type"), None);
        assert_eq!(res.header("content-length"), None);
        assert_eq!(res.header("transfer-encoding"), None);
        assert!(res.body().is_empty());
    }

    #[test]
    fn empty_body_keeps_304() {
        let mut res = response();
        res.set_status(StatusCode::NOT_MODIFIED);
        res.set_body(Body::Empty);
        assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    }

    #[test]
    fn no_content_status_clears_existing_body() {
        let mut res = response();
        res.set_body("Tobi");
        res.set_status(StatusCode::NO_CONTENT);
        assert!(res.body().is_empty());
        assert_eq!(res.header("content-type"), None);
        assert_eq!(res.header("content-length"), None);
    }

    #[test]
    fn body_write_under_304_collapses_to_empty() {
        let mut res = response();
        res.set_status(StatusCode::NOT_MODIFIED);
        res.set_body("late body");
        assert!(res.body().is_empty());
        assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(res.header("content-length"), None);
    }

    #[test]
    fn other_statuses_do_not_touch_the_body() {
        let mut res = response();
        res.set_body("Tobi");
        res.set_status(StatusCode::ACCEPTED);
        assert!(!res.body().is_empty());
        assert_eq!(res.header("content-length"), Some("4"));
    }

    #[test]
    fn status_by_name_is_case_insensitive() {
        let mut res = response();
        res.set_status_name("forbidden").unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        res.set_status_name("Forbidden").unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let err = res.set_status_name("teaopt").unwrap_err();
        assert!(err.to_string().contains("- 403 \"forbidden\""));
    }

    #[test]
    fn content_type_getter_strips_parameters() {
        let mut res = response();
        res.set_content_type("text/html; charset=utf-8").unwrap();
        assert_eq!(res.content_type(), Some("text/html"));
        assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn short_name_resolves_with_charset() {
        let mut res = response();
        res.set_content_type("html").unwrap();
        assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(res.type_state(), TypeState::Explicit);
    }

    #[test]
    fn length_parses_header_or_computes() {
        let mut res = response();
        assert_eq!(res.length(), None);
        res.set_body("Tobi");
        assert_eq!(res.length(), Some(4));
        res.set("content-length", "oops").unwrap();
        assert_eq!(res.length(), Some(0));
    }

    #[test]
    fn vary_appends_without_duplicates() {
        let mut res = response();
        res.vary("Accept").unwrap();
        res.vary("Accept").unwrap();
        res.vary("Accept-Encoding").unwrap();
        assert_eq!(res.header("vary"), Some("Accept, Accept-Encoding"));
    }

    #[test]
    fn redirect_sets_location_and_302() {
        let mut res = response();
        let req = request(&[("accept", "text/html")]);
        res.redirect(&req, "/login", None).unwrap();
        assert_eq!(res.header("location"), Some("/login"));
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
        match res.body() {
            Body::Text(s) => {
                assert_eq!(s, "Redirecting to <a href=\"/login\">/login</a>.")
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn redirect_escapes_the_url_once() {
        let mut res = response();
        let req = request(&[("accept", "text/html")]);
        res.redirect(&req, "/login?a=1&b=\"<x>\"", None).unwrap();
        match res.body() {
            Body::Text(s) => assert!(
                s.contains("/login?a=1&amp;b=&quot;&lt;x&gt;&quot;"),
                "unexpected body {s:?}"
            ),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn redirect_falls_back_to_plain_text() {
        let mut res = response();
        let req = request(&[("accept", "application/json")]);
        res.redirect(&req, "/login", None).unwrap();
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
        match res.body() {
            Body::Text(s) => assert_eq!(s, "Redirecting to /login."),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn redirect_back_uses_referrer_then_alt_then_root() {
        let mut res = response();
        let req = request(&[("referer", "/prev"), ("accept", "text/html")]);
        res.redirect(&req, "back", Some("/alt")).unwrap();
        assert_eq!(res.header("location"), Some("/prev"));

        let mut res = response();
        let req = request(&[("accept", "text/html")]);
        res.redirect(&req, "back", Some("/alt")).unwrap();
        assert_eq!(res.header("location"), Some("/alt"));

        let mut res = response();
        res.redirect(&req, "back", None).unwrap();
        assert_eq!(res.header("location"), Some("/"));
    }

    #[test]
    fn redirect_keeps_an_existing_redirect_status() {
        let mut res = response();
        res.set_status(StatusCode::MOVED_PERMANENTLY);
        let req = request(&[]);
        res.redirect(&req, "/new", None).unwrap();
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    }

    #[test]
    fn attachment_sets_disposition_and_type() {
        let mut res = response();
        res.attachment(Some("path/to/logo.png")).unwrap();
        assert_eq!(res.header("content-type"), Some("image/png"));
        assert_eq!(
            res.header("content-disposition"),
            Some("attachment; filename=\"logo.png\"")
        );

        let mut res = response();
        res.attachment(None).unwrap();
        assert_eq!(res.header("content-disposition"), Some("attachment"));
        assert_eq!(res.header("content-type"), None);
    }

    #[test]
    fn mutation_after_flush_is_a_no_op() {
        let mut res = response();
        res.set_body("before");
        res.mark_sent();

        res.set("x-late", "1").unwrap();
        res.append("vary", "Accept").unwrap();
        res.remove("content-type");
        res.set_status(StatusCode::BAD_GATEWAY);
        res.set_body("after");

        assert_eq!(res.header("x-late"), None);
        assert_eq!(res.header("vary"), None);
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(res.status(), StatusCode::OK);
        match res.body() {
            Body::Text(s) => assert_eq!(s, "before"),
            other => panic!("unexpected body {other:?}"),
        }
    }
}
