//! Per-exchange facade over the request and response views.
use http::{HeaderMap, Method, StatusCode, Uri};
use std::{fmt, sync::Arc};

use crate::{
    body::Body,
    caps::{Caps, CookieJar},
    error::Error,
    headers::FieldEntry,
    request::{Conn, Request, Settings},
    response::Response,
    status::{self, InvalidStatusName},
};

/// One exchange: request view, response view and cookie jar behind a single
/// object.
///
/// Every forwarding method carries the contract of the owned component
/// verbatim; nothing is reinterpreted on the way through. Handlers mutate the
/// context, and the host flushes [`Response`] state when the exchange ends or
/// [`on_error`][Context::on_error] closes it.
pub struct Context {
    request: Request,
    response: Response,
    cookies: Box<dyn CookieJar>,
    caps: Caps,
}

impl Context {
    pub fn new(
        parts: http::request::Parts,
        conn: Conn,
        settings: Arc<Settings>,
        caps: Caps,
        cookies: Box<dyn CookieJar>,
    ) -> Self {
        Self {
            request: Request::new(parts, conn, settings, caps.clone()),
            response: Response::new(caps.clone()),
            cookies,
            caps,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    // ===== Cookies =====

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name)
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.set(name, value);
    }

    // ===== Request delegation =====

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn set_method(&mut self, method: Method) {
        self.request.set_method(method);
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn set_uri(&mut self, uri: Uri) {
        self.request.set_uri(uri);
    }

    pub fn path(&self) -> &str {
        self.request.path()
    }

    pub fn set_path(&mut self, path: &str) -> Result<(), Error> {
        self.request.set_path(path)
    }

    pub fn query(&self) -> Vec<(String, String)> {
        self.request.query()
    }

    pub fn set_query(&mut self, pairs: &[(String, String)]) -> Result<(), Error> {
        self.request.set_query(pairs)
    }

    pub fn querystring(&self) -> &str {
        self.request.querystring()
    }

    pub fn set_querystring(&mut self, qs: &str) -> Result<(), Error> {
        self.request.set_querystring(qs)
    }

    /// Request header lookup (`Referrer`/`Referer` interchangeable).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    pub fn host(&self) -> Option<String> {
        self.request.host()
    }

    pub fn protocol(&self) -> &str {
        self.request.protocol()
    }

    pub fn secure(&self) -> bool {
        self.request.secure()
    }

    pub fn ip(&self) -> Option<String> {
        self.request.ip()
    }

    pub fn ips(&self) -> Vec<String> {
        self.request.ips()
    }

    pub fn subdomains(&self) -> Vec<String> {
        self.request.subdomains()
    }

    pub fn idempotent(&self) -> bool {
        self.request.idempotent()
    }

    pub fn is(&self, pattern: &str) -> bool {
        self.request.is(pattern)
    }

    pub fn accepts(&self, candidates: &[&str]) -> Option<String> {
        self.request.accepts(candidates)
    }

    pub fn accepts_encodings(&self, candidates: &[&str]) -> Option<String> {
        self.request.accepts_encodings(candidates)
    }

    pub fn accepts_charsets(&self, candidates: &[&str]) -> Option<String> {
        self.request.accepts_charsets(candidates)
    }

    pub fn accepts_languages(&self, candidates: &[&str]) -> Option<String> {
        self.request.accepts_languages(candidates)
    }

    pub fn fresh(&self) -> bool {
        self.request.fresh(&self.response)
    }

    pub fn stale(&self) -> bool {
        !self.fresh()
    }

    // ===== Response delegation =====

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.set_status(status);
    }

    pub fn set_status_name(&mut self, name: &str) -> Result<(), InvalidStatusName> {
        self.response.set_status_name(name)
    }

    pub fn body(&self) -> &Body {
        self.response.body()
    }

    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.response.set_body(body);
    }

    pub fn content_type(&self) -> Option<&str> {
        self.response.content_type()
    }

    pub fn set_content_type(&mut self, value: &str) -> Result<(), Error> {
        self.response.set_content_type(value)
    }

    pub fn length(&self) -> Option<u64> {
        self.response.length()
    }

    pub fn set_length(&mut self, n: u64) {
        self.response.set_length(n);
    }

    pub fn response_headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    pub fn set(&mut self, name: &str, value: impl FieldEntry) -> Result<(), Error> {
        self.response.set(name, value)
    }

    pub fn append(&mut self, name: &str, value: &str) -> Result<(), Error> {
        self.response.append(name, value)
    }

    pub fn remove(&mut self, name: &str) {
        self.response.remove(name);
    }

    pub fn vary(&mut self, field: &str) -> Result<(), Error> {
        self.response.vary(field)
    }

    pub fn redirect(&mut self, url: &str, alt: Option<&str>) -> Result<(), Error> {
        self.response.redirect(&self.request, url, alt)
    }

    pub fn attachment(&mut self, filename: Option<&str>) -> Result<(), Error> {
        self.response.attachment(filename)
    }

    pub fn headers_sent(&self) -> bool {
        self.response.headers_sent()
    }

    // ===== Error policy =====

    /// Build a deliberate, exposable error for the caller to raise.
    ///
    /// A numeric argument becomes the status, with the standard reason
    /// phrase as the message; an unset status defaults to 500.
    ///
    /// ```ignore
    /// return Err(ctx.error(403));
    /// return Err(ctx.error(("name required", 400)));
    /// return Err(ctx.error("something exploded"));
    /// ```
    pub fn error(&self, err: impl Into<Error>) -> Error {
        let mut err = err.into();
        if err.status().is_none() {
            err.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
        err.set_expose(true);
        err
    }

    /// Default fault handling for the exchange.
    ///
    /// `None` is a no-op, so this doubles as a completion handler. A fault
    /// after the headers were flushed is marked post-flush and only
    /// forwarded to the fault sink; the wire state stands uncorrected.
    /// Otherwise the fault is forwarded, the response is forced to plain
    /// text with the resolved status (missing-entity faults remap to 404,
    /// unset statuses default to 500), and the body is the error message
    /// when exposable, else the reason phrase.
    pub fn on_error(&mut self, err: Option<Error>) {
        let Some(mut err) = err else { return };

        if self.response.headers_sent() {
            err.mark_post_flush();
            self.caps.faults.fault(&err, true);
            return;
        }

        self.caps.faults.fault(&err, false);

        if err.is_not_found() {
            err.set_status(StatusCode::NOT_FOUND);
        }
        let status = err.resolved_status();
        let message = if err.expose() {
            err.message().to_owned()
        } else {
            status::reason(status).to_owned()
        };

        // plain text regardless of what the handler accumulated; the value
        // is statically valid so the result is moot
        self.response
            .set("content-type", "text/plain; charset=utf-8")
            .ok();
        self.response.set_status(status);
        self.response.set_body(message);
        self.response.mark_sent();
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request", &self.request)
            .field("response", &self.response)
            .finish_non_exhaustive()
    }
}
