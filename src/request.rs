//! Request view over the inbound half of an exchange.
use http::{HeaderMap, Method, Uri, Version};
use std::{cell::RefCell, net::IpAddr, sync::Arc};

use crate::{caps::Caps, error::Error, headers, response::Response};

/// Application-level settings shared by every exchange.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Permit `X-Forwarded-*` headers to override direct connection info.
    pub proxy: bool,
    /// Host labels counted as the base domain when deriving subdomains.
    pub subdomain_offset: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self { proxy: false, subdomain_offset: 2 }
    }
}

/// Connection facts reported by the transport.
#[derive(Debug, Default, Clone)]
pub struct Conn {
    pub remote_addr: Option<IpAddr>,
    /// Whether the underlying connection is encrypted.
    pub secure: bool,
}

type QueryPairs = Vec<(String, String)>;

/// Read/write accessors over the inbound method, URL and headers, plus the
/// fields derived from them (host, protocol, client address chain,
/// subdomains, freshness).
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    conn: Conn,
    settings: Arc<Settings>,
    caps: Caps,
    // memoized parse keyed on the raw query string, so a URL reassignment
    // invalidates by key mismatch instead of an explicit clear
    query_cache: RefCell<Option<(String, QueryPairs)>>,
}

impl Request {
    pub fn new(
        parts: http::request::Parts,
        conn: Conn,
        settings: Arc<Settings>,
        caps: Caps,
    ) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            conn,
            settings,
            caps,
            query_cache: RefCell::new(None),
        }
    }

    // ===== Method / URL =====

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Replace the path, retaining any query string.
    pub fn set_path(&mut self, path: &str) -> Result<(), Error> {
        let target = match self.uri.query() {
            Some(q) => format!("{path}?{q}"),
            None => path.to_owned(),
        };
        self.uri = Uri::try_from(target).map_err(http::Error::from)?;
        Ok(())
    }

    pub fn querystring(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    /// Replace the query string, retaining the path.
    pub fn set_querystring(&mut self, qs: &str) -> Result<(), Error> {
        let target = if qs.is_empty() {
            self.uri.path().to_owned()
        } else {
            format!("{}?{qs}", self.uri.path())
        };
        self.uri = Uri::try_from(target).map_err(http::Error::from)?;
        Ok(())
    }

    /// Parsed query pairs, in order of appearance.
    pub fn query(&self) -> QueryPairs {
        let qs = self.querystring();
        let mut cache = self.query_cache.borrow_mut();
        if let Some((key, parsed)) = cache.as_ref()
            && key == qs
        {
            return parsed.clone();
        }
        let parsed: QueryPairs = serde_urlencoded::from_str(qs).unwrap_or_default();
        *cache = Some((qs.to_owned(), parsed.clone()));
        parsed
    }

    /// Serialize `pairs` back into the query string.
    pub fn set_query(&mut self, pairs: &[(String, String)]) -> Result<(), Error> {
        let qs = serde_urlencoded::to_string(pairs)
            .map_err(|e| Error::internal(e.to_string()))?;
        self.set_querystring(&qs)
    }

    // ===== Headers =====

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Case-insensitive header lookup.
    ///
    /// `Referrer` and `Referer` are interchangeable: either stored spelling
    /// satisfies either accessor spelling.
    pub fn header(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case("referer") || name.eq_ignore_ascii_case("referrer") {
            return headers::get(&self.headers, "referrer")
                .or_else(|| headers::get(&self.headers, "referer"));
        }
        headers::get(&self.headers, name)
    }

    // ===== Derived fields =====

    /// Hostname, without port.
    ///
    /// `X-Forwarded-Host` is consulted only under proxy trust; the first
    /// comma-separated token wins.
    pub fn host(&self) -> Option<String> {
        let raw = self
            .settings
            .proxy
            .then(|| self.header("x-forwarded-host"))
            .flatten()
            .or_else(|| self.header("host"))?;
        let first = raw.split(',').next().unwrap_or("").trim();
        let bare = first.split(':').next().unwrap_or("");
        (!bare.is_empty()).then(|| bare.to_owned())
    }

    /// `"https"` when the connection is encrypted, else the first
    /// `X-Forwarded-Proto` token under proxy trust, else `"http"`.
    pub fn protocol(&self) -> &str {
        if self.conn.secure {
            return "https";
        }
        if !self.settings.proxy {
            return "http";
        }
        self.header("x-forwarded-proto")
            .and_then(|proto| proto.split(',').next())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or("http")
    }

    pub fn secure(&self) -> bool {
        self.protocol() == "https"
    }

    /// The `X-Forwarded-For` address chain under proxy trust, else empty.
    pub fn ips(&self) -> Vec<String> {
        if !self.settings.proxy {
            return Vec::new();
        }
        match self.header("x-forwarded-for") {
            Some(val) => val.split(',').map(|ip| ip.trim().to_owned()).collect(),
            None => Vec::new(),
        }
    }

    /// First forwarded address, or the connection's remote address.
    pub fn ip(&self) -> Option<String> {
        self.ips()
            .into_iter()
            .next()
            .or_else(|| self.conn.remote_addr.map(|a| a.to_string()))
    }

    /// Host labels before the base domain, nearest-to-base first.
    pub fn subdomains(&self) -> Vec<String> {
        let Some(host) = self.host() else {
            return Vec::new();
        };
        host.split('.')
            .rev()
            .skip(self.settings.subdomain_offset)
            .map(str::to_owned)
            .collect()
    }

    /// Parsed `Content-Length`; a non-numeric value coerces to 0.
    pub fn length(&self) -> Option<u64> {
        self.header("content-length")
            .map(|len| len.trim().parse().unwrap_or(0))
    }

    /// True only for GET and HEAD.
    pub fn idempotent(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// Declared media type, parameters stripped.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
    }

    /// Whether the declared content type matches `pattern`.
    ///
    /// Bare extensions resolve through the MIME capability; a `*` on either
    /// side of the slash matches when the other side is equal.
    pub fn is(&self, pattern: &str) -> bool {
        let Some(ct) = self.content_type() else {
            return false;
        };

        let resolved;
        let pattern = if pattern.contains('/') {
            pattern
        } else {
            match self.caps.mime.resolve(pattern) {
                Some(mime) => {
                    resolved = mime;
                    resolved.as_str()
                }
                None => return false,
            }
        };

        if pattern.contains('*') {
            let (pt, ps) = split_media_type(pattern);
            let (ct_t, ct_s) = split_media_type(ct);
            return (pt == "*" && ps == ct_s) || (ps == "*" && pt == ct_t);
        }
        pattern == ct
    }

    // ===== Negotiation =====

    /// Best of `candidates` against the `Accept` header, or `None` when
    /// nothing is acceptable. Bare extensions resolve through the MIME
    /// capability; the matching original candidate is returned.
    pub fn accepts(&self, candidates: &[&str]) -> Option<String> {
        let raw = self.header("accept").unwrap_or("*/*");
        let mimes: Vec<String> = candidates
            .iter()
            .map(|c| {
                if c.contains('/') {
                    (*c).to_owned()
                } else {
                    self.caps.mime.resolve(c).unwrap_or_else(|| (*c).to_owned())
                }
            })
            .collect();
        let ranked = self.caps.negotiator.rank(raw, &mimes);
        let first = ranked.first()?;
        let idx = mimes.iter().position(|m| m == first)?;
        Some(candidates[idx].to_owned())
    }

    /// Full media-type preference order from the `Accept` header.
    pub fn preferred_media_types(&self) -> Vec<String> {
        let raw = self.header("accept").unwrap_or("*/*");
        self.caps.negotiator.rank(raw, &[])
    }

    pub fn accepts_encodings(&self, candidates: &[&str]) -> Option<String> {
        self.negotiate_first("accept-encoding", candidates)
    }

    pub fn preferred_encodings(&self) -> Vec<String> {
        self.preference_order("accept-encoding")
    }

    pub fn accepts_charsets(&self, candidates: &[&str]) -> Option<String> {
        self.negotiate_first("accept-charset", candidates)
    }

    pub fn preferred_charsets(&self) -> Vec<String> {
        self.preference_order("accept-charset")
    }

    pub fn accepts_languages(&self, candidates: &[&str]) -> Option<String> {
        self.negotiate_first("accept-language", candidates)
    }

    pub fn preferred_languages(&self) -> Vec<String> {
        self.preference_order("accept-language")
    }

    fn negotiate_first(&self, header: &str, candidates: &[&str]) -> Option<String> {
        let raw = self.header(header).unwrap_or("*");
        let candidates: Vec<String> = candidates.iter().map(|c| (*c).to_owned()).collect();
        self.caps.negotiator.rank(raw, &candidates).into_iter().next()
    }

    fn preference_order(&self, header: &str) -> Vec<String> {
        let raw = self.header(header).unwrap_or("*");
        self.caps.negotiator.rank(raw, &[])
    }

    // ===== Freshness =====

    /// Whether the client's cached view is still fresh against `res`.
    ///
    /// Only GET/HEAD with a 2xx or 304 response qualify; the actual
    /// conditional-header comparison is delegated to the freshness
    /// capability.
    pub fn fresh(&self, res: &Response) -> bool {
        if !self.idempotent() {
            return false;
        }
        let status = res.status().as_u16();
        if (200..300).contains(&status) || status == 304 {
            return self.caps.freshness.is_fresh(&self.headers, res.headers());
        }
        false
    }

    pub fn stale(&self, res: &Response) -> bool {
        !self.fresh(res)
    }
}

fn split_media_type(value: &str) -> (&str, &str) {
    match value.split_once('/') {
        Some((t, s)) => (t, s),
        None => (value, ""),
    }
}
