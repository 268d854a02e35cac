use std::borrow::Cow;
use std::mem;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};
use http::header::HeaderName;
use http::uri::{Authority, PathAndQuery, Scheme};
use http::{HeaderMap, HeaderValue, Method, Uri};

/// Signing context for a request.
///
/// Built from [`http::request::Parts`] before signing and applied back
/// afterwards. Headers and URI components are taken out of the parts to
/// avoid copies and returned by [`apply`](Self::apply).
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path.
    pub path: String,
    /// Query parameters, percent-decoded.
    pub query: Vec<(String, String)>,
    /// A trailing value-less query token like `uploads` in `?uploads`.
    ///
    /// The scanner locates parameters by their `=` separator, so a tail
    /// without one never becomes a name/value pair. It stays out of the
    /// canonical query but is restored to the URL on apply.
    pub query_trailer: Option<String>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from [`http::request::Parts`].
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        let (query, query_trailer) = scan_query(paq.query().unwrap_or_default());

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri
                .authority
                .ok_or_else(|| Error::request_invalid("request without authority cannot be signed"))?,
            path: paq.path().to_string(),
            query,
            query_trailer,

            // Take the headers out of the request to avoid copy.
            // They are returned when the context is applied.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to [`http::request::Parts`].
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self
            .query
            .iter()
            .map(|(k, v)| k.len() + v.len() + 2)
            .sum::<usize>()
            + self.query_trailer.as_ref().map(|t| t.len() + 1).unwrap_or(0);

        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = if query_size == 0 {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + 1);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }

                        s.push_str(k);
                        if !v.is_empty() {
                            s.push('=');
                            s.push_str(v);
                        }
                    }
                    if let Some(trailer) = &self.query_trailer {
                        if !self.query.is_empty() {
                            s.push('&');
                        }
                        s.push_str(trailer);
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get the path percent decoded.
    pub fn path_percent_decoded(&self) -> Cow<str> {
        percent_encoding::percent_decode_str(&self.path).decode_utf8_lossy()
    }

    /// Push a new query pair into the query list.
    #[inline]
    pub fn query_push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Get header value by name, empty string if the header is absent.
    #[inline]
    pub fn header_get_or_default(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Ok(""),
        }
    }

    /// Normalize a header value: trim surrounding whitespace and collapse
    /// internal runs of spaces and tabs to a single space.
    pub fn header_value_normalize(v: &mut HeaderValue) {
        let bs = v.as_bytes();
        let mut out = Vec::with_capacity(bs.len());

        let mut in_run = true;
        for &b in bs {
            if b == b' ' || b == b'\t' {
                if !in_run {
                    out.push(b' ');
                    in_run = true;
                }
            } else {
                out.push(b);
                in_run = false;
            }
        }
        while out.last() == Some(&b' ') {
            out.pop();
        }

        // This can't fail because we started with a valid HeaderValue and
        // only removed or replaced whitespace.
        *v = HeaderValue::from_bytes(&out).expect("normalized header value must be valid")
    }

    /// Get header names as a sorted vector of lowercase names.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }

    /// Get all values of a header joined with commas, the canonical form
    /// for repeated headers.
    pub fn header_values_joined(&self, name: &str) -> Result<String> {
        let mut out = String::new();
        for (i, value) in self.headers.get_all(name).iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(value.to_str()?);
        }
        Ok(out)
    }
}

/// Scan a raw query string into percent-decoded pairs plus an optional
/// trailing value-less token.
///
/// Each parameter is located by its `=`: the name runs from the current
/// position to the first `=` (even across `&`), the value to the next `&`.
/// Raw `foo&bar=qux` therefore parses as the single parameter `foo&bar`
/// with value `qux`, and a tail without `=` is returned separately.
pub fn scan_query(raw: &str) -> (Vec<(String, String)>, Option<String>) {
    fn decode(s: &str) -> String {
        percent_encoding::percent_decode_str(s)
            .decode_utf8_lossy()
            .into_owned()
    }

    let mut pairs = Vec::new();
    let mut rest = raw;
    loop {
        if rest.is_empty() {
            return (pairs, None);
        }
        let Some(eq) = rest.find('=') else {
            return (pairs, Some(rest.to_string()));
        };
        let name = &rest[..eq];
        let after = &rest[eq + 1..];
        let (value, next) = match after.find('&') {
            Some(amp) => (&after[..amp], &after[amp + 1..]),
            None => (after, ""),
        };
        pairs.push((decode(name), decode(value)));
        rest = next;
    }
}

/// SigningMethod is the method that used in signing.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum SigningMethod {
    /// Signing with header.
    Header,
    /// Signing with query.
    Query(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("", &[], None; "empty")]
    #[test_case("a=1", &[("a", "1")], None; "single pair")]
    #[test_case("partNumber=1&uploadId=abc", &[("partNumber", "1"), ("uploadId", "abc")], None; "two pairs")]
    #[test_case("foo&bar=qux", &[("foo&bar", "qux")], None; "name crosses ampersand")]
    #[test_case("uploads", &[], Some("uploads"); "value less token")]
    #[test_case("a=1&uploads", &[("a", "1")], Some("uploads"); "trailing value less token")]
    #[test_case("uploads&x=1", &[("uploads&x", "1")], None; "leading token merges into name")]
    #[test_case("a=", &[("a", "")], None; "empty value")]
    #[test_case("k=a%20b", &[("k", "a b")], None; "percent decoded")]
    #[test_case("prefix=CI%2F&max-keys=3", &[("prefix", "CI/"), ("max-keys", "3")], None; "encoded slash")]
    fn test_scan_query(raw: &str, pairs: &[(&str, &str)], trailer: Option<&str>) {
        let (got_pairs, got_trailer) = scan_query(raw);
        let want = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>();
        assert_eq!(got_pairs, want);
        assert_eq!(got_trailer.as_deref(), trailer);
    }

    #[test]
    fn test_header_value_normalize() {
        let cases = [
            ("a  b", "a b"),
            ("  a b  ", "a b"),
            ("a \t b", "a b"),
            ("abc", "abc"),
            ("", ""),
        ];
        for (input, expected) in cases {
            let mut v = HeaderValue::from_str(input).unwrap();
            SigningRequest::header_value_normalize(&mut v);
            assert_eq!(v.to_str().unwrap(), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_build_defaults_empty_path() {
        let mut parts = http::Request::builder()
            .method(Method::GET)
            .uri("http://example.com")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let req = SigningRequest::build(&mut parts).unwrap();
        assert_eq!(req.path, "/");
        assert!(req.query.is_empty());
        assert!(req.query_trailer.is_none());
    }

    #[test]
    fn test_build_apply_preserves_trailer() {
        let mut parts = http::Request::builder()
            .method(Method::POST)
            .uri("https://bucket.s3.amazonaws.com/key?uploads")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let req = SigningRequest::build(&mut parts).unwrap();
        assert_eq!(req.query_trailer.as_deref(), Some("uploads"));
        req.apply(&mut parts).unwrap();
        assert_eq!(parts.uri.query(), Some("uploads"));
    }

    #[test]
    fn test_header_values_joined() {
        let mut parts = http::Request::builder()
            .method(Method::GET)
            .uri("http://example.com/")
            .header("x-amz-meta-tag", "one")
            .header("x-amz-meta-tag", "two")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let req = SigningRequest::build(&mut parts).unwrap();
        assert_eq!(req.header_values_joined("x-amz-meta-tag").unwrap(), "one,two");
    }
}
