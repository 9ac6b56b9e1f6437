use std::borrow::Cow;
use std::mem;
use std::str::FromStr;

use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::Uri;

use crate::{Error, Result};

/// Signing context for request.
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
    /// HTTP query parameters.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path: paq.path().to_string(),
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self.query_size();

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

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get the path percent decoded.
    pub fn path_percent_decoded(&self) -> Cow<'_, str> {
        percent_encoding::percent_decode_str(&self.path).decode_utf8_lossy()
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
    }

    /// Normalize header value by trimming leading and trailing spaces.
    pub fn header_value_normalize(v: &mut HeaderValue) {
        let bs = v.as_bytes();

        let starting_index = bs.iter().position(|b| *b != b' ').unwrap_or(0);
        let ending_offset = bs.iter().rev().position(|b| *b != b' ').unwrap_or(0);
        let ending_index = bs.len() - ending_offset;

        // This can't fail because we started with a valid HeaderValue and then only trimmed spaces
        *v = HeaderValue::from_bytes(&bs[starting_index..ending_index])
            .expect("invalid header value")
    }

    /// Get header names as sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parts(uri: &str) -> http::request::Parts {
        http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(())
            .expect("request must be valid")
            .into_parts()
            .0
    }

    #[test]
    fn test_build_and_apply() -> anyhow::Result<()> {
        let mut parts = parts("https://api.example.com/items/42?b=2&a=1");
        let req = SigningRequest::build(&mut parts)?;

        assert_eq!(req.authority.as_str(), "api.example.com");
        assert_eq!(req.path, "/items/42");
        assert_eq!(
            req.query,
            vec![
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "1".to_string())
            ]
        );
        assert_eq!(req.header_name_to_vec_sorted(), vec!["content-type"]);
        assert!(parts.headers.is_empty(), "headers are moved out");

        req.apply(&mut parts)?;
        assert_eq!(parts.uri.to_string(), "https://api.example.com/items/42?b=2&a=1");
        assert_eq!(parts.headers["content-type"], "application/json");
        Ok(())
    }

    #[test]
    fn test_build_without_authority() {
        let mut parts = parts("/items/42");
        let err = SigningRequest::build(&mut parts).expect_err("must fail without authority");
        assert_eq!(err.kind(), crate::ErrorKind::RequestInvalid);
    }

    #[test]
    fn test_header_value_normalize() {
        let mut v = HeaderValue::from_static("  a  b  ");
        SigningRequest::header_value_normalize(&mut v);
        assert_eq!(v, "a  b");
    }

    #[test]
    fn test_path_percent_decoded() -> anyhow::Result<()> {
        let mut parts = parts("https://api.example.com/a%20b");
        let req = SigningRequest::build(&mut parts)?;
        assert_eq!(req.path_percent_decoded(), "a b");
        Ok(())
    }
}
