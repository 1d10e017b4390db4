//! Scheme URL parsing.
//!
//! `<scheme>://<domain>[/<action>[/...]][?<query>]` becomes a [`ParsedUrl`].
//! The scheme is compared case-sensitively against the raw input, before the
//! `url` crate normalizes it to lowercase.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use thiserror::Error;
use url::Url;

use super::types::{ParsedUrl, Params};

/// Characters escaped when re-encoding a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Why a URL could not be turned into routing fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlParseError {
    #[error("not a scheme URL: missing '://'")]
    MissingScheme,

    #[error("scheme mismatch: expected '{expected}', got '{found}'")]
    SchemeMismatch { expected: String, found: String },

    #[error("malformed URL: {0}")]
    Malformed(#[from] url::ParseError),

    #[error("invalid percent-encoding in '{0}'")]
    InvalidEncoding(String),

    #[error("URL has no domain")]
    MissingDomain,
}

/// Parses `raw` as a URL of `scheme`.
///
/// # Errors
///
/// Returns a [`UrlParseError`] if the scheme differs (case-sensitively), the
/// URL is malformed, or it names no domain.
pub fn parse(scheme: &str, raw: &str) -> Result<ParsedUrl, UrlParseError> {
    let raw = raw.trim();
    let (found, _) = raw.split_once("://").ok_or(UrlParseError::MissingScheme)?;
    if found != scheme {
        return Err(UrlParseError::SchemeMismatch {
            expected: scheme.to_string(),
            found: found.to_string(),
        });
    }

    let url = Url::parse(raw)?;

    let mut path = Vec::new();
    if let Some(host) = url.host_str().filter(|host| !host.is_empty()) {
        path.push(decode(host)?);
    }
    for segment in url.path_segments().into_iter().flatten() {
        if !segment.is_empty() {
            path.push(decode(segment)?);
        }
    }

    let domain = path.first().cloned().ok_or(UrlParseError::MissingDomain)?;
    let action = path.get(1).cloned();
    let params: Params = url.query_pairs().filter(|(key, _)| !key.is_empty()).collect();

    Ok(ParsedUrl {
        scheme: scheme.to_string(),
        path,
        domain,
        action,
        params,
    })
}

impl ParsedUrl {
    /// Re-encodes the routing fields as a URL.
    ///
    /// Parsing the result yields the same fields; the text may differ from the
    /// original only in percent-encoding.
    #[must_use]
    pub fn to_url(&self) -> String {
        let segments: Vec<String> = self
            .path
            .iter()
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect();

        let mut url = format!("{}://{}", self.scheme, segments.join("/"));
        if !self.params.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.params.iter())
                .finish();
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

fn decode(segment: &str) -> Result<String, UrlParseError> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| UrlParseError::InvalidEncoding(segment.to_string()))
}
