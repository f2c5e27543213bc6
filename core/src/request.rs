//! RequestContext - immutable snapshot of the inbound request.

use crate::callback::Callback;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::net::IpAddr;

/// Locale preference order sent by the client, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreferredLocales(Vec<String>);

impl PreferredLocales {
    pub const FALLBACK: &'static str = "en";

    pub fn new<I, S>(locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(locales.into_iter().map(Into::into).collect())
    }

    /// Parses an `Accept-Language` header value, honouring `q` weights.
    pub fn from_accept_language(header: &str) -> Self {
        let mut weighted: Vec<(String, f32)> = header
            .split(',')
            .filter_map(|part| {
                let mut pieces = part.trim().split(';');
                let tag = pieces.next()?.trim();
                if tag.is_empty() || tag == "*" {
                    return None;
                }
                let weight = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                // q=0 marks the tag as not acceptable
                (weight > 0.0).then(|| (tag.to_string(), weight))
            })
            .collect();
        // stable sort keeps header order for equal weights
        weighted.sort_by(|a, b| b.1.total_cmp(&a.1));
        Self(weighted.into_iter().map(|(tag, _)| tag).collect())
    }

    /// The most preferred locale, or [`FALLBACK`](Self::FALLBACK).
    pub fn preferred(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or(Self::FALLBACK)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Transport-level facts about the request that triggered a tree step.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    headers: HeaderMap,
    cookies: BTreeMap<String, String>,
    locales: PreferredLocales,
    client_ip: Option<IpAddr>,
    host_name: Option<String>,
    server_url: Option<String>,
    parameters: BTreeMap<String, Vec<String>>,
    sso_token_id: Option<String>,
    callbacks: Vec<Callback>,
}

impl RequestContext {
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of the named header, if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn locales(&self) -> &PreferredLocales {
        &self.locales
    }

    pub fn client_ip(&self) -> Option<IpAddr> {
        self.client_ip
    }

    pub fn host_name(&self) -> Option<&str> {
        self.host_name.as_deref()
    }

    pub fn server_url(&self) -> Option<&str> {
        self.server_url.as_deref()
    }

    pub fn parameters(&self) -> &BTreeMap<String, Vec<String>> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn sso_token_id(&self) -> Option<&str> {
        self.sso_token_id.as_deref()
    }

    /// Callbacks submitted by the client for the previous step.
    pub fn callbacks(&self) -> &[Callback] {
        &self.callbacks
    }

    /// The same request as seen by nodes after the one that sent callbacks.
    pub fn without_callbacks(&self) -> Self {
        Self {
            callbacks: Vec::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Default)]
pub struct RequestContextBuilder {
    inner: RequestContext,
}

impl RequestContextBuilder {
    /// Adds a header value. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.inner.headers.append(name, value);
            }
            _ => tracing::debug!(header = name, "ignoring malformed request header"),
        }
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.inner.headers = headers;
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.cookies.insert(name.into(), value.into());
        self
    }

    pub fn locales(mut self, locales: PreferredLocales) -> Self {
        self.inner.locales = locales;
        self
    }

    pub fn client_ip(mut self, ip: IpAddr) -> Self {
        self.inner.client_ip = Some(ip);
        self
    }

    pub fn host_name(mut self, host: impl Into<String>) -> Self {
        self.inner.host_name = Some(host.into());
        self
    }

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.inner.server_url = Some(url.into());
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner
            .parameters
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn sso_token_id(mut self, token: impl Into<String>) -> Self {
        self.inner.sso_token_id = Some(token.into());
        self
    }

    pub fn callback(mut self, callback: Callback) -> Self {
        self.inner.callbacks.push(callback);
        self
    }

    pub fn callbacks(mut self, callbacks: impl IntoIterator<Item = Callback>) -> Self {
        self.inner.callbacks.extend(callbacks);
        self
    }

    /// Finishes the snapshot. Locales default to the `Accept-Language` header.
    pub fn build(mut self) -> RequestContext {
        if self.inner.locales.is_empty() {
            if let Some(accept) = self.inner.header(http::header::ACCEPT_LANGUAGE.as_str()) {
                self.inner.locales = PreferredLocales::from_accept_language(accept);
            }
        }
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_language_is_ordered_by_weight() {
        let locales = PreferredLocales::from_accept_language("fr;q=0.5, en-GB, de;q=0.8, *;q=0.1");
        let ordered: Vec<_> = locales.iter().collect();
        assert_eq!(ordered, vec!["en-GB", "de", "fr"]);
        assert_eq!(locales.preferred(), "en-GB");
    }

    #[test]
    fn zero_weighted_tags_are_dropped() {
        let locales = PreferredLocales::from_accept_language("de;q=0, fr;q=0.0, en-GB;q=0.3");
        assert_eq!(locales.iter().collect::<Vec<_>>(), vec!["en-GB"]);
    }

    #[test]
    fn empty_locales_fall_back() {
        assert_eq!(PreferredLocales::default().preferred(), PreferredLocales::FALLBACK);
    }

    #[test]
    fn builder_collects_request_facts() {
        let request = RequestContext::builder()
            .header("Accept-Language", "es")
            .header("X-Forwarded-For", "10.0.0.1")
            .cookie("iPlanetDirectoryPro", "token-123")
            .client_ip("192.0.2.7".parse().unwrap())
            .host_name("am.example.com")
            .parameter("realm", "/alpha")
            .sso_token_id("token-123")
            .callback(Callback::name("User Name").with_input("alice"))
            .build();

        assert_eq!(request.header("x-forwarded-for"), Some("10.0.0.1"));
        assert_eq!(request.cookie("iPlanetDirectoryPro"), Some("token-123"));
        assert_eq!(request.locales().preferred(), "es");
        assert_eq!(request.client_ip(), Some("192.0.2.7".parse().unwrap()));
        assert_eq!(request.host_name(), Some("am.example.com"));
        assert_eq!(request.parameter("realm"), Some("/alpha"));
        assert_eq!(request.sso_token_id(), Some("token-123"));
        assert_eq!(request.callbacks().len(), 1);
    }
}
