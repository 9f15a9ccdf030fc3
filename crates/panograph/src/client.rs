//! HTTP client for fetching panorama graph metadata.
//!
//! This module provides the main `Client` type for resolving coordinates to
//! panorama nodes and fetching specific nodes by id, along with their
//! outgoing links.

use std::sync::Arc;

use serde::Deserialize;

use crate::cache::{Cache, NoCache};
use crate::error::{Error, Result, ServiceStatus};
use crate::types::{FetchOptions, NodeSelector, PanoramaNode};

/// Default base URL for the street-imagery metadata service.
const BASE_URL: &str = "https://maps.googleapis.com/maps/api/streetview/metadata";

/// HTTP client for fetching panorama graph metadata.
///
/// The client handles HTTP requests, caching of id-addressed nodes, and JSON
/// decoding. It is runtime-agnostic and works with any async executor.
///
/// # Example
///
/// ```ignore
/// let client = Client::new().with_api_key("AIzaSy...".to_string());
/// let node = client
///     .fetch_node(&NodeSelector::coordinate(37.8021, -122.4187), &FetchOptions::default())
///     .await?;
/// ```
pub struct Client<C: Cache = NoCache> {
    http: reqwest::Client,
    cache: Arc<C>,
    base_url: String,
    api_key: Option<String>,
}

impl Client<NoCache> {
    /// Create a new client with default settings and no caching.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            cache: Arc::new(NoCache),
            base_url: BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl Default for Client<NoCache> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Cache> Client<C> {
    /// Create a new client with a custom cache.
    #[must_use]
    pub fn with_cache(cache: C) -> Self {
        Self {
            http: reqwest::Client::new(),
            cache: Arc::new(cache),
            base_url: BASE_URL.to_string(),
            api_key: None,
        }
    }

    /// Set a custom base URL (testing, self-hosted mirrors).
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the API key sent with every request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Fetch a panorama node and its outgoing links.
    ///
    /// Id-addressed fetches are served from the cache when possible;
    /// coordinate lookups always hit the network (the nearest node depends on
    /// the search options), but their results still populate the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails, the response cannot be
    /// decoded, or the service reports a non-OK status.
    pub async fn fetch_node(
        &self,
        selector: &NodeSelector,
        options: &FetchOptions,
    ) -> Result<PanoramaNode> {
        if let NodeSelector::Id(id) = selector
            && let Some(node) = self.cache.get(id).await?
        {
            tracing::debug!(id = %id, "cache hit");
            return Ok(node);
        }

        let url = self.node_url(selector, options);
        tracing::debug!(url, "fetching node");

        let response = self.http.get(&url).send().await.map_err(|e| Error::Http {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| Error::Http {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let node = decode_response(&body)?;
        self.cache.put(node.clone()).await?;
        Ok(node)
    }

    /// Build the request URL for a selector.
    fn node_url(&self, selector: &NodeSelector, options: &FetchOptions) -> String {
        let mut url = match selector {
            NodeSelector::Coordinate { lat, lon } => format!(
                "{}?location={lat},{lon}&radius={}&source={}",
                self.base_url,
                options.search_radius_m,
                options.source.as_query_value()
            ),
            NodeSelector::Id(id) => {
                format!("{}?pano={}", self.base_url, urlencoding::encode(id.as_str()))
            }
        };
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(&urlencoding::encode(key));
        }
        url
    }
}

/// Wire shape of a metadata response: a status string plus, on success, the
/// node payload.
#[derive(Debug, Deserialize)]
struct WireResponse {
    status: String,
    #[serde(default)]
    pano: Option<PanoramaNode>,
}

/// Decode a metadata response body into a node.
fn decode_response(body: &str) -> Result<PanoramaNode> {
    let wire: WireResponse = serde_json::from_str(body).map_err(|e| Error::Json {
        context: "node metadata",
        message: e.to_string(),
    })?;

    if let Some(status) = ServiceStatus::from_wire(&wire.status) {
        return Err(Error::Service(status));
    }

    wire.pano.ok_or(Error::Json {
        context: "node metadata",
        message: "status OK but no pano payload".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PanoId, SourceFilter};

    #[test]
    fn test_node_url_coordinate() {
        let client = Client::new().with_base_url("http://localhost/meta".to_string());
        let url = client.node_url(
            &NodeSelector::coordinate(35.6595, 139.7004),
            &FetchOptions::default(),
        );
        assert_eq!(
            url,
            "http://localhost/meta?location=35.6595,139.7004&radius=100&source=outdoor"
        );
    }

    #[test]
    fn test_node_url_id_with_key() {
        let client = Client::new()
            .with_base_url("http://localhost/meta".to_string())
            .with_api_key("k/ey".to_string());
        let url = client.node_url(
            &NodeSelector::Id(PanoId::new("ab cd")),
            &FetchOptions::default(),
        );
        assert_eq!(url, "http://localhost/meta?pano=ab%20cd&key=k%2Fey");
    }

    #[test]
    fn test_node_url_source_filter() {
        let client = Client::new().with_base_url("http://localhost/meta".to_string());
        let url = client.node_url(
            &NodeSelector::coordinate(0.0, 0.0),
            &FetchOptions {
                search_radius_m: 50.0,
                source: SourceFilter::Any,
            },
        );
        assert!(url.ends_with("radius=50&source=default"));
    }

    #[test]
    fn test_decode_response_ok() {
        let body = r#"{
            "status": "OK",
            "pano": {
                "id": "n1",
                "heading": 12.0,
                "pitch": 0.0,
                "links": [{"pano": "n2", "heading": 10.0, "label": "Main St"}]
            }
        }"#;
        let node = decode_response(body).unwrap();
        assert_eq!(node.id, PanoId::new("n1"));
        assert_eq!(node.links.len(), 1);
        assert_eq!(node.links[0].target, PanoId::new("n2"));
    }

    #[test]
    fn test_decode_response_service_failure() {
        let body = r#"{"status": "ZERO_RESULTS"}"#;
        let err = decode_response(body).unwrap_err();
        assert_eq!(err.service_status(), Some(ServiceStatus::ZeroResults));
    }

    #[test]
    fn test_decode_response_missing_payload() {
        let body = r#"{"status": "OK"}"#;
        assert!(matches!(
            decode_response(body),
            Err(Error::Json { context: "node metadata", .. })
        ));
    }

    #[test]
    fn test_client_default_base_url() {
        let client = Client::new();
        assert!(client.base_url.starts_with("https://"));
    }
}
