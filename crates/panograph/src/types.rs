//! High-level types for the street-imagery graph.
//!
//! A panorama graph is discovered at runtime: fetching a node reveals its
//! outgoing links, and nothing else about the graph is known in advance.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identity of a panorama node, assigned by the imagery service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanoId(pub String);

impl PanoId {
    /// Create an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PanoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PanoId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A directed edge from one panorama to an adjacent one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Id of the panorama this link leads to.
    #[serde(rename = "pano")]
    pub target: PanoId,
    /// Real-world heading a traveler takes along this link, in degrees.
    pub heading: f32,
    /// Human-readable description (usually a street name).
    #[serde(default)]
    pub label: String,
}

/// A single panoramic vantage point and its outgoing links.
///
/// Links are only known once the node is loaded; an empty link list is a
/// legitimate dead end, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanoramaNode {
    /// Opaque node identity.
    pub id: PanoId,
    /// Outgoing links, in service order.
    #[serde(default)]
    pub links: Vec<Link>,
    /// Camera heading returned with the node, in degrees.
    #[serde(default)]
    pub heading: f32,
    /// Camera pitch returned with the node, in degrees.
    #[serde(default)]
    pub pitch: f32,
    /// Display name for the surrounding location, when the service knows one.
    #[serde(default)]
    pub location_name: Option<String>,
}

impl PanoramaNode {
    /// Whether this node has any outgoing links.
    #[must_use]
    pub fn is_dead_end(&self) -> bool {
        self.links.is_empty()
    }
}

/// How to select a node to fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeSelector {
    /// Nearest node to a WGS84 coordinate.
    Coordinate {
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
    },
    /// A specific node by id.
    Id(PanoId),
}

impl NodeSelector {
    /// Select the nearest node to a coordinate.
    #[must_use]
    pub fn coordinate(lat: f64, lon: f64) -> Self {
        Self::Coordinate { lat, lon }
    }
}

/// Which imagery sources are acceptable when resolving a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFilter {
    /// Outdoor imagery only (roads rather than interiors).
    #[default]
    Outdoor,
    /// Any imagery source.
    Any,
}

impl SourceFilter {
    /// Query-parameter value understood by the service.
    #[must_use]
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Outdoor => "outdoor",
            Self::Any => "default",
        }
    }
}

/// Options for a node fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Search radius around a coordinate selector, in meters.
    pub search_radius_m: f64,
    /// Source filter for coordinate selectors.
    pub source: SourceFilter,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            // Look for a road within 100 m of the requested point.
            search_radius_m: 100.0,
            source: SourceFilter::Outdoor,
        }
    }
}
