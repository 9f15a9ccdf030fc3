//! High-level async client for panoramic street-imagery graph metadata.
//!
//! This crate provides an async HTTP client for fetching panorama nodes —
//! vantage points in a street-imagery graph, each carrying a set of directed
//! links to adjacent panoramas — along with caching abstractions and typed
//! request/response contracts.
//!
//! # Design principles
//!
//! - **Web-compatible**: Works on desktop and WASM via reqwest
//! - **Runtime-agnostic**: Returns `impl Future`, works with any executor
//! - **Typed boundaries**: Nodes, links, and failure reasons are explicit
//!   types rather than loosely-shaped dynamic payloads
//!
//! # Example
//!
//! ```ignore
//! use panograph::{Client, FetchOptions, NodeSelector};
//!
//! // Create a client with default settings.
//! let client = Client::new();
//!
//! // Find the nearest panorama to a coordinate.
//! let selector = NodeSelector::coordinate(35.6595, 139.7004);
//! let node = client.fetch_node(&selector, &FetchOptions::default()).await?;
//!
//! // Follow one of its links.
//! let next = client
//!     .fetch_node(&NodeSelector::Id(node.links[0].target.clone()), &FetchOptions::default())
//!     .await?;
//! ```

pub mod cache;
mod client;
mod error;
pub mod types;

pub use cache::{Cache, MemoryCache, NoCache};
pub use client::Client;
pub use error::{Error, Result, ServiceStatus};
pub use types::{FetchOptions, Link, NodeSelector, PanoId, PanoramaNode, SourceFilter};
