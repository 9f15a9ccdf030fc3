//! Preset driving destinations.

use serde::{Deserialize, Serialize};

/// A named starting point for a drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLocation {
    /// Stable identifier (used in the profile's favorites list).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl GameLocation {
    /// Create a location from literals.
    fn new(id: &str, name: &str, lat: f64, lon: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            lat,
            lon,
        }
    }
}

/// The built-in destination menu.
pub fn preset_locations() -> Vec<GameLocation> {
    vec![
        GameLocation::new("tokyo-shibuya", "Shibuya Crossing, Tokyo", 35.6595, 139.7004),
        GameLocation::new("sf-lombard", "Lombard St, San Francisco", 37.8021, -122.4187),
        GameLocation::new("ocean-drive", "Ocean Drive, Miami", 25.7796, -80.1320),
        GameLocation::new("paris-champs", "Champs-\u{c9}lys\u{e9}es, Paris", 48.8698, 2.3075),
        GameLocation::new("monaco-tunnel", "Fairmont Hairpin, Monaco", 43.7402, 7.4296),
    ]
}
