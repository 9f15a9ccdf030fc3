//! User profile persistence.
//!
//! The engine treats the profile as a write-only side channel: distance is
//! recorded fire-and-forget on every node transition, and failures to write
//! never affect the drive. Storage is a JSON file next to the executable's
//! working directory.

use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::locations::GameLocation;

/// Profile file path.
const PROFILE_PATH: &str = "roadtrip_profile.json";

/// Plugin registering the profile store.
pub struct ProfilePlugin;

impl Plugin for ProfilePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ProfileStore::load_or_default(PROFILE_PATH));
    }
}

/// Persisted user data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name.
    pub username: String,
    /// Lifetime distance driven, in kilometers.
    pub distance_driven_km: f64,
    /// Favorite destinations.
    #[serde(default)]
    pub favorites: Vec<GameLocation>,
    /// Saved imagery-service API key.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            username: "Guest Driver".to_string(),
            distance_driven_km: 0.0,
            favorites: Vec::new(),
            api_key: None,
        }
    }
}

/// Resource owning the loaded profile and its backing file.
#[derive(Resource)]
pub struct ProfileStore {
    path: PathBuf,
    /// The in-memory profile. Mutate through the methods below so changes
    /// reach disk.
    pub profile: UserProfile,
}

impl ProfileStore {
    /// Load the profile from `path`, falling back to defaults on any error.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let profile = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::warn!("Profile file is corrupt, starting fresh: {e}");
                UserProfile::default()
            }),
            Err(_) => UserProfile::default(),
        };
        Self { path, profile }
    }

    /// Re-read the profile from disk, keeping the in-memory copy on failure.
    pub fn reload(&mut self) {
        if let Ok(data) = std::fs::read_to_string(&self.path)
            && let Ok(profile) = serde_json::from_str(&data)
        {
            self.profile = profile;
        }
    }

    /// Add driven distance and persist. Fire-and-forget: write failures are
    /// logged and otherwise ignored.
    pub fn record_distance(&mut self, km: f64) {
        self.profile.distance_driven_km += km;
        self.save();
    }

    /// Store a new API key and persist.
    pub fn set_api_key(&mut self, key: Option<String>) {
        self.profile.api_key = key;
        self.save();
    }

    /// Best-effort write of the current profile.
    pub fn save(&self) {
        match serde_json::to_string_pretty(&self.profile) {
            Ok(data) => {
                if let Err(e) = std::fs::write(&self.path, data) {
                    tracing::warn!("Failed to save profile: {e}");
                }
            }
            Err(e) => tracing::warn!("Failed to serialize profile: {e}"),
        }
    }
}
