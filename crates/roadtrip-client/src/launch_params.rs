//! Launch parameter parsing.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use bevy::prelude::*;

/// Launch parameters for the simulator.
#[derive(Resource, Debug, Default)]
pub struct LaunchParams {
    /// Optional custom starting coordinate shown in the menu.
    pub start: Option<(f64, f64)>,
    /// Override for the imagery metadata service base URL.
    pub base_url: Option<String>,
    /// API key for the imagery service; falls back to the saved profile.
    pub api_key: Option<String>,
}

impl LaunchParams {
    /// Parse parameters from the environment for the current platform.
    #[must_use]
    pub fn from_environment() -> Self {
        #[cfg(not(target_family = "wasm"))]
        {
            native::parse()
        }
        #[cfg(target_family = "wasm")]
        {
            Self::default()
        }
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::LaunchParams;

    /// Arcade driving simulator over a panoramic street-imagery graph.
    #[derive(Parser, Debug)]
    #[command(name = "roadtrip", version)]
    struct Args {
        /// Custom starting latitude in degrees (requires --lon).
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Custom starting longitude in degrees (requires --lat).
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Base URL of the imagery metadata service.
        #[arg(long)]
        base_url: Option<String>,
        /// API key for the imagery service (otherwise read from the profile).
        #[arg(long, env = "ROADTRIP_API_KEY")]
        api_key: Option<String>,
    }

    pub fn parse() -> LaunchParams {
        let args = Args::parse();
        LaunchParams {
            start: args.lat.zip(args.lon),
            base_url: args.base_url,
            api_key: args.api_key,
        }
    }
}
