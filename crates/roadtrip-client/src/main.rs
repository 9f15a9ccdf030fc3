//! Arcade driving simulator over a panoramic street-imagery graph.
//!
//! The vehicle follows the imagery service's link graph: physics integrates
//! speed and heading each frame, traversal accrues progress toward the next
//! panorama and prefetches it before arrival, and a mode state machine gates
//! the whole loop.

mod async_runtime;
mod hud;
mod input;
mod launch_params;
mod loader;
mod locations;
mod modes;
mod profile;
mod surface;
mod traversal;
mod vehicle;

use async_runtime::AsyncRuntimePlugin;
use bevy::prelude::*;
use hud::HudPlugin;
use input::DriveInputPlugin;
use launch_params::LaunchParams;
use loader::LoaderPlugin;
use modes::ModesPlugin;
use profile::ProfilePlugin;
use surface::SurfacePlugin;
use traversal::TraversalPlugin;
use vehicle::VehiclePlugin;

/// Ordering of the per-frame engine work.
///
/// The Update schedule is the continuously-rescheduled frame callback: input
/// snapshot, physics, traversal, then publishing to the rendering surface
/// and HUD. The sets always run; mode gating happens inside the systems.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveSet {
    /// Snapshot control intents from the input device.
    Input,
    /// Advance vehicle speed, steering, and heading.
    Physics,
    /// Accrue progress, select links, prefetch, commit transitions.
    Traversal,
    /// Push orientation to the panorama surface and publish HUD snapshots.
    Publish,
}

/// Plugin for the main application.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (
                DriveSet::Input,
                DriveSet::Physics,
                DriveSet::Traversal,
                DriveSet::Publish,
            )
                .chain(),
        )
        .add_plugins((
            ProfilePlugin,
            DriveInputPlugin,
            SurfacePlugin,
            LoaderPlugin,
            VehiclePlugin,
            TraversalPlugin,
            ModesPlugin,
            HudPlugin,
        ))
        .add_systems(Startup, setup_scene);
    }
}

/// Spawn the 2D camera the egui overlay renders against.
fn setup_scene(mut commands: Commands) {
    commands.spawn(Camera2d);
    tracing::info!("Scene setup complete");
}

fn main() {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "roadtrip".to_string(),
        resolution: (1280, 720).into(),
        ..Default::default()
    };

    // WASM: Fit canvas to parent element and prevent browser event handling.
    #[cfg(target_family = "wasm")]
    {
        window.fit_canvas_to_parent = true;
        window.prevent_default_event_handling = true;
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }));

    app.insert_resource(LaunchParams::from_environment());

    app.add_plugins((AsyncRuntimePlugin, AppPlugin)).run();
}
