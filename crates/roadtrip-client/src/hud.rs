//! In-game UI: setup, menu, loading screen, and the driving dashboard.
//!
//! One egui window per mode. The UI never mutates simulation state directly;
//! it calls the guarded mode transitions and the loader, same as any other
//! system would.

use bevy::{ecs::system::SystemParam, prelude::*};
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};

use crate::{
    async_runtime::TaskSpawner,
    input::DriveIntents,
    launch_params::LaunchParams,
    loader::{GraphClient, InitialLoad},
    locations::{GameLocation, preset_locations},
    modes::{GameMode, GameModeState, PARK_SPEED_THRESHOLD_KMH, ParkRequest},
    profile::ProfileStore,
    surface::PanoSurface,
    vehicle::VehicleState,
};

/// Text buffer for the API key field.
#[derive(Resource, Default)]
struct SetupInputState {
    key_text: String,
}

/// Plugin for the mode-driven UI overlay.
pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .init_resource::<SetupInputState>()
            .add_systems(Startup, skip_setup_when_credentialed)
            .add_systems(EguiPrimaryContextPass, hud_system);
    }
}

/// A key supplied on the command line or remembered in the profile skips the
/// setup screen.
fn skip_setup_when_credentialed(
    params: Res<LaunchParams>,
    profile: Res<ProfileStore>,
    mut mode: ResMut<GameModeState>,
) {
    if params.api_key.is_some() || profile.profile.api_key.is_some() {
        mode.confirm_credential();
    }
}

/// Resources the menu and loading screens act on.
#[derive(SystemParam)]
struct FlowParams<'w, 's> {
    params: Res<'w, LaunchParams>,
    profile: ResMut<'w, ProfileStore>,
    client: Option<ResMut<'w, GraphClient>>,
    load: ResMut<'w, InitialLoad>,
    spawner: TaskSpawner<'w, 's>,
}

impl FlowParams<'_, '_> {
    fn start_drive(&mut self, location: GameLocation, mode: &mut GameModeState) {
        let Some(client) = self.client.as_deref() else {
            return;
        };
        if mode.start_loading() {
            self.load.begin(location, client, &self.spawner);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn hud_system(
    mut contexts: EguiContexts,
    mut mode: ResMut<GameModeState>,
    mut setup_state: ResMut<SetupInputState>,
    mut flow: FlowParams,
    mut park_request: ResMut<ParkRequest>,
    vehicle: Res<VehicleState>,
    intents: Res<DriveIntents>,
    surface: Res<PanoSurface>,
) -> Result {
    let ctx = contexts.ctx_mut()?;

    match mode.current() {
        GameMode::Setup => setup_window(ctx, &mut mode, &mut setup_state, &mut flow),
        GameMode::Menu => menu_window(ctx, &mut mode, &mut flow),
        GameMode::Loading => loading_window(ctx, &mut mode, &mut flow),
        GameMode::Driving | GameMode::Parked => {
            dashboard_window(ctx, &mode, &mut park_request, &vehicle, &intents, &surface);
        }
    }
    Ok(())
}

fn setup_window(
    ctx: &egui::Context,
    mode: &mut GameModeState,
    state: &mut SetupInputState,
    flow: &mut FlowParams,
) {
    egui::Window::new("Welcome")
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label("Enter your imagery service API key to start driving.");
            ui.add(
                egui::TextEdit::singleline(&mut state.key_text)
                    .desired_width(260.0)
                    .hint_text("API key"),
            );
            let key = state.key_text.trim();
            if ui
                .add_enabled(!key.is_empty(), egui::Button::new("Continue"))
                .clicked()
            {
                flow.profile.set_api_key(Some(key.to_string()));
                if let Some(client) = flow.client.as_deref_mut() {
                    client.rebuild_with_key(&flow.params, Some(key.to_string()));
                }
                mode.confirm_credential();
            }
        });
}

fn menu_window(ctx: &egui::Context, mode: &mut GameModeState, flow: &mut FlowParams) {
    egui::Window::new("Pick a destination")
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            let mut chosen = None;

            for location in preset_locations() {
                if ui.button(&location.name).clicked() {
                    chosen = Some(location.clone());
                }
            }
            if let Some((lat, lon)) = flow.params.start
                && ui.button(format!("Custom start ({lat:.4}, {lon:.4})")).clicked()
            {
                chosen = Some(GameLocation {
                    id: "custom".to_string(),
                    name: "Custom start".to_string(),
                    lat,
                    lon,
                });
            }

            ui.separator();
            ui.label(format!(
                "{} - {:.2} km driven",
                flow.profile.profile.username, flow.profile.profile.distance_driven_km
            ));
            if ui.button("Change API key").clicked() {
                mode.reenter_setup();
            }

            if let Some(location) = chosen {
                flow.start_drive(location, mode);
            }
        });
}

fn loading_window(ctx: &egui::Context, mode: &mut GameModeState, flow: &mut FlowParams) {
    egui::Window::new("Loading")
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            let destination = flow.load.destination.clone();
            if let Some(destination) = &destination {
                ui.label(format!("Heading to {}...", destination.name));
            }

            if let Some(error) = flow.load.error.clone() {
                ui.colored_label(egui::Color32::RED, error);
                if let Some(destination) = destination
                    && ui.button("Retry").clicked()
                    && let Some(client) = flow.client.as_deref().cloned()
                {
                    // Re-issuing the same fetch clears the error.
                    flow.load.begin(destination, &client, &flow.spawner);
                }
                if ui.button("Back to menu").clicked() {
                    mode.cancel_loading();
                }
            } else {
                ui.spinner();
                if ui.button("Cancel").clicked() {
                    mode.cancel_loading();
                }
            }
        });
}

fn dashboard_window(
    ctx: &egui::Context,
    mode: &GameModeState,
    park_request: &mut ParkRequest,
    vehicle: &VehicleState,
    intents: &DriveIntents,
    surface: &PanoSurface,
) {
    egui::Window::new("Dashboard")
        .collapsible(false)
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            ui.label(format!("{:3.0} km/h", vehicle.speed_kmh));
            ui.label(format!("Heading {:3.0}\u{b0}", vehicle.heading_deg));
            if let Some(name) = surface.location_name() {
                ui.label(name);
            }
            if intents.handbrake {
                ui.colored_label(egui::Color32::RED, "HANDBRAKE");
            }

            if mode.is_parked() {
                ui.colored_label(egui::Color32::YELLOW, "PARKED");
                if ui.button("Resume driving").clicked() {
                    park_request.request();
                }
            } else if ui
                .add_enabled(
                    vehicle.speed_kmh <= PARK_SPEED_THRESHOLD_KMH,
                    egui::Button::new("Park"),
                )
                .clicked()
            {
                park_request.request();
            }
        });
}
