//! Game mode state machine.
//!
//! A single resource tracks which mode the session is in. All transitions go
//! through guarded methods so illegal jumps (driving without a loaded
//! panorama, parking at speed) cannot happen no matter which system asks.

use bevy::prelude::*;

use crate::{
    DriveSet,
    input::DriveIntents,
    surface::PanoSurface,
    vehicle::VehicleState,
};

/// Parking is only allowed at or below this speed, km/h.
pub const PARK_SPEED_THRESHOLD_KMH: f32 = 5.0;

/// The session's modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// Collecting an API key.
    Setup,
    /// Choosing a destination.
    Menu,
    /// Waiting for the first panorama.
    Loading,
    /// Behind the wheel.
    Driving,
    /// Stopped, free look.
    Parked,
}

/// Resource holding the current mode. Transition only through the guarded
/// methods; each returns whether it fired.
#[derive(Resource, Debug)]
pub struct GameModeState {
    current: GameMode,
}

impl Default for GameModeState {
    fn default() -> Self {
        Self {
            current: GameMode::Setup,
        }
    }
}

impl GameModeState {
    pub fn current(&self) -> GameMode {
        self.current
    }

    pub fn is_driving(&self) -> bool {
        self.current == GameMode::Driving
    }

    pub fn is_loading(&self) -> bool {
        self.current == GameMode::Loading
    }

    pub fn is_parked(&self) -> bool {
        self.current == GameMode::Parked
    }

    /// Setup -> Menu, once a usable key is in hand.
    pub fn confirm_credential(&mut self) -> bool {
        self.transition(GameMode::Setup, GameMode::Menu)
    }

    /// Menu -> Setup, to change the key.
    pub fn reenter_setup(&mut self) -> bool {
        self.transition(GameMode::Menu, GameMode::Setup)
    }

    /// Menu -> Loading, when a destination is picked.
    pub fn start_loading(&mut self) -> bool {
        self.transition(GameMode::Menu, GameMode::Loading)
    }

    /// Loading -> Menu. Always allowed: a load can be abandoned at any point,
    /// including after an error.
    pub fn cancel_loading(&mut self) -> bool {
        self.transition(GameMode::Loading, GameMode::Menu)
    }

    /// Loading -> Driving, once the first panorama's links are in.
    pub fn links_ready(&mut self) -> bool {
        self.transition(GameMode::Loading, GameMode::Driving)
    }

    /// Driving <-> Parked, guarded by the speed threshold on the way in.
    pub fn toggle_park(&mut self, speed_kmh: f32) -> bool {
        match self.current {
            GameMode::Driving if speed_kmh <= PARK_SPEED_THRESHOLD_KMH => {
                self.current = GameMode::Parked;
                true
            }
            GameMode::Parked => {
                self.current = GameMode::Driving;
                true
            }
            _ => false,
        }
    }

    fn transition(&mut self, from: GameMode, to: GameMode) -> bool {
        if self.current == from {
            self.current = to;
            true
        } else {
            false
        }
    }
}

/// One-shot park/unpark request, raised by the keyboard binding or the
/// dashboard button and drained once per frame.
#[derive(Resource, Debug, Default)]
pub struct ParkRequest {
    pending: bool,
}

impl ParkRequest {
    pub fn request(&mut self) {
        self.pending = true;
    }

    fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

/// Plugin running the mode transitions that react to gameplay rather than UI.
pub struct ModesPlugin;

impl Plugin for ModesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GameModeState>()
            .init_resource::<ParkRequest>()
            .add_systems(
                Update,
                (promote_on_links, handle_park_toggle).in_set(DriveSet::Publish),
            );
    }
}

/// Promote Loading -> Driving the moment the surface receives its first
/// panorama, aligning the vehicle with the node's capture heading.
fn promote_on_links(
    mut mode: ResMut<GameModeState>,
    mut surface: ResMut<PanoSurface>,
    mut vehicle: ResMut<VehicleState>,
) {
    if !surface.take_links_changed() {
        return;
    }
    // Node changes while already driving are ordinary traversal.
    if !mode.is_loading() {
        return;
    }
    if let Some(node) = surface.current() {
        let pitch = node.pitch;
        vehicle.heading_deg = node.heading.rem_euclid(360.0);
        surface.set_orientation(vehicle.heading_deg, pitch);
    }
    if mode.links_ready() {
        tracing::info!("First panorama ready, entering drive mode");
    }
}

fn handle_park_toggle(
    intents: Res<DriveIntents>,
    mut request: ResMut<ParkRequest>,
    mut mode: ResMut<GameModeState>,
    mut vehicle: ResMut<VehicleState>,
    mut surface: ResMut<PanoSurface>,
) {
    let requested = request.take() || intents.toggle_park;
    if !requested {
        return;
    }
    let was_parked = mode.is_parked();
    if !mode.toggle_park(vehicle.speed_kmh) {
        return;
    }
    if was_parked {
        leave_parked(&vehicle, &mut surface);
    } else {
        enter_parked(&mut vehicle);
    }
}

/// Side effects of entering Parked: the vehicle comes to a dead stop with
/// the wheel centered. Heading is held for the eventual un-park.
fn enter_parked(vehicle: &mut VehicleState) {
    vehicle.speed_kmh = 0.0;
    vehicle.steering_angle_deg = 0.0;
}

/// Side effects of leaving Parked: the view may have wandered during free
/// look, snap it back behind the wheel.
fn leave_parked(vehicle: &VehicleState, surface: &mut PanoSurface) {
    surface.set_orientation(vehicle.heading_deg, 0.0);
}
