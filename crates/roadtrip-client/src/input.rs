//! Centralized input action definitions and intent sampling.
//!
//! Defines the drive actions using `leafwing-input-manager` for declarative,
//! rebindable input mapping, and snapshots them into [`DriveIntents`] once per
//! frame so the physics step sees a stable view of the controls.

use bevy::prelude::*;
use bevy_egui::EguiContexts;
use leafwing_input_manager::{plugin::InputManagerSystem, prelude::*};

use crate::DriveSet;

// ============================================================================
// Action enum
// ============================================================================

/// Actions for driving the vehicle.
#[derive(Actionlike, PartialEq, Eq, Hash, Clone, Copy, Debug, Reflect)]
pub enum DriveAction {
    /// Throttle (W / Up).
    Accelerate,
    /// Foot brake (S / Down).
    Brake,
    /// Handbrake (Space).
    Handbrake,
    /// Steering (A/D, Left/Right: only the X axis is used).
    #[actionlike(DualAxis)]
    Steer,
    /// Park / unpark (P).
    TogglePark,
}

/// Create the default input map for drive actions.
pub fn default_drive_input_map() -> InputMap<DriveAction> {
    InputMap::default()
        .with(DriveAction::Accelerate, KeyCode::KeyW)
        .with(DriveAction::Accelerate, KeyCode::ArrowUp)
        .with(DriveAction::Brake, KeyCode::KeyS)
        .with(DriveAction::Brake, KeyCode::ArrowDown)
        .with(DriveAction::Handbrake, KeyCode::Space)
        .with_dual_axis(DriveAction::Steer, VirtualDPad::wasd())
        .with_dual_axis(DriveAction::Steer, VirtualDPad::arrow_keys())
        .with(DriveAction::TogglePark, KeyCode::KeyP)
}

// ============================================================================
// Intents
// ============================================================================

/// Per-frame snapshot of the driver's controls.
///
/// Sampled once in [`DriveSet::Input`] so every later stage of the frame sees
/// the same values.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct DriveIntents {
    /// Throttle held.
    pub accelerate: bool,
    /// Foot brake held.
    pub brake: bool,
    /// Handbrake held.
    pub handbrake: bool,
    /// Steering command in [-1, 1]. Negative is left.
    pub steering_command: f32,
    /// Park toggle pressed this frame.
    pub toggle_park: bool,
}

// ============================================================================
// Plugin
// ============================================================================

/// Plugin registering the drive action type and the intent snapshot system.
pub struct DriveInputPlugin;

impl Plugin for DriveInputPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(InputManagerPlugin::<DriveAction>::default())
            .init_resource::<DriveIntents>()
            .add_systems(Startup, spawn_input_map)
            .add_systems(
                PreUpdate,
                manage_input_focus.after(InputManagerSystem::Update),
            )
            .add_systems(Update, sample_intents.in_set(DriveSet::Input));
    }
}

fn spawn_input_map(mut commands: Commands) {
    commands.spawn((default_drive_input_map(), ActionState::<DriveAction>::default()));
}

/// Snapshot the action state into [`DriveIntents`].
fn sample_intents(
    action_query: Query<&ActionState<DriveAction>>,
    mut intents: ResMut<DriveIntents>,
) {
    let Ok(action_state) = action_query.single() else {
        *intents = DriveIntents::default();
        return;
    };

    intents.accelerate = action_state.pressed(&DriveAction::Accelerate);
    intents.brake = action_state.pressed(&DriveAction::Brake);
    intents.handbrake = action_state.pressed(&DriveAction::Handbrake);
    intents.steering_command = action_state
        .clamped_axis_pair(&DriveAction::Steer)
        .x
        .clamp(-1.0, 1.0);
    intents.toggle_park = action_state.just_pressed(&DriveAction::TogglePark);
}

/// Disable drive actions while egui wants keyboard input, so typing an API
/// key or a search query never drives the car.
fn manage_input_focus(
    mut action_query: Query<&mut ActionState<DriveAction>>,
    mut contexts: EguiContexts,
) {
    let egui_wants_kb = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.wants_keyboard_input());

    for mut action_state in &mut action_query {
        if egui_wants_kb {
            action_state.disable_all_actions();
        } else {
            action_state.enable_all_actions();
        }
    }
}
