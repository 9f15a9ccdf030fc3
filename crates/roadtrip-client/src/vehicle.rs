//! Vehicle physics: speed integration, steering, and heading.
//!
//! All motion is expressed in the panorama graph's units: speed in km/h,
//! headings and steering angles in degrees. The step function is pure; the
//! Bevy system around it only wires up time and input.

use bevy::prelude::*;

use crate::{DriveSet, input::DriveIntents, modes::GameModeState};

/// Top speed, km/h.
pub const MAX_SPEED_KMH: f32 = 120.0;
/// Throttle gain, km/h per second.
pub const ACCELERATION_RATE: f32 = 12.0;
/// Foot brake decay, km/h per second.
pub const BRAKING_RATE: f32 = 25.0;
/// Coasting decay, km/h per second.
pub const FRICTION_RATE: f32 = 3.0;
/// Handbrake decay, km/h per second.
pub const HANDBRAKE_RATE: f32 = 80.0;

/// Frames longer than this are dropped rather than integrated, so a stall
/// (tab switch, debugger pause) cannot teleport the vehicle.
pub const MAX_FRAME_DT: f32 = 0.5;

/// Steering inside this band does not turn the vehicle, degrees.
pub const STEERING_DEAD_ZONE_DEG: f32 = 2.0;
/// Steering lock, degrees either side of center.
pub const MAX_STEERING_ANGLE_DEG: f32 = 120.0;
/// How fast held steering ramps toward full lock, degrees per second.
const STEERING_RAMP_DEG_PER_SEC: f32 = 180.0;
/// How fast released steering returns to center, degrees per second.
const STEERING_CENTER_DEG_PER_SEC: f32 = 120.0;
/// Auto-centering snaps to exactly zero inside this band, degrees.
const STEERING_EPSILON_DEG: f32 = 0.5;

/// Base yaw response, degrees of heading per degree of steering per second.
const TURN_RATE_PER_DEG: f32 = 0.6;
/// Speed at which turn response has halved, km/h. Models understeer: the
/// faster the vehicle moves, the wider its turning circle.
const UNDERSTEER_REFERENCE_KMH: f32 = 60.0;

/// Current motion state of the vehicle.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    /// Forward speed, km/h, in [0, MAX_SPEED_KMH].
    pub speed_kmh: f32,
    /// Compass heading, degrees in [0, 360).
    pub heading_deg: f32,
    /// Steering wheel angle, degrees in [-lock, lock]. Negative is left.
    pub steering_angle_deg: f32,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            speed_kmh: 0.0,
            heading_deg: 0.0,
            steering_angle_deg: 0.0,
        }
    }
}

/// Advance the vehicle by `dt` seconds under `intents`.
///
/// Returns the input state unchanged when `dt` is non-positive or exceeds
/// [`MAX_FRAME_DT`].
#[must_use]
pub fn advance(state: &VehicleState, intents: &DriveIntents, dt: f32) -> VehicleState {
    if dt <= 0.0 || dt > MAX_FRAME_DT {
        return *state;
    }

    // Speed. Handbrake wins over throttle, throttle over brake, brake over
    // coasting friction.
    let rate = if intents.handbrake {
        -HANDBRAKE_RATE
    } else if intents.accelerate {
        ACCELERATION_RATE
    } else if intents.brake {
        -BRAKING_RATE
    } else {
        -FRICTION_RATE
    };
    let speed_kmh = (state.speed_kmh + rate * dt).clamp(0.0, MAX_SPEED_KMH);

    // Steering. Held input ramps toward a target proportional to the command;
    // released input auto-centers and snaps to zero near the middle so the
    // vehicle never creeps sideways from float residue.
    let steering_angle_deg = if intents.steering_command.abs() > f32::EPSILON {
        let target = intents.steering_command * MAX_STEERING_ANGLE_DEG;
        let step = STEERING_RAMP_DEG_PER_SEC * dt;
        move_toward(state.steering_angle_deg, target, step)
            .clamp(-MAX_STEERING_ANGLE_DEG, MAX_STEERING_ANGLE_DEG)
    } else {
        let centered = move_toward(
            state.steering_angle_deg,
            0.0,
            STEERING_CENTER_DEG_PER_SEC * dt,
        );
        if centered.abs() < STEERING_EPSILON_DEG {
            0.0
        } else {
            centered
        }
    };

    // Heading. Only turns while moving and outside the dead zone, with turn
    // response falling off as speed rises.
    let heading_deg = if speed_kmh > 0.0 && steering_angle_deg.abs() > STEERING_DEAD_ZONE_DEG {
        let understeer = 1.0 / (1.0 + speed_kmh / UNDERSTEER_REFERENCE_KMH);
        let yaw = steering_angle_deg * TURN_RATE_PER_DEG * understeer * dt;
        (state.heading_deg + yaw).rem_euclid(360.0)
    } else {
        state.heading_deg
    };

    VehicleState {
        speed_kmh,
        heading_deg,
        steering_angle_deg,
    }
}

fn move_toward(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(delta)
    }
}

/// Plugin running the physics step while driving.
pub struct VehiclePlugin;

impl Plugin for VehiclePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VehicleState>()
            .add_systems(Update, step_vehicle.in_set(DriveSet::Physics));
    }
}

fn step_vehicle(
    time: Res<Time>,
    intents: Res<DriveIntents>,
    mode: Res<GameModeState>,
    mut state: ResMut<VehicleState>,
) {
    if !mode.is_driving() {
        return;
    }
    *state = advance(&state, &intents, time.delta_secs());
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn throttle() -> DriveIntents {
        DriveIntents {
            accelerate: true,
            ..Default::default()
        }
    }

    fn run(mut state: VehicleState, intents: &DriveIntents, seconds: f32) -> VehicleState {
        let steps = (seconds / DT).round() as usize;
        for _ in 0..steps {
            state = advance(&state, intents, DT);
        }
        state
    }

    #[test]
    fn test_throttle_accelerates_monotonically_to_cap() {
        let mut state = VehicleState::default();
        let intents = throttle();
        let mut last = 0.0;
        for _ in 0..1200 {
            state = advance(&state, &intents, DT);
            assert!(state.speed_kmh >= last);
            last = state.speed_kmh;
        }
        // 20 seconds at 12 km/h/s is well past the 120 cap.
        assert_eq!(state.speed_kmh, MAX_SPEED_KMH);
    }

    #[test]
    fn test_friction_coasts_to_rest() {
        let state = VehicleState {
            speed_kmh: 6.0,
            ..Default::default()
        };
        let state = run(state, &DriveIntents::default(), 3.0);
        assert_eq!(state.speed_kmh, 0.0);
    }

    #[test]
    fn test_handbrake_overrides_throttle() {
        let state = VehicleState {
            speed_kmh: 100.0,
            ..Default::default()
        };
        let intents = DriveIntents {
            accelerate: true,
            handbrake: true,
            ..Default::default()
        };
        let next = advance(&state, &intents, DT);
        assert!(next.speed_kmh < state.speed_kmh);
    }

    #[test]
    fn test_brake_never_reverses() {
        let state = VehicleState {
            speed_kmh: 0.5,
            ..Default::default()
        };
        let intents = DriveIntents {
            brake: true,
            ..Default::default()
        };
        let state = run(state, &intents, 1.0);
        assert_eq!(state.speed_kmh, 0.0);
    }

    #[test]
    fn test_heading_wraps_into_range() {
        let mut state = VehicleState {
            speed_kmh: 20.0,
            heading_deg: 350.0,
            steering_angle_deg: MAX_STEERING_ANGLE_DEG,
        };
        let intents = DriveIntents {
            accelerate: true,
            steering_command: 1.0,
            ..Default::default()
        };
        for _ in 0..600 {
            state = advance(&state, &intents, DT);
            assert!((0.0..360.0).contains(&state.heading_deg));
        }
    }

    #[test]
    fn test_no_turning_while_stopped() {
        let state = VehicleState {
            speed_kmh: 0.0,
            heading_deg: 90.0,
            steering_angle_deg: MAX_STEERING_ANGLE_DEG,
        };
        let intents = DriveIntents {
            steering_command: 1.0,
            ..Default::default()
        };
        let next = advance(&state, &intents, DT);
        assert_eq!(next.heading_deg, 90.0);
    }

    #[test]
    fn test_dead_zone_holds_heading() {
        let state = VehicleState {
            speed_kmh: 50.0,
            heading_deg: 45.0,
            steering_angle_deg: 1.5,
        };
        let next = advance(&state, &DriveIntents::default(), DT);
        assert_eq!(next.heading_deg, 45.0);
    }

    #[test]
    fn test_understeer_reduces_turn_rate_at_speed() {
        let slow = VehicleState {
            speed_kmh: 10.0,
            heading_deg: 0.0,
            steering_angle_deg: 60.0,
        };
        let fast = VehicleState {
            speed_kmh: 110.0,
            ..slow
        };
        let intents = DriveIntents {
            steering_command: 0.5,
            ..Default::default()
        };
        let slow_yaw = advance(&slow, &intents, DT).heading_deg;
        let fast_yaw = advance(&fast, &intents, DT).heading_deg;
        assert!(slow_yaw > fast_yaw);
    }

    #[test]
    fn test_steering_autocenters_and_snaps() {
        let mut state = VehicleState {
            speed_kmh: 0.0,
            heading_deg: 0.0,
            steering_angle_deg: 30.0,
        };
        let intents = DriveIntents::default();
        for _ in 0..60 {
            state = advance(&state, &intents, DT);
        }
        assert_eq!(state.steering_angle_deg, 0.0);
    }

    #[test]
    fn test_oversized_frame_is_dropped() {
        let state = VehicleState {
            speed_kmh: 30.0,
            heading_deg: 10.0,
            steering_angle_deg: 5.0,
        };
        assert_eq!(advance(&state, &throttle(), 0.8), state);
        assert_eq!(advance(&state, &throttle(), 0.0), state);
        assert_eq!(advance(&state, &throttle(), -0.1), state);
    }
}
