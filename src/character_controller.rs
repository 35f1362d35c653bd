//! Physics-based third-person locomotion.
//!
//! The fixed-timestep systems here resolve grounding, wall-running and
//! velocity; the variable-timestep systems capture input and keep the
//! blackboard's presentation state current. Ordering inside each phase is
//! explicit: the blackboard contract is "last writer in frame order wins".

pub mod components;
pub mod input;
pub mod math;
pub mod physics;
pub mod states;

use avian3d::prelude::*;
use bevy::prelude::*;

pub use components::*;

use crate::config::{MotorSettings, WallRunSettings};
use crate::game_states::AppState;

/// Presentation-phase ordering handles for the controller systems.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerSet {
    /// Raw device state into the blackboard.
    Input,
    /// Sprint/crouch/animation-snapshot upkeep.
    State,
}

pub struct CharacterControllerPlugin;

impl Plugin for CharacterControllerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (
                physics::wall_run,
                physics::rotate_character,
                physics::ground_check,
                physics::apply_movement,
                physics::gravity_and_friction,
                physics::scale_crouch_capsule,
            )
                .chain()
                .run_if(in_state(AppState::InGame)),
        )
        .add_systems(
            Update,
            (
                input::capture_input.in_set(PlayerSet::Input),
                (
                    states::update_sprint_state,
                    states::update_crouch_state,
                    states::update_anim_state,
                )
                    .chain()
                    .in_set(PlayerSet::State),
            )
                .run_if(in_state(AppState::InGame)),
        );
    }
}

/// A bundle that contains the components needed for the character
/// controller to function.
#[derive(Bundle)]
pub struct CharacterControllerBundle {
    character_controller: CharacterController,
    rigid_body: RigidBody,
    collider: Collider,
    ground_caster: ShapeCaster,
    locked_axes: LockedAxes,
    motor: MotorSettings,
    wall_run: WallRunSettings,
    ground_state: GroundState,
    wall_run_state: WallRunState,
    jump_state: JumpState,
    move_smoothing: MoveSmoothing,
}

impl CharacterControllerBundle {
    pub fn new(collider: Collider, motor: MotorSettings, wall_run: WallRunSettings) -> Self {
        // Ground sensor: a slightly smaller copy of the collider, cast down.
        let mut caster_shape = collider.clone();
        caster_shape.set_scale(Vec3::ONE * 0.99, 10);
        let max_distance = motor.airborne_threshold * 2.0;

        Self {
            character_controller: CharacterController,
            rigid_body: RigidBody::Dynamic,
            collider,
            ground_caster: ShapeCaster::new(
                caster_shape,
                Vec3::ZERO,
                Quat::default(),
                Dir3::NEG_Y,
            )
            .with_max_distance(max_distance)
            .with_max_hits(5),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            motor,
            wall_run,
            ground_state: GroundState::default(),
            wall_run_state: WallRunState::default(),
            jump_state: JumpState::default(),
            move_smoothing: MoveSmoothing::default(),
        }
    }
}
