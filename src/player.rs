//! The player entity and its blackboard.
//!
//! The blackboard is the single source of truth shared by input capture,
//! the action manager, the motor and the animation bridge. Every other
//! component holds a reference to it through this component and never
//! duplicates its fields beyond transient caches.

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::animation::{AnimatorMemory, AnimatorParams, AnimatorTriggers, FullBody};
use crate::character_controller::CharacterControllerBundle;
use crate::combat::actions::{ActionButton, ActionSlots, WeaponAction, WeaponStatus};
use crate::combat::hit_response::{HitBox, HitBoxArea};
use crate::config::ControllerConfig;
use crate::game_states::AppState;
use crate::physics::GameLayer;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppState::InGame), setup);
    }
}

pub const CHARACTER_PATH: &str = "models/knight.glb";

/// Speed value the blackboard carries while sprinting (and, preserved from
/// the controller this is modeled on, while the slide button is resolved).
pub const SPRINT_SPEED: f32 = 3.0;
/// Default blackboard speed.
pub const RUN_SPEED: f32 = 2.0;

/// A marker component for the player character.
#[derive(Component)]
pub struct Player;

/// Per-frame input snapshot. Recomputed from raw device state every frame;
/// nothing here persists except what the motor explicitly smooths.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    /// World-space movement vector, camera-relative, flattened to the
    /// character up plane.
    pub move_world: Vec3,
    /// Head-look target position.
    pub look_pos: Vec3,
    pub crouch: bool,
    pub jump: bool,
    pub sprint: bool,
}

/// Animation state snapshot copied into the blackboard each frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimState {
    /// Local-space move direction (z = forward speed).
    pub move_direction: Vec3,
    /// Is the character mid-jump?
    pub jump: bool,
    pub crouch: bool,
    pub on_ground: bool,
    pub is_strafing: bool,
    /// Vertical velocity of the character.
    pub y_velocity: f32,
}

#[derive(Component)]
pub struct Blackboard {
    pub input: InputState,

    pub current_weapon: WeaponStatus,
    pub weapon_equipped: bool,
    /// Action chosen for this frame; `None` unless an action button was
    /// pressed this frame.
    pub action_slot: Option<WeaponAction>,
    /// Raw button resolved this frame (the combo check reads it again).
    pub pressed_action: Option<ActionButton>,

    pub anim_state: AnimState,
    /// Combo gating: an attack trigger may fire.
    pub can_attack: bool,
    /// Combo gating: a trigger already fired during this armed period.
    pub do_once: bool,

    pub is_crouching: bool,
    pub is_sprinting: bool,
    pub run_by_default: bool,
    pub speed: f32,

    pub max_sprint_stamina: f32,
    pub current_sprint_stamina: f32,

    pub lock_on: bool,
    pub lock_target: Option<Entity>,

    /// Hit-box regions active for the currently playing attack animation.
    pub active_hitboxes: Vec<HitBoxArea>,
    pub should_attack: bool,

    /// Root-motion style position delta accumulated over the frame.
    pub delta_position: Vec3,
}

impl Default for Blackboard {
    fn default() -> Self {
        Self {
            input: InputState::default(),
            current_weapon: WeaponStatus::None,
            weapon_equipped: false,
            action_slot: None,
            pressed_action: None,
            anim_state: AnimState::default(),
            can_attack: false,
            do_once: false,
            is_crouching: false,
            is_sprinting: false,
            run_by_default: false,
            speed: RUN_SPEED,
            max_sprint_stamina: 10.0,
            current_sprint_stamina: 10.0,
            lock_on: false,
            lock_target: None,
            active_hitboxes: Vec::new(),
            should_attack: false,
            delta_position: Vec3::ZERO,
        }
    }
}

impl Blackboard {
    /// Drains sprint stamina, clamped at zero.
    pub fn drain_sprint_stamina(&mut self, dt: f32) {
        self.current_sprint_stamina = (self.current_sprint_stamina - dt).max(0.0);
    }

    /// Recovers sprint stamina, clamped at the maximum.
    pub fn recover_sprint_stamina(&mut self, dt: f32) {
        self.current_sprint_stamina =
            (self.current_sprint_stamina + dt).min(self.max_sprint_stamina);
    }
}

fn setup(
    mut commands: Commands,
    config: Res<ControllerConfig>,
    asset_server: Res<AssetServer>,
) {
    let collider = Collider::capsule(0.35, 1.0);

    let blackboard = Blackboard {
        run_by_default: config.run_by_default,
        max_sprint_stamina: config.max_sprint_stamina,
        current_sprint_stamina: config.max_sprint_stamina,
        ..default()
    };

    let player = commands
        .spawn((
            SceneRoot(asset_server.load(GltfAssetLabel::Scene(0).from_asset(CHARACTER_PATH))),
            Transform::from_xyz(0.0, 1.5, 0.0),
            Player,
            blackboard,
            ActionSlots::default(),
            AnimatorParams::default(),
            AnimatorTriggers::default(),
            AnimatorMemory::default(),
            FullBody::default(),
            CharacterControllerBundle::new(collider, config.motor.clone(), config.wall_run.clone()),
            Friction::ZERO.with_combine_rule(CoefficientCombine::Min),
            Restitution::ZERO.with_combine_rule(CoefficientCombine::Min),
            GravityScale(1.0),
        ))
        .id();

    // Hit-box sensors; the active attack animation decides which of these
    // actually deal damage on contact.
    commands.entity(player).with_children(|parent| {
        for (area, offset, radius) in [
            (HitBoxArea::WeaponBlade, Vec3::new(0.5, 0.9, -0.7), 0.5),
            (HitBoxArea::RightFist, Vec3::new(0.4, 1.0, -0.4), 0.25),
            (HitBoxArea::LeftFist, Vec3::new(-0.4, 1.0, -0.4), 0.25),
        ] {
            parent.spawn((
                Collider::sphere(radius),
                Sensor,
                CollisionEventsEnabled,
                CollisionLayers::new([GameLayer::HitBox], [GameLayer::HurtBox]),
                Transform::from_translation(offset),
                HitBox {
                    area,
                    owner: player,
                },
            ));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamina_never_leaves_bounds() {
        let mut blackboard = Blackboard {
            max_sprint_stamina: 10.0,
            current_sprint_stamina: 10.0,
            ..default()
        };

        // Drain far past empty.
        for _ in 0..100 {
            blackboard.drain_sprint_stamina(0.7);
            assert!(blackboard.current_sprint_stamina >= 0.0);
            assert!(blackboard.current_sprint_stamina <= 10.0);
        }
        assert_eq!(blackboard.current_sprint_stamina, 0.0);

        // Recover far past full.
        for _ in 0..100 {
            blackboard.recover_sprint_stamina(0.9);
            assert!(blackboard.current_sprint_stamina >= 0.0);
            assert!(blackboard.current_sprint_stamina <= 10.0);
        }
        assert_eq!(blackboard.current_sprint_stamina, 10.0);
    }

    #[test]
    fn huge_frame_time_still_clamps() {
        let mut blackboard = Blackboard::default();
        blackboard.drain_sprint_stamina(1e6);
        assert_eq!(blackboard.current_sprint_stamina, 0.0);
        blackboard.recover_sprint_stamina(1e6);
        assert_eq!(blackboard.current_sprint_stamina, blackboard.max_sprint_stamina);
    }
}
