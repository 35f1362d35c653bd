use bevy::prelude::*;

/// A marker component indicating that an entity is using a character controller.
#[derive(Component)]
pub struct CharacterController;

/// A marker component indicating that an entity is on the ground.
#[derive(Component)]
#[component(storage = "SparseSet")]
pub struct Grounded;

/// Per-step ground sensing results and the values blended from them.
#[derive(Component, Debug)]
pub struct GroundState {
    pub on_ground: bool,
    /// Distance from the body to the ground hit, along up.
    pub ground_distance: f32,
    /// Ground surface normal (character up when nothing was hit).
    pub normal: Vec3,
    /// Blended velocity of the rigid body being stood on.
    pub platform_velocity: Vec3,
    /// Angular velocity of the platform, projected onto up.
    pub platform_angular_velocity: Vec3,
    /// Downward force keeping the character on uneven ground.
    pub sticky_force: f32,
    /// Last time the character was airborne.
    pub last_air_time: f32,
    /// Signed vertical speed (negative = falling).
    pub velocity_y: f32,
    /// Forward animation multiplier damped on slopes.
    pub forward_mlp: f32,
}

impl Default for GroundState {
    fn default() -> Self {
        Self {
            on_ground: true,
            ground_distance: 0.0,
            normal: Vec3::Y,
            platform_velocity: Vec3::ZERO,
            platform_angular_velocity: Vec3::ZERO,
            sticky_force: 0.0,
            last_air_time: 0.0,
            velocity_y: 0.0,
            forward_mlp: 1.0,
        }
    }
}

/// Wall-running blend state.
#[derive(Component, Debug)]
pub struct WallRunState {
    /// Blend weight in [0, 1].
    pub weight: f32,
    pub last_weight: f32,
    /// Normal the character up is being pulled towards.
    pub wall_normal: Vec3,
    /// When eligibility was last lost; re-entry is blocked shortly after.
    pub end_time: f32,
}

impl Default for WallRunState {
    fn default() -> Self {
        Self {
            weight: 0.0,
            last_weight: 0.0,
            wall_normal: Vec3::Y,
            end_time: 0.0,
        }
    }
}

/// Jump bookkeeping used by the ground check and the wall-run window.
#[derive(Component, Debug, Default)]
pub struct JumpState {
    /// Time the current jump counts as ended.
    pub jump_end_time: f32,
    /// Mid-jump flag mirrored into the animation state.
    pub jumping: bool,
}

/// Scratch state for the smoothed animation move direction.
#[derive(Component, Debug, Default)]
pub struct MoveSmoothing {
    pub value: Vec3,
    pub velocity: Vec3,
}
