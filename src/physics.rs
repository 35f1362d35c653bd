use avian3d::PhysicsPlugins;
use avian3d::prelude::PhysicsLayer;
use bevy::prelude::*;

pub(crate) struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PhysicsPlugins::default());
    }
}

/// Collision layers shared by the motor, the hit detection and the world.
#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum GameLayer {
    #[default]
    Default,
    /// Vertical surfaces the character may wall-run along.
    WallRun,
    /// Weapon/limb sensors that deal damage.
    HitBox,
    /// Body regions that receive damage.
    HurtBox,
}
