pub mod animation;
pub mod camera;
pub mod character_controller;
pub mod combat;
pub mod config;
pub mod game_states;
pub mod physics;
pub mod player;
pub mod world;

use bevy::prelude::*;

/// Everything gameplay: input, locomotion, combat mapping, animation bridge.
/// Rendering, physics integration and windowing come from the engine plugins
/// added by the binary.
pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        // The presentation-phase pipeline. Blackboard writes must be visible
        // to the animation bridge within the same frame, so the phases are
        // strictly ordered: input → state upkeep → action mapping → cues →
        // parameter push/playback → damage.
        app.configure_sets(
            Update,
            (
                character_controller::PlayerSet::Input,
                character_controller::PlayerSet::State,
                combat::CombatSet::Actions,
                animation::AnimationSet::Cues,
                animation::AnimationSet::Bridge,
                combat::CombatSet::Damage,
            )
                .chain(),
        );

        app.add_plugins((
            game_states::GameStatePlugin,
            physics::PhysicsPlugin,
            config::ConfigPlugin,
            world::WorldPlugin,
            player::PlayerPlugin,
            character_controller::CharacterControllerPlugin,
            combat::CombatPlugin,
            animation::AnimationBridgePlugin,
            camera::CameraPlugin,
        ));
    }
}
