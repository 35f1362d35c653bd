pub mod actions;
pub mod hit_response;

use bevy::prelude::*;

use crate::game_states::AppState;

pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<actions::WeaponMoveset>()
            .add_event::<hit_response::DamageDealt>()
            .add_systems(
                Update,
                (
                    actions::resolve_action_slot,
                    actions::detect_weapon_class,
                    actions::map_weapon_actions,
                )
                    .chain()
                    .in_set(CombatSet::Actions)
                    .run_if(in_state(AppState::InGame)),
            )
            .add_systems(
                Update,
                (hit_response::detect_hits, hit_response::apply_damage)
                    .chain()
                    .in_set(CombatSet::Damage)
                    .run_if(in_state(AppState::InGame)),
            );
    }
}

/// Ordering handles for the presentation-phase pipeline.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatSet {
    /// Weapon class detection and action-slot mapping.
    Actions,
    /// Hit detection and damage dispatch.
    Damage,
}
