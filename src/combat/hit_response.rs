//! Hit detection and damage receipt.
//!
//! Hit-box sensors intersect hurt-boxes; a hit dispatches a fixed-magnitude
//! damage event to the hurt-box owner's health. A missing health component
//! silently no-ops; absence is never an error here.

use avian3d::prelude::CollisionStart;
use bevy::prelude::*;

use crate::player::{Blackboard, Player};

/// Damage dealt per melee hit.
pub const ATTACK_DAMAGE: f32 = 15.0;

/// Body or weapon regions a hit-box sensor can represent. Attack
/// animations activate a subset of these through the blackboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitBoxArea {
    WeaponBlade,
    RightFist,
    LeftFist,
    RightFoot,
}

/// A damage-dealing sensor. `owner` is resolved when the rig is spawned,
/// not looked up per frame.
#[derive(Component, Debug)]
pub struct HitBox {
    pub area: HitBoxArea,
    pub owner: Entity,
}

/// A damage-receiving sensor. `owner` carries the [`Health`].
#[derive(Component, Debug)]
pub struct Hurtbox {
    pub owner: Entity,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }
}

#[derive(Event, Debug, Clone)]
pub struct DamageDealt {
    pub attacker: Entity,
    pub target: Entity,
    pub amount: f32,
}

/// Turns hit-box/hurt-box intersections into damage events. Only hit-box
/// areas activated by the current attack animation count; everything else
/// is ignored.
pub fn detect_hits(
    mut collisions: EventReader<CollisionStart>,
    hitboxes: Query<&HitBox>,
    hurtboxes: Query<&Hurtbox>,
    player: Query<&Blackboard, With<Player>>,
    mut damage: EventWriter<DamageDealt>,
) {
    let Ok(blackboard) = player.single() else {
        return;
    };

    for event in collisions.read() {
        let pairs = [
            (event.collider1, event.collider2),
            (event.collider2, event.collider1),
        ];
        for (hit_entity, hurt_entity) in pairs {
            let (Ok(hitbox), Ok(hurtbox)) =
                (hitboxes.get(hit_entity), hurtboxes.get(hurt_entity))
            else {
                continue;
            };

            if hurtbox.owner == hitbox.owner {
                continue;
            }
            if !blackboard.should_attack || !blackboard.active_hitboxes.contains(&hitbox.area) {
                continue;
            }

            debug!("hit: {:?} struck {:?}", hitbox.area, hurtbox.owner);
            damage.write(DamageDealt {
                attacker: hitbox.owner,
                target: hurtbox.owner,
                amount: ATTACK_DAMAGE,
            });
        }
    }
}

/// Applies damage events to health. Targets without a health component are
/// skipped without complaint.
pub fn apply_damage(
    mut events: EventReader<DamageDealt>,
    mut healths: Query<&mut Health>,
) {
    for event in events.read() {
        let Ok(mut health) = healths.get_mut(event.target) else {
            continue;
        };
        health.take_damage(event.amount);
        debug!(
            "{:?} took {} damage ({} left)",
            event.target, event.amount, health.current
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let mut app = App::new();
        app.add_event::<CollisionStart>()
            .add_event::<DamageDealt>()
            .add_systems(Update, (detect_hits, apply_damage).chain());
        app
    }

    fn contact(collider1: Entity, collider2: Entity) -> CollisionStart {
        CollisionStart {
            collider1,
            collider2,
            body1: None,
            body2: None,
        }
    }

    fn spawn_attacking_player(app: &mut App, areas: &[HitBoxArea]) -> Entity {
        let blackboard = Blackboard {
            should_attack: true,
            active_hitboxes: areas.to_vec(),
            ..Default::default()
        };
        app.world_mut().spawn((Player, blackboard)).id()
    }

    #[test]
    fn active_hit_reduces_target_health() {
        let mut app = test_app();
        let attacker = spawn_attacking_player(&mut app, &[HitBoxArea::WeaponBlade]);

        let target = app.world_mut().spawn(Health::new(100.0)).id();
        let hitbox = app
            .world_mut()
            .spawn(HitBox {
                area: HitBoxArea::WeaponBlade,
                owner: attacker,
            })
            .id();
        let hurtbox = app.world_mut().spawn(Hurtbox { owner: target }).id();

        app.world_mut().send_event(CollisionStarted(hitbox, hurtbox));
        app.update();

        let health = app.world().get::<Health>(target).unwrap();
        assert_eq!(health.current, 100.0 - ATTACK_DAMAGE);
    }

    #[test]
    fn inactive_area_does_not_hit() {
        let mut app = test_app();
        let attacker = spawn_attacking_player(&mut app, &[HitBoxArea::RightFist]);

        let target = app.world_mut().spawn(Health::new(100.0)).id();
        let hitbox = app
            .world_mut()
            .spawn(HitBox {
                area: HitBoxArea::WeaponBlade,
                owner: attacker,
            })
            .id();
        let hurtbox = app.world_mut().spawn(Hurtbox { owner: target }).id();

        app.world_mut().send_event(CollisionStarted(hitbox, hurtbox));
        app.update();

        let health = app.world().get::<Health>(target).unwrap();
        assert_eq!(health.current, 100.0);
    }

    #[test]
    fn missing_health_is_a_silent_noop() {
        let mut app = test_app();
        let attacker = spawn_attacking_player(&mut app, &[HitBoxArea::WeaponBlade]);

        // Hurtbox owner has no Health component at all.
        let owner = app.world_mut().spawn_empty().id();
        let hitbox = app
            .world_mut()
            .spawn(HitBox {
                area: HitBoxArea::WeaponBlade,
                owner: attacker,
            })
            .id();
        let hurtbox = app.world_mut().spawn(Hurtbox { owner }).id();

        app.world_mut().send_event(CollisionStarted(hitbox, hurtbox));
        app.update(); // must not panic
    }

    #[test]
    fn health_clamps_at_zero() {
        let mut health = Health::new(10.0);
        health.take_damage(25.0);
        assert_eq!(health.current, 0.0);
        assert!(health.is_dead());
    }
}
