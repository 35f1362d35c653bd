//! Headless pipeline tests: input resolution, weapon-class mapping, combo
//! gating and their frame ordering, driven through a minimal `App` the way
//! the systems run in the real schedule.

use ashen_ring::animation::{check_combo, consume_animation_cues, AnimationCue, AnimatorTriggers};
use ashen_ring::combat::actions::{
    detect_weapon_class, map_weapon_actions, resolve_action_slot, ActionButton, ActionSlots,
    WeaponMoveset, WeaponStatus,
};
use ashen_ring::player::{Blackboard, Player, SPRINT_SPEED};
use bevy::prelude::*;

fn pipeline_app() -> (App, Entity) {
    let mut app = App::new();
    app.init_resource::<WeaponMoveset>()
        .init_resource::<ButtonInput<KeyCode>>()
        .init_resource::<ButtonInput<MouseButton>>()
        .add_event::<AnimationCue>()
        .add_systems(
            Update,
            (
                resolve_action_slot,
                detect_weapon_class,
                map_weapon_actions,
                consume_animation_cues,
                check_combo,
            )
                .chain(),
        );

    let player = app
        .world_mut()
        .spawn((
            Player,
            Blackboard::default(),
            ActionSlots::default(),
            AnimatorTriggers::default(),
        ))
        .id();
    (app, player)
}

fn clear_inputs(app: &mut App) {
    app.world_mut()
        .resource_mut::<ButtonInput<KeyCode>>()
        .clear();
    app.world_mut()
        .resource_mut::<ButtonInput<MouseButton>>()
        .clear();
}

#[test]
fn holding_equip_maps_the_one_handed_moveset() {
    let (mut app, player) = pipeline_app();

    // Weapon not equipped: class forced to None every frame.
    app.update();
    let blackboard = app.world().get::<Blackboard>(player).unwrap();
    assert_eq!(blackboard.current_weapon, WeaponStatus::None);
    let slots = app.world().get::<ActionSlots>(player).unwrap();
    assert_eq!(slots.mapped_for(), Some(WeaponStatus::None));

    // Hold the one-handed equip button.
    app.world_mut()
        .resource_mut::<ButtonInput<KeyCode>>()
        .press(KeyCode::Digit1);
    app.update();

    let blackboard = app.world().get::<Blackboard>(player).unwrap();
    assert_eq!(blackboard.current_weapon, WeaponStatus::OneHanded);
    let slots = app.world().get::<ActionSlots>(player).unwrap();
    assert_eq!(slots.mapped_for(), Some(WeaponStatus::OneHanded));
    assert!(slots.get(ActionButton::Phase).is_some());

    // Release: with nothing equipped the class resets and the slots follow.
    app.world_mut()
        .resource_mut::<ButtonInput<KeyCode>>()
        .release(KeyCode::Digit1);
    clear_inputs(&mut app);
    app.update();

    let slots = app.world().get::<ActionSlots>(player).unwrap();
    assert_eq!(slots.mapped_for(), Some(WeaponStatus::None));
    assert!(slots.get(ActionButton::Phase).is_none());
}

#[test]
fn action_slot_is_none_without_a_press() {
    let (mut app, player) = pipeline_app();

    app.update();
    let blackboard = app.world().get::<Blackboard>(player).unwrap();
    assert!(blackboard.action_slot.is_none());
    assert!(blackboard.pressed_action.is_none());
}

#[test]
fn armed_light_press_fires_exactly_one_trigger() {
    let (mut app, player) = pipeline_app();
    app.update();

    // Arm the combo gate through the buffered cue, press light attack.
    app.world_mut().send_event(AnimationCue::CanAttack);
    app.world_mut()
        .resource_mut::<ButtonInput<MouseButton>>()
        .press(MouseButton::Left);
    app.update();

    let blackboard = app.world().get::<Blackboard>(player).unwrap();
    assert!(blackboard.can_attack);
    assert!(blackboard.do_once);
    assert!(blackboard.action_slot.is_some());
    let triggers = app.world().get::<AnimatorTriggers>(player).unwrap();
    assert!(triggers.light_attack);

    // Same armed period, a fresh press: no second trigger.
    app.world_mut()
        .get_mut::<AnimatorTriggers>(player)
        .unwrap()
        .reset_all();
    app.world_mut()
        .resource_mut::<ButtonInput<MouseButton>>()
        .release(MouseButton::Left);
    clear_inputs(&mut app);
    app.world_mut()
        .resource_mut::<ButtonInput<MouseButton>>()
        .press(MouseButton::Left);
    app.update();

    let triggers = app.world().get::<AnimatorTriggers>(player).unwrap();
    assert!(!triggers.light_attack);
    assert!(!triggers.heavy_attack);
}

#[test]
fn slide_press_selects_slot_and_forces_speed() {
    let (mut app, player) = pipeline_app();
    app.update();

    app.world_mut()
        .resource_mut::<ButtonInput<KeyCode>>()
        .press(KeyCode::KeyC);
    app.update();

    let blackboard = app.world().get::<Blackboard>(player).unwrap();
    assert_eq!(blackboard.pressed_action, Some(ActionButton::Slide));
    assert!(blackboard.action_slot.is_some());
    assert_eq!(blackboard.speed, SPRINT_SPEED);
}

#[test]
fn simultaneous_presses_resolve_by_priority() {
    let (mut app, player) = pipeline_app();
    app.update();

    app.world_mut()
        .resource_mut::<ButtonInput<MouseButton>>()
        .press(MouseButton::Left);
    app.world_mut()
        .resource_mut::<ButtonInput<MouseButton>>()
        .press(MouseButton::Right);
    app.world_mut()
        .resource_mut::<ButtonInput<KeyCode>>()
        .press(KeyCode::KeyC);
    app.update();

    let blackboard = app.world().get::<Blackboard>(player).unwrap();
    assert_eq!(blackboard.pressed_action, Some(ActionButton::LightAttack));
    // The slide side effect must not have run for a losing press.
    assert_ne!(blackboard.speed, SPRINT_SPEED);
}
