//! Contextual attack-input mapping.
//!
//! Four fixed action slots, one per action button. Whenever the equipped
//! weapon class changes, the slots are cleared and re-populated from that
//! class's move list; the pressed button then selects a slot for the frame.

use bevy::prelude::*;

use crate::player::{Blackboard, Player, SPRINT_SPEED};

/// The four contextual action buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionButton {
    LightAttack,
    HeavyAttack,
    Phase,
    Slide,
}

impl ActionButton {
    pub const ALL: [ActionButton; 4] = [
        ActionButton::LightAttack,
        ActionButton::HeavyAttack,
        ActionButton::Phase,
        ActionButton::Slide,
    ];

    fn index(self) -> usize {
        match self {
            ActionButton::LightAttack => 0,
            ActionButton::HeavyAttack => 1,
            ActionButton::Phase => 2,
            ActionButton::Slide => 3,
        }
    }
}

/// Currently equipped weapon class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WeaponStatus {
    #[default]
    None,
    OneHanded,
    TwoHanded,
}

impl WeaponStatus {
    /// Numeric value pushed to the animator blend parameter.
    pub fn as_blend(self) -> f32 {
        match self {
            WeaponStatus::None => 0.0,
            WeaponStatus::OneHanded => 1.0,
            WeaponStatus::TwoHanded => 2.0,
        }
    }
}

/// One button-to-animation mapping entry.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponAction {
    pub button: ActionButton,
    pub target_anim: Option<String>,
}

impl WeaponAction {
    pub fn new(button: ActionButton, target_anim: &str) -> Self {
        Self {
            button,
            target_anim: Some(target_anim.to_string()),
        }
    }

    fn empty(button: ActionButton) -> Self {
        Self {
            button,
            target_anim: None,
        }
    }
}

/// Move lists per weapon class. Fixed data; re-applied to the slots on
/// every class change.
#[derive(Resource, Debug, Clone)]
pub struct WeaponMoveset {
    pub unarmed: Vec<WeaponAction>,
    pub one_handed: Vec<WeaponAction>,
    pub two_handed: Vec<WeaponAction>,
}

impl Default for WeaponMoveset {
    fn default() -> Self {
        Self {
            unarmed: vec![
                WeaponAction::new(ActionButton::LightAttack, "Attack_Unarmed_Light"),
                WeaponAction::new(ActionButton::HeavyAttack, "Attack_Unarmed_Heavy"),
                WeaponAction::new(ActionButton::Slide, "Slide"),
            ],
            one_handed: vec![
                WeaponAction::new(ActionButton::LightAttack, "Sword1h_Attack_Light"),
                WeaponAction::new(ActionButton::HeavyAttack, "Sword1h_Attack_Heavy"),
                WeaponAction::new(ActionButton::Phase, "Phase_Dash"),
                WeaponAction::new(ActionButton::Slide, "Slide"),
            ],
            two_handed: vec![
                WeaponAction::new(ActionButton::LightAttack, "Sword2h_Attack_Light"),
                WeaponAction::new(ActionButton::HeavyAttack, "Sword2h_Attack_Heavy"),
                WeaponAction::new(ActionButton::Slide, "Slide"),
            ],
        }
    }
}

impl WeaponMoveset {
    pub fn actions_for(&self, class: WeaponStatus) -> &[WeaponAction] {
        match class {
            WeaponStatus::None => &self.unarmed,
            WeaponStatus::OneHanded => &self.one_handed,
            WeaponStatus::TwoHanded => &self.two_handed,
        }
    }
}

/// The four fixed input slots. Re-populated in place on weapon-class
/// change, never reallocated.
#[derive(Component, Debug, Clone)]
pub struct ActionSlots {
    slots: [WeaponAction; 4],
    mapped_for: Option<WeaponStatus>,
}

impl Default for ActionSlots {
    fn default() -> Self {
        Self {
            slots: ActionButton::ALL.map(WeaponAction::empty),
            mapped_for: None,
        }
    }
}

impl ActionSlots {
    /// Clears all four slots, then copies the class list in order. Later
    /// entries for the same button overwrite earlier ones; there is no
    /// duplicate-button validation.
    pub fn remap(&mut self, class: WeaponStatus, moveset: &WeaponMoveset) {
        for slot in &mut self.slots {
            slot.target_anim = None;
        }
        for action in moveset.actions_for(class) {
            self.slots[action.button.index()].target_anim = action.target_anim.clone();
        }
        self.mapped_for = Some(class);
    }

    /// The slot for `button`, or `None` when nothing is mapped to it.
    pub fn get(&self, button: ActionButton) -> Option<&WeaponAction> {
        let slot = &self.slots[button.index()];
        slot.target_anim.as_ref().map(|_| slot)
    }

    pub fn mapped_for(&self) -> Option<WeaponStatus> {
        self.mapped_for
    }

    fn non_empty(&self) -> impl Iterator<Item = &WeaponAction> {
        self.slots.iter().filter(|slot| slot.target_anim.is_some())
    }
}

/// Raw edge-triggered button state for one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionPresses {
    pub light: bool,
    pub heavy: bool,
    pub phase: bool,
    pub slide: bool,
}

/// Resolves the action button for this frame. Priority order:
/// light > heavy > phase > slide; first match wins, only one button is
/// read per frame.
pub fn resolve_action(presses: ActionPresses) -> Option<ActionButton> {
    if presses.light {
        return Some(ActionButton::LightAttack);
    }
    if presses.heavy {
        return Some(ActionButton::HeavyAttack);
    }
    if presses.phase {
        return Some(ActionButton::Phase);
    }
    if presses.slide {
        return Some(ActionButton::Slide);
    }
    None
}

/// Applies a resolved button to the blackboard: stores the pressed button,
/// selects the matching slot and performs the slide speed override.
pub fn apply_resolved_action(
    blackboard: &mut Blackboard,
    slots: &ActionSlots,
    resolved: Option<ActionButton>,
) {
    if resolved == Some(ActionButton::Slide) {
        // TODO: decouple the slide speed override from action resolution;
        // kept because the current movement tuning depends on it.
        blackboard.speed = SPRINT_SPEED;
    }
    blackboard.pressed_action = resolved;
    blackboard.action_slot = resolved.and_then(|button| slots.get(button).cloned());
}

/// Reads the action buttons and stores the frame's action slot on the
/// blackboard. Runs before the class remap, so a press on the frame of a
/// weapon switch still selects from the previous mapping.
pub fn resolve_action_slot(
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    gamepads: Query<&Gamepad>,
    mut query: Query<(&mut Blackboard, &ActionSlots), With<Player>>,
) {
    let Ok((mut blackboard, slots)) = query.single_mut() else {
        return;
    };

    let mut presses = ActionPresses {
        light: mouse.just_pressed(MouseButton::Left),
        heavy: mouse.just_pressed(MouseButton::Right),
        phase: keyboard.just_pressed(KeyCode::KeyQ),
        slide: keyboard.just_pressed(KeyCode::KeyC),
    };

    for gamepad in gamepads.iter() {
        presses.light |= gamepad.just_pressed(GamepadButton::West);
        presses.heavy |= gamepad.just_pressed(GamepadButton::North);
        presses.phase |= gamepad.just_pressed(GamepadButton::LeftTrigger);
        presses.slide |= gamepad.just_pressed(GamepadButton::East);
    }

    let resolved = resolve_action(presses);
    apply_resolved_action(&mut blackboard, slots, resolved);
}

/// Monitors the equip buttons (held, not edge-triggered) and updates the
/// blackboard's weapon class. With no weapon equipped the class is forced
/// back to `None` first, so a held button wins for the frame.
pub fn detect_weapon_class(
    keyboard: Res<ButtonInput<KeyCode>>,
    gamepads: Query<&Gamepad>,
    mut query: Query<&mut Blackboard, With<Player>>,
) {
    let Ok(mut blackboard) = query.single_mut() else {
        return;
    };

    if !blackboard.weapon_equipped {
        blackboard.current_weapon = WeaponStatus::None;
    }

    let mut one_handed = keyboard.pressed(KeyCode::Digit1);
    let mut two_handed = keyboard.pressed(KeyCode::Digit2);
    for gamepad in gamepads.iter() {
        one_handed |= gamepad.pressed(GamepadButton::DPadLeft);
        two_handed |= gamepad.pressed(GamepadButton::DPadRight);
    }

    if one_handed {
        blackboard.current_weapon = WeaponStatus::OneHanded;
    }
    if two_handed {
        blackboard.current_weapon = WeaponStatus::TwoHanded;
    }
}

/// Re-populates the four slots whenever the equipped class changed.
pub fn map_weapon_actions(
    moveset: Res<WeaponMoveset>,
    mut query: Query<(&Blackboard, &mut ActionSlots), With<Player>>,
) {
    let Ok((blackboard, mut slots)) = query.single_mut() else {
        return;
    };

    if slots.mapped_for() != Some(blackboard.current_weapon) {
        slots.remap(blackboard.current_weapon, &moveset);
        debug!("remapped action slots for {:?}", blackboard.current_weapon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_fills_exactly_the_mapped_slots() {
        let moveset = WeaponMoveset::default();
        let mut slots = ActionSlots::default();

        for class in [
            WeaponStatus::None,
            WeaponStatus::OneHanded,
            WeaponStatus::TwoHanded,
        ] {
            slots.remap(class, &moveset);

            let expected: Vec<ActionButton> =
                moveset.actions_for(class).iter().map(|a| a.button).collect();
            for button in ActionButton::ALL {
                assert_eq!(
                    slots.get(button).is_some(),
                    expected.contains(&button),
                    "class {class:?}, button {button:?}"
                );
            }
            assert_eq!(slots.non_empty().count(), expected.len());
        }
    }

    #[test]
    fn remap_last_write_wins_on_duplicate_buttons() {
        let moveset = WeaponMoveset {
            unarmed: vec![
                WeaponAction::new(ActionButton::LightAttack, "First"),
                WeaponAction::new(ActionButton::LightAttack, "Second"),
            ],
            one_handed: vec![],
            two_handed: vec![],
        };
        let mut slots = ActionSlots::default();
        slots.remap(WeaponStatus::None, &moveset);

        let slot = slots.get(ActionButton::LightAttack).unwrap();
        assert_eq!(slot.target_anim.as_deref(), Some("Second"));
    }

    #[test]
    fn resolve_priority_is_deterministic() {
        let all = ActionPresses {
            light: true,
            heavy: true,
            phase: true,
            slide: true,
        };
        assert_eq!(resolve_action(all), Some(ActionButton::LightAttack));

        let heavy_and_slide = ActionPresses {
            heavy: true,
            slide: true,
            ..Default::default()
        };
        assert_eq!(resolve_action(heavy_and_slide), Some(ActionButton::HeavyAttack));

        let phase_and_slide = ActionPresses {
            phase: true,
            slide: true,
            ..Default::default()
        };
        assert_eq!(resolve_action(phase_and_slide), Some(ActionButton::Phase));

        assert_eq!(resolve_action(ActionPresses::default()), None);
    }

    #[test]
    fn slide_press_forces_blackboard_speed() {
        let moveset = WeaponMoveset::default();
        let mut slots = ActionSlots::default();
        slots.remap(WeaponStatus::None, &moveset);

        let mut blackboard = Blackboard::default();
        blackboard.speed = crate::player::RUN_SPEED;

        apply_resolved_action(&mut blackboard, &slots, Some(ActionButton::Slide));
        assert_eq!(blackboard.speed, SPRINT_SPEED);
        assert!(blackboard.action_slot.is_some());
        assert_eq!(blackboard.pressed_action, Some(ActionButton::Slide));
    }

    #[test]
    fn no_press_leaves_slot_empty() {
        let moveset = WeaponMoveset::default();
        let mut slots = ActionSlots::default();
        slots.remap(WeaponStatus::OneHanded, &moveset);

        let mut blackboard = Blackboard::default();
        apply_resolved_action(&mut blackboard, &slots, None);
        assert!(blackboard.action_slot.is_none());
        assert!(blackboard.pressed_action.is_none());

        // Phase is unmapped for unarmed: button resolves, slot stays empty.
        slots.remap(WeaponStatus::None, &moveset);
        apply_resolved_action(&mut blackboard, &slots, Some(ActionButton::Phase));
        assert!(blackboard.action_slot.is_none());
        assert_eq!(blackboard.pressed_action, Some(ActionButton::Phase));
    }
}
