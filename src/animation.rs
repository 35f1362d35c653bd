//! Animation bridge: blackboard state in, animation playback out.
//!
//! No physics happens here. Each frame the bridge pushes the blackboard's
//! animation snapshot into named parameters, starts target animations (only
//! from the neutral reset state), and runs the combo gating state machine.
//! Animation-side signals arrive as buffered [`AnimationCue`] events and
//! are consumed at one defined point in the frame, never as reentrant
//! callbacks.

use std::collections::HashMap;
use std::time::Duration;

use bevy::prelude::*;
use rand::{thread_rng, Rng};

use crate::combat::actions::ActionButton;
use crate::combat::hit_response::{DamageDealt, HitBoxArea};
use crate::game_states::AppState;
use crate::player::{Blackboard, Player, CHARACTER_PATH};

/// Animator turning sensitivity.
const TURN_SENSITIVITY: f32 = 0.2;
/// Animator turning interpolation speed.
const TURN_INTERP_SPEED: f32 = 5.0;
/// Offset of leg positions in the running cycle.
const RUN_CYCLE_LEG_OFFSET: f32 = 0.2;
/// Overall playback speed of grounded forward locomotion.
const ANIM_SPEED_MULTIPLIER: f32 = 1.0;
/// Seconds into an attack clip at which the combo window opens.
const ATTACK_CUE_OPEN: f32 = 0.35;

const COMBO_FADE: Duration = Duration::from_millis(100);
const EQUIP_FADE: Duration = Duration::from_millis(400);
const LOCOMOTION_FADE: Duration = Duration::from_millis(250);
const HURT_FADE: Duration = Duration::from_millis(50);

/// Clips baked into the character glTF, by animation index.
const CLIPS: [&str; 14] = [
    "Idle",
    "Locomotion",
    "Jump",
    "Sword1h_Equip",
    "Attack_Unarmed_Light",
    "Attack_Unarmed_Heavy",
    "Sword1h_Attack_Light",
    "Sword1h_Attack_Heavy",
    "Sword2h_Attack_Light",
    "Sword2h_Attack_Heavy",
    "Phase_Dash",
    "Slide",
    "Idle_Hit_Strong_Right",
    "Idle_Hit_Strong_Left",
];

const HURT_CLIPS: [&str; 2] = ["Idle_Hit_Strong_Right", "Idle_Hit_Strong_Left"];

/// Ordering handles for the bridge.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationSet {
    /// Full-body state tracking and cue consumption.
    Cues,
    /// Parameter push, target playback, combo check.
    Bridge,
}

/// Signals from the animation side, buffered and consumed once per frame.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationCue {
    /// The current attack clip reached its combo window.
    CanAttack,
    /// The window closed (clip ended).
    CannotAttack,
}

/// Named parameters pushed to the animation player each frame.
#[derive(Component, Debug, Default)]
pub struct AnimatorParams {
    pub turn: f32,
    pub forward: f32,
    pub right: f32,
    pub jump: f32,
    pub jump_leg: f32,
    pub is_two_handed: f32,
    pub crouch: bool,
    pub on_ground: bool,
    pub is_strafing: bool,
}

/// Attack triggers; reset whenever the reset state is entered.
#[derive(Component, Debug, Default)]
pub struct AnimatorTriggers {
    pub light_attack: bool,
    pub heavy_attack: bool,
}

impl AnimatorTriggers {
    pub fn reset_all(&mut self) {
        self.light_attack = false;
        self.heavy_attack = false;
    }
}

/// Scratch state for the turn-angle computation.
#[derive(Component, Debug)]
pub struct AnimatorMemory {
    pub last_forward: Vec3,
}

impl Default for AnimatorMemory {
    fn default() -> Self {
        Self {
            last_forward: Vec3::NEG_Z,
        }
    }
}

/// Full-body layer state. Target animations may only start from `Reset`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FullBodyState {
    #[default]
    Reset,
    Acting {
        anim: String,
    },
}

#[derive(Component, Debug, Default)]
pub struct FullBody {
    pub state: FullBodyState,
    node: Option<AnimationNodeIndex>,
    cue_open_sent: bool,
    base_clip: Option<String>,
}

impl FullBody {
    pub fn is_reset(&self) -> bool {
        self.state == FullBodyState::Reset
    }
}

/// Marker for the animation player entity inside the character scene.
#[derive(Component)]
pub struct CharacterRig;

/// Name → graph node lookup for every clip in the character file.
#[derive(Resource)]
pub struct AnimationLibrary {
    pub graph: Handle<AnimationGraph>,
    nodes: HashMap<String, AnimationNodeIndex>,
}

impl AnimationLibrary {
    pub fn node(&self, name: &str) -> Option<AnimationNodeIndex> {
        self.nodes.get(name).copied()
    }
}

/// Hit-box regions each attack animation activates.
#[derive(Resource)]
pub struct AttackDefinitions {
    hitboxes: HashMap<String, Vec<HitBoxArea>>,
}

impl Default for AttackDefinitions {
    fn default() -> Self {
        let mut hitboxes = HashMap::new();
        hitboxes.insert(
            "Attack_Unarmed_Light".to_string(),
            vec![HitBoxArea::RightFist],
        );
        hitboxes.insert(
            "Attack_Unarmed_Heavy".to_string(),
            vec![HitBoxArea::RightFist, HitBoxArea::LeftFist],
        );
        for sword in [
            "Sword1h_Attack_Light",
            "Sword1h_Attack_Heavy",
            "Sword2h_Attack_Light",
            "Sword2h_Attack_Heavy",
        ] {
            hitboxes.insert(sword.to_string(), vec![HitBoxArea::WeaponBlade]);
        }
        Self { hitboxes }
    }
}

impl AttackDefinitions {
    pub fn hitboxes_for(&self, anim: &str) -> &[HitBoxArea] {
        self.hitboxes.get(anim).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub struct AnimationBridgePlugin;

impl Plugin for AnimationBridgePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AnimationCue>()
            .init_resource::<AttackDefinitions>()
            .add_systems(OnEnter(AppState::InGame), setup_animation_library)
            .add_systems(
                Update,
                setup_character_rig.run_if(resource_exists::<AnimationLibrary>),
            )
            .add_systems(
                Update,
                (track_full_body, consume_animation_cues)
                    .chain()
                    .in_set(AnimationSet::Cues)
                    .run_if(in_state(AppState::InGame)),
            )
            .add_systems(
                Update,
                (
                    update_animator_params,
                    play_target_action,
                    check_combo,
                    advance_combo,
                    equip_weapon,
                    play_locomotion,
                    play_hurt_reaction,
                )
                    .chain()
                    .in_set(AnimationSet::Bridge)
                    .run_if(resource_exists::<AnimationLibrary>)
                    .run_if(in_state(AppState::InGame)),
            );
    }
}

fn setup_animation_library(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
) {
    let (graph, indices) = AnimationGraph::from_clips(
        CLIPS
            .iter()
            .enumerate()
            .map(|(i, _)| asset_server.load(GltfAssetLabel::Animation(i).from_asset(CHARACTER_PATH))),
    );

    let nodes = CLIPS
        .iter()
        .zip(indices)
        .map(|(name, node)| (name.to_string(), node))
        .collect();

    commands.insert_resource(AnimationLibrary {
        graph: graphs.add(graph),
        nodes,
    });
}

/// An `AnimationPlayer` appears when the character scene finishes loading;
/// wire it to the graph and start idling.
fn setup_character_rig(
    mut commands: Commands,
    library: Res<AnimationLibrary>,
    mut players: Query<(Entity, &mut AnimationPlayer), Added<AnimationPlayer>>,
) {
    for (entity, mut player) in &mut players {
        let mut transitions = AnimationTransitions::new();
        if let Some(idle) = library.node("Idle") {
            transitions
                .play(&mut player, idle, Duration::ZERO)
                .repeat();
        }
        commands
            .entity(entity)
            .insert(AnimationGraphHandle(library.graph.clone()))
            .insert(transitions)
            .insert(CharacterRig);
    }
}

/// Watches the acting clip: opens the combo window partway through and
/// returns to the reset state when the clip finishes. Entering the reset
/// state resets both attack triggers and clears the attack parameters.
fn track_full_body(
    mut cues: EventWriter<AnimationCue>,
    mut query: Query<(&mut FullBody, &mut Blackboard, &mut AnimatorTriggers), With<Player>>,
    rigs: Query<&AnimationPlayer, With<CharacterRig>>,
) {
    let Ok((mut full_body, mut blackboard, mut triggers)) = query.single_mut() else {
        return;
    };
    let Ok(player) = rigs.single() else {
        return;
    };

    if full_body.is_reset() {
        return;
    }
    let Some(node) = full_body.node else {
        return;
    };

    let Some(animation) = player.animation(node) else {
        // The clip never started (missing node); treat as finished.
        enter_reset_state(&mut full_body, &mut blackboard, &mut triggers);
        return;
    };

    if !full_body.cue_open_sent && animation.elapsed() >= ATTACK_CUE_OPEN {
        full_body.cue_open_sent = true;
        cues.write(AnimationCue::CanAttack);
    }

    if animation.is_finished() {
        cues.write(AnimationCue::CannotAttack);
        enter_reset_state(&mut full_body, &mut blackboard, &mut triggers);
    }
}

fn enter_reset_state(
    full_body: &mut FullBody,
    blackboard: &mut Blackboard,
    triggers: &mut AnimatorTriggers,
) {
    full_body.state = FullBodyState::Reset;
    full_body.node = None;
    full_body.cue_open_sent = false;
    triggers.reset_all();
    blackboard.should_attack = false;
    blackboard.active_hitboxes.clear();
}

/// Applies buffered animation cues to the combo gating flags.
pub fn consume_animation_cues(
    mut cues: EventReader<AnimationCue>,
    mut query: Query<&mut Blackboard, With<Player>>,
) {
    let Ok(mut blackboard) = query.single_mut() else {
        return;
    };
    for cue in cues.read() {
        match cue {
            AnimationCue::CanAttack => {
                blackboard.can_attack = true;
                blackboard.do_once = false;
            }
            AnimationCue::CannotAttack => {
                blackboard.can_attack = false;
            }
        }
    }
}

/// Pushes the blackboard state into the animator parameters.
fn update_animator_params(
    time: Res<Time>,
    library: Res<AnimationLibrary>,
    mut query: Query<
        (&Transform, &mut AnimatorMemory, &mut AnimatorParams, &Blackboard),
        With<Player>,
    >,
    mut rigs: Query<&mut AnimationPlayer, With<CharacterRig>>,
) {
    let dt = time.delta_secs();
    if dt == 0.0 {
        return;
    }

    let Ok((transform, mut memory, mut params, blackboard)) = query.single_mut() else {
        return;
    };

    // Angular delta in character rotation since last frame.
    let mut angle = -crate::character_controller::math::yaw_angle_to(
        transform.rotation,
        memory.last_forward,
    );
    memory.last_forward = *transform.forward();
    angle *= TURN_SENSITIVITY * 0.01;
    let turn_target = (angle / dt).clamp(-1.0, 1.0);
    params.turn += (turn_target - params.turn) * (dt * TURN_INTERP_SPEED).min(1.0);

    let anim = &blackboard.anim_state;
    params.forward = anim.move_direction.z.clamp(-1.0, 1.0);
    params.right = anim.move_direction.x;
    params.crouch = anim.crouch;
    params.on_ground = anim.on_ground;
    params.is_strafing = anim.is_strafing;
    if !anim.on_ground {
        params.jump = anim.y_velocity;
    }

    let Ok(mut player) = rigs.single_mut() else {
        return;
    };
    let Some(locomotion) = library.node("Locomotion") else {
        return;
    };
    if let Some(active) = player.animation_mut(locomotion) {
        // Leg phase for the jump blend while mid-jump.
        if anim.jump {
            let run_cycle = (active.elapsed() + RUN_CYCLE_LEG_OFFSET).fract();
            let leg = if run_cycle < 0.5 { 1.0 } else { -1.0 };
            params.jump_leg = leg * params.forward;
        }

        // Speed up grounded forward locomotion only; never airborne clips.
        if anim.on_ground && anim.move_direction.z > 0.0 {
            active.set_speed(ANIM_SPEED_MULTIPLIER);
        } else {
            active.set_speed(1.0);
        }
    }
}

/// Starts the frame's target animation, but only from the reset state. If
/// nothing is queued while in reset, the gating flags are cleared.
fn play_target_action(
    library: Res<AnimationLibrary>,
    attacks: Res<AttackDefinitions>,
    mut query: Query<(&mut FullBody, &mut Blackboard), With<Player>>,
    mut rigs: Query<(&mut AnimationPlayer, &mut AnimationTransitions), With<CharacterRig>>,
) {
    let Ok((mut full_body, mut blackboard)) = query.single_mut() else {
        return;
    };
    if !full_body.is_reset() {
        return;
    }

    let target_anim = blackboard
        .action_slot
        .as_ref()
        .and_then(|slot| slot.target_anim.clone());

    match target_anim {
        Some(anim) => {
            let Some(node) = library.node(&anim) else {
                warn!("unknown target animation {anim:?}");
                return;
            };
            let Ok((mut player, mut transitions)) = rigs.single_mut() else {
                return;
            };
            transitions.play(&mut player, node, Duration::ZERO);
            full_body.state = FullBodyState::Acting { anim: anim.clone() };
            full_body.node = Some(node);
            full_body.cue_open_sent = false;

            // State-enter hook: this attack's hit-box regions go live.
            blackboard.active_hitboxes = attacks.hitboxes_for(&anim).to_vec();
            blackboard.should_attack = !blackboard.active_hitboxes.is_empty();
        }
        None => {
            // Defensive reset: nothing queued while idle.
            blackboard.can_attack = false;
            blackboard.do_once = false;
        }
    }
}

/// Which trigger a qualifying press fires. Light is checked first; phase
/// and slide never chain combos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackTrigger {
    Light,
    Heavy,
}

/// The combo gate: at most one trigger per armed period, re-armed only by
/// an explicit [`AnimationCue::CanAttack`].
pub fn combo_trigger(
    blackboard: &mut Blackboard,
    pressed: Option<ActionButton>,
) -> Option<AttackTrigger> {
    if !blackboard.can_attack || blackboard.do_once {
        return None;
    }
    match pressed {
        Some(ActionButton::LightAttack) => {
            blackboard.do_once = true;
            Some(AttackTrigger::Light)
        }
        Some(ActionButton::HeavyAttack) => {
            blackboard.do_once = true;
            Some(AttackTrigger::Heavy)
        }
        _ => None,
    }
}

pub fn check_combo(
    mut query: Query<(&mut Blackboard, &mut AnimatorTriggers), With<Player>>,
) {
    let Ok((mut blackboard, mut triggers)) = query.single_mut() else {
        return;
    };
    let pressed = blackboard.pressed_action;
    match combo_trigger(&mut blackboard, pressed) {
        Some(AttackTrigger::Light) => triggers.light_attack = true,
        Some(AttackTrigger::Heavy) => triggers.heavy_attack = true,
        None => {}
    }
}

/// Consumes a pending attack trigger while acting: cross-fades into the
/// mapped follow-up attack for the current weapon class.
fn advance_combo(
    library: Res<AnimationLibrary>,
    attacks: Res<AttackDefinitions>,
    mut query: Query<
        (
            &mut FullBody,
            &mut Blackboard,
            &mut AnimatorTriggers,
            &crate::combat::actions::ActionSlots,
        ),
        With<Player>,
    >,
    mut rigs: Query<(&mut AnimationPlayer, &mut AnimationTransitions), With<CharacterRig>>,
) {
    let Ok((mut full_body, mut blackboard, mut triggers, slots)) = query.single_mut() else {
        return;
    };
    if full_body.is_reset() {
        return;
    }

    let button = if triggers.light_attack {
        triggers.light_attack = false;
        ActionButton::LightAttack
    } else if triggers.heavy_attack {
        triggers.heavy_attack = false;
        ActionButton::HeavyAttack
    } else {
        return;
    };

    let Some(anim) = slots
        .get(button)
        .and_then(|slot| slot.target_anim.clone())
    else {
        return;
    };
    let Some(node) = library.node(&anim) else {
        return;
    };
    let Ok((mut player, mut transitions)) = rigs.single_mut() else {
        return;
    };

    transitions.play(&mut player, node, COMBO_FADE);
    full_body.state = FullBodyState::Acting { anim: anim.clone() };
    full_body.node = Some(node);
    full_body.cue_open_sent = false;
    blackboard.active_hitboxes = attacks.hitboxes_for(&anim).to_vec();
    blackboard.should_attack = !blackboard.active_hitboxes.is_empty();
}

/// Cross-fades the equip animation when a one-handed weapon is drawn and
/// eases the two-handed blend parameter towards the current class.
fn equip_weapon(
    time: Res<Time>,
    library: Res<AnimationLibrary>,
    mut query: Query<(&mut FullBody, &mut Blackboard, &mut AnimatorParams), With<Player>>,
    mut rigs: Query<(&mut AnimationPlayer, &mut AnimationTransitions), With<CharacterRig>>,
) {
    let Ok((mut full_body, mut blackboard, mut params)) = query.single_mut() else {
        return;
    };

    if blackboard.current_weapon == crate::combat::actions::WeaponStatus::OneHanded
        && !blackboard.weapon_equipped
    {
        if let (Some(node), Ok((mut player, mut transitions))) =
            (library.node("Sword1h_Equip"), rigs.single_mut())
        {
            transitions.play(&mut player, node, EQUIP_FADE);
            full_body.state = FullBodyState::Acting {
                anim: "Sword1h_Equip".to_string(),
            };
            full_body.node = Some(node);
            full_body.cue_open_sent = false;
        }
        blackboard.weapon_equipped = true;
        info!("equipped one-handed weapon");
    }

    let target = blackboard.current_weapon.as_blend();
    params.is_two_handed += (target - params.is_two_handed) * time.delta_secs().min(1.0);
}

/// Base locomotion while in the reset state: idle, locomotion or the
/// airborne clip, picked from the pushed parameters.
fn play_locomotion(
    library: Res<AnimationLibrary>,
    mut query: Query<(&mut FullBody, &AnimatorParams), With<Player>>,
    mut rigs: Query<(&mut AnimationPlayer, &mut AnimationTransitions), With<CharacterRig>>,
) {
    let Ok((mut full_body, params)) = query.single_mut() else {
        return;
    };
    if !full_body.is_reset() {
        return;
    }

    let desired = if !params.on_ground {
        "Jump"
    } else if params.forward.abs() > 0.05 || params.right.abs() > 0.05 {
        "Locomotion"
    } else {
        "Idle"
    };

    if full_body.base_clip.as_deref() == Some(desired) {
        return;
    }
    let Some(node) = library.node(desired) else {
        return;
    };
    let Ok((mut player, mut transitions)) = rigs.single_mut() else {
        return;
    };
    transitions.play(&mut player, node, LOCOMOTION_FADE).repeat();
    full_body.base_clip = Some(desired.to_string());
}

/// Hurt-reaction playback entry point: damage to the player interrupts
/// into a hit-reaction variant.
fn play_hurt_reaction(
    library: Res<AnimationLibrary>,
    mut events: EventReader<DamageDealt>,
    mut query: Query<(Entity, &mut FullBody), With<Player>>,
    mut rigs: Query<(&mut AnimationPlayer, &mut AnimationTransitions), With<CharacterRig>>,
) {
    let Ok((player_entity, mut full_body)) = query.single_mut() else {
        return;
    };

    for event in events.read() {
        if event.target != player_entity {
            continue;
        }
        let clip = HURT_CLIPS[thread_rng().gen_range(0..HURT_CLIPS.len())];
        let Some(node) = library.node(clip) else {
            continue;
        };
        let Ok((mut player, mut transitions)) = rigs.single_mut() else {
            continue;
        };
        transitions.play(&mut player, node, HURT_FADE);
        full_body.state = FullBodyState::Acting {
            anim: clip.to_string(),
        };
        full_body.node = Some(node);
        full_body.cue_open_sent = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combo_fires_once_per_armed_period() {
        let mut blackboard = Blackboard::default();

        // Not armed: nothing fires.
        assert_eq!(
            combo_trigger(&mut blackboard, Some(ActionButton::LightAttack)),
            None
        );

        // Armed by the external cue.
        blackboard.can_attack = true;
        blackboard.do_once = false;

        assert_eq!(
            combo_trigger(&mut blackboard, Some(ActionButton::LightAttack)),
            Some(AttackTrigger::Light)
        );
        // Second press in the same armed period is swallowed.
        assert_eq!(
            combo_trigger(&mut blackboard, Some(ActionButton::LightAttack)),
            None
        );
        assert_eq!(
            combo_trigger(&mut blackboard, Some(ActionButton::HeavyAttack)),
            None
        );

        // Only the explicit cue re-arms.
        blackboard.can_attack = true;
        blackboard.do_once = false;
        assert_eq!(
            combo_trigger(&mut blackboard, Some(ActionButton::HeavyAttack)),
            Some(AttackTrigger::Heavy)
        );
    }

    #[test]
    fn phase_and_slide_never_trigger_combos() {
        let mut blackboard = Blackboard {
            can_attack: true,
            ..Default::default()
        };
        assert_eq!(combo_trigger(&mut blackboard, Some(ActionButton::Phase)), None);
        assert_eq!(combo_trigger(&mut blackboard, Some(ActionButton::Slide)), None);
        assert!(!blackboard.do_once);
    }

    #[test]
    fn cues_drive_the_gating_flags() {
        let mut app = App::new();
        app.add_event::<AnimationCue>();
        app.add_systems(Update, consume_animation_cues);

        let player = app
            .world_mut()
            .spawn((
                Player,
                Blackboard {
                    do_once: true,
                    ..Default::default()
                },
            ))
            .id();

        app.world_mut().send_event(AnimationCue::CanAttack);
        app.update();
        let blackboard = app.world().get::<Blackboard>(player).unwrap();
        assert!(blackboard.can_attack);
        assert!(!blackboard.do_once);

        app.world_mut().send_event(AnimationCue::CannotAttack);
        app.update();
        let blackboard = app.world().get::<Blackboard>(player).unwrap();
        assert!(!blackboard.can_attack);
    }
}
