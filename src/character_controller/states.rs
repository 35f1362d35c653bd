//! Presentation-phase blackboard upkeep: sprint stamina, crouch state and
//! the animation-state snapshot the bridge reads.

use bevy::prelude::*;

use crate::character_controller::components::{GroundState, JumpState, MoveSmoothing};
use crate::character_controller::math;
use crate::config::{MotorSettings, MoveMode};
use crate::player::{Blackboard, Player, RUN_SPEED, SPRINT_SPEED};

/// Sprint is a held state: holding the button drains stamina, releasing it
/// recovers. Both directions clamp, so stamina never leaves [0, max].
pub fn update_sprint_state(time: Res<Time>, mut query: Query<&mut Blackboard, With<Player>>) {
    let Ok(mut blackboard) = query.single_mut() else {
        return;
    };
    let dt = time.delta_secs();

    if blackboard.input.sprint {
        blackboard.is_sprinting = true;
        blackboard.drain_sprint_stamina(dt);
        blackboard.speed = SPRINT_SPEED;
    } else {
        blackboard.is_sprinting = false;
        blackboard.recover_sprint_stamina(dt);
        blackboard.speed = RUN_SPEED;
    }
}

pub fn update_crouch_state(mut query: Query<&mut Blackboard, With<Player>>) {
    let Ok(mut blackboard) = query.single_mut() else {
        return;
    };
    blackboard.is_crouching = blackboard.input.crouch;
}

/// Fills the blackboard's animation snapshot from the motor outputs.
pub fn update_anim_state(
    time: Res<Time>,
    mut query: Query<
        (
            &Transform,
            &MotorSettings,
            &GroundState,
            &JumpState,
            &mut MoveSmoothing,
            &mut Blackboard,
        ),
        With<Player>,
    >,
) {
    let dt = time.delta_secs();

    let Ok((transform, settings, ground, jump, mut smoothing, mut blackboard)) =
        query.single_mut()
    else {
        return;
    };

    let move_direction = match settings.move_mode {
        MoveMode::Directional => {
            // Forward-only magnitude; the character turns to face the input.
            let target = Vec3::new(0.0, 0.0, blackboard.input.move_world.length());
            let mut velocity = smoothing.velocity;
            smoothing.value = math::smooth_damp(
                smoothing.value,
                target,
                &mut velocity,
                settings.smooth_acceleration_time,
                dt,
            );
            smoothing.velocity = velocity;
            smoothing.value = math::move_towards_vec3(
                smoothing.value,
                target,
                dt * settings.linear_acceleration_speed,
            );
            smoothing.value * ground.forward_mlp
        }
        MoveMode::Strafe => {
            let target = blackboard.input.move_world;
            let mut velocity = smoothing.velocity;
            smoothing.value = math::smooth_damp(
                smoothing.value,
                target,
                &mut velocity,
                settings.smooth_acceleration_time,
                dt,
            );
            smoothing.velocity = velocity;
            smoothing.value = math::move_towards_vec3(
                smoothing.value,
                target,
                dt * settings.linear_acceleration_speed,
            );
            // Into character-local space for the strafe blend tree.
            transform.rotation.inverse() * smoothing.value
        }
    };

    let y_velocity = blackboard.anim_state.y_velocity;
    blackboard.anim_state = crate::player::AnimState {
        move_direction,
        jump: jump.jumping,
        crouch: blackboard.input.crouch,
        on_ground: ground.on_ground,
        is_strafing: settings.move_mode == MoveMode::Strafe,
        y_velocity: y_velocity + (ground.velocity_y - y_velocity) * (dt * 10.0).min(1.0),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprint_drains_and_release_recovers() {
        let mut app = App::new();
        app.init_resource::<Time>();
        app.add_systems(Update, update_sprint_state);

        let player = app
            .world_mut()
            .spawn((
                Player,
                Blackboard {
                    max_sprint_stamina: 10.0,
                    current_sprint_stamina: 10.0,
                    ..Default::default()
                },
            ))
            .id();

        // Advance virtual time so delta is non-zero.
        let mut time = app.world_mut().resource_mut::<Time>();
        time.advance_by(std::time::Duration::from_millis(500));

        app.world_mut().get_mut::<Blackboard>(player).unwrap().input.sprint = true;
        app.update();

        let blackboard = app.world().get::<Blackboard>(player).unwrap();
        assert!(blackboard.is_sprinting);
        assert!(blackboard.current_sprint_stamina < 10.0);
        assert_eq!(blackboard.speed, SPRINT_SPEED);
    }
}
