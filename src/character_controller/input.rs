//! Raw device state → per-frame blackboard input.

use bevy::prelude::*;

use crate::camera::ThirdPersonCamera;
use crate::character_controller::math;
use crate::player::{Blackboard, Player};

/// Reads keyboard and gamepad state into the blackboard's input snapshot.
/// The move vector is camera-relative and flattened to the character's up
/// plane; a zero vector stays exactly zero (no normalization of nothing).
pub fn capture_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    gamepads: Query<&Gamepad>,
    camera_query: Query<&Transform, (With<ThirdPersonCamera>, Without<Player>)>,
    mut query: Query<(&Transform, &mut Blackboard), With<Player>>,
) {
    let Ok((transform, mut blackboard)) = query.single_mut() else {
        return;
    };
    let Ok(camera_transform) = camera_query.single() else {
        return;
    };

    // Keyboard axes.
    let up = keyboard.any_pressed([KeyCode::KeyW, KeyCode::ArrowUp]);
    let down = keyboard.any_pressed([KeyCode::KeyS, KeyCode::ArrowDown]);
    let left = keyboard.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]);
    let right = keyboard.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]);

    let mut stick = Vec2::new(
        (right as i8 - left as i8) as f32,
        (up as i8 - down as i8) as f32,
    );

    let mut crouch = keyboard.pressed(KeyCode::ControlLeft);
    let mut sprint = keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    let mut jump = keyboard.just_pressed(KeyCode::Space);
    let mut lock_on_toggle = keyboard.just_pressed(KeyCode::Tab);

    for gamepad in gamepads.iter() {
        if let (Some(x), Some(y)) = (
            gamepad.get(GamepadAxis::LeftStickX),
            gamepad.get(GamepadAxis::LeftStickY),
        ) {
            if Vec2::new(x, y).length_squared() > 0.01 {
                stick = Vec2::new(x, y);
            }
        }
        crouch |= gamepad.pressed(GamepadButton::LeftThumb);
        sprint |= gamepad.pressed(GamepadButton::RightTrigger2);
        jump |= gamepad.just_pressed(GamepadButton::South);
        lock_on_toggle |= gamepad.just_pressed(GamepadButton::RightThumb);
    }

    stick = stick.clamp_length_max(1.0);

    // Camera-relative world direction, flattened to the character up plane.
    let camera_yaw = Quat::from_rotation_y(camera_transform.rotation.to_euler(EulerRot::YXZ).0);
    let mut move_world = camera_yaw * Vec3::new(stick.x, 0.0, -stick.y);
    if move_world != Vec3::ZERO {
        let (_, flattened) = math::ortho_normalize(*transform.up(), move_world);
        move_world = flattened * stick.length();
    }

    let speed_multiplier = if blackboard.run_by_default { 1.5 } else { 1.0 };
    blackboard.input.move_world = move_world * speed_multiplier;

    // Head-look target far along the camera forward.
    blackboard.input.look_pos = transform.translation + *camera_transform.forward() * 100.0;

    blackboard.input.crouch = crouch;
    blackboard.input.sprint = sprint;
    // Latched until the fixed-step motor consumes it; a fresh press re-arms.
    blackboard.input.jump |= jump;

    if lock_on_toggle {
        blackboard.lock_on = !blackboard.lock_on;
        if !blackboard.lock_on {
            blackboard.lock_target = None;
        }
    }
}
