//! Physics-driven locomotion: ground detection, wall-running, velocity
//! composition and rotation. Runs in `FixedUpdate`, before the physics
//! step integrates the velocities it writes.
//!
//! Failed casts are never errors: no hit means "no ground" / "no wall" and
//! the airborne defaults apply.

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::character_controller::components::*;
use crate::character_controller::math;
use crate::config::{MotorSettings, MoveMode, WallRunSettings};
use crate::physics::GameLayer;
use crate::player::Blackboard;

/// A jump counts as ended this long after it was initiated; the wall-run
/// window opens here.
const JUMP_END_LEAD: f32 = 0.1;
/// Cooldown after a wall run ends before another may start.
const WALL_RUN_REENTRY_DELAY: f32 = 0.5;
/// Range of the forward raycast that searches for a runnable wall.
const WALL_PROBE_RANGE: f32 = 3.0;

/// The distance below which the character counts as grounded. The band is
/// tighter while airborne than while grounded, so small fluctuations near
/// the threshold cannot toggle the state every step.
pub fn grounded_height(was_grounded: bool, airborne_threshold: f32) -> f32 {
    if was_grounded {
        airborne_threshold
    } else {
        airborne_threshold * 0.5
    }
}

/// Wall-run eligibility: only within a window after a jump ends, only
/// above a minimum vertical velocity, only with enough movement input.
pub fn can_wall_run(
    now: f32,
    jump_end_time: f32,
    settings: &WallRunSettings,
    velocity_y: f32,
    move_magnitude: f32,
) -> bool {
    if now < jump_end_time - JUMP_END_LEAD {
        return false;
    }
    if now > jump_end_time - JUMP_END_LEAD + settings.max_length {
        return false;
    }
    if velocity_y < settings.min_velocity_y {
        return false;
    }
    if move_magnitude < settings.min_move_mag {
        return false;
    }
    true
}

/// Advances the wall-run blend weight towards 0 or 1, never leaving [0, 1].
pub fn step_wall_run_weight(weight: f32, eligible: bool, dt: f32, weight_speed: f32) -> f32 {
    let target = if eligible { 1.0 } else { 0.0 };
    math::move_towards(weight, target, dt * weight_speed).clamp(0.0, 1.0)
}

/// Processes horizontal wall running: finds a runnable wall ahead and
/// blends the character's up towards its normal.
pub fn wall_run(
    time: Res<Time>,
    spatial_query: SpatialQuery,
    mut query: Query<
        (
            Entity,
            &mut Transform,
            &mut LinearVelocity,
            &WallRunSettings,
            &mut WallRunState,
            &GroundState,
            &JumpState,
            &Blackboard,
        ),
        With<CharacterController>,
    >,
) {
    let now = time.elapsed_secs();
    let dt = time.delta_secs();

    for (entity, mut transform, mut velocity, settings, mut state, ground, jump, blackboard) in
        &mut query
    {
        let mut eligible = can_wall_run(
            now,
            jump.jump_end_time,
            settings,
            ground.velocity_y,
            blackboard.input.move_world.length(),
        );

        // Remove flickering in and out of wall-running.
        if state.weight > 0.0 && !eligible {
            state.end_time = now;
        }
        if now < state.end_time + WALL_RUN_REENTRY_DELAY {
            eligible = false;
        }

        state.weight = step_wall_run_weight(state.weight, eligible, dt, settings.weight_speed);

        if state.weight <= 0.0 {
            // Snap back upright once the blend has fully faded out.
            if state.last_weight > 0.0 {
                let forward = math::extract_horizontal(*transform.forward(), Vec3::Y);
                if forward.length_squared() > 1e-6 {
                    transform.rotation =
                        Transform::default().looking_to(forward, Vec3::Y).rotation;
                }
                state.wall_normal = Vec3::Y;
            }
            state.last_weight = state.weight;
            continue;
        }
        state.last_weight = state.weight;

        // Make sure the character won't fall down while blending on a wall.
        if ground.on_ground && ground.velocity_y < 0.0 {
            velocity.0 = math::extract_horizontal(velocity.0, Vec3::Y);
        }

        let flat_forward = math::extract_horizontal(*transform.forward(), Vec3::Y);
        if flat_forward.length_squared() < 1e-6 {
            continue;
        }
        let Ok(probe_dir) = Dir3::new(flat_forward.normalize()) else {
            continue;
        };

        // Raycast for a runnable wall; a miss simply means "no wall".
        let filter = SpatialQueryFilter::from_mask(GameLayer::WallRun)
            .with_excluded_entities([entity]);
        let hit_normal = spatial_query
            .cast_ray(transform.translation, probe_dir, WALL_PROBE_RANGE, true, &filter)
            .map(|hit| hit.normal)
            .unwrap_or(Vec3::Y);

        // Ease towards the wall normal, clamped to the max rotation angle.
        state.wall_normal = state
            .wall_normal
            .lerp(hit_normal, dt * settings.rotation_speed)
            .normalize_or_zero();
        state.wall_normal = math::rotate_towards(
            Vec3::Y,
            state.wall_normal,
            settings.max_rotation_angle.to_radians(),
        );

        // Orthonormalize forward against the wall normal and blend between
        // the upright and wall-running frames.
        let (wall_normal, wall_forward) = math::ortho_normalize(state.wall_normal, *transform.forward());
        let upright = Transform::default()
            .looking_to(flat_forward.normalize(), Vec3::Y)
            .rotation;
        let on_wall = Transform::default()
            .looking_to(wall_forward, wall_normal)
            .rotation;
        transform.rotation = upright.slerp(on_wall, state.weight);
    }
}

/// Rotates the character yaw towards the resolved forward direction.
pub fn rotate_character(
    time: Res<Time>,
    mut query: Query<
        (&mut Transform, &MotorSettings, &GroundState, &Blackboard),
        With<CharacterController>,
    >,
) {
    let dt = time.delta_secs();

    for (mut transform, settings, ground, blackboard) in &mut query {
        if ground.platform_angular_velocity != Vec3::ZERO {
            transform.rotation =
                Quat::from_scaled_axis(ground.platform_angular_velocity * dt) * transform.rotation;
        }

        let Some(forward) = forward_direction(&transform, settings, blackboard) else {
            continue;
        };

        let mut angle = math::yaw_angle_to(transform.rotation, forward);

        // Slow the turn near a full reversal, boost it while stationary.
        if blackboard.input.move_world == Vec3::ZERO {
            angle *= (1.01 - angle.abs() / 180.0) * settings.stationary_turn_speed_mlp;
        }

        let up = *transform.up();
        transform.rotation =
            Quat::from_axis_angle(up, (angle * dt * settings.turn_speed).to_radians())
                * transform.rotation;
    }
}

/// Which way should the character face? Zero-length candidates are treated
/// as "keep the current facing".
fn forward_direction(
    transform: &Transform,
    settings: &MotorSettings,
    blackboard: &Blackboard,
) -> Option<Vec3> {
    let is_moving = blackboard.input.move_world != Vec3::ZERO;

    let candidate = match settings.move_mode {
        MoveMode::Directional if is_moving => blackboard.input.move_world,
        MoveMode::Strafe if is_moving => blackboard.input.look_pos - transform.translation,
        _ if settings.look_in_camera_direction => {
            blackboard.input.look_pos - transform.translation
        }
        _ => *transform.forward(),
    };

    let flat = math::extract_horizontal(candidate, *transform.up());
    (flat.length_squared() > 1e-8).then_some(flat)
}

/// Spherecast-based ground detection with hysteresis, moving-platform
/// velocity capture and sticky-force computation.
pub fn ground_check(
    time: Res<Time>,
    mut commands: Commands,
    mut query: Query<
        (
            Entity,
            &Transform,
            &ShapeHits,
            &LinearVelocity,
            &MotorSettings,
            &mut GroundState,
            &JumpState,
        ),
        With<CharacterController>,
    >,
    platforms: Query<(&LinearVelocity, Option<&AngularVelocity>, &Position), Without<CharacterController>>,
) {
    let now = time.elapsed_secs();
    let dt = time.delta_secs();

    for (entity, transform, hits, velocity, settings, mut ground, jump) in &mut query {
        let up = *transform.up();

        let vertical = math::extract_vertical(velocity.0, up);
        let mut velocity_y = vertical.length();
        if vertical.dot(up) < 0.0 {
            velocity_y = -velocity_y;
        }
        ground.velocity_y = velocity_y;

        // Nearest hit below; a miss means there is no ground in range.
        let hit = hits
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance));
        ground.ground_distance = hit.map_or(f32::MAX, |hit| hit.distance);
        ground.normal = up;

        let mut platform_velocity_target = Vec3::ZERO;
        ground.platform_angular_velocity = Vec3::ZERO;
        let mut sticky_force_target = 0.0;

        // While jumping upward, don't look for ground at all.
        let find_ground = now > jump.jump_end_time && velocity_y < settings.jump_power * 0.5;

        if find_ground {
            let was_grounded = ground.on_ground;
            ground.on_ground = false;

            let ground_height = grounded_height(was_grounded, settings.airborne_threshold);
            let horizontal_speed = math::extract_horizontal(velocity.0, up).length();

            if ground.ground_distance < ground_height {
                // Force the character onto the ground.
                sticky_force_target =
                    settings.ground_sticky_effect * horizontal_speed * ground_height;

                // Adopt the velocity of whatever we are standing on.
                if let Some(hit) = hit {
                    if let Ok((lin_vel, ang_vel, position)) = platforms.get(hit.entity) {
                        let r = hit.point1 - position.0;
                        let spin = ang_vel.map_or(Vec3::ZERO, |w| w.0.cross(r));
                        platform_velocity_target = lin_vel.0 + spin;
                        ground.platform_angular_velocity = ang_vel
                            .map_or(Vec3::ZERO, |w| math::extract_vertical(w.0, up));
                    }
                }

                ground.on_ground = true;
            }
        }

        // Exponentially approach the platform velocity.
        ground.platform_velocity = ground
            .platform_velocity
            .lerp(platform_velocity_target, (dt * settings.platform_friction).min(1.0));
        ground.sticky_force = sticky_force_target;

        if ground.on_ground {
            commands.entity(entity).insert(Grounded);
        } else {
            commands.entity(entity).remove::<Grounded>();
            ground.last_air_time = now;
        }
    }
}

/// Composes the rigid-body velocity from input, platform motion, air
/// control and the sticky force, and consumes jump requests.
pub fn apply_movement(
    time: Res<Time>,
    mut query: Query<
        (
            &Transform,
            &mut LinearVelocity,
            &MotorSettings,
            &mut GroundState,
            &mut JumpState,
            &mut Blackboard,
        ),
        With<CharacterController>,
    >,
) {
    let now = time.elapsed_secs();
    let dt = time.delta_secs();

    for (transform, mut linear_velocity, settings, mut ground, mut jump, mut blackboard) in
        &mut query
    {
        let up = *transform.up();

        let mut velocity = blackboard.input.move_world * blackboard.speed;
        velocity += math::extract_horizontal(ground.platform_velocity, up);

        if ground.on_ground {
            // Rotate the velocity to the ground tangent.
            if settings.velocity_to_ground_tangent_weight > 0.0 {
                let rotation = Quat::from_rotation_arc(up, ground.normal);
                velocity = Quat::IDENTITY
                    .slerp(rotation, settings.velocity_to_ground_tangent_weight)
                    * velocity;
            }
        } else {
            // Air move: ease the whole velocity towards the control target.
            let air_move =
                math::extract_horizontal(blackboard.input.move_world * settings.air_speed, up);
            velocity = linear_velocity.0.lerp(air_move, (dt * settings.air_control).min(1.0));
        }

        if ground.on_ground && now > jump.jump_end_time {
            linear_velocity.0 -= up * ground.sticky_force * dt;
        }

        // Vertical velocity is kept from the body; clamp the downward part
        // while grounded so slopes don't launch the character.
        let mut vertical = math::extract_vertical(linear_velocity.0, up);
        if ground.on_ground && vertical.dot(up) < 0.0 {
            vertical = vertical.clamp_length_max(settings.max_vertical_velocity_on_ground);
        }
        let horizontal = math::extract_horizontal(velocity, up);
        linear_velocity.0 = horizontal + vertical;

        // Damp the forward animation input on slopes, judged from the
        // displacement actually covered last step.
        let damper_target = if ground.on_ground {
            slope_damper(blackboard.delta_position / dt.max(1e-6), ground.normal)
        } else {
            1.0
        };
        ground.forward_mlp = ground
            .forward_mlp
            .lerp(damper_target, (dt * 5.0).min(1.0));
        blackboard.delta_position = linear_velocity.0 * dt;

        // Jump requests are latched by input capture; consume exactly once.
        if blackboard.input.jump {
            blackboard.input.jump = false;
            let repeat_ok = now - ground.last_air_time >= settings.jump_repeat_delay;
            if ground.on_ground && repeat_ok {
                let horizontal = math::extract_horizontal(linear_velocity.0, up);
                linear_velocity.0 = horizontal + up * settings.jump_power;
                jump.jump_end_time = now + JUMP_END_LEAD;
                jump.jumping = true;
                ground.on_ground = false;
                debug!("jump at t={now:.2}");
            }
        }
        if jump.jumping && ground.on_ground && now > jump.jump_end_time {
            jump.jumping = false;
        }
    }
}

/// Uphill movement is slowed, downhill slightly sped up; flat ground is 1.
fn slope_damper(move_world: Vec3, normal: Vec3) -> f32 {
    if move_world.length_squared() < 1e-8 {
        return 1.0;
    }
    let lateral = Vec3::new(normal.x, 0.0, normal.z);
    if lateral.length_squared() < 1e-6 {
        return 1.0;
    }
    let slope_dot = move_world.normalize().dot(lateral.normalize());
    if slope_dot < 0.0 {
        1.0 - slope_dot.abs() * 0.4
    } else {
        1.0 + slope_dot * 0.3
    }
}

/// Gravity boost while airborne, friction switching and the rest snap.
pub fn gravity_and_friction(
    mut query: Query<
        (
            &mut LinearVelocity,
            &mut GravityScale,
            &mut Friction,
            &MotorSettings,
            &GroundState,
            &Blackboard,
        ),
        With<CharacterController>,
    >,
) {
    for (mut velocity, mut gravity, mut friction, settings, ground, blackboard) in &mut query {
        gravity.0 = if ground.on_ground {
            1.0
        } else {
            settings.gravity_multiplier
        };

        let idle_input = blackboard.input.move_world == Vec3::ZERO;
        let near_ground = ground.ground_distance < settings.airborne_threshold * 0.5;

        // High friction only when standing still close to the ground.
        *friction = if idle_input && near_ground {
            Friction::new(1.0)
        } else {
            Friction::ZERO.with_combine_rule(CoefficientCombine::Min)
        };

        // Fully at rest: stop sliding down whatever we stand on.
        if ground.on_ground && idle_input && near_ground && velocity.0.length() < 0.5 {
            velocity.0 = Vec3::ZERO;
        }
    }
}

/// Scales the collider while crouching.
pub fn scale_crouch_capsule(
    mut query: Query<(&mut Collider, &MotorSettings, &Blackboard), With<CharacterController>>,
) {
    for (mut collider, settings, blackboard) in &mut query {
        let scale = if blackboard.is_crouching {
            Vec3::new(1.0, settings.crouch_capsule_scale, 1.0)
        } else {
            Vec3::ONE
        };
        collider.set_scale(scale, 8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall_settings() -> WallRunSettings {
        WallRunSettings::default()
    }

    #[test]
    fn weight_stays_in_unit_interval() {
        let settings = wall_settings();
        let dt = 1.0 / 60.0;

        let mut weight = 0.0;
        for _ in 0..600 {
            weight = step_wall_run_weight(weight, true, dt, settings.weight_speed);
            assert!((0.0..=1.0).contains(&weight));
        }
        assert_eq!(weight, 1.0);

        for _ in 0..600 {
            weight = step_wall_run_weight(weight, false, dt, settings.weight_speed);
            assert!((0.0..=1.0).contains(&weight));
        }
        assert_eq!(weight, 0.0);
    }

    #[test]
    fn weight_moves_at_configured_rate() {
        let dt = 0.1;
        let weight = step_wall_run_weight(0.0, true, dt, 5.0);
        assert!((weight - 0.5).abs() < 1e-6);
    }

    #[test]
    fn wall_run_window_is_bounded() {
        let settings = wall_settings();
        let jump_end = 10.0;

        // Before the window opens.
        assert!(!can_wall_run(9.5, jump_end, &settings, 0.0, 1.0));
        // Inside the window.
        assert!(can_wall_run(10.0, jump_end, &settings, 0.0, 1.0));
        // After the window closes.
        assert!(!can_wall_run(
            jump_end - JUMP_END_LEAD + settings.max_length + 0.01,
            jump_end,
            &settings,
            0.0,
            1.0
        ));
        // Falling too fast.
        assert!(!can_wall_run(10.0, jump_end, &settings, -5.0, 1.0));
        // Not enough input.
        assert!(!can_wall_run(10.0, jump_end, &settings, 0.0, 0.2));
    }

    #[test]
    fn ground_hysteresis_has_no_single_frame_flicker() {
        let threshold = 0.6;
        let epsilon = 0.05;

        // Distance oscillates around the tight threshold; once grounded,
        // the loose threshold keeps it grounded.
        let mut grounded = true;
        for step in 0..100 {
            let noise = if step % 2 == 0 { epsilon } else { -epsilon };
            let distance = threshold * 0.5 + noise;
            grounded = distance < grounded_height(grounded, threshold);
            assert!(grounded, "flickered airborne at step {step}");
        }

        // While airborne the tight threshold applies, so the same distances
        // do not immediately flip it back.
        let distance = threshold * 0.5 + epsilon;
        assert!(distance >= grounded_height(false, threshold));
        assert!(distance < grounded_height(true, threshold));
    }

    #[test]
    fn slope_damper_slows_uphill_speeds_downhill() {
        // Slope rising towards +X, so its normal leans towards -X.
        let normal = Vec3::new(-0.5, 1.0, 0.0).normalize();
        assert_eq!(slope_damper(Vec3::Z, Vec3::Y), 1.0);

        let uphill = slope_damper(Vec3::X, normal);
        assert!(uphill < 1.0);

        let downhill = slope_damper(Vec3::NEG_X, normal);
        assert!(downhill > 1.0);
    }
}
