//! Small vector helpers used by the motor.

use bevy::prelude::*;

/// Component of `v` along `up`.
pub fn extract_vertical(v: Vec3, up: Vec3) -> Vec3 {
    v.project_onto_normalized(up)
}

/// `v` with its `up` component removed.
pub fn extract_horizontal(v: Vec3, up: Vec3) -> Vec3 {
    v - extract_vertical(v, up)
}

/// Moves `current` towards `target` by at most `max_delta`.
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Moves `current` towards `target` by at most `max_delta` units.
pub fn move_towards_vec3(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let to_target = target - current;
    let distance = to_target.length();
    if distance <= max_delta || distance < 1e-6 {
        target
    } else {
        current + to_target / distance * max_delta
    }
}

/// Critically damped interpolation towards `target`. `velocity` is scratch
/// state carried between calls.
pub fn smooth_damp(
    current: Vec3,
    target: Vec3,
    velocity: &mut Vec3,
    smooth_time: f32,
    dt: f32,
) -> Vec3 {
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;
    target + (change + temp) * exp
}

/// Rotates the unit vector `current` towards `target` by at most
/// `max_angle` radians. With `current` = up this clamps how far a surface
/// normal may tilt the character.
pub fn rotate_towards(current: Vec3, target: Vec3, max_angle: f32) -> Vec3 {
    let angle = current.angle_between(target);
    if angle <= max_angle || !angle.is_finite() {
        return target;
    }
    let axis = current.cross(target);
    if axis.length_squared() < 1e-10 {
        // Antiparallel or degenerate; nothing sensible to rotate around.
        return current;
    }
    Quat::from_axis_angle(axis.normalize(), max_angle) * current
}

/// Makes `tangent` orthogonal to `normal`, both normalized. Returns the
/// inputs unchanged when the projection degenerates.
pub fn ortho_normalize(normal: Vec3, tangent: Vec3) -> (Vec3, Vec3) {
    let normal = normal.normalize_or_zero();
    let projected = tangent - tangent.project_onto_normalized(normal);
    if projected.length_squared() < 1e-10 {
        return (normal, tangent);
    }
    (normal, projected.normalize())
}

/// Signed yaw angle in degrees from the rotation's forward axis to
/// `world_direction`.
pub fn yaw_angle_to(rotation: Quat, world_direction: Vec3) -> f32 {
    let local = rotation.inverse() * world_direction;
    // Forward is -Z; atan2 of the local x/-z pair gives the turn angle.
    local.x.atan2(-local.z).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_and_horizontal_recompose() {
        let v = Vec3::new(1.5, -3.0, 0.5);
        let up = Vec3::Y;
        let vertical = extract_vertical(v, up);
        let horizontal = extract_horizontal(v, up);
        assert!((vertical + horizontal - v).length() < 1e-6);
        assert!(horizontal.dot(up).abs() < 1e-6);
    }

    #[test]
    fn move_towards_clamps_step() {
        assert_eq!(move_towards(0.0, 1.0, 0.25), 0.25);
        assert_eq!(move_towards(0.9, 1.0, 0.25), 1.0);
        assert_eq!(move_towards(1.0, 0.0, 0.25), 0.75);
    }

    #[test]
    fn smooth_damp_converges() {
        let mut velocity = Vec3::ZERO;
        let mut current = Vec3::ZERO;
        let target = Vec3::new(0.0, 0.0, 1.0);
        for _ in 0..240 {
            current = smooth_damp(current, target, &mut velocity, 0.2, 1.0 / 60.0);
        }
        assert!((current - target).length() < 1e-2);
    }

    #[test]
    fn rotate_towards_clamps_deviation() {
        let up = Vec3::Y;
        let steep = Vec3::new(1.0, 0.05, 0.0).normalize();
        let clamped = rotate_towards(up, steep, 45f32.to_radians());
        let deviation = clamped.angle_between(up);
        assert!((deviation - 45f32.to_radians()).abs() < 1e-4);

        let shallow = Vec3::new(0.3, 1.0, 0.0).normalize();
        assert_eq!(rotate_towards(up, shallow, 80f32.to_radians()), shallow);
    }

    #[test]
    fn yaw_angle_sign() {
        // Identity rotation faces -Z. A direction to the local right (+X)
        // is +90 degrees.
        let angle = yaw_angle_to(Quat::IDENTITY, Vec3::X);
        assert!((angle - 90.0).abs() < 1e-3);
        let angle = yaw_angle_to(Quat::IDENTITY, Vec3::NEG_Z);
        assert!(angle.abs() < 1e-3);
    }
}
