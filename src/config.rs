use bevy::prelude::*;
use serde::{Deserialize, Serialize};

const CONFIG_PATH: &str = "assets/controller.ron";

/// Is the character always rotating to face the move direction or is he strafing?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveMode {
    #[default]
    Directional,
    Strafe,
}

/// Locomotion tuning. Lives on the character entity so the inspector can
/// tweak a spawned character, and in [`ControllerConfig`] for the file copy.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorSettings {
    pub move_mode: MoveMode,
    /// Smooth acceleration of the animation move direction.
    pub smooth_acceleration_time: f32,
    /// Linear acceleration of the animation move direction.
    pub linear_acceleration_speed: f32,
    /// How quickly the velocity of a platform we stand on is adopted.
    pub platform_friction: f32,
    /// Power of the stick-to-ground effect that prevents bumping down slopes.
    pub ground_sticky_effect: f32,
    /// Max downward velocity magnitude while grounded.
    pub max_vertical_velocity_on_ground: f32,
    /// Weight of rotating the velocity vector to the ground tangent.
    pub velocity_to_ground_tangent_weight: f32,
    /// Face the camera look position when standing still.
    pub look_in_camera_direction: bool,
    /// Turn speed while moving.
    pub turn_speed: f32,
    /// Extra turn speed multiplier while stationary.
    pub stationary_turn_speed_mlp: f32,
    /// Max horizontal speed while airborne.
    pub air_speed: f32,
    /// Response speed of air control.
    pub air_control: f32,
    /// Upward velocity applied by a jump.
    pub jump_power: f32,
    /// Time that must pass between landing and the next jump.
    pub jump_repeat_delay: f32,
    /// Ground distance below which the character counts as grounded.
    /// Halved while airborne (hysteresis against flicker).
    pub airborne_threshold: f32,
    /// Extra gravity applied while airborne.
    pub gravity_multiplier: f32,
    /// Collider scale while crouching.
    pub crouch_capsule_scale: f32,
}

impl Default for MotorSettings {
    fn default() -> Self {
        Self {
            move_mode: MoveMode::Directional,
            smooth_acceleration_time: 0.2,
            linear_acceleration_speed: 3.0,
            platform_friction: 7.0,
            ground_sticky_effect: 4.0,
            max_vertical_velocity_on_ground: 3.0,
            velocity_to_ground_tangent_weight: 0.0,
            look_in_camera_direction: false,
            turn_speed: 5.0,
            stationary_turn_speed_mlp: 1.0,
            air_speed: 6.0,
            air_control: 2.0,
            jump_power: 12.0,
            jump_repeat_delay: 0.0,
            airborne_threshold: 0.6,
            gravity_multiplier: 2.0,
            crouch_capsule_scale: 0.6,
        }
    }
}

/// Wall-running tuning.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WallRunSettings {
    /// Max duration of a wall run after a jump ends.
    pub max_length: f32,
    /// Minimum magnitude of the movement input.
    pub min_move_mag: f32,
    /// Minimum vertical velocity for starting a wall run.
    pub min_velocity_y: f32,
    /// Speed of rotating the character up vector to the wall normal.
    pub rotation_speed: f32,
    /// Max deviation from upright, in degrees.
    pub max_rotation_angle: f32,
    /// Blend speed of the wall-run weight.
    pub weight_speed: f32,
}

impl Default for WallRunSettings {
    fn default() -> Self {
        Self {
            max_length: 1.0,
            min_move_mag: 0.6,
            min_velocity_y: -1.0,
            rotation_speed: 1.5,
            max_rotation_angle: 70.0,
            weight_speed: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub distance: f32,
    pub height_offset: f32,
    pub rotation_speed: f32,
    pub zoom_speed: f32,
    pub smoothness: f32,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: 5.0,
            height_offset: 1.5,
            rotation_speed: 0.004,
            zoom_speed: 0.5,
            smoothness: 5.0,
            invert_x: false,
            invert_y: false,
        }
    }
}

/// Full tuning file. Missing file or fields fall back to defaults; the
/// controller must never fail to spawn over a config problem.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub motor: MotorSettings,
    pub wall_run: WallRunSettings,
    pub camera: CameraSettings,
    pub run_by_default: bool,
    pub max_sprint_stamina: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            motor: MotorSettings::default(),
            wall_run: WallRunSettings::default(),
            camera: CameraSettings::default(),
            run_by_default: false,
            max_sprint_stamina: 10.0,
        }
    }
}

impl ControllerConfig {
    pub fn load_or_default() -> Self {
        match std::fs::read_to_string(CONFIG_PATH) {
            Ok(text) => match ron::from_str(&text) {
                Ok(config) => config,
                Err(err) => {
                    warn!("failed to parse {CONFIG_PATH}: {err}; using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ControllerConfig::load_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_ron() {
        let config = ControllerConfig::default();
        let text = ron::to_string(&config).unwrap();
        let back: ControllerConfig = ron::from_str(&text).unwrap();
        assert_eq!(back.motor.turn_speed, config.motor.turn_speed);
        assert_eq!(back.max_sprint_stamina, 10.0);
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let back: ControllerConfig = ron::from_str("(run_by_default: true)").unwrap();
        assert!(back.run_by_default);
        assert_eq!(back.motor.jump_power, MotorSettings::default().jump_power);
    }
}
