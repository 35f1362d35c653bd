use avian3d::prelude::*;
use bevy::{
    input::{
        keyboard::KeyCode,
        mouse::{MouseMotion, MouseWheel},
    },
    math::StableInterpolate,
    prelude::*,
    window::PrimaryWindow,
};

use crate::config::ControllerConfig;
use crate::game_states::AppState;
use crate::player::Player;

#[derive(Component)]
pub struct ThirdPersonCamera {
    pub pitch: f32,
    pub yaw: f32,
    pub distance: f32,
    pub height_offset: f32,
    pub rotation_speed: f32,
    pub zoom_speed: f32,
    /// Camera lag factor (the lower the lazier).
    pub smoothness: f32,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Default for ThirdPersonCamera {
    fn default() -> Self {
        Self {
            pitch: 0.4,
            yaw: 0.0,
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

pub fn spawn_camera(mut commands: Commands, config: Res<ControllerConfig>) {
    let settings = &config.camera;
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 3.0, -6.0).looking_at(Vec3::new(0.0, 1.5, 0.0), Vec3::Y),
        ThirdPersonCamera {
            distance: settings.distance,
            height_offset: settings.height_offset,
            rotation_speed: settings.rotation_speed,
            zoom_speed: settings.zoom_speed,
            smoothness: settings.smoothness,
            invert_x: settings.invert_x,
            invert_y: settings.invert_y,
            ..default()
        },
    ));
}

/// Orbit control: mouse / right stick rotate, wheel zooms, smoothed follow.
pub fn third_person_camera(
    primary_window: Query<&Window, With<PrimaryWindow>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut mouse_wheel: EventReader<MouseWheel>,
    keyboard: Res<ButtonInput<KeyCode>>,
    gamepads: Query<&Gamepad>,
    player_query: Query<&Transform, (With<Player>, Without<ThirdPersonCamera>)>,
    mut camera_query: Query<(&mut Transform, &mut ThirdPersonCamera)>,
    time: Res<Time>,
    mut exit: EventWriter<AppExit>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::default());
    }

    let (Ok(player_transform), Ok((mut camera_transform, mut camera_params))) =
        (player_query.single(), camera_query.single_mut())
    else {
        return;
    };

    let window_focused = primary_window
        .single()
        .map(|window| window.focused)
        .unwrap_or(false);

    if window_focused {
        for event in mouse_motion.read() {
            let dx = if camera_params.invert_x { -event.delta.x } else { event.delta.x };
            let dy = if camera_params.invert_y { -event.delta.y } else { event.delta.y };

            camera_params.yaw -= dx * camera_params.rotation_speed;
            camera_params.pitch += dy * camera_params.rotation_speed;

            // Clamp pitch to prevent flipping.
            camera_params.pitch = camera_params.pitch.clamp(0.5, 1.4);
        }

        for event in mouse_wheel.read() {
            camera_params.distance -= event.y * camera_params.zoom_speed;
            camera_params.distance = camera_params.distance.clamp(2.0, 15.0);
        }
    }

    for gamepad in gamepads.iter() {
        if let (Some(right_stick_x), Some(right_stick_y)) = (
            gamepad.get(GamepadAxis::RightStickX),
            gamepad.get(GamepadAxis::RightStickY),
        ) {
            if right_stick_x.abs() > 0.1 || right_stick_y.abs() > 0.1 {
                let gamepad_sensitivity = 0.05;
                let inverted_stick_y = -right_stick_y;

                let dx = if camera_params.invert_x { -right_stick_x } else { right_stick_x };
                let dy = if camera_params.invert_y { -inverted_stick_y } else { inverted_stick_y };

                camera_params.yaw -= dx * gamepad_sensitivity * time.delta_secs() * 60.0;
                camera_params.pitch += dy * gamepad_sensitivity * time.delta_secs() * 60.0;
                camera_params.pitch = camera_params.pitch.clamp(0.5, 1.4);
            }
        }
    }

    let player_pos = player_transform.translation;

    let pitch_rot = Quat::from_rotation_x(camera_params.pitch);
    let yaw_rot = Quat::from_rotation_y(camera_params.yaw);
    let camera_rotation = yaw_rot * pitch_rot;

    let camera_offset = camera_rotation
        * Vec3::new(0.0, camera_params.height_offset, camera_params.distance);

    let target_position = player_pos - camera_offset;
    let focus_pos = player_pos + Vec3::new(0.0, camera_params.height_offset * 0.5, 0.0);

    let mut position = camera_transform.translation;
    position.smooth_nudge(&target_position, camera_params.smoothness, time.delta_secs());
    camera_transform.translation = position;

    camera_transform.look_at(focus_pos, Vec3::Y);
}

/// Keeps the camera out of geometry: pull in on walls, stay off the floor
/// and ceiling, bail to a safe position when inside a collider.
pub fn camera_collision_detection(
    player_query: Query<(Entity, &Transform), (With<Player>, Without<ThirdPersonCamera>)>,
    mut camera_query: Query<(&mut Transform, &ThirdPersonCamera), Without<Player>>,
    spatial_query: SpatialQuery,
    time: Res<Time>,
) {
    let Ok((player_entity, player_transform)) = player_query.single() else {
        return;
    };
    let Ok((mut camera_transform, camera_params)) = camera_query.single_mut() else {
        return;
    };

    let player_position = player_transform.translation;

    let pitch_rot = Quat::from_rotation_x(camera_params.pitch);
    let yaw_rot = Quat::from_rotation_y(camera_params.yaw);
    let camera_rotation = yaw_rot * pitch_rot;

    let ideal_offset = camera_rotation
        * Vec3::new(0.0, camera_params.height_offset, camera_params.distance);
    let ideal_position = player_position - ideal_offset;

    let camera_to_player = player_position - camera_transform.translation;
    let distance_to_player = camera_to_player.length();

    let mut target_position = ideal_position;
    let mut collision_detected = false;

    if distance_to_player > 0.5 {
        let direction = camera_to_player.normalize();
        let Ok(dir3) = Dir3::new(direction) else {
            return;
        };

        let filter = SpatialQueryFilter::default().with_excluded_entities([player_entity]);

        if let Some(hit) = spatial_query.cast_ray(
            camera_transform.translation,
            dir3,
            distance_to_player,
            true,
            &filter,
        ) {
            collision_detected = true;

            let wall_distance = hit.distance;
            let adjustment_factor = 0.8;
            let new_distance = distance_to_player - (wall_distance * adjustment_factor);

            target_position = player_position - direction * new_distance.max(1.5);
        }
    }

    // Don't let the camera dip below the floor.
    if let Some(hit) = spatial_query.cast_ray(
        target_position,
        Dir3::NEG_Y,
        5.0,
        true,
        &SpatialQueryFilter::default(),
    ) {
        let floor_height = target_position.y - hit.distance;
        let min_height = 0.5;
        if hit.distance < min_height {
            target_position.y = floor_height + min_height;
        }
    }

    // Or hug the ceiling.
    if let Some(hit) = spatial_query.cast_ray(
        target_position,
        Dir3::Y,
        5.0,
        true,
        &SpatialQueryFilter::default(),
    ) {
        let min_distance = 0.3;
        if hit.distance < min_distance {
            target_position.y -= min_distance - hit.distance;
        }
    }

    // Inside geometry entirely? Fall back to a safe position near the player.
    let camera_shape = Collider::sphere(0.3);
    let intersections = spatial_query.shape_intersections(
        &camera_shape,
        target_position,
        Quat::default(),
        &SpatialQueryFilter::default().with_excluded_entities([player_entity]),
    );

    if !intersections.is_empty() {
        let safe_direction = (player_position - camera_transform.translation).normalize();
        let safe_distance = camera_params.distance * 0.4;

        target_position = player_position - safe_direction * safe_distance
            + Vec3::new(0.0, camera_params.height_offset * 0.8, 0.0);

        collision_detected = true;
    }

    let smoothness = if collision_detected {
        camera_params.smoothness * 2.0
    } else {
        camera_params.smoothness
    };

    camera_transform
        .translation
        .smooth_nudge(&target_position, smoothness, time.delta_secs());

    let focus_pos = player_position + Vec3::new(0.0, camera_params.height_offset * 0.5, 0.0);
    camera_transform.look_at(focus_pos, Vec3::Y);
}

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppState::InGame), spawn_camera)
            .add_systems(
                Update,
                (third_person_camera, camera_collision_detection)
                    .chain()
                    .run_if(in_state(AppState::InGame)),
            );
    }
}
