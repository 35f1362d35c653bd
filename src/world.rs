use std::f32::consts::PI;

use avian3d::prelude::*;
use bevy::pbr::CascadeShadowConfigBuilder;
use bevy::prelude::*;

use crate::combat::hit_response::{Health, Hurtbox};
use crate::game_states::AppState;
use crate::physics::GameLayer;

pub(crate) struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppState::InGame), setup)
            .add_systems(Update, patrol_platform.run_if(in_state(AppState::InGame)));
    }
}

/// A platform that drifts back and forth so there is something to stand on
/// that carries its own velocity.
#[derive(Component)]
struct PatrolPlatform {
    half_range: f32,
    origin_x: f32,
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Floor
    commands.spawn((
        RigidBody::Static,
        Collider::cuboid(40.0, 0.2, 40.0),
        Mesh3d(meshes.add(Cuboid::new(40.0, 0.2, 40.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.3, 0.5, 0.3))),
        Transform::from_xyz(0.0, -0.1, 0.0),
    ));

    // A tall wall on the wall-run layer.
    commands.spawn((
        RigidBody::Static,
        Collider::cuboid(16.0, 5.0, 0.6),
        CollisionLayers::new([GameLayer::Default, GameLayer::WallRun], LayerMask::ALL),
        Mesh3d(meshes.add(Cuboid::new(16.0, 5.0, 0.6))),
        MeshMaterial3d(materials.add(Color::srgb(0.5, 0.45, 0.4))),
        Transform::from_xyz(0.0, 2.5, 8.0),
    ));

    // A cube to move around
    commands.spawn((
        RigidBody::Dynamic,
        Collider::cuboid(1.0, 1.0, 1.0),
        Mesh3d(meshes.add(Cuboid::default())),
        MeshMaterial3d(materials.add(Color::srgb(0.8, 0.7, 0.6))),
        Transform::from_xyz(3.0, 2.0, 3.0),
    ));

    // Drifting platform; the motor adopts its velocity when stood upon.
    commands.spawn((
        RigidBody::Kinematic,
        Collider::cuboid(3.0, 0.3, 3.0),
        LinearVelocity(Vec3::X * 1.5),
        Mesh3d(meshes.add(Cuboid::new(3.0, 0.3, 3.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.4, 0.4, 0.7))),
        Transform::from_xyz(-6.0, 0.6, -4.0),
        PatrolPlatform {
            half_range: 5.0,
            origin_x: -6.0,
        },
    ));

    // Training dummy with a hurt-box.
    let dummy = commands
        .spawn((
            RigidBody::Static,
            Collider::capsule(0.4, 1.2),
            Health::new(100.0),
            Mesh3d(meshes.add(Capsule3d::new(0.4, 1.2))),
            MeshMaterial3d(materials.add(Color::srgb(0.7, 0.3, 0.3))),
            Transform::from_xyz(2.0, 1.0, -3.0),
        ))
        .id();
    commands.entity(dummy).with_children(|parent| {
        parent.spawn((
            Collider::capsule(0.5, 1.3),
            Sensor,
            CollisionEventsEnabled,
            CollisionLayers::new([GameLayer::HurtBox], [GameLayer::HitBox]),
            Hurtbox { owner: dummy },
        ));
    });

    // Light
    commands.spawn((
        Transform::from_rotation(Quat::from_euler(EulerRot::ZYX, 0.0, 1.0, -PI / 4.)),
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        CascadeShadowConfigBuilder {
            first_cascade_far_bound: 200.0,
            maximum_distance: 400.0,
            ..default()
        }
        .build(),
    ));
}

fn patrol_platform(
    mut query: Query<(&Transform, &mut LinearVelocity, &PatrolPlatform)>,
) {
    for (transform, mut velocity, platform) in &mut query {
        let offset = transform.translation.x - platform.origin_x;
        if offset > platform.half_range {
            velocity.x = -velocity.x.abs();
        } else if offset < -platform.half_range {
            velocity.x = velocity.x.abs();
        }
    }
}
