//! Common test fixtures

#![allow(dead_code)]

use glam::{Mat4, Quat, Vec3};
use pose_engine::raw::{RawJoint, RawMeshBone, RawMeshSkin, RawVertexWeight};

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn cols(matrix: Mat4) -> [f32; 16] {
    matrix.to_cols_array()
}

pub fn mesh_bone(name: &str, offset: Mat4, weights: &[(u32, f32)]) -> RawMeshBone {
    RawMeshBone {
        name: name.to_string(),
        offset: cols(offset),
        weights: weights
            .iter()
            .map(|&(vertex, weight)| RawVertexWeight { vertex, weight })
            .collect(),
    }
}

/// root -> mid -> tip, one unit apart along +Y
///
/// All three joints are bones. Offsets are the inverse bind world transforms,
/// so the bind pose skins every vertex to where it already is.
pub fn chain_joints() -> Vec<RawJoint> {
    vec![
        RawJoint::new(0, "root", None),
        RawJoint::new(1, "mid", Some(0)).with_bind_transform(cols(Mat4::from_translation(Vec3::Y))),
        RawJoint::new(2, "tip", Some(1)).with_bind_transform(cols(Mat4::from_translation(Vec3::Y))),
    ]
}

pub fn chain_mesh() -> RawMeshSkin {
    RawMeshSkin {
        name: "rope".to_string(),
        vertex_count: 3,
        bones: vec![
            mesh_bone("root", Mat4::IDENTITY, &[(0, 1.0)]),
            mesh_bone("mid", Mat4::from_translation(-Vec3::Y), &[(1, 1.0)]),
            mesh_bone("tip", Mat4::from_translation(-2.0 * Vec3::Y), &[(2, 1.0)]),
        ],
    }
}

/// Bind positions of the three chain vertices, one at each joint
pub fn chain_positions() -> Vec<Vec3> {
    vec![Vec3::ZERO, Vec3::Y, 2.0 * Vec3::Y]
}

pub fn quarter_turn_z() -> Quat {
    Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)
}
