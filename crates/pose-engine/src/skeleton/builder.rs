//! Skeleton construction from the loader's flat joint list

use std::collections::HashMap;

use glam::Mat4;

use super::bone_map::BoneMap;
use super::joint::{Joint, JointId};
use super::skin::SkinWeights;
use super::{Skeleton, SkeletonOptions};
use crate::error::{AnimationError, Result};
use crate::raw::{RawJoint, RawMeshSkin};

/// Build a skeleton arena from raw joints and mesh skin data
///
/// Bone indices are assigned while scanning `meshes` first, in the order the
/// bones appear there. Joints that only carry an inline offset are assigned
/// the next free index when the traversal reaches them.
pub(crate) fn build(
    raw_joints: &[RawJoint],
    meshes: &[RawMeshSkin],
    options: &SkeletonOptions,
) -> Result<Skeleton> {
    if raw_joints.is_empty() {
        return Err(AnimationError::InvalidHierarchy(
            "joint list is empty".to_string(),
        ));
    }

    let raw_children = link_children(raw_joints)?;
    let root = find_root(raw_joints)?;

    let mut bones = BoneMap::new(options.max_bones);
    for mesh in meshes {
        for bone in &mesh.bones {
            bones.get_or_insert(&bone.name, Mat4::from_cols_array(&bone.offset))?;
        }
    }

    let mut joints: Vec<Joint> = Vec::with_capacity(raw_joints.len());
    let mut names: HashMap<String, JointId> = HashMap::with_capacity(raw_joints.len());
    let mut bone_owners: HashMap<usize, JointId> = HashMap::new();

    // Pre-order walk; children are pushed in reverse so they pop in declared order
    let mut stack: Vec<(usize, Option<JointId>)> = vec![(root, None)];
    while let Some((position, parent)) = stack.pop() {
        let raw = &raw_joints[position];
        let id = joints.len();
        let mut joint = Joint::new(
            id,
            raw.name.clone(),
            Mat4::from_cols_array(&raw.local_bind_transform),
            parent,
        );

        let bone_index = match (bones.index_of(&raw.name), raw.bone_offset) {
            (_, Some(offset)) => {
                Some(bones.get_or_insert(&raw.name, Mat4::from_cols_array(&offset))?)
            }
            (Some(index), None) => Some(index),
            (None, None) => None,
        };

        if let Some(index) = bone_index {
            if let Some(&owner) = bone_owners.get(&index) {
                log::warn!(
                    "Joint '{}' (id {id}) maps to bone {index} already bound to joint {owner}, ignoring",
                    raw.name
                );
            } else {
                bone_owners.insert(index, id);
                joint.bone_index = Some(index);
            }
        }

        if names.contains_key(&raw.name) {
            log::warn!(
                "Duplicate joint name '{}' (id {id}), name lookups resolve to the first occurrence",
                raw.name
            );
        } else {
            names.insert(raw.name.clone(), id);
        }

        if let Some(parent) = parent {
            joints[parent].children.push(id);
        }
        joints.push(joint);

        for &child in raw_children[position].iter().rev() {
            stack.push((child, Some(id)));
        }
    }

    if joints.len() != raw_joints.len() {
        return Err(AnimationError::InvalidHierarchy(format!(
            "{} of {} joints are not reachable from root '{}'",
            raw_joints.len() - joints.len(),
            raw_joints.len(),
            raw_joints[root].name
        )));
    }

    let mut bone_joints = vec![None; bones.len()];
    for (&index, &joint) in &bone_owners {
        bone_joints[index] = Some(joint);
    }
    for (index, joint) in bone_joints.iter().enumerate() {
        if joint.is_none() {
            log::warn!(
                "Bone '{}' (index {index}) has no matching joint and will never be posed",
                bones.names()[index]
            );
        }
    }

    let mut skins = Vec::with_capacity(meshes.len());
    for mesh in meshes {
        let mut skin = SkinWeights::new(mesh.name.clone(), mesh.vertex_count as usize);
        for bone in &mesh.bones {
            let Some(index) = bones.index_of(&bone.name) else {
                continue;
            };
            for weight in &bone.weights {
                skin.add_influence(weight.vertex as usize, index as u8, weight.weight);
            }
        }
        if options.normalize_weights {
            skin.normalize();
        }
        skins.push(skin);
    }

    log::debug!(
        "Built skeleton: {} joints, {} bones, {} skinned meshes",
        joints.len(),
        bones.len(),
        skins.len()
    );

    let (bone_names, bone_offsets) = bones.into_parts();
    Ok(Skeleton {
        joints,
        names,
        bone_names,
        bone_offsets,
        bone_joints,
        skins,
    })
}

/// Child list positions for every raw joint, in declaration order
fn link_children(raw_joints: &[RawJoint]) -> Result<Vec<Vec<usize>>> {
    let mut positions: HashMap<u32, usize> = HashMap::with_capacity(raw_joints.len());
    for (position, joint) in raw_joints.iter().enumerate() {
        if positions.insert(joint.id, position).is_some() {
            return Err(AnimationError::InvalidHierarchy(format!(
                "duplicate joint id {}",
                joint.id
            )));
        }
    }

    let mut children = vec![Vec::new(); raw_joints.len()];
    for (position, joint) in raw_joints.iter().enumerate() {
        let Some(parent_id) = joint.parent else {
            continue;
        };
        let Some(&parent) = positions.get(&parent_id) else {
            return Err(AnimationError::InvalidHierarchy(format!(
                "joint '{}' references unknown parent id {parent_id}",
                joint.name
            )));
        };
        if parent == position {
            return Err(AnimationError::InvalidHierarchy(format!(
                "joint '{}' is its own parent",
                joint.name
            )));
        }
        children[parent].push(position);
    }

    Ok(children)
}

fn find_root(raw_joints: &[RawJoint]) -> Result<usize> {
    let mut roots = raw_joints
        .iter()
        .enumerate()
        .filter(|(_, joint)| joint.parent.is_none())
        .map(|(position, _)| position);

    let root = roots.next().ok_or_else(|| {
        AnimationError::InvalidHierarchy("no root joint (every joint has a parent)".to_string())
    })?;

    if let Some(other) = roots.next() {
        return Err(AnimationError::InvalidHierarchy(format!(
            "multiple root joints: '{}' and '{}'",
            raw_joints[root].name, raw_joints[other].name
        )));
    }

    Ok(root)
}
