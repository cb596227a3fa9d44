//! Per-vertex bone influences

/// Maximum number of bone influences stored per vertex
pub const MAX_BONES_PER_VERTEX: usize = 4;

/// Bone influences of a single vertex
///
/// Bone ids are 8-bit so the data can be uploaded as-is as a vertex attribute.
/// Unused slots have a weight of zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexBoneData {
    pub bone_ids: [u8; MAX_BONES_PER_VERTEX],
    pub weights: [f32; MAX_BONES_PER_VERTEX],
    count: u8,
}

impl VertexBoneData {
    /// Add an influence to the first free slot
    ///
    /// Returns `false` if all slots are taken and the influence was dropped.
    pub fn add(&mut self, bone_id: u8, weight: f32) -> bool {
        let slot = self.count as usize;
        if slot >= MAX_BONES_PER_VERTEX {
            return false;
        }
        self.bone_ids[slot] = bone_id;
        self.weights[slot] = weight;
        self.count += 1;
        true
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sum of the stored weights
    pub fn total_weight(&self) -> f32 {
        self.weights.iter().sum()
    }

    /// Scale the weights so they sum to 1.0
    ///
    /// Vertices with no weight are left untouched.
    pub fn normalize(&mut self) {
        let total = self.total_weight();
        if total > f32::EPSILON {
            for weight in &mut self.weights {
                *weight /= total;
            }
        }
    }

    /// Iterate over occupied `(bone id, weight)` slots
    pub fn influences(&self) -> impl Iterator<Item = (u8, f32)> + '_ {
        self.bone_ids
            .iter()
            .copied()
            .zip(self.weights.iter().copied())
            .take(self.len())
    }
}

/// Bone influences for every vertex of one mesh
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinWeights {
    /// Mesh name as given by the importer
    pub mesh: String,
    /// Indexed by mesh-local vertex id
    pub vertices: Vec<VertexBoneData>,
    /// Influences dropped because a vertex already had four
    pub dropped_influences: usize,
}

impl SkinWeights {
    pub fn new(mesh: impl Into<String>, vertex_count: usize) -> Self {
        Self {
            mesh: mesh.into(),
            vertices: vec![VertexBoneData::default(); vertex_count],
            dropped_influences: 0,
        }
    }

    /// Record one influence, logging and dropping it when it cannot be stored
    pub fn add_influence(&mut self, vertex: usize, bone_id: u8, weight: f32) {
        let Some(data) = self.vertices.get_mut(vertex) else {
            log::warn!(
                "Mesh '{}': vertex {vertex} out of range (vertex count {}), influence of bone {bone_id} ignored",
                self.mesh,
                self.vertices.len()
            );
            return;
        };

        if !data.add(bone_id, weight) {
            log::warn!(
                "Mesh '{}': vertex {vertex} has more than {MAX_BONES_PER_VERTEX} bone influences, dropping bone {bone_id} (weight {weight})",
                self.mesh
            );
            self.dropped_influences += 1;
        }
    }

    /// Normalize the weights of every vertex
    pub fn normalize(&mut self) {
        for vertex in &mut self.vertices {
            vertex.normalize();
        }
    }
}
