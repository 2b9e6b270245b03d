//! Model and texture assets: glTF import, image decoding, content-addressed
//! ids, and loading off the main thread behind an explicitly polled
//! [`LoadState`].
//!
//! Renderers consume assets by [`AssetId`], never by file path.

mod loader;
mod texture;

pub use loader::{Asset, AssetLoader, LoadState, Pending, PendingModel, PendingTexture};
pub use texture::{Texture, import_texture};

use giftbox_common::AssetId;
use glam::{Mat4, Vec3};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("primitive in mesh {0:?} has no positions")]
    MissingPositions(String),
    #[error("{0} contains no drawable data")]
    Empty(String),
    #[error("loader thread exited before delivering a result")]
    LoaderLost,
}

/// One drawable primitive of a model, already in model space.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub base_color: [f32; 4],
    /// Node transform accumulated from the scene root.
    pub transform: Mat4,
}

/// A loaded model: every mesh primitive reachable from the file's scenes.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub id: AssetId,
    pub name: String,
    pub meshes: Vec<ModelMesh>,
}

impl Model {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.positions.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len()).sum()
    }
}

/// Import a glTF/GLB file synchronously. External buffers resolve relative
/// to the file's directory; images are not decoded.
pub fn import_model(path: impl AsRef<Path>) -> Result<Model, AssetError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let id = content_id(&bytes);
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(&bytes)?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)?;

    let mut meshes = Vec::new();
    for scene in document.scenes() {
        for node in scene.nodes() {
            collect_node(&node, Mat4::IDENTITY, &buffers, &mut meshes)?;
        }
    }
    if meshes.is_empty() {
        return Err(AssetError::Empty(path.display().to_string()));
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string();
    tracing::info!(
        model = %name,
        meshes = meshes.len(),
        "imported glTF model"
    );
    Ok(Model { id, name, meshes })
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<ModelMesh>,
) -> Result<(), AssetError> {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let name = mesh.name().unwrap_or("unnamed").to_string();
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            let positions: Vec<Vec3> = reader
                .read_positions()
                .ok_or_else(|| AssetError::MissingPositions(name.clone()))?
                .map(Vec3::from)
                .collect();
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());
            let normals: Vec<Vec3> = reader
                .read_normals()
                .map(|iter| iter.map(Vec3::from).collect())
                .unwrap_or_else(|| face_normals(&positions, &indices));

            out.push(ModelMesh {
                name: name.clone(),
                positions,
                normals,
                indices,
                base_color: primitive
                    .material()
                    .pbr_metallic_roughness()
                    .base_color_factor(),
                transform,
            });
        }
    }

    for child in node.children() {
        collect_node(&child, transform, buffers, out)?;
    }
    Ok(())
}

/// Per-vertex normals averaged from the faces that use each vertex.
fn face_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let n = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
        .collect()
}

/// Content-addressed id: the first eight bytes of the SHA-256 of the file.
pub fn content_id(bytes: &[u8]) -> AssetId {
    let digest = Sha256::digest(bytes);
    let mut id = [0u8; 8];
    id.copy_from_slice(&digest[..8]);
    AssetId(u64::from_le_bytes(id))
}

/// Registry of loaded models and textures keyed by content id.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    models: BTreeMap<AssetId, Arc<Model>>,
    textures: BTreeMap<AssetId, Arc<Texture>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model. Re-registering identical content is a no-op.
    pub fn insert(&mut self, model: Arc<Model>) -> AssetId {
        let id = model.id;
        self.models.entry(id).or_insert(model);
        id
    }

    pub fn get(&self, id: AssetId) -> Option<&Arc<Model>> {
        self.models.get(&id)
    }

    /// Register a texture. Re-registering identical content is a no-op.
    pub fn insert_texture(&mut self, texture: Arc<Texture>) -> AssetId {
        let id = texture.id;
        self.textures.entry(id).or_insert(texture);
        id
    }

    pub fn texture(&self, id: AssetId) -> Option<&Arc<Texture>> {
        self.textures.get(&id)
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}
