use std::{
    path::{Path, PathBuf},
    thread::JoinHandle,
};

use anyhow::Context;
use glam::{Quat, Vec3};

use crate::model::Model;

/// A glTF node, flattened out of the document so it can cross threads.
#[derive(Debug, Clone)]
pub struct AssetNode {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: f32,
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
}

/// Decoded contents of a model file. Mesh and node vectors are indexed like
/// the glTF document; meshes that failed to decode are `None`.
pub struct LoadedAsset {
    pub source: String,
    pub meshes: Vec<Option<Model>>,
    pub nodes: Vec<AssetNode>,
    pub roots: Vec<usize>,
}

pub type AssetLoadResult = anyhow::Result<LoadedAsset>;

impl LoadedAsset {
    pub fn from_gltf(
        source: impl Into<String>,
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
    ) -> anyhow::Result<LoadedAsset> {
        let source = source.into();
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .context("No scenes in gltf")?;

        let mesh_count = document.meshes().count();
        let mut meshes = Vec::with_capacity(mesh_count);

        for (decoded, mesh) in document.meshes().enumerate() {
            let mesh_name = mesh
                .name()
                .map(String::from)
                .unwrap_or_else(|| format!("Mesh {}", mesh.index()));

            match Model::from_gltf(mesh_name.clone(), mesh, buffers) {
                Ok(model) => meshes.push(Some(model)),
                Err(error) => {
                    log::warn!("Skipping mesh {} in {}: {:#}", mesh_name, source, error);
                    meshes.push(None);
                }
            }

            log::debug!(
                "{:.0}% loaded ({} of {} meshes)",
                (decoded + 1) as f32 / mesh_count as f32 * 100.0,
                decoded + 1,
                mesh_count
            );
        }

        let nodes = document
            .nodes()
            .map(|node| {
                let (translation, rotation, scale) = node.transform().decomposed();
                let name = node
                    .name()
                    .map(String::from)
                    .unwrap_or_else(|| format!("Node {}", node.index()));

                let scale = uniform_scale(scale).unwrap_or_else(|| {
                    log::warn!(
                        "Node {} in {} has non-uniform scale {:?}, using {} on all axes",
                        name,
                        source,
                        scale,
                        scale[0]
                    );
                    scale[0]
                });

                AssetNode {
                    name,
                    translation: translation.into(),
                    rotation: Quat::from_array(rotation),
                    scale,
                    mesh: node.mesh().map(|mesh| mesh.index()),
                    children: node.children().map(|child| child.index()).collect(),
                }
            })
            .collect();

        let roots = scene.nodes().map(|node| node.index()).collect();

        Ok(LoadedAsset {
            source,
            meshes,
            nodes,
            roots,
        })
    }

    pub fn from_path(path: &Path) -> anyhow::Result<LoadedAsset> {
        let (document, buffers, _images) = gltf::import(path)
            .with_context(|| format!("Failed to import {}", path.display()))?;

        Self::from_gltf(path.display().to_string(), &document, &buffers)
    }

    #[cfg(test)]
    pub fn from_slice(source: impl Into<String>, bytes: &[u8]) -> anyhow::Result<LoadedAsset> {
        let source = source.into();
        let (document, buffers, _images) = gltf::import_slice(bytes)
            .with_context(|| format!("Failed to import {}", source))?;

        Self::from_gltf(source, &document, &buffers)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.iter().flatten().count()
    }
}

/// Nodes carry one scale factor; `None` when the axes disagree.
fn uniform_scale(scale: [f32; 3]) -> Option<f32> {
    let [x, y, z] = scale;
    let tolerance = 1e-5 * x.abs().max(1.0);

    ((x - y).abs() <= tolerance && (x - z).abs() <= tolerance).then_some(x)
}

/// Decodes the asset at `path` on a worker thread and hands the result to
/// `on_complete`, which is called exactly once from that thread.
pub fn spawn_load<F>(path: PathBuf, on_complete: F) -> anyhow::Result<JoinHandle<()>>
where
    F: FnOnce(AssetLoadResult) + Send + 'static,
{
    log::info!("Loading asset {}", path.display());

    std::thread::Builder::new()
        .name("asset-loader".to_string())
        .spawn(move || {
            let result = LoadedAsset::from_path(&path);
            on_complete(result);
        })
        .context("Failed to spawn asset loader thread")
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::mpsc::channel;

    use super::*;

    /// One triangle, one mesh, a parent node with a translated child.
    pub(crate) const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "nodes": [0] } ],
        "nodes": [
            { "name": "Building", "children": [1] },
            { "name": "Floor", "mesh": 0, "translation": [0.0, 2.0, 0.0] }
        ],
        "meshes": [
            { "name": "FloorMesh", "primitives": [ { "attributes": { "POSITION": 0 } } ] }
        ],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 0.0]
            }
        ],
        "bufferViews": [ { "buffer": 0, "byteLength": 36 } ],
        "buffers": [
            {
                "byteLength": 36,
                "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
            }
        ]
    }"#;

    #[test]
    fn decodes_nodes_and_meshes() {
        let asset = LoadedAsset::from_slice("triangle.gltf", TRIANGLE_GLTF.as_bytes()).unwrap();

        assert_eq!(asset.mesh_count(), 1);
        assert_eq!(asset.roots, vec![0]);
        assert_eq!(asset.nodes[0].name, "Building");
        assert_eq!(asset.nodes[0].children, vec![1]);
        assert_eq!(asset.nodes[1].mesh, Some(0));
        assert_eq!(asset.nodes[1].translation, Vec3::new(0.0, 2.0, 0.0));

        let model = asset.meshes[0].as_ref().unwrap();
        assert_eq!(model.name, "FloorMesh");
        assert_eq!(model.vertex_count(), 3);
        // No normals in the file, so they are derived from the winding
        let normal = model.primitives[0].vertices[0].normal;
        assert!(normal.abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn missing_file_reports_failure_through_callback() {
        let (sender, receiver) = channel();

        let handle = spawn_load(PathBuf::from("does/not/exist.glb"), move |result| {
            sender.send(result.is_err()).unwrap();
        })
        .unwrap();

        handle.join().unwrap();
        assert!(receiver.recv().unwrap());
    }

    #[test]
    fn only_uniform_scales_are_accepted() {
        assert_eq!(uniform_scale([2.0, 2.0, 2.0]), Some(2.0));
        assert_eq!(uniform_scale([1.0, 1.0 + 1e-7, 1.0]), Some(1.0));
        assert_eq!(uniform_scale([1.0, 3.0, 1.0]), None);
        assert_eq!(uniform_scale([1.0, 1.0, -1.0]), None);
    }

    #[test]
    fn non_uniform_node_scale_falls_back_to_x() {
        let gltf = TRIANGLE_GLTF.replace(
            r#""translation": [0.0, 2.0, 0.0]"#,
            r#""translation": [0.0, 2.0, 0.0], "scale": [3.0, 1.0, 1.0]"#,
        );

        let asset = LoadedAsset::from_slice("stretched.gltf", gltf.as_bytes()).unwrap();
        assert_eq!(asset.nodes[1].scale, 3.0);
        assert_eq!(asset.nodes[0].scale, 1.0);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(LoadedAsset::from_slice("garbage", b"not a model").is_err());
    }
}
