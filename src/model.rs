use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use gltf::buffer;
use itertools::izip;

use crate::math::bounds::{BoundingSphere, AABB};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub color: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shading {
    /// Ambient plus one directional light.
    Lit,
    /// Flat base colour, unaffected by lights.
    Unlit,
}

pub struct ModelPrimitive {
    pub index: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

pub struct Model {
    pub name: String,
    pub shading: Shading,
    pub primitives: Vec<ModelPrimitive>,
}

pub type Buffers<'a> = &'a [buffer::Data];

impl Model {
    pub fn from_gltf(
        name: impl Into<String>,
        mesh: gltf::Mesh,
        buffers: Buffers,
    ) -> anyhow::Result<Model> {
        let mut model = Model {
            name: name.into(),
            shading: Shading::Lit,
            primitives: Vec::new(),
        };

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping primitive {} of {}: unsupported mode {:?}",
                    primitive.index(),
                    model.name,
                    primitive.mode()
                );
                continue;
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<Vec3> = match reader.read_positions() {
                Some(positions) => positions.map(Vec3::from).collect(),
                None => {
                    return Err(anyhow::anyhow!(
                        "Primitive {} of {} has no positions",
                        primitive.index(),
                        model.name
                    ))
                }
            };

            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            let normals: Vec<Vec3> = match reader.read_normals() {
                Some(normals) => normals.map(Vec3::from).collect(),
                None => smooth_normals(&positions, &indices),
            };

            let base_color = primitive
                .material()
                .pbr_metallic_roughness()
                .base_color_factor();
            let base_color = Vec3::new(base_color[0], base_color[1], base_color[2]);

            let colors: Vec<Vec3> = match reader.read_colors(0) {
                Some(colors) => colors
                    .into_rgb_f32()
                    .map(|color| Vec3::from(color) * base_color)
                    .collect(),
                None => vec![base_color; positions.len()],
            };

            let vertices = izip!(positions, normals, colors)
                .map(|(position, normal, color)| Vertex {
                    position,
                    normal,
                    color,
                })
                .collect::<Vec<Vertex>>();

            model.primitives.push(ModelPrimitive {
                index: primitive.index(),
                vertices,
                indices,
            });
        }

        if model.primitives.is_empty() {
            return Err(anyhow::anyhow!("Mesh without primitives: {}", model.name));
        }

        Ok(model)
    }

    /// UV sphere centred on the origin, laid out like the usual
    /// width/height-segment sphere generators.
    pub fn uv_sphere(
        name: impl Into<String>,
        radius: f32,
        width_segments: u32,
        height_segments: u32,
        color: Vec3,
        shading: Shading,
    ) -> Model {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);

        let mut vertices = Vec::new();
        let mut grid = Vec::new();

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            let mut row = Vec::new();

            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;

                let position = Vec3::new(
                    -radius * (u * 2.0 * PI).cos() * (v * PI).sin(),
                    radius * (v * PI).cos(),
                    radius * (u * 2.0 * PI).sin() * (v * PI).sin(),
                );

                row.push(vertices.len() as u32);
                vertices.push(Vertex {
                    position,
                    normal: position.normalize_or(Vec3::Y),
                    color,
                });
            }

            grid.push(row);
        }

        let mut indices = Vec::new();

        for iy in 0..height_segments as usize {
            for ix in 0..width_segments as usize {
                let a = grid[iy][ix + 1];
                let b = grid[iy][ix];
                let c = grid[iy + 1][ix];
                let d = grid[iy + 1][ix + 1];

                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }

                if iy != height_segments as usize - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Model {
            name: name.into(),
            shading,
            primitives: vec![ModelPrimitive {
                index: 0,
                vertices,
                indices,
            }],
        }
    }

    pub fn cuboid(name: impl Into<String>, size: Vec3, color: Vec3, shading: Shading) -> Model {
        let half = size * 0.5;

        // (normal, u, v) with u x v = normal, so each quad winds counter-clockwise
        // when seen from outside.
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in faces {
            let base = vertices.len() as u32;
            let center = normal * half;
            let u = u * half;
            let v = v * half;

            for corner in [center - u - v, center + u - v, center + u + v, center - u + v] {
                vertices.push(Vertex {
                    position: corner,
                    normal,
                    color,
                });
            }

            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Model {
            name: name.into(),
            shading,
            primitives: vec![ModelPrimitive {
                index: 0,
                vertices,
                indices,
            }],
        }
    }

    pub fn bounds(&self) -> Option<AABB> {
        AABB::from_points(
            self.primitives
                .iter()
                .flat_map(|primitive| primitive.vertices.iter().map(|vertex| vertex.position)),
        )
    }

    /// Sphere around the centre of the bounding box, reaching the farthest vertex.
    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        let center = self.bounds()?.center();

        let radius = self
            .primitives
            .iter()
            .flat_map(|primitive| primitive.vertices.iter())
            .map(|vertex| vertex.position.distance(center))
            .fold(0.0f32, f32::max);

        Some(BoundingSphere::new(center, radius))
    }

    pub fn vertex_count(&self) -> usize {
        self.primitives
            .iter()
            .map(|primitive| primitive.vertices.len())
            .sum()
    }
}

fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];

        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }

        let face_normal = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face_normal;
        normals[b] += face_normal;
        normals[c] += face_normal;
    }

    normals
        .into_iter()
        .map(|normal| normal.normalize_or(Vec3::Y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_has_expected_topology() {
        let sphere = Model::uv_sphere("Hotpoint", 0.35, 16, 16, Vec3::X, Shading::Unlit);
        let primitive = &sphere.primitives[0];

        assert_eq!(primitive.vertices.len(), 17 * 17);
        // Pole rows contribute one triangle per segment instead of two
        assert_eq!(primitive.indices.len(), 16 * 15 * 2 * 3);
        assert!(primitive
            .indices
            .iter()
            .all(|&index| (index as usize) < primitive.vertices.len()));
    }

    #[test]
    fn sphere_triangles_wind_outward() {
        let sphere = Model::uv_sphere("Hotpoint", 1.0, 16, 16, Vec3::X, Shading::Unlit);
        let primitive = &sphere.primitives[0];

        for triangle in primitive.indices.chunks_exact(3) {
            let [a, b, c] = [
                primitive.vertices[triangle[0] as usize].position,
                primitive.vertices[triangle[1] as usize].position,
                primitive.vertices[triangle[2] as usize].position,
            ];
            let winding = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(winding.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn sphere_bounds_match_radius() {
        let sphere = Model::uv_sphere("Hotpoint", 0.35, 16, 16, Vec3::X, Shading::Unlit);
        let bounding = sphere.bounding_sphere().unwrap();

        assert!(bounding.center.abs_diff_eq(Vec3::ZERO, 1e-4));
        assert!((bounding.radius - 0.35).abs() < 1e-4);
    }

    #[test]
    fn cuboid_faces_point_outward() {
        let cube = Model::cuboid("Placeholder", Vec3::splat(2.0), Vec3::Y, Shading::Lit);
        let primitive = &cube.primitives[0];

        assert_eq!(primitive.vertices.len(), 24);
        assert_eq!(primitive.indices.len(), 36);

        for triangle in primitive.indices.chunks_exact(3) {
            let [a, b, c] = [
                primitive.vertices[triangle[0] as usize],
                primitive.vertices[triangle[1] as usize],
                primitive.vertices[triangle[2] as usize],
            ];
            let winding = (b.position - a.position).cross(c.position - a.position);
            assert!(winding.dot(a.normal) > 0.0);
        }

        let bounds = cube.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::splat(-1.0));
        assert_eq!(bounds.max, Vec3::splat(1.0));
    }

    #[test]
    fn smooth_normals_of_flat_quad_face_up() {
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, -1.0),
        ];
        let normals = smooth_normals(&positions, &[0, 1, 2, 0, 2, 3]);

        for normal in normals {
            assert!(normal.abs_diff_eq(Vec3::Y, 1e-6));
        }
    }
}
