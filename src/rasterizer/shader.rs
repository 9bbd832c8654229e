//! Programmable shader stages
//!
//! The renderer runs `vertex` once per primitive corner and `fragment` once per
//! covered pixel. A shader caches per-corner attributes in its vertex stage and
//! blends them by the barycentric weights handed to the fragment stage.
//!
//! `fragment` only borrows the shader immutably, so the pixel scan of a single
//! triangle can fan out across threads.

use std::sync::Arc;

use super::math::{Mat4, Vec2, Vec3, Vec4};
use super::mesh::{Mesh, TextureSlot};
use super::types::PrimitiveMode;

/// What the engine is about to feed through the vertex stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexInput {
    pub mode: PrimitiveMode,
    /// Primitive number within the draw call
    pub primitive: usize,
    /// Vertex within the primitive (0..3 for triangles)
    pub corner: usize,
    /// Raw vertex index for array draws, face-corner entry for indexed draws
    pub index: usize,
    pub indexed: bool,
}

impl VertexInput {
    pub fn uv(&self, mesh: &Mesh) -> Vec2 {
        if self.indexed {
            mesh.index_tex_coord(self.index)
        } else {
            mesh.tex_coord(self.index)
        }
    }

    pub fn normal(&self, mesh: &Mesh) -> Vec3 {
        if self.indexed {
            mesh.index_normal(self.index)
        } else {
            mesh.vertex_normal(self.index)
        }
    }
}

pub trait Shader: Sync {
    /// Map a model-space position to clip space, caching whatever the fragment
    /// stage needs under `input.corner`.
    fn vertex(&mut self, input: &VertexInput, position: Vec3) -> Vec4;

    /// Color for the given barycentric weights, RGBA in [0, 1].
    /// `None` discards the fragment.
    fn fragment(&self, bar: Vec3) -> Option<Vec4>;
}

fn blend4(bar: Vec3, c: &[Vec4; 3]) -> Vec4 {
    c[0] * bar.x + c[1] * bar.y + c[2] * bar.z
}

/// Blends three fixed corner colors
#[derive(Debug, Clone)]
pub struct FlatShader {
    pub transform: Mat4,
    pub colors: [Vec4; 3],
}

impl FlatShader {
    pub fn new(colors: [Vec4; 3]) -> Self {
        Self { transform: Mat4::IDENTITY, colors }
    }

    /// Same color on every corner
    pub fn solid(color: Vec4) -> Self {
        Self::new([color; 3])
    }
}

impl Shader for FlatShader {
    fn vertex(&mut self, _input: &VertexInput, position: Vec3) -> Vec4 {
        self.transform * Vec4::from_vec3(position, 1.0)
    }

    fn fragment(&self, bar: Vec3) -> Option<Vec4> {
        Some(blend4(bar, &self.colors))
    }
}

/// Interpolates UVs and samples the mesh's diffuse map
#[derive(Debug, Clone)]
pub struct TextureShader {
    pub mesh: Arc<Mesh>,
    pub transform: Mat4,
    uvs: [Vec2; 3],
}

impl TextureShader {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            mesh,
            transform: Mat4::IDENTITY,
            uvs: [Vec2::default(); 3],
        }
    }
}

impl Shader for TextureShader {
    fn vertex(&mut self, input: &VertexInput, position: Vec3) -> Vec4 {
        self.uvs[input.corner] = input.uv(&self.mesh);
        self.transform * Vec4::from_vec3(position, 1.0)
    }

    fn fragment(&self, bar: Vec3) -> Option<Vec4> {
        let uv = Vec2::blend(bar, self.uvs[0], self.uvs[1], self.uvs[2]);
        Some(self.mesh.diffuse(uv).to_vec4())
    }
}

/// Ambient plus Lambertian diffuse under one directional light.
///
/// Albedo comes from the diffuse map when the mesh has one, `base_color`
/// otherwise. A normal map replaces the interpolated vertex normal, and a
/// specular map adds a highlight.
#[derive(Debug, Clone)]
pub struct LitShader {
    pub mesh: Arc<Mesh>,
    /// Model to world
    pub model: Mat4,
    /// World to clip
    pub view_projection: Mat4,
    pub eye: Vec3,
    /// Direction toward the light, world space
    pub light_dir: Vec3,
    pub light_color: Vec3,
    pub ambient: f32,
    pub base_color: Vec4,
    uvs: [Vec2; 3],
    normals: [Vec3; 3],
    positions: [Vec3; 3],
}

impl LitShader {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            mesh,
            model: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            eye: Vec3::new(0.0, 0.0, 3.0),
            light_dir: Vec3::new(1.0, 1.0, 1.0).normalize(),
            light_color: Vec3::ONE,
            ambient: 0.2,
            base_color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            uvs: [Vec2::default(); 3],
            normals: [Vec3::ZERO; 3],
            positions: [Vec3::ZERO; 3],
        }
    }

    /// Bend `n` by the normal map using the triangle's tangent frame
    fn perturb(&self, n: Vec3, uv: Vec2) -> Vec3 {
        let e1 = self.positions[1] - self.positions[0];
        let e2 = self.positions[2] - self.positions[0];
        let (du1, dv1) = (self.uvs[1].x - self.uvs[0].x, self.uvs[1].y - self.uvs[0].y);
        let (du2, dv2) = (self.uvs[2].x - self.uvs[0].x, self.uvs[2].y - self.uvs[0].y);
        let det = du1 * dv2 - du2 * dv1;
        if det.abs() < 1e-8 {
            return n;
        }
        let r = 1.0 / det;
        let t = (e1 * dv2 - e2 * dv1) * r;
        let b = (e2 * du1 - e1 * du2) * r;
        let t = (t - n * n.dot(t)).normalize();
        let b = (b - n * n.dot(b) - t * t.dot(b)).normalize();

        let m = self.mesh.normal(uv);
        (t * m.x + b * m.y + n * m.z).normalize()
    }
}

impl Shader for LitShader {
    fn vertex(&mut self, input: &VertexInput, position: Vec3) -> Vec4 {
        let world = self.model * Vec4::from_vec3(position, 1.0);
        self.uvs[input.corner] = input.uv(&self.mesh);
        self.normals[input.corner] = self.model.transform_dir(input.normal(&self.mesh)).normalize();
        self.positions[input.corner] = world.xyz();
        self.view_projection * world
    }

    fn fragment(&self, bar: Vec3) -> Option<Vec4> {
        let uv = Vec2::blend(bar, self.uvs[0], self.uvs[1], self.uvs[2]);
        let mut n = Vec3::blend(bar, self.normals[0], self.normals[1], self.normals[2]).normalize();
        if self.mesh.has_texture(TextureSlot::Normal) {
            n = self.perturb(n, uv);
        }

        let l = self.light_dir.normalize();
        let diffuse = n.dot(l).max(0.0);

        let specular = if self.mesh.has_texture(TextureSlot::Specular) {
            let p = Vec3::blend(bar, self.positions[0], self.positions[1], self.positions[2]);
            let v = (self.eye - p).normalize();
            let r = (n * (2.0 * n.dot(l)) - l).normalize();
            0.6 * r.dot(v).max(0.0).powf(5.0 + self.mesh.specular(uv))
        } else {
            0.0
        };

        let albedo = if self.mesh.has_texture(TextureSlot::Diffuse) {
            self.mesh.diffuse(uv).to_vec4()
        } else {
            self.base_color
        };

        let lit = albedo.xyz().mul_elem(self.light_color) * (self.ambient + diffuse + specular);
        Some(Vec4::from_vec3(lit, albedo.w))
    }
}
