//! Triangle meshes and the text model loader
//!
//! Positions, texture coordinates and normals live in their own arrays. Each face
//! corner indexes into all three through parallel index arrays, so every face adds
//! exactly three entries to each of them.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{RasterError, RasterResult};
use super::image::Image;
use super::math::{Vec2, Vec3};
use super::types::Color;

/// Number of texture slots a mesh carries
pub const MAX_TEXTURES: usize = 4;

/// Well-known texture slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSlot {
    Diffuse = 0,
    Normal = 1,
    Specular = 2,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 3] = [TextureSlot::Diffuse, TextureSlot::Normal, TextureSlot::Specular];

    /// File name suffix of the companion map next to a model
    pub fn suffix(self) -> &'static str {
        match self {
            TextureSlot::Diffuse => "_diffuse",
            TextureSlot::Normal => "_nm_tangent",
            TextureSlot::Specular => "_spec",
        }
    }
}

/// Extensions probed when looking for companion maps
const TEXTURE_EXTENSIONS: [&str; 5] = ["tga", "png", "jpg", "jpeg", "bmp"];

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    normals: Vec<Vec3>,
    indices: Vec<usize>,
    tex_indices: Vec<usize>,
    normal_indices: Vec<usize>,
    textures: [Option<Image>; MAX_TEXTURES],
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model file into a fresh mesh
    pub fn load<P: AsRef<Path>>(path: P) -> RasterResult<Self> {
        let mut mesh = Self::new();
        mesh.load_model(path)?;
        Ok(mesh)
    }

    /// Parse a model file, then pick up companion texture maps next to it.
    ///
    /// A non-triangular face stops parsing and returns `MalformedFace`; everything
    /// read before it stays in the mesh.
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_model<P: AsRef<Path>>(&mut self, path: P) -> RasterResult<()> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            tracing::warn!("failed to open model {}: {}", path.display(), e);
            e
        })?;
        self.parse_model(BufReader::new(file))?;
        tracing::info!(
            "v# {} f# {} vt# {} vn# {}",
            self.vertices.len(),
            self.faces(),
            self.tex_coords.len(),
            self.normals.len()
        );
        self.load_companion_textures(path);
        Ok(())
    }

    /// Parse model records line by line. Unknown records are skipped.
    pub fn parse_model<R: BufRead>(&mut self, reader: R) -> RasterResult<()> {
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("v") => {
                    let [x, y, z] = parse_floats::<3>(parts);
                    self.vertices.push(Vec3::new(x, y, z));
                }
                Some("vn") => {
                    let [x, y, z] = parse_floats::<3>(parts);
                    self.normals.push(Vec3::new(x, y, z).normalize());
                }
                Some("vt") => {
                    let [u, v] = parse_floats::<2>(parts);
                    self.tex_coords.push(Vec2::new(u, 1.0 - v));
                }
                Some("f") => {
                    let mut corners = Vec::with_capacity(3);
                    for corner in parts {
                        match parse_corner(corner) {
                            Some(c) => corners.push(c),
                            None => break,
                        }
                    }
                    if corners.len() != 3 {
                        tracing::error!("the model is supposed to be triangulated (line {})", line_no + 1);
                        return Err(RasterError::MalformedFace {
                            line: line_no + 1,
                            corners: corners.len(),
                        });
                    }
                    for [v, t, n] in corners {
                        self.indices.push(v);
                        self.tex_indices.push(t);
                        self.normal_indices.push(n);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Look for `<stem><suffix>.<ext>` beside the model for every known slot
    fn load_companion_textures(&mut self, model_path: &Path) {
        for slot in TextureSlot::ALL {
            let image = companion_path(model_path, slot).and_then(|path| match Image::load(&path) {
                Ok(image) => {
                    tracing::info!("texture {:?} <- {}", slot, path.display());
                    Some(image)
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    None
                }
            });
            if image.is_none() {
                tracing::debug!("no {:?} map for {}", slot, model_path.display());
            }
            self.textures[slot as usize] = image;
        }
    }

    pub fn set_vertices(&mut self, vertices: Vec<Vec3>) {
        self.vertices = vertices;
    }

    pub fn set_indices(&mut self, indices: Vec<usize>) {
        self.indices = indices;
    }

    pub fn set_tex_coords(&mut self, tex_coords: Vec<Vec2>) {
        self.tex_coords = tex_coords;
    }

    pub fn set_tex_indices(&mut self, tex_indices: Vec<usize>) {
        self.tex_indices = tex_indices;
    }

    pub fn set_normals(&mut self, normals: Vec<Vec3>) {
        self.normals = normals;
    }

    pub fn set_normal_indices(&mut self, normal_indices: Vec<usize>) {
        self.normal_indices = normal_indices;
    }

    /// Attach a texture. Slots past `MAX_TEXTURES` are ignored.
    pub fn set_texture(&mut self, slot: usize, image: Option<Image>) {
        match self.textures.get_mut(slot) {
            Some(entry) => *entry = image,
            None => tracing::warn!("texture slot {} out of range", slot),
        }
    }

    pub fn texture(&self, slot: usize) -> Option<&Image> {
        self.textures.get(slot).and_then(|t| t.as_ref())
    }

    pub fn has_texture(&self, slot: TextureSlot) -> bool {
        self.texture(slot as usize).is_some()
    }

    pub fn nverts(&self) -> usize {
        self.vertices.len()
    }

    pub fn faces(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of entries in the face-corner index array
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertex(&self, i: usize) -> Vec3 {
        self.vertices.get(i).copied().unwrap_or_default()
    }

    /// Position behind face-corner entry `i`
    pub fn index_vertex(&self, i: usize) -> Vec3 {
        self.indices.get(i).map_or(Vec3::ZERO, |&v| self.vertex(v))
    }

    pub fn vertex_at(&self, face: usize, corner: usize) -> Vec3 {
        self.index_vertex(face * 3 + corner)
    }

    pub fn tex_coord(&self, i: usize) -> Vec2 {
        self.tex_coords.get(i).copied().unwrap_or_default()
    }

    pub fn index_tex_coord(&self, i: usize) -> Vec2 {
        self.tex_indices.get(i).map_or(Vec2::default(), |&t| self.tex_coord(t))
    }

    pub fn uv(&self, face: usize, corner: usize) -> Vec2 {
        self.index_tex_coord(face * 3 + corner)
    }

    pub fn vertex_normal(&self, i: usize) -> Vec3 {
        self.normals.get(i).copied().unwrap_or_default()
    }

    pub fn index_normal(&self, i: usize) -> Vec3 {
        self.normal_indices.get(i).map_or(Vec3::ZERO, |&n| self.vertex_normal(n))
    }

    pub fn normal_at(&self, face: usize, corner: usize) -> Vec3 {
        self.index_normal(face * 3 + corner)
    }

    /// Tangent-space normal from the normal map, decoded from [0, 255] to [-1, 1].
    /// Zero when there is no normal map.
    pub fn normal(&self, uv: Vec2) -> Vec3 {
        match self.texture(TextureSlot::Normal as usize) {
            Some(map) => {
                let c = map.sample(uv);
                Vec3::new(c.r as f32, c.g as f32, c.b as f32) * (2.0 / 255.0) - Vec3::ONE
            }
            None => Vec3::ZERO,
        }
    }

    /// Diffuse map color; zero when there is no diffuse map
    pub fn diffuse(&self, uv: Vec2) -> Color {
        self.texture(TextureSlot::Diffuse as usize)
            .map_or(Color::TRANSPARENT, |map| map.sample(uv))
    }

    /// Specular exponent from the first channel of the specular map
    pub fn specular(&self, uv: Vec2) -> f32 {
        self.texture(TextureSlot::Specular as usize)
            .map_or(0.0, |map| map.sample(uv).r as f32)
    }

    /// Unit cube with per-face normals and a full texture on every side
    pub fn cube() -> Self {
        let positions = vec![
            // Front face
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            // Back face
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            // Top face
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, -1.0),
            // Bottom face
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            // Right face
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            // Left face
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, -1.0),
        ];

        let normals = vec![
            Vec3::new(0.0, 0.0, 1.0),  // Front
            Vec3::new(0.0, 0.0, -1.0), // Back
            Vec3::new(0.0, 1.0, 0.0),  // Top
            Vec3::new(0.0, -1.0, 0.0), // Bottom
            Vec3::new(1.0, 0.0, 0.0),  // Right
            Vec3::new(-1.0, 0.0, 0.0), // Left
        ];

        let uvs = vec![
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];

        let mut indices = Vec::with_capacity(36);
        let mut tex_indices = Vec::with_capacity(36);
        let mut normal_indices = Vec::with_capacity(36);

        // Two triangles per face
        for face_idx in 0..6 {
            let base = face_idx * 4;
            for corner in [0, 1, 2, 0, 2, 3] {
                indices.push(base + corner);
                tex_indices.push(corner);
                normal_indices.push(face_idx);
            }
        }

        let mut mesh = Self::new();
        mesh.set_vertices(positions);
        mesh.set_tex_coords(uvs);
        mesh.set_normals(normals);
        mesh.set_indices(indices);
        mesh.set_tex_indices(tex_indices);
        mesh.set_normal_indices(normal_indices);
        mesh
    }
}

/// Read up to N floats; missing or unparsable components are zero
fn parse_floats<'a, const N: usize>(parts: impl Iterator<Item = &'a str>) -> [f32; N] {
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().unwrap_or(0.0);
    }
    out
}

/// `v/t/n` with 1-based indices, returned 0-based
fn parse_corner(corner: &str) -> Option<[usize; 3]> {
    let mut it = corner.split('/');
    let mut out = [0; 3];
    for slot in &mut out {
        *slot = it.next()?.parse::<usize>().ok()?.checked_sub(1)?;
    }
    Some(out)
}

fn companion_path(model_path: &Path, slot: TextureSlot) -> Option<PathBuf> {
    let stem = model_path.file_stem()?.to_string_lossy();
    let dir = model_path.parent().unwrap_or_else(|| Path::new(""));
    TEXTURE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}{}.{}", stem, slot.suffix(), ext)))
        .find(|p| p.is_file())
}
