//! Frame driver
//!
//! Owns the mesh, the renderer and the configured shader. Each frame it builds
//! the model, view and projection matrices and hands them to the shader before
//! issuing one indexed draw over the whole mesh.

use std::sync::Arc;

use crate::config::{RenderConfig, ShaderKind};
use crate::rasterizer::{
    Camera, FlatShader, Image, LitShader, Mat4, Mesh, PrimitiveMode, Renderer, Shader,
    TextureShader, Vec4,
};

/// The shader variants a scene can bind
pub enum SceneShader {
    Flat(FlatShader),
    Textured(TextureShader),
    Lit(LitShader),
}

impl SceneShader {
    fn build(kind: ShaderKind, mesh: &Arc<Mesh>, config: &RenderConfig) -> Self {
        match kind {
            ShaderKind::Flat => SceneShader::Flat(FlatShader::new([
                Vec4::new(1.0, 0.2, 0.2, 1.0),
                Vec4::new(0.2, 1.0, 0.2, 1.0),
                Vec4::new(0.2, 0.2, 1.0, 1.0),
            ])),
            ShaderKind::Textured => SceneShader::Textured(TextureShader::new(Arc::clone(mesh))),
            ShaderKind::Lit => {
                let mut lit = LitShader::new(Arc::clone(mesh));
                lit.light_dir = config.light_dir.normalize();
                lit.light_color = config.light_color;
                lit.ambient = config.ambient;
                lit.base_color = Vec4::from_vec3(config.base_color, 1.0);
                SceneShader::Lit(lit)
            }
        }
    }

    /// Hand this frame's transforms to the shader
    fn bind(&mut self, model: Mat4, view_projection: Mat4, camera: &Camera) -> &mut dyn Shader {
        match self {
            SceneShader::Flat(s) => {
                s.transform = view_projection * model;
                s
            }
            SceneShader::Textured(s) => {
                s.transform = view_projection * model;
                s
            }
            SceneShader::Lit(s) => {
                s.model = model;
                s.view_projection = view_projection;
                s.eye = camera.position();
                s
            }
        }
    }
}

pub struct Scene {
    config: RenderConfig,
    renderer: Renderer,
    shader: SceneShader,
    pub camera: Camera,
}

impl Scene {
    /// Build a scene from config, loading the model if one is named.
    ///
    /// A model that fails to load is logged and rendered with whatever was
    /// parsed before the failure.
    pub fn new(config: RenderConfig) -> Self {
        let mesh = match &config.model {
            Some(path) => {
                let mut mesh = Mesh::new();
                if let Err(e) = mesh.load_model(path) {
                    tracing::error!("model {}: {}", path.display(), e);
                }
                mesh
            }
            None => Mesh::cube(),
        };
        Self::with_mesh(config, Arc::new(mesh))
    }

    pub fn with_mesh(config: RenderConfig, mesh: Arc<Mesh>) -> Self {
        let shader = SceneShader::build(config.shader, &mesh, &config);
        let mut renderer = Renderer::new(mesh);
        renderer.set_viewport(0, 0, config.width as i32, config.height as i32);
        renderer.set_parallel(config.parallel);

        let mut camera = Camera::new(config.camera.distance);
        camera.rotation_x = config.camera.pitch;

        Self { config, renderer, shader, camera }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        self.renderer.mesh()
    }

    /// Blank render target matching the config
    pub fn new_target(&self) -> Image {
        Image::new(self.config.width, self.config.height, self.config.format)
    }

    /// Clear `frame` and draw the mesh as seen at `time` seconds
    #[tracing::instrument(skip(self, frame))]
    pub fn render_frame(&mut self, frame: &mut Image, time: f32) {
        let (w, h) = (frame.width(), frame.height());
        self.renderer.clear(frame);
        self.renderer.set_viewport(0, 0, w as i32, h as i32);

        let cam = &self.config.camera;
        let aspect = if h == 0 { 1.0 } else { w as f32 / h as f32 };
        let projection = Mat4::perspective(cam.fov_degrees.to_radians(), aspect, cam.near, cam.far);
        let view_projection = projection * self.camera.view_matrix();
        let model = Mat4::rotation_y(time * self.config.spin_speed);

        let count = self.renderer.mesh().index_count();
        let shader = self.shader.bind(model, view_projection, &self.camera);
        self.renderer.draw_indexed(frame, shader, PrimitiveMode::Triangle, 0, count);
        tracing::trace!("drew {} faces", count / 3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{Color, PixelFormat, TextureSlot};

    fn small(shader: ShaderKind) -> RenderConfig {
        RenderConfig {
            width: 48,
            height: 36,
            shader,
            ..RenderConfig::default()
        }
    }

    fn lit_pixels(frame: &Image) -> usize {
        let mut n = 0;
        for y in 0..frame.height() as i32 {
            for x in 0..frame.width() as i32 {
                if frame.pixel(x, y) != Color::TRANSPARENT {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn test_cube_renders_with_flat_and_lit() {
        for kind in [ShaderKind::Flat, ShaderKind::Lit] {
            let mut scene = Scene::new(small(kind));
            let mut frame = scene.new_target();
            scene.render_frame(&mut frame, 0.5);
            assert!(lit_pixels(&frame) > 100, "{:?} drew too little", kind);
        }
    }

    #[test]
    fn test_textured_cube_uses_diffuse_map() {
        let mut texture = Image::new(2, 2, PixelFormat::Rgba);
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            texture.set_pixel(x, y, Color::GREEN);
        }
        let mut mesh = Mesh::cube();
        mesh.set_texture(TextureSlot::Diffuse as usize, Some(texture));

        let mut scene = Scene::with_mesh(small(ShaderKind::Textured), Arc::new(mesh));
        let mut frame = scene.new_target();
        scene.render_frame(&mut frame, 0.0);
        assert_eq!(frame.pixel(24, 18), Color::GREEN);
    }

    #[test]
    fn test_frames_are_repeatable() {
        let mut scene = Scene::new(small(ShaderKind::Lit));
        let mut frame = scene.new_target();
        scene.render_frame(&mut frame, 1.25);
        let first = frame.data().to_vec();
        scene.render_frame(&mut frame, 3.0);
        scene.render_frame(&mut frame, 1.25);
        assert_eq!(first, frame.data());
    }

    #[test]
    fn test_missing_model_renders_nothing() {
        let config = RenderConfig {
            model: Some("/no/such/model.obj".into()),
            ..small(ShaderKind::Lit)
        };
        let mut scene = Scene::new(config);
        assert_eq!(scene.mesh().faces(), 0);
        let mut frame = scene.new_target();
        scene.render_frame(&mut frame, 0.0);
        assert_eq!(lit_pixels(&frame), 0);
    }
}
