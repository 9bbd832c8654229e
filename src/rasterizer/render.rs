//! Draw calls: primitive assembly, rasterization and depth testing
//!
//! A draw call runs the vertex stage per corner, divides by w, applies the
//! viewport transform and then walks the pixels of each point, line or triangle.
//! Triangles are depth tested against a per-target depth buffer; points and
//! lines are written unconditionally.

use std::sync::Arc;

use rayon::prelude::*;

use super::image::Image;
use super::math::{barycentric, barycentric_line, Mat4, Vec2, Vec3, Vec4};
use super::mesh::Mesh;
use super::shader::{Shader, VertexInput};
use super::types::{Color, PrimitiveMode};

/// Nearest depth seen so far for every pixel of a target
#[derive(Debug, Clone, Default)]
pub struct DepthBuffer {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl DepthBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![f32::INFINITY; width * height],
        }
    }

    pub fn reset(&mut self) {
        self.values.fill(f32::INFINITY);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Stored depth; +infinity for coordinates outside the buffer
    pub fn get(&self, x: i32, y: i32) -> f32 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return f32::INFINITY;
        }
        self.values[y as usize * self.width + x as usize]
    }

    fn set(&mut self, x: i32, y: i32, z: f32) {
        self.values[y as usize * self.width + x as usize] = z;
    }
}

/// Orbit camera around a target point
#[derive(Debug, Clone)]
pub struct Camera {
    pub target: Vec3,
    pub distance: f32,
    pub rotation_x: f32, // Pitch
    pub rotation_y: f32, // Yaw
}

impl Camera {
    pub fn new(distance: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            distance,
            rotation_x: 0.0,
            rotation_y: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        let (sp, cp) = self.rotation_x.sin_cos();
        let (sy, cy) = self.rotation_y.sin_cos();
        self.target + Vec3::new(cp * sy, sp, cp * cy) * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position(), self.target, Vec3::UP)
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.rotation_y += dy;
        self.rotation_x = (self.rotation_x + dx).clamp(
            -std::f32::consts::FRAC_PI_2 + 0.01,
            std::f32::consts::FRAC_PI_2 - 0.01,
        );
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(3.0)
    }
}

/// Screen coordinates are clamped to this range before stepping
const LINE_COORD_LIMIT: i64 = i32::MAX as i64;

/// Pixels of the segment p0-p1 using integer Bresenham stepping.
///
/// Endpoints are rounded to the nearest pixel. The result runs from p0 to p1 and
/// holds `max(|dx|, |dy|) + 1` points. A non-finite endpoint yields no points.
pub fn line_points(p0: Vec2, p1: Vec2) -> Vec<(i32, i32)> {
    walk_line(p0, p1, None)
}

/// The points of `line_points(p0, p1)` that lie inside a `width` x `height`
/// target, in the same order. Only the on-target span is walked.
pub fn line_points_clipped(p0: Vec2, p1: Vec2, width: usize, height: usize) -> Vec<(i32, i32)> {
    walk_line(p0, p1, Some((width as i64, height as i64)))
}

fn round_coord(v: f32) -> i64 {
    (v.round() as i64).clamp(-LINE_COORD_LIMIT, LINE_COORD_LIMIT)
}

/// Minor-axis steps taken before the `k`-th point of a walk with slope `derror2 / 2dx`
fn minor_steps(k: i64, derror2: i64, dx: i64) -> i64 {
    if dx == 0 {
        return 0;
    }
    // Smallest n with k * derror2 - 2 * dx * n <= dx
    let num = k as i128 * derror2 as i128 - dx as i128;
    let den = 2 * dx as i128;
    (-(-num).div_euclid(den)) as i64
}

fn walk_line(p0: Vec2, p1: Vec2, clip: Option<(i64, i64)>) -> Vec<(i32, i32)> {
    if !(p0.x.is_finite() && p0.y.is_finite() && p1.x.is_finite() && p1.y.is_finite()) {
        return Vec::new();
    }
    let (mut x0, mut y0) = (round_coord(p0.x), round_coord(p0.y));
    let (mut x1, mut y1) = (round_coord(p1.x), round_coord(p1.y));

    let steep = (x0 - x1).abs() < (y0 - y1).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    let reversed = x0 > x1;
    if reversed {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    // Major-axis span to walk and the minor-axis extent to keep
    let (first, last, minor_len) = match clip {
        None => (x0, x1, None),
        Some((w, h)) => {
            let (major_len, minor_len) = if steep { (h, w) } else { (w, h) };
            (x0.max(0), x1.min(major_len - 1), Some(minor_len))
        }
    };
    if first > last {
        return Vec::new();
    }

    let dx = x1 - x0;
    let dy = y1 - y0;
    let derror2 = dy.abs() * 2;
    let step = if y1 > y0 { 1 } else { -1 };

    // Resume the error term at the first walked column
    let skipped = first - x0;
    let taken = minor_steps(skipped, derror2, dx);
    let mut y = y0 + step * taken;
    let mut error2 = (skipped as i128 * derror2 as i128 - 2 * dx as i128 * taken as i128) as i64;

    let mut pts = Vec::with_capacity((last - first + 1) as usize);
    for x in first..=last {
        if minor_len.map_or(true, |len| y >= 0 && y < len) {
            let (x, y) = (x as i32, y as i32);
            pts.push(if steep { (y, x) } else { (x, y) });
        }
        error2 += derror2;
        if error2 > dx {
            y += step;
            error2 -= dx * 2;
        }
    }

    if reversed {
        pts.reverse();
    }
    pts
}

/// Screen-space corner after the vertex stage
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    xy: Vec2,
    z: f32,
}

/// Renders a shared mesh into caller-owned images
pub struct Renderer {
    mesh: Arc<Mesh>,
    viewport: Mat4,
    depth: DepthBuffer,
    parallel: bool,
}

impl Renderer {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            mesh,
            viewport: Mat4::IDENTITY,
            depth: DepthBuffer::default(),
            parallel: false,
        }
    }

    pub fn set_viewport(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.viewport = Mat4::viewport(x, y, w, h);
    }

    pub fn viewport(&self) -> Mat4 {
        self.viewport
    }

    pub fn set_mesh(&mut self, mesh: Arc<Mesh>) {
        self.mesh = mesh;
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    /// Shade triangle rows on the rayon pool
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }

    /// Zero the target and reset every depth cell to +infinity
    pub fn clear(&mut self, frame: &mut Image) {
        frame.clear();
        if self.depth.width() != frame.width() || self.depth.height() != frame.height() {
            self.depth = DepthBuffer::new(frame.width(), frame.height());
        } else {
            self.depth.reset();
        }
    }

    /// Draw `count` vertices taken from the mesh's vertex array starting at `start`
    pub fn draw_array<S: Shader + ?Sized>(
        &mut self,
        frame: &mut Image,
        shader: &mut S,
        mode: PrimitiveMode,
        start: usize,
        count: usize,
    ) {
        self.draw_primitives(frame, shader, mode, start, count, false);
    }

    /// Draw `count` face-corner entries starting at entry `start`
    pub fn draw_indexed<S: Shader + ?Sized>(
        &mut self,
        frame: &mut Image,
        shader: &mut S,
        mode: PrimitiveMode,
        start: usize,
        count: usize,
    ) {
        self.draw_primitives(frame, shader, mode, start, count, true);
    }

    fn draw_primitives<S: Shader + ?Sized>(
        &mut self,
        frame: &mut Image,
        shader: &mut S,
        mode: PrimitiveMode,
        start: usize,
        count: usize,
        indexed: bool,
    ) {
        if self.depth.width() != frame.width() || self.depth.height() != frame.height() {
            self.depth = DepthBuffer::new(frame.width(), frame.height());
        }

        let per_primitive = mode.vertex_count();
        let mesh = Arc::clone(&self.mesh);
        for primitive in 0..count / per_primitive {
            let mut corners = [ScreenVertex { xy: Vec2::default(), z: 0.0 }; 3];
            for (corner, slot) in corners.iter_mut().enumerate().take(per_primitive) {
                let index = start + primitive * per_primitive + corner;
                let input = VertexInput { mode, primitive, corner, index, indexed };
                let position = if indexed { mesh.index_vertex(index) } else { mesh.vertex(index) };
                *slot = self.to_screen(shader, &input, position);
            }

            match mode {
                PrimitiveMode::Point => self.draw_point(frame, &*shader, corners[0]),
                PrimitiveMode::Line => self.draw_line(frame, &*shader, [corners[0], corners[1]]),
                PrimitiveMode::Triangle => self.draw_triangle(frame, &*shader, corners),
            }
        }
    }

    /// Vertex stage, perspective divide, viewport transform
    fn to_screen<S: Shader + ?Sized>(&self, shader: &mut S, input: &VertexInput, position: Vec3) -> ScreenVertex {
        let ndc = shader.vertex(input, position).perspective_divide();
        let screen = self.viewport * Vec4::from_vec3(ndc, 1.0);
        ScreenVertex {
            xy: Vec2::new(screen.x, screen.y),
            z: screen.z,
        }
    }

    fn draw_point<S: Shader + ?Sized>(&self, frame: &mut Image, shader: &S, p: ScreenVertex) {
        if !(p.xy.x.is_finite() && p.xy.y.is_finite()) {
            return;
        }
        let (x, y) = (p.xy.x.round() as i32, p.xy.y.round() as i32);
        if !frame.contains(x, y) {
            return;
        }
        if let Some(c) = shader.fragment(Vec3::new(1.0, 0.0, 0.0)) {
            frame.set_pixel(x, y, Color::from_vec4(c));
        }
    }

    fn draw_line<S: Shader + ?Sized>(&self, frame: &mut Image, shader: &S, ends: [ScreenVertex; 2]) {
        let (a, b) = (ends[0].xy, ends[1].xy);
        for (x, y) in line_points_clipped(a, b, frame.width(), frame.height()) {
            let bar = barycentric_line(a, b, Vec2::new(x as f32, y as f32));
            if let Some(c) = shader.fragment(bar) {
                frame.set_pixel(x, y, Color::from_vec4(c));
            }
        }
    }

    fn draw_triangle<S: Shader + ?Sized>(&mut self, frame: &mut Image, shader: &S, tri: [ScreenVertex; 3]) {
        if frame.width() == 0 || frame.height() == 0 {
            return;
        }
        let pts = [tri[0].xy, tri[1].xy, tri[2].xy];

        // Bounding box clamped to the target
        let min_x = pts[0].x.min(pts[1].x).min(pts[2].x).floor().max(0.0) as i32;
        let max_x = pts[0].x.max(pts[1].x).max(pts[2].x).ceil().min(frame.width() as f32 - 1.0) as i32;
        let min_y = pts[0].y.min(pts[1].y).min(pts[2].y).floor().max(0.0) as i32;
        let max_y = pts[0].y.max(pts[1].y).max(pts[2].y).ceil().min(frame.height() as f32 - 1.0) as i32;
        if min_x > max_x || min_y > max_y {
            return;
        }

        let depth = &self.depth;
        let scan_row = |y: i32| -> Vec<(i32, f32, Color)> {
            let mut out = Vec::new();
            for x in min_x..=max_x {
                let bc = barycentric(pts, Vec2::new(x as f32, y as f32));
                if !(bc.x >= 0.0 && bc.y >= 0.0 && bc.z >= 0.0) {
                    continue;
                }
                let z = bc.x * tri[0].z + bc.y * tri[1].z + bc.z * tri[2].z;
                // NaN depth never passes
                if !(z < depth.get(x, y)) {
                    continue;
                }
                if let Some(c) = shader.fragment(bc) {
                    out.push((x, z, Color::from_vec4(c)));
                }
            }
            out
        };

        // Rows touch disjoint pixels; shading fans out, writes stay in row order
        let rows: Vec<(i32, Vec<(i32, f32, Color)>)> = if self.parallel {
            (min_y..max_y + 1).into_par_iter().map(|y| (y, scan_row(y))).collect()
        } else {
            (min_y..max_y + 1).map(|y| (y, scan_row(y))).collect()
        };

        for (y, fragments) in rows {
            for (x, z, color) in fragments {
                self.depth.set(x, y, z);
                frame.set_pixel(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use crate::rasterizer::{FlatShader, PixelFormat};

    const W: usize = 32;
    const H: usize = 24;

    fn target() -> (Renderer, Image) {
        let mut renderer = Renderer::new(Arc::new(Mesh::new()));
        renderer.set_viewport(0, 0, W as i32, H as i32);
        let mut frame = Image::new(W, H, PixelFormat::Rgba);
        renderer.clear(&mut frame);
        (renderer, frame)
    }

    /// Flat triangle in NDC at depth `z`
    fn triangle_mesh(z: f32) -> Arc<Mesh> {
        let mut mesh = Mesh::new();
        mesh.set_vertices(vec![
            Vec3::new(-0.8, -0.8, z),
            Vec3::new(0.8, -0.8, z),
            Vec3::new(0.0, 0.8, z),
        ]);
        mesh.set_indices(vec![0, 1, 2]);
        Arc::new(mesh)
    }

    fn solid(c: Color) -> FlatShader {
        FlatShader::solid(c.to_vec4())
    }

    fn written(frame: &Image) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for y in 0..frame.height() as i32 {
            for x in 0..frame.width() as i32 {
                if frame.pixel(x, y) != Color::TRANSPARENT {
                    out.push((x, y));
                }
            }
        }
        out
    }

    /// Records the weights of every fragment it shades
    struct Recorder {
        inner: FlatShader,
        seen: Mutex<Vec<Vec3>>,
    }

    impl Shader for Recorder {
        fn vertex(&mut self, input: &VertexInput, position: Vec3) -> Vec4 {
            self.inner.vertex(input, position)
        }

        fn fragment(&self, bar: Vec3) -> Option<Vec4> {
            self.seen.lock().unwrap().push(bar);
            self.inner.fragment(bar)
        }
    }

    struct DiscardAll;

    impl Shader for DiscardAll {
        fn vertex(&mut self, _input: &VertexInput, position: Vec3) -> Vec4 {
            Vec4::from_vec3(position, 1.0)
        }

        fn fragment(&self, _bar: Vec3) -> Option<Vec4> {
            None
        }
    }

    #[test]
    fn test_line_points_properties() {
        let cases = [
            ((0.0, 0.0), (10.0, 3.0)),
            ((10.0, 3.0), (0.0, 0.0)),
            ((2.0, 1.0), (5.0, 17.0)),
            ((5.0, 17.0), (2.0, 1.0)),
            ((4.0, 4.0), (4.0, 4.0)),
            ((0.0, 9.0), (9.0, 0.0)),
            ((3.0, -2.0), (-6.0, 7.0)),
        ];
        for ((x0, y0), (x1, y1)) in cases {
            let pts = line_points(Vec2::new(x0, y0), Vec2::new(x1, y1));
            let dx = (x1 - x0).abs() as usize;
            let dy = (y1 - y0).abs() as usize;
            assert_eq!(pts.len(), dx.max(dy) + 1);
            assert_eq!(pts[0], (x0 as i32, y0 as i32));
            assert_eq!(*pts.last().unwrap(), (x1 as i32, y1 as i32));
            for w in pts.windows(2) {
                let (ax, ay) = w[0];
                let (bx, by) = w[1];
                assert!((ax - bx).abs() <= 1 && (ay - by).abs() <= 1);
                assert!((ax, ay) != (bx, by));
            }
        }
    }

    #[test]
    fn test_line_points_round_endpoints() {
        let pts = line_points(Vec2::new(0.4, 0.6), Vec2::new(4.6, 1.4));
        assert_eq!(pts[0], (0, 1));
        assert_eq!(*pts.last().unwrap(), (5, 1));
    }

    #[test]
    fn test_triangle_weights_and_bounds() {
        let (mut renderer, mut frame) = target();
        renderer.set_mesh(triangle_mesh(0.0));
        let mut shader = Recorder {
            inner: solid(Color::WHITE),
            seen: Mutex::new(Vec::new()),
        };
        renderer.draw_indexed(&mut frame, &mut shader, PrimitiveMode::Triangle, 0, 3);

        let seen = shader.seen.into_inner().unwrap();
        assert!(!seen.is_empty());
        for bar in seen {
            assert!(bar.x >= 0.0 && bar.y >= 0.0 && bar.z >= 0.0);
            assert!((bar.x + bar.y + bar.z - 1.0).abs() < 1e-4);
        }

        // NDC [-0.8, 0.8] maps to x in [3.2, 28.8], y in [2.4, 21.6]
        for (x, y) in written(&frame) {
            assert!((3..=29).contains(&x), "x = {}", x);
            assert!((2..=22).contains(&y), "y = {}", y);
        }
    }

    #[test]
    fn test_draw_array_and_indexed_agree() {
        let (mut renderer, mut a) = target();
        renderer.set_mesh(triangle_mesh(0.0));
        renderer.draw_array(&mut a, &mut solid(Color::RED), PrimitiveMode::Triangle, 0, 3);

        let mut b = Image::new(W, H, PixelFormat::Rgba);
        renderer.clear(&mut b);
        renderer.draw_indexed(&mut b, &mut solid(Color::RED), PrimitiveMode::Triangle, 0, 3);
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_nearer_triangle_wins_in_either_order() {
        let near = triangle_mesh(-0.5);
        let far = triangle_mesh(0.5);

        let (mut renderer, mut frame) = target();
        renderer.set_mesh(far.clone());
        renderer.draw_array(&mut frame, &mut solid(Color::RED), PrimitiveMode::Triangle, 0, 3);
        renderer.set_mesh(near.clone());
        renderer.draw_array(&mut frame, &mut solid(Color::GREEN), PrimitiveMode::Triangle, 0, 3);
        let covered = written(&frame);
        assert!(!covered.is_empty());
        assert!(covered.iter().all(|&(x, y)| frame.pixel(x, y) == Color::GREEN));

        renderer.clear(&mut frame);
        renderer.set_mesh(near);
        renderer.draw_array(&mut frame, &mut solid(Color::GREEN), PrimitiveMode::Triangle, 0, 3);
        renderer.set_mesh(far);
        renderer.draw_array(&mut frame, &mut solid(Color::RED), PrimitiveMode::Triangle, 0, 3);
        assert!(covered.iter().all(|&(x, y)| frame.pixel(x, y) == Color::GREEN));
    }

    #[test]
    fn test_depth_buffer_keeps_nearest() {
        let (mut renderer, mut frame) = target();
        renderer.set_mesh(triangle_mesh(0.25));
        renderer.draw_array(&mut frame, &mut solid(Color::RED), PrimitiveMode::Triangle, 0, 3);
        let (cx, cy) = (W as i32 / 2, H as i32 / 2);
        assert!((renderer.depth().get(cx, cy) - 0.25).abs() < 1e-5);

        renderer.set_mesh(triangle_mesh(0.75));
        renderer.draw_array(&mut frame, &mut solid(Color::BLUE), PrimitiveMode::Triangle, 0, 3);
        assert!((renderer.depth().get(cx, cy) - 0.25).abs() < 1e-5);
        assert!(renderer.depth().get(0, 0).is_infinite());
    }

    #[test]
    fn test_discarded_fragments_leave_target_untouched() {
        let (mut renderer, mut frame) = target();
        renderer.set_mesh(triangle_mesh(0.0));
        renderer.draw_array(&mut frame, &mut DiscardAll, PrimitiveMode::Triangle, 0, 3);
        assert!(written(&frame).is_empty());
        assert!(renderer.depth().get(W as i32 / 2, H as i32 / 2).is_infinite());
    }

    #[test]
    fn test_redraw_after_clear_is_deterministic() {
        let (mut renderer, mut frame) = target();
        renderer.set_mesh(Arc::new(Mesh::cube()));
        let mut shader = FlatShader::new([
            Vec4::new(1.0, 0.0, 0.0, 1.0),
            Vec4::new(0.0, 1.0, 0.0, 1.0),
            Vec4::new(0.0, 0.0, 1.0, 1.0),
        ]);
        shader.transform = Mat4::perspective(1.0, W as f32 / H as f32, 0.1, 10.0)
            * Mat4::translation(Vec3::new(0.0, 0.0, -4.0))
            * Mat4::rotation_y(0.6);

        let count = renderer.mesh().index_count();
        renderer.draw_indexed(&mut frame, &mut shader, PrimitiveMode::Triangle, 0, count);
        let first = frame.data().to_vec();

        renderer.clear(&mut frame);
        renderer.draw_indexed(&mut frame, &mut shader, PrimitiveMode::Triangle, 0, count);
        assert_eq!(first, frame.data());

        let mut fresh = Image::new(W, H, PixelFormat::Rgba);
        let mut other = Renderer::new(Arc::new(Mesh::cube()));
        other.set_viewport(0, 0, W as i32, H as i32);
        other.draw_indexed(&mut fresh, &mut shader, PrimitiveMode::Triangle, 0, count);
        assert_eq!(first, fresh.data());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (mut renderer, mut serial) = target();
        renderer.set_mesh(Arc::new(Mesh::cube()));
        let mut shader = solid(Color::WHITE);
        shader.transform = Mat4::perspective(1.0, W as f32 / H as f32, 0.1, 10.0)
            * Mat4::translation(Vec3::new(0.0, 0.0, -4.0))
            * Mat4::rotation_y(0.3);
        shader.colors[1] = Vec4::new(0.2, 0.4, 0.6, 1.0);
        let count = renderer.mesh().index_count();
        renderer.draw_indexed(&mut serial, &mut shader, PrimitiveMode::Triangle, 0, count);

        let mut parallel = Image::new(W, H, PixelFormat::Rgba);
        renderer.clear(&mut parallel);
        renderer.set_parallel(true);
        renderer.draw_indexed(&mut parallel, &mut shader, PrimitiveMode::Triangle, 0, count);
        assert_eq!(serial.data(), parallel.data());
    }

    #[test]
    fn test_degenerate_triangle_draws_nothing() {
        let (mut renderer, mut frame) = target();
        let mut mesh = Mesh::new();
        mesh.set_vertices(vec![
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.5, 0.5, 0.0),
        ]);
        renderer.set_mesh(Arc::new(mesh));
        renderer.draw_array(&mut frame, &mut solid(Color::WHITE), PrimitiveMode::Triangle, 0, 3);
        assert!(written(&frame).is_empty());
    }

    #[test]
    fn test_line_and_point_primitives() {
        let (mut renderer, mut frame) = target();
        let mut mesh = Mesh::new();
        // NDC endpoints map to pixels (0, 12) and (16, 12)
        mesh.set_vertices(vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.0)]);
        renderer.set_mesh(Arc::new(mesh));

        let mut shader = FlatShader::new([
            Vec4::new(1.0, 0.0, 0.0, 1.0),
            Vec4::new(0.0, 0.0, 1.0, 1.0),
            Vec4::new(0.0, 0.0, 0.0, 1.0),
        ]);
        renderer.draw_array(&mut frame, &mut shader, PrimitiveMode::Line, 0, 2);
        assert_eq!(written(&frame).len(), 17);
        assert_eq!(frame.pixel(0, 12), Color::RED);
        assert_eq!(frame.pixel(16, 12), Color::BLUE);

        renderer.clear(&mut frame);
        renderer.draw_array(&mut frame, &mut shader, PrimitiveMode::Point, 1, 1);
        assert_eq!(written(&frame), vec![(16, 12)]);
        assert_eq!(frame.pixel(16, 12), Color::RED);
    }

    #[test]
    fn test_offscreen_point_is_skipped() {
        let (mut renderer, mut frame) = target();
        let mut mesh = Mesh::new();
        mesh.set_vertices(vec![Vec3::new(3.0, 3.0, 0.0)]);
        renderer.set_mesh(Arc::new(mesh));
        renderer.draw_array(&mut frame, &mut solid(Color::WHITE), PrimitiveMode::Point, 0, 1);
        assert!(written(&frame).is_empty());
    }

    /// Sends the last corner of every primitive to w ~ 0
    struct NearPlaneCorner;

    impl Shader for NearPlaneCorner {
        fn vertex(&mut self, input: &VertexInput, position: Vec3) -> Vec4 {
            if input.corner == 2 {
                Vec4::new(0.5, 0.5, 0.0, 1e-39)
            } else {
                Vec4::from_vec3(position, 1.0)
            }
        }

        fn fragment(&self, _bar: Vec3) -> Option<Vec4> {
            Some(Vec4::new(1.0, 1.0, 1.0, 1.0))
        }
    }

    #[test]
    fn test_non_finite_corner_writes_nothing() {
        for parallel in [false, true] {
            let (mut renderer, mut frame) = target();
            renderer.set_parallel(parallel);
            let mut mesh = Mesh::new();
            mesh.set_vertices(vec![
                Vec3::new(-0.9, -0.9, 0.0),
                Vec3::new(-0.7, -0.9, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
            ]);
            renderer.set_mesh(Arc::new(mesh));
            renderer.draw_array(&mut frame, &mut NearPlaneCorner, PrimitiveMode::Triangle, 0, 3);

            assert!(written(&frame).is_empty());
            for y in 0..H as i32 {
                for x in 0..W as i32 {
                    assert_eq!(renderer.depth().get(x, y), f32::INFINITY);
                }
            }

            // A regular triangle drawn afterwards still depth tests normally
            renderer.set_mesh(triangle_mesh(0.5));
            renderer.draw_array(&mut frame, &mut solid(Color::RED), PrimitiveMode::Triangle, 0, 3);
            renderer.set_mesh(triangle_mesh(0.9));
            renderer.draw_array(&mut frame, &mut solid(Color::BLUE), PrimitiveMode::Triangle, 0, 3);
            assert_eq!(frame.pixel(W as i32 / 2, H as i32 / 2), Color::RED);
        }
    }

    #[test]
    fn test_clipped_line_matches_full_walk() {
        let cases = [
            ((-20.0, -5.0), (50.0, 40.0)),
            ((50.0, 40.0), (-20.0, -5.0)),
            ((10.0, -30.0), (14.0, 60.0)),
            ((40.0, 3.0), (-9.0, 20.0)),
            ((5.0, 5.0), (20.0, 10.0)),
        ];
        for ((x0, y0), (x1, y1)) in cases {
            let (a, b) = (Vec2::new(x0, y0), Vec2::new(x1, y1));
            let full: Vec<_> = line_points(a, b)
                .into_iter()
                .filter(|&(x, y)| x >= 0 && y >= 0 && x < W as i32 && y < H as i32)
                .collect();
            assert_eq!(line_points_clipped(a, b, W, H), full);
        }
    }

    #[test]
    fn test_far_off_line_endpoints() {
        let pts = line_points_clipped(Vec2::new(-1e10, 3.0), Vec2::new(1e10, 3.0), W, H);
        assert_eq!(pts, (0..W as i32).map(|x| (x, 3)).collect::<Vec<_>>());

        let pts = line_points_clipped(Vec2::new(1e10, 1e10), Vec2::new(-1e10, -1e10), W, H);
        assert_eq!(pts, (0..H as i32).rev().map(|i| (i, i)).collect::<Vec<_>>());

        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(line_points(Vec2::new(bad, 0.0), Vec2::new(4.0, 4.0)).is_empty());
            assert!(line_points_clipped(Vec2::new(0.0, 0.0), Vec2::new(4.0, bad), W, H).is_empty());
        }
    }

    #[test]
    fn test_far_off_line_primitive_draws_visible_span() {
        let (mut renderer, mut frame) = target();
        let mut mesh = Mesh::new();
        mesh.set_vertices(vec![Vec3::new(-1e6, 0.0, 0.0), Vec3::new(1e6, 0.0, 0.0)]);
        renderer.set_mesh(Arc::new(mesh));
        renderer.draw_array(&mut frame, &mut solid(Color::WHITE), PrimitiveMode::Line, 0, 2);
        let row = H as i32 / 2;
        assert_eq!(written(&frame), (0..W as i32).map(|x| (x, row)).collect::<Vec<_>>());
    }

    #[test]
    fn test_non_finite_point_is_skipped() {
        let (mut renderer, mut frame) = target();
        let mut mesh = Mesh::new();
        mesh.set_vertices(vec![Vec3::new(f32::NAN, 0.0, 0.0)]);
        renderer.set_mesh(Arc::new(mesh));
        renderer.draw_array(&mut frame, &mut solid(Color::WHITE), PrimitiveMode::Point, 0, 1);
        assert!(written(&frame).is_empty());
    }

    #[test]
    fn test_depth_read_outside_is_infinite() {
        let depth = DepthBuffer::new(4, 3);
        assert_eq!(depth.get(-1, 0), f32::INFINITY);
        assert_eq!(depth.get(4, 0), f32::INFINITY);
        assert_eq!(depth.get(0, 3), f32::INFINITY);
        assert_eq!(DepthBuffer::default().get(0, 0), f32::INFINITY);
    }

    #[test]
    fn test_camera_orbit_distance() {
        let mut camera = Camera::new(5.0);
        camera.rotate(0.4, 1.2);
        assert!((camera.position().len() - 5.0).abs() < 1e-4);
        camera.rotate(10.0, 0.0);
        assert!(camera.rotation_x < std::f32::consts::FRAC_PI_2);
    }
}
