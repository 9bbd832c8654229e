//! Viewer: renders a scene every frame and blits it to a window
//!
//! Usage: `bonnie-raster [config.ron]`
//! Arrow keys orbit the camera, S dumps the current frame to `frame.png`,
//! Escape quits.

use bonnie_raster::config::{load_config, RenderConfig};
use bonnie_raster::rasterizer::{Image, PixelFormat};
use bonnie_raster::scene::Scene;
use bonnie_raster::VERSION;
use macroquad::prelude::*;

const ORBIT_SPEED: f32 = 1.5;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Bonnie Raster v{}", VERSION),
        window_width: bonnie_raster::rasterizer::WIDTH as i32 * 3,
        window_height: bonnie_raster::rasterizer::HEIGHT as i32 * 3,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

/// Config from the first argument, defaults otherwise
fn startup_config() -> RenderConfig {
    let Some(path) = std::env::args().nth(1) else {
        return RenderConfig::default();
    };
    match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load {}: {}, using defaults", path, e);
            RenderConfig::default()
        }
    }
}

/// RGBA copy of the frame for upload; other layouts are converted per pixel
fn to_rgba(frame: &Image) -> Vec<u8> {
    if frame.format() == PixelFormat::Rgba {
        return frame.data().to_vec();
    }
    let mut out = Vec::with_capacity(frame.width() * frame.height() * 4);
    let flip = frame.flip_vertical();
    for row in 0..frame.height() as i32 {
        let y = if flip { frame.height() as i32 - 1 - row } else { row };
        for x in 0..frame.width() as i32 {
            out.extend_from_slice(&frame.pixel(x, y).to_bytes());
        }
    }
    out
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut scene = Scene::new(startup_config());
    let mut frame = scene.new_target();
    let (w, h) = (frame.width() as u16, frame.height() as u16);

    tracing::info!("=== Bonnie Raster v{} ===", VERSION);

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        let dt = get_frame_time();
        let mut pitch = 0.0;
        let mut yaw = 0.0;
        if is_key_down(KeyCode::Left) {
            yaw -= ORBIT_SPEED * dt;
        }
        if is_key_down(KeyCode::Right) {
            yaw += ORBIT_SPEED * dt;
        }
        if is_key_down(KeyCode::Up) {
            pitch += ORBIT_SPEED * dt;
        }
        if is_key_down(KeyCode::Down) {
            pitch -= ORBIT_SPEED * dt;
        }
        scene.camera.rotate(pitch, yaw);

        scene.render_frame(&mut frame, get_time() as f32);

        if is_key_pressed(KeyCode::S) {
            match frame.save("frame.png") {
                Ok(()) => tracing::info!("saved frame.png"),
                Err(e) => tracing::error!("{}", e),
            }
        }

        clear_background(Color::from_rgba(30, 30, 35, 255));

        // Convert framebuffer to texture and draw it letterboxed
        let texture = Texture2D::from_rgba8(w, h, &to_rgba(&frame));
        texture.set_filter(FilterMode::Nearest);

        let scale = (screen_width() / w as f32).min(screen_height() / h as f32);
        let (draw_w, draw_h) = (w as f32 * scale, h as f32 * scale);
        draw_texture_ex(
            &texture,
            (screen_width() - draw_w) / 2.0,
            (screen_height() - draw_h) / 2.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(Vec2::new(draw_w, draw_h)),
                ..Default::default()
            },
        );

        draw_text(&format!("{} fps", get_fps()), 8.0, 20.0, 20.0, GRAY);

        next_frame().await
    }
}
