//! Per-frame scene painting.
//!
//! Draw order is fixed: background gradient, glowing land outline, country
//! borders (both clipped above the south gate), persistent pins, live blips.
//! Each glow stroke is one batched path stroked three times — a wide soft
//! purple pass, a medium cyan pass, then a crisp core stroke with a
//! left-to-right gradient.

use std::f64::consts::TAU;

use web_sys::CanvasRenderingContext2d;

use worldpulse_map::{BlipFrame, BlipKind, Equirectangular, LonLat};

use crate::colors::rgba_css;
use crate::world::{SOUTH_GATE_LAT, WorldState};

const BACKGROUND_CORE: &str = "#101a3c";
const BACKGROUND_NAVY: &str = "#0b1026";
const BACKGROUND_EDGE: &str = "#000000";

const GLOW_PURPLE: &str = "rgba(147,51,234,0.55)";
const GLOW_CYAN: &str = "rgba(34,211,238,0.45)";
const STROKE_PURPLE: &str = "rgba(147,51,234,0.20)";
const STROKE_CYAN: &str = "rgba(34,211,238,0.28)";
const CORE_STOP_PURPLE: &str = "#a78bfa";
const CORE_STOP_CYAN: &str = "#22d3ee";
const CORE_STOP_INDIGO: &str = "#6366f1";

struct GlowWeights {
    wide: f64,
    mid: f64,
    core: f64,
}

const LAND_WEIGHTS: GlowWeights = GlowWeights {
    wide: 5.0,
    mid: 2.6,
    core: 1.4,
};
const BORDER_WEIGHTS: GlowWeights = GlowWeights {
    wide: 3.0,
    mid: 1.6,
    core: 0.8,
};

/// Paint one frame. Mutable access is only for retiring expired blips.
pub fn draw_scene(ctx: &CanvasRenderingContext2d, state: &mut WorldState, now_ms: f64) {
    let WorldState {
        geometry,
        projection,
        centroids,
        pins,
        blips,
        width,
        height,
    } = state;
    let (w, h) = (*width, *height);

    draw_background(ctx, w, h);

    if let (Some(geometry), Some(projection)) = (geometry.as_ref(), projection.as_ref()) {
        // South gate: clip outline work above the projected −60° line to
        // keep polar projection distortion out of the scene.
        let (_, gate_y) = projection.project(0.0, SOUTH_GATE_LAT);
        ctx.save();
        ctx.begin_path();
        ctx.rect(0.0, 0.0, w, gate_y.clamp(0.0, h));
        ctx.clip();

        stroke_glow(ctx, &geometry.land.rings, projection, w, &LAND_WEIGHTS);
        stroke_glow(ctx, &geometry.borders.lines, projection, w, &BORDER_WEIGHTS);

        ctx.restore();

        for code in pins.iter() {
            if let Some((x, y)) = centroids.get(*code) {
                draw_pin(ctx, x, y);
            }
        }
    }

    for frame in blips.frames(now_ms) {
        draw_blip(ctx, &frame);
    }
}

/// Radial night-sky gradient anchored off-center, dark navy into black.
fn draw_background(ctx: &CanvasRenderingContext2d, w: f64, h: f64) {
    ctx.clear_rect(0.0, 0.0, w, h);
    let radius = w.max(h) * 1.15;
    match ctx.create_radial_gradient(w * 0.32, h * 0.30, 0.0, w * 0.32, h * 0.30, radius) {
        Ok(gradient) => {
            gradient.add_color_stop(0.0, BACKGROUND_CORE).ok();
            gradient.add_color_stop(0.55, BACKGROUND_NAVY).ok();
            gradient.add_color_stop(1.0, BACKGROUND_EDGE).ok();
            ctx.set_fill_style_canvas_gradient(&gradient);
        }
        Err(_) => ctx.set_fill_style_str(BACKGROUND_NAVY),
    }
    ctx.fill_rect(0.0, 0.0, w, h);
}

/// Build one path from all polylines and stroke it three times.
fn stroke_glow(
    ctx: &CanvasRenderingContext2d,
    lines: &[Vec<LonLat>],
    projection: &Equirectangular,
    w: f64,
    weights: &GlowWeights,
) {
    trace_lines(ctx, lines, projection);

    // Pass 1: wide soft purple halo.
    ctx.set_shadow_color(GLOW_PURPLE);
    ctx.set_shadow_blur(18.0);
    ctx.set_stroke_style_str(STROKE_PURPLE);
    ctx.set_line_width(weights.wide);
    ctx.stroke();

    // Pass 2: medium cyan bloom.
    ctx.set_shadow_color(GLOW_CYAN);
    ctx.set_shadow_blur(9.0);
    ctx.set_stroke_style_str(STROKE_CYAN);
    ctx.set_line_width(weights.mid);
    ctx.stroke();

    // Pass 3: crisp core with a left-to-right sweep.
    ctx.set_shadow_color("transparent");
    ctx.set_shadow_blur(0.0);
    let gradient = ctx.create_linear_gradient(0.0, 0.0, w, 0.0);
    gradient.add_color_stop(0.0, CORE_STOP_PURPLE).ok();
    gradient.add_color_stop(0.5, CORE_STOP_CYAN).ok();
    gradient.add_color_stop(1.0, CORE_STOP_INDIGO).ok();
    ctx.set_stroke_style_canvas_gradient(&gradient);
    ctx.set_line_width(weights.core);
    ctx.stroke();
}

fn trace_lines(ctx: &CanvasRenderingContext2d, lines: &[Vec<LonLat>], projection: &Equirectangular) {
    ctx.begin_path();
    for line in lines {
        let mut first = true;
        for &(lon, lat) in line {
            let (x, y) = projection.project(lon, lat);
            if first {
                ctx.move_to(x, y);
                first = false;
            } else {
                ctx.line_to(x, y);
            }
        }
    }
}

/// A pinned country: small glowing dot plus a subtle outer ring.
fn draw_pin(ctx: &CanvasRenderingContext2d, x: f64, y: f64) {
    ctx.set_shadow_color(GLOW_CYAN);
    ctx.set_shadow_blur(8.0);
    ctx.set_fill_style_str("rgba(165,243,252,0.95)");
    ctx.begin_path();
    ctx.arc(x, y, 3.0, 0.0, TAU).ok();
    ctx.fill();

    ctx.set_shadow_color("transparent");
    ctx.set_shadow_blur(0.0);
    ctx.set_stroke_style_str("rgba(103,232,249,0.35)");
    ctx.set_line_width(1.0);
    ctx.begin_path();
    ctx.arc(x, y, 7.0, 0.0, TAU).ok();
    ctx.stroke();
}

fn draw_blip(ctx: &CanvasRenderingContext2d, frame: &BlipFrame) {
    match frame.kind {
        BlipKind::New => {
            ctx.set_shadow_color(GLOW_CYAN);
            ctx.set_shadow_blur(14.0);
            ctx.set_fill_style_str(&rgba_css(34, 211, 238, frame.opacity));
            ctx.begin_path();
            ctx.arc(frame.x, frame.y, frame.radius, 0.0, TAU).ok();
            ctx.fill();
        }
        BlipKind::Repeat => {
            ctx.set_stroke_style_str(&rgba_css(167, 139, 250, frame.opacity));
            ctx.set_line_width(2.0);
            ctx.begin_path();
            ctx.arc(frame.x, frame.y, frame.radius, 0.0, TAU).ok();
            ctx.stroke();
        }
    }
    ctx.set_shadow_color("transparent");
    ctx.set_shadow_blur(0.0);
}
