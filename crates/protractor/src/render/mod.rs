use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};
use tracing::debug;

use crate::{
    config::RenderConfig,
    error::{AngleError, Result},
    types::{AnnotatedFrame, Contour, Point, RawFrame},
};

const LABEL_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Font height in pixels at label scale 1.0
const LABEL_PX_PER_SCALE: f32 = 30.0;

/// Draws the measurement overlay onto a copy of the frame
#[derive(Debug, Clone, Default)]
pub struct ResultRenderer {
    config: RenderConfig,
}

impl ResultRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Label text for an angle, rounded to one decimal
    pub fn label(&self, angle_degrees: f64) -> String {
        format!("{}{:.1}", self.config.label_prefix, angle_degrees)
    }

    /// Contour outline, a filled marker per vertex and the angle label.
    ///
    /// The input frame is only read; the result carries its stride and row
    /// padding.
    pub fn render(
        &self,
        frame: &RawFrame<'_>,
        contour: &Contour,
        vertices: &[Point],
        angle_degrees: f64,
    ) -> Result<AnnotatedFrame> {
        let font = label_font()?;
        let mut canvas = frame.to_bgr_image()?;
        let cfg = &self.config;

        draw_closed_polyline(
            &mut canvas,
            &contour.points,
            cfg.contour_thickness,
            Rgb(cfg.contour_color),
        );

        for vertex in vertices {
            draw_filled_circle_mut(
                &mut canvas,
                (vertex.x, vertex.y),
                cfg.vertex_radius,
                Rgb(cfg.vertex_color),
            );
        }

        let label = self.label(angle_degrees);
        draw_label(
            &mut canvas,
            &font,
            &label,
            (cfg.label_origin[0], cfg.label_origin[1]),
            cfg.label_scale,
            cfg.label_thickness,
            Rgb(cfg.label_color),
        );

        debug!(
            contour_points = contour.len(),
            vertices = vertices.len(),
            %label,
            "rendered overlay"
        );

        AnnotatedFrame::with_pixels(frame, &canvas)
    }
}

fn label_font() -> Result<FontRef<'static>> {
    FontRef::try_from_slice(LABEL_FONT)
        .map_err(|err| AngleError::ImageProcessing(format!("label font: {err}")))
}

/// Offsets that widen a one-pixel stroke to `thickness` pixels
fn stroke_offsets(thickness: u32) -> impl Iterator<Item = (i32, i32)> {
    let thickness = thickness.max(1) as i32;
    let lo = -(thickness - 1) / 2;
    let hi = thickness / 2;
    (lo..=hi).flat_map(move |dy| (lo..=hi).map(move |dx| (dx, dy)))
}

/// Text with the left end of its baseline at `origin`
fn draw_label(
    image: &mut RgbImage,
    font: &FontRef<'_>,
    text: &str,
    origin: (i32, i32),
    scale: f32,
    thickness: u32,
    color: Rgb<u8>,
) {
    let px = PxScale::from(scale * LABEL_PX_PER_SCALE);
    // draw_text_mut positions the top of the line, the baseline sits one ascent below
    let top = origin.1 - font.as_scaled(px).ascent().round() as i32;

    for (dx, dy) in stroke_offsets(thickness) {
        draw_text_mut(image, color, origin.0 + dx, top + dy, px, font, text);
    }
}

/// Line segment drawn `thickness` pixels wide by repeating it at offsets
fn draw_thick_line(
    image: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    thickness: u32,
    color: Rgb<u8>,
) {
    for (dx, dy) in stroke_offsets(thickness) {
        let (dx, dy) = (dx as f32, dy as f32);
        draw_line_segment_mut(
            image,
            (start.0 + dx, start.1 + dy),
            (end.0 + dx, end.1 + dy),
            color,
        );
    }
}

fn draw_closed_polyline(image: &mut RgbImage, points: &[Point], thickness: u32, color: Rgb<u8>) {
    let n = points.len();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        draw_thick_line(
            image,
            (a.x as f32, a.y as f32),
            (b.x as f32, b.y as f32),
            thickness,
            color,
        );
    }
}
