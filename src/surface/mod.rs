//! Drawing surface abstraction.
//!
//! The pipeline only talks to [`DrawingSurface`]: text measurement, a small
//! set of primitives, and a canvas-style transform/clip stack. [`SvgSurface`]
//! serialises calls into an SVG document; [`RecordingSurface`] keeps them in
//! memory for inspection.

mod recording;
mod svg;

pub use recording::{DrawCommand, RecordingSurface};
pub use svg::SvgSurface;

use crate::assets::ImageAsset;
use crate::geometry::{Point, Rect};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
}

impl FontSpec {
    pub fn new(family: &str, size: f32) -> Self {
        Self {
            family: family.to_string(),
            size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Paint {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f32,
    pub dash: Option<Vec<f32>>,
}

impl Paint {
    pub fn fill(color: &str) -> Self {
        Self {
            fill: Some(color.to_string()),
            ..Default::default()
        }
    }

    pub fn stroke(color: &str, width: f32) -> Self {
        Self {
            stroke: Some(color.to_string()),
            stroke_width: width,
            ..Default::default()
        }
    }

    pub fn with_stroke(mut self, color: &str, width: f32) -> Self {
        self.stroke = Some(color.to_string());
        self.stroke_width = width;
        self
    }

    pub fn dashed(mut self, pattern: &[f32]) -> Self {
        self.dash = Some(pattern.to_vec());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextAlign {
    Start,
    Center,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStyle {
    pub font: FontSpec,
    pub color: String,
    pub align: TextAlign,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CubicTo(Point, Point, Point),
    Close,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PathData {
    pub commands: Vec<PathCommand>,
}

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(mut self, point: Point) -> Self {
        self.commands.push(PathCommand::MoveTo(point));
        self
    }

    pub fn line_to(mut self, point: Point) -> Self {
        self.commands.push(PathCommand::LineTo(point));
        self
    }

    pub fn quad_to(mut self, control: Point, end: Point) -> Self {
        self.commands.push(PathCommand::QuadTo(control, end));
        self
    }

    pub fn cubic_to(mut self, c1: Point, c2: Point, end: Point) -> Self {
        self.commands.push(PathCommand::CubicTo(c1, c2, end));
        self
    }

    pub fn close(mut self) -> Self {
        self.commands.push(PathCommand::Close);
        self
    }

    pub fn polygon(points: &[Point]) -> Self {
        let mut path = PathData::new();
        for (idx, point) in points.iter().enumerate() {
            path = if idx == 0 {
                path.move_to(*point)
            } else {
                path.line_to(*point)
            };
        }
        path.close()
    }

    pub fn to_svg_d(&self) -> String {
        let mut d = String::new();
        for command in &self.commands {
            if !d.is_empty() {
                d.push(' ');
            }
            match command {
                PathCommand::MoveTo(p) => d.push_str(&format!("M {:.2} {:.2}", p.x, p.y)),
                PathCommand::LineTo(p) => d.push_str(&format!("L {:.2} {:.2}", p.x, p.y)),
                PathCommand::QuadTo(c, p) => {
                    d.push_str(&format!("Q {:.2} {:.2} {:.2} {:.2}", c.x, c.y, p.x, p.y))
                }
                PathCommand::CubicTo(c1, c2, p) => d.push_str(&format!(
                    "C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                    c1.x, c1.y, c2.x, c2.y, p.x, p.y
                )),
                PathCommand::Close => d.push('Z'),
            }
        }
        d
    }
}

/// 2D affine transform, composed the way canvas contexts compose them: each
/// call applies to subsequently drawn geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform2D {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Transform2D {
    pub const IDENTITY: Transform2D = Transform2D {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn multiply(self, rhs: Transform2D) -> Transform2D {
        Transform2D {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            e: self.a * rhs.e + self.c * rhs.f + self.e,
            f: self.b * rhs.e + self.d * rhs.f + self.f,
        }
    }

    pub fn translate(self, dx: f32, dy: f32) -> Transform2D {
        self.multiply(Transform2D {
            e: dx,
            f: dy,
            ..Transform2D::IDENTITY
        })
    }

    pub fn scale(self, sx: f32, sy: f32) -> Transform2D {
        self.multiply(Transform2D {
            a: sx,
            d: sy,
            ..Transform2D::IDENTITY
        })
    }

    pub fn rotate(self, angle: f32) -> Transform2D {
        let (sin, cos) = angle.sin_cos();
        self.multiply(Transform2D {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        })
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.e,
            self.b * point.x + self.d * point.y + self.f,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Transform2D::IDENTITY
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Transform2D::IDENTITY
    }
}

pub trait DrawingSurface {
    fn measure_text(&mut self, text: &str, font: &FontSpec) -> TextExtent;

    /// Ratio between the surface's native pixel store and CSS pixels.
    fn backing_store_ratio(&self) -> f32 {
        1.0
    }

    /// Resize the backing store, in device pixels.
    fn resize(&mut self, width: u32, height: u32);

    fn clear(&mut self, rect: Rect);
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, dx: f32, dy: f32);
    fn scale(&mut self, sx: f32, sy: f32);
    fn rotate(&mut self, angle: f32);
    fn clip_rect(&mut self, rect: Rect);
    fn clip_circle(&mut self, center: Point, radius: f32);

    fn draw_rect(&mut self, rect: Rect, paint: &Paint);
    fn draw_circle(&mut self, center: Point, radius: f32, paint: &Paint);
    fn draw_path(&mut self, path: &PathData, paint: &Paint);
    fn draw_text(&mut self, text: &str, at: Point, style: &TextStyle);
    fn draw_image(&mut self, image: &ImageAsset, rect: Rect);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_composes_like_canvas() {
        let t = Transform2D::IDENTITY.translate(10.0, 5.0).scale(2.0, 2.0);
        assert_eq!(t.apply(Point::new(1.0, 1.0)), Point::new(12.0, 7.0));
    }

    #[test]
    fn rotation_quarter_turn() {
        let t = Transform2D::IDENTITY.rotate(std::f32::consts::FRAC_PI_2);
        let p = t.apply(Point::new(1.0, 0.0));
        assert!(p.x.abs() < 1e-6 && (p.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn path_serialises_to_svg_commands() {
        let path = PathData::new()
            .move_to(Point::new(0.0, 0.0))
            .quad_to(Point::new(5.0, 5.0), Point::new(10.0, 0.0));
        assert_eq!(path.to_svg_d(), "M 0.00 0.00 Q 5.00 5.00 10.00 0.00");
    }
}
