use super::{DrawingSurface, FontSpec, Paint, PathData, TextExtent, TextStyle, Transform2D};
use crate::assets::ImageAsset;
use crate::geometry::{Point, Rect};
use crate::text_metrics::fallback_text_width;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawCommand {
    Resize { width: u32, height: u32 },
    Clear(Rect),
    Save,
    Restore,
    Translate(f32, f32),
    Scale(f32, f32),
    Rotate(f32),
    ClipRect(Rect),
    ClipCircle { center: Point, radius: f32 },
    Rect { rect: Rect, paint: Paint, transform: Transform2D },
    Circle { center: Point, radius: f32, paint: Paint, transform: Transform2D },
    Path { path: PathData, paint: Paint, transform: Transform2D },
    Text { text: String, at: Point, style: TextStyle, transform: Transform2D },
    Image { mime_type: String, rect: Rect, transform: Transform2D },
}

/// In-memory surface: logs every call and measures text with the
/// deterministic fallback table, so tests never depend on installed fonts.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    backing_store_ratio: f32,
    size: (u32, u32),
    transform: Transform2D,
    stack: Vec<Transform2D>,
    commands: Vec<DrawCommand>,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            backing_store_ratio: 1.0,
            size: (0, 0),
            transform: Transform2D::IDENTITY,
            stack: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn with_backing_store_ratio(mut self, ratio: f32) -> Self {
        self.backing_store_ratio = ratio;
        self
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn transform(&self) -> Transform2D {
        self.transform
    }

    pub fn circles(&self) -> impl Iterator<Item = (Point, f32)> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Circle { center, radius, .. } => Some((*center, *radius)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl DrawingSurface for RecordingSurface {
    fn measure_text(&mut self, text: &str, font: &FontSpec) -> TextExtent {
        TextExtent {
            width: fallback_text_width(text, font.size),
            height: font.size,
        }
    }

    fn backing_store_ratio(&self) -> f32 {
        self.backing_store_ratio
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.commands.push(DrawCommand::Resize { width, height });
    }

    fn clear(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::Clear(rect));
    }

    fn save(&mut self) {
        self.stack.push(self.transform);
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        if let Some(transform) = self.stack.pop() {
            self.transform = transform;
        }
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.transform = self.transform.translate(dx, dy);
        self.commands.push(DrawCommand::Translate(dx, dy));
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.transform = self.transform.scale(sx, sy);
        self.commands.push(DrawCommand::Scale(sx, sy));
    }

    fn rotate(&mut self, angle: f32) {
        self.transform = self.transform.rotate(angle);
        self.commands.push(DrawCommand::Rotate(angle));
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::ClipRect(rect));
    }

    fn clip_circle(&mut self, center: Point, radius: f32) {
        self.commands.push(DrawCommand::ClipCircle { center, radius });
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.commands.push(DrawCommand::Rect {
            rect,
            paint: paint.clone(),
            transform: self.transform,
        });
    }

    fn draw_circle(&mut self, center: Point, radius: f32, paint: &Paint) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            paint: paint.clone(),
            transform: self.transform,
        });
    }

    fn draw_path(&mut self, path: &PathData, paint: &Paint) {
        self.commands.push(DrawCommand::Path {
            path: path.clone(),
            paint: paint.clone(),
            transform: self.transform,
        });
    }

    fn draw_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            at,
            style: style.clone(),
            transform: self.transform,
        });
    }

    fn draw_image(&mut self, image: &ImageAsset, rect: Rect) {
        self.commands.push(DrawCommand::Image {
            mime_type: image.mime_type.clone(),
            rect,
            transform: self.transform,
        });
    }
}
