use super::{DrawingSurface, FontSpec, Paint, PathData, TextAlign, TextExtent, TextStyle, Transform2D};
use crate::assets::ImageAsset;
use crate::geometry::{Point, Rect};
use crate::text_metrics::{fallback_text_width, measure_text_width};

#[derive(Debug, Clone, Default)]
struct SurfaceState {
    transform: Transform2D,
    clips: Vec<String>,
}

/// Surface that serialises draw calls into a standalone SVG document.
///
/// Every element carries the current transform as a `matrix(...)`; clip
/// regions become `<clipPath>` definitions in absolute coordinates so nested
/// groups never need their own transform.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    width: u32,
    height: u32,
    fast_metrics: bool,
    state: SurfaceState,
    stack: Vec<SurfaceState>,
    defs: String,
    body: String,
    clip_counter: usize,
}

impl SvgSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            fast_metrics: false,
            state: SurfaceState::default(),
            stack: Vec::new(),
            defs: String::new(),
            body: String::new(),
            clip_counter: 0,
        }
    }

    /// Skip font database lookups and measure with the built-in width table.
    pub fn with_fast_metrics(mut self, fast: bool) -> Self {
        self.fast_metrics = fast;
        self
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
            w = self.width,
            h = self.height
        ));
        if !self.defs.is_empty() {
            svg.push_str("<defs>");
            svg.push_str(&self.defs);
            svg.push_str("</defs>");
        }
        svg.push_str(&self.body);
        svg.push_str("</svg>");
        svg
    }

    fn push_element(&mut self, element: String) {
        for clip in &self.state.clips {
            self.body.push_str(&format!("<g clip-path=\"url(#{clip})\">"));
        }
        self.body.push_str(&element);
        for _ in &self.state.clips {
            self.body.push_str("</g>");
        }
    }

    fn push_clip(&mut self, shape: String) {
        self.clip_counter += 1;
        let id = format!("clip{}", self.clip_counter);
        self.defs.push_str(&format!(
            "<clipPath id=\"{id}\" clipPathUnits=\"userSpaceOnUse\">{shape}</clipPath>"
        ));
        self.state.clips.push(id);
    }

    fn transform_attr(&self) -> String {
        transform_attr(&self.state.transform)
    }
}

impl DrawingSurface for SvgSurface {
    fn measure_text(&mut self, text: &str, font: &FontSpec) -> TextExtent {
        let width = if self.fast_metrics {
            fallback_text_width(text, font.size)
        } else {
            measure_text_width(text, font.size, &font.family)
                .unwrap_or_else(|| fallback_text_width(text, font.size))
        };
        TextExtent {
            width,
            height: font.size,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// A vector document cannot erase pixels, so clearing drops everything
    /// recorded so far. The transform stack is left untouched.
    fn clear(&mut self, _rect: Rect) {
        self.body.clear();
        self.defs.clear();
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.state.transform = self.state.transform.translate(dx, dy);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.state.transform = self.state.transform.scale(sx, sy);
    }

    fn rotate(&mut self, angle: f32) {
        self.state.transform = self.state.transform.rotate(angle);
    }

    fn clip_rect(&mut self, rect: Rect) {
        let shape = format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\"{}/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            self.transform_attr()
        );
        self.push_clip(shape);
    }

    fn clip_circle(&mut self, center: Point, radius: f32) {
        let shape = format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\"{}/>",
            center.x,
            center.y,
            radius,
            self.transform_attr()
        );
        self.push_clip(shape);
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        let element = format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\"{}{}/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            paint_attrs(paint),
            self.transform_attr()
        );
        self.push_element(element);
    }

    fn draw_circle(&mut self, center: Point, radius: f32, paint: &Paint) {
        let element = format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\"{}{}/>",
            center.x,
            center.y,
            radius.max(0.0),
            paint_attrs(paint),
            self.transform_attr()
        );
        self.push_element(element);
    }

    fn draw_path(&mut self, path: &PathData, paint: &Paint) {
        if path.commands.is_empty() {
            return;
        }
        let element = format!(
            "<path d=\"{}\"{}{}/>",
            path.to_svg_d(),
            paint_attrs(paint),
            self.transform_attr()
        );
        self.push_element(element);
    }

    fn draw_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        if text.is_empty() {
            return;
        }
        let anchor = match style.align {
            TextAlign::Start => "start",
            TextAlign::Center => "middle",
        };
        let element = format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\" text-anchor=\"{anchor}\" dominant-baseline=\"central\"{}>{}</text>",
            at.x,
            at.y,
            escape_xml(&style.font.family),
            style.font.size,
            escape_xml(&style.color),
            self.transform_attr(),
            escape_xml(text)
        );
        self.push_element(element);
    }

    fn draw_image(&mut self, image: &ImageAsset, rect: Rect) {
        let element = format!(
            "<image href=\"{}\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" preserveAspectRatio=\"xMidYMid slice\"{}/>",
            image.data_uri(),
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            self.transform_attr()
        );
        self.push_element(element);
    }
}

fn transform_attr(transform: &Transform2D) -> String {
    if transform.is_identity() {
        return String::new();
    }
    format!(
        " transform=\"matrix({:.4} {:.4} {:.4} {:.4} {:.2} {:.2})\"",
        transform.a, transform.b, transform.c, transform.d, transform.e, transform.f
    )
}

fn paint_attrs(paint: &Paint) -> String {
    let mut attrs = String::new();
    match &paint.fill {
        Some(fill) => attrs.push_str(&format!(" fill=\"{}\"", escape_xml(fill))),
        None => attrs.push_str(" fill=\"none\""),
    }
    if let Some(stroke) = &paint.stroke {
        attrs.push_str(&format!(
            " stroke=\"{}\" stroke-width=\"{}\"",
            escape_xml(stroke),
            paint.stroke_width
        ));
    }
    if let Some(dash) = &paint.dash {
        let pattern: Vec<String> = dash.iter().map(|v| format!("{v}")).collect();
        attrs.push_str(&format!(" stroke-dasharray=\"{}\"", pattern.join(" ")));
    }
    attrs
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transformed_elements_carry_matrix() {
        let mut surface = SvgSurface::new(100, 100);
        surface.save();
        surface.scale(2.0, 2.0);
        surface.draw_circle(Point::new(5.0, 5.0), 3.0, &Paint::fill("#fff"));
        surface.restore();
        surface.draw_circle(Point::new(5.0, 5.0), 3.0, &Paint::fill("#fff"));
        let svg = surface.to_svg();
        assert_eq!(svg.matches("matrix(2.0000").count(), 1);
        assert_eq!(svg.matches("<circle").count(), 2);
    }

    #[test]
    fn text_is_escaped() {
        let mut surface = SvgSurface::new(100, 100).with_fast_metrics(true);
        let style = TextStyle {
            font: FontSpec::new("sans-serif", 12.0),
            color: "#000".to_string(),
            align: TextAlign::Center,
        };
        surface.draw_text("a<b & c", Point::new(0.0, 0.0), &style);
        assert!(surface.to_svg().contains("a&lt;b &amp; c"));
    }

    #[test]
    fn clip_wraps_elements_until_restore() {
        let mut surface = SvgSurface::new(50, 50);
        surface.save();
        surface.clip_circle(Point::new(10.0, 10.0), 5.0);
        surface.draw_rect(Rect::new(0.0, 0.0, 20.0, 20.0), &Paint::fill("red"));
        surface.restore();
        surface.draw_rect(Rect::new(0.0, 0.0, 20.0, 20.0), &Paint::fill("blue"));
        let svg = surface.to_svg();
        assert!(svg.contains("<clipPath id=\"clip1\""));
        assert_eq!(svg.matches("clip-path=").count(), 1);
    }

    #[test]
    fn clear_discards_recorded_content() {
        let mut surface = SvgSurface::new(50, 50);
        surface.draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &Paint::fill("red"));
        surface.clear(Rect::new(0.0, 0.0, 50.0, 50.0));
        assert!(!surface.to_svg().contains("<rect"));
    }
}
