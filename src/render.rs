use crate::geometry::{Point, Rect};
use crate::layout::{NodeImage, RoutedBundle, Viewport, VisualGraph, VisualNode};
use crate::surface::{DrawingSurface, FontSpec, Paint, PathData, SvgSurface, TextAlign, TextStyle};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

// ── Decoration constants ─────────────────────────────────────────────

/// Gap between a node's border and its selection ring.
const SELECTION_RING_GAP: f32 = 3.0;
const SELECTION_RING_WIDTH: f32 = 2.0;
const PLACEHOLDER_RING_RATIO: f32 = 0.6;
const PLACEHOLDER_DASH: [f32; 2] = [4.0, 3.0];
/// Guides are skipped when they would be denser than this per axis.
const MAX_GUIDE_LINES: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Background fill and grid guides.
    Background,
    Relationships,
    Nodes,
    /// Rubber-band rectangle of an in-progress marquee selection.
    Marquee,
}

/// Ordered list of layers drawn back to front.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Background, relationships, nodes: nodes occlude relationship stubs.
    pub fn standard() -> Self {
        let mut stack = Self::new();
        stack.register(Layer::Background);
        stack.register(Layer::Relationships);
        stack.register(Layer::Nodes);
        stack
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Append `layer` on top. Registering a layer twice is a no-op.
    pub fn register(&mut self, layer: Layer) {
        if !self.layers.contains(&layer) {
            self.layers.push(layer);
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn contains(&self, layer: Layer) -> bool {
        self.layers.contains(&layer)
    }
}

/// Transient state drawn on top of the derived graph.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Overlay {
    /// Marquee rectangle in graph coordinates.
    pub marquee: Option<Rect>,
}

impl VisualGraph {
    /// Draw the standard layers.
    pub fn draw(&self, surface: &mut dyn DrawingSurface, viewport: &Viewport, theme: &Theme) {
        self.draw_layers(surface, viewport, theme, &LayerStack::standard(), &Overlay::default());
    }

    pub fn draw_layers(
        &self,
        surface: &mut dyn DrawingSurface,
        viewport: &Viewport,
        theme: &Theme,
        layers: &LayerStack,
        overlay: &Overlay,
    ) {
        let canvas = Rect::new(0.0, 0.0, viewport.width, viewport.height);
        surface.clear(canvas);
        for layer in layers.layers() {
            match layer {
                Layer::Background => self.draw_background(surface, viewport, canvas),
                Layer::Relationships => with_viewport(surface, viewport, |surface| {
                    for bundle in self.bundles() {
                        bundle.draw(surface, theme);
                    }
                }),
                Layer::Nodes => with_viewport(surface, viewport, |surface| {
                    for node in self.nodes() {
                        node.draw(surface, theme);
                    }
                }),
                Layer::Marquee => {
                    if let Some(rect) = overlay.marquee {
                        with_viewport(surface, viewport, |surface| {
                            let paint = Paint::fill(&theme.marquee_fill)
                                .with_stroke(&theme.marquee_stroke, 1.0 / viewport.zoom);
                            surface.draw_rect(rect, &paint);
                        });
                    }
                }
            }
        }
    }

    fn draw_background(&self, surface: &mut dyn DrawingSurface, viewport: &Viewport, canvas: Rect) {
        surface.draw_rect(canvas, &Paint::fill(&self.background));
        let spacing = self.guide_spacing;
        if spacing <= 0.0 || !spacing.is_finite() {
            return;
        }
        let visible = viewport.visible_graph_rect();
        let first_x = (visible.x / spacing).floor() * spacing;
        let first_y = (visible.y / spacing).floor() * spacing;
        let (Some(columns), Some(rows)) = (
            guide_count(first_x, visible.right(), spacing),
            guide_count(first_y, visible.bottom(), spacing),
        ) else {
            return;
        };
        with_viewport(surface, viewport, |surface| {
            let paint = Paint::stroke(&self.guide_color, 1.0 / viewport.zoom);
            let mut path = PathData::new();
            for i in 0..=columns {
                let x = first_x + i as f32 * spacing;
                path = path
                    .move_to(Point::new(x, visible.y))
                    .line_to(Point::new(x, visible.bottom()));
            }
            for i in 0..=rows {
                let y = first_y + i as f32 * spacing;
                path = path
                    .move_to(Point::new(visible.x, y))
                    .line_to(Point::new(visible.right(), y));
            }
            surface.draw_path(&path, &paint);
        });
    }
}

/// Number of spacing steps from `first` to `last`, or `None` when the span is
/// not finite or would need more than `MAX_GUIDE_LINES` lines.
fn guide_count(first: f32, last: f32, spacing: f32) -> Option<usize> {
    let steps = ((last - first) / spacing).floor();
    if !steps.is_finite() || steps < 0.0 || steps >= MAX_GUIDE_LINES as f32 {
        return None;
    }
    Some(steps as usize)
}

fn with_viewport(
    surface: &mut dyn DrawingSurface,
    viewport: &Viewport,
    draw: impl FnOnce(&mut dyn DrawingSurface),
) {
    surface.save();
    surface.translate(viewport.pan.x, viewport.pan.y);
    surface.scale(viewport.zoom, viewport.zoom);
    draw(surface);
    surface.restore();
}

impl RoutedBundle {
    /// Draw in graph coordinates; the caller applies the viewport transform.
    pub fn draw(&self, surface: &mut dyn DrawingSurface, theme: &Theme) {
        for route in &self.routes {
            let relationship = &route.relationship;
            let (color, width) = if relationship.selected {
                (theme.selection_color.as_str(), relationship.style.width + 1.0)
            } else {
                (relationship.style.color.as_str(), relationship.style.width)
            };
            surface.draw_path(&route.shaft.to_path(), &Paint::stroke(color, width));
            surface.draw_path(&PathData::polygon(&route.arrowhead), &Paint::fill(color));

            if let Some(label) = &route.label {
                let style = TextStyle {
                    font: FontSpec::new(&theme.font_family, relationship.style.type_font_size),
                    color: relationship.style.type_color.clone(),
                    align: TextAlign::Center,
                };
                surface.save();
                surface.translate(label.position.x, label.position.y);
                surface.rotate(label.angle);
                surface.draw_text(&label.text, Point::ORIGIN, &style);
                surface.restore();
            }
        }
    }
}

impl VisualNode {
    pub fn draw(&self, surface: &mut dyn DrawingSurface, theme: &Theme) {
        let style = &self.style;
        let body = Paint::fill(&style.fill).with_stroke(&style.border_color, style.border_width);
        surface.draw_circle(self.position, self.radius, &body);

        match &self.image {
            Some(NodeImage::Ready(image)) => {
                let inner = (self.radius - style.border_width / 2.0).max(0.0);
                surface.save();
                surface.clip_circle(self.position, inner);
                surface.draw_image(
                    image,
                    Rect::new(
                        self.position.x - inner,
                        self.position.y - inner,
                        inner * 2.0,
                        inner * 2.0,
                    ),
                );
                surface.restore();
            }
            Some(NodeImage::Placeholder { .. }) => {
                let paint = Paint::stroke(&theme.placeholder_color, 1.0).dashed(&PLACEHOLDER_DASH);
                surface.draw_circle(self.position, self.radius * PLACEHOLDER_RING_RATIO, &paint);
            }
            None => {}
        }

        let ring = if self.editing {
            Some(theme.editing_color.as_str())
        } else if self.selected {
            Some(theme.selection_color.as_str())
        } else {
            None
        };
        if let Some(color) = ring {
            let radius = self.radius + style.border_width / 2.0 + SELECTION_RING_GAP;
            surface.draw_circle(self.position, radius, &Paint::stroke(color, SELECTION_RING_WIDTH));
        }

        if self.caption.is_blank() {
            return;
        }
        let text_style = TextStyle {
            font: FontSpec::new(&theme.font_family, self.caption.font_size),
            color: style.caption_color.clone(),
            align: TextAlign::Center,
        };
        let top = self.position.y - self.caption.height / 2.0;
        for (idx, line) in self.caption.lines.iter().enumerate() {
            let y = top + self.caption.line_height * (idx as f32 + 0.5);
            surface.draw_text(line, Point::new(self.position.x, y), &text_style);
        }
    }
}

/// Viewport of the given size that shows the whole graph, centred, never
/// magnified past 1:1.
pub fn fit_viewport(visual: &VisualGraph, width: f32, height: f32, margin: f32) -> Viewport {
    let mut viewport = Viewport::new(width, height);
    let Some(bounds) = visual.bounds() else {
        return viewport;
    };
    let bounds = bounds.with_padding(margin);
    let zoom_x = width / bounds.width.max(1.0);
    let zoom_y = height / bounds.height.max(1.0);
    viewport.zoom = zoom_x
        .min(zoom_y)
        .clamp(crate::layout::MIN_ZOOM, 1.0);
    let center = Point::new(bounds.x + bounds.width / 2.0, bounds.y + bounds.height / 2.0);
    viewport.pan = Point::new(width / 2.0, height / 2.0) - center * viewport.zoom;
    viewport
}

pub fn render_svg(visual: &VisualGraph, theme: &Theme, viewport: &Viewport) -> String {
    let mut surface = SvgSurface::new(
        viewport.width.ceil().max(1.0) as u32,
        viewport.height.ceil().max(1.0) as u32,
    );
    visual.draw(&mut surface, viewport, theme);
    surface.to_svg()
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, font_family: &str) -> Result<()> {
    let mut opt = usvg::Options::default();
    if let Some(primary) = font_family.split(',').next() {
        opt.font_family = primary.trim().trim_matches('"').to_string();
    }
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}
