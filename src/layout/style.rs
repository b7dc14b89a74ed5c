use crate::config::LayoutConfig;
use crate::ir::{Node, Relationship, Style};
use crate::theme::Theme;

use super::{ResolvedNodeStyle, ResolvedRelationshipStyle};

// ── Style keys ───────────────────────────────────────────────────────

pub const RADIUS: &str = "radius";
pub const NODE_COLOR: &str = "node-color";
pub const BORDER_COLOR: &str = "border-color";
pub const BORDER_WIDTH: &str = "border-width";
pub const CAPTION_COLOR: &str = "caption-color";
pub const CAPTION_FONT_SIZE: &str = "caption-font-size";
pub const NODE_PADDING: &str = "node-padding";
pub const NODE_IMAGE: &str = "node-image";
pub const ARROW_COLOR: &str = "arrow-color";
pub const ARROW_WIDTH: &str = "arrow-width";
pub const TYPE_COLOR: &str = "type-color";
pub const TYPE_FONT_SIZE: &str = "type-font-size";

/// Element style, then graph style, each read leniently.
struct Layers<'a> {
    element: &'a Style,
    graph: &'a Style,
}

impl Layers<'_> {
    fn text(&self, key: &str) -> Option<String> {
        self.element
            .text(key)
            .or_else(|| self.graph.text(key))
            .map(str::to_string)
    }

    fn number(&self, key: &str) -> Option<f32> {
        self.element.number(key).or_else(|| self.graph.number(key))
    }

    fn non_negative(&self, key: &str) -> Option<f32> {
        self.element
            .number(key)
            .filter(|v| *v >= 0.0)
            .or_else(|| self.graph.number(key).filter(|v| *v >= 0.0))
    }

    fn positive(&self, key: &str) -> Option<f32> {
        self.element
            .number(key)
            .filter(|v| *v > 0.0)
            .or_else(|| self.graph.number(key).filter(|v| *v > 0.0))
    }
}

pub(super) fn resolve_node_style(
    node: &Node,
    graph_style: &Style,
    theme: &Theme,
    config: &LayoutConfig,
) -> ResolvedNodeStyle {
    let layers = Layers {
        element: &node.style,
        graph: graph_style,
    };
    ResolvedNodeStyle {
        fill: layers.text(NODE_COLOR).unwrap_or_else(|| theme.node_color.clone()),
        border_color: layers
            .text(BORDER_COLOR)
            .unwrap_or_else(|| theme.node_border_color.clone()),
        border_width: layers
            .non_negative(BORDER_WIDTH)
            .unwrap_or(theme.node_border_width),
        caption_color: layers
            .text(CAPTION_COLOR)
            .unwrap_or_else(|| theme.caption_color.clone()),
        caption_font_size: layers.positive(CAPTION_FONT_SIZE).unwrap_or(theme.font_size),
        padding: layers.non_negative(NODE_PADDING).unwrap_or(config.node_padding),
        image_key: layers.text(NODE_IMAGE),
    }
}

/// Explicit radius, if any layer sets a finite one.
pub(super) fn explicit_radius(node: &Node, graph_style: &Style) -> Option<f32> {
    Layers {
        element: &node.style,
        graph: graph_style,
    }
    .number(RADIUS)
}

pub(super) fn resolve_relationship_style(
    relationship: &Relationship,
    graph_style: &Style,
    theme: &Theme,
) -> ResolvedRelationshipStyle {
    let layers = Layers {
        element: &relationship.style,
        graph: graph_style,
    };
    ResolvedRelationshipStyle {
        color: layers
            .text(ARROW_COLOR)
            .unwrap_or_else(|| theme.relationship_color.clone()),
        width: layers.positive(ARROW_WIDTH).unwrap_or(theme.relationship_width),
        type_color: layers.text(TYPE_COLOR).unwrap_or_else(|| theme.type_color.clone()),
        type_font_size: layers.positive(TYPE_FONT_SIZE).unwrap_or(theme.type_font_size),
    }
}
