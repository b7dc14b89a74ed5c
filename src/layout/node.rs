use crate::assets::AssetCache;
use crate::config::LayoutConfig;
use crate::ir::{LogicalGraph, Node, SelectionState};
use crate::surface::{DrawingSurface, FontSpec};
use crate::theme::Theme;

use super::style::{explicit_radius, resolve_node_style};
use super::text::measure_caption;
use super::{NodeImage, VisualNode};

pub(super) fn build_visual_node(
    node: &Node,
    graph: &LogicalGraph,
    selection: &SelectionState,
    assets: &AssetCache,
    surface: &mut dyn DrawingSurface,
    theme: &Theme,
    config: &LayoutConfig,
) -> VisualNode {
    let style = resolve_node_style(node, &graph.style, theme, config);
    let font = FontSpec::new(&theme.font_family, style.caption_font_size);
    let caption = measure_caption(&node.caption, &font, config, surface);

    let half_diagonal = (caption.width * caption.width + caption.height * caption.height).sqrt() / 2.0;
    let derived = style.padding + half_diagonal;
    let radius = explicit_radius(node, &graph.style)
        .map_or(derived, |explicit| explicit.max(derived))
        .max(config.min_node_radius);

    let image = style.image_key.as_deref().map(|key| match assets.get(key) {
        Some(asset) => NodeImage::Ready(asset.clone()),
        None => {
            tracing::debug!(node = %node.id, key, "node image not loaded, using placeholder");
            NodeImage::Placeholder {
                key: key.to_string(),
            }
        }
    });

    VisualNode {
        id: node.id.clone(),
        position: sanitize_position(node),
        radius,
        caption,
        style,
        selected: selection.is_node_selected(&node.id),
        editing: selection.is_editing(&node.id),
        image,
    }
}

fn sanitize_position(node: &Node) -> crate::geometry::Point {
    let mut position = node.position;
    if !position.x.is_finite() {
        position.x = 0.0;
    }
    if !position.y.is_finite() {
        position.y = 0.0;
    }
    position
}
