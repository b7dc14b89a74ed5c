mod attachment;
mod bundling;
mod error;
mod label_placement;
mod node;
mod routing;
pub(crate) mod style;
mod text;
pub(crate) mod types;
pub use error::LayoutError;
pub use types::*;

use attachment::resolve_attachments;
use bundling::bundle_relationships;
use node::build_visual_node;
use routing::route_bundle;

use crate::assets::AssetCache;
use crate::config::LayoutConfig;
use crate::ir::{LogicalGraph, SelectionState};
use crate::surface::DrawingSurface;
use crate::theme::Theme;
use std::collections::BTreeMap;

/// Derive the render-ready visual graph from the logical graph.
///
/// The pass is pure apart from text measurement on `surface`: identical
/// inputs give bit-identical geometry. Malformed input (duplicate ids,
/// relationships to unknown nodes) fails the whole pass.
pub fn derive_visual_graph(
    graph: &LogicalGraph,
    selection: &SelectionState,
    assets: &AssetCache,
    surface: &mut dyn DrawingSurface,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<VisualGraph, LayoutError> {
    let mut nodes = BTreeMap::new();
    for node in &graph.nodes {
        let visual = build_visual_node(node, graph, selection, assets, surface, theme, config);
        if nodes.insert(node.id.clone(), visual).is_some() {
            return Err(LayoutError::DuplicateNode {
                node_id: node.id.clone(),
            });
        }
    }

    let resolved = resolve_attachments(&nodes, graph, selection, theme, config)?;
    let bundles = bundle_relationships(resolved, &config.fan_out)?;

    let mut routed = Vec::with_capacity(bundles.len());
    for bundle in bundles {
        tracing::trace!(key = ?bundle.key, members = bundle.members.len(), "routing bundle");
        routed.push(route_bundle(bundle, &nodes, theme, config, surface));
    }

    tracing::debug!(
        nodes = nodes.len(),
        relationships = graph.relationships.len(),
        bundles = routed.len(),
        "derived visual graph"
    );

    Ok(VisualGraph {
        nodes,
        bundles: routed,
        background: theme.background.clone(),
        guide_color: theme.guide_color.clone(),
        guide_spacing: config.guide_spacing,
    })
}
