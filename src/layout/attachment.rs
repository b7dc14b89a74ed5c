use std::collections::BTreeMap;
use std::f32::consts::PI;

use crate::config::LayoutConfig;
use crate::geometry::normalize_angle;
use crate::ir::{LogicalGraph, Relationship, SelectionState};
use crate::theme::Theme;

use super::bundling::fan_slot;
use super::style::resolve_relationship_style;
use super::{AttachmentPoint, BundleKey, LayoutError, ResolvedRelationship, VisualNode};

/// Point on `node`'s boundary at `angle`.
pub(super) fn attachment_on(node: &VisualNode, angle: f32) -> AttachmentPoint {
    let angle = normalize_angle(angle);
    AttachmentPoint {
        point: node.position.polar_offset(angle, node.radius),
        angle,
    }
}

fn endpoint<'a>(
    nodes: &'a BTreeMap<String, VisualNode>,
    relationship: &Relationship,
    node_id: &str,
) -> Result<&'a VisualNode, LayoutError> {
    nodes
        .get(node_id)
        .ok_or_else(|| LayoutError::DanglingRelationship {
            relationship_id: relationship.id.clone(),
            node_id: node_id.to_string(),
        })
}

/// Resolve both attachment points of every relationship.
///
/// Relationships sharing a node pair fan out symmetrically around the chord
/// between the two centres; self-loops sit at a fixed orientation.
pub(super) fn resolve_attachments(
    nodes: &BTreeMap<String, VisualNode>,
    graph: &LogicalGraph,
    selection: &SelectionState,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Vec<ResolvedRelationship>, LayoutError> {
    // Report the first dangling relationship in input order.
    for relationship in &graph.relationships {
        endpoint(nodes, relationship, &relationship.from_id)?;
        endpoint(nodes, relationship, &relationship.to_id)?;
    }

    let mut groups: BTreeMap<BundleKey, Vec<&Relationship>> = BTreeMap::new();
    for relationship in &graph.relationships {
        let key = BundleKey::for_endpoints(&relationship.from_id, &relationship.to_id);
        groups.entry(key).or_default().push(relationship);
    }

    let mut resolved = Vec::with_capacity(graph.relationships.len());
    for (key, mut members) in groups {
        members.sort_by(|a, b| a.id.cmp(&b.id));
        let (lo, hi) = key.node_ids();
        let a = endpoint(nodes, members[0], lo)?;
        let b = endpoint(nodes, members[0], hi)?;
        let endpoints: Vec<(AttachmentPoint, AttachmentPoint, f32)> = match key {
            BundleKey::SelfLoop(_) => self_loop_attachments(a, members.len(), config),
            BundleKey::Pair(..) => pair_attachments(a, b, &members, config),
        };
        for (relationship, (start, end, slot)) in members.into_iter().zip(endpoints) {
            resolved.push(ResolvedRelationship {
                id: relationship.id.clone(),
                rel_type: relationship.rel_type.clone(),
                start_node_id: relationship.from_id.clone(),
                end_node_id: relationship.to_id.clone(),
                start,
                end,
                slot,
                selected: selection.is_relationship_selected(&relationship.id),
                style: resolve_relationship_style(relationship, &graph.style, theme),
            });
        }
    }
    Ok(resolved)
}

/// Start/end/slot for each member of the pair bundle `(a, b)`, where `a` has
/// the smaller id.
fn pair_attachments(
    a: &VisualNode,
    b: &VisualNode,
    members: &[&Relationship],
    config: &LayoutConfig,
) -> Vec<(AttachmentPoint, AttachmentPoint, f32)> {
    let count = members.len();
    let theta = a.position.angle_to(b.position);
    let fan_out = &config.fan_out;
    let min_radius = a.radius.min(b.radius);
    let step_on = |radius: f32| -> f32 {
        if count <= 1 {
            return 0.0;
        }
        let by_separation = fan_out.separation_ratio * min_radius / radius;
        let by_spread = fan_out.max_spread / (count - 1) as f32;
        by_separation.min(by_spread)
    };
    let step_a = step_on(a.radius);
    let step_b = step_on(b.radius);

    members
        .iter()
        .enumerate()
        .map(|(idx, relationship)| {
            let slot = fan_slot(idx, count);
            let on_a = attachment_on(a, theta + slot * step_a);
            let on_b = attachment_on(b, theta + PI - slot * step_b);
            if relationship.from_id == a.id {
                (on_a, on_b, slot)
            } else {
                (on_b, on_a, slot)
            }
        })
        .collect()
}

fn self_loop_attachments(
    node: &VisualNode,
    count: usize,
    config: &LayoutConfig,
) -> Vec<(AttachmentPoint, AttachmentPoint, f32)> {
    let self_loop = &config.self_loop;
    (0..count)
        .map(|idx| {
            let start = attachment_on(node, self_loop.orientation - self_loop.half_angle);
            let end = attachment_on(node, self_loop.orientation + self_loop.half_angle);
            (start, end, idx as f32)
        })
        .collect()
}
