use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_2, PI};

use crate::config::LayoutConfig;
use crate::geometry::{GEOMETRY_EPSILON, Point};
use crate::surface::DrawingSurface;
use crate::theme::Theme;

use super::label_placement::place_label;
use super::{
    AttachmentPoint, Bundle, BundleKey, BundleMember, CurveGeometry, RoutedBundle,
    RoutedRelationship, VisualNode,
};

// ── Arrowhead trimming ───────────────────────────────────────────────

/// Coarse samples walked back from the tip before bisecting.
const TRIM_SAMPLES: usize = 64;
const TRIM_BISECT_STEPS: usize = 20;

pub(super) fn route_bundle(
    bundle: Bundle,
    nodes: &BTreeMap<String, VisualNode>,
    theme: &Theme,
    config: &LayoutConfig,
    surface: &mut dyn DrawingSurface,
) -> RoutedBundle {
    let (lo, hi) = bundle.key.node_ids();
    let axis = match (&bundle.key, nodes.get(lo), nodes.get(hi)) {
        (BundleKey::SelfLoop(_), _, _) => config.self_loop.orientation + FRAC_PI_2,
        (_, Some(a), Some(b)) => a.position.angle_to(b.position),
        _ => 0.0,
    };
    let loop_node = match &bundle.key {
        BundleKey::SelfLoop(id) => nodes.get(id),
        BundleKey::Pair(..) => None,
    };

    let routes = bundle
        .members
        .into_iter()
        .enumerate()
        .map(|(nesting, member)| {
            let curve = match loop_node {
                Some(node) => self_loop_curve(node, &member, nesting, config),
                None => pair_curve(&member, axis),
            };
            route_member(member, curve, axis, theme, config, surface)
        })
        .collect();

    RoutedBundle {
        key: bundle.key,
        routes,
        hit_tolerance: config.hit_tolerance,
    }
}

fn route_member(
    member: BundleMember,
    curve: CurveGeometry,
    axis: f32,
    theme: &Theme,
    config: &LayoutConfig,
    surface: &mut dyn DrawingSurface,
) -> RoutedRelationship {
    let (shaft, arrowhead) = arrowhead_for(&curve, &member.relationship.end, config);
    let label = place_label(
        &member.relationship.rel_type,
        &curve,
        axis,
        &member.relationship.style,
        theme,
        config,
        surface,
    );
    RoutedRelationship {
        relationship: member.relationship,
        offset: member.offset,
        curve,
        shaft,
        arrowhead,
        label,
    }
}

/// Straight chord for zero offset, otherwise a quadratic whose apex sits
/// `offset` away from the chord along the pair's canonical normal.
fn pair_curve(member: &BundleMember, axis: f32) -> CurveGeometry {
    let from = member.relationship.start.point;
    let to = member.relationship.end.point;
    if member.offset.abs() <= GEOMETRY_EPSILON {
        return CurveGeometry::Straight { from, to };
    }
    let normal = Point::from_angle(axis).perpendicular();
    CurveGeometry::Quadratic {
        from,
        control: from.midpoint(to) + normal * (2.0 * member.offset),
        to,
    }
}

fn self_loop_curve(
    node: &VisualNode,
    member: &BundleMember,
    nesting: usize,
    config: &LayoutConfig,
) -> CurveGeometry {
    let self_loop = &config.self_loop;
    let reach = node.radius * self_loop.bulge_ratio * (1.0 + nesting as f32 * self_loop.nesting_step);
    let start = member.relationship.start;
    let end = member.relationship.end;
    CurveGeometry::Cubic {
        from: start.point,
        c1: start.point.polar_offset(start.angle, reach),
        c2: end.point.polar_offset(end.angle, reach),
        to: end.point,
    }
}

/// Shaft ending at the arrowhead base, plus the arrowhead triangle
/// `[tip, left, right]`.
fn arrowhead_for(
    curve: &CurveGeometry,
    end: &AttachmentPoint,
    config: &LayoutConfig,
) -> (CurveGeometry, [Point; 3]) {
    let length = config.arrowhead_length.max(0.0);
    let shaft = trim_end(curve, length);
    let tip = curve.end();
    let direction = (tip - shaft.end())
        .normalized()
        .or_else(|| curve.tangent_at(1.0).normalized())
        .unwrap_or_else(|| Point::from_angle(end.angle + PI));
    let base = tip - direction * length;
    let half_width = direction.perpendicular() * (config.arrowhead_width / 2.0);
    (shaft, [tip, base + half_width, base - half_width])
}

/// Cut the curve where it is `length` away from its end point.
fn trim_end(curve: &CurveGeometry, length: f32) -> CurveGeometry {
    if length <= GEOMETRY_EPSILON {
        return *curve;
    }
    let tip = curve.end();
    let reaches = |t: f32| curve.point_at(t).distance(tip) >= length;

    let mut inside = 1.0;
    let mut outside = None;
    for idx in (0..TRIM_SAMPLES).rev() {
        let t = idx as f32 / TRIM_SAMPLES as f32;
        if reaches(t) {
            outside = Some(t);
            break;
        }
        inside = t;
    }
    let Some(mut lo) = outside else {
        return curve.split_at(0.0).0;
    };
    let mut hi = inside;
    for _ in 0..TRIM_BISECT_STEPS {
        let mid = (lo + hi) / 2.0;
        if reaches(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    curve.split_at(lo).0
}
