use std::collections::BTreeMap;

use serde::Serialize;

use crate::assets::ImageAsset;
use crate::geometry::{GEOMETRY_EPSILON, Point, Rect, point_segment_distance};
use crate::surface::PathData;

/// Segments used when a curve is approximated by a polyline.
pub const FLATTEN_SEGMENTS: usize = 24;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    pub line_height: f32,
}

impl TextBlock {
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|line| line.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedNodeStyle {
    pub fill: String,
    pub border_color: String,
    pub border_width: f32,
    pub caption_color: String,
    pub caption_font_size: f32,
    pub padding: f32,
    pub image_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRelationshipStyle {
    pub color: String,
    pub width: f32,
    pub type_color: String,
    pub type_font_size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeImage {
    Ready(ImageAsset),
    /// Key known but not loaded (pending, failed or never requested).
    Placeholder { key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualNode {
    pub id: String,
    pub position: Point,
    pub radius: f32,
    pub caption: TextBlock,
    pub style: ResolvedNodeStyle,
    pub selected: bool,
    pub editing: bool,
    pub image: Option<NodeImage>,
}

impl VisualNode {
    pub fn contains(&self, point: Point) -> bool {
        self.position.distance(point) <= self.radius
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.position.x - self.radius,
            self.position.y - self.radius,
            self.radius * 2.0,
            self.radius * 2.0,
        )
    }
}

/// A point on a node's circumference together with its angle from the
/// node centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttachmentPoint {
    pub point: Point,
    pub angle: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRelationship {
    pub id: String,
    pub rel_type: String,
    pub start_node_id: String,
    pub end_node_id: String,
    pub start: AttachmentPoint,
    pub end: AttachmentPoint,
    /// Fan slot for pair bundles, nesting index for self-loops.
    pub slot: f32,
    pub selected: bool,
    pub style: ResolvedRelationshipStyle,
}

impl ResolvedRelationship {
    pub fn is_self_loop(&self) -> bool {
        self.start_node_id == self.end_node_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BundleKey {
    /// Unordered node pair, smaller id first.
    Pair(String, String),
    SelfLoop(String),
}

impl BundleKey {
    pub fn for_endpoints(from_id: &str, to_id: &str) -> Self {
        if from_id == to_id {
            BundleKey::SelfLoop(from_id.to_string())
        } else if from_id < to_id {
            BundleKey::Pair(from_id.to_string(), to_id.to_string())
        } else {
            BundleKey::Pair(to_id.to_string(), from_id.to_string())
        }
    }

    pub fn node_ids(&self) -> (&str, &str) {
        match self {
            BundleKey::Pair(lo, hi) => (lo, hi),
            BundleKey::SelfLoop(id) => (id, id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleMember {
    pub relationship: ResolvedRelationship,
    pub offset: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bundle {
    pub key: BundleKey,
    pub members: Vec<BundleMember>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CurveGeometry {
    Straight {
        from: Point,
        to: Point,
    },
    Quadratic {
        from: Point,
        control: Point,
        to: Point,
    },
    Cubic {
        from: Point,
        c1: Point,
        c2: Point,
        to: Point,
    },
}

impl CurveGeometry {
    pub fn start(&self) -> Point {
        match *self {
            CurveGeometry::Straight { from, .. }
            | CurveGeometry::Quadratic { from, .. }
            | CurveGeometry::Cubic { from, .. } => from,
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            CurveGeometry::Straight { to, .. }
            | CurveGeometry::Quadratic { to, .. }
            | CurveGeometry::Cubic { to, .. } => to,
        }
    }

    pub fn point_at(&self, t: f32) -> Point {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        match *self {
            CurveGeometry::Straight { from, to } => from.lerp(to, t),
            CurveGeometry::Quadratic { from, control, to } => {
                from * (u * u) + control * (2.0 * u * t) + to * (t * t)
            }
            CurveGeometry::Cubic { from, c1, c2, to } => {
                from * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + to * (t * t * t)
            }
        }
    }

    /// First derivative at `t`. May be zero for degenerate curves.
    pub fn tangent_at(&self, t: f32) -> Point {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        match *self {
            CurveGeometry::Straight { from, to } => to - from,
            CurveGeometry::Quadratic { from, control, to } => {
                (control - from) * (2.0 * u) + (to - control) * (2.0 * t)
            }
            CurveGeometry::Cubic { from, c1, c2, to } => {
                (c1 - from) * (3.0 * u * u) + (c2 - c1) * (6.0 * u * t) + (to - c2) * (3.0 * t * t)
            }
        }
    }

    /// Split at `t` with de Casteljau subdivision.
    pub fn split_at(&self, t: f32) -> (CurveGeometry, CurveGeometry) {
        let t = t.clamp(0.0, 1.0);
        match *self {
            CurveGeometry::Straight { from, to } => {
                let mid = from.lerp(to, t);
                (
                    CurveGeometry::Straight { from, to: mid },
                    CurveGeometry::Straight { from: mid, to },
                )
            }
            CurveGeometry::Quadratic { from, control, to } => {
                let a = from.lerp(control, t);
                let b = control.lerp(to, t);
                let mid = a.lerp(b, t);
                (
                    CurveGeometry::Quadratic {
                        from,
                        control: a,
                        to: mid,
                    },
                    CurveGeometry::Quadratic {
                        from: mid,
                        control: b,
                        to,
                    },
                )
            }
            CurveGeometry::Cubic { from, c1, c2, to } => {
                let ab = from.lerp(c1, t);
                let bc = c1.lerp(c2, t);
                let cd = c2.lerp(to, t);
                let abc = ab.lerp(bc, t);
                let bcd = bc.lerp(cd, t);
                let mid = abc.lerp(bcd, t);
                (
                    CurveGeometry::Cubic {
                        from,
                        c1: ab,
                        c2: abc,
                        to: mid,
                    },
                    CurveGeometry::Cubic {
                        from: mid,
                        c1: bcd,
                        c2: cd,
                        to,
                    },
                )
            }
        }
    }

    pub fn flatten(&self, segments: usize) -> Vec<Point> {
        if let CurveGeometry::Straight { from, to } = *self {
            return vec![from, to];
        }
        let segments = segments.max(1);
        (0..=segments)
            .map(|idx| self.point_at(idx as f32 / segments as f32))
            .collect()
    }

    pub fn distance_to(&self, point: Point) -> f32 {
        self.flatten(FLATTEN_SEGMENTS)
            .windows(2)
            .map(|pair| point_segment_distance(point, pair[0], pair[1]))
            .fold(f32::INFINITY, f32::min)
    }

    pub fn bounds(&self) -> Rect {
        let points = self.flatten(FLATTEN_SEGMENTS);
        let mut rect = Rect::new(points[0].x, points[0].y, 0.0, 0.0);
        for point in &points[1..] {
            rect = rect.union(&Rect::new(point.x, point.y, 0.0, 0.0));
        }
        rect
    }

    pub fn to_path(&self) -> PathData {
        let path = PathData::new().move_to(self.start());
        match *self {
            CurveGeometry::Straight { to, .. } => path.line_to(to),
            CurveGeometry::Quadratic { control, to, .. } => path.quad_to(control, to),
            CurveGeometry::Cubic { c1, c2, to, .. } => path.cubic_to(c1, c2, to),
        }
    }

    pub fn is_closed_loop(&self) -> bool {
        matches!(self, CurveGeometry::Cubic { .. })
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            CurveGeometry::Straight { from, to } => from.is_finite() && to.is_finite(),
            CurveGeometry::Quadratic { from, control, to } => {
                from.is_finite() && control.is_finite() && to.is_finite()
            }
            CurveGeometry::Cubic { from, c1, c2, to } => {
                from.is_finite() && c1.is_finite() && c2.is_finite() && to.is_finite()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipLabel {
    pub text: String,
    pub position: Point,
    /// Rotation in radians, always within `(-PI/2, PI/2]`.
    pub angle: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedRelationship {
    pub relationship: ResolvedRelationship,
    pub offset: f32,
    /// Full curve between the two attachment points.
    pub curve: CurveGeometry,
    /// Stroked part of the curve, ending at the arrowhead base.
    pub shaft: CurveGeometry,
    /// Tip followed by the two base corners.
    pub arrowhead: [Point; 3],
    pub label: Option<RelationshipLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedBundle {
    pub key: BundleKey,
    pub routes: Vec<RoutedRelationship>,
    pub hit_tolerance: f32,
}

impl RoutedBundle {
    pub fn path_for(&self, member: usize) -> Option<&CurveGeometry> {
        self.routes.get(member).map(|route| &route.curve)
    }

    pub fn label_positions(&self) -> Vec<Point> {
        self.routes
            .iter()
            .filter_map(|route| route.label.as_ref().map(|label| label.position))
            .collect()
    }

    pub fn hit_test(&self, point: Point) -> bool {
        self.hit_member(point).is_some()
    }

    /// Closest member whose curve passes within the hit tolerance.
    pub fn hit_member(&self, point: Point) -> Option<&RoutedRelationship> {
        self.routes
            .iter()
            .map(|route| (route, route.curve.distance_to(point)))
            .filter(|(_, distance)| *distance <= self.hit_tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(route, _)| route)
    }

    pub fn bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        for route in &self.routes {
            let mut rect = route.curve.bounds();
            if let Some(label) = &route.label {
                let half = label.width.max(label.height) / 2.0;
                rect = rect.union(&Rect::new(
                    label.position.x - half,
                    label.position.y - half,
                    half * 2.0,
                    half * 2.0,
                ));
            }
            bounds = Some(match bounds {
                Some(acc) => acc.union(&rect),
                None => rect,
            });
        }
        bounds
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Node(String),
    Relationship(String),
}

/// Maps graph coordinates to canvas coordinates: `canvas = graph * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pan: Point,
    pub zoom: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            pan: Point::ORIGIN,
            zoom: 1.0,
        }
    }

    pub fn to_canvas(&self, graph: Point) -> Point {
        graph * self.zoom + self.pan
    }

    pub fn to_graph(&self, canvas: Point) -> Point {
        (canvas - self.pan) * (1.0 / self.zoom)
    }

    pub fn pan_by(&mut self, delta: Point) {
        self.pan = self.pan + delta;
    }

    /// Zoom by `factor`, keeping the graph point under `focus` (canvas
    /// coordinates) fixed.
    pub fn zoom_at(&mut self, focus: Point, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let anchor = self.to_graph(focus);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = focus - anchor * self.zoom;
    }

    pub fn visible_graph_rect(&self) -> Rect {
        Rect::from_corners(
            self.to_graph(Point::ORIGIN),
            self.to_graph(Point::new(self.width, self.height)),
        )
    }
}

/// Render-ready projection of the logical graph. Rebuilt wholesale on every
/// relevant state change.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualGraph {
    pub(crate) nodes: BTreeMap<String, VisualNode>,
    pub(crate) bundles: Vec<RoutedBundle>,
    pub(crate) background: String,
    pub(crate) guide_color: String,
    pub(crate) guide_spacing: f32,
}

impl VisualGraph {
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &VisualNode> + '_ {
        self.nodes.values()
    }

    pub fn bundles(&self) -> &[RoutedBundle] {
        &self.bundles
    }

    pub fn node(&self, id: &str) -> Option<&VisualNode> {
        self.nodes.get(id)
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn selected_node_positions(&self) -> Vec<(String, Point)> {
        self.nodes
            .values()
            .filter(|node| node.selected)
            .map(|node| (node.id.clone(), node.position))
            .collect()
    }

    /// Ids of nodes whose centre lies inside `rect`.
    pub fn nodes_in_rect(&self, rect: Rect) -> Vec<String> {
        self.nodes
            .values()
            .filter(|node| rect.contains(node.position))
            .map(|node| node.id.clone())
            .collect()
    }

    pub fn relationship_route(&self, id: &str) -> Option<&RoutedRelationship> {
        self.bundles
            .iter()
            .flat_map(|bundle| bundle.routes.iter())
            .find(|route| route.relationship.id == id)
    }

    pub fn relationship_count(&self) -> usize {
        self.bundles.iter().map(|bundle| bundle.routes.len()).sum()
    }

    pub fn bounds(&self) -> Option<Rect> {
        let node_bounds = self.nodes.values().map(VisualNode::bounds);
        let bundle_bounds = self.bundles.iter().filter_map(RoutedBundle::bounds);
        node_bounds
            .chain(bundle_bounds)
            .reduce(|acc, rect| acc.union(&rect))
    }

    /// Topmost element under `point`: nodes first, last drawn wins, then
    /// relationships in reverse bundle order.
    pub fn hit_test(&self, point: Point) -> Option<HitTarget> {
        if let Some(node) = self.nodes.values().rev().find(|node| node.contains(point)) {
            return Some(HitTarget::Node(node.id.clone()));
        }
        self.bundles
            .iter()
            .rev()
            .find_map(|bundle| bundle.hit_member(point))
            .map(|route| HitTarget::Relationship(route.relationship.id.clone()))
    }
}

pub(crate) fn is_degenerate(vector: Point) -> bool {
    vector.length() <= GEOMETRY_EPSILON || !vector.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_split_meets_at_point_on_curve() {
        let curve = CurveGeometry::Quadratic {
            from: Point::new(0.0, 0.0),
            control: Point::new(50.0, 40.0),
            to: Point::new(100.0, 0.0),
        };
        let (head, tail) = curve.split_at(0.3);
        let expected = curve.point_at(0.3);
        assert!(head.end().distance(expected) < 1e-3);
        assert!(tail.start().distance(expected) < 1e-3);
        assert!(head.point_at(0.5).distance(curve.point_at(0.15)) < 1e-3);
    }

    #[test]
    fn curve_distance_uses_flattened_polyline() {
        let curve = CurveGeometry::Straight {
            from: Point::new(0.0, 0.0),
            to: Point::new(100.0, 0.0),
        };
        assert!((curve.distance_to(Point::new(50.0, 4.0)) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn bundle_key_orders_pair() {
        assert_eq!(
            BundleKey::for_endpoints("b", "a"),
            BundleKey::Pair("a".to_string(), "b".to_string())
        );
        assert_eq!(
            BundleKey::for_endpoints("a", "a"),
            BundleKey::SelfLoop("a".to_string())
        );
    }

    #[test]
    fn zoom_keeps_focus_fixed_and_clamps() {
        let mut viewport = Viewport::new(800.0, 600.0);
        let focus = Point::new(200.0, 100.0);
        let before = viewport.to_graph(focus);
        viewport.zoom_at(focus, 2.0);
        assert!(viewport.to_graph(focus).distance(before) < 1e-4);
        viewport.zoom_at(focus, 1000.0);
        assert_eq!(viewport.zoom, MAX_ZOOM);
        viewport.zoom_at(focus, 1e-6);
        assert_eq!(viewport.zoom, MIN_ZOOM);
    }
}
