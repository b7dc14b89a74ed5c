use std::collections::BTreeSet;
use std::f32::consts::PI;
use std::path::Path;

use nodegraph_canvas::assets::AssetCache;
use nodegraph_canvas::config::LayoutConfig;
use nodegraph_canvas::geometry::Point;
use nodegraph_canvas::ir::{LogicalGraph, SelectionState, parse_graph};
use nodegraph_canvas::layout::{BundleKey, CurveGeometry, LayoutError, NodeImage, VisualGraph};
use nodegraph_canvas::layout_dump::layout_dump_json;
use nodegraph_canvas::render::{fit_viewport, render_svg};
use nodegraph_canvas::surface::RecordingSurface;
use nodegraph_canvas::theme::Theme;
use nodegraph_canvas::derive_visual_graph;
use proptest::prelude::*;

const BOUNDARY_TOLERANCE: f32 = 1e-2;

fn fixture(name: &str) -> LogicalGraph {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    parse_graph(&input).expect("fixture parse failed")
}

fn derive(graph: &LogicalGraph) -> Result<VisualGraph, LayoutError> {
    derive_visual_graph(
        graph,
        &SelectionState::default(),
        &AssetCache::new(),
        &mut RecordingSurface::new(),
        &Theme::classic(),
        &LayoutConfig::default(),
    )
}

fn assert_on_boundaries(visual: &VisualGraph) {
    for bundle in visual.bundles() {
        for route in &bundle.routes {
            let rel = &route.relationship;
            for (node_id, attachment) in [(&rel.start_node_id, rel.start), (&rel.end_node_id, rel.end)] {
                let node = visual.node(node_id).expect("endpoint node");
                let off = (attachment.point.distance(node.position) - node.radius).abs();
                assert!(
                    off <= BOUNDARY_TOLERANCE * node.radius.max(1.0),
                    "{}: attachment {:?} is {off} off the boundary of {node_id}",
                    rel.id,
                    attachment.point
                );
            }
        }
    }
}

fn assert_finite(visual: &VisualGraph) {
    for node in visual.nodes() {
        assert!(node.position.is_finite() && node.radius.is_finite(), "{}", node.id);
    }
    for bundle in visual.bundles() {
        for route in &bundle.routes {
            assert!(route.curve.is_finite(), "{} curve", route.relationship.id);
            assert!(route.shaft.is_finite(), "{} shaft", route.relationship.id);
            assert!(route.offset.is_finite());
            assert!(route.arrowhead.iter().all(|p| p.is_finite()));
            assert!(route.relationship.start.angle.is_finite());
            assert!(route.relationship.end.angle.is_finite());
            if let Some(label) = &route.label {
                assert!(label.position.is_finite() && label.angle.is_finite());
            }
        }
    }
}

#[test]
fn single_relationship_is_a_straight_chord() {
    let visual = derive(&fixture("simple.json")).expect("derive failed");
    assert_eq!(visual.bundles().len(), 1);
    let bundle = &visual.bundles()[0];
    assert_eq!(bundle.key, BundleKey::Pair("A".to_string(), "B".to_string()));
    assert_eq!(bundle.routes.len(), 1);

    let route = &bundle.routes[0];
    assert_eq!(route.offset, 0.0);
    assert!(matches!(route.curve, CurveGeometry::Straight { .. }));
    assert!(route.relationship.start.angle.abs() < 1e-5);
    assert!((route.relationship.end.angle.abs() - PI).abs() < 1e-5);

    let a = visual.node("A").unwrap();
    let b = visual.node("B").unwrap();
    assert!((route.curve.start().x - a.radius).abs() < 1e-4);
    assert!((route.curve.end().x - (100.0 - b.radius)).abs() < 1e-4);
    assert_on_boundaries(&visual);

    let label = route.label.as_ref().expect("typed relationship gets a label");
    assert_eq!(label.text, "KNOWS");
    assert!(label.angle.abs() < 1e-5, "label angle {}", label.angle);
    assert!(label.position.y < 0.0, "label sits above a horizontal line");
}

#[test]
fn mixed_direction_relationships_share_one_fanned_bundle() {
    let visual = derive(&fixture("parallel.json")).expect("derive failed");
    assert_eq!(visual.bundles().len(), 1);
    let bundle = &visual.bundles()[0];
    let ids: Vec<&str> = bundle.routes.iter().map(|r| r.relationship.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2", "r3"]);

    let offsets: Vec<f32> = bundle.routes.iter().map(|r| r.offset).collect();
    assert_eq!(offsets[0], 0.0);
    assert!(offsets[1] != 0.0);
    assert_eq!(offsets[1], -offsets[2]);

    assert!(matches!(bundle.routes[0].curve, CurveGeometry::Straight { .. }));
    assert!(matches!(bundle.routes[1].curve, CurveGeometry::Quadratic { .. }));
    assert!(matches!(bundle.routes[2].curve, CurveGeometry::Quadratic { .. }));
    assert_eq!(bundle.path_for(1), Some(&bundle.routes[1].curve));
    assert!(bundle.path_for(3).is_none());

    let reversed = &bundle.routes[1].relationship;
    assert_eq!(reversed.start_node_id, "B");
    assert_eq!(reversed.end_node_id, "A");
    assert_on_boundaries(&visual);

    let labels = bundle.label_positions();
    assert_eq!(labels.len(), 3);
    for (i, p) in labels.iter().enumerate() {
        for q in &labels[i + 1..] {
            assert!(p.distance(*q) > 1.0, "labels of a fan must not stack");
        }
    }
}

#[test]
fn self_loops_are_closed_and_nest_outward() {
    let visual = derive(&fixture("self_loop.json5")).expect("derive failed");
    assert_eq!(visual.bundles().len(), 1);
    let bundle = &visual.bundles()[0];
    assert_eq!(bundle.key, BundleKey::SelfLoop("A".to_string()));
    assert_eq!(bundle.routes.len(), 2);

    let node = visual.node("A").unwrap();
    let mut reach = Vec::new();
    for route in &bundle.routes {
        let rel = &route.relationship;
        assert!(rel.is_self_loop());
        assert!(rel.start.point.distance(rel.end.point) > 1.0);
        assert!(route.curve.is_closed_loop());
        let apex = route.curve.point_at(0.5);
        reach.push(apex.distance(node.position));
    }
    assert!(reach[1] > reach[0]);
    assert_eq!(bundle.routes[0].relationship.style.color, "#334155");
    assert_on_boundaries(&visual);
}

#[test]
fn dangling_endpoint_fails_the_pass() {
    let err = derive(&fixture("dangling.json")).unwrap_err();
    assert_eq!(
        err,
        LayoutError::DanglingRelationship {
            relationship_id: "r9".to_string(),
            node_id: "ghost".to_string(),
        }
    );
    assert_eq!(err.offending_id(), "r9");
}

#[test]
fn duplicate_ids_fail_the_pass() {
    let mut graph = fixture("simple.json");
    graph.add_node("A", Point::new(5.0, 5.0), "again");
    assert_eq!(
        derive(&graph).unwrap_err(),
        LayoutError::DuplicateNode {
            node_id: "A".to_string()
        }
    );

    let mut graph = fixture("simple.json");
    graph.add_relationship("r1", "B", "A", "AGAIN");
    assert!(matches!(
        derive(&graph).unwrap_err(),
        LayoutError::DuplicateRelationship { .. }
    ));
}

#[test]
fn styles_and_missing_images_resolve() {
    let visual = derive(&fixture("styled.json")).expect("derive failed");
    let hub = visual.node("hub").unwrap();
    assert!(hub.radius >= 60.0);
    assert!(hub.caption.lines.len() > 1);
    assert_eq!(hub.style.fill, "#FDE68A");

    let leaf = visual.node("leaf").unwrap();
    assert!(leaf.caption.is_blank());
    assert!(leaf.radius >= LayoutConfig::default().min_node_radius);

    let pic = visual.node("pic").unwrap();
    assert_eq!(
        pic.image,
        Some(NodeImage::Placeholder {
            key: "missing.png".to_string()
        })
    );

    assert_eq!(visual.relationship_route("e1").unwrap().relationship.style.width, 3.0);
    assert!(visual.relationship_route("e2").unwrap().label.is_none());
    assert_on_boundaries(&visual);
}

#[test]
fn coincident_nodes_stay_finite() {
    let mut graph = LogicalGraph::new();
    graph.add_node("a", Point::new(10.0, 10.0), "same");
    graph.add_node("b", Point::new(10.0, 10.0), "same");
    graph.add_relationship("r1", "a", "b", "X");
    graph.add_relationship("r2", "b", "a", "Y");
    let visual = derive(&graph).expect("coincident nodes are not an error");
    assert_eq!(visual.relationship_count(), 2);
    assert_finite(&visual);
}

#[test]
fn derivation_is_deterministic() {
    for name in ["simple.json", "parallel.json", "self_loop.json5", "styled.json"] {
        let graph = fixture(name);
        let first = layout_dump_json(&derive(&graph).unwrap()).unwrap();
        let second = layout_dump_json(&derive(&graph).unwrap()).unwrap();
        assert_eq!(first, second, "{name}");
    }
}

#[test]
fn rendered_fixtures_are_valid_svg() {
    let theme = Theme::modern();
    for name in ["simple.json", "parallel.json", "self_loop.json5", "styled.json"] {
        let visual = derive(&fixture(name)).unwrap();
        let viewport = fit_viewport(&visual, 640.0, 480.0, 24.0);
        let svg = render_svg(&visual, &theme, &viewport);
        assert!(svg.contains("<svg"), "{name}: missing <svg tag");
        assert!(svg.contains("</svg>"), "{name}: missing </svg tag");
        assert!(!svg.contains("NaN"), "{name}: NaN in output");
    }
}

// ── Properties ───────────────────────────────────────────────────────

fn arb_graph() -> impl Strategy<Value = LogicalGraph> {
    let positions = prop::collection::vec((-400.0f32..400.0, -400.0f32..400.0), 1..6);
    positions.prop_flat_map(|positions| {
        let count = positions.len();
        let edges = prop::collection::vec((0..count, 0..count), 0..12);
        (Just(positions), edges).prop_map(|(positions, edges)| {
            let mut graph = LogicalGraph::new();
            for (idx, (x, y)) in positions.iter().enumerate() {
                graph.add_node(&format!("n{idx}"), Point::new(*x, *y), &format!("Node {idx}"));
            }
            for (idx, (from, to)) in edges.iter().enumerate() {
                graph.add_relationship(
                    &format!("r{idx:02}"),
                    &format!("n{from}"),
                    &format!("n{to}"),
                    "REL",
                );
            }
            graph
        })
    })
}

proptest! {
    #[test]
    fn bundles_partition_the_relationships(graph in arb_graph()) {
        let visual = derive(&graph).unwrap();
        let mut seen = BTreeSet::new();
        for bundle in visual.bundles() {
            for route in &bundle.routes {
                let rel = &route.relationship;
                prop_assert_eq!(
                    BundleKey::for_endpoints(&rel.start_node_id, &rel.end_node_id),
                    bundle.key.clone()
                );
                prop_assert!(seen.insert(rel.id.clone()));
            }
        }
        let expected: BTreeSet<String> = graph.relationships.iter().map(|r| r.id.clone()).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn geometry_is_finite_and_attached(graph in arb_graph()) {
        let visual = derive(&graph).unwrap();
        assert_finite(&visual);
        assert_on_boundaries(&visual);
    }

    #[test]
    fn fan_offsets_are_symmetric(graph in arb_graph()) {
        let visual = derive(&graph).unwrap();
        for bundle in visual.bundles() {
            if matches!(bundle.key, BundleKey::SelfLoop(_)) {
                continue;
            }
            let sum: f32 = bundle.routes.iter().map(|r| r.offset).sum();
            prop_assert!(sum.abs() < 1e-3, "offsets {:?}", bundle.routes.iter().map(|r| r.offset).collect::<Vec<_>>());
        }
    }
}
