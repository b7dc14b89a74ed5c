use nodegraph_canvas::config::LayoutConfig;
use nodegraph_canvas::geometry::{Point, Rect};
use nodegraph_canvas::interaction::{
    CanvasTransform, GestureState, Modifiers, MouseButton, PointerEvent, QueuedEvents,
};
use nodegraph_canvas::ir::LogicalGraph;
use nodegraph_canvas::surface::{DrawCommand, RecordingSurface};
use nodegraph_canvas::theme::Theme;
use nodegraph_canvas::{
    Action, Editor, EditorState, LayoutError, RenderHost, RendererOptions, Store, create_renderer,
};

struct Host {
    dpr: f32,
}

impl RenderHost for Host {
    type Surface = RecordingSurface;

    fn container_size(&self) -> (f32, f32) {
        (800.0, 600.0)
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.dpr
    }

    fn acquire_surface(&mut self, _surface_id: &str) -> Option<RecordingSurface> {
        Some(RecordingSurface::new())
    }
}

fn graph() -> LogicalGraph {
    let mut graph = LogicalGraph::new();
    graph.add_node("a", Point::new(100.0, 100.0), "A");
    graph.add_node("b", Point::new(300.0, 100.0), "B");
    graph.add_node("c", Point::new(300.0, 400.0), "C");
    graph.add_relationship("r1", "a", "b", "KNOWS");
    graph.add_relationship("r2", "b", "c", "LIKES");
    graph
}

fn editor() -> Editor<RecordingSurface> {
    editor_with_ratio(1.0)
}

fn editor_with_ratio(dpr: f32) -> Editor<RecordingSurface> {
    Editor::new(
        &mut Host { dpr },
        "canvas",
        EditorState::new(graph(), 800.0, 600.0),
        RendererOptions::default(),
        &Theme::classic(),
        &LayoutConfig::default(),
    )
    .expect("editor")
}

fn press(point: Point, modifiers: Modifiers) -> PointerEvent {
    PointerEvent::MouseDown {
        point,
        button: MouseButton::Primary,
        modifiers,
    }
}

#[test]
fn bounding_box_top_left_maps_to_canvas_origin() {
    let transform = CanvasTransform {
        origin: Point::new(37.0, 112.0),
        css_size: (400.0, 300.0),
        logical_size: (800.0, 600.0),
    };
    assert_eq!(transform.client_to_canvas(Point::new(37.0, 112.0)), Point::ORIGIN);
    assert_eq!(
        transform.client_to_canvas(Point::new(237.0, 262.0)),
        Point::new(400.0, 300.0)
    );
}

#[test]
fn marquee_selects_enclosed_nodes() {
    let mut editor = editor();
    let mut events = QueuedEvents::new([
        press(Point::new(50.0, 50.0), Modifiers::default()),
        PointerEvent::MouseMove {
            point: Point::new(200.0, 150.0),
        },
        PointerEvent::MouseMove {
            point: Point::new(350.0, 150.0),
        },
    ]);
    assert_eq!(editor.pump(&mut events), 3);
    assert_eq!(
        editor.store().state().marquee,
        Some(Rect::from_corners(Point::new(50.0, 50.0), Point::new(350.0, 150.0)))
    );

    editor.handle_event(&PointerEvent::MouseUp {
        point: Point::new(350.0, 150.0),
    });
    let state = editor.store().state();
    assert!(state.marquee.is_none());
    assert!(state.selection.is_node_selected("a"));
    assert!(state.selection.is_node_selected("b"));
    assert!(!state.selection.is_node_selected("c"));
    assert_eq!(editor.gestures().state(), &GestureState::Idle);

    let renderer = editor.renderer();
    let visual = renderer.visual().unwrap();
    assert_eq!(visual.selected_node_positions().len(), 2);
}

#[test]
fn shift_click_extends_selection_and_drags_all() {
    let mut editor = editor();
    editor.handle_event(&press(Point::new(100.0, 100.0), Modifiers::default()));
    editor.handle_event(&PointerEvent::MouseUp {
        point: Point::new(100.0, 100.0),
    });
    let shift = Modifiers {
        shift: true,
        ..Modifiers::default()
    };
    editor.handle_event(&press(Point::new(300.0, 400.0), shift));
    editor.handle_event(&PointerEvent::MouseMove {
        point: Point::new(310.0, 420.0),
    });
    editor.handle_event(&PointerEvent::PointerLeave);

    let state = editor.store().state();
    assert_eq!(state.graph.node("a").unwrap().position, Point::new(110.0, 120.0));
    assert_eq!(state.graph.node("c").unwrap().position, Point::new(310.0, 420.0));
    assert_eq!(state.graph.node("b").unwrap().position, Point::new(300.0, 100.0));
    assert!(!state.dragging);
}

#[test]
fn clicking_a_relationship_selects_it() {
    let mut editor = editor();
    let outcome = editor.handle_event(&press(Point::new(200.0, 100.0), Modifiers::default()));
    assert!(outcome.prevent_default);
    assert!(editor.store().state().selection.is_relationship_selected("r1"));
    assert_eq!(editor.gestures().state(), &GestureState::Idle);
    let renderer = editor.renderer();
    assert!(renderer.visual().unwrap().relationship_route("r1").unwrap().relationship.selected);
}

#[test]
fn secondary_button_is_ignored_but_prevented() {
    let mut editor = editor();
    let outcome = editor.handle_event(&PointerEvent::MouseDown {
        point: Point::new(100.0, 100.0),
        button: MouseButton::Secondary,
        modifiers: Modifiers::default(),
    });
    assert!(outcome.prevent_default);
    assert!(outcome.actions.is_empty());
    assert!(editor.store().state().selection.is_empty());
}

#[test]
fn double_click_on_node_starts_editing() {
    let mut editor = editor();
    editor.handle_event(&PointerEvent::DoubleClick {
        point: Point::new(300.0, 100.0),
    });
    assert_eq!(editor.store().state().selection.editing_id.as_deref(), Some("b"));
    editor.dispatch(Action::SetCaption {
        node_id: "b".to_string(),
        caption: "Bob the builder".to_string(),
    });
    editor.dispatch(Action::StopEditing);
    let renderer = editor.renderer();
    let node = renderer.visual().unwrap().node("b").unwrap();
    assert!(!node.editing);
    assert_eq!(node.caption.lines.join(" "), "Bob the builder");
}

#[test]
fn wheel_zoom_keeps_focus_fixed_and_pan_does_not_rederive() {
    let mut editor = editor();
    let focus = Point::new(300.0, 100.0);
    let before = editor.store().state().viewport.to_graph(focus);
    let derivations = editor.renderer().derivations();
    editor.handle_event(&PointerEvent::Wheel {
        point: focus,
        delta: Point::new(0.0, -120.0),
        ctrl: true,
    });
    editor.handle_event(&PointerEvent::Wheel {
        point: focus,
        delta: Point::new(0.0, 0.0),
        ctrl: false,
    });
    let viewport = editor.store().state().viewport;
    assert!(viewport.zoom > 1.0);
    assert!(viewport.to_graph(focus).distance(before) < 1e-3);
    assert_eq!(editor.renderer().derivations(), derivations);
}

#[test]
fn delete_selection_drops_node_and_its_relationships() {
    let mut editor = editor();
    editor.handle_event(&press(Point::new(300.0, 100.0), Modifiers::default()));
    editor.handle_event(&PointerEvent::EndDrag);
    editor.dispatch(Action::DeleteSelection);
    let renderer = editor.renderer();
    let visual = renderer.visual().unwrap();
    assert!(visual.node("b").is_none());
    assert_eq!(visual.relationship_count(), 0);
}

#[test]
fn failed_initial_derivation_leaves_no_frame() {
    let mut graph = graph();
    graph.add_relationship("r9", "a", "ghost", "KNOWS");
    let store = Store::new(EditorState::new(graph, 800.0, 600.0));
    let renderer = create_renderer(
        &mut Host { dpr: 2.0 },
        "canvas",
        &store,
        RendererOptions::default(),
        &Theme::classic(),
        &LayoutConfig::default(),
    )
    .expect("surface is available");
    assert!(renderer.visual().is_none());
    assert!(matches!(
        renderer.last_error(),
        Some(LayoutError::DanglingRelationship { relationship_id, .. }) if relationship_id == "r9"
    ));
    assert_eq!(renderer.surface().size(), (1600, 1200));
}

#[test]
fn scaled_canvas_maps_pointer_through_transform_and_viewport() {
    let mut editor = editor();
    editor.dispatch(Action::Zoom {
        focus: Point::ORIGIN,
        factor: 2.0,
    });
    editor.set_canvas_transform(CanvasTransform {
        origin: Point::new(10.0, 20.0),
        css_size: (400.0, 300.0),
        logical_size: (800.0, 600.0),
    });
    let viewport = editor.store().state().viewport;
    let target = viewport.to_canvas(Point::new(300.0, 100.0));
    let client = Point::new(10.0 + target.x / 2.0, 20.0 + target.y / 2.0);
    editor.handle_event(&PointerEvent::DoubleClick { point: client });
    assert_eq!(editor.store().state().selection.editing_id.as_deref(), Some("b"));

    let (mut store, renderer) = editor.into_parts();
    let derivations = renderer.borrow().derivations();
    store.dispatch(Action::ClearSelection);
    assert_eq!(renderer.borrow().derivations(), derivations);
}

#[test]
fn matching_backing_store_needs_no_scale() {
    struct RetinaHost;

    impl RenderHost for RetinaHost {
        type Surface = RecordingSurface;

        fn container_size(&self) -> (f32, f32) {
            (300.0, 200.0)
        }

        fn device_pixel_ratio(&self) -> f32 {
            2.0
        }

        fn acquire_surface(&mut self, _surface_id: &str) -> Option<RecordingSurface> {
            Some(RecordingSurface::new().with_backing_store_ratio(2.0))
        }
    }

    let store = Store::new(EditorState::new(graph(), 300.0, 200.0));
    let mut renderer = create_renderer(
        &mut RetinaHost,
        "canvas",
        &store,
        RendererOptions::default(),
        &Theme::classic(),
        &LayoutConfig::default(),
    )
    .expect("renderer");
    assert_eq!(renderer.pixel_ratio(), 1.0);
    assert_eq!(renderer.surface().size(), (300, 200));
    let drawn_circles = renderer.surface().circles().count();
    assert!(drawn_circles >= 3);
    assert!(renderer.surface().texts().any(|text| text == "KNOWS"));

    renderer.surface_mut().take_commands();
    renderer.layers_mut().clear();
    renderer.render(store.state(), store.revisions());
    assert_eq!(renderer.surface().circles().count(), 0);
}

#[test]
fn window_resize_on_high_density_host_keeps_single_base_scale() {
    let mut editor = editor_with_ratio(2.0);
    assert_eq!(editor.renderer().surface().size(), (1600, 1200));

    editor.dispatch(Action::WindowResized {
        width: 500.0,
        height: 250.0,
    });

    let renderer = editor.renderer();
    assert_eq!(renderer.pixel_ratio(), 2.0);
    assert_eq!(renderer.logical_size(), (500.0, 250.0));
    assert_eq!(renderer.surface().size(), (1000, 500));

    let commands = renderer.surface().commands();
    let base_scales = commands
        .iter()
        .filter(|cmd| matches!(cmd, DrawCommand::Scale(sx, sy) if *sx == 2.0 && *sy == 2.0))
        .count();
    assert_eq!(base_scales, 1);
    let last_clear = commands
        .iter()
        .rev()
        .find_map(|cmd| match cmd {
            DrawCommand::Clear(rect) => Some(*rect),
            _ => None,
        })
        .expect("resize redraws the frame");
    assert_eq!(last_clear, Rect::new(0.0, 0.0, 500.0, 250.0));
}

#[test]
fn click_without_movement_does_not_end_a_drag() {
    let mut editor = editor();
    let down = editor.handle_event(&press(Point::new(100.0, 100.0), Modifiers::default()));
    assert_eq!(
        down.actions,
        vec![Action::SelectNodes {
            node_ids: vec!["a".to_string()],
            additive: false,
        }]
    );
    let up = editor.handle_event(&PointerEvent::MouseUp {
        point: Point::new(100.0, 100.0),
    });
    assert!(up.actions.is_empty());
    assert_eq!(editor.gestures().state(), &GestureState::Idle);
    assert!(!editor.store().state().dragging);

    editor.handle_event(&press(Point::new(100.0, 100.0), Modifiers::default()));
    editor.handle_event(&PointerEvent::MouseMove {
        point: Point::new(104.0, 100.0),
    });
    assert!(editor.store().state().dragging);
    let up = editor.handle_event(&PointerEvent::MouseUp {
        point: Point::new(104.0, 100.0),
    });
    assert_eq!(up.actions, vec![Action::EndDrag]);
    assert!(!editor.store().state().dragging);
}
