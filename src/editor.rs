use crate::assets::ImageAsset;
use crate::config::LayoutConfig;
use crate::interaction::{
    CanvasTransform, EventSource, GestureContext, GestureController, GestureOutcome, PointerEvent,
};
use crate::renderer::{RenderHost, Renderer, RendererError, RendererOptions, create_renderer};
use crate::store::{Action, EditorState, Store, SubscriptionId};
use crate::surface::DrawingSurface;
use crate::theme::Theme;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// Store, renderer and gesture layer wired together.
///
/// The renderer is subscribed to the store, so every dispatched action
/// re-renders before `dispatch` returns.
pub struct Editor<S: DrawingSurface + 'static> {
    store: Store,
    renderer: Rc<RefCell<Renderer<S>>>,
    gestures: GestureController,
    subscription: SubscriptionId,
}

impl<S: DrawingSurface + 'static> Editor<S> {
    pub fn new<H: RenderHost<Surface = S>>(
        host: &mut H,
        surface_id: &str,
        state: EditorState,
        options: RendererOptions,
        theme: &Theme,
        config: &LayoutConfig,
    ) -> Result<Self, RendererError> {
        let mut store = Store::new(state);
        let renderer = create_renderer(host, surface_id, &store, options, theme, config)?;
        let (width, height) = renderer.logical_size();
        let renderer = Rc::new(RefCell::new(renderer));

        let subscribed = Rc::clone(&renderer);
        let subscription = store.subscribe(move |state, revisions| {
            let mut renderer = subscribed.borrow_mut();
            let size = renderer.logical_size();
            if size != (state.viewport.width, state.viewport.height) {
                renderer.resize(state.viewport.width, state.viewport.height);
            }
            renderer.render(state, revisions);
        });
        if (store.state().viewport.width, store.state().viewport.height) != (width, height) {
            store.dispatch(Action::WindowResized { width, height });
        }

        Ok(Self {
            store,
            renderer,
            gestures: GestureController::new(CanvasTransform::identity(width, height)),
            subscription,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn renderer(&self) -> Ref<'_, Renderer<S>> {
        self.renderer.borrow()
    }

    pub fn gestures(&self) -> &GestureController {
        &self.gestures
    }

    pub fn set_canvas_transform(&mut self, transform: CanvasTransform) {
        self.gestures.set_transform(transform);
    }

    pub fn dispatch(&mut self, action: Action) {
        self.store.dispatch(action);
    }

    /// Interpret one pointer event and apply the resulting actions.
    pub fn handle_event(&mut self, event: &PointerEvent) -> GestureOutcome {
        let outcome = {
            let renderer = self.renderer.borrow();
            let state = self.store.state();
            let ctx = GestureContext {
                visual: renderer.visual(),
                viewport: &state.viewport,
                selection: &state.selection,
            };
            self.gestures.handle(event, &ctx)
        };
        for action in outcome.actions.iter().cloned() {
            self.store.dispatch(action);
        }
        outcome
    }

    /// Drain `source`, returning the number of events handled.
    pub fn pump(&mut self, source: &mut dyn EventSource) -> usize {
        let mut handled = 0;
        while let Some(event) = source.poll() {
            self.handle_event(&event);
            handled += 1;
        }
        handled
    }

    /// Request `key`, run `loader` and apply its result through the store.
    pub fn load_asset(&mut self, key: &str, loader: impl FnOnce(&str) -> Result<ImageAsset, String>) -> bool {
        self.store.dispatch(Action::AssetRequested {
            key: key.to_string(),
        });
        let Some(ticket) = self.store.state().assets.pending_ticket(key) else {
            return false;
        };
        let result = loader(key);
        if let Err(reason) = &result {
            tracing::debug!(key, reason = %reason, "asset load failed");
        }
        let before = self.store.revisions().assets;
        self.store.dispatch(Action::AssetLoaded { ticket, result });
        self.store.revisions().assets != before
    }

    /// Detach the renderer from the store and hand it back.
    pub fn into_parts(mut self) -> (Store, Rc<RefCell<Renderer<S>>>) {
        self.store.unsubscribe(self.subscription);
        (self.store, self.renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::interaction::{Modifiers, MouseButton};
    use crate::ir::LogicalGraph;
    use crate::surface::RecordingSurface;

    struct Host;

    impl RenderHost for Host {
        type Surface = RecordingSurface;

        fn container_size(&self) -> (f32, f32) {
            (400.0, 300.0)
        }

        fn acquire_surface(&mut self, _surface_id: &str) -> Option<RecordingSurface> {
            Some(RecordingSurface::new())
        }
    }

    fn editor() -> Editor<RecordingSurface> {
        let mut graph = LogicalGraph::new();
        graph.add_node("a", Point::new(100.0, 100.0), "A");
        graph.add_node("b", Point::new(300.0, 100.0), "B");
        graph.add_relationship("r1", "a", "b", "KNOWS");
        Editor::new(
            &mut Host,
            "canvas",
            EditorState::new(graph, 400.0, 300.0),
            RendererOptions::default(),
            &Theme::classic(),
            &LayoutConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn double_click_on_empty_canvas_creates_node() {
        let mut editor = editor();
        editor.handle_event(&PointerEvent::DoubleClick {
            point: Point::new(200.0, 250.0),
        });
        let renderer = editor.renderer();
        let visual = renderer.visual().unwrap();
        assert_eq!(visual.nodes().count(), 3);
        assert!(visual.node("n2").unwrap().selected);
    }

    #[test]
    fn dragging_a_node_moves_it_and_rederives() {
        let mut editor = editor();
        editor.handle_event(&PointerEvent::MouseDown {
            point: Point::new(100.0, 100.0),
            button: MouseButton::Primary,
            modifiers: Modifiers::default(),
        });
        editor.handle_event(&PointerEvent::MouseMove {
            point: Point::new(120.0, 110.0),
        });
        editor.handle_event(&PointerEvent::MouseUp {
            point: Point::new(120.0, 110.0),
        });
        let renderer = editor.renderer();
        let node = renderer.visual().unwrap().node("a").unwrap();
        assert_eq!(node.position, Point::new(120.0, 110.0));
        assert!(node.selected);
        assert!(!editor.store().state().dragging);
    }

    #[test]
    fn asset_load_rederives_with_ready_image() {
        let mut editor = editor();
        let applied = editor.load_asset("avatar.png", |_| Ok(ImageAsset::new("image/png", vec![7])));
        assert!(applied);
        assert_eq!(editor.renderer().derivations(), 3);
    }
}
