//! Pointer gesture state machine.
//!
//! Raw pointer input (client coordinates) is mapped to canvas and graph
//! space, interpreted against the current [`VisualGraph`], and turned into
//! store [`Action`]s. The machine owns only its gesture state; everything
//! else is read from the context passed in with each event.

use crate::geometry::{Point, Rect};
use crate::ir::SelectionState;
use crate::layout::{HitTarget, Viewport, VisualGraph};
use crate::store::Action;
use std::collections::VecDeque;

/// Multiplicative zoom step per wheel notch.
pub const WHEEL_ZOOM_STEP: f32 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    MouseDown {
        point: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    MouseMove {
        point: Point,
    },
    MouseUp {
        point: Point,
    },
    DoubleClick {
        point: Point,
    },
    Wheel {
        point: Point,
        delta: Point,
        ctrl: bool,
    },
    PointerLeave,
    EndDrag,
}

/// Source of pointer events, polled by the editor.
pub trait EventSource {
    fn poll(&mut self) -> Option<PointerEvent>;
}

/// Event source backed by a queue. Used by the harness and tests.
#[derive(Debug, Clone, Default)]
pub struct QueuedEvents {
    events: VecDeque<PointerEvent>,
}

impl QueuedEvents {
    pub fn new(events: impl IntoIterator<Item = PointerEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn push(&mut self, event: PointerEvent) {
        self.events.push_back(event);
    }
}

impl EventSource for QueuedEvents {
    fn poll(&mut self) -> Option<PointerEvent> {
        self.events.pop_front()
    }
}

/// Mapping from client (page) coordinates to canvas coordinates.
///
/// `canvas = (client - origin) * (logical_size / css_size)`. The backing
/// store ratio is handled by the surface scale, so canvas units are CSS
/// pixels of the logical canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasTransform {
    /// Top-left of the canvas bounding box in client coordinates.
    pub origin: Point,
    /// Rendered size of the bounding box.
    pub css_size: (f32, f32),
    /// Logical drawing size of the canvas.
    pub logical_size: (f32, f32),
}

impl CanvasTransform {
    pub fn identity(width: f32, height: f32) -> Self {
        Self {
            origin: Point::ORIGIN,
            css_size: (width, height),
            logical_size: (width, height),
        }
    }

    pub fn client_to_canvas(&self, client: Point) -> Point {
        let scale_x = scale_factor(self.logical_size.0, self.css_size.0);
        let scale_y = scale_factor(self.logical_size.1, self.css_size.1);
        let local = client - self.origin;
        Point::new(local.x * scale_x, local.y * scale_y)
    }
}

fn scale_factor(logical: f32, css: f32) -> f32 {
    if css > 0.0 && css.is_finite() && logical.is_finite() {
        logical / css
    } else {
        1.0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    DraggingNode {
        node_ids: Vec<String>,
        /// Last pointer position in graph space.
        last: Point,
        moved: bool,
    },
    MarqueeSelecting {
        start: Point,
        current: Point,
        additive: bool,
    },
    Panning {
        /// Last pointer position in canvas space.
        last: Point,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GestureOutcome {
    pub actions: Vec<Action>,
    pub prevent_default: bool,
}

impl GestureOutcome {
    fn with(actions: Vec<Action>) -> Self {
        Self {
            actions,
            prevent_default: true,
        }
    }

    fn none() -> Self {
        Self::with(Vec::new())
    }
}

/// What the gesture layer needs to read for one event.
#[derive(Debug, Clone, Copy)]
pub struct GestureContext<'a> {
    pub visual: Option<&'a VisualGraph>,
    pub viewport: &'a Viewport,
    pub selection: &'a SelectionState,
}

impl GestureContext<'_> {
    fn hit(&self, graph_point: Point) -> Option<HitTarget> {
        self.visual.and_then(|visual| visual.hit_test(graph_point))
    }
}

#[derive(Debug, Clone)]
pub struct GestureController {
    state: GestureState,
    transform: CanvasTransform,
}

impl GestureController {
    pub fn new(transform: CanvasTransform) -> Self {
        Self {
            state: GestureState::Idle,
            transform,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn transform(&self) -> CanvasTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: CanvasTransform) {
        self.transform = transform;
    }

    pub fn handle(&mut self, event: &PointerEvent, ctx: &GestureContext<'_>) -> GestureOutcome {
        match *event {
            PointerEvent::MouseDown {
                point,
                button,
                modifiers,
            } => self.mouse_down(point, button, modifiers, ctx),
            PointerEvent::MouseMove { point } => self.mouse_move(point, ctx),
            PointerEvent::MouseUp { point } => self.mouse_up(point, ctx),
            PointerEvent::DoubleClick { point } => self.double_click(point, ctx),
            PointerEvent::Wheel { point, delta, ctrl } => self.wheel(point, delta, ctrl),
            PointerEvent::PointerLeave => self.pointer_leave(ctx),
            PointerEvent::EndDrag => self.end_drag(ctx),
        }
    }

    fn to_graph(&self, client: Point, ctx: &GestureContext<'_>) -> Point {
        ctx.viewport.to_graph(self.transform.client_to_canvas(client))
    }

    pub fn mouse_down(
        &mut self,
        client: Point,
        button: MouseButton,
        modifiers: Modifiers,
        ctx: &GestureContext<'_>,
    ) -> GestureOutcome {
        if button != MouseButton::Primary {
            return GestureOutcome::none();
        }
        let graph_point = self.to_graph(client, ctx);
        let mut actions = Vec::new();

        match ctx.hit(graph_point) {
            Some(HitTarget::Node(id)) => {
                let node_ids: Vec<String> = if ctx.selection.is_node_selected(&id) {
                    ctx.selection.selected_node_ids.iter().cloned().collect()
                } else {
                    actions.push(Action::SelectNodes {
                        node_ids: vec![id.clone()],
                        additive: modifiers.shift,
                    });
                    if modifiers.shift {
                        let mut ids: Vec<String> =
                            ctx.selection.selected_node_ids.iter().cloned().collect();
                        ids.push(id);
                        ids.sort();
                        ids
                    } else {
                        vec![id]
                    }
                };
                self.state = GestureState::DraggingNode {
                    node_ids,
                    last: graph_point,
                    moved: false,
                };
            }
            Some(HitTarget::Relationship(id)) => {
                actions.push(Action::SelectRelationship {
                    relationship_id: id,
                    additive: modifiers.shift,
                });
            }
            None if modifiers.alt => {
                self.state = GestureState::Panning {
                    last: self.transform.client_to_canvas(client),
                };
            }
            None => {
                if !modifiers.shift {
                    actions.push(Action::ClearSelection);
                }
                self.state = GestureState::MarqueeSelecting {
                    start: graph_point,
                    current: graph_point,
                    additive: modifiers.shift,
                };
            }
        }
        GestureOutcome::with(actions)
    }

    pub fn mouse_move(&mut self, client: Point, ctx: &GestureContext<'_>) -> GestureOutcome {
        let graph_point = self.to_graph(client, ctx);
        let mut actions = Vec::new();
        match &mut self.state {
            GestureState::Idle => {}
            GestureState::DraggingNode {
                node_ids,
                last,
                moved,
            } => {
                let delta = graph_point - *last;
                if delta != Point::ORIGIN {
                    actions.push(Action::MoveNodes {
                        node_ids: node_ids.clone(),
                        delta,
                    });
                    *last = graph_point;
                    *moved = true;
                }
            }
            GestureState::MarqueeSelecting { start, current, .. } => {
                *current = graph_point;
                actions.push(Action::SetMarquee(Some(Rect::from_corners(*start, *current))));
            }
            GestureState::Panning { last } => {
                let canvas_point = self.transform.client_to_canvas(client);
                let delta = canvas_point - *last;
                if delta != Point::ORIGIN {
                    actions.push(Action::Pan { delta });
                    *last = canvas_point;
                }
            }
        }
        GestureOutcome::with(actions)
    }

    pub fn mouse_up(&mut self, client: Point, ctx: &GestureContext<'_>) -> GestureOutcome {
        let moved = self.mouse_move(client, ctx);
        let mut actions = moved.actions;
        actions.extend(self.commit(ctx));
        GestureOutcome::with(actions)
    }

    pub fn pointer_leave(&mut self, ctx: &GestureContext<'_>) -> GestureOutcome {
        GestureOutcome::with(self.commit(ctx))
    }

    /// Force the machine back to idle, committing like a mouse up.
    pub fn end_drag(&mut self, ctx: &GestureContext<'_>) -> GestureOutcome {
        GestureOutcome::with(self.commit(ctx))
    }

    pub fn double_click(&mut self, client: Point, ctx: &GestureContext<'_>) -> GestureOutcome {
        let graph_point = self.to_graph(client, ctx);
        let actions = match ctx.hit(graph_point) {
            Some(HitTarget::Node(node_id)) => vec![Action::StartEditing { node_id }],
            Some(HitTarget::Relationship(_)) => Vec::new(),
            None => vec![Action::CreateNode {
                position: graph_point,
            }],
        };
        GestureOutcome::with(actions)
    }

    /// Ctrl+wheel zooms toward the cursor, plain wheel pans.
    pub fn wheel(&mut self, client: Point, delta: Point, ctrl: bool) -> GestureOutcome {
        let canvas_point = self.transform.client_to_canvas(client);
        let action = if ctrl {
            let factor = if delta.y < 0.0 {
                WHEEL_ZOOM_STEP
            } else if delta.y > 0.0 {
                1.0 / WHEEL_ZOOM_STEP
            } else {
                return GestureOutcome::none();
            };
            Action::Zoom {
                focus: canvas_point,
                factor,
            }
        } else {
            Action::Pan {
                delta: delta * -1.0,
            }
        };
        GestureOutcome::with(vec![action])
    }

    fn commit(&mut self, ctx: &GestureContext<'_>) -> Vec<Action> {
        match std::mem::replace(&mut self.state, GestureState::Idle) {
            GestureState::Idle | GestureState::Panning { .. } => Vec::new(),
            GestureState::DraggingNode { moved: true, .. } => vec![Action::EndDrag],
            // A click that never moved has no drag to finish.
            GestureState::DraggingNode { moved: false, .. } => Vec::new(),
            GestureState::MarqueeSelecting {
                start,
                current,
                additive,
            } => {
                let rect = Rect::from_corners(start, current);
                let node_ids = ctx
                    .visual
                    .map(|visual| visual.nodes_in_rect(rect))
                    .unwrap_or_default();
                vec![
                    Action::SelectNodes { node_ids, additive },
                    Action::SetMarquee(None),
                ]
            }
        }
    }
}
