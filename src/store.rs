//! Explicit editor state container.
//!
//! All mutations go through [`Store::dispatch`], which reduces one
//! [`Action`], bumps the affected [`Revisions`] and notifies subscribers
//! before returning.

use crate::assets::{AssetCache, ImageAsset, LoadTicket};
use crate::geometry::{Point, Rect};
use crate::ir::{LogicalGraph, SelectionState};
use crate::layout::Viewport;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateNode {
        position: Point,
    },
    DeleteSelection,
    WindowResized {
        width: f32,
        height: f32,
    },
    /// Translate nodes by a graph-space delta.
    MoveNodes {
        node_ids: Vec<String>,
        delta: Point,
    },
    SelectNodes {
        node_ids: Vec<String>,
        additive: bool,
    },
    SelectRelationship {
        relationship_id: String,
        additive: bool,
    },
    ClearSelection,
    StartEditing {
        node_id: String,
    },
    StopEditing,
    SetCaption {
        node_id: String,
        caption: String,
    },
    /// Canvas-space pan delta.
    Pan {
        delta: Point,
    },
    /// Zoom by `factor` around `focus` (canvas coordinates).
    Zoom {
        focus: Point,
        factor: f32,
    },
    SetMarquee(Option<Rect>),
    EndDrag,
    AssetRequested {
        key: String,
    },
    AssetLoaded {
        ticket: LoadTicket,
        result: Result<ImageAsset, String>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateNode { .. } => "create_node",
            Action::DeleteSelection => "delete_selection",
            Action::WindowResized { .. } => "window_resized",
            Action::MoveNodes { .. } => "move_nodes",
            Action::SelectNodes { .. } => "select_nodes",
            Action::SelectRelationship { .. } => "select_relationship",
            Action::ClearSelection => "clear_selection",
            Action::StartEditing { .. } => "start_editing",
            Action::StopEditing => "stop_editing",
            Action::SetCaption { .. } => "set_caption",
            Action::Pan { .. } => "pan",
            Action::Zoom { .. } => "zoom",
            Action::SetMarquee(_) => "set_marquee",
            Action::EndDrag => "end_drag",
            Action::AssetRequested { .. } => "asset_requested",
            Action::AssetLoaded { .. } => "asset_loaded",
        }
    }
}

/// Counters used as the memoisation key for derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Revisions {
    pub graph: u64,
    pub selection: u64,
    pub assets: u64,
}

#[derive(Debug, Clone)]
pub struct EditorState {
    pub graph: LogicalGraph,
    pub selection: SelectionState,
    pub assets: AssetCache,
    pub viewport: Viewport,
    /// Marquee rectangle in graph coordinates while a selection drag runs.
    pub marquee: Option<Rect>,
    pub dragging: bool,
}

impl EditorState {
    pub fn new(graph: LogicalGraph, width: f32, height: f32) -> Self {
        Self {
            graph,
            selection: SelectionState::default(),
            assets: AssetCache::new(),
            viewport: Viewport::new(width, height),
            marquee: None,
            dragging: false,
        }
    }
}

pub type Listener = Box<dyn FnMut(&EditorState, Revisions)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(usize);

pub struct Store {
    state: EditorState,
    revisions: Revisions,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: usize,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("revisions", &self.revisions)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Store {
    pub fn new(state: EditorState) -> Self {
        let revisions = Revisions {
            assets: state.assets.revision(),
            ..Default::default()
        };
        Self {
            state,
            revisions,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn revisions(&self) -> Revisions {
        self.revisions
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EditorState, Revisions) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn dispatch(&mut self, action: Action) {
        tracing::trace!(action = action.name(), "dispatch");
        self.reduce(action);
        let revisions = self.revisions;
        for (_, listener) in &mut self.listeners {
            listener(&self.state, revisions);
        }
    }

    fn reduce(&mut self, action: Action) {
        let state = &mut self.state;
        match action {
            Action::CreateNode { position } => {
                let id = state.graph.next_node_id();
                state.graph.add_node(&id, position, "");
                state.selection.clear();
                state.selection.selected_node_ids.insert(id);
                self.revisions.graph += 1;
                self.revisions.selection += 1;
            }
            Action::DeleteSelection => {
                if state.selection.is_empty() {
                    return;
                }
                let nodes = std::mem::take(&mut state.selection.selected_node_ids);
                let relationships = std::mem::take(&mut state.selection.selected_relationship_ids);
                state.graph.nodes.retain(|node| !nodes.contains(&node.id));
                state.graph.relationships.retain(|rel| {
                    !relationships.contains(&rel.id)
                        && !nodes.contains(&rel.from_id)
                        && !nodes.contains(&rel.to_id)
                });
                if state
                    .selection
                    .editing_id
                    .as_ref()
                    .is_some_and(|id| nodes.contains(id))
                {
                    state.selection.editing_id = None;
                }
                self.revisions.graph += 1;
                self.revisions.selection += 1;
            }
            Action::WindowResized { width, height } => {
                state.viewport.width = width.max(1.0);
                state.viewport.height = height.max(1.0);
            }
            Action::MoveNodes { node_ids, delta } => {
                let mut moved = false;
                for id in &node_ids {
                    if let Some(node) = state.graph.node_mut(id) {
                        node.position = node.position + delta;
                        moved = true;
                    }
                }
                state.dragging = true;
                if moved {
                    self.revisions.graph += 1;
                }
            }
            Action::SelectNodes { node_ids, additive } => {
                if !additive {
                    state.selection.clear();
                }
                state.selection.selected_node_ids.extend(node_ids);
                self.revisions.selection += 1;
            }
            Action::SelectRelationship {
                relationship_id,
                additive,
            } => {
                if !additive {
                    state.selection.clear();
                }
                state
                    .selection
                    .selected_relationship_ids
                    .insert(relationship_id);
                self.revisions.selection += 1;
            }
            Action::ClearSelection => {
                state.selection.clear();
                state.selection.editing_id = None;
                self.revisions.selection += 1;
            }
            Action::StartEditing { node_id } => {
                if state.graph.node(&node_id).is_none() {
                    tracing::debug!(node = %node_id, "ignoring edit request for unknown node");
                    return;
                }
                state.selection.clear();
                state.selection.selected_node_ids.insert(node_id.clone());
                state.selection.editing_id = Some(node_id);
                self.revisions.selection += 1;
            }
            Action::StopEditing => {
                if state.selection.editing_id.take().is_some() {
                    self.revisions.selection += 1;
                }
            }
            Action::SetCaption { node_id, caption } => {
                if let Some(node) = state.graph.node_mut(&node_id) {
                    node.caption = caption;
                    self.revisions.graph += 1;
                }
            }
            Action::Pan { delta } => state.viewport.pan_by(delta),
            Action::Zoom { focus, factor } => state.viewport.zoom_at(focus, factor),
            Action::SetMarquee(rect) => state.marquee = rect,
            Action::EndDrag => {
                if state.dragging {
                    tracing::debug!(graph_revision = self.revisions.graph, "drag committed");
                }
                state.dragging = false;
            }
            Action::AssetRequested { key } => {
                state.assets.request(&key);
                self.revisions.assets = state.assets.revision();
            }
            Action::AssetLoaded { ticket, result } => {
                state.assets.complete(&ticket, result);
                self.revisions.assets = state.assets.revision();
            }
        }
    }
}
