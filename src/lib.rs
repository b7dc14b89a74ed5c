pub mod assets;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod editor;
pub mod geometry;
pub mod interaction;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod renderer;
pub mod store;
pub mod surface;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use editor::Editor;
pub use layout::{LayoutError, VisualGraph, derive_visual_graph};
pub use renderer::{RenderHost, Renderer, RendererError, RendererOptions, create_renderer};
pub use store::{Action, EditorState, Store};
