use crate::config::{Dimension, LayoutConfig};
use crate::layout::{LayoutError, Viewport, VisualGraph, derive_visual_graph};
use crate::render::{Layer, LayerStack, Overlay};
use crate::store::{EditorState, Revisions, Store};
use crate::surface::DrawingSurface;
use crate::theme::Theme;
use thiserror::Error;

const RATIO_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RendererError {
    #[error("drawing surface {surface_id:?} is not available")]
    SurfaceUnavailable { surface_id: String },
    #[error("invalid canvas size {width}x{height}")]
    InvalidSize { width: f32, height: f32 },
}

/// Environment the renderer is mounted into.
pub trait RenderHost {
    type Surface: DrawingSurface;

    /// Size of the containing element, used to resolve percentages.
    fn container_size(&self) -> (f32, f32);

    fn device_pixel_ratio(&self) -> f32 {
        1.0
    }

    fn acquire_surface(&mut self, surface_id: &str) -> Option<Self::Surface>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererOptions {
    pub width: Dimension,
    pub height: Dimension,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            width: Dimension::Percent(100.0),
            height: Dimension::Percent(100.0),
        }
    }
}

/// Owns the drawing surface and the last derived visual graph.
///
/// Derivation is memoised on the store revisions; every `render` call
/// redraws.
#[derive(Debug)]
pub struct Renderer<S: DrawingSurface> {
    surface: S,
    theme: Theme,
    config: LayoutConfig,
    layers: LayerStack,
    logical_size: (f32, f32),
    pixel_ratio: f32,
    visual: Option<VisualGraph>,
    derived_at: Option<Revisions>,
    derivations: usize,
    last_error: Option<LayoutError>,
}

pub fn create_renderer<H: RenderHost>(
    host: &mut H,
    surface_id: &str,
    store: &Store,
    options: RendererOptions,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Renderer<H::Surface>, RendererError> {
    let Some(mut surface) = host.acquire_surface(surface_id) else {
        return Err(RendererError::SurfaceUnavailable {
            surface_id: surface_id.to_string(),
        });
    };

    let (container_w, container_h) = host.container_size();
    let width = options.width.resolve(container_w);
    let height = options.height.resolve(container_h);
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(RendererError::InvalidSize { width, height });
    }

    let backing = surface.backing_store_ratio();
    let device = host.device_pixel_ratio();
    let ratio = if backing > 0.0 && device > 0.0 {
        device / backing
    } else {
        1.0
    };
    if (ratio - 1.0).abs() > RATIO_EPSILON {
        surface.resize((width * ratio).ceil() as u32, (height * ratio).ceil() as u32);
        surface.scale(ratio, ratio);
    } else {
        surface.resize(width.ceil() as u32, height.ceil() as u32);
    }
    tracing::info!(surface_id, width, height, ratio, "renderer created");

    let mut layers = LayerStack::standard();
    layers.register(Layer::Marquee);

    let mut renderer = Renderer {
        surface,
        theme: theme.clone(),
        config: config.clone(),
        layers,
        logical_size: (width, height),
        pixel_ratio: ratio,
        visual: None,
        derived_at: None,
        derivations: 0,
        last_error: None,
    };
    renderer.render(store.state(), store.revisions());
    Ok(renderer)
}

impl<S: DrawingSurface> Renderer<S> {
    /// Re-derive if the revisions moved, then redraw.
    pub fn render(&mut self, state: &EditorState, revisions: Revisions) {
        if self.derived_at != Some(revisions) {
            self.derive(state, revisions);
        }
        let Some(visual) = &self.visual else {
            return;
        };
        let viewport = Viewport {
            width: self.logical_size.0,
            height: self.logical_size.1,
            ..state.viewport
        };
        let overlay = Overlay {
            marquee: state.marquee,
        };
        visual.draw_layers(&mut self.surface, &viewport, &self.theme, &self.layers, &overlay);
    }

    fn derive(&mut self, state: &EditorState, revisions: Revisions) {
        match derive_visual_graph(
            &state.graph,
            &state.selection,
            &state.assets,
            &mut self.surface,
            &self.theme,
            &self.config,
        ) {
            Ok(visual) => {
                self.visual = Some(visual);
                self.last_error = None;
                self.derivations += 1;
            }
            Err(err) => {
                tracing::error!(id = err.offending_id(), error = %err, "derivation failed, keeping previous frame");
                self.last_error = Some(err);
            }
        }
        self.derived_at = Some(revisions);
    }

    /// Change the logical size. The surface keeps its base scale.
    pub fn resize(&mut self, width: f32, height: f32) {
        let width = width.max(1.0);
        let height = height.max(1.0);
        self.logical_size = (width, height);
        self.surface.resize(
            (width * self.pixel_ratio).ceil() as u32,
            (height * self.pixel_ratio).ceil() as u32,
        );
    }

    pub fn visual(&self) -> Option<&VisualGraph> {
        self.visual.as_ref()
    }

    pub fn last_error(&self) -> Option<&LayoutError> {
        self.last_error.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn logical_size(&self) -> (f32, f32) {
        self.logical_size
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Number of successful derivation passes so far.
    pub fn derivations(&self) -> usize {
        self.derivations
    }

    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::ir::LogicalGraph;
    use crate::surface::{DrawCommand, RecordingSurface};

    struct TestHost {
        container: (f32, f32),
        dpr: f32,
        surface: Option<RecordingSurface>,
    }

    impl RenderHost for TestHost {
        type Surface = RecordingSurface;

        fn container_size(&self) -> (f32, f32) {
            self.container
        }

        fn device_pixel_ratio(&self) -> f32 {
            self.dpr
        }

        fn acquire_surface(&mut self, _surface_id: &str) -> Option<RecordingSurface> {
            self.surface.take()
        }
    }

    fn store() -> Store {
        let mut graph = LogicalGraph::new();
        graph.add_node("a", Point::new(0.0, 0.0), "A");
        Store::new(EditorState::new(graph, 400.0, 300.0))
    }

    #[test]
    fn missing_surface_is_an_error() {
        let mut host = TestHost {
            container: (400.0, 300.0),
            dpr: 1.0,
            surface: None,
        };
        let err = create_renderer(
            &mut host,
            "canvas",
            &store(),
            RendererOptions::default(),
            &Theme::classic(),
            &LayoutConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RendererError::SurfaceUnavailable {
                surface_id: "canvas".to_string()
            }
        );
    }

    #[test]
    fn high_density_display_scales_backing_store_once() {
        let mut host = TestHost {
            container: (400.0, 300.0),
            dpr: 2.0,
            surface: Some(RecordingSurface::new()),
        };
        let options = RendererOptions {
            width: Dimension::Percent(50.0),
            height: Dimension::Pixels(150.5),
        };
        let renderer = create_renderer(
            &mut host,
            "canvas",
            &store(),
            options,
            &Theme::classic(),
            &LayoutConfig::default(),
        )
        .unwrap();
        assert_eq!(renderer.logical_size(), (200.0, 150.5));
        assert_eq!(renderer.surface().size(), (400, 301));
        let scales = renderer
            .surface()
            .commands()
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Scale(sx, _) if *sx == 2.0))
            .count();
        assert_eq!(scales, 1);
        assert_eq!(renderer.derivations(), 1);
    }

    #[test]
    fn unchanged_revisions_skip_derivation() {
        let mut host = TestHost {
            container: (400.0, 300.0),
            dpr: 1.0,
            surface: Some(RecordingSurface::new()),
        };
        let store = store();
        let mut renderer = create_renderer(
            &mut host,
            "canvas",
            &store,
            RendererOptions::default(),
            &Theme::classic(),
            &LayoutConfig::default(),
        )
        .unwrap();
        renderer.render(store.state(), store.revisions());
        assert_eq!(renderer.derivations(), 1);
    }
}
