use crate::assets::{AssetCache, FileAssetLoader};
use crate::config::{Dimension, load_config};
use crate::ir::{LogicalGraph, SelectionState, parse_graph};
use crate::layout::{derive_visual_graph, style::NODE_IMAGE};
use crate::layout_dump::write_layout_dump;
use crate::render::{fit_viewport, render_svg, write_output_svg};
use crate::surface::SvgSurface;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const FIT_MARGIN: f32 = 24.0;

#[derive(Parser, Debug)]
#[command(name = "ngc", version, about = "Derive and render a node graph document")]
pub struct Args {
    /// Input graph document (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format. Inferred from the output extension when omitted.
    #[arg(short = 'e', long = "outputFormat", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Write the derived visual graph as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Measure text with the width table instead of system fonts
    #[arg(long = "fastTextMetrics")]
    pub fast_text_metrics: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = Dimension::Pixels(width);
    }
    if let Some(height) = args.height {
        config.render.height = Dimension::Pixels(height);
    }
    config.theme.background = config.render.background.clone();

    let input = read_input(args.input.as_deref())?;
    let graph = parse_graph(&input)?;
    let base_dir = args
        .input
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));
    let assets = load_assets(&graph, &FileAssetLoader::new(base_dir));

    let mut surface = SvgSurface::new(1, 1).with_fast_metrics(args.fast_text_metrics || config.layout.fast_text_metrics);
    let visual = derive_visual_graph(
        &graph,
        &SelectionState::default(),
        &assets,
        &mut surface,
        &config.theme,
        &config.layout,
    )?;
    tracing::info!(
        nodes = visual.nodes().count(),
        relationships = visual.relationship_count(),
        "graph derived"
    );

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &visual)?;
    }

    let (natural_w, natural_h) = visual
        .bounds()
        .map(|rect| {
            let padded = rect.with_padding(FIT_MARGIN);
            (padded.width, padded.height)
        })
        .unwrap_or((1.0, 1.0));
    let width = config.render.width.resolve(natural_w).max(1.0);
    let height = config.render.height.resolve(natural_h).max(1.0);
    let viewport = fit_viewport(&visual, width, height, FIT_MARGIN);
    let svg = render_svg(&visual, &config.theme, &viewport);

    match resolve_format(args.output_format, args.output.as_deref()) {
        OutputFormat::Svg => write_output_svg(&svg, args.output.as_deref())?,
        OutputFormat::Png => {
            let output = args
                .output
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Output path required for png output"))?;
            write_png(&svg, output, &config.theme.font_family)?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn resolve_format(explicit: Option<OutputFormat>, output: Option<&Path>) -> OutputFormat {
    if let Some(format) = explicit {
        return format;
    }
    let is_png = output
        .and_then(|path| path.extension())
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if is_png {
        OutputFormat::Png
    } else {
        OutputFormat::Svg
    }
}

/// Image keys referenced by node styles, falling back to the graph style.
fn image_keys(graph: &LogicalGraph) -> BTreeSet<String> {
    graph
        .nodes
        .iter()
        .filter_map(|node| node.style.text(NODE_IMAGE).or_else(|| graph.style.text(NODE_IMAGE)))
        .map(str::to_string)
        .collect()
}

fn load_assets(graph: &LogicalGraph, loader: &FileAssetLoader) -> AssetCache {
    let mut cache = AssetCache::new();
    for key in image_keys(graph) {
        let ticket = cache.request(&key);
        let result = loader.load(&key);
        if let Err(reason) = &result {
            tracing::warn!(key = %key, reason = %reason, "image unavailable, drawing placeholder");
        }
        cache.complete(&ticket, result);
    }
    cache
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, font_family: &str) -> Result<()> {
    crate::render::write_output_png(svg, output, font_family)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _font_family: &str) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}
