use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::Path;

/// Fan-out tuning for relationships that share a node pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanOutConfig {
    /// Arc length between neighbouring attachment points, as a fraction of the
    /// smaller node radius of the pair.
    pub separation_ratio: f32,
    /// Upper bound on the total angular spread of one bundle at a node.
    pub max_spread: f32,
    /// Perpendicular distance between neighbouring curves at their apex.
    pub bundle_separation: f32,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            separation_ratio: 0.5,
            max_spread: PI * 0.75,
            bundle_separation: 24.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfLoopConfig {
    /// Direction the loop points to (radians, y axis down; `-PI/2` is up).
    pub orientation: f32,
    /// Half of the angle between the two attachment points.
    pub half_angle: f32,
    /// How far the loop bulges out, relative to the node radius.
    pub bulge_ratio: f32,
    /// Extra bulge per additional loop on the same node.
    pub nesting_step: f32,
}

impl Default for SelfLoopConfig {
    fn default() -> Self {
        Self {
            orientation: -PI / 2.0,
            half_angle: PI / 6.0,
            bulge_ratio: 1.6,
            nesting_step: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub min_node_radius: f32,
    pub node_padding: f32,
    pub caption_max_width_chars: usize,
    pub label_line_height: f32,
    pub fast_text_metrics: bool,
    pub label_clearance: f32,
    pub hit_tolerance: f32,
    pub arrowhead_length: f32,
    pub arrowhead_width: f32,
    pub guide_spacing: f32,
    pub fan_out: FanOutConfig,
    pub self_loop: SelfLoopConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_node_radius: 10.0,
            node_padding: 10.0,
            caption_max_width_chars: 16,
            label_line_height: 1.2,
            fast_text_metrics: false,
            label_clearance: 4.0,
            hit_tolerance: 5.0,
            arrowhead_length: 10.0,
            arrowhead_width: 8.0,
            guide_spacing: 40.0,
            fan_out: FanOutConfig::default(),
            self_loop: SelfLoopConfig::default(),
        }
    }
}

/// A length that is either absolute or relative to a container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NumberOrString", into = "NumberOrString")]
pub enum Dimension {
    Pixels(f32),
    Percent(f32),
}

impl Dimension {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Some(percent) = trimmed.strip_suffix('%') {
            let value = percent.trim().parse::<f32>().ok()?;
            return (value.is_finite() && value >= 0.0).then_some(Dimension::Percent(value));
        }
        let value = trimmed.trim_end_matches("px").trim().parse::<f32>().ok()?;
        (value.is_finite() && value >= 0.0).then_some(Dimension::Pixels(value))
    }

    /// Resolve against the container extent along the same axis.
    pub fn resolve(self, container: f32) -> f32 {
        match self {
            Dimension::Pixels(value) => value,
            Dimension::Percent(value) => container * value / 100.0,
        }
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Dimension::Percent(100.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    String(String),
}

impl TryFrom<NumberOrString> for Dimension {
    type Error = String;

    fn try_from(value: NumberOrString) -> Result<Self, Self::Error> {
        match value {
            NumberOrString::Number(val) if val.is_finite() && val >= 0.0 => {
                Ok(Dimension::Pixels(val))
            }
            NumberOrString::Number(val) => Err(format!("invalid dimension: {val}")),
            NumberOrString::String(val) => {
                Dimension::parse(&val).ok_or_else(|| format!("invalid dimension: {val:?}"))
            }
        }
    }
}

impl From<Dimension> for NumberOrString {
    fn from(value: Dimension) -> Self {
        match value {
            Dimension::Pixels(val) => NumberOrString::Number(val),
            Dimension::Percent(val) => NumberOrString::String(format!("{val}%")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: Dimension,
    pub height: Dimension,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: Dimension::Pixels(1200.0),
            height: Dimension::Pixels(800.0),
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    node_color: Option<String>,
    node_border_color: Option<String>,
    node_border_width: Option<f32>,
    caption_color: Option<String>,
    relationship_color: Option<String>,
    relationship_width: Option<f32>,
    type_color: Option<String>,
    type_font_size: Option<f32>,
    selection_color: Option<String>,
    editing_color: Option<String>,
    background: Option<String>,
    guide_color: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FanOutConfigFile {
    separation_ratio: Option<f32>,
    max_spread: Option<f32>,
    bundle_separation: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SelfLoopConfigFile {
    orientation: Option<f32>,
    half_angle: Option<f32>,
    bulge_ratio: Option<f32>,
    nesting_step: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    min_node_radius: Option<f32>,
    node_padding: Option<f32>,
    caption_max_width_chars: Option<usize>,
    label_line_height: Option<f32>,
    fast_text_metrics: Option<bool>,
    label_clearance: Option<f32>,
    hit_tolerance: Option<f32>,
    arrowhead_length: Option<f32>,
    arrowhead_width: Option<f32>,
    guide_spacing: Option<f32>,
    fan_out: Option<FanOutConfigFile>,
    self_loop: Option<SelfLoopConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<Dimension>,
    height: Option<Dimension>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::from_name(theme_name) {
            Some(theme) => config.theme = theme,
            None => tracing::warn!(theme = theme_name, "unknown theme name, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.node_color {
            config.theme.node_color = v;
        }
        if let Some(v) = vars.node_border_color {
            config.theme.node_border_color = v;
        }
        if let Some(v) = vars.node_border_width {
            config.theme.node_border_width = v;
        }
        if let Some(v) = vars.caption_color {
            config.theme.caption_color = v;
        }
        if let Some(v) = vars.relationship_color {
            config.theme.relationship_color = v;
        }
        if let Some(v) = vars.relationship_width {
            config.theme.relationship_width = v;
        }
        if let Some(v) = vars.type_color {
            config.theme.type_color = v;
        }
        if let Some(v) = vars.type_font_size {
            config.theme.type_font_size = v;
        }
        if let Some(v) = vars.selection_color {
            config.theme.selection_color = v;
        }
        if let Some(v) = vars.editing_color {
            config.theme.editing_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.guide_color {
            config.theme.guide_color = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.min_node_radius {
            config.layout.min_node_radius = v.max(1.0);
        }
        if let Some(v) = layout.node_padding {
            config.layout.node_padding = v;
        }
        if let Some(v) = layout.caption_max_width_chars {
            config.layout.caption_max_width_chars = v.max(1);
        }
        if let Some(v) = layout.label_line_height {
            config.layout.label_line_height = v;
        }
        if let Some(v) = layout.fast_text_metrics {
            config.layout.fast_text_metrics = v;
        }
        if let Some(v) = layout.label_clearance {
            config.layout.label_clearance = v;
        }
        if let Some(v) = layout.hit_tolerance {
            config.layout.hit_tolerance = v;
        }
        if let Some(v) = layout.arrowhead_length {
            config.layout.arrowhead_length = v;
        }
        if let Some(v) = layout.arrowhead_width {
            config.layout.arrowhead_width = v;
        }
        if let Some(v) = layout.guide_spacing {
            config.layout.guide_spacing = v;
        }
        if let Some(fan_out) = layout.fan_out {
            if let Some(v) = fan_out.separation_ratio {
                config.layout.fan_out.separation_ratio = v;
            }
            if let Some(v) = fan_out.max_spread {
                config.layout.fan_out.max_spread = v.clamp(0.0, PI);
            }
            if let Some(v) = fan_out.bundle_separation {
                config.layout.fan_out.bundle_separation = v;
            }
        }
        if let Some(self_loop) = layout.self_loop {
            if let Some(v) = self_loop.orientation {
                config.layout.self_loop.orientation = v;
            }
            if let Some(v) = self_loop.half_angle {
                config.layout.self_loop.half_angle = v.clamp(0.05, PI / 2.0);
            }
            if let Some(v) = self_loop.bulge_ratio {
                config.layout.self_loop.bulge_ratio = v;
            }
            if let Some(v) = self_loop.nesting_step {
                config.layout.self_loop.nesting_step = v;
            }
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.background {
            config.theme.background = v;
        }
    }

    config.render.background = config.theme.background.clone();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let config = parse_config(
            r##"{
                theme: "modern",
                themeVariables: { nodeColor: "#112233", fontSize: 18 },
                layout: { minNodeRadius: 20, fanOut: { bundleSeparation: 30 } },
                render: { width: "50%", height: 600 },
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.node_color, "#112233");
        assert_eq!(config.theme.font_size, 18.0);
        assert_eq!(config.theme.font_family, Theme::modern().font_family);
        assert_eq!(config.layout.min_node_radius, 20.0);
        assert_eq!(config.layout.fan_out.bundle_separation, 30.0);
        assert_eq!(
            config.layout.fan_out.separation_ratio,
            FanOutConfig::default().separation_ratio
        );
        assert_eq!(config.render.width, Dimension::Percent(50.0));
        assert_eq!(config.render.height, Dimension::Pixels(600.0));
    }

    #[test]
    fn dimension_parses_pixels_and_percentages() {
        assert_eq!(Dimension::parse("75%"), Some(Dimension::Percent(75.0)));
        assert_eq!(Dimension::parse("320px"), Some(Dimension::Pixels(320.0)));
        assert_eq!(Dimension::parse("-3"), None);
        assert_eq!(Dimension::parse("wide"), None);
        assert_eq!(Dimension::Percent(50.0).resolve(800.0), 400.0);
        assert_eq!(Dimension::Pixels(120.0).resolve(800.0), 120.0);
    }

    #[test]
    fn rejects_invalid_dimension_in_file() {
        assert!(parse_config(r#"{ render: { width: "huge" } }"#).is_err());
    }
}
