use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub node_color: String,
    pub node_border_color: String,
    pub node_border_width: f32,
    pub caption_color: String,
    pub relationship_color: String,
    pub relationship_width: f32,
    pub type_color: String,
    pub type_font_size: f32,
    pub selection_color: String,
    pub editing_color: String,
    pub placeholder_color: String,
    pub background: String,
    pub guide_color: String,
    pub marquee_fill: String,
    pub marquee_stroke: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"Helvetica Neue\", Helvetica, Arial, sans-serif".to_string(),
            font_size: 14.0,
            node_color: "#FFFFFF".to_string(),
            node_border_color: "#000000".to_string(),
            node_border_width: 2.0,
            caption_color: "#000000".to_string(),
            relationship_color: "#000000".to_string(),
            relationship_width: 1.0,
            type_color: "#000000".to_string(),
            type_font_size: 12.0,
            selection_color: "#4A90E2".to_string(),
            editing_color: "#F5A623".to_string(),
            placeholder_color: "#9B9B9B".to_string(),
            background: "#FFFFFF".to_string(),
            guide_color: "#F0F0F0".to_string(),
            marquee_fill: "rgba(74, 144, 226, 0.12)".to_string(),
            marquee_stroke: "#4A90E2".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            node_color: "#F8FAFF".to_string(),
            node_border_color: "#7A8AA6".to_string(),
            node_border_width: 1.5,
            caption_color: "#1C2430".to_string(),
            relationship_color: "#7A8AA6".to_string(),
            relationship_width: 1.4,
            type_color: "#1C2430".to_string(),
            type_font_size: 11.0,
            selection_color: "#3B82F6".to_string(),
            editing_color: "#F59E0B".to_string(),
            placeholder_color: "#C7D2E5".to_string(),
            background: "#FFFFFF".to_string(),
            guide_color: "#EEF2F8".to_string(),
            marquee_fill: "rgba(59, 130, 246, 0.10)".to_string(),
            marquee_stroke: "#3B82F6".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "modern" => Some(Self::modern()),
            "classic" | "default" | "base" => Some(Self::classic()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
