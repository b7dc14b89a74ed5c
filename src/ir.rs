use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Free-form style map attached to graphs, nodes and relationships.
///
/// Lookups are typed and lenient: a value of the wrong JSON type reads as
/// absent so resolution falls through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Style(BTreeMap<String, Value>);

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f32> {
        let value = match self.0.get(key)? {
            Value::Number(n) => n.as_f64()? as f32,
            Value::String(s) => s.trim().trim_end_matches("px").parse::<f32>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub position: Point,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(rename = "type", default)]
    pub rel_type: String,
    #[serde(default)]
    pub style: Style,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicalGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub style: Style,
}

impl LogicalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn relationship(&self, id: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|rel| rel.id == id)
    }

    pub fn add_node(&mut self, id: &str, position: Point, caption: &str) -> &mut Node {
        self.nodes.push(Node {
            id: id.to_string(),
            position,
            caption: caption.to_string(),
            style: Style::default(),
        });
        let last = self.nodes.len() - 1;
        &mut self.nodes[last]
    }

    pub fn add_relationship(
        &mut self,
        id: &str,
        from_id: &str,
        to_id: &str,
        rel_type: &str,
    ) -> &mut Relationship {
        self.relationships.push(Relationship {
            id: id.to_string(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            rel_type: rel_type.to_string(),
            style: Style::default(),
        });
        let last = self.relationships.len() - 1;
        &mut self.relationships[last]
    }

    /// Smallest `n<k>` id not used by any node.
    pub fn next_node_id(&self) -> String {
        let used: BTreeSet<&str> = self.nodes.iter().map(|node| node.id.as_str()).collect();
        let mut idx = self.nodes.len();
        loop {
            let candidate = format!("n{idx}");
            if !used.contains(candidate.as_str()) {
                return candidate;
            }
            idx += 1;
        }
    }
}

/// Parse a graph document. Accepts strict JSON as well as JSON5.
pub fn parse_graph(input: &str) -> anyhow::Result<LogicalGraph> {
    if let Ok(graph) = serde_json::from_str::<LogicalGraph>(input) {
        return Ok(graph);
    }
    let graph = json5::from_str::<LogicalGraph>(input)?;
    Ok(graph)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    #[serde(default)]
    pub selected_node_ids: BTreeSet<String>,
    #[serde(default)]
    pub selected_relationship_ids: BTreeSet<String>,
    #[serde(default)]
    pub editing_id: Option<String>,
}

impl SelectionState {
    pub fn is_node_selected(&self, id: &str) -> bool {
        self.selected_node_ids.contains(id)
    }

    pub fn is_relationship_selected(&self, id: &str) -> bool {
        self.selected_relationship_ids.contains(id)
    }

    pub fn is_editing(&self, id: &str) -> bool {
        self.editing_id.as_deref() == Some(id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected_node_ids.is_empty() && self.selected_relationship_ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected_node_ids.clear();
        self.selected_relationship_ids.clear();
    }
}
