use crate::layout::{BundleKey, CurveGeometry, NodeImage, VisualGraph};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// JSON snapshot of one derivation pass. Two passes over identical input
/// serialise to identical bytes.
#[derive(Debug, Serialize)]
pub struct VisualGraphDump {
    pub bounds: Option<[f32; 4]>,
    pub nodes: Vec<NodeDump>,
    pub bundles: Vec<BundleDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub caption_lines: Vec<String>,
    pub caption_width: f32,
    pub caption_height: f32,
    pub selected: bool,
    pub editing: bool,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BundleDump {
    pub kind: String,
    pub nodes: [String; 2],
    pub members: Vec<MemberDump>,
}

#[derive(Debug, Serialize)]
pub struct MemberDump {
    pub id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub from: String,
    pub to: String,
    pub start: [f32; 3],
    pub end: [f32; 3],
    pub offset: f32,
    pub curve: CurveGeometry,
    pub arrowhead: [[f32; 2]; 3],
    pub label: Option<LabelDump>,
}

#[derive(Debug, Serialize)]
pub struct LabelDump {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

impl VisualGraphDump {
    pub fn from_visual(visual: &VisualGraph) -> Self {
        let nodes = visual
            .nodes()
            .map(|node| NodeDump {
                id: node.id.clone(),
                x: node.position.x,
                y: node.position.y,
                radius: node.radius,
                caption_lines: node.caption.lines.clone(),
                caption_width: node.caption.width,
                caption_height: node.caption.height,
                selected: node.selected,
                editing: node.editing,
                image: node.image.as_ref().map(|image| match image {
                    NodeImage::Ready(_) => "ready".to_string(),
                    NodeImage::Placeholder { .. } => "placeholder".to_string(),
                }),
            })
            .collect();

        let bundles = visual
            .bundles()
            .iter()
            .map(|bundle| {
                let (kind, lo, hi) = match &bundle.key {
                    BundleKey::Pair(lo, hi) => ("pair", lo, hi),
                    BundleKey::SelfLoop(id) => ("self-loop", id, id),
                };
                BundleDump {
                    kind: kind.to_string(),
                    nodes: [lo.clone(), hi.clone()],
                    members: bundle
                        .routes
                        .iter()
                        .map(|route| {
                            let rel = &route.relationship;
                            MemberDump {
                                id: rel.id.clone(),
                                rel_type: rel.rel_type.clone(),
                                from: rel.start_node_id.clone(),
                                to: rel.end_node_id.clone(),
                                start: [rel.start.point.x, rel.start.point.y, rel.start.angle],
                                end: [rel.end.point.x, rel.end.point.y, rel.end.angle],
                                offset: route.offset,
                                curve: route.curve,
                                arrowhead: route.arrowhead.map(|p| [p.x, p.y]),
                                label: route.label.as_ref().map(|label| LabelDump {
                                    text: label.text.clone(),
                                    x: label.position.x,
                                    y: label.position.y,
                                    angle: label.angle,
                                }),
                            }
                        })
                        .collect(),
                }
            })
            .collect();

        VisualGraphDump {
            bounds: visual
                .bounds()
                .map(|rect| [rect.x, rect.y, rect.width, rect.height]),
            nodes,
            bundles,
        }
    }
}

pub fn write_layout_dump(path: &Path, visual: &VisualGraph) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = VisualGraphDump::from_visual(visual);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

pub fn layout_dump_json(visual: &VisualGraph) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&VisualGraphDump::from_visual(visual))?)
}
