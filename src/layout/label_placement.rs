use std::f32::consts::{FRAC_PI_2, PI};

use crate::config::LayoutConfig;
use crate::geometry::{Point, normalize_angle};
use crate::surface::{DrawingSurface, FontSpec};
use crate::theme::Theme;

use super::text::measure_single_line;
use super::types::is_degenerate;
use super::{CurveGeometry, RelationshipLabel, ResolvedRelationshipStyle};

/// Rotate text so it never reads upside down: result lies in `(-PI/2, PI/2]`.
fn upright_angle(angle: f32) -> f32 {
    let angle = normalize_angle(angle);
    if angle > FRAC_PI_2 {
        angle - PI
    } else if angle <= -FRAC_PI_2 {
        angle + PI
    } else {
        angle
    }
}

/// Place the relationship type at the curve's parametric midpoint, pushed off
/// the curve along its normal. Curves put the label on their bulge side,
/// straight segments above the line.
pub(super) fn place_label(
    text: &str,
    curve: &CurveGeometry,
    axis_angle: f32,
    style: &ResolvedRelationshipStyle,
    theme: &Theme,
    config: &LayoutConfig,
    surface: &mut dyn DrawingSurface,
) -> Option<RelationshipLabel> {
    if text.trim().is_empty() {
        return None;
    }
    let font = FontSpec::new(&theme.font_family, style.type_font_size);
    let (width, height) = measure_single_line(text, &font, surface);

    let anchor = curve.point_at(0.5);
    let tangent = curve.tangent_at(0.5);
    let direction = if is_degenerate(tangent) {
        Point::from_angle(axis_angle)
    } else {
        tangent.normalized().unwrap_or_else(|| Point::from_angle(axis_angle))
    };
    let mut normal = direction.perpendicular();

    match curve {
        CurveGeometry::Straight { .. } => {
            if normal.y > 0.0 || (normal.y == 0.0 && normal.x > 0.0) {
                normal = normal * -1.0;
            }
        }
        _ => {
            let chord_mid = curve.start().midpoint(curve.end());
            if (anchor - chord_mid).dot(normal) < 0.0 {
                normal = normal * -1.0;
            }
        }
    }

    let distance = config.label_clearance + height / 2.0;
    Some(RelationshipLabel {
        text: text.to_string(),
        position: anchor + normal * distance,
        angle: upright_angle(direction.y.atan2(direction.x)),
        width,
        height,
    })
}
