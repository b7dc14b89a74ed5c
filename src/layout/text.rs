use crate::config::LayoutConfig;
use crate::surface::{DrawingSurface, FontSpec};

use super::TextBlock;

const AVERAGE_WIDTH_SAMPLE: &str = "abcdefghijklmnopqrstuvwxyz";

/// Lay out a caption: explicit line breaks are kept, long lines are word
/// wrapped to `caption_max_width_chars` average characters.
pub(super) fn measure_caption(
    text: &str,
    font: &FontSpec,
    config: &LayoutConfig,
    surface: &mut dyn DrawingSurface,
) -> TextBlock {
    let line_height = font.size * config.label_line_height;
    if text.trim().is_empty() {
        return TextBlock {
            lines: vec![String::new()],
            width: 0.0,
            height: 0.0,
            font_size: font.size,
            line_height,
        };
    }

    let max_width = config.caption_max_width_chars as f32 * average_char_width(font, surface);
    let mut lines = Vec::new();
    for line in split_lines(text) {
        lines.extend(wrap_line(&line, max_width, font, surface));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    let width = lines
        .iter()
        .map(|line| surface.measure_text(line, font).width)
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * line_height;

    TextBlock {
        lines,
        width,
        height,
        font_size: font.size,
        line_height,
    }
}

/// Single-line label (relationship types): no wrapping.
pub(super) fn measure_single_line(
    text: &str,
    font: &FontSpec,
    surface: &mut dyn DrawingSurface,
) -> (f32, f32) {
    let extent = surface.measure_text(text, font);
    (extent.width, extent.height.max(font.size))
}

pub(super) fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

pub(super) fn wrap_line(
    line: &str,
    max_width: f32,
    font: &FontSpec,
    surface: &mut dyn DrawingSurface,
) -> Vec<String> {
    if surface.measure_text(line, font).width <= max_width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if surface.measure_text(&candidate, font).width > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn average_char_width(font: &FontSpec, surface: &mut dyn DrawingSurface) -> f32 {
    let sample = surface.measure_text(AVERAGE_WIDTH_SAMPLE, font).width;
    let avg = sample / AVERAGE_WIDTH_SAMPLE.len() as f32;
    if avg.is_finite() && avg > 0.0 {
        avg
    } else {
        font.size * 0.56
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;

    fn font() -> FontSpec {
        FontSpec::new("sans-serif", 14.0)
    }

    #[test]
    fn empty_caption_is_one_blank_line() {
        let mut surface = RecordingSurface::new();
        let block = measure_caption("   ", &font(), &LayoutConfig::default(), &mut surface);
        assert_eq!(block.lines, vec![String::new()]);
        assert_eq!(block.width, 0.0);
    }

    #[test]
    fn explicit_breaks_are_kept() {
        let mut surface = RecordingSurface::new();
        let block = measure_caption("Alpha\nBeta", &font(), &LayoutConfig::default(), &mut surface);
        assert_eq!(block.lines, vec!["Alpha".to_string(), "Beta".to_string()]);
        assert!((block.height - 2.0 * 14.0 * 1.2).abs() < 1e-4);
    }

    #[test]
    fn long_lines_wrap_on_words() {
        let mut surface = RecordingSurface::new();
        let config = LayoutConfig {
            caption_max_width_chars: 8,
            ..Default::default()
        };
        let block = measure_caption(
            "several short words here",
            &font(),
            &config,
            &mut surface,
        );
        assert!(block.lines.len() > 1);
        assert_eq!(block.lines.join(" "), "several short words here");
    }
}
