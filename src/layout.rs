use crate::markup::Run;
use crate::style::StyleSpec;

/// Fixed line-height multiplier. Preview and export renders share this
/// constant; changing it on one path only would make the two drift apart.
pub const LINE_HEIGHT_FACTOR: f32 = 1.4;

/// The exact font used for both measuring and painting a text block.
#[derive(Clone, Debug, PartialEq)]
pub struct TextFont {
    /// CSS-style family stack, e.g. `"Inter, sans-serif"`.
    pub stack: String,
    /// Size in pixels at the resolution being laid out.
    pub size: f32,
}

impl TextFont {
    pub fn of(style: &StyleSpec) -> Self {
        Self {
            stack: style.font.stack(),
            size: style.font_size,
        }
    }
}

/// Text-width oracle. Implementations must measure with the same font
/// resolution that later paints the text, or layout and paint diverge.
pub trait TextMeasurer {
    fn measure_text(&mut self, text: &str, font: &TextFont) -> f32;
}

/// One word (with its trailing space, if any) placed on a visual line.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub highlighted: bool,
    /// Measured width, including the fragment's own trailing space.
    pub width: f32,
}

/// An ordered row of fragments. A line with no fragments is an explicit
/// blank line produced by a break marker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Line {
    pub fragments: Vec<Fragment>,
}

impl Line {
    pub fn width(&self) -> f32 {
        self.fragments.iter().map(|f| f.width).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

/// Word-wrapped result for one text block.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<Line>,
    pub font_size: f32,
}

impl TextBlock {
    pub fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT_FACTOR
    }

    pub fn total_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height()
    }

    /// Widest line in the block.
    pub fn max_line_width(&self) -> f32 {
        self.lines.iter().map(Line::width).fold(0.0, f32::max)
    }
}

/// Greedy word-wrap of parsed runs against `max_width`.
///
/// Words keep their trailing space so measured fragment widths reproduce the
/// source spacing exactly. A break marker flushes the current line and emits
/// a blank line. A single word wider than `max_width` is never split; it is
/// placed alone on its own line.
pub fn wrap(
    runs: &[Run],
    font: &TextFont,
    max_width: f32,
    measurer: &mut dyn TextMeasurer,
) -> TextBlock {
    let mut lines = Vec::new();
    let mut current = Line::default();
    let mut current_width = 0.0f32;

    for run in runs {
        let (text, highlighted) = match run {
            Run::Break => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(Line::default());
                current_width = 0.0;
                continue;
            }
            Run::Text(t) => (t, false),
            Run::Highlight(t) => (t, true),
        };

        let words: Vec<&str> = text.split(' ').collect();
        for (i, word) in words.iter().enumerate() {
            let fragment = if i + 1 < words.len() {
                format!("{word} ")
            } else {
                (*word).to_string()
            };
            // A run ending in a space leaves one empty last word behind.
            if fragment.is_empty() {
                continue;
            }

            let width = measurer.measure_text(&fragment, font);
            if current_width + width > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            current.fragments.push(Fragment {
                text: fragment,
                highlighted,
                width,
            });
            current_width += width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    TextBlock {
        lines,
        font_size: font.size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;

    /// Ten pixels per character, independent of the font.
    struct CharWidth;

    impl TextMeasurer for CharWidth {
        fn measure_text(&mut self, text: &str, _font: &TextFont) -> f32 {
            text.chars().count() as f32 * 10.0
        }
    }

    fn font() -> TextFont {
        TextFont {
            stack: "Inter, sans-serif".to_string(),
            size: 20.0,
        }
    }

    fn wrap_str(text: &str, max_width: f32) -> TextBlock {
        wrap(&parse(text), &font(), max_width, &mut CharWidth)
    }

    #[test]
    fn lines_never_exceed_max_width_unless_single_fragment() {
        for text in [
            "aaa bbb ccc ddd eee",
            "one two three",
            "a b c d e f g h i j",
        ] {
            for max in [30.0, 50.0, 80.0, 200.0] {
                let block = wrap_str(text, max);
                for line in &block.lines {
                    assert!(
                        line.width() <= max || line.fragments.len() == 1,
                        "line '{}' ({}) exceeds {max}",
                        line.text(),
                        line.width()
                    );
                }
            }
        }
    }

    #[test]
    fn greedy_fill_keeps_words_that_exactly_fit() {
        let block = wrap_str("aaa bbb ccc", 80.0);
        let texts: Vec<String> = block.lines.iter().map(Line::text).collect();
        assert_eq!(texts, vec!["aaa bbb ".to_string(), "ccc".to_string()]);
    }

    #[test]
    fn oversized_word_sits_alone_untruncated() {
        let block = wrap_str("hi incomprehensibilities yo", 60.0);
        let long_line = block
            .lines
            .iter()
            .find(|l| l.text().starts_with("incomprehensibilities"))
            .expect("long word line");
        assert_eq!(long_line.fragments.len(), 1);
        assert!(long_line.width() > 60.0);
    }

    #[test]
    fn explicit_break_yields_blank_line() {
        let block = wrap_str("A\nB", 500.0);
        let texts: Vec<String> = block.lines.iter().map(Line::text).collect();
        assert_eq!(texts, vec!["A".to_string(), String::new(), "B".to_string()]);
        assert!(block.lines[1].is_empty());
    }

    #[test]
    fn break_never_merges_across_lines() {
        let block = wrap_str("A\nB", 500.0);
        assert!(block.lines.len() >= 2);
        assert_eq!(block.lines[0].text(), "A");
        assert!(!block.lines.iter().any(|l| l.text().contains("AB")));
    }

    #[test]
    fn total_height_is_line_count_times_line_height() {
        for (text, max) in [("aaa bbb ccc", 80.0), ("A\nB", 500.0), ("word", 10.0)] {
            let block = wrap_str(text, max);
            assert_eq!(
                block.total_height(),
                block.lines.len() as f32 * 20.0 * LINE_HEIGHT_FACTOR
            );
        }
    }

    #[test]
    fn empty_text_has_no_lines_and_zero_height() {
        let block = wrap_str("", 100.0);
        assert!(block.lines.is_empty());
        assert_eq!(block.total_height(), 0.0);
    }

    #[test]
    fn trailing_space_survives_into_the_last_fragment_of_a_run() {
        let block = wrap(
            &parse("The Power of *Red*"),
            &font(),
            10_000.0,
            &mut CharWidth,
        );
        assert_eq!(block.lines.len(), 1);
        let frags: Vec<(&str, bool)> = block.lines[0]
            .fragments
            .iter()
            .map(|f| (f.text.as_str(), f.highlighted))
            .collect();
        assert_eq!(
            frags,
            vec![
                ("The ", false),
                ("Power ", false),
                ("of ", false),
                ("Red", true),
            ]
        );
        assert_eq!(block.lines[0].text(), "The Power of Red");
    }

    #[test]
    fn consecutive_spaces_become_space_fragments() {
        let block = wrap_str("a  b", 10_000.0);
        let texts: Vec<&str> = block.lines[0]
            .fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect();
        assert_eq!(texts, vec!["a ", " ", "b"]);
    }

    #[test]
    fn fragment_widths_include_their_trailing_space() {
        let block = wrap_str("ab cd", 10_000.0);
        let widths: Vec<f32> = block.lines[0].fragments.iter().map(|f| f.width).collect();
        assert_eq!(widths, vec![30.0, 20.0]);
    }
}
