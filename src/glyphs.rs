//! Scalable block-glyph font for the countdown display.
//!
//! Each glyph is a 5x7 (colon: 1x7) bitmap. At scale 1 a bitmap pixel covers
//! `font_size` columns and `font_size / 2` rows, which keeps pixels roughly
//! square in a terminal whose cells are twice as tall as they are wide.
//! Rendering samples the bitmap with nearest-neighbour lookup onto a grid of
//! half-block characters, so every terminal row carries two sub-rows.

use crate::fit::{BoxSize, TextMeasure};

/// Height of every glyph bitmap.
pub const GLYPH_ROWS: usize = 7;

/// Columns covered by one bitmap pixel at scale 1 when nothing is configured.
pub const DEFAULT_FONT_SIZE: u16 = 4;

const SPACING: usize = 1;

// Bitmaps are row-major, one string per row, `#` set and `.` clear.
const DIGITS: [[&str; GLYPH_ROWS]; 10] = [
    [".###.", "#...#", "#..##", "#.#.#", "##..#", "#...#", ".###."],
    ["..#..", ".##..", "..#..", "..#..", "..#..", "..#..", ".###."],
    [".###.", "#...#", "....#", "...#.", "..#..", ".#...", "#####"],
    ["#####", "...#.", "..#..", "...#.", "....#", "#...#", ".###."],
    ["...#.", "..##.", ".#.#.", "#..#.", "#####", "...#.", "...#."],
    ["#####", "#....", "####.", "....#", "....#", "#...#", ".###."],
    ["..##.", ".#...", "#....", "####.", "#...#", "#...#", ".###."],
    ["#####", "....#", "...#.", "..#..", ".#...", ".#...", ".#..."],
    [".###.", "#...#", "#...#", ".###.", "#...#", "#...#", ".###."],
    [".###.", "#...#", "#...#", ".####", "....#", "...#.", ".##.."],
];
const COLON: [&str; GLYPH_ROWS] = [".", "#", "#", ".", "#", "#", "."];
const DOT: [&str; GLYPH_ROWS] = [".", ".", ".", ".", ".", "#", "#"];
const DASH: [&str; GLYPH_ROWS] = ["...", "...", "...", "###", "...", "...", "..."];
const SPACE: [&str; GLYPH_ROWS] = ["...", "...", "...", "...", "...", "...", "..."];

fn glyph(c: char) -> &'static [&'static str; GLYPH_ROWS] {
    match c {
        '0'..='9' => &DIGITS[c as usize - '0' as usize],
        ':' => &COLON,
        '.' => &DOT,
        '-' => &DASH,
        _ => &SPACE,
    }
}

/// Lays out `text` into a single bitmap, glyphs separated by one blank column.
fn compose(text: &str) -> Vec<Vec<bool>> {
    let mut rows = vec![Vec::new(); GLYPH_ROWS];
    for (i, c) in text.chars().enumerate() {
        let g = glyph(c);
        for (row, bits) in rows.iter_mut().zip(g.iter()) {
            if i > 0 {
                row.extend(std::iter::repeat(false).take(SPACING));
            }
            row.extend(bits.chars().map(|b| b == '#'));
        }
    }
    rows
}

/// Width in bitmap pixels of `text` laid out with [`compose`].
fn pixel_width(text: &str) -> usize {
    let mut width = 0;
    for (i, c) in text.chars().enumerate() {
        if i > 0 {
            width += SPACING;
        }
        width += glyph(c)[0].len();
    }
    width
}

/// Block-glyph font with a base pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFont {
    font_size: u16,
}

impl BlockFont {
    /// Creates a font whose pixels span `font_size` columns at scale 1.
    /// Sizes below 2 are raised to 2.
    pub fn new(font_size: u16) -> Self {
        Self {
            font_size: font_size.max(2),
        }
    }

    /// Columns per bitmap pixel at scale 1.
    pub fn font_size(&self) -> u16 {
        self.font_size
    }

    fn pixel_cols(&self) -> f64 {
        f64::from(self.font_size)
    }

    fn pixel_rows(&self) -> f64 {
        f64::from(self.font_size) / 2.0
    }

    /// Renders `text` at `scale` as lines of half-block characters.
    ///
    /// When the scaled grid would be smaller than the bitmap itself the glyphs
    /// can no longer be told apart, so the plain text is returned instead.
    pub fn render(&self, text: &str, scale: f64) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let px_w = pixel_width(text);
        let cols = (px_w as f64 * self.pixel_cols() * scale).round() as usize;
        let sub_rows = (GLYPH_ROWS as f64 * self.pixel_rows() * 2.0 * scale).round() as usize;
        if cols < px_w || sub_rows < GLYPH_ROWS {
            return vec![text.to_string()];
        }

        let bitmap = compose(text);
        let sample = |sub_row: usize, col: usize| -> bool {
            if sub_row >= sub_rows {
                return false;
            }
            let src_row = sub_row * GLYPH_ROWS / sub_rows;
            let src_col = col * px_w / cols;
            bitmap[src_row][src_col]
        };

        (0..sub_rows.div_ceil(2))
            .map(|row| {
                (0..cols)
                    .map(|col| match (sample(row * 2, col), sample(row * 2 + 1, col)) {
                        (true, true) => '█',
                        (true, false) => '▀',
                        (false, true) => '▄',
                        (false, false) => ' ',
                    })
                    .collect()
            })
            .collect()
    }
}

impl Default for BlockFont {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_SIZE)
    }
}

impl TextMeasure for BlockFont {
    fn measure(&self, text: &str) -> BoxSize {
        if text.is_empty() {
            return BoxSize::default();
        }
        BoxSize::new(
            pixel_width(text) as f64 * self.pixel_cols(),
            GLYPH_ROWS as f64 * self.pixel_rows(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unicode_width::UnicodeWidthStr;

    #[test]
    fn test_measure_countdown_text() {
        let font = BlockFont::new(4);
        // 7 digits of 5 px, 2 colons of 1 px, 8 gaps of 1 px.
        let size = font.measure("00:00:000");
        assert_eq!(size, BoxSize::new(45.0 * 4.0, 14.0));
        assert_eq!(font.measure(""), BoxSize::default());
    }

    #[test]
    fn test_render_at_full_scale_matches_measure() {
        let font = BlockFont::new(4);
        let lines = font.render("12:34", 1.0);
        let size = font.measure("12:34");
        assert_eq!(lines.len() as f64, size.height);
        for line in &lines {
            assert_eq!(line.width() as f64, size.width);
        }
    }

    #[test]
    fn test_render_downscaled_keeps_proportions() {
        let font = BlockFont::new(4);
        let lines = font.render("00:00:000", 0.5);
        assert_eq!(lines.len(), 7);
        assert!(lines.iter().all(|l| l.chars().count() == 90));
        assert!(lines.iter().any(|l| l.contains('█') || l.contains('▀')));
    }

    #[test]
    fn test_render_too_small_falls_back_to_plain_text() {
        let font = BlockFont::new(4);
        assert_eq!(font.render("01:01:234", 0.1), vec!["01:01:234".to_string()]);
    }

    #[test]
    fn test_render_empty_text() {
        assert!(BlockFont::default().render("", 1.0).is_empty());
    }

    #[test]
    fn test_font_size_floor() {
        assert_eq!(BlockFont::new(0).font_size(), 2);
    }

    #[test]
    fn test_digit_bitmaps_are_uniform() {
        for digit in DIGITS.iter() {
            assert!(digit.iter().all(|row| row.len() == 5));
        }
    }
}
