//! Shared fixtures for unit tests.

use ecow::EcoString;

use crate::color::Color;
use crate::font::{CharBox, Font, Fsa, Strip, build_mono};
use crate::geom::{Box, Pixel};
use crate::image::SparseImage;
use crate::textline::TextLine;

/// The glyphs of the generated scan font, all distinct.
pub const SCAN_GLYPHS: &str = "abdinosurt!.'-";

/// Cell metrics of the generated scan font.
pub const SCAN_CELL: i32 = 6;
pub const SCAN_HEIGHT: i32 = 13;

/// Column bitmasks of a scan-font glyph: two anchor rows, a full-height
/// stem and an index payload, so no two glyphs collide and no thin stroke
/// can alias one.
pub fn scan_columns(index: usize) -> [u64; 4] {
    let i = index as u64;
    let anchors = (1 << 9) | 1;
    [
        anchors | ((i & 0xF) << 1),
        anchors | (((i >> 4) & 0xF) << 1),
        (1 << 10) - 1,
        anchors | (((i * 7 + 3) & 0xF) << 1),
    ]
}

/// A small but fully scannable monospace font.
pub fn scan_font() -> Font {
    let mut rows = vec![String::new(); SCAN_HEIGHT as usize];
    for index in 0..SCAN_GLYPHS.chars().count() {
        let columns = scan_columns(index);
        for (r, row) in rows.iter_mut().enumerate() {
            row.push('.');
            for column in columns {
                row.push(if column >> r & 1 == 1 { '#' } else { '.' });
            }
            row.push('.');
        }
    }
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    build_mono("Regular", "LC13", 10, &[], SCAN_GLYPHS, &Strip::from_rows(&rows))
        .expect("scan strip is well-formed")
}

/// Stamp scan-font text into an image, cells anchored at `(x, y)`.
pub fn stamp(image: &mut SparseImage, x: i32, y: i32, text: &str, bold: bool) {
    stamp_colored(image, x, y, text, bold, Color::BLACK);
}

pub fn stamp_colored(
    image: &mut SparseImage,
    x: i32,
    y: i32,
    text: &str,
    bold: bool,
    color: Color,
) {
    let mut at = x;
    for char in text.chars() {
        if char == ' ' {
            at += SCAN_CELL;
            continue;
        }
        let index = SCAN_GLYPHS.chars().position(|g| g == char).expect("glyph exists");
        let plain = scan_columns(index);
        let columns: Vec<u64> = if bold {
            let mut out = vec![plain[0]];
            for pair in plain.windows(2) {
                out.push(pair[0] | pair[1]);
            }
            out.push(plain[3]);
            out
        } else {
            plain.to_vec()
        };
        for (j, column) in columns.iter().enumerate() {
            for r in 0..SCAN_HEIGHT {
                if column >> r & 1 == 1 {
                    image.insert(Pixel::new(at + 1 + j as i32, y + r), color);
                }
            }
        }
        at += SCAN_CELL + bold as i32;
    }
}

/// A bare monospace font with Regular-like metrics.
pub fn mono_font() -> Font {
    named_font("Regular", "LC13")
}

/// A bare monospace font with the given identity.
pub fn named_font(name: &str, group: &str) -> Font {
    Font {
        name: EcoString::from(name),
        group: EcoString::from(group),
        is_mono: true,
        width: 6,
        space_width: 6,
        height: 13,
        base: 10,
        initial_padding: 2,
        italic_offsets: Vec::new(),
        plain: Fsa::new(),
        cut_bottom: Fsa::new(),
        cut_top: Fsa::new(),
    }
}

/// Fabricate a recognized line at a position without running the scanner.
pub fn fake_line<'a>(
    font: &'a Font,
    start: (i32, i32),
    text: &str,
    bold: bool,
) -> TextLine<'a> {
    fake_line_colored(font, start, text, bold, Color::BLACK)
}

pub fn fake_line_colored<'a>(
    font: &'a Font,
    start: (i32, i32),
    text: &str,
    bold: bool,
    color: Color,
) -> TextLine<'a> {
    let (x0, y0) = start;
    let char_boxes = text
        .chars()
        .enumerate()
        .map(|(i, char)| {
            let left = x0 + i as i32 * font.width;
            let bounds =
                Box::from_coords(left, y0, left + font.width, y0 + font.height);
            let pixels = if char == ' ' {
                Vec::new()
            } else {
                vec![Pixel::new(left + 1, y0 + 1)]
            };
            CharBox {
                char,
                bounds,
                is_bold: bold,
                is_italic: font.is_italic(),
                pixels,
                variant: None,
            }
        })
        .collect();
    TextLine { char_boxes, font, color }
}
