//! The element extractor.
//!
//! Carves the panel's pixel set into text lines, speech tails, thought
//! bubbles and template shapes, consuming ink greedily from the
//! lexicographically smallest remaining pixel.

use crate::diag::Sink;
use crate::font::FontRegistry;
use crate::geom::{Box, Pixel};
use crate::image::{self, SparseImage};
use crate::panel::{Character, Direction};
use crate::shape;
use crate::tail::{self, Tail};
use crate::textline::{self, TextLine};
use crate::thought;

/// Extraction stops after this many unclassifiable shapes.
const MAX_UNMATCHED: usize = 5;

/// The pixel count of the Batman head template.
const BATMAN_PIXELS: usize = 187;

/// Signature probes into the head's box: the visible eye sits in the upper
/// half, on the side the head is facing.
const BATMAN_EYE_OFFSET: (i32, i32) = (4, 5);

/// Everything the extractor found in one panel.
#[derive(Debug, Clone, Default)]
pub struct Elements<'a> {
    pub tails: Vec<Tail>,
    pub thoughts: Vec<Box>,
    pub text_lines: Vec<TextLine<'a>>,
    pub extra_characters: Vec<Character>,
    pub unmatched: Vec<Vec<Pixel>>,
}

/// Decompose the panel into elements.
pub fn extract<'a>(
    image: &SparseImage,
    fonts: &'a FontRegistry,
    sink: &mut Sink,
) -> Elements<'a> {
    let mut elements = Elements::default();
    let mut remaining = image.sorted_pixels();

    while let Some(&seed) = remaining.first() {
        let view = image.retain(&remaining);

        if let Some(line) = best_text_line(seed, &view, fonts, sink) {
            remaining = remove_line(&remaining, &line);
            elements.text_lines.push(line);
            continue;
        }

        if let Some(tail) = tail::get_tail(seed, &view) {
            remaining = image::remove_subsequence(&remaining, &tail.pixels);
            elements.tails.push(tail);
            continue;
        }

        let pixels = shape::flood(seed, &view);
        if let Some(character) = match_batman(&pixels) {
            remaining = image::remove_subsequence(&remaining, &pixels);
            elements.extra_characters.push(character);
            continue;
        }

        if let Some((bounds, pixels)) = thought::get_thought(seed, &view) {
            remaining = image::remove_subsequence(&remaining, &pixels);
            elements.thoughts.push(bounds);
            continue;
        }

        crate::warn!(sink, "no match found for shape at {seed:?}");
        remaining = image::remove_subsequence(&remaining, &pixels);
        elements.unmatched.push(pixels);
        if elements.unmatched.len() >= MAX_UNMATCHED {
            crate::warn!(sink, "too many unmatched shapes, giving up on the panel");
            break;
        }
    }

    elements.text_lines =
        textline::cleanup_text_lines(elements.text_lines, image, sink);
    elements.text_lines.sort_by_key(|line| line.start());
    elements
}

/// Try every font at the seed and keep the line reaching furthest right.
///
/// A lone Italic dash is usually a misread; an upright single-glyph
/// candidate wins over it.
fn best_text_line<'a>(
    seed: Pixel,
    view: &SparseImage,
    fonts: &'a FontRegistry,
    sink: &mut Sink,
) -> Option<TextLine<'a>> {
    let mut candidates = Vec::new();
    for font in fonts.fonts() {
        if let Some(line) = textline::try_text_line(seed, view, font, sink) {
            candidates.push(line);
        }
    }
    let best = candidates
        .iter()
        .enumerate()
        .max_by_key(|(i, line)| (line.end().x, std::cmp::Reverse(*i)))
        .map(|(i, _)| i)?;
    if candidates[best].font.is_italic() && candidates[best].content() == "-" {
        if let Some(upright) = candidates.iter().position(|line| {
            !line.font.is_italic() && line.char_boxes.len() == 1
        }) {
            return Some(candidates.swap_remove(upright));
        }
    }
    Some(candidates.swap_remove(best))
}

/// Remove a recognized line's ink from the remaining pixel list.
fn remove_line(remaining: &[Pixel], line: &TextLine) -> Vec<Pixel> {
    if line.font.is_mono && !line.font.is_italic() {
        let boxes: Vec<_> = line.char_boxes.iter().map(|cb| cb.bounds).collect();
        image::remove_boxes(remaining, &boxes)
    } else {
        let mut pixels: Vec<_> =
            line.char_boxes.iter().flat_map(|cb| cb.pixels.iter().copied()).collect();
        pixels.sort_unstable();
        image::remove_subsequence(remaining, &pixels)
    }
}

/// Recognize the Floating Batman head template.
fn match_batman(pixels: &[Pixel]) -> Option<Character> {
    if pixels.len() != BATMAN_PIXELS {
        return None;
    }
    let bounds = shape::bounding_box(pixels, 0);
    let (dx, dy) = BATMAN_EYE_OFFSET;
    let left_eye = Pixel::new(bounds.left() + dx, bounds.top() + dy);
    let right_eye = Pixel::new(bounds.right() - 1 - dx, bounds.top() + dy);
    let has_left = pixels.binary_search(&left_eye).is_ok();
    let has_right = pixels.binary_search(&right_eye).is_ok();
    let direction = match (has_left, has_right) {
        (true, false) => Direction::Left,
        (false, true) => Direction::Right,
        _ => return None,
    };
    let mut character = Character::new("Floating Batman head", &[bounds]);
    character.direction = Some(direction);
    Some(character)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn test_unmatched_shapes_consume_ink() {
        let fonts = FontRegistry::new(Vec::new());
        let mut image = SparseImage::empty(60, 60);
        // A hollow square: not text, not a tail, not a closed bubble once
        // its side is gapped open widely.
        for i in 0..6 {
            image.insert(Pixel::new(10 + i, 10), Color::BLACK);
            image.insert(Pixel::new(10 + i, 13), Color::BLACK);
        }
        let mut sink = Sink::new();
        let elements = extract(&image, &fonts, &mut sink);
        assert_eq!(elements.unmatched.len(), 2);
        assert!(!sink.diagnostics().is_empty());
    }

    #[test]
    fn test_tail_extraction() {
        let fonts = FontRegistry::new(Vec::new());
        let mut image = SparseImage::empty(60, 60);
        for i in 0..12 {
            image.insert(Pixel::new(20 + i, 20 + i), Color::BLACK);
            image.insert(Pixel::new(21 + i, 20 + i), Color::BLACK);
        }
        let mut sink = Sink::new();
        let elements = extract(&image, &fonts, &mut sink);
        assert_eq!(elements.tails.len(), 1);
        assert!(elements.unmatched.is_empty());
    }

    #[test]
    fn test_batman_template() {
        // A 17x11 block with the left eye hollowed out and a chin pixel
        // keeping the count at exactly 187.
        let mut pixels = Vec::new();
        for x in 0..17 {
            for y in 0..11 {
                if (x, y) != (4, 5) {
                    pixels.push(Pixel::new(30 + x, 30 + y));
                }
            }
        }
        pixels.push(Pixel::new(30 + 8, 30 + 11));
        pixels.sort_unstable();
        assert_eq!(pixels.len(), BATMAN_PIXELS);
        let character = match_batman(&pixels);
        assert!(character.is_some_and(|c| c.direction == Some(Direction::Right)));

        // A symmetric block of the right size is not the template.
        let symmetric: Vec<_> = (0..17)
            .flat_map(|x| (0..11).map(move |y| Pixel::new(x, y)))
            .collect();
        assert_eq!(symmetric.len(), BATMAN_PIXELS);
        assert!(match_batman(&symmetric).is_none());
    }
}
