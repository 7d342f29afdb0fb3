//! Speech tail detection.
//!
//! A speech tail is a thin monotone diagonal stroke connecting a speaker to
//! a text block. Horizontal and vertical marks, blobs and panel-spanning
//! strokes are not tails.

use rustc_hash::FxHashSet;

use crate::geom::Pixel;
use crate::image::SparseImage;
use crate::shape;

/// Tails shorter than this (squared length) are glyph debris.
const MIN_LENGTH_SQUARED: i32 = 10;

/// A detected speech tail.
#[derive(Debug, Clone)]
pub struct Tail {
    /// The endpoints; the first is the upper one of the leading diagonal.
    pub ends: [Pixel; 2],
    /// The producing pixels, sorted.
    pub pixels: Vec<Pixel>,
    /// The stroke thickness, one or two.
    pub width: i32,
}

/// Try to read the shape containing the seed as a speech tail.
pub fn get_tail(seed: Pixel, image: &SparseImage) -> Option<Tail> {
    let pixels = shape::flood(seed, image);
    let color = image.get(pixels[0]);
    if pixels.iter().any(|&p| image.get(p) != color) {
        return None;
    }

    let bounds = shape::bounding_box(&pixels, 0);
    if bounds.width() == 1 || bounds.height() == 1 {
        // Purely horizontal or vertical marks are lettering, not tails.
        return None;
    }
    let set: FxHashSet<Pixel> = pixels.iter().copied().collect();
    let top_left = bounds.top_left;
    let bottom_right = Pixel::new(bounds.right() - 1, bounds.bottom() - 1);
    let top_right = Pixel::new(bounds.right() - 1, bounds.top());
    let bottom_left = Pixel::new(bounds.left(), bounds.bottom() - 1);

    // The stroke must reach two opposite corners, fixing its direction.
    let (end1, end2, forward) = if set.contains(&top_left) && set.contains(&bottom_right) {
        (top_left, bottom_right, true)
    } else if set.contains(&bottom_left) && set.contains(&top_right) {
        (bottom_left, top_right, false)
    } else {
        return None;
    };
    if end1 == end2 {
        return None;
    }
    let dx = end1.x - end2.x;
    let dy = end1.y - end2.y;
    if dx * dx + dy * dy < MIN_LENGTH_SQUARED {
        return None;
    }

    // Column slices must be single intervals, monotone along the diagonal.
    let mut slices: Vec<(i32, i32)> = Vec::new();
    let mut iter = pixels.iter().peekable();
    while let Some(&first) = iter.next() {
        let mut last = first;
        while iter.peek().is_some_and(|p| p.x == first.x) {
            last = *iter.next().unwrap();
        }
        if last.y - first.y + 1
            != pixels.iter().filter(|p| p.x == first.x).count() as i32
        {
            return None;
        }
        slices.push((first.y, last.y));
    }
    for pair in slices.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if forward && (a.0 > b.0 || a.1 > b.1) {
            return None;
        }
        if !forward && (a.0 < b.0 || a.1 < b.1) {
            return None;
        }
    }

    // A 3x3 solid block means lettering or a filled shape.
    for &pixel in &pixels {
        if (0..3).all(|i| (0..3).all(|j| set.contains(&Pixel::new(pixel.x + i, pixel.y + j)))) {
            return None;
        }
    }

    // Thin strokes spanning edge to edge are border artifacts.
    let mut max_neighbors = 0;
    for &pixel in &pixels {
        let count = 1 + pixel.neighbors().iter().filter(|p| set.contains(p)).count();
        max_neighbors = max_neighbors.max(count);
    }
    let width = if max_neighbors <= 3 { 1 } else { 2 };
    if width == 1 && image.is_on_edge(end1) && image.is_on_edge(end2) {
        return None;
    }

    Some(Tail { ends: [end1, end2], pixels, width })
}
