//! Thought bubble detection.
//!
//! A thought bubble is a closed scalloped outline. The outline may have
//! one-pixel gaps, so a second pass checks the shape with every pixel
//! tripled horizontally before giving up.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::geom::{Box, Pixel};
use crate::image::SparseImage;
use crate::shape;

/// Try to read the shape containing the seed as a thought bubble outline.
///
/// Returns the outline's bounding box and its pixels.
pub fn get_thought(seed: Pixel, image: &SparseImage) -> Option<(Box, Vec<Pixel>)> {
    let pixels = shape::flood(seed, image);
    let bounds = shape::bounding_box(&pixels, 0);

    // An outline running wall to wall is a bubble clipped by the panel edge.
    if bounds.width() == image.width() {
        let mut ys: Vec<_> = pixels.iter().map(|p| p.y).collect();
        ys.sort_unstable();
        ys.dedup();
        if ys.len() > 2 {
            return Some((bounds, pixels));
        }
    }

    let plain: FxHashSet<Pixel> = pixels.iter().copied().collect();
    let mut tripled = plain.clone();
    for &pixel in &pixels {
        tripled.insert(Pixel::new(pixel.x + 1, pixel.y));
        tripled.insert(Pixel::new(pixel.x + 2, pixel.y));
    }
    if is_closed(&tripled, bounds, image) || is_closed(&plain, bounds, image) {
        return Some((bounds, pixels));
    }
    None
}

/// Whether the outline encloses any interior area.
///
/// Every blank interior pixel is flooded within the bounding box; if some
/// flood cannot reach the box frame, the outline is closed around it.
fn is_closed(outline: &FxHashSet<Pixel>, bounds: Box, image: &SparseImage) -> bool {
    let x_range = (bounds.left() + 1)..(bounds.right() - 1);
    let y_range = (bounds.top() + 1)..(bounds.bottom() - 1);

    let mut outside: FxHashSet<Pixel> = FxHashSet::default();
    for y in y_range.clone() {
        outside.insert(Pixel::new(bounds.left(), y));
        outside.insert(Pixel::new(bounds.right() - 1, y));
    }
    for x in x_range.clone() {
        outside.insert(Pixel::new(x, bounds.top()));
        outside.insert(Pixel::new(x, bounds.bottom() - 1));
    }

    for x in x_range.clone() {
        for y in y_range.clone() {
            let start = Pixel::new(x, y);
            if outline.contains(&start) {
                continue;
            }
            let mut visited = FxHashSet::default();
            let mut queue = VecDeque::from([start]);
            let mut escaped = false;
            while let Some(current) = queue.pop_front() {
                let on_border = current.x == 0
                    || current.x == image.width() - 1
                    || current.y == 0
                    || current.y == image.height() - 1;
                if visited.contains(&current)
                    || outline.contains(&current)
                    || !bounds.includes(current)
                    || on_border
                {
                    continue;
                }
                if outside.contains(&current) {
                    outside.extend(visited.iter().copied());
                    escaped = true;
                    break;
                }
                visited.insert(current);
                queue.extend(current.adjacent());
            }
            if !escaped {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn ring(image: &mut SparseImage, left: i32, top: i32, right: i32, bottom: i32) {
        for x in left..right {
            image.insert(Pixel::new(x, top), Color::BLACK);
            image.insert(Pixel::new(x, bottom - 1), Color::BLACK);
        }
        for y in top..bottom {
            image.insert(Pixel::new(left, y), Color::BLACK);
            image.insert(Pixel::new(right - 1, y), Color::BLACK);
        }
    }

    #[test]
    fn test_closed_outline() {
        let mut image = SparseImage::empty(40, 40);
        ring(&mut image, 10, 10, 25, 22);
        let (bounds, pixels) =
            get_thought(Pixel::new(10, 10), &image).expect("closed ring is a thought");
        assert_eq!(bounds, Box::from_coords(10, 10, 25, 22));
        assert!(pixels.contains(&Pixel::new(10, 10)));
    }

    #[test]
    fn test_open_arc_is_not_a_thought() {
        let mut image = SparseImage::empty(40, 40);
        // A ring with a wide gap in the bottom edge.
        ring(&mut image, 10, 10, 25, 22);
        let mut gapped = SparseImage::empty(40, 40);
        for p in image.sorted_pixels() {
            if !(p.y == 21 && (14..22).contains(&p.x)) {
                gapped.insert(p, Color::BLACK);
            }
        }
        assert!(get_thought(Pixel::new(10, 10), &gapped).is_none());
    }

    #[test]
    fn test_single_pixel_gap_still_closed() {
        let mut image = SparseImage::empty(40, 40);
        ring(&mut image, 10, 10, 25, 22);
        // Knock out one pixel; the tripled pass bridges it.
        let mut gapped = SparseImage::empty(40, 40);
        for p in image.sorted_pixels() {
            if p != Pixel::new(17, 10) {
                gapped.insert(p, Color::BLACK);
            }
        }
        assert!(get_thought(Pixel::new(10, 10), &gapped).is_some());
    }
}
