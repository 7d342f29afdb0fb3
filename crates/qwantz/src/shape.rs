//! Connected shapes of ink.

use crate::geom::{Box, Pixel};
use crate::image::SparseImage;

/// Collect the 8-connected shape containing the seed, in sorted order.
pub fn flood(seed: Pixel, image: &SparseImage) -> Vec<Pixel> {
    let mut stack = vec![seed];
    let mut shape = rustc_hash::FxHashSet::default();
    shape.insert(seed);
    while let Some(pixel) = stack.pop() {
        for neighbor in pixel.neighbors() {
            if image.contains(neighbor) && shape.insert(neighbor) {
                stack.push(neighbor);
            }
        }
    }
    let mut sorted: Vec<_> = shape.into_iter().collect();
    sorted.sort_unstable();
    sorted
}

/// The bounding box of a non-empty pixel collection.
pub fn bounding_box(shape: &[Pixel], padding: i32) -> Box {
    let x_min = shape.iter().map(|p| p.x).min().unwrap_or(0);
    let x_max = shape.iter().map(|p| p.x).max().unwrap_or(0);
    let y_min = shape.iter().map(|p| p.y).min().unwrap_or(0);
    let y_max = shape.iter().map(|p| p.y).max().unwrap_or(0);
    Box::from_coords(
        x_min - padding,
        y_min - padding,
        x_max + 1 + padding,
        y_max + 1 + padding,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn test_flood_diagonal() {
        let mut image = SparseImage::empty(10, 10);
        for i in 0..4 {
            image.insert(Pixel::new(i, i), Color::BLACK);
        }
        image.insert(Pixel::new(8, 8), Color::BLACK);
        let shape = flood(Pixel::new(0, 0), &image);
        assert_eq!(shape.len(), 4);
        assert_eq!(bounding_box(&shape, 0), Box::from_coords(0, 0, 4, 4));
    }

    #[test]
    fn test_bounding_box_padding() {
        let shape = vec![Pixel::new(2, 3), Pixel::new(4, 7)];
        assert_eq!(bounding_box(&shape, 1), Box::from_coords(1, 2, 6, 9));
    }
}
