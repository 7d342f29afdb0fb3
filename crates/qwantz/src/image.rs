//! Page bitmaps and the sparse per-panel image.

use rustc_hash::FxHashMap;

use crate::color::Color;
use crate::diag::Sink;
use crate::geom::{Box, Pixel};

/// A dense RGB bitmap, as decoded from the source file.
#[derive(Clone)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Wrap raw RGB data (three bytes per pixel, row-major).
    ///
    /// Panics if the buffer length does not match the dimensions; callers
    /// decode with known dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(data.len(), (width * height * 3) as usize);
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw bytes, used for override lookup digests.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decode a PNG into a bitmap, flattening any palette or alpha.
    pub fn decode(data: &[u8]) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(data)?.to_rgb8();
        let (width, height) = (decoded.width(), decoded.height());
        Ok(Self::new(width, height, decoded.into_raw()))
    }

    /// The raw color at a position.
    pub fn get(&self, x: u32, y: u32) -> Color {
        let i = ((y * self.width + x) * 3) as usize;
        Color::new(self.data[i], self.data[i + 1], self.data[i + 2])
    }

    /// Whiten every pixel that is dark in the mask.
    ///
    /// The mask has the same dimensions and marks panel interiors with
    /// non-zero pixels.
    pub fn masked(&self, mask: &Bitmap) -> Bitmap {
        let mut data = self.data.clone();
        for y in 0..self.height {
            for x in 0..self.width {
                if mask.get(x, y) == Color::BLACK {
                    let i = ((y * self.width + x) * 3) as usize;
                    data[i] = 255;
                    data[i + 1] = 255;
                    data[i + 2] = 255;
                }
            }
        }
        Bitmap { width: self.width, height: self.height, data }
    }
}

/// A dense membership set over panel pixels.
///
/// Keyed in column-major order so that column scans, the recognizer's hot
/// loop, walk consecutive bits.
#[derive(Clone)]
struct PixelSet {
    words: Vec<u64>,
    width: i32,
    height: i32,
}

impl PixelSet {
    fn new(width: i32, height: i32) -> Self {
        let bits = (width * height) as usize;
        Self { words: vec![0; bits.div_ceil(64)], width, height }
    }

    fn index(&self, pixel: Pixel) -> Option<usize> {
        (pixel.x >= 0 && pixel.x < self.width && pixel.y >= 0 && pixel.y < self.height)
            .then(|| (pixel.x * self.height + pixel.y) as usize)
    }

    fn insert(&mut self, pixel: Pixel) {
        if let Some(i) = self.index(pixel) {
            self.words[i / 64] |= 1 << (i % 64);
        }
    }

    fn contains(&self, pixel: Pixel) -> bool {
        match self.index(pixel) {
            Some(i) => self.words[i / 64] & (1 << (i % 64)) != 0,
            None => false,
        }
    }
}

/// The non-white pixels of one panel.
///
/// White is absent from the mapping; every stored color is quantized to the
/// palette. Built once per panel and read-only afterwards.
#[derive(Clone)]
pub struct SparseImage {
    width: i32,
    height: i32,
    colors: FxHashMap<Pixel, Color>,
    set: PixelSet,
}

/// Pixels in the top-left banner corner that the first panel skips when the
/// "ASK PROFESSOR SCIENCE" banner is present.
const BANNER_CUTOFF: (i32, i32) = (240, 46);

impl SparseImage {
    /// Extract the non-white pixels of a bitmap region.
    ///
    /// Colors outside the palette are reported once and treated as black.
    pub fn from_bitmap(
        bitmap: &Bitmap,
        region: Box,
        trim_banner: bool,
        sink: &mut Sink,
    ) -> Self {
        let mut image = Self::empty(region.width(), region.height());
        let mut unknown = false;
        for y in region.top()..region.bottom() {
            for x in region.left()..region.right() {
                let pixel = Pixel::new(x - region.left(), y - region.top());
                if trim_banner && pixel.x <= BANNER_CUTOFF.0 && pixel.y <= BANNER_CUTOFF.1 {
                    continue;
                }
                let raw = bitmap.get(x as u32, y as u32);
                let color = match Color::quantize(raw) {
                    Some(color) => color,
                    None => {
                        if !unknown {
                            unknown = true;
                            crate::warn!(sink, "unknown color at {pixel:?}: {raw:?}");
                        }
                        Color::BLACK
                    }
                };
                if color != Color::WHITE {
                    image.insert(pixel, color);
                }
            }
        }
        image
    }

    /// Create an image with no ink.
    pub fn empty(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            colors: FxHashMap::default(),
            set: PixelSet::new(width, height),
        }
    }

    /// Insert a pixel. Only used during construction and by tests.
    pub fn insert(&mut self, pixel: Pixel, color: Color) {
        self.colors.insert(pixel, color);
        self.set.insert(pixel);
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Whether the position holds ink.
    pub fn contains(&self, pixel: Pixel) -> bool {
        self.set.contains(pixel)
    }

    /// The color at a position, white when blank.
    pub fn get(&self, pixel: Pixel) -> Color {
        self.colors.get(&pixel).copied().unwrap_or(Color::WHITE)
    }

    /// Whether the position lies on the outer panel edge.
    pub fn is_on_edge(&self, pixel: Pixel) -> bool {
        pixel.x == 0
            || pixel.x == self.width - 1
            || pixel.y == 0
            || pixel.y == self.height - 1
    }

    /// How far the position is from the nearest panel edge.
    pub fn distance_to_edge(&self, pixel: Pixel) -> i32 {
        pixel
            .x
            .min(pixel.y)
            .min(self.width - pixel.x - 1)
            .min(self.height - pixel.y - 1)
    }

    /// The number of inked pixels.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// All inked positions in lexicographic `(x, y)` order.
    pub fn sorted_pixels(&self) -> Vec<Pixel> {
        let mut pixels: Vec<_> = self.colors.keys().copied().collect();
        pixels.sort_unstable();
        pixels
    }

    /// A view retaining only the given (sorted) pixels.
    pub fn retain(&self, pixels: &[Pixel]) -> SparseImage {
        let mut image = Self::empty(self.width, self.height);
        for &pixel in pixels {
            image.insert(pixel, self.get(pixel));
        }
        image
    }
}

/// Remove a sorted subsequence from a sorted pixel list.
pub fn remove_subsequence(sorted: &[Pixel], subsequence: &[Pixel]) -> Vec<Pixel> {
    let mut result = Vec::with_capacity(sorted.len().saturating_sub(subsequence.len()));
    let mut iter = subsequence.iter().copied().peekable();
    for &pixel in sorted {
        while iter.peek().is_some_and(|&next| pixel > next) {
            iter.next();
        }
        if iter.peek() != Some(&pixel) {
            result.push(pixel);
        }
    }
    result
}

/// Remove every pixel included in one of the boxes, which must ascend by
/// their left edge.
pub fn remove_boxes(sorted: &[Pixel], boxes: &[Box]) -> Vec<Pixel> {
    let mut result = Vec::new();
    let mut boxes = boxes.iter().copied().peekable();
    for &pixel in sorted {
        while boxes.peek().is_some_and(|b| pixel.x >= b.right()) {
            boxes.next();
        }
        match boxes.peek() {
            Some(b) if b.includes(pixel) => {}
            _ => result.push(pixel),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with(pixels: &[(i32, i32)]) -> SparseImage {
        let mut image = SparseImage::empty(20, 20);
        for &(x, y) in pixels {
            image.insert(Pixel::new(x, y), Color::BLACK);
        }
        image
    }

    #[test]
    fn test_membership_and_color() {
        let image = image_with(&[(3, 4), (5, 6)]);
        assert!(image.contains(Pixel::new(3, 4)));
        assert!(!image.contains(Pixel::new(4, 3)));
        assert!(!image.contains(Pixel::new(-1, 0)));
        assert_eq!(image.get(Pixel::new(3, 4)), Color::BLACK);
        assert_eq!(image.get(Pixel::new(0, 0)), Color::WHITE);
    }

    #[test]
    fn test_edge_queries() {
        let image = SparseImage::empty(10, 8);
        assert!(image.is_on_edge(Pixel::new(0, 3)));
        assert!(image.is_on_edge(Pixel::new(9, 3)));
        assert!(!image.is_on_edge(Pixel::new(5, 3)));
        assert_eq!(image.distance_to_edge(Pixel::new(2, 3)), 2);
        assert_eq!(image.distance_to_edge(Pixel::new(8, 4)), 1);
    }

    #[test]
    fn test_remove_subsequence() {
        let sorted: Vec<_> = [(0, 0), (0, 2), (1, 1), (2, 0)]
            .map(|(x, y)| Pixel::new(x, y))
            .into_iter()
            .collect();
        let sub = vec![Pixel::new(0, 2), Pixel::new(2, 0)];
        let rest = remove_subsequence(&sorted, &sub);
        assert_eq!(rest, vec![Pixel::new(0, 0), Pixel::new(1, 1)]);
    }

    #[test]
    fn test_remove_boxes() {
        let sorted: Vec<_> = (0..6).map(|x| Pixel::new(x, 1)).collect();
        let boxes = vec![Box::from_coords(1, 0, 3, 3), Box::from_coords(4, 0, 5, 3)];
        let rest = remove_boxes(&sorted, &boxes);
        assert_eq!(rest, vec![Pixel::new(0, 1), Pixel::new(3, 1), Pixel::new(5, 1)]);
    }
}
