//! Page validation and masking.
//!
//! Every strip shares one template: fixed dimensions, fixed panel frames,
//! fixed background colors. A handful of reference pixels confirm the
//! template before any recognition runs; the mask whitens everything that
//! is not panel interior.

use rustc_hash::FxHashSet;

use crate::color::Color;
use crate::diag::{ImageError, Sink};
use crate::image::Bitmap;
use crate::panel::{PAGE_HEIGHT, PAGE_WIDTH, PANEL_COUNT};

/// One background reference pixel per panel.
pub const REFERENCES: [((u32, u32), Color); PANEL_COUNT] = [
    ((113, 183), Color::new(128, 255, 64)),
    ((290, 160), Color::new(255, 128, 161)),
    ((704, 183), Color::new(255, 242, 179)),
    ((52, 330), Color::new(128, 208, 255)),
    ((452, 405), Color::new(255, 191, 82)),
    ((600, 300), Color::new(164, 255, 128)),
];

/// The footer baseline reference.
const FOOTER_REFERENCE: ((u32, u32), Color) = ((372, 484), Color::BLACK);

/// The banner swatch probed for the "ASK PROFESSOR SCIENCE" sign.
const BANNER_PROBE: (std::ops::Range<u32>, std::ops::Range<u32>) = (109..113, 1..6);
const BANNER_COLORS: [Color; 2] =
    [Color::new(224, 231, 248), Color::new(209, 220, 244)];

/// A validated, masked page.
pub struct Prepared {
    pub bitmap: Bitmap,
    /// One-based indices of the panels whose reference sample matched.
    pub good_panels: FxHashSet<usize>,
}

/// Validate the page and whiten the non-panel regions.
pub fn prepare(bitmap: &Bitmap, mask: &Bitmap, sink: &mut Sink) -> Result<Prepared, ImageError> {
    if (bitmap.width(), bitmap.height()) != (PAGE_WIDTH, PAGE_HEIGHT) {
        return Err(ImageError::WrongDimensions {
            width: bitmap.width(),
            height: bitmap.height(),
        });
    }

    let mut good_panels = FxHashSet::default();
    for (panel, &((x, y), expected)) in REFERENCES.iter().enumerate() {
        if bitmap.get(x, y) == expected {
            good_panels.insert(panel + 1);
        }
    }
    if good_panels.is_empty() {
        return Err(ImageError::InvalidTemplate);
    }
    if good_panels.len() < PANEL_COUNT {
        crate::warn!(
            sink,
            "template only partially matched ({} of {PANEL_COUNT} panels)",
            good_panels.len(),
        );
    }
    let ((x, y), expected) = FOOTER_REFERENCE;
    if bitmap.get(x, y) != expected {
        crate::warn!(sink, "footer reference sample does not match");
    }

    Ok(Prepared { bitmap: bitmap.masked(mask), good_panels })
}

/// Whether the first panel carries the "ASK PROFESSOR SCIENCE" banner.
pub fn has_banner(bitmap: &Bitmap) -> bool {
    let (xs, ys) = BANNER_PROBE;
    for x in xs {
        for y in ys.clone() {
            let color = bitmap.get(x, y);
            if BANNER_COLORS.iter().any(|&c| c.distance_squared(color) <= 3) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_page() -> Bitmap {
        Bitmap::new(
            PAGE_WIDTH,
            PAGE_HEIGHT,
            vec![255; (PAGE_WIDTH * PAGE_HEIGHT * 3) as usize],
        )
    }

    fn page_with_references(panels: &[usize]) -> Bitmap {
        let mut data = vec![255u8; (PAGE_WIDTH * PAGE_HEIGHT * 3) as usize];
        for &panel in panels {
            let ((x, y), color) = REFERENCES[panel - 1];
            let i = ((y * PAGE_WIDTH + x) * 3) as usize;
            data[i] = color.r;
            data[i + 1] = color.g;
            data[i + 2] = color.b;
        }
        Bitmap::new(PAGE_WIDTH, PAGE_HEIGHT, data)
    }

    #[test]
    fn test_wrong_dimensions() {
        let bitmap = Bitmap::new(10, 10, vec![0; 300]);
        let mask = Bitmap::new(10, 10, vec![0; 300]);
        let mut sink = Sink::new();
        assert_eq!(
            prepare(&bitmap, &mask, &mut sink).err(),
            Some(ImageError::WrongDimensions { width: 10, height: 10 }),
        );
    }

    #[test]
    fn test_invalid_template() {
        let mask = blank_page();
        let mut sink = Sink::new();
        assert_eq!(
            prepare(&blank_page(), &mask, &mut sink).err(),
            Some(ImageError::InvalidTemplate),
        );
    }

    #[test]
    fn test_partial_template() {
        let mask = blank_page();
        let mut sink = Sink::new();
        let prepared =
            prepare(&page_with_references(&[1, 3]), &mask, &mut sink).unwrap();
        assert_eq!(prepared.good_panels.len(), 2);
        assert!(prepared.good_panels.contains(&1));
        assert!(prepared.good_panels.contains(&3));
        assert!(
            sink.diagnostics().iter().any(|d| d.message.contains("partially matched"))
        );
    }

    #[test]
    fn test_banner_probe() {
        let mut data = vec![255u8; (PAGE_WIDTH * PAGE_HEIGHT * 3) as usize];
        let i = ((3 * PAGE_WIDTH + 110) * 3) as usize;
        data[i] = 224;
        data[i + 1] = 231;
        data[i + 2] = 247;
        let bitmap = Bitmap::new(PAGE_WIDTH, PAGE_HEIGHT, data);
        assert!(has_banner(&bitmap));
        assert!(!has_banner(&blank_page()));
    }
}
