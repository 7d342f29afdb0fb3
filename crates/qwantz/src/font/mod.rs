//! Bitmap fonts and glyph recognition.

mod fsa;
mod strip;

pub use self::fsa::{CharInfo, Fsa, Hit};
pub use self::strip::{FontError, GLYPHS, Strip, build_mono, build_serif};

use ecow::EcoString;

use crate::geom::{Box, Pixel};
use crate::image::SparseImage;

/// Punctuation that never begins a text line.
const FORBIDDEN_FIRST: &str = ",;:)]";

/// How many columns a glyph walk may consume at most.
const MAX_GLYPH_COLUMNS: usize = 40;

/// A recognized character and the pixels that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharBox {
    pub char: char,
    pub bounds: Box,
    pub is_bold: bool,
    pub is_italic: bool,
    /// The inked pixels this recognition consumed. Empty for spaces.
    pub pixels: Vec<Pixel>,
    /// Set when a non-canonical glyph shape was used.
    pub variant: Option<EcoString>,
}

impl CharBox {
    /// A space box carrying the style of the surrounding text.
    pub fn space(is_bold: bool, is_italic: bool, bounds: Box) -> Self {
        Self { char: ' ', bounds, is_bold, is_italic, pixels: Vec::new(), variant: None }
    }

    /// The same box with different bounds.
    pub fn with_bounds(mut self, bounds: Box) -> Self {
        self.bounds = bounds;
        self
    }

    /// The lexicographically smallest producing pixel.
    pub fn first_pixel(&self) -> Option<Pixel> {
        self.pixels.iter().copied().min()
    }
}

/// The result of one recognition step.
#[derive(Debug, Clone)]
pub struct Recognized {
    pub char_box: CharBox,
    /// Bits of the last consumed column that belong to the next glyph.
    pub complement: Option<u64>,
}

/// How many rows are cut off a clipped glyph, and where.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Cut {
    None,
    Bottom(i32),
    Top(i32),
}

impl Cut {
    fn amount(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Bottom(n) | Self::Top(n) => n,
        }
    }
}

/// A bitmap font with its recognition automata.
///
/// Monospace fonts recognize fixed cells; the proportional serif font
/// recognizes variable-width glyph runs with the kerning combine step.
#[derive(Debug, Clone)]
pub struct Font {
    pub name: EcoString,
    /// Fonts in the same group may inter-mingle within one paragraph.
    pub group: EcoString,
    pub is_mono: bool,
    /// The cell width, zero for the proportional font.
    pub width: i32,
    pub space_width: i32,
    pub height: i32,
    /// Rows from the cell top to the baseline.
    pub base: i32,
    /// The maximum number of empty leading columns inside a glyph cell.
    pub initial_padding: i32,
    /// Shear thresholds for italic sampling; empty for upright fonts.
    pub italic_offsets: Vec<i32>,
    pub(crate) plain: Fsa,
    pub(crate) cut_bottom: Fsa,
    pub(crate) cut_top: Fsa,
}

impl Font {
    /// Whether char boxes of this font render italic.
    pub fn is_italic(&self) -> bool {
        !self.italic_offsets.is_empty()
    }

    /// The horizontal shear of a row when sampling italic glyphs.
    pub fn shear(&self, row: i32) -> i32 {
        self.italic_offsets.iter().filter(|&&t| row < t).count() as i32
    }

    /// Recognize one character at the given position.
    ///
    /// `first_column` carries complement bits from a preceding kerned glyph;
    /// `is_first` rejects punctuation that cannot begin a line. Returns
    /// `None` when nothing at the position matches this font. Space
    /// recognition is non-failing as long as the leading columns are blank.
    pub fn get_char(
        &self,
        start: Pixel,
        image: &SparseImage,
        is_first: bool,
        first_column: Option<u64>,
    ) -> Option<Recognized> {
        let column = |i: i32, window: i32| -> u64 {
            if i == 0
                && let Some(injected) = first_column
            {
                return injected;
            }
            let mut mask = 0u64;
            for row in 0..window {
                let pixel =
                    Pixel::new(start.x + i + self.shear(row), start.y + row);
                if image.contains(pixel) {
                    mask |= 1 << row;
                }
            }
            mask
        };

        // Look for the first inked column. Far-away ink means a space.
        let scan = if self.is_mono { self.width } else { self.space_width };
        let mut first_ink = None;
        for i in 0..scan {
            if column(i, self.height) != 0 {
                first_ink = Some(i);
                break;
            }
        }
        let lead = match first_ink {
            None => return Some(self.space_box(start, scan)),
            Some(lead) if lead > self.initial_padding => {
                return Some(self.space_box(start, lead));
            }
            Some(lead) => lead,
        };

        let cuts = [
            Cut::None,
            Cut::Bottom(1),
            Cut::Top(1),
        ];
        for cut in cuts {
            let fsa = match cut {
                Cut::None => &self.plain,
                Cut::Bottom(_) => &self.cut_bottom,
                Cut::Top(_) => &self.cut_top,
            };
            if fsa.is_empty() {
                continue;
            }
            let window = self.height - cut.amount();
            let remaining = (image.width() - start.x - lead).max(0) as usize;
            let hits = fsa.walk(
                |i| column(lead + i as i32, window),
                remaining.min(MAX_GLYPH_COLUMNS),
                !self.is_mono,
            );
            for hit in hits.iter().rev() {
                for info in hit.infos {
                    // Mid-line, cells are aligned and the leading blanks must
                    // equal the glyph's padding. At a line start the seed is
                    // the first ink column, so the cell may begin earlier.
                    let shift = if !self.is_mono || info.left_pad == lead {
                        0
                    } else if is_first && info.left_pad > lead {
                        info.left_pad - lead
                    } else {
                        continue;
                    };
                    if is_first && FORBIDDEN_FIRST.contains(info.char) {
                        continue;
                    }
                    if let Some(recognized) =
                        self.materialize(start, lead, shift, hit, info, cut, window, &column)
                    {
                        return Some(recognized);
                    }
                }
            }
        }
        None
    }

    /// Turn an automaton hit into a char box, verifying cell alignment.
    #[allow(clippy::too_many_arguments)]
    fn materialize(
        &self,
        start: Pixel,
        lead: i32,
        shift: i32,
        hit: &Hit,
        info: &CharInfo,
        cut: Cut,
        window: i32,
        column: &impl Fn(i32, i32) -> u64,
    ) -> Option<Recognized> {
        let len = hit.len as i32;
        let (left, right) = if self.is_mono {
            let cell = self.width + info.is_bold as i32;
            if lead + len > cell - shift {
                return None;
            }
            // The rest of the cell must be blank.
            for i in (lead + len)..(cell - shift) {
                if column(i, window) != 0 {
                    return None;
                }
            }
            (start.x - shift, start.x - shift + cell)
        } else {
            // A combined column belongs to the next glyph's box.
            (start.x, start.x + lead + len - hit.complement.is_some() as i32)
        };

        let mut pixels = Vec::new();
        for i in 0..(lead + len) {
            let mut bits = column(i, window);
            if i + 1 == lead + len
                && let Some(complement) = hit.complement
            {
                bits &= !complement;
            }
            for row in 0..window {
                if bits & (1 << row) != 0 {
                    pixels.push(Pixel::new(start.x + i + self.shear(row), start.y + row));
                }
            }
        }

        let bottom = start.y + self.height - cut.amount();
        let variant = match (cut, &info.variant) {
            (Cut::None, variant) => variant.clone(),
            (Cut::Bottom(n), _) => Some(ecow::eco_format!("{:?} cut {n} from below", info.char)),
            (Cut::Top(n), _) => Some(ecow::eco_format!("{:?} cut {n} from above", info.char)),
        };
        Some(Recognized {
            char_box: CharBox {
                char: info.char,
                bounds: Box::new(Pixel::new(left, start.y), Pixel::new(right, bottom)),
                is_bold: info.is_bold,
                is_italic: self.is_italic(),
                pixels,
                variant,
            },
            complement: hit.complement,
        })
    }

    fn space_box(&self, start: Pixel, span: i32) -> Recognized {
        let bounds =
            Box::new(start, Pixel::new(start.x + span, start.y + self.height));
        Recognized {
            char_box: CharBox::space(false, self.is_italic(), bounds),
            complement: None,
        }
    }
}

/// The process-wide set of fonts, in recognition order.
#[derive(Debug, Clone)]
pub struct FontRegistry {
    fonts: Vec<Font>,
}

impl FontRegistry {
    /// Build a registry from loaded fonts. The order is the extractor's
    /// fixed trial order.
    pub fn new(fonts: Vec<Font>) -> Self {
        Self { fonts }
    }

    /// Load the standard fonts from a directory of glyph strip images.
    pub fn load(assets: &std::path::Path) -> Result<Self, FontError> {
        strip::load_standard(assets)
    }

    /// The fonts in trial order.
    pub fn fonts(&self) -> &[Font] {
        &self.fonts
    }

    /// Look up a font by name.
    pub fn get(&self, name: &str) -> Option<&Font> {
        self.fonts.iter().find(|font| font.name == name)
    }
}
