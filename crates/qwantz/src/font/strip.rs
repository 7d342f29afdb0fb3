//! Glyph strip loading.
//!
//! Fonts are built from strip images: all glyphs side by side, at fixed cell
//! widths for the monospace fonts and separated by blank columns for the
//! proportional serif font.

use std::path::{Path, PathBuf};

use ecow::{EcoString, eco_format};

use super::fsa::{CharInfo, Fsa};
use super::{Font, FontRegistry};

/// The glyphs of a monospace strip, in strip order.
pub const GLYPHS: &str = "0123456789abcdefghijklmnopqrstuvwxyz\
ABCDEFGHIJKLMNOPQRSTUVWXYZ!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Extra glyphs at the end of the serif strip.
const SERIF_EXTRA: &str = "‘’“”·•νοό";

/// Characters that never appear in strip text; their shapes collide with
/// linework and are not inserted into the automata.
const UNUSED_GLYPHS: &str = "\\`~";

/// Glyphs whose bottom row is significant and must not be cut.
const CUT_BOTTOM_EXEMPT: &str = "gq[]";

/// Glyphs whose top row is significant and must not be cut.
const CUT_TOP_EXEMPT: &str = "'\"";

/// Punctuation drawn shifted off the baseline grid in the Regular strip,
/// with the horizontal offset of the extra variant.
const SHIFTED_VARIANTS: &[(char, i32)] = &[(',', 1), (':', 1), ('.', -1)];

/// A monospace strip description.
struct StripSpec {
    file: &'static str,
    name: &'static str,
    group: &'static str,
    base: i32,
    italic_offsets: &'static [i32],
}

const MONO_STRIPS: &[StripSpec] = &[
    StripSpec { file: "regular13.png", name: "Regular", group: "LC13", base: 10, italic_offsets: &[] },
    StripSpec { file: "regular12.png", name: "Condensed", group: "LC12", base: 10, italic_offsets: &[] },
    StripSpec { file: "regular11.png", name: "Small", group: "LC11", base: 9, italic_offsets: &[] },
    StripSpec { file: "regular9.png", name: "Mini", group: "LC9", base: 7, italic_offsets: &[] },
    StripSpec { file: "regular8.png", name: "Tiny", group: "LC8", base: 6, italic_offsets: &[] },
];

/// The italic variant shares the Regular strip; the shear is applied when
/// sampling, so the column sequences are identical.
const ITALIC_OFFSETS: &[i32] = &[3, 5, 9, 11];

/// The serif strip's inter-word space width.
const SERIF_SPACE_WIDTH: i32 = 4;

/// A problem while loading font resources.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FontError {
    /// A strip image could not be read.
    Io(PathBuf, std::io::ErrorKind),
    /// A strip image could not be decoded.
    Decode(PathBuf),
    /// A strip image does not have the expected layout.
    BadStrip(EcoString),
}

impl std::error::Error for FontError {}

impl std::fmt::Display for FontError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(path, kind) => {
                write!(f, "failed to read font strip {} ({kind})", path.display())
            }
            Self::Decode(path) => {
                write!(f, "failed to decode font strip {}", path.display())
            }
            Self::BadStrip(msg) => write!(f, "malformed font strip: {msg}"),
        }
    }
}

/// A black-and-white glyph strip raster.
#[derive(Debug, Clone)]
pub struct Strip {
    width: i32,
    height: i32,
    bits: Vec<bool>,
}

impl Strip {
    /// Decode a strip from PNG data. Any pixel darker than mid-grey is ink.
    pub fn decode(path: &Path) -> Result<Self, FontError> {
        let data = std::fs::read(path)
            .map_err(|err| FontError::Io(path.into(), err.kind()))?;
        let decoded = image::load_from_memory(&data)
            .map_err(|_| FontError::Decode(path.into()))?
            .to_luma8();
        let (width, height) = (decoded.width() as i32, decoded.height() as i32);
        let bits = decoded.pixels().map(|p| p.0[0] < 128).collect();
        Ok(Self { width, height, bits })
    }

    /// Build a strip from rows of `#` (ink) and `.` (blank). Used by tests
    /// and tooling.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as i32;
        let width = rows.first().map_or(0, |row| row.chars().count()) as i32;
        let mut bits = Vec::with_capacity((width * height) as usize);
        for row in rows {
            assert_eq!(row.chars().count() as i32, width);
            bits.extend(row.chars().map(|c| c == '#'));
        }
        Self { width, height, bits }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn inked(&self, x: i32, y: i32) -> bool {
        x >= 0
            && x < self.width
            && y >= 0
            && y < self.height
            && self.bits[(y * self.width + x) as usize]
    }

    /// The column bitmask at `x`, bit `r` for row `r`.
    fn column(&self, x: i32) -> u64 {
        let mut mask = 0;
        for y in 0..self.height {
            if self.inked(x, y) {
                mask |= 1 << y;
            }
        }
        mask
    }
}

/// Strip leading and trailing empty columns off a cell.
fn trim(cell: &[u64]) -> Option<(Vec<u64>, i32, i32)> {
    let first = cell.iter().position(|&c| c != 0)?;
    let last = cell.iter().rposition(|&c| c != 0).unwrap_or(first);
    let seq = cell[first..=last].to_vec();
    Some((seq, first as i32, (cell.len() - 1 - last) as i32))
}

/// Derive the bold cell by ORing every column with its left neighbour,
/// widening the cell by one.
fn embolden(cell: &[u64]) -> Vec<u64> {
    let mut bold = Vec::with_capacity(cell.len() + 1);
    for i in 0..=cell.len() {
        let left = if i > 0 { cell[i - 1] } else { 0 };
        let here = cell.get(i).copied().unwrap_or(0);
        bold.push(here | left);
    }
    bold
}

fn char_info(char: char, left_pad: i32, right_pad: i32) -> CharInfo {
    CharInfo {
        char,
        left_pad,
        right_pad,
        is_bold: false,
        cut_top: 0,
        cut_bottom: 0,
        variant: None,
    }
}

/// Insert one weight of a glyph, with its shifted and cut variants.
fn insert_cell(
    char: char,
    cell: &[u64],
    is_bold: bool,
    height: i32,
    shifts: &[(char, i32)],
    plain: &mut Fsa,
    cut_bottom: &mut Fsa,
    cut_top: &mut Fsa,
    max_left_pad: &mut i32,
) {
    let Some((seq, left_pad, right_pad)) = trim(cell) else { return };
    let info = CharInfo { is_bold, ..char_info(char, left_pad, right_pad) };
    plain.insert(&seq, info.clone());
    if !is_bold {
        *max_left_pad = (*max_left_pad).max(left_pad);
    }

    for &(shifted, offset) in shifts {
        if shifted == char && left_pad + offset >= 0 && right_pad - offset >= 0 {
            plain.insert(
                &seq,
                CharInfo {
                    left_pad: left_pad + offset,
                    right_pad: right_pad - offset,
                    variant: Some(eco_format!("shifted {char:?}")),
                    ..info.clone()
                },
            );
        }
    }

    if height > 12 {
        if !CUT_BOTTOM_EXEMPT.contains(char) {
            let cut: Vec<_> =
                cell.iter().map(|&c| c & !(1 << (height - 1))).collect();
            if cut != cell
                && let Some((seq, left_pad, right_pad)) = trim(&cut)
            {
                cut_bottom.insert(
                    &seq,
                    CharInfo {
                        left_pad,
                        right_pad,
                        cut_bottom: 1,
                        ..info.clone()
                    },
                );
            }
        }
        if !CUT_TOP_EXEMPT.contains(char) {
            let cut: Vec<_> = cell.iter().map(|&c| c >> 1).collect();
            if cut != cell
                && let Some((seq, left_pad, right_pad)) = trim(&cut)
            {
                cut_top.insert(
                    &seq,
                    CharInfo { left_pad, right_pad, cut_top: 1, ..info.clone() },
                );
            }
        }
    }
}

/// Build a monospace font from a strip laid out in `glyphs` order.
pub fn build_mono(
    name: &str,
    group: &str,
    base: i32,
    italic_offsets: &[i32],
    glyphs: &str,
    strip: &Strip,
) -> Result<Font, FontError> {
    let count = glyphs.chars().count() as i32;
    if count == 0 || strip.width % count != 0 {
        return Err(FontError::BadStrip(eco_format!(
            "{name}: strip width {} does not divide into {count} cells",
            strip.width,
        )));
    }
    let width = strip.width / count;
    let height = strip.height;
    let shifts = if name == "Regular" || name == "Italic" {
        SHIFTED_VARIANTS
    } else {
        &[]
    };

    let mut plain = Fsa::new();
    let mut cut_bottom = Fsa::new();
    let mut cut_top = Fsa::new();
    let mut max_left_pad = 0;
    for (i, char) in glyphs.chars().enumerate() {
        if UNUSED_GLYPHS.contains(char) {
            continue;
        }
        let cell: Vec<_> =
            (0..width).map(|j| strip.column(i as i32 * width + j)).collect();
        insert_cell(
            char,
            &cell,
            false,
            height,
            shifts,
            &mut plain,
            &mut cut_bottom,
            &mut cut_top,
            &mut max_left_pad,
        );
        let bold = embolden(&cell);
        insert_cell(
            char,
            &bold,
            true,
            height,
            shifts,
            &mut plain,
            &mut cut_bottom,
            &mut cut_top,
            &mut max_left_pad,
        );
    }

    Ok(Font {
        name: name.into(),
        group: group.into(),
        is_mono: true,
        width,
        space_width: width,
        height,
        base,
        initial_padding: max_left_pad,
        italic_offsets: italic_offsets.to_vec(),
        plain,
        cut_bottom,
        cut_top,
    })
}

/// Build the proportional serif font from a strip whose glyphs are separated
/// by at least two blank columns.
pub fn build_serif(name: &str, glyphs: &str, strip: &Strip) -> Result<Font, FontError> {
    let columns: Vec<_> = (0..strip.width).map(|x| strip.column(x)).collect();

    // Split into segments; a single interior blank column (as in a double
    // quote) stays within its glyph.
    let mut segments: Vec<Vec<u64>> = Vec::new();
    let mut current: Vec<u64> = Vec::new();
    let mut blanks = 0;
    for &column in &columns {
        if column == 0 {
            blanks += 1;
            if !current.is_empty() && blanks < 2 {
                current.push(column);
            } else if !current.is_empty() && blanks == 2 {
                current.pop();
                segments.push(std::mem::take(&mut current));
            }
        } else {
            blanks = 0;
            current.push(column);
        }
    }
    if !current.is_empty() {
        while current.last() == Some(&0) {
            current.pop();
        }
        segments.push(current);
    }

    let count = glyphs.chars().count();
    if segments.len() != count {
        return Err(FontError::BadStrip(eco_format!(
            "{name}: found {} glyph segments, expected {count}",
            segments.len(),
        )));
    }

    let mut plain = Fsa::new();
    for (char, seq) in glyphs.chars().zip(&segments) {
        if UNUSED_GLYPHS.contains(char) {
            continue;
        }
        plain.insert(seq, char_info(char, 0, 0));
    }

    Ok(Font {
        name: name.into(),
        group: name.into(),
        is_mono: false,
        width: 0,
        space_width: SERIF_SPACE_WIDTH,
        height: strip.height,
        base: strip.height - 4,
        initial_padding: 2,
        italic_offsets: Vec::new(),
        plain,
        cut_bottom: Fsa::new(),
        cut_top: Fsa::new(),
    })
}

/// Load the standard font set from a directory of strip images.
pub fn load_standard(assets: &Path) -> Result<FontRegistry, FontError> {
    let mut fonts = Vec::new();
    for spec in MONO_STRIPS {
        let strip = Strip::decode(&assets.join(spec.file))?;
        fonts.push(build_mono(
            spec.name,
            spec.group,
            spec.base,
            spec.italic_offsets,
            GLYPHS,
            &strip,
        )?);
    }

    // The italic variant re-reads the Regular strip with shear offsets.
    let regular = Strip::decode(&assets.join("regular13.png"))?;
    fonts.push(build_mono("Italic", "LC13", 10, ITALIC_OFFSETS, GLYPHS, &regular)?);

    let serif_glyphs: String = GLYPHS.chars().chain(SERIF_EXTRA.chars()).collect();
    let serif = Strip::decode(&assets.join("serif.png"))?;
    fonts.push(build_serif("Serif", &serif_glyphs, &serif)?);

    Ok(FontRegistry::new(fonts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Pixel;

    #[test]
    fn test_trim() {
        assert_eq!(trim(&[0, 0b1, 0b10, 0]), Some((vec![0b1, 0b10], 1, 1)));
        assert_eq!(trim(&[0, 0, 0]), None);
    }

    #[test]
    fn test_embolden() {
        assert_eq!(embolden(&[0b1, 0b10]), vec![0b1, 0b11, 0b10]);
    }

    #[test]
    fn test_build_mono_rejects_bad_width() {
        let strip = Strip::from_rows(&["###", "###"]);
        assert!(build_mono("Regular", "LC13", 10, &[], "ab", &strip).is_err());
    }

    #[test]
    fn test_mono_cells() {
        // Two 3-wide cells: a vertical bar and an L shape.
        let strip = Strip::from_rows(&[
            ".#..#.",
            ".#..#.",
            ".#..##",
        ]);
        let font = build_mono("Small", "LC11", 2, &[], "il", &strip).unwrap();
        assert_eq!(font.width, 3);
        assert_eq!(font.height, 3);
        assert_eq!(font.initial_padding, 1);
        let mut image = crate::image::SparseImage::empty(20, 10);
        for (x, y) in [(4, 1), (4, 2), (4, 3)] {
            image.insert(Pixel::new(x, y), crate::color::Color::BLACK);
        }
        let hit = font
            .get_char(Pixel::new(3, 1), &image, true, None)
            .expect("recognizes the bar glyph");
        assert_eq!(hit.char_box.char, 'i');
        assert!(!hit.char_box.is_bold);
        assert_eq!(hit.char_box.pixels.len(), 3);
    }

    #[test]
    fn test_serif_segments() {
        let strip = Strip::from_rows(&[
            "#..#.#..##",
            "#..#.#..#.",
        ]);
        let font = build_serif("Serif", "abc", &strip).unwrap();
        assert!(!font.is_mono);
        assert!(font.get_char(Pixel::new(0, 0), &crate::image::SparseImage::empty(4, 4), true, None).is_some());
    }
}
