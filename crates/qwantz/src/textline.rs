//! Text lines and the glyph run scanner.

use ecow::EcoString;
use unicode_script::{Script, UnicodeScript};

use crate::color::Color;
use crate::diag::Sink;
use crate::font::{CharBox, Font};
use crate::geom::{Box, Pixel};
use crate::image::SparseImage;
use crate::tail;

/// Punctuation that may follow a word without permitting a second space.
const SENTENCE_PUNCTUATION: &str = ".,?!\"";

/// Characters an all-punctuation line may consist of.
const PUNCTUATION_ONLY: &str = " \",.'‘’“”|-/·•";

/// Latin glyphs that double as Greek ones in the serif font.
const GREEK_LOOKALIKES: &[(char, char)] = &[('v', 'ν'), ('o', 'ο'), ('ó', 'ό')];

/// A maximal run of glyphs recognized along one baseline.
#[derive(Debug, Clone)]
pub struct TextLine<'a> {
    pub char_boxes: Vec<CharBox>,
    pub font: &'a Font,
    pub color: Color,
}

/// An index into the per-panel text line arena.
pub type LineId = usize;

impl<'a> TextLine<'a> {
    /// The top-left corner of the first glyph.
    pub fn start(&self) -> Pixel {
        self.char_boxes[0].bounds.top_left
    }

    /// The bottom-right extent, accounting for italic overhang.
    pub fn end(&self) -> Pixel {
        let right = self.char_boxes.last().map_or(0, |cb| cb.bounds.right());
        let bottom = self.char_boxes.iter().map(|cb| cb.bounds.bottom()).max().unwrap_or(0);
        Pixel::new(right + self.font.italic_offsets.len() as i32, bottom)
    }

    /// The recognized text.
    pub fn content(&self) -> EcoString {
        self.char_boxes.iter().map(|cb| cb.char).collect()
    }

    /// Whether every glyph is bold.
    pub fn is_bold(&self) -> bool {
        self.char_boxes.iter().all(|cb| cb.is_bold)
    }

    /// Whether any non-space glyph is bold.
    pub fn contains_bold(&self) -> bool {
        self.char_boxes.iter().any(|cb| cb.char != ' ' && cb.is_bold)
    }

    pub fn is_italic(&self) -> bool {
        self.font.is_italic()
    }

    /// The enclosing box, optionally padded.
    pub fn bounds(&self, padding: i32) -> Box {
        let start = self.start();
        let end = self.end();
        Box::from_coords(
            start.x - padding,
            start.y - padding,
            end.x + padding,
            end.y + padding,
        )
    }

    /// The box trimmed to the baseline, shrunk by one pixel. Speech tails
    /// are matched against this so that descenders don't attract them.
    pub fn base_box(&self) -> Box {
        let start = self.start();
        let end = self.end();
        Box::from_coords(
            start.x + 1,
            start.y + 1,
            end.x - 1,
            (start.y + self.font.base).min(end.y) - 1,
        )
    }

    /// The lexicographically smallest producing pixel.
    pub fn find_pixel(&self) -> Option<Pixel> {
        self.char_boxes.first().and_then(|cb| cb.first_pixel())
    }

    /// Descriptions of the non-canonical glyph shapes this line used.
    pub fn variants(&self) -> impl Iterator<Item = &EcoString> {
        self.char_boxes.iter().filter_map(|cb| cb.variant.as_ref())
    }
}

/// Probe a neighbourhood around the seed for a text line in the given font.
///
/// Italic lines may start left of their first pixel because of the shear;
/// all fonts probe upwards because the seed is the topmost-leftmost pixel
/// of some glyph, not necessarily the cell corner.
pub fn try_text_line<'a>(
    start: Pixel,
    image: &SparseImage,
    font: &'a Font,
    sink: &mut Sink,
) -> Option<TextLine<'a>> {
    let max_x_offset = if font.is_italic() { font.space_width - 3 } else { 0 };
    let max_y_offset = font.height - 1;
    for x in (start.x - max_x_offset)..=start.x {
        for y in ((start.y - max_y_offset)..=start.y).rev() {
            if let Some(line) = get_text_line(Pixel::new(x, y), image, font, sink) {
                return Some(line);
            }
        }
    }
    None
}

/// Scan a maximal glyph run starting exactly at the given position.
pub fn get_text_line<'a>(
    start: Pixel,
    image: &SparseImage,
    font: &'a Font,
    sink: &mut Sink,
) -> Option<TextLine<'a>> {
    let first = font.get_char(start, image, true, None)?;
    if first.char_box.char == ' ' {
        return None;
    }
    let mut complement = first.complement;
    let mut char_boxes = vec![first.char_box];
    let mut spaces: Vec<CharBox> = Vec::new();
    let mut is_bold = char_boxes[0].is_bold;
    let mut is_italic = char_boxes[0].is_italic;
    let mut y = start.y;

    loop {
        let x = char_boxes.last().unwrap().bounds.right().max(
            spaces.last().map_or(0, |space| space.bounds.right()),
        );
        if x >= image.width() {
            break;
        }
        let mut recognized = font.get_char(Pixel::new(x, y), image, false, complement);
        complement = None;
        let mut jog_warning = None;

        // A one-pixel baseline jog is tolerated after a space.
        if recognized.is_none() && !spaces.is_empty() {
            for offset in [-1, 1] {
                let Some(jogged) = font.get_char(Pixel::new(x, y + offset), image, false, None)
                else {
                    continue;
                };
                let char = jogged.char_box.char;
                if char != ' ' && char != '_' && char != '\'' {
                    let so_far: EcoString = char_boxes
                        .iter()
                        .chain(&spaces)
                        .map(|cb| cb.char)
                        .collect();
                    jog_warning = Some(ecow::eco_format!(
                        "inline offset after {so_far:?}, before {char:?}: (0, {offset})"
                    ));
                    y += offset;
                    recognized = Some(jogged);
                    break;
                }
            }
        }

        let Some(next) = recognized else { break };
        complement = next.complement;
        let mut char_box = next.char_box;

        // Dots of `i` and `j` must not scan as a leading period, but a line
        // may still begin with an ellipsis.
        if char_boxes.len() == 1
            && char_boxes[0].char == '.'
            && char_box.char != '.'
        {
            return None;
        }

        // A lone stroke may really be the end of a speech tail.
        if matches!(char_box.char, '\'' | '|' | '-')
            && let Some(pixel) = char_box.first_pixel()
            && let Some(tail) = tail::get_tail(pixel, image)
        {
            let bounds = char_box.bounds;
            let [e1, e2] = tail.ends;
            if e1.x.min(e2.x) < bounds.left()
                || e1.y.min(e2.y) < bounds.top()
                || e1.x.max(e2.x) > bounds.right()
                || e1.y.max(e2.y) > bounds.bottom()
            {
                break;
            }
        }

        if let Some(warning) = jog_warning {
            sink.warn(warning);
        }

        if char_box.char == ' ' {
            if char_box.bounds.width() < font.space_width - 1 {
                sink.warn(ecow::eco_format!(
                    "short space after {:?}",
                    char_boxes.iter().map(|cb| cb.char).collect::<EcoString>(),
                ));
            }
            spaces.push(CharBox::space(is_bold, is_italic, char_box.bounds));
            let exploded = char_boxes.iter().skip(1).step_by(2).all(|cb| cb.char == ' ');
            let after_period = char_boxes
                .last()
                .is_some_and(|cb| SENTENCE_PUNCTUATION.contains(cb.char));
            if !exploded && spaces.len() > 1 && !after_period {
                break;
            }
            if !exploded && spaces.len() > 2 {
                break;
            }
            if spaces.len() > 3 {
                break;
            }
        } else {
            // The serif strip renders some Greek letters as Latin
            // look-alikes; neighbours decide which alphabet was meant.
            let prev = char_boxes.last().map(|cb| cb.char);
            if let Some(prev) = prev
                && prev.script() == Script::Greek
                && let Some(&(_, greek)) =
                    GREEK_LOOKALIKES.iter().find(|&&(latin, _)| latin == char_box.char)
            {
                char_box.char = greek;
            } else if char_box.char.script() == Script::Greek
                && let Some(last) = char_boxes.last_mut()
                && let Some(&(_, greek)) =
                    GREEK_LOOKALIKES.iter().find(|&&(latin, _)| Some(latin) == prev)
            {
                last.char = greek;
            }
            char_boxes.append(&mut spaces);
            is_bold = char_box.is_bold;
            is_italic = char_box.is_italic;
            char_boxes.push(char_box);
        }
    }

    let first_char = char_boxes[0].char;
    if char_boxes.len() == 1
        && !first_char.is_alphanumeric()
        && !matches!(first_char, '!' | '?' | '$')
        && !(first_char == '-' && font.group == "LC13")
    {
        return None;
    }
    if char_boxes.len() >= 2
        && char_boxes.iter().all(|cb| PUNCTUATION_ONLY.contains(cb.char))
        && char_boxes.iter().map(|cb| cb.char).collect::<EcoString>() != "..."
    {
        return None;
    }

    let mut char_boxes = adjust_spaces(char_boxes);
    if char_boxes.len() >= 5
        && char_boxes.iter().skip(1).step_by(2).all(|cb| cb.char == ' ')
    {
        char_boxes = char_boxes.into_iter().step_by(2).collect();
    }
    if char_boxes.len() > 2
        && char_boxes[char_boxes.len() - 1].char == '\''
        && char_boxes[char_boxes.len() - 2].char == ' '
    {
        char_boxes.truncate(char_boxes.len() - 2);
    }

    let color = image.get(char_boxes[0].first_pixel()?);
    Some(TextLine { char_boxes, font, color })
}

/// Narrow space boxes that overlap the following glyph; drop the ones that
/// become sliver-thin.
fn adjust_spaces(char_boxes: Vec<CharBox>) -> Vec<CharBox> {
    let mut result = Vec::with_capacity(char_boxes.len());
    for i in 0..char_boxes.len() {
        let cb = &char_boxes[i];
        match char_boxes.get(i + 1) {
            Some(next) if cb.char == ' ' && cb.bounds.right() > next.bounds.left() => {
                let narrowed = Box::new(
                    cb.bounds.top_left,
                    Pixel::new(next.bounds.left(), cb.bounds.bottom()),
                );
                if narrowed.width() > 2 {
                    result.push(cb.clone().with_bounds(narrowed));
                }
            }
            _ => result.push(cb.clone()),
        }
    }
    result
}

/// Re-join lines that one font split but another reads whole.
///
/// A style change mid-balloon can make a run scan as two lines in two
/// fonts; when re-scanning the run in a later member's font reproduces the
/// same right edge, the single line wins.
pub fn cleanup_text_lines<'a>(
    lines: Vec<TextLine<'a>>,
    image: &SparseImage,
    sink: &mut Sink,
) -> Vec<TextLine<'a>> {
    let mut sorted = lines;
    sorted.sort_by_key(|line| line.start());
    let groups = group_text_lines(&sorted, false, false);
    let mut result = Vec::with_capacity(sorted.len());
    for group in groups {
        if group.len() == 1 {
            result.push(sorted[group[0]].clone());
            continue;
        }
        let joined = join_group(&group, &sorted, image, sink);
        match joined {
            Some((line, upto)) => {
                result.push(line);
                result.extend(group[upto + 1..].iter().map(|&id| sorted[id].clone()));
            }
            None => result.extend(group.iter().map(|&id| sorted[id].clone())),
        }
    }
    result
}

/// Try to replace a group prefix with one line in a member's font.
fn join_group<'a>(
    group: &[LineId],
    lines: &[TextLine<'a>],
    image: &SparseImage,
    sink: &mut Sink,
) -> Option<(TextLine<'a>, usize)> {
    let first = &lines[group[0]];
    for &member in &group[1..] {
        let font = lines[member].font;
        if font.name == first.font.name {
            continue;
        }
        let start = first.find_pixel()?;
        let Some(candidate) = try_text_line(start, image, font, sink) else {
            continue;
        };
        let right = candidate.bounds(0).right();
        for (k, &id) in group.iter().enumerate().skip(1) {
            if (right - lines[id].bounds(0).right()).abs() < font.space_width / 2 {
                return Some((candidate, k));
            }
        }
    }
    None
}

/// Group lines that share a baseline into rows, left to right.
///
/// The lines must be sorted by start position. Returns indices into the
/// input.
pub fn group_text_lines(
    lines: &[TextLine],
    same_font: bool,
    long_space: bool,
) -> Vec<Vec<LineId>> {
    let mut groups: Vec<Vec<LineId>> = Vec::new();
    let mut used = vec![false; lines.len()];
    for i in 0..lines.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut group = vec![i];
        for j in 0..lines.len() {
            if used[j] {
                continue;
            }
            if same_font && lines[j].font.group != lines[i].font.group {
                continue;
            }
            let last = &lines[*group.last().unwrap()];
            let baseline = last.bounds(0).top() + last.font.base;
            let other_baseline = lines[j].bounds(0).top() + lines[j].font.base;
            if (baseline - other_baseline).abs() > 1 {
                continue;
            }
            let distance = lines[j].bounds(0).left() - last.bounds(0).right();
            let width = last.font.space_width.max(lines[j].font.space_width);
            let max_distance = if long_space { width * 3 } else { width * 2 + 1 };
            if -1 <= distance && distance <= max_distance {
                group.push(j);
                used[j] = true;
            }
        }
        groups.push(group);
    }
    groups
}
