//! Text block assembly.
//!
//! Text lines that share a baseline group into rows; rows stack into
//! paragraphs when their horizontal extents overlap and their style
//! matches. The bond strength between adjacent rows decides where a block
//! splits when two speakers turn out to share it.

use ecow::{EcoString, eco_format};

use crate::color::Color;
use crate::diag::Sink;
use crate::font::{CharBox, Font};
use crate::geom::{Box, Pixel};
use crate::hyphen::Dictionaries;
use crate::textline::{LineId, TextLine, group_text_lines};

/// An index into the per-panel block arena.
pub type BlockId = usize;

/// Word-final punctuation that delimits the pieces around a row break.
const WORD_DELIMITERS: &str = ".,!?\" ";

/// How two stacked rows align.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Alignment {
    pub left_aligned: bool,
    pub char_aligned: bool,
    pub no_gap: bool,
}

impl Alignment {
    /// The bond strength between the rows; blocks split at the weakest bond.
    pub fn strength(self) -> i32 {
        5 * self.left_aligned as i32
            + 3 * (self.char_aligned && !self.left_aligned) as i32
            + 10 * self.no_gap as i32
    }
}

/// A paragraph of stacked rows sharing font group and color.
#[derive(Debug, Clone)]
pub struct TextBlock<'a> {
    pub rows: Vec<Vec<LineId>>,
    /// One alignment per adjacent row pair.
    pub alignments: Vec<Alignment>,
    pub color: Color,
    pub font: &'a Font,
}

impl<'a> TextBlock<'a> {
    /// The top-left corner of the first line.
    pub fn start(&self, lines: &[TextLine]) -> Pixel {
        lines[self.rows[0][0]].start()
    }

    /// The bottom-right corner of the last line.
    pub fn end(&self, lines: &[TextLine]) -> Pixel {
        let row = self.rows.last().unwrap();
        lines[*row.last().unwrap()].end()
    }

    /// The bounding box over all rows.
    pub fn bounds(&self, lines: &[TextLine]) -> Box {
        let top = self.start(lines).y;
        let bottom = self.end(lines).y;
        let left = self
            .rows
            .iter()
            .map(|row| lines[row[0]].start().x)
            .min()
            .unwrap_or(0);
        let right = self
            .rows
            .iter()
            .map(|row| lines[*row.last().unwrap()].end().x)
            .max()
            .unwrap_or(0);
        Box::from_coords(left, top, right, bottom)
    }

    /// All line ids, top to bottom, left to right.
    pub fn line_ids(&self) -> impl Iterator<Item = LineId> + '_ {
        self.rows.iter().flatten().copied()
    }

    pub fn is_bold(&self, lines: &[TextLine]) -> bool {
        self.line_ids().all(|id| lines[id].is_bold())
    }

    pub fn is_italic(&self, lines: &[TextLine]) -> bool {
        self.line_ids().all(|id| lines[id].is_italic())
    }

    /// The row a line belongs to.
    pub fn row_index(&self, line: LineId) -> Option<usize> {
        self.rows.iter().position(|row| row.contains(&line))
    }

    /// Whether an attribution conflict between the two lines can be
    /// resolved by splitting.
    pub fn can_split(&self, line1: LineId, line2: LineId) -> bool {
        self.row_index(line1) != self.row_index(line2)
    }

    /// Split at the weakest bond strictly between the two lines' rows.
    ///
    /// The first returned block is the one containing `line1`. Also returns
    /// the alignment that was severed.
    pub fn split(
        &self,
        line1: LineId,
        line2: LineId,
    ) -> Option<(TextBlock<'a>, TextBlock<'a>, Alignment)> {
        let index1 = self.row_index(line1)?;
        let index2 = self.row_index(line2)?;
        let (lo, hi) = (index1.min(index2), index1.max(index2));
        let split = (lo..hi)
            .min_by_key(|&i| (self.alignments[i].strength(), i))?;
        let severed = self.alignments[split];
        let first = TextBlock {
            rows: self.rows[..=split].to_vec(),
            alignments: self.alignments[..split].to_vec(),
            color: self.color,
            font: self.font,
        };
        let second = TextBlock {
            rows: self.rows[split + 1..].to_vec(),
            alignments: self.alignments[split + 1..].to_vec(),
            color: self.color,
            font: self.font,
        };
        if index1 < index2 {
            Some((first, second, severed))
        } else {
            Some((second, first, severed))
        }
    }

    /// Descriptions of non-canonical glyph shapes used by this block.
    pub fn variants<'l>(
        &'l self,
        lines: &'l [TextLine<'a>],
    ) -> impl Iterator<Item = &'l EcoString> {
        self.line_ids().flat_map(|id| {
            lines[id].char_boxes.iter().filter_map(|cb| cb.variant.as_ref())
        })
    }

    /// Render the block's text.
    ///
    /// Rows join with spaces; a row-final hyphen is kept or dropped by the
    /// dictionaries. Bold runs wrap in `◖…◗`, italic runs in `▹…◃`.
    pub fn content(
        &self,
        lines: &[TextLine],
        dicts: &Dictionaries,
        sink: &mut Sink,
        options: ContentOptions,
    ) -> EcoString {
        let mut char_boxes: Vec<CharBox> = Vec::new();
        for row in &self.rows {
            if let Some(last) = char_boxes.last().cloned() {
                let hyphen = last.char == '-'
                    && char_boxes.len() >= 2
                    && !matches!(char_boxes[char_boxes.len() - 2].char, ' ' | '-');
                if !hyphen {
                    char_boxes.push(CharBox::space(
                        last.is_bold,
                        last.is_italic,
                        last.bounds,
                    ));
                } else {
                    let mut reversed = Vec::new();
                    for cb in char_boxes[..char_boxes.len() - 1].iter().rev() {
                        if WORD_DELIMITERS.contains(cb.char) {
                            break;
                        }
                        reversed.push(cb.char);
                    }
                    let last_words: EcoString = reversed.into_iter().rev().collect();
                    let next_content = lines[row[0]].content();
                    let next_words: EcoString = next_content
                        .chars()
                        .take_while(|&c| c != ']' && !WORD_DELIMITERS.contains(c))
                        .collect();
                    let part1: Vec<&str> = last_words.split('-').collect();
                    let part2: Vec<&str> = next_words.split('-').collect();
                    if !dicts.disambiguate(&part1, &part2, sink) {
                        char_boxes.pop();
                    }
                    sink.info(eco_format!(
                        "line ending with hyphen ({last_words}/{next_words})"
                    ));
                }
            }
            let mut previous: Option<&TextLine> = None;
            for &id in row {
                let line = &lines[id];
                if let Some(prev) = previous
                    && line.bounds(0).left() - prev.bounds(0).right()
                        >= line.font.space_width / 2
                {
                    let style = prev.char_boxes.last().unwrap();
                    char_boxes.push(CharBox::space(
                        style.is_bold,
                        style.is_italic,
                        style.bounds,
                    ));
                }
                char_boxes.extend(line.char_boxes.iter().cloned());
                previous = Some(line);
            }
        }

        let mut content = EcoString::new();
        let mut run = EcoString::new();
        let mut style: Option<(bool, bool)> = None;
        for cb in &char_boxes {
            let key = (cb.is_bold && options.mark_bold, cb.is_italic && options.mark_italic);
            if style != Some(key) {
                if let Some(style) = style {
                    flush_run(&mut content, &mut run, style);
                }
                style = Some(key);
            }
            run.push(cb.char);
        }
        if let Some(style) = style {
            flush_run(&mut content, &mut run, style);
        }

        let content = content.replace("  ", " ");
        if options.include_font_name && !matches!(self.font.name.as_str(), "Regular" | "Italic") {
            let name = self.font.name.to_lowercase();
            eco_format!("«{name}» {content}")
        } else {
            content.into()
        }
    }
}

/// Rendering options for [`TextBlock::content`].
#[derive(Debug, Copy, Clone)]
pub struct ContentOptions {
    pub mark_bold: bool,
    pub mark_italic: bool,
    pub include_font_name: bool,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self { mark_bold: true, mark_italic: true, include_font_name: false }
    }
}

/// Close a styled run, wrapping it in its markers. Trailing spaces move
/// outside the markers.
fn flush_run(content: &mut EcoString, run: &mut EcoString, (bold, italic): (bool, bool)) {
    let text = std::mem::take(run);
    if (!bold && !italic) || text.trim_end().is_empty() {
        content.push_str(&text);
        return;
    }
    let trimmed = text.trim_end().len();
    let (open, close) = if bold { ('◖', '◗') } else { ('▹', '◃') };
    content.push(open);
    content.push_str(&text.as_str()[..trimmed]);
    content.push(close);
    content.push_str(&text.as_str()[trimmed..]);
}

/// Stack grouped rows into blocks.
pub fn get_text_blocks<'a>(lines: &[TextLine<'a>]) -> Vec<TextBlock<'a>> {
    let mut rows = group_text_lines(lines, true, true);
    let mut blocks = Vec::new();
    while !rows.is_empty() {
        let mut leftover = Vec::new();
        let mut block_rows = vec![rows[0].clone()];
        let mut alignments = Vec::new();
        let first_line = &lines[rows[0][0]];
        let font = first_line.font;
        let color = first_line.color;
        for row in rows.drain(1..) {
            let all_bold = block_rows
                .iter()
                .flatten()
                .all(|&id| lines[id].is_bold());
            match fit_to_block(&row, block_rows.last().unwrap(), font, color, all_bold, lines)
            {
                Some(alignment) => {
                    block_rows.push(row);
                    alignments.push(alignment);
                }
                None => leftover.push(row),
            }
        }
        blocks.push(TextBlock { rows: block_rows, alignments, color, font });
        rows = leftover;
    }
    blocks
}

/// Whether a row continues the block ending in `previous`, and how well.
fn fit_to_block(
    row: &[LineId],
    previous: &[LineId],
    font: &Font,
    color: Color,
    block_all_bold: bool,
    lines: &[TextLine],
) -> Option<Alignment> {
    let first = &lines[row[0]];
    if first.font.group != font.group || first.color != color {
        return None;
    }
    if block_all_bold && !row.iter().any(|&id| lines[id].contains_bold()) {
        return None;
    }

    let left = first.bounds(0).left();
    let right = lines[*row.last().unwrap()].bounds(0).right();
    let top = row.iter().map(|&id| lines[id].bounds(0).top()).min().unwrap();
    let prev_left = lines[previous[0]].bounds(0).left();
    let prev_right = lines[*previous.last().unwrap()].bounds(0).right();
    let prev_bottom =
        previous.iter().map(|&id| lines[id].bounds(0).bottom()).max().unwrap();

    let overlap = right.min(prev_right) - left.max(prev_left);
    if overlap < font.space_width {
        return None;
    }
    if top < prev_bottom - 1 || top > prev_bottom + font.height / 6 {
        return None;
    }

    Some(Alignment {
        left_aligned: prev_left == left,
        char_aligned: font.is_mono && (prev_left - left).rem_euclid(font.space_width) == 0,
        no_gap: top <= prev_bottom,
    })
}

/// Order blocks for emission.
///
/// A block comes first when it ends above the other's midline; otherwise
/// the left one comes first if its bottom is also above the other's.
/// Remaining ties are read in bottom-then-left order and reported.
pub fn sort_blocks(
    blocks: Vec<BlockId>,
    arena: &[TextBlock],
    lines: &[TextLine],
    sink: &mut Sink,
) -> Vec<BlockId> {
    // Insertion sort: the order is a partial one and the lists are short.
    let mut sorted: Vec<BlockId> = Vec::with_capacity(blocks.len());
    for id in blocks {
        let mut at = sorted.len();
        for (i, &other) in sorted.iter().enumerate() {
            if precedes(&arena[id], &arena[other], lines, sink) {
                at = i;
                break;
            }
        }
        sorted.insert(at, id);
    }
    sorted
}

fn precedes(a: &TextBlock, b: &TextBlock, lines: &[TextLine], sink: &mut Sink) -> bool {
    let (a_start, a_end) = (a.start(lines), a.end(lines));
    let (b_start, b_end) = (b.start(lines), b.end(lines));
    let a_above = a_end.y < (b_start.y + b_end.y) / 2;
    let b_above = b_end.y < (a_start.y + a_end.y) / 2;
    match (a_above, b_above) {
        (true, false) => true,
        (false, true) => false,
        _ => {
            let a_leftmost = a_start.x <= b_start.x;
            let (left_end, right_end) = if a_leftmost { (a_end, b_end) } else { (b_end, a_end) };
            if left_end.y < right_end.y {
                a_leftmost
            } else {
                crate::warn!(sink, "ambiguous block order");
                (a_end.y, a_end.x) < (b_end.y, b_end.x)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_line, fake_line_colored, mono_font};

    #[test]
    fn test_stacking_and_alignment() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (10, 10), "hello the", false),
            fake_line(&font, (10, 23), "re world", false),
            fake_line(&font, (200, 10), "far away", false),
        ];
        let blocks = get_text_blocks(&lines);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].rows.len(), 2);
        let alignment = blocks[0].alignments[0];
        assert!(alignment.left_aligned);
        assert!(alignment.no_gap);
        assert_eq!(alignment.strength(), 15);
    }

    #[test]
    fn test_color_split_blocks() {
        let font = mono_font();
        let lines = vec![
            fake_line_colored(&font, (10, 10), "in black", false, Color::BLACK),
            fake_line_colored(&font, (10, 23), "in red", false, Color::RED),
        ];
        let blocks = get_text_blocks(&lines);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_bold_block_rejects_plain_row() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (10, 10), "LOUD", true),
            fake_line(&font, (10, 23), "quiet", false),
        ];
        let blocks = get_text_blocks(&lines);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_split_at_weakest_bond() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (10, 10), "aaa", false),
            fake_line(&font, (10, 23), "bbb", false),
            fake_line(&font, (13, 38), "ccc", false),
            fake_line(&font, (13, 51), "ddd", false),
        ];
        let blocks = get_text_blocks(&lines);
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        // Rows 1-2 are gapped and unaligned: the weakest bond.
        let (first, second, severed) = block.split(0, 3).unwrap();
        assert_eq!(first.rows.len(), 2);
        assert_eq!(second.rows.len(), 2);
        assert!(!severed.no_gap);
        assert!(!severed.left_aligned);
    }

    #[test]
    fn test_content_markers() {
        let font = mono_font();
        let dicts = Dictionaries::from_words(&[], &[]);
        let mut sink = Sink::new();
        let lines = vec![fake_line(&font, (10, 10), "so BOLD", true)];
        let blocks = get_text_blocks(&lines);
        let content =
            blocks[0].content(&lines, &dicts, &mut sink, ContentOptions::default());
        assert_eq!(content, "◖so BOLD◗");
        let plain = blocks[0].content(
            &lines,
            &dicts,
            &mut sink,
            ContentOptions { mark_bold: false, ..ContentOptions::default() },
        );
        assert_eq!(plain, "so BOLD");
    }

    #[test]
    fn test_hyphen_join_across_rows() {
        let font = mono_font();
        let dicts = Dictionaries::from_words(&["dinosaur"], &[]);
        let mut sink = Sink::new();
        let lines = vec![
            fake_line(&font, (10, 10), "i am a dino-", false),
            fake_line(&font, (10, 23), "saur!", false),
        ];
        let blocks = get_text_blocks(&lines);
        assert_eq!(blocks.len(), 1);
        let content =
            blocks[0].content(&lines, &dicts, &mut sink, ContentOptions::default());
        assert_eq!(content, "i am a dinosaur!");
    }

    #[test]
    fn test_sort_vertical_dominance() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (100, 60), "second", false),
            fake_line(&font, (10, 10), "first", false),
        ];
        let arena = get_text_blocks(&lines);
        let mut sink = Sink::new();
        let ids: Vec<BlockId> = (0..arena.len()).collect();
        let sorted = sort_blocks(ids, &arena, &lines, &mut sink);
        assert_eq!(arena[sorted[0]].start(&lines), Pixel::new(10, 10));
        assert_eq!(arena[sorted[1]].start(&lines), Pixel::new(100, 60));
    }
}
