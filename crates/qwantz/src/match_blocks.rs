//! Block attribution.
//!
//! Tail matches attach characters to single text lines; this pass lifts
//! them to whole blocks, splitting a block when two speakers claim
//! different rows of it, and propagates speakers across line-to-line
//! connectors until nothing changes.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::block::{BlockId, TextBlock};
use crate::diag::Sink;
use crate::match_tails::Target;
use crate::textline::{LineId, TextLine};

/// Who a block is attributed to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Speaker {
    /// An index into the panel's character list.
    Character(usize),
    OffPanel,
    /// Two or more distinct off-panel voices share the block.
    MultiOffPanel,
}

/// The result of block matching.
#[derive(Debug, Default)]
pub struct BlockMatches {
    /// Live block ids after splitting, in arena order.
    pub blocks: Vec<BlockId>,
    /// The speakers attributed to each matched block.
    pub speakers: FxHashMap<BlockId, Vec<Speaker>>,
    /// Line-to-line connectors that never reached an attributed block.
    pub unresolved: Vec<(LineId, LineId)>,
}

/// Lift tail attributions onto the block arena.
pub fn match_blocks<'a>(
    line_matches: &[(Target, Target)],
    arena: &mut Vec<TextBlock<'a>>,
    lines: &[TextLine],
    sink: &mut Sink,
) -> BlockMatches {
    let mut by_line: FxHashMap<LineId, BlockId> = FxHashMap::default();
    for (id, block) in arena.iter().enumerate() {
        for line in block.line_ids() {
            by_line.insert(line, id);
        }
    }

    let mut speakers: FxHashMap<BlockId, (Vec<Speaker>, LineId)> = FxHashMap::default();
    let mut split_born: FxHashSet<BlockId> = FxHashSet::default();
    let mut neighbors: Vec<(LineId, LineId)> = Vec::new();

    for &(target1, target2) in line_matches {
        match (target1, target2) {
            (Target::Line(a), Target::Line(b)) => neighbors.push((a, b)),
            _ => {
                let (speaker, line) = split_match(target1, target2);
                let block = by_line[&line];
                attach(
                    block,
                    speaker,
                    line,
                    arena,
                    &mut by_line,
                    &mut speakers,
                    &mut split_born,
                    sink,
                );
            }
        }
    }

    // Propagate speakers across connectors to a fixed point.
    while !neighbors.is_empty() {
        let mut remaining = Vec::new();
        let mut progress = false;
        for (line1, line2) in neighbors.drain(..) {
            let block1 = by_line[&line1];
            let block2 = by_line[&line2];
            if block1 == block2 {
                let block = &arena[block1];
                if block.row_index(line1) == block.row_index(line2) {
                    crate::warn!(
                        sink,
                        "connector joins two text lines in one row: {:?} -- {:?}",
                        lines[line1].content(),
                        lines[line2].content(),
                    );
                    continue;
                }
                let Some((first, second, _)) = block.split(line1, line2) else {
                    continue;
                };
                crate::warn!(
                    sink,
                    "splitting a block along a connector: [{:?}], [{:?}]",
                    lines[first.rows[0][0]].content(),
                    lines[second.rows[0][0]].content(),
                );
                let (id1, id2) =
                    install_split(first, second, arena, &mut by_line, &mut split_born);
                if let Some(matched) = speakers.remove(&block1) {
                    speakers.insert(id1, matched.clone());
                    speakers.insert(id2, matched);
                }
                remaining.push((line1, line2));
                progress = true;
                continue;
            }

            let edge1 = is_edge_row(&arena[block1], line1);
            let edge2 = is_edge_row(&arena[block2], line2);
            if !(edge1 && edge2) {
                let shouting = lines[line1].is_bold()
                    && lines[line2].is_bold()
                    && !lines[line1].content().chars().any(char::is_lowercase)
                    && !lines[line2].content().chars().any(char::is_lowercase);
                if !shouting {
                    crate::warn!(
                        sink,
                        "connector reaches inside a block: {:?} -- {:?}",
                        lines[line1].content(),
                        lines[line2].content(),
                    );
                }
            }

            match (speakers.contains_key(&block1), speakers.contains_key(&block2)) {
                (true, true) => {
                    // Both ends already speak: pour the earlier block's
                    // speakers into the later one.
                    let first_is_upper = arena[block1].start(lines).y
                        <= arena[block2].start(lines).y;
                    let (upper, lower) =
                        if first_is_upper { (block1, block2) } else { (block2, block1) };
                    let upper_speakers = speakers[&upper].0.clone();
                    let entry = speakers.get_mut(&lower).unwrap();
                    for speaker in upper_speakers {
                        if !entry.0.contains(&speaker) {
                            entry.0.push(speaker);
                        }
                    }
                    progress = true;
                }
                (true, false) => {
                    let inherited = speakers[&block1].0.clone();
                    speakers.insert(block2, (inherited, line2));
                    progress = true;
                }
                (false, true) => {
                    let inherited = speakers[&block2].0.clone();
                    speakers.insert(block1, (inherited, line1));
                    progress = true;
                }
                (false, false) => remaining.push((line1, line2)),
            }
        }
        if !progress {
            if !remaining.is_empty() {
                crate::warn!(sink, "unresolved text line connectors: {}", remaining.len());
            }
            neighbors = remaining;
            break;
        }
        neighbors = remaining;
    }

    let blocks: Vec<BlockId> = {
        let unique: FxHashSet<BlockId> = by_line.values().copied().collect();
        let mut ids: Vec<_> = unique.into_iter().collect();
        ids.sort_unstable();
        ids
    };

    BlockMatches {
        blocks,
        speakers: speakers.into_iter().map(|(id, (list, _))| (id, list)).collect(),
        unresolved: neighbors,
    }
}

/// Attach one speaker to the block owning `line`.
#[allow(clippy::too_many_arguments)]
fn attach<'a>(
    block: BlockId,
    speaker: Speaker,
    line: LineId,
    arena: &mut Vec<TextBlock<'a>>,
    by_line: &mut FxHashMap<LineId, BlockId>,
    speakers: &mut FxHashMap<BlockId, (Vec<Speaker>, LineId)>,
    split_born: &mut FxHashSet<BlockId>,
    sink: &mut Sink,
) {
    let Some((prev_speakers, prev_line)) = speakers.get(&block).cloned() else {
        speakers.insert(block, (vec![speaker], line));
        return;
    };

    if arena[block].can_split(prev_line, line) {
        if split_born.contains(&block) {
            // A block splits only once; a third speaker on yet another row
            // has nowhere to go.
            crate::warn!(sink, "third speaker dropped from an already split block");
            return;
        }
        let Some((first, second, severed)) = arena[block].split(prev_line, line) else {
            return;
        };
        if severed.no_gap && (severed.left_aligned || severed.char_aligned) {
            crate::warn!(
                sink,
                "splitting tightly bound rows (bond strength {})",
                severed.strength(),
            );
        }
        let (id1, id2) = install_split(first, second, arena, by_line, split_born);
        speakers.remove(&block);
        speakers.insert(id1, (prev_speakers, prev_line));
        speakers.insert(id2, (vec![speaker], line));
        return;
    }

    // The same line (or row) speaks for two voices at once.
    if prev_speakers.len() == 2 {
        crate::warn!(sink, "more than two speakers share a line");
    }
    if prev_line != line {
        crate::warn!(sink, "two attributed lines share every row bond");
    }
    let entry = speakers.get_mut(&block).unwrap();
    let list = &mut entry.0;
    if speaker == Speaker::OffPanel && list.contains(&Speaker::OffPanel) {
        list.retain(|s| *s != Speaker::OffPanel);
        list.push(Speaker::MultiOffPanel);
    } else if speaker == Speaker::OffPanel && list.contains(&Speaker::MultiOffPanel) {
        // Already folded.
    } else {
        list.push(speaker);
    }
}

/// Append both halves of a split to the arena and remap their lines.
fn install_split<'a>(
    first: TextBlock<'a>,
    second: TextBlock<'a>,
    arena: &mut Vec<TextBlock<'a>>,
    by_line: &mut FxHashMap<LineId, BlockId>,
    split_born: &mut FxHashSet<BlockId>,
) -> (BlockId, BlockId) {
    let id1 = arena.len();
    arena.push(first);
    let id2 = arena.len();
    arena.push(second);
    for id in [id1, id2] {
        for line in arena[id].line_ids().collect::<Vec<_>>() {
            by_line.insert(line, id);
        }
        split_born.insert(id);
    }
    (id1, id2)
}

/// Split a mixed attribution into its speaker and line sides.
fn split_match(target1: Target, target2: Target) -> (Speaker, LineId) {
    let (speaker_target, line_target) =
        if target1.is_line() { (target2, target1) } else { (target1, target2) };
    let speaker = match speaker_target {
        Target::Character(id) => Speaker::Character(id),
        _ => Speaker::OffPanel,
    };
    let Target::Line(line) = line_target else {
        unreachable!("tail matches always carry a line side");
    };
    (speaker, line)
}

/// Whether the line sits in the block's first or last row.
fn is_edge_row(block: &TextBlock, line: LineId) -> bool {
    match block.row_index(line) {
        Some(index) => index == 0 || index + 1 == block.rows.len(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::get_text_blocks;
    use crate::testing::{fake_line, mono_font};

    #[test]
    fn test_two_speaker_split() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (10, 10), "top top top", false),
            fake_line(&font, (10, 23), "still top", false),
            fake_line(&font, (13, 38), "now bottom", false),
            fake_line(&font, (13, 51), "bottom", false),
        ];
        let mut arena = get_text_blocks(&lines);
        assert_eq!(arena.len(), 1);
        let matches = vec![
            (Target::Character(0), Target::Line(0)),
            (Target::Character(1), Target::Line(3)),
        ];
        let mut sink = Sink::new();
        let result = match_blocks(&matches, &mut arena, &lines, &mut sink);
        assert_eq!(result.blocks.len(), 2);
        let [a, b] = result.blocks[..] else { panic!() };
        assert_eq!(result.speakers[&a], vec![Speaker::Character(0)]);
        assert_eq!(result.speakers[&b], vec![Speaker::Character(1)]);
        assert_eq!(arena[a].rows.len(), 2);
        assert_eq!(arena[b].rows.len(), 2);
    }

    #[test]
    fn test_double_off_panel_folds() {
        let font = mono_font();
        let lines = vec![fake_line(&font, (10, 10), "WHO SAID THAT", true)];
        let mut arena = get_text_blocks(&lines);
        let matches = vec![
            (Target::OffPanel, Target::Line(0)),
            (Target::Line(0), Target::OffPanel),
        ];
        let mut sink = Sink::new();
        let result = match_blocks(&matches, &mut arena, &lines, &mut sink);
        assert_eq!(result.speakers[&0], vec![Speaker::MultiOffPanel]);
    }

    #[test]
    fn test_neighbor_propagation() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (10, 10), "spoken", false),
            fake_line(&font, (200, 10), "echoed", false),
        ];
        let mut arena = get_text_blocks(&lines);
        assert_eq!(arena.len(), 2);
        let matches = vec![
            (Target::Character(0), Target::Line(0)),
            (Target::Line(0), Target::Line(1)),
        ];
        let mut sink = Sink::new();
        let result = match_blocks(&matches, &mut arena, &lines, &mut sink);
        assert_eq!(result.speakers[&0], vec![Speaker::Character(0)]);
        assert_eq!(result.speakers[&1], vec![Speaker::Character(0)]);
        assert!(result.unresolved.is_empty());
    }

    #[test]
    fn test_third_speaker_dropped() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (10, 10), "one one one", false),
            fake_line(&font, (13, 25), "two two two", false),
            fake_line(&font, (10, 40), "three three", false),
        ];
        let mut arena = get_text_blocks(&lines);
        assert_eq!(arena.len(), 1);
        let matches = vec![
            (Target::Character(0), Target::Line(0)),
            (Target::Character(1), Target::Line(1)),
            (Target::Character(2), Target::Line(2)),
        ];
        let mut sink = Sink::new();
        let result = match_blocks(&matches, &mut arena, &lines, &mut sink);
        assert_eq!(result.blocks.len(), 2);
        let all: Vec<_> =
            result.blocks.iter().flat_map(|id| result.speakers[id].clone()).collect();
        assert!(!all.contains(&Speaker::Character(2)));
        assert!(
            sink.diagnostics()
                .iter()
                .any(|d| d.message.contains("third speaker"))
        );
    }
}
