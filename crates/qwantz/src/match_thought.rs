//! Thought bubble attribution.

use crate::block::{BlockId, TextBlock};
use crate::geom::Box;
use crate::textline::TextLine;

/// The blocks lying inside exactly one thought bubble outline.
///
/// The outline is widened by one space so text hugging the scallops still
/// counts as contained.
pub fn match_thought(
    thoughts: &[Box],
    candidates: &[BlockId],
    arena: &[TextBlock],
    lines: &[TextLine],
) -> Vec<BlockId> {
    candidates
        .iter()
        .copied()
        .filter(|&id| {
            let block = &arena[id];
            let bounds = block.bounds(lines);
            thoughts
                .iter()
                .filter(|outline| {
                    outline.with_margin(block.font.space_width, 0).contains(bounds)
                })
                .count()
                == 1
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::get_text_blocks;
    use crate::testing::{fake_line, mono_font};

    #[test]
    fn test_unique_containment() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (20, 20), "oh no", false),
            fake_line(&font, (200, 200), "outside", false),
        ];
        let arena = get_text_blocks(&lines);
        let thoughts = vec![Box::from_coords(10, 10, 80, 40)];
        let ids: Vec<BlockId> = (0..arena.len()).collect();
        let matched = match_thought(&thoughts, &ids, &arena, &lines);
        assert_eq!(matched, vec![0]);
    }
}
