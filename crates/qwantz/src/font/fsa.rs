//! The glyph recognition automaton.
//!
//! Every glyph variant of a font is a sequence of column bitmasks (bit `r`
//! set means the pixel in row `r` is inked). All sequences share one
//! automaton; accepting states carry the characters whose sequences end
//! there, together with their cell paddings and variant flags.

use ecow::EcoString;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// What an accepting state recognizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharInfo {
    pub char: char,
    /// Empty columns before the first inked column of the cell.
    pub left_pad: i32,
    /// Empty columns after the last inked column of the cell.
    pub right_pad: i32,
    pub is_bold: bool,
    /// Rows cut off the glyph top, for glyphs clipped from above.
    pub cut_top: i32,
    /// Rows cut off the glyph bottom.
    pub cut_bottom: i32,
    /// Set for non-canonical shapes (shifted punctuation, cut glyphs).
    pub variant: Option<EcoString>,
}

/// A state of the automaton.
#[derive(Debug, Clone, Default)]
struct State {
    edges: FxHashMap<u64, u32>,
    accept: SmallVec<[CharInfo; 1]>,
}

/// An accepting prefix found while walking the automaton.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    /// The number of columns consumed.
    pub len: usize,
    /// The recognized characters, one per glyph variant ending here.
    pub infos: &'a [CharInfo],
    /// Residual bits of the last column that belong to the next glyph.
    pub complement: Option<u64>,
}

/// A deterministic automaton over column bitmasks.
#[derive(Debug, Clone)]
pub struct Fsa {
    states: Vec<State>,
}

impl Fsa {
    /// Create an automaton with just the start state.
    pub fn new() -> Self {
        Self { states: vec![State::default()] }
    }

    /// Whether no sequence was inserted.
    pub fn is_empty(&self) -> bool {
        self.states.len() == 1
    }

    /// Insert a trimmed column sequence for one glyph variant.
    ///
    /// When two glyphs collapse to the same sequence, the first insertion
    /// wins, except that `O` supersedes `0` and `l` supersedes `1`.
    pub fn insert(&mut self, sequence: &[u64], info: CharInfo) {
        debug_assert!(!sequence.is_empty());
        let mut state = 0usize;
        for &column in sequence {
            let len = self.states.len();
            let next = *self.states[state]
                .edges
                .entry(column)
                .or_insert_with(|| len as u32);
            if next as usize == len {
                self.states.push(State::default());
            }
            state = next as usize;
        }
        let accept = &mut self.states[state].accept;
        if let Some(existing) = accept.iter_mut().find(|i| {
            i.left_pad == info.left_pad
                && i.is_bold == info.is_bold
                && i.cut_top == info.cut_top
                && i.cut_bottom == info.cut_bottom
        }) {
            if (existing.char, info.char) == ('0', 'O')
                || (existing.char, info.char) == ('1', 'l')
            {
                *existing = info;
            }
        } else {
            accept.push(info);
        }
    }

    /// Walk the automaton over a column stream.
    ///
    /// Returns every accepting prefix in ascending length. When `combine` is
    /// set and the walk gets stuck on a column, a unique outgoing edge whose
    /// column is a proper subset of the observed one is taken as a final
    /// step; the leftover bits are reported as the complement for the next
    /// recognition.
    pub fn walk(
        &self,
        mut column: impl FnMut(usize) -> u64,
        max_len: usize,
        combine: bool,
    ) -> Vec<Hit<'_>> {
        let mut hits = Vec::new();
        let mut state = 0usize;
        for i in 0..max_len {
            let observed = column(i);
            match self.states[state].edges.get(&observed) {
                Some(&next) => state = next as usize,
                None => {
                    if combine && observed != 0 {
                        let mut subsets = self.states[state].edges.iter().filter(
                            |&(&edge, _)| edge != 0 && edge != observed && edge & observed == edge,
                        );
                        if let (Some((&edge, &next)), None) = (subsets.next(), subsets.next()) {
                            let target = &self.states[next as usize];
                            if !target.accept.is_empty() {
                                hits.push(Hit {
                                    len: i + 1,
                                    infos: &target.accept,
                                    complement: Some(observed & !edge),
                                });
                            }
                        }
                    }
                    break;
                }
            }
            if !self.states[state].accept.is_empty() {
                hits.push(Hit {
                    len: i + 1,
                    infos: &self.states[state].accept,
                    complement: None,
                });
            }
        }
        hits
    }
}

impl Default for Fsa {
    fn default() -> Self {
        Self::new()
    }
}
