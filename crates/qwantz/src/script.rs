//! Script emission.
//!
//! Orders the attributed blocks and renders each as one script line,
//! synthesizing the God, Devil and creepy-voice speakers for off-panel
//! blocks with the right typography.

use ecow::{EcoString, eco_format};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::block::{BlockId, ContentOptions, TextBlock};
use crate::color::Color;
use crate::diag::Sink;
use crate::geom::interval_distance;
use crate::hyphen::Dictionaries;
use crate::match_blocks::Speaker;
use crate::panel::Character;
use crate::textline::TextLine;

/// Everything the emitter needs about one parsed panel.
pub struct EmitInput<'a, 'p> {
    pub arena: &'p [TextBlock<'a>],
    /// Live blocks in emission order.
    pub order: &'p [BlockId],
    pub lines: &'p [TextLine<'a>],
    pub speakers: &'p FxHashMap<BlockId, Vec<Speaker>>,
    pub thoughts: &'p FxHashSet<BlockId>,
    pub characters: &'p [Character],
    pub banner: bool,
}

/// The synthesized speaker a block's typography may call for.
enum Rewrite {
    Devil,
    God,
    Creepy,
}

/// Render the panel's script lines.
pub fn emit(input: &EmitInput, dicts: &Dictionaries, sink: &mut Sink) -> Vec<EcoString> {
    let mut script = Vec::new();
    if input.banner {
        script.push(EcoString::from("Sign: ASK PROFESSOR SCIENCE"));
    }
    for &id in input.order {
        let block = &input.arena[id];
        let speakers = input.speakers.get(&id);
        let off_panel = speakers.is_some_and(|list| list == &[Speaker::OffPanel]);

        match rewrite(block, input.lines, off_panel, sink) {
            Some(Rewrite::Devil) => {
                script.push(attributed(block, "Devil", no_bold(), input, dicts, sink));
                continue;
            }
            Some(Rewrite::God) => {
                script.push(attributed(block, "God", no_bold(), input, dicts, sink));
                continue;
            }
            Some(Rewrite::Creepy) => {
                script.push(attributed(
                    block,
                    "Creepy voice(s)",
                    no_italic(),
                    input,
                    dicts,
                    sink,
                ));
                continue;
            }
            None => {}
        }

        if let Some(list) = speakers {
            let names: Vec<&str> = list.iter().map(|s| speaker_name(*s, input)).collect();
            let options = if names == ["Floating Batman head"] {
                ContentOptions::default()
            } else {
                ContentOptions { include_font_name: true, ..ContentOptions::default() }
            };
            script.push(attributed(block, &names.join(" and "), options, input, dicts, sink));
        } else if input.thoughts.contains(&id) {
            let content =
                block.content(input.lines, dicts, sink, ContentOptions::default());
            script.push(eco_format!("T-Rex: 〚thinks〛 {content}"));
        } else if !block.font.is_mono {
            let content =
                block.content(input.lines, dicts, sink, ContentOptions::default());
            script.push(eco_format!("Text: {content}"));
        } else {
            if !block.is_bold(input.lines) {
                crate::warn!(sink, "narrator not bold: {}", block.font.name);
            }
            let content = block.content(input.lines, dicts, sink, no_bold());
            script.push(eco_format!("Narrator: {content}"));
        }
    }
    script
}

/// Whether typography overrides the block's attribution.
///
/// All three voices shout: a block containing lowercase text keeps its
/// regular attribution no matter its color or weight.
fn rewrite(
    block: &TextBlock,
    lines: &[TextLine],
    off_panel: bool,
    sink: &mut Sink,
) -> Option<Rewrite> {
    let shouting = !block
        .line_ids()
        .any(|id| lines[id].content().chars().any(char::is_lowercase));
    let bold = block.is_bold(lines);
    if block.color == Color::RED {
        if !off_panel {
            crate::warn!(sink, "red block not off-panel");
        }
        if !bold {
            crate::warn!(sink, "red block not bold");
        }
        if off_panel && bold && shouting {
            return Some(Rewrite::Devil);
        }
    }
    if off_panel && bold && shouting {
        return Some(Rewrite::God);
    }
    if off_panel && block.is_italic(lines) && shouting {
        return Some(Rewrite::Creepy);
    }
    None
}

fn attributed(
    block: &TextBlock,
    names: &str,
    options: ContentOptions,
    input: &EmitInput,
    dicts: &Dictionaries,
    sink: &mut Sink,
) -> EcoString {
    let content = block.content(input.lines, dicts, sink, options);
    capitalize(eco_format!("{names}: {content}"))
}

fn speaker_name<'s>(speaker: Speaker, input: &'s EmitInput) -> &'s str {
    match speaker {
        Speaker::Character(id) => input.characters[id].name.as_str(),
        Speaker::OffPanel => "Off-Panel",
        Speaker::MultiOffPanel => "multiple off-panel voices",
    }
}

fn no_bold() -> ContentOptions {
    ContentOptions { mark_bold: false, ..ContentOptions::default() }
}

fn no_italic() -> ContentOptions {
    ContentOptions { mark_italic: false, ..ContentOptions::default() }
}

fn capitalize(line: EcoString) -> EcoString {
    let mut chars = line.chars();
    match chars.next() {
        Some(first) if !first.is_uppercase() => {
            first.to_uppercase().chain(chars).collect()
        }
        _ => line,
    }
}

/// Hand leftover quiet blocks to the speaker directly above or below them.
///
/// A block nobody points at often continues its neighbour's speech balloon.
pub fn adopt_above_or_below(
    unmatched: &[BlockId],
    speakers: &mut FxHashMap<BlockId, Vec<Speaker>>,
    arena: &[TextBlock],
    lines: &[TextLine],
) {
    for &id in unmatched {
        let block = &arena[id];
        if block.is_bold(lines) {
            continue;
        }
        let bounds = block.bounds(lines);
        let mut closest: Option<(i32, Vec<Speaker>)> = None;
        for (&other_id, list) in speakers.iter() {
            if list.is_empty() {
                continue;
            }
            let other = &arena[other_id];
            if other.font.group != block.font.group || other.color != block.color {
                continue;
            }
            let other_bounds = other.bounds(lines);
            if interval_distance(
                (bounds.left(), bounds.right()),
                (other_bounds.left(), other_bounds.right()),
            ) != 0
            {
                continue;
            }
            let distance = (other_bounds.top() - bounds.bottom())
                .max(bounds.top() - other_bounds.bottom());
            let line_height = block.font.height.max(other.font.height);
            if distance < line_height * 2
                && closest.as_ref().is_none_or(|(best, _)| distance < *best)
            {
                closest = Some((distance, list.clone()));
            }
        }
        if let Some((_, list)) = closest {
            speakers.insert(id, list);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::get_text_blocks;
    use crate::testing::{fake_line, fake_line_colored, mono_font};

    fn no_thoughts() -> FxHashSet<BlockId> {
        FxHashSet::default()
    }

    #[test]
    fn test_narrator_fallback() {
        let font = mono_font();
        let lines = vec![fake_line(&font, (10, 10), "THE END!", true)];
        let arena = get_text_blocks(&lines);
        let order = vec![0];
        let speakers = FxHashMap::default();
        let thoughts = no_thoughts();
        let input = EmitInput {
            arena: &arena,
            order: &order,
            lines: &lines,
            speakers: &speakers,
            thoughts: &thoughts,
            characters: &[],
            banner: false,
        };
        let dicts = Dictionaries::from_words(&[], &[]);
        let mut sink = Sink::new();
        assert_eq!(emit(&input, &dicts, &mut sink), vec!["Narrator: THE END!"]);
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn test_character_attribution() {
        let font = mono_font();
        let lines = vec![fake_line(&font, (10, 10), "i am a dinosaur!", false)];
        let arena = get_text_blocks(&lines);
        let order = vec![0];
        let mut speakers = FxHashMap::default();
        speakers.insert(0, vec![Speaker::Character(0)]);
        let thoughts = no_thoughts();
        let characters = vec![Character::new("T-Rex", &[])];
        let input = EmitInput {
            arena: &arena,
            order: &order,
            lines: &lines,
            speakers: &speakers,
            thoughts: &thoughts,
            characters: &characters,
            banner: false,
        };
        let dicts = Dictionaries::from_words(&[], &[]);
        let mut sink = Sink::new();
        assert_eq!(emit(&input, &dicts, &mut sink), vec!["T-Rex: i am a dinosaur!"]);
    }

    #[test]
    fn test_god_and_devil() {
        let font = mono_font();
        let bold = fake_line(&font, (10, 10), "PROVE IT.", true);
        let red = fake_line_colored(&font, (10, 40), "NO.", true, Color::RED);
        let lines = vec![bold, red];
        let arena = get_text_blocks(&lines);
        assert_eq!(arena.len(), 2);
        let order = vec![0, 1];
        let mut speakers = FxHashMap::default();
        speakers.insert(0, vec![Speaker::OffPanel]);
        speakers.insert(1, vec![Speaker::OffPanel]);
        let thoughts = no_thoughts();
        let input = EmitInput {
            arena: &arena,
            order: &order,
            lines: &lines,
            speakers: &speakers,
            thoughts: &thoughts,
            characters: &[],
            banner: false,
        };
        let dicts = Dictionaries::from_words(&[], &[]);
        let mut sink = Sink::new();
        assert_eq!(
            emit(&input, &dicts, &mut sink),
            vec!["God: PROVE IT.", "Devil: NO."]
        );
    }

    #[test]
    fn test_red_on_panel_keeps_its_speaker() {
        let font = mono_font();
        let lines = vec![fake_line_colored(&font, (10, 10), "NO.", true, Color::RED)];
        let arena = get_text_blocks(&lines);
        let order = vec![0];
        let mut speakers = FxHashMap::default();
        speakers.insert(0, vec![Speaker::Character(0)]);
        let thoughts = no_thoughts();
        let characters = vec![Character::new("T-Rex", &[])];
        let input = EmitInput {
            arena: &arena,
            order: &order,
            lines: &lines,
            speakers: &speakers,
            thoughts: &thoughts,
            characters: &characters,
            banner: false,
        };
        let dicts = Dictionaries::from_words(&[], &[]);
        let mut sink = Sink::new();
        assert_eq!(emit(&input, &dicts, &mut sink), vec!["T-Rex: ◖NO.◗"]);
        assert!(
            sink.diagnostics().iter().any(|d| d.message.contains("red block not off-panel"))
        );
    }

    #[test]
    fn test_red_lowercase_is_not_the_devil() {
        let font = mono_font();
        let lines =
            vec![fake_line_colored(&font, (10, 10), "no way.", true, Color::RED)];
        let arena = get_text_blocks(&lines);
        let order = vec![0];
        let mut speakers = FxHashMap::default();
        speakers.insert(0, vec![Speaker::OffPanel]);
        let thoughts = no_thoughts();
        let input = EmitInput {
            arena: &arena,
            order: &order,
            lines: &lines,
            speakers: &speakers,
            thoughts: &thoughts,
            characters: &[],
            banner: false,
        };
        let dicts = Dictionaries::from_words(&[], &[]);
        let mut sink = Sink::new();
        assert_eq!(emit(&input, &dicts, &mut sink), vec!["Off-Panel: ◖no way.◗"]);
    }

    #[test]
    fn test_red_italic_unbolded_is_creepy() {
        let mut italic = mono_font();
        italic.name = "Italic".into();
        italic.italic_offsets = vec![3, 5, 9, 11];
        let lines =
            vec![fake_line_colored(&italic, (10, 10), "NO.", false, Color::RED)];
        let arena = get_text_blocks(&lines);
        let order = vec![0];
        let mut speakers = FxHashMap::default();
        speakers.insert(0, vec![Speaker::OffPanel]);
        let thoughts = no_thoughts();
        let input = EmitInput {
            arena: &arena,
            order: &order,
            lines: &lines,
            speakers: &speakers,
            thoughts: &thoughts,
            characters: &[],
            banner: false,
        };
        let dicts = Dictionaries::from_words(&[], &[]);
        let mut sink = Sink::new();
        assert_eq!(emit(&input, &dicts, &mut sink), vec!["Creepy voice(s): NO."]);
        assert!(
            sink.diagnostics().iter().any(|d| d.message.contains("red block not bold"))
        );
    }

    #[test]
    fn test_banner_sign() {
        let font = mono_font();
        let lines = vec![fake_line(&font, (10, 10), "HELLO", true)];
        let arena = get_text_blocks(&lines);
        let order = vec![0];
        let speakers = FxHashMap::default();
        let thoughts = no_thoughts();
        let input = EmitInput {
            arena: &arena,
            order: &order,
            lines: &lines,
            speakers: &speakers,
            thoughts: &thoughts,
            characters: &[],
            banner: true,
        };
        let dicts = Dictionaries::from_words(&[], &[]);
        let mut sink = Sink::new();
        let script = emit(&input, &dicts, &mut sink);
        assert_eq!(script[0], "Sign: ASK PROFESSOR SCIENCE");
    }

    #[test]
    fn test_adoption() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (10, 10), "first part", true),
            fake_line(&font, (10, 40), "and the rest", false),
        ];
        let arena = get_text_blocks(&lines);
        assert_eq!(arena.len(), 2);
        let mut speakers = FxHashMap::default();
        speakers.insert(0, vec![Speaker::Character(0)]);
        adopt_above_or_below(&[1], &mut speakers, &arena, &lines);
        assert_eq!(speakers.get(&1), Some(&vec![Speaker::Character(0)]));
    }
}
