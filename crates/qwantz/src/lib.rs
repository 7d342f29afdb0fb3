//! Transcription of Dinosaur Comics strips.
//!
//! A strip is a fixed 735x500 page of six panels and a footer. The pipeline
//! reduces each panel to its non-white pixels, recognizes every text line
//! against the strip's bitmap fonts, reconstructs paragraphs, detects
//! speech tails and thought bubbles, attributes each paragraph to a
//! character (or the narrator, or an off-panel voice) and emits an ordered
//! script:
//!
//! - Decoding and validation: [`image`], [`prepare`], [`overrides`]
//! - Recognition: [`font`], [`textline`], [`tail`], [`thought`], [`extract`]
//! - Attribution: [`block`], [`match_tails`], [`match_blocks`],
//!   [`match_thought`]
//! - Emission: [`script`], [`hyphen`]

pub mod block;
pub mod color;
pub mod diag;
pub mod extract;
pub mod font;
pub mod geom;
pub mod hyphen;
pub mod image;
pub mod kit;
pub mod match_blocks;
pub mod match_tails;
pub mod match_thought;
pub mod overrides;
pub mod panel;
pub mod prepare;
pub mod script;
pub mod shape;
pub mod tail;
pub mod textline;
pub mod thought;

#[cfg(test)]
pub(crate) mod testing;

use ecow::EcoString;
use rustc_hash::FxHashSet;

use crate::block::BlockId;
use crate::diag::{ImageError, Sink};
use crate::image::{Bitmap, SparseImage};
use crate::kit::Kit;
use crate::panel::{FOOTER, PANEL_COUNT, PANELS};

pub use crate::diag::Diagnostic;
pub use crate::kit::KitError;

/// Tuning knobs for one page.
#[derive(Debug, Copy, Clone, Default)]
pub struct ParseOptions {
    /// Parse even strips listed in the override table.
    pub ignore_overrides: bool,
}

/// The transcript of one page.
#[derive(Debug, Clone)]
pub struct Page {
    /// One list of script lines per panel, in reading order.
    pub panels: Vec<Vec<EcoString>>,
    pub footer: Vec<EcoString>,
}

/// Transcribe a page.
///
/// Fatal [`ImageError`]s mean the input is not a strip at all; everything
/// else is reported through the sink and the affected panel degrades.
pub fn parse_page(
    bitmap: &Bitmap,
    kit: &Kit,
    options: ParseOptions,
    sink: &mut Sink,
) -> Result<Page, ImageError> {
    let overrides =
        if options.ignore_overrides { None } else { kit.overrides.for_bitmap(bitmap) };
    let prepared = prepare::prepare(bitmap, &kit.mask, sink)?;
    let banner = prepare::has_banner(bitmap);

    let mut panels = Vec::with_capacity(PANEL_COUNT);
    for index in 1..=PANEL_COUNT {
        if let Some(lines) =
            overrides.and_then(|table| table.get(index.to_string().as_str()))
        {
            panels.push(lines.clone());
            continue;
        }
        sink.set_panel(Some(index));
        if !prepared.good_panels.contains(&index) {
            crate::warn!(sink, "non-standard panel without an override");
            panels.push(Vec::new());
            continue;
        }
        panels.push(parse_panel(&prepared.bitmap, index, banner && index == 1, kit, sink));
    }

    sink.set_panel(None);
    let footer = match overrides.and_then(|table| table.get("footer")) {
        Some(lines) => lines.clone(),
        None => parse_footer(&prepared.bitmap, kit, sink),
    };
    Ok(Page { panels, footer })
}

/// Run the full pipeline on one panel.
fn parse_panel(
    bitmap: &Bitmap,
    index: usize,
    banner: bool,
    kit: &Kit,
    sink: &mut Sink,
) -> Vec<EcoString> {
    let region = PANELS[index - 1];
    let image = SparseImage::from_bitmap(bitmap, region, banner, sink);
    let elements = extract::extract(&image, &kit.fonts, sink);

    let lines = elements.text_lines;
    let mut characters = panel::characters(index - 1);
    characters.extend(elements.extra_characters.iter().cloned());

    let (tail_matches, _unmatched) =
        match_tails::match_tails(&elements.tails, &lines, &characters, &image, sink);

    let mut arena = block::get_text_blocks(&lines);
    let matched = match_blocks::match_blocks(&tail_matches, &mut arena, &lines, sink);
    let order = block::sort_blocks(matched.blocks, &arena, &lines, sink);
    let mut speakers = matched.speakers;

    let unmatched: Vec<BlockId> =
        order.iter().copied().filter(|id| !speakers.contains_key(id)).collect();
    let thinking = characters.iter().any(|character| character.can_think);
    let thoughts: FxHashSet<BlockId> = if thinking {
        match_thought::match_thought(&elements.thoughts, &unmatched, &arena, &lines)
            .into_iter()
            .collect()
    } else {
        FxHashSet::default()
    };
    if !elements.thoughts.is_empty() && thoughts.is_empty() {
        crate::warn!(sink, "detected thought bubbles, but no thought text");
    }

    let leftover: Vec<BlockId> =
        unmatched.into_iter().filter(|id| !thoughts.contains(id)).collect();
    script::adopt_above_or_below(&leftover, &mut speakers, &arena, &lines);

    for &id in &order {
        let variants: Vec<_> = arena[id].variants(&lines).cloned().collect();
        for variant in variants {
            crate::warn!(sink, "variant used: {variant}");
        }
    }

    let input = script::EmitInput {
        arena: &arena,
        order: &order,
        lines: &lines,
        speakers: &speakers,
        thoughts: &thoughts,
        characters: &characters,
        banner,
    };
    let script = script::emit(&input, &kit.dicts, sink);
    if script.is_empty() { vec![EcoString::from("〚no text〛")] } else { script }
}

/// Transcribe the footer strip below the panels.
fn parse_footer(bitmap: &Bitmap, kit: &Kit, sink: &mut Sink) -> Vec<EcoString> {
    let image = SparseImage::from_bitmap(bitmap, FOOTER, false, sink);
    let elements = extract::extract(&image, &kit.fonts, sink);
    if !elements.tails.is_empty()
        || !elements.thoughts.is_empty()
        || !elements.extra_characters.is_empty()
        || !elements.unmatched.is_empty()
    {
        crate::warn!(sink, "unexpected elements in the footer");
    }
    for line in &elements.text_lines {
        for variant in line.variants() {
            crate::warn!(sink, "variant used: {variant}");
        }
    }
    elements.text_lines.iter().map(|line| line.content()).collect()
}
