//! Speech tail attribution.
//!
//! Each tail endpoint is scored against every text line and character
//! region; the two winning targets attribute the tail. Ambiguities resolve
//! iteratively, since a line claimed by one tail changes the best choice
//! for the others.

use std::cmp::Ordering;

use rustc_hash::FxHashSet;

use crate::diag::Sink;
use crate::geom::{Box, Pixel};
use crate::image::SparseImage;
use crate::panel::Character;
use crate::tail::Tail;
use crate::textline::{LineId, TextLine};

/// Minimum pointing accuracy for a candidate to be considered.
pub const MISS_ANGLE_MIN_COS: f64 = 0.5;

/// A tail is "horizontal" when its run dominates its rise by this ratio.
pub const HORIZONTAL_RATIO: f64 = 2.3;

/// The farthest a tail endpoint may sit from a character box.
pub const CHARACTER_MAX_DISTANCE: f64 = 35.0;

/// The farthest a tail endpoint may sit from a text line.
pub const TEXT_LINE_MAX_DISTANCE: f64 = 44.0;

/// Endpoints this close to the panel edge may be assumed off-panel when
/// nothing else claims them.
pub const EDGE_ASSUME_OFF_PANEL: i32 = 10;

/// Lines starting above this row look like narration.
const NARRATOR_TOP_MARGIN: i32 = 20;

/// What a tail endpoint is attached to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Target {
    /// The endpoint leaves the panel; the speaker is not depicted.
    OffPanel,
    /// A recognized text line.
    Line(LineId),
    /// An index into the panel's character list.
    Character(usize),
}

impl Target {
    pub fn is_line(self) -> bool {
        matches!(self, Self::Line(_))
    }
}

/// A scored candidate for one endpoint.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    target: Target,
    distance: f64,
    /// Whether the whole tail runs nearly horizontally into this target.
    horizontal: bool,
}

/// Attribute every tail to a pair of targets.
///
/// Returns the attributions and the tails that could not be matched.
pub fn match_tails(
    tails: &[Tail],
    lines: &[TextLine],
    characters: &[Character],
    image: &SparseImage,
    sink: &mut Sink,
) -> (Vec<(Target, Target)>, Vec<Tail>) {
    let mut matches = Vec::new();
    let mut unmatched = Vec::new();
    let mut sides: Vec<[Vec<Candidate>; 2]> = Vec::new();
    let mut viable: Vec<usize> = Vec::new();

    for (t, tail) in tails.iter().enumerate() {
        let [e1, e2] = tail.ends;
        let mut pair = [candidates(e1, e2, lines, characters, image), candidates(e2, e1, lines, characters, image)];

        for i in 0..2 {
            if pair[i].is_empty() && !matches!(pair[1 - i].as_slice(), []) {
                let endpoint = tail.ends[i];
                if image.distance_to_edge(endpoint) <= EDGE_ASSUME_OFF_PANEL {
                    crate::warn!(
                        sink,
                        "unmatched tail endpoint {endpoint:?}, assuming off-panel"
                    );
                    pair[i].push(Candidate {
                        target: Target::OffPanel,
                        distance: image.distance_to_edge(endpoint) as f64,
                        horizontal: false,
                    });
                }
            }
        }

        if pair[0].is_empty() || pair[1].is_empty() {
            crate::warn!(sink, "unmatched tail at {:?}", tail.ends);
            unmatched.push(tail.clone());
            continue;
        }
        if let ([a], [b]) = (pair[0].as_slice(), pair[1].as_slice())
            && a.target == b.target
        {
            crate::warn!(sink, "tail at {:?} points at one object twice", tail.ends);
            unmatched.push(tail.clone());
            continue;
        }
        if !pair[0].iter().any(|c| c.target.is_line())
            && !pair[1].iter().any(|c| c.target.is_line())
        {
            crate::warn!(sink, "tail at {:?} connects no text", tail.ends);
            unmatched.push(tail.clone());
            continue;
        }
        viable.push(t);
        sides.push(pair);
    }

    // Iteratively settle choices: a line already claimed elsewhere is a
    // worse pick, so every round may change its neighbours' minds.
    let mut chosen: Vec<[Target; 2]> = sides
        .iter()
        .map(|pair| [pair[0][0].target, pair[1][0].target])
        .collect();
    for _ in 0..10 {
        let mut changed = false;
        for i in 0..sides.len() {
            let taken: FxHashSet<Target> = chosen
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .flat_map(|(_, pair)| pair.iter().copied())
                .filter(|t| t.is_line())
                .collect();
            let new = resolve(&sides[i], &taken, lines, sink);
            if new != chosen[i] {
                chosen[i] = new;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for (i, &t) in viable.iter().enumerate() {
        let [a, b] = chosen[i];
        if a == b {
            crate::warn!(sink, "tail at {:?} points at one object twice", tails[t].ends);
            unmatched.push(tails[t].clone());
        } else if !a.is_line() && !b.is_line() {
            crate::warn!(sink, "tail at {:?} connects no text", tails[t].ends);
            unmatched.push(tails[t].clone());
        } else {
            matches.push((a, b));
        }
    }
    (matches, unmatched)
}

/// Choose both endpoints of one tail, resolving same-target collisions.
fn resolve(
    pair: &[Vec<Candidate>; 2],
    taken: &FxHashSet<Target>,
    lines: &[TextLine],
    sink: &mut Sink,
) -> [Target; 2] {
    let pick = |candidates: &[Candidate], other: Target, exclude: Option<Target>| {
        candidates
            .iter()
            .filter(|c| Some(c.target) != exclude)
            .min_by(|a, b| prefer(a, b, other, taken, lines))
            .map(|c| *c)
    };

    let mut first = pick(&pair[0], pair[1][0].target, None).unwrap();
    let mut second = pick(&pair[1], first.target, None).unwrap();
    // Re-pick the first side now that the second is known.
    first = pick(&pair[0], second.target, None).unwrap();

    if first.target == second.target {
        // Both ends want the same target; the side it points at straight-on
        // (or simply the closer one) keeps it.
        let keep_first = match (first.horizontal, second.horizontal) {
            (true, false) => true,
            (false, true) => false,
            _ => first.distance <= second.distance,
        };
        if keep_first {
            if let Some(other) = pick(&pair[1], first.target, Some(first.target)) {
                second = other;
            } else {
                crate::warn!(sink, "no alternative target for a contested tail");
            }
        } else if let Some(other) = pick(&pair[0], second.target, Some(second.target)) {
            first = other;
        } else {
            crate::warn!(sink, "no alternative target for a contested tail");
        }
    }
    [first.target, second.target]
}

/// Order two candidates for one endpoint, best first.
fn prefer(
    a: &Candidate,
    b: &Candidate,
    other: Target,
    taken: &FxHashSet<Target>,
    lines: &[TextLine],
) -> Ordering {
    let rank = |c: &Candidate| {
        let narrator = match c.target {
            Target::Line(id) => {
                let line = &lines[id];
                line.is_bold()
                    && line.start().y < NARRATOR_TOP_MARGIN
                    && other != Target::OffPanel
            }
            _ => false,
        };
        let godlike = match c.target {
            Target::Line(id) if other == Target::OffPanel => {
                let line = &lines[id];
                line.is_bold()
                    && !line.content().chars().any(|ch| ch.is_lowercase())
            }
            _ => false,
        };
        (taken.contains(&c.target) as u8, narrator as u8, !godlike as u8)
    };
    rank(a)
        .cmp(&rank(b))
        .then_with(|| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal))
        .then_with(|| {
            // At equal distance a text line beats a character, except when
            // the far end is itself a character.
            let line_first = !matches!(other, Target::Character(_));
            let key = |c: &Candidate| match c.target {
                Target::Line(_) => !line_first,
                _ => line_first,
            };
            key(a).cmp(&key(b))
        })
}

/// Score all targets for the endpoint `this`, pointed at from `other`.
fn candidates(
    this: Pixel,
    other: Pixel,
    lines: &[TextLine],
    characters: &[Character],
    image: &SparseImage,
) -> Vec<Candidate> {
    if image.is_on_edge(this) {
        return vec![Candidate { target: Target::OffPanel, distance: 0.0, horizontal: false }];
    }

    let mut result = Vec::new();
    for (id, line) in lines.iter().enumerate() {
        let bounds = line.base_box();
        if let Some(scored) = score(this, other, bounds, Target::Line(id))
            && scored.distance <= TEXT_LINE_MAX_DISTANCE
        {
            result.push(scored);
        }
    }
    for (id, character) in characters.iter().enumerate() {
        let best = character
            .boxes
            .iter()
            .filter_map(|&bounds| score_exact(this, other, bounds, Target::Character(id)))
            .min_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        if let Some(scored) = best
            && scored.distance <= CHARACTER_MAX_DISTANCE
        {
            result.push(scored);
        }
    }
    result.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    result
}

/// Score one box; `None` when it lies beyond the tail or off its aim.
fn score(this: Pixel, other: Pixel, bounds: Box, target: Target) -> Option<Candidate> {
    let distance = bounds.distance(this)?;
    if let Some(other_distance) = bounds.distance(other)
        && other_distance < distance
    {
        // The box sits past the far end; it belongs to the other side.
        return None;
    }
    let cos = miss_angle_cos(this, other, bounds);
    if cos <= MISS_ANGLE_MIN_COS {
        return None;
    }
    Some(Candidate {
        target,
        distance,
        horizontal: is_horizontal(this, other, bounds),
    })
}

/// Characters only accept tails that point straight at them.
fn score_exact(this: Pixel, other: Pixel, bounds: Box, target: Target) -> Option<Candidate> {
    let distance = bounds.distance(this)?;
    if let Some(other_distance) = bounds.distance(other)
        && other_distance < distance
    {
        return None;
    }
    let cos = miss_angle_cos(this, other, bounds);
    if cos < 1.0 {
        return None;
    }
    Some(Candidate { target, distance, horizontal: is_horizontal(this, other, bounds) })
}

/// The best cosine between the tail's direction and the rays to the box
/// corners; one when a box side crosses the tail's carrier segment.
fn miss_angle_cos(this: Pixel, other: Pixel, bounds: Box) -> f64 {
    for side in box_sides(bounds) {
        if intersects((other, this), side) {
            return 1.0;
        }
    }
    let dir = ((this.x - other.x) as f64, (this.y - other.y) as f64);
    let dir_len = dir.0.hypot(dir.1);
    let mut best = -1.0f64;
    for corner in bounds.corners() {
        let ray = ((corner.x - this.x) as f64, (corner.y - this.y) as f64);
        let ray_len = ray.0.hypot(ray.1);
        if ray_len == 0.0 || dir_len == 0.0 {
            return 1.0;
        }
        let cos = (dir.0 * ray.0 + dir.1 * ray.1) / (dir_len * ray_len);
        best = best.max(cos);
    }
    best
}

fn box_sides(bounds: Box) -> [(Pixel, Pixel); 4] {
    let [tl, tr, br, bl] = bounds.corners();
    [(tl, bl), (bl, br), (br, tr), (tr, tl)]
}

/// Whether two segments properly intersect.
fn intersects(line: (Pixel, Pixel), segment: (Pixel, Pixel)) -> bool {
    let cross = |(a, b): (Pixel, Pixel), c: Pixel| {
        ((b.x - a.x) as i64) * ((c.y - a.y) as i64)
            - ((b.y - a.y) as i64) * ((c.x - a.x) as i64)
    };
    let d1 = cross(line, segment.0);
    let d2 = cross(line, segment.1);
    let d3 = cross(segment, line.0);
    let d4 = cross(segment, line.1);
    (d1 > 0) != (d2 > 0) && (d3 > 0) != (d4 > 0) && d1 != 0 && d2 != 0 && d3 != 0 && d4 != 0
}

/// A near-horizontal tail entering a box through its vertical extent.
fn is_horizontal(this: Pixel, other: Pixel, bounds: Box) -> bool {
    let dx = (this.x - other.x).abs() as f64;
    let dy = (this.y - other.y).abs() as f64;
    dx > HORIZONTAL_RATIO * dy && bounds.top() <= this.y && this.y < bounds.bottom()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_line, mono_font};

    fn tail(from: (i32, i32), to: (i32, i32)) -> Tail {
        Tail {
            ends: [Pixel::new(from.0, from.1), Pixel::new(to.0, to.1)],
            pixels: Vec::new(),
            width: 1,
        }
    }

    #[test]
    fn test_tail_connects_character_and_line() {
        let font = mono_font();
        let lines = vec![fake_line(&font, (80, 20), "i am a dinosaur!", false)];
        let characters =
            vec![Character::new("T-Rex", &[Box::from_coords(20, 60, 60, 120)])];
        let image = SparseImage::empty(200, 200);
        let mut sink = Sink::new();
        // Upper-right endpoint just under the text, lower-left inside the box.
        let tails = vec![tail((85, 40), (55, 61))];
        let (matches, unmatched) =
            match_tails(&tails, &lines, &characters, &image, &mut sink);
        assert!(unmatched.is_empty());
        assert_eq!(matches, vec![(Target::Line(0), Target::Character(0))]);
    }

    #[test]
    fn test_off_panel_endpoint() {
        let font = mono_font();
        let lines = vec![fake_line(&font, (40, 20), "PROVE IT.", true)];
        let image = SparseImage::empty(200, 200);
        let mut sink = Sink::new();
        let tails = vec![tail((0, 60), (42, 36))];
        let (matches, unmatched) =
            match_tails(&tails, &lines, &[], &image, &mut sink);
        assert!(unmatched.is_empty());
        assert_eq!(matches, vec![(Target::OffPanel, Target::Line(0))]);
    }

    #[test]
    fn test_unmatchable_tail_is_reported() {
        let image = SparseImage::empty(200, 200);
        let mut sink = Sink::new();
        let tails = vec![tail((100, 100), (120, 120))];
        let (matches, unmatched) = match_tails(&tails, &[], &[], &image, &mut sink);
        assert!(matches.is_empty());
        assert_eq!(unmatched.len(), 1);
        assert!(!sink.diagnostics().is_empty());
    }

    #[test]
    fn test_godlike_line_preferred_at_off_panel() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (50, 40), "whatever", false),
            fake_line(&font, (50, 60), "YELLS", true),
        ];
        let image = SparseImage::empty(200, 200);
        let mut sink = Sink::new();
        // The plain line is closer, but the far end leaves the panel and
        // bold shouting belongs to the voice from off-panel.
        let tails = vec![tail((0, 50), (40, 48))];
        let (matches, unmatched) =
            match_tails(&tails, &lines, &[], &image, &mut sink);
        assert!(unmatched.is_empty());
        assert_eq!(matches, vec![(Target::OffPanel, Target::Line(1))]);
    }

    #[test]
    fn test_narration_demoted_for_character_tails() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (50, 40), "actual speech", false),
            fake_line(&font, (50, 5), "A BOLD CAPTION", true),
        ];
        let characters =
            vec![Character::new("T-Rex", &[Box::from_coords(70, 95, 120, 130)])];
        let image = SparseImage::empty(200, 200);
        let mut sink = Sink::new();
        // The endpoint sits nearer the caption, but the tail's carrier runs
        // through the speech line, and captions don't get tails.
        let tails = vec![tail((60, 20), (80, 100))];
        let (matches, unmatched) =
            match_tails(&tails, &lines, &characters, &image, &mut sink);
        assert!(unmatched.is_empty());
        assert_eq!(matches, vec![(Target::Line(0), Target::Character(0))]);
    }

    #[test]
    fn test_two_tails_two_speakers() {
        let font = mono_font();
        let lines = vec![
            fake_line(&font, (60, 20), "first speech", false),
            fake_line(&font, (60, 120), "second speech", false),
        ];
        let characters = vec![
            Character::new("T-Rex", &[Box::from_coords(10, 40, 40, 100)]),
            Character::new("Utahraptor", &[Box::from_coords(150, 150, 190, 190)]),
        ];
        let image = SparseImage::empty(250, 250);
        let mut sink = Sink::new();
        let tails = vec![
            tail((38, 45), (62, 36)),
            tail((152, 152), (120, 136)),
        ];
        let (matches, unmatched) =
            match_tails(&tails, &lines, &characters, &image, &mut sink);
        assert!(unmatched.is_empty());
        assert!(matches.contains(&(Target::Character(0), Target::Line(0))));
        assert!(matches.contains(&(Target::Character(1), Target::Line(1))));
    }
}
