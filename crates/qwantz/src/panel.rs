//! The fixed strip layout and its cast.

use ecow::EcoString;
use smallvec::SmallVec;

use crate::geom::{Box, Pixel, Side};

/// The page dimensions every strip shares.
pub const PAGE_WIDTH: u32 = 735;
pub const PAGE_HEIGHT: u32 = 500;

/// The number of panels on a page.
pub const PANEL_COUNT: usize = 6;

/// The six panel rectangles, in reading order.
pub const PANELS: [Box; PANEL_COUNT] = [
    Box::from_coords(3, 2, 242, 241),
    Box::from_coords(246, 2, 372, 241),
    Box::from_coords(375, 2, 733, 241),
    Box::from_coords(3, 244, 193, 483),
    Box::from_coords(196, 244, 491, 483),
    Box::from_coords(494, 244, 733, 483),
];

/// The footer strip below the panels.
pub const FOOTER: Box = Box::from_coords(0, 488, 735, 500);

/// Which way a character is facing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Direction {
    Left,
    Right,
}

/// A speaker region within a panel.
///
/// A character covers one or more boxes; sides of a box can be inactive so
/// that tails brushing past from that side are not attributed to it.
#[derive(Debug, Clone)]
pub struct Character {
    pub name: EcoString,
    pub boxes: SmallVec<[Box; 4]>,
    /// Whether thought bubbles may be attributed to this character.
    pub can_think: bool,
    pub direction: Option<Direction>,
}

impl Character {
    pub fn new(name: &str, boxes: &[Box]) -> Self {
        Self {
            name: name.into(),
            boxes: boxes.iter().copied().collect(),
            can_think: true,
            direction: None,
        }
    }

    pub fn no_think(mut self) -> Self {
        self.can_think = false;
        self
    }
}

/// The characters visible in each panel, in declaration order.
pub fn characters(panel: usize) -> Vec<Character> {
    match panel {
        0 => vec![Character::new(
            "T-Rex",
            &[Box::from_coords(104, 90, 170, 238)],
        )],
        1 => vec![Character::new(
            "T-Rex",
            &[
                Box::from_coords(30, 105, 75, 119),
                Box::from_coords(4, 119, 105, 150),
                Box::from_coords(4, 150, 60, 238),
            ],
        )],
        2 => vec![
            Character::new(
                "T-Rex",
                &[
                    Box::from_coords(80, 55, 115, 213),
                    Box::from_coords(115, 75, 130, 90),
                ],
            ),
            Character::new(
                "Dromiceiomimus",
                &[
                    Box::from_coords(325, 146, 357, 238),
                    Box::from_coords(250, 180, 325, 185),
                ],
            ),
            Character::new("House", &[Box::from_coords(115, 210, 163, 238)])
                .no_think(),
        ],
        3 => vec![
            Character::new("T-Rex", &[Box::from_coords(0, 65, 35, 190)]),
            Character::new(
                "Utahraptor",
                &[
                    Box::from_coords(103, 81, 138, 165),
                    Box::from_coords(138, 140, 165, 180),
                ],
            ),
            Character::new("Girl", &[Box::from_coords(0, 213, 8, 238)]).no_think(),
        ],
        4 => vec![
            Character::new(
                "T-Rex",
                &[
                    Box::from_coords(40, 70, 90, 103),
                    Box::from_coords(40, 104, 70, 140),
                    Box::from_coords(40, 141, 80, 180),
                ],
            ),
            Character::new(
                "T-Rex",
                &[
                    Box::from_coords(130, 155, 133, 210)
                        .with_inactive(&[Side::Left, Side::Top, Side::Bottom]),
                    Box::from_coords(100, 197, 130, 213),
                ],
            ),
            Character::new(
                "Utahraptor",
                &[
                    Box::from_coords(198, 77, 233, 145),
                    Box::from_coords(225, 145, 250, 190),
                    Box::from_coords(185, 115, 198, 125),
                ],
            ),
        ],
        5 => vec![Character::new(
            "T-Rex",
            &[
                Box::from_coords(80, 64, 134, 84),
                Box::from_coords(80, 84, 100, 169),
                Box::from_coords(100, 84, 120, 120),
                Box::from_coords(100, 110, 125, 120),
            ],
        )],
        _ => Vec::new(),
    }
}

/// The pixel position of a panel-local pixel on the page.
pub fn to_page(panel: Box, local: Pixel) -> Pixel {
    Pixel::new(local.x + panel.left(), local.y + panel.top())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panels_cover_known_layout() {
        assert_eq!(PANELS[0].width(), 239);
        assert_eq!(PANELS[0].height(), 239);
        assert_eq!(PANELS[2].width(), 358);
        assert_eq!(PANELS[5].left(), 494);
        assert_eq!(FOOTER.height(), 12);
    }

    #[test]
    fn test_cast_per_panel() {
        assert_eq!(characters(0).len(), 1);
        assert_eq!(characters(3).len(), 3);
        assert!(characters(2).iter().any(|c| c.name == "House" && !c.can_think));
        assert!(characters(6).is_empty());
    }
}
