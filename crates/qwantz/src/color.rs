//! The quantized page palette.

use std::fmt::{self, Debug, Formatter};

/// Distance below which a raw RGB value snaps to a palette color.
pub const COLOR_THRESHOLD: u32 = 250;

/// An RGB color.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const RED: Self = Self::new(128, 0, 0);
    pub const GREY: Self = Self::new(128, 128, 128);
    pub const GREY2: Self = Self::new(117, 117, 117);
    pub const GREY3: Self = Self::new(100, 100, 100);

    /// The colors that lettering and linework may legitimately use.
    pub const PALETTE: [Self; 6] = [
        Self::WHITE,
        Self::BLACK,
        Self::RED,
        Self::GREY,
        Self::GREY2,
        Self::GREY3,
    ];

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The squared euclidean distance to another color.
    pub fn distance_squared(self, other: Self) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    /// Snap a raw value to the nearest palette color within the threshold.
    pub fn quantize(raw: Self) -> Option<Self> {
        Self::PALETTE
            .into_iter()
            .find(|color| color.distance_squared(raw) < COLOR_THRESHOLD)
    }
}

impl Debug for Color {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
