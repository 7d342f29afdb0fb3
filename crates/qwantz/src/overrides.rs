//! Per-strip transcript overrides.
//!
//! Some strips defeat the recognizer (guest art, heavy effects); a JSON
//! table keyed by the MD5 digest of the raw page pixels supplies their
//! transcripts verbatim. A listed panel skips the pipeline entirely.

use std::io;
use std::path::Path;

use ecow::EcoString;
use md5::{Digest, Md5};
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::image::Bitmap;

/// The override lines for one strip, keyed `"1"`..`"6"` and `"footer"`.
pub type PanelOverrides = FxHashMap<EcoString, Vec<EcoString>>;

#[derive(Debug, Deserialize)]
struct Entry {
    panels: PanelOverrides,
}

/// The full override table.
#[derive(Debug, Default)]
pub struct Overrides {
    entries: FxHashMap<EcoString, PanelOverrides>,
}

impl Overrides {
    /// An empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read the table from a JSON file.
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(io::Error::other)
    }

    /// Parse the table from JSON text.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let raw: FxHashMap<EcoString, Entry> = serde_json::from_str(json)?;
        Ok(Self {
            entries: raw.into_iter().map(|(key, entry)| (key, entry.panels)).collect(),
        })
    }

    /// The overrides for a page, if any.
    pub fn for_bitmap(&self, bitmap: &Bitmap) -> Option<&PanelOverrides> {
        self.entries.get(md5_hex(bitmap.data()).as_str())
    }
}

/// The hex MD5 digest of raw bytes, as used for override keys.
pub fn md5_hex(data: &[u8]) -> EcoString {
    let digest = Md5::digest(data);
    let mut hex = EcoString::with_capacity(32);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_hex() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"qwantz"), md5_hex(b"qwantz"));
    }

    #[test]
    fn test_lookup() {
        let bitmap = Bitmap::new(2, 1, vec![0, 0, 0, 255, 255, 255]);
        let key = md5_hex(bitmap.data());
        let json = format!(
            r#"{{ "{key}": {{ "panels": {{ "2": ["T-Rex: hello!"], "footer": [] }} }} }}"#
        );
        let overrides = Overrides::parse(&json).unwrap();
        let panels = overrides.for_bitmap(&bitmap).unwrap();
        assert_eq!(panels["2"], vec![EcoString::from("T-Rex: hello!")]);
        let other = Bitmap::new(2, 1, vec![1, 0, 0, 255, 255, 255]);
        assert!(overrides.for_bitmap(&other).is_none());
    }
}
