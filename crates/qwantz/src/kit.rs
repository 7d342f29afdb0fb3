//! One-time resource loading.
//!
//! Fonts, the panel mask, the dictionaries and the override table are read
//! once at startup and handed out by reference for the life of the
//! process; pages borrow them and never mutate them.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use crate::font::{FontError, FontRegistry};
use crate::hyphen::Dictionaries;
use crate::image::Bitmap;
use crate::overrides::Overrides;
use crate::panel::{PAGE_HEIGHT, PAGE_WIDTH};

/// File names under the assets directory.
const MASK_FILE: &str = "mask.png";
const QWANTZ_WORDS_FILE: &str = "qwantz_words.txt";
const ENGLISH_WORDS_FILE: &str = "words.txt";
const OVERRIDES_FILE: &str = "panel_overrides.json";

/// The immutable process-wide resources.
pub struct Kit {
    pub fonts: FontRegistry,
    pub dicts: Dictionaries,
    pub overrides: Overrides,
    pub mask: Bitmap,
}

impl Kit {
    /// Load every resource from the assets directory.
    ///
    /// The override table is optional; everything else must be present.
    pub fn load(assets: &Path) -> Result<Self, KitError> {
        let fonts = FontRegistry::load(assets)?;
        let mask_path = assets.join(MASK_FILE);
        let mask_data = std::fs::read(&mask_path)
            .map_err(|err| KitError::Io(mask_path.clone(), err.kind()))?;
        let mask =
            Bitmap::decode(&mask_data).map_err(|_| KitError::Decode(mask_path.clone()))?;
        if (mask.width(), mask.height()) != (PAGE_WIDTH, PAGE_HEIGHT) {
            return Err(KitError::BadMask(mask_path));
        }

        let dicts = Dictionaries::load(
            &assets.join(QWANTZ_WORDS_FILE),
            &assets.join(ENGLISH_WORDS_FILE),
        )
        .map_err(|err| KitError::Io(assets.into(), err.kind()))?;

        let overrides_path = assets.join(OVERRIDES_FILE);
        let overrides = if overrides_path.exists() {
            Overrides::load(&overrides_path)
                .map_err(|err| KitError::Io(overrides_path, err.kind()))?
        } else {
            Overrides::empty()
        };

        Ok(Self { fonts, dicts, overrides, mask })
    }
}

/// A problem while loading startup resources.
#[derive(Debug)]
pub enum KitError {
    Font(FontError),
    Io(PathBuf, std::io::ErrorKind),
    Decode(PathBuf),
    /// The mask does not have the page dimensions.
    BadMask(PathBuf),
}

impl std::error::Error for KitError {}

impl Display for KitError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Font(err) => err.fmt(f),
            Self::Io(path, kind) => {
                write!(f, "failed to read {} ({kind})", path.display())
            }
            Self::Decode(path) => write!(f, "failed to decode {}", path.display()),
            Self::BadMask(path) => {
                write!(f, "mask {} does not match the page dimensions", path.display())
            }
        }
    }
}

impl From<FontError> for KitError {
    fn from(err: FontError) -> Self {
        Self::Font(err)
    }
}
