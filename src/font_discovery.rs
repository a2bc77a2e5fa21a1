//! Font discovery via fontconfig
//!
//! Enumerate installed faces and reduce them to one entry per family for the
//! font pickers in the preference dialogs.

use fontconfig::{Fontconfig, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::constants::font::HIDDEN_MARKER;

/// One installed face as reported by the host (not deduplicated)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    pub family: String,
    pub filename: String,
}

/// Source of installed font faces
pub trait FontIndex {
    fn enumerate(&self) -> Vec<FontFace>;
}

/// The host's fontconfig database
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFonts;

impl FontIndex for SystemFonts {
    fn enumerate(&self) -> Vec<FontFace> {
        let Some(fc) = Fontconfig::new() else {
            warn!("Failed to initialize fontconfig, reporting no fonts");
            return Vec::new();
        };

        // Empty pattern matches every installed face
        let pattern = Pattern::new(&fc);
        let font_set = fontconfig::list_fonts(&pattern, None);

        let faces: Vec<FontFace> = font_set
            .iter()
            .filter_map(|face| {
                // primary family name (index 0), not the localized aliases
                let family = face.get_string(fontconfig::FC_FAMILY)?;
                Some(FontFace {
                    family: family.to_string(),
                    filename: face.filename().unwrap_or_default().to_string(),
                })
            })
            .collect();

        debug!(count = faces.len(), "Enumerated font faces via fontconfig");
        faces
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontItem {
    /// Family name
    pub name: String,
    /// File of the first face seen for this family
    pub path: String,
}

/// One item per family, sorted by name. Empty and hidden (`.`-prefixed)
/// families are dropped; the first face listed for a family supplies its path.
pub fn list_fonts(index: &impl FontIndex) -> Vec<FontItem> {
    let mut families = BTreeMap::new();
    for face in index.enumerate() {
        if face.family.is_empty() || face.family.starts_with(HIDDEN_MARKER) {
            continue;
        }
        families.entry(face.family).or_insert(face.filename);
    }

    info!(count = families.len(), "Discovered font families");
    families
        .into_iter()
        .map(|(name, path)| FontItem { name, path })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedIndex(Vec<(&'static str, &'static str)>);

    impl FontIndex for FixedIndex {
        fn enumerate(&self) -> Vec<FontFace> {
            self.0
                .iter()
                .map(|(family, filename)| FontFace {
                    family: family.to_string(),
                    filename: filename.to_string(),
                })
                .collect()
        }
    }

    fn item(name: &str, path: &str) -> FontItem {
        FontItem {
            name: name.to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn test_dedup_hidden_and_sorted() {
        let index = FixedIndex(vec![
            ("Courier", "/fonts/courier.ttf"),
            ("Arial", "/fonts/arial.ttf"),
            ("Arial", "/fonts/arial-bold.ttf"),
            (".Hidden", "/fonts/hidden.ttf"),
            ("", "/fonts/nameless.ttf"),
        ]);

        assert_eq!(
            list_fonts(&index),
            vec![
                item("Arial", "/fonts/arial.ttf"),
                item("Courier", "/fonts/courier.ttf"),
            ]
        );
    }

    #[test]
    fn test_family_match_is_case_sensitive() {
        let index = FixedIndex(vec![("arial", "/a.ttf"), ("Arial", "/b.ttf")]);
        let names: Vec<_> = list_fonts(&index).into_iter().map(|f| f.name).collect();
        // byte order: uppercase sorts first
        assert_eq!(names, ["Arial", "arial"]);
    }

    #[test]
    fn test_empty_index() {
        assert!(list_fonts(&FixedIndex(Vec::new())).is_empty());
    }

    #[test]
    fn test_system_fonts_do_not_panic() {
        for font in list_fonts(&SystemFonts) {
            assert!(!font.name.is_empty());
            assert!(!font.name.starts_with(HIDDEN_MARKER));
        }
    }
}
