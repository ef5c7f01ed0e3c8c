//! Output filename derivation.
//!
//! Output names are a pure function of the input name and the tool's rule:
//! the trailing extension is swapped for a fixed replacement
//! (`photo.AVIF` → `photo.jpg`, `cat.png` → `cat_no_bg.png`).

use serde::{Deserialize, Serialize};

/// Which trailing extensions a rule rewrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionMatch {
    /// Any extension
    Any,
    /// Only these extensions, compared case-insensitively, without the dot
    OneOf(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenameRule {
    #[serde(rename = "match")]
    pub matches: ExtensionMatch,
    /// Text that replaces the matched extension including its dot. May contain
    /// `{factor}`, filled with the upscale factor digits.
    pub replacement: String,
}

impl FilenameRule {
    pub fn swap_extension(from: &[&str], replacement: &str) -> Self {
        Self {
            matches: ExtensionMatch::OneOf(from.iter().map(|e| e.to_lowercase()).collect()),
            replacement: replacement.to_string(),
        }
    }

    pub fn replace_any_extension(replacement: &str) -> Self {
        Self {
            matches: ExtensionMatch::Any,
            replacement: replacement.to_string(),
        }
    }

    /// Derive the output name for `input`.
    ///
    /// When the extension does not match (or there is none) the replacement is
    /// appended to the whole name so the output still carries the target type.
    pub fn derive(&self, input: &str, factor: Option<&str>) -> String {
        let replacement = match factor {
            Some(f) => self.replacement.replace("{factor}", f),
            None => self.replacement.replace("{factor}", ""),
        };

        match split_extension(input) {
            Some((stem, ext)) if self.matches_extension(ext) => format!("{}{}", stem, replacement),
            _ => format!("{}{}", input, replacement),
        }
    }

    fn matches_extension(&self, ext: &str) -> bool {
        match &self.matches {
            ExtensionMatch::Any => true,
            ExtensionMatch::OneOf(list) => list.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        }
    }
}

/// Split `name` into (stem, extension) at the last dot. The extension must be
/// non-empty and must not contain a path separator.
fn split_extension(name: &str) -> Option<(&str, &str)> {
    let dot = name.rfind('.')?;
    let ext = &name[dot + 1..];
    if ext.is_empty() || ext.contains('/') || ext.contains('\\') {
        return None;
    }
    Some((&name[..dot], ext))
}

/// Name for the single output of a combined request, e.g. `merged_document_1700000000000.pdf`.
pub fn combined_filename(prefix: &str, extension: &str, unix_millis: i64) -> String {
    format!(
        "{}_{}.{}",
        prefix,
        unix_millis,
        extension.trim_start_matches('.')
    )
}
