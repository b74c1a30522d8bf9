//! Sort keys for dataset names

use dsmeta_common::config::NameCollation;
use std::fmt;
use std::sync::Arc;

/// Produces the key a dataset name is ordered by
pub trait NameCollator: Send + Sync + fmt::Debug {
    /// Collator name for logging
    fn name(&self) -> &'static str;

    /// Comparable key for `name`
    fn sort_key(&self, name: &str) -> String;
}

/// Orders names by Unicode code point
#[derive(Debug, Default, Clone, Copy)]
pub struct CodePointCollator;

impl NameCollator for CodePointCollator {
    fn name(&self) -> &'static str {
        "code-point"
    }

    fn sort_key(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Orders names by a lowercase ASCII transliteration
///
/// Han characters become pinyin syllables, Cyrillic and Greek become Latin
/// letters and accents are stripped, so "北京", "Berlin" and "Bogotá" sort
/// next to each other.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransliterationCollator;

impl NameCollator for TransliterationCollator {
    fn name(&self) -> &'static str {
        "transliterate"
    }

    fn sort_key(&self, name: &str) -> String {
        deunicode::deunicode(name).to_lowercase()
    }
}

/// Collator selected by configuration
#[must_use]
pub fn collator_for(collation: NameCollation) -> Arc<dyn NameCollator> {
    match collation {
        NameCollation::CodePoint => Arc::new(CodePointCollator),
        NameCollation::Transliterate => Arc::new(TransliterationCollator),
    }
}
