use serde::Deserialize;
use strum::{Display, EnumString};

/// A string similarity score normalized to `[0, 1]`, where `1` means identical.
pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

impl<F> Similarity for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn similarity(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Similarity metrics provided by `strsim`.
#[derive(Copy, Clone, Debug, Default, Deserialize, Display, EnumString, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SimilarityMetric {
    /// Rewards a shared prefix, which suits spoken and typed channel names that are cut short
    /// or misspelled near the end.
    #[default]
    JaroWinkler,
    Levenshtein,
    DamerauLevenshtein,
    SorensenDice,
}

impl Similarity for SimilarityMetric {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        match self {
            Self::JaroWinkler => strsim::jaro_winkler(a, b),
            Self::Levenshtein => strsim::normalized_levenshtein(a, b),
            Self::DamerauLevenshtein => strsim::normalized_damerau_levenshtein(a, b),
            Self::SorensenDice => strsim::sorensen_dice(a, b),
        }
    }
}
