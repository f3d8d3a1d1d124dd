//! Resolution of free-text channel names against the active channel view.
//!
//! Matching runs as a cascade and stops at the first stage that produces a hit:
//!
//! 1. exact: the whole display name equals the input;
//! 2. substring: the input is one whitespace-delimited word of the name, or a prefix of it;
//! 3. fuzzy: the most similar name scoring at least the cutoff.
//!
//! Within the first two stages the earliest channel in view order wins.

use std::collections::HashMap;

use serde::Serialize;
use strum::Display;
use tracing::debug;

use crate::channel::{ActiveChannel, ChannelNumber};
use crate::similarity::{Similarity, SimilarityMetric};

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchStage {
    Exact,
    /// The input is a whole word of the name.
    Word,
    /// The name starts with the input.
    Prefix,
    Fuzzy,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Resolved {
    pub id: String,
    pub name: String,
    pub number: ChannelNumber,
    pub stage: MatchStage,
}

impl Resolved {
    fn new(channel: &ActiveChannel<'_>, stage: MatchStage) -> Self {
        Self {
            id: channel.id.to_string(),
            name: channel.name.to_string(),
            number: channel.number.clone(),
            stage,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("Channel name is empty.")]
    EmptyInput,

    #[error("No channels are available to match '{input}'.")]
    NoActiveChannels { input: String },

    #[error("Channel '{input}' not found.")]
    NotFound { input: String },
}

impl ResolveError {
    /// Whether the input was valid but nothing matched it.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoActiveChannels { .. } | Self::NotFound { .. })
    }

    pub fn input(&self) -> Option<&str> {
        match self {
            Self::EmptyInput => None,
            Self::NoActiveChannels { input } | Self::NotFound { input } => Some(input),
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Stage {
    Exact,
    Substring,
    Fuzzy,
}

const CASCADE: [Stage; 3] = [Stage::Exact, Stage::Substring, Stage::Fuzzy];

struct Haystack<'c, 'a> {
    channels: &'c [ActiveChannel<'a>],
    names: Vec<String>,
}

impl<'c, 'a> Haystack<'c, 'a> {
    fn new(channels: &'c [ActiveChannel<'a>]) -> Self {
        Self {
            channels,
            names: channels
                .iter()
                .map(|channel| channel.name.to_lowercase())
                .collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Resolver<S = SimilarityMetric> {
    similarity: S,
    cutoff: f64,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(SimilarityMetric::default(), Self::DEFAULT_CUTOFF)
    }
}

impl<S: Similarity> Resolver<S> {
    pub const DEFAULT_CUTOFF: f64 = 0.6;

    pub fn new(similarity: S, cutoff: f64) -> Self {
        Self { similarity, cutoff }
    }

    /// Resolves `input` to exactly one of `channels`.
    pub fn resolve(
        &self,
        input: &str,
        channels: &[ActiveChannel<'_>],
    ) -> Result<Resolved, ResolveError> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return Err(ResolveError::EmptyInput);
        }

        if channels.is_empty() {
            return Err(ResolveError::NoActiveChannels { input });
        }

        let haystack = Haystack::new(channels);

        for stage in CASCADE {
            if let Some((index, stage)) = self.find(stage, &input, &haystack) {
                let channel = &channels[index];
                debug!(
                    %input,
                    %stage,
                    name = channel.name,
                    number = %channel.number,
                    "Resolved channel",
                );

                return Ok(Resolved::new(channel, stage));
            }
        }

        debug!(%input, "No channel matched");

        Err(ResolveError::NotFound { input })
    }

    /// Looks only for a channel whose whole name equals `input`, ignoring case.
    pub fn exact(&self, input: &str, channels: &[ActiveChannel<'_>]) -> Option<Resolved> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return None;
        }

        let haystack = Haystack::new(channels);
        let (index, stage) = self.find(Stage::Exact, &input, &haystack)?;

        Some(Resolved::new(&channels[index], stage))
    }

    fn find(
        &self,
        stage: Stage,
        input: &str,
        haystack: &Haystack,
    ) -> Option<(usize, MatchStage)> {
        match stage {
            Stage::Exact => haystack
                .names
                .iter()
                .position(|name| name == input)
                .map(|index| (index, MatchStage::Exact)),

            Stage::Substring => haystack.names.iter().enumerate().find_map(|(index, name)| {
                if name.split_whitespace().any(|word| word == input) {
                    Some((index, MatchStage::Word))
                } else if name.starts_with(input) {
                    Some((index, MatchStage::Prefix))
                } else {
                    None
                }
            }),

            Stage::Fuzzy => self
                .closest(input, haystack)
                .map(|index| (index, MatchStage::Fuzzy)),
        }
    }

    /// Picks the single most similar name at or above the cutoff. A name shared by several
    /// channels stands for the last of them.
    ///
    /// Equal scores go to the name seen first in view order, not to the lexicographically
    /// greatest name, so a tie always lands on the channel listed earlier.
    fn closest(&self, input: &str, haystack: &Haystack) -> Option<usize> {
        let mut candidates: Vec<(&str, usize)> = Vec::with_capacity(haystack.channels.len());
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for (index, name) in haystack.names.iter().enumerate() {
            match positions.get(name.as_str()) {
                Some(&position) => candidates[position].1 = index,
                None => {
                    positions.insert(name, candidates.len());
                    candidates.push((name, index));
                }
            }
        }

        let mut best: Option<(f64, usize)> = None;
        for (name, index) in candidates {
            let score = self.similarity.similarity(input, name);
            if score < self.cutoff {
                continue;
            }

            if best.is_none_or(|(best_score, _)| score > best_score) {
                best = Some((score, index));
            }
        }

        best.map(|(_, index)| index)
    }
}
