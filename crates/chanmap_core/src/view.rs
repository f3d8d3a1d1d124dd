use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::channel::{ActiveChannel, ChannelRecord, ChannelSource};

/// The user's edits on top of a provider lineup.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Customization {
    /// Display name overrides keyed by channel id.
    pub overrides: BTreeMap<String, String>,
    pub custom_channels: Vec<ChannelRecord>,
    pub deleted_channels: BTreeSet<String>,
}

impl Customization {
    pub fn active_view<'a>(&'a self, base: &'a [ChannelRecord]) -> Vec<ActiveChannel<'a>> {
        build(
            base,
            &self.custom_channels,
            &self.deleted_channels,
            &self.overrides,
        )
    }

    pub fn is_custom(&self, id: &str) -> bool {
        self.custom_channels.iter().any(|channel| channel.id == id)
    }
}

/// Merges the lineup with custom channels, drops deleted ids and applies renames.
///
/// A custom record replaces a base record with the same id in place, so the view keeps the
/// order in which ids were first seen: base records first, then custom-only records.
pub fn build<'a>(
    base: &'a [ChannelRecord],
    custom: &'a [ChannelRecord],
    deleted: &BTreeSet<String>,
    renames: &'a BTreeMap<String, String>,
) -> Vec<ActiveChannel<'a>> {
    let mut merged: Vec<(&ChannelRecord, ChannelSource)> =
        Vec::with_capacity(base.len() + custom.len());
    let mut positions: HashMap<&str, usize> = HashMap::new();

    let sources = base
        .iter()
        .map(|record| (record, ChannelSource::Base))
        .chain(custom.iter().map(|record| (record, ChannelSource::Custom)));

    for (record, source) in sources {
        match positions.get(record.id.as_str()) {
            Some(&position) => merged[position] = (record, source),
            None => {
                positions.insert(&record.id, merged.len());
                merged.push((record, source));
            }
        }
    }

    merged
        .into_iter()
        .filter(|(record, _)| !deleted.contains(&record.id))
        .map(|(record, source)| ActiveChannel {
            id: &record.id,
            name: renames
                .get(&record.id)
                .map(String::as_str)
                .unwrap_or(record.name.as_str()),
            number: &record.number,
            source,
        })
        .collect()
}
