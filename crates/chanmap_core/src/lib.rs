//! Channel resolution engine: merges a provider lineup with user customization into the active
//! channel view, and resolves free-text channel names against it.

pub mod channel;
mod normalize;
pub mod resolve;
pub mod similarity;
pub mod view;

pub use channel::{ActiveChannel, ChannelNumber, ChannelRecord, ChannelSource};
pub use normalize::normalize;
pub use resolve::{MatchStage, ResolveError, Resolved, Resolver};
pub use similarity::{Similarity, SimilarityMetric};
pub use view::{Customization, build};
