pub mod feed;

pub use feed::{CycloneConfig, DownstreamConfig, FeedConfig, SeismicConfig};
