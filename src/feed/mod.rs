//! Feed connectors that turn files of raw events into adapter input

pub mod reader;

pub use reader::{FeedReader, StartPosition};
