//! Reference domain models
//!
//! Each module pairs a serde event type with a [`DomainModel`] and a
//! `*Tuning` struct holding its named thresholds. Static reference data
//! lives in [`tables`].
//!
//! [`DomainModel`]: crate::pipeline::DomainModel

pub mod epidemic;
pub mod market;
pub mod seismic;
pub mod sentiment;
pub mod tables;

pub use epidemic::{EpidemicEvent, EpidemicModel, EpidemicTuning};
pub use market::{MarketEvent, MarketModel, MarketTuning};
pub use seismic::{SeismicEvent, SeismicModel, SeismicTuning};
pub use sentiment::{SentimentEvent, SentimentModel, SentimentTuning};

/// Names of the bundled domains, as used for feed file names
pub const BUNDLED: [&str; 4] = [seismic::DOMAIN, epidemic::DOMAIN, market::DOMAIN, sentiment::DOMAIN];
