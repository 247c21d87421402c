//! Yahoo Finance v8 chart API provider.
//!
//! Yahoo has no official API and is subject to unannounced format changes; every
//! surprise in the payload is reported as [`ProviderError::Decode`](crate::providers::ProviderError::Decode)
//! rather than guessed around.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::YahooChartProvider;
