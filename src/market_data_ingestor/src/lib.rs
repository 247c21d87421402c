//! Market data fetching for daily close/volume observations.
//!
//! [`providers::DataProvider`] is the boundary the rest of the workspace codes
//! against; [`providers::yahoo_chart`] is the shipped implementation.

pub mod models;
pub mod providers;
