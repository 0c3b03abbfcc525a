#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Travel aggregation and transport mode classification.
//!
//! A single forward pass over the geocoded point stream ([`aggregate`])
//! produces the place-time ledgers, the chronological jump list, and the
//! total distance traveled. Each jump's transport mode comes from a layered
//! rule ladder ([`mode`]) that trusts high-confidence source labels and
//! otherwise reasons from geography: international hops, coastal-country
//! context, and cached water checks along the jump path.

pub mod aggregate;
pub mod mode;

pub use aggregate::{
    AggregateConfig, AggregateError, GeocodedPoint, JumpDedupPolicy, aggregate,
};
pub use mode::{JumpContext, WaterProbe, classify, map_raw_mode};
