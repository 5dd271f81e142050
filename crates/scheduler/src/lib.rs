//! Weighted distribution of specs across parallel workers.

#![warn(missing_docs)]

pub mod weights;
pub mod distributor;

pub use weights::{
    load_weight_table, read_weight_table, resolve_weight, update_weights_file,
    weights_from_timings, SuffixRule, WeightsError,
};
pub use distributor::{Distributor, DEFAULT_WEIGHT};
