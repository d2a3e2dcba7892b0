//! On-demand history backfill.

mod controller;

pub use controller::{BackfillConfig, BackfillController};
