//! Shelf-row inference and planogram compliance for one photo.

pub mod clustering;
pub mod compliance;

pub use clustering::{cluster_shelves, gap_threshold};
pub use compliance::score_compliance;
