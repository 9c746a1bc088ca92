#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::struct_excessive_bools
)]
mod detection;
mod job;
mod planogram;
mod shelves;

pub use detection::*;
pub use job::*;
pub use planogram::*;
pub use shelves::*;
