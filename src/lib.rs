//! Interactive view and editing engine for pathway diagrams.
//!
//! [`model::Pathway`] holds the diagram; [`view::Canvas`] observes it and
//! turns mouse and keyboard input into model edits with undo support.

mod error;
pub mod model;
pub mod view;

pub use error::{Error, Result};
