pub mod backend;
pub mod clock;
pub mod config;
pub mod humanize;
pub mod observability;
pub mod results;

pub use results::{Outcome, ResultError, ResultOptions, ResultStore};
