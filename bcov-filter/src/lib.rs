//! Filters for compiler-generated cleanup code in JVM method bodies.
//!
//! Code that javac and ecj emit for `try`-with-resources and for leaving
//! `synchronized` blocks has no source line of its own, yet it carries
//! branches that would otherwise show up as missed in coverage reports.
//! [`Filters`] finds these spans and reports each instruction in them to a
//! [`FilterOutput`].

pub mod filters;
pub mod matcher;
pub mod synchronized;
pub mod try_with_resources;

pub use filters::{FilterConfig, FilterOutput, Filters, IgnoredInsns};
pub use synchronized::match_synchronized;
pub use try_with_resources::match_try_with_resources;

use bcov_ir::MethodBody;

/// Run every filter over `method`.
pub fn filter(method: &MethodBody, output: &mut dyn FilterOutput) {
    Filters::default().filter(method, output);
}
