//! Parent/child event correlation.
//!
//! GitHub delivers a pull request review and its review comments as separate,
//! unordered webhooks. The [`Correlator`] lets the review handler absorb the
//! comments that show up within a short window instead of posting each one.

pub mod correlator;

pub use correlator::*;
