//! Admission control for outbound deliveries.
//!
//! Bounds how many operations may be in flight per destination scope, with an
//! optional cool-down before a freed slot can be reused. A scope with
//! capacity `C` and release delay `D` sustains at most `C / D` operations per
//! unit of time no matter how much demand queues up behind it.

pub mod controller;
pub mod registry;

pub use controller::*;
pub use registry::*;
