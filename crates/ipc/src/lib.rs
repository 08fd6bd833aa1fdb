//! # IPC
//!
//! Computes instructions-per-cycle (IPC) for a set of cores from one snapshot
//! of their instruction and cycle counters, and reduces the per-core values to
//! a single average.
//!
//! Cores that recorded zero cycles have no defined IPC. They are marked with a
//! NaN sentinel in the [`IpcVector`] and left out of the average computed by
//! [`aggregate`]. When no core has a defined IPC the average is `None`.

pub mod aggregator;

pub use aggregator::*;
