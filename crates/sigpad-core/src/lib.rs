//! sigpad-core: domain entities and the stroke reconstruction engine.
//!
//! Foundation crate for SigPad.  Holds the pen report data model shared with
//! the bridge boundary and the pure stroke reconstruction logic (pressure
//! hysteresis + distance gating + coordinate remapping).  No infrastructure
//! dependencies; everything here runs without a pad attached.

pub mod domain;
pub mod ink;

pub use domain::{
    DeviceCapability, DeviceDescriptor, InkThreshold, PenReport, PenSample, Point, Segment,
};
pub use ink::{InkError, StrokeReconstructor};
