//! Domain entities for SigPad.
//!
//! This module contains pure data types with no infrastructure dependencies:
//! the raw pen report model produced by the pad bridge, the device capability
//! and ink-threshold snapshots fetched at session setup, and the output-space
//! geometry types consumed by the rendering sink.  Code here compiles and
//! tests on any platform without a pad attached.

pub mod pen;

pub use pen::{
    DeviceCapability, DeviceDescriptor, InkThreshold, PenReport, PenSample, Point, Segment,
};
