//! Infrastructure for the capture application: the device bridge seam, the
//! raster rendering surface, and configuration persistence.

pub mod bridge;
pub mod render;
pub mod storage;
