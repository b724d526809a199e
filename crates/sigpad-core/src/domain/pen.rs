//! Pen report and device snapshot types.
//!
//! A connected pad streams [`PenReport`]s through the service bridge.  Three
//! report kinds exist upstream (basic, with options, with time/count
//! sequence); they differ only in auxiliary metadata and all carry the same
//! [`PenSample`] payload, so the reconstruction engine treats them uniformly
//! via [`PenReport::sample`].

use serde::{Deserialize, Serialize};

/// A single raw pen sample in device coordinate space.
///
/// `x` and `y` range over `0..=max_x` / `0..=max_y` of the session's
/// [`DeviceCapability`]; `pressure` is the raw pressure-level reading used for
/// pen-up/down hysteresis.  `time` is the device-reported timestamp counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenSample {
    pub x: u16,
    pub y: u16,
    pub pressure: u16,
    pub time: u32,
}

/// A pen report as delivered by the bridge, tagged with its upstream kind.
///
/// The kinds are semantically equivalent for stroke reconstruction; they are
/// preserved here so logging and diagnostics can distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenReport {
    /// Plain coordinate + pressure report.
    Basic(PenSample),
    /// Report carrying the pad's option byte (pen button state etc.).
    WithOptions { sample: PenSample, option: u16 },
    /// Report carrying the pad's time-count sequence number.
    TimeCountSequence { sample: PenSample, sequence: u16 },
}

impl PenReport {
    /// Projects the common sample payload out of any report kind.
    pub fn sample(&self) -> PenSample {
        match *self {
            PenReport::Basic(sample) => sample,
            PenReport::WithOptions { sample, .. } => sample,
            PenReport::TimeCountSequence { sample, .. } => sample,
        }
    }
}

/// Geometric capability of a connected pad, fixed for a session's lifetime.
///
/// `max_x`/`max_y` are the digitizer resolution used for coordinate
/// remapping; `screen_width`/`screen_height` describe the pad's own LCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapability {
    pub max_x: u16,
    pub max_y: u16,
    pub screen_width: u16,
    pub screen_height: u16,
}

/// The pad's pressure threshold pair, fetched once per session.
///
/// `on_pressure_mark >= off_pressure_mark` is assumed: the gap between the
/// two marks is the hysteresis band that prevents pen-state flicker near a
/// single cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InkThreshold {
    pub on_pressure_mark: u16,
    pub off_pressure_mark: u16,
}

/// A USB device listing entry returned by bridge discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Human-readable product name, if the bridge reports one.
    pub name: String,
}

/// A point in output-canvas coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    /// Squared Euclidean distance to `other`.
    ///
    /// Kept squared on purpose: the distance gate compares against a squared
    /// constant, so no square root is ever needed.
    pub fn distance_sq(&self, other: &Point) -> u64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        (dx * dx + dy * dy) as u64
    }
}

/// One renderable unit of ink: a line from `from` to `to` in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pen_report_kinds_project_same_sample() {
        let sample = PenSample {
            x: 100,
            y: 200,
            pressure: 512,
            time: 7,
        };

        let basic = PenReport::Basic(sample);
        let with_options = PenReport::WithOptions { sample, option: 1 };
        let sequenced = PenReport::TimeCountSequence {
            sample,
            sequence: 42,
        };

        assert_eq!(basic.sample(), sample);
        assert_eq!(with_options.sample(), sample);
        assert_eq!(sequenced.sample(), sample);
    }

    #[test]
    fn test_distance_sq_is_symmetric() {
        let a = Point { x: 0, y: 0 };
        let b = Point { x: 3, y: 4 };
        assert_eq!(a.distance_sq(&b), 25);
        assert_eq!(b.distance_sq(&a), 25);
    }

    #[test]
    fn test_distance_sq_of_identical_points_is_zero() {
        let p = Point { x: 17, y: 91 };
        assert_eq!(p.distance_sq(&p), 0);
    }
}
