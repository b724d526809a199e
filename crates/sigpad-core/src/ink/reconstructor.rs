//! The per-session stroke reconstruction engine.

use thiserror::Error;

use crate::domain::{DeviceCapability, InkThreshold, PenSample, Point, Segment};

/// Squared-distance gate for segment emission, in canvas-space units.
///
/// A mapped point closer than this to the current anchor does not produce a
/// segment while the pen stays down; the closing segment on pen-lift ignores
/// the gate entirely.
pub const DISTANCE_GATE_SQ: u64 = 10;

/// Errors raised when building a reconstructor from session snapshots.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InkError {
    /// A capability field or output dimension that is used as a divisor or
    /// extent is zero.  This is a configuration fault, never a runtime case
    /// to tolerate.
    #[error("invalid capture configuration: {0}")]
    Configuration(&'static str),
}

/// Mutable pen state, owned exclusively by the reconstructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PenState {
    is_down: bool,
    last_point: Point,
}

impl PenState {
    fn cleared() -> Self {
        Self {
            is_down: false,
            last_point: Point::default(),
        }
    }
}

/// Stateful engine turning raw pen samples into renderable segments.
///
/// One reconstructor serves one capture: it is built from the session's
/// [`DeviceCapability`] and [`InkThreshold`] snapshots plus the output canvas
/// dimensions, and consumed sample-by-sample through [`ingest`].  Callers
/// must feed samples in arrival order; stroke shape depends on sequence.
///
/// [`ingest`]: StrokeReconstructor::ingest
#[derive(Debug, Clone)]
pub struct StrokeReconstructor {
    capability: DeviceCapability,
    threshold: InkThreshold,
    output_width: u32,
    output_height: u32,
    state: PenState,
}

impl StrokeReconstructor {
    /// Builds a reconstructor for one capture.
    ///
    /// # Errors
    ///
    /// Returns [`InkError::Configuration`] if `capability.max_x`,
    /// `capability.max_y`, or either output dimension is zero.
    pub fn new(
        capability: DeviceCapability,
        threshold: InkThreshold,
        output_width: u32,
        output_height: u32,
    ) -> Result<Self, InkError> {
        if capability.max_x == 0 || capability.max_y == 0 {
            return Err(InkError::Configuration(
                "device capability reports zero digitizer resolution",
            ));
        }
        if output_width == 0 || output_height == 0 {
            return Err(InkError::Configuration("output canvas has zero extent"));
        }
        Ok(Self {
            capability,
            threshold,
            output_width,
            output_height,
            state: PenState::cleared(),
        })
    }

    /// Clears the pen state back to `{ is_down: false, last_point: (0,0) }`.
    ///
    /// After `reset()`, any sample sequence reproduces exactly the segment
    /// sequence a freshly constructed reconstructor would emit.
    pub fn reset(&mut self) {
        self.state = PenState::cleared();
    }

    /// Returns whether the pen is currently considered down.
    pub fn is_pen_down(&self) -> bool {
        self.state.is_down
    }

    /// Consumes one sample and emits zero or one segment.
    ///
    /// A segment is emitted either while the pen is down and the mapped point
    /// has moved past the distance gate, or on a down→up transition, where
    /// the closing segment is always drawn so a stroke never silently
    /// vanishes on lift.
    pub fn ingest(&mut self, sample: &PenSample) -> Option<Segment> {
        let next_point = self.map_to_canvas(sample);

        // Hysteresis: releasing requires dropping to or below the off-mark,
        // pressing requires rising strictly above the on-mark.
        let was_down = self.state.is_down;
        let is_down = if was_down {
            sample.pressure > self.threshold.off_pressure_mark
        } else {
            sample.pressure > self.threshold.on_pressure_mark
        };

        // Pen touched down: re-anchor so we never draw the jump from a stale
        // last point.
        if !was_down && is_down {
            self.state.last_point = next_point;
        }

        let gate_passed =
            is_down && self.state.last_point.distance_sq(&next_point) > DISTANCE_GATE_SQ;
        let stroke_closed = was_down && !is_down;

        let emitted = if gate_passed || stroke_closed {
            let segment = Segment {
                from: self.state.last_point,
                to: next_point,
            };
            self.state.last_point = next_point;
            Some(segment)
        } else {
            None
        };

        self.state.is_down = is_down;
        emitted
    }

    /// Maps a device-space sample onto the output canvas.
    fn map_to_canvas(&self, sample: &PenSample) -> Point {
        let x = (f64::from(self.output_width) * f64::from(sample.x)
            / f64::from(self.capability.max_x))
        .round() as u32;
        let y = (f64::from(self.output_height) * f64::from(sample.y)
            / f64::from(self.capability.max_y))
        .round() as u32;
        Point { x, y }
    }
}
