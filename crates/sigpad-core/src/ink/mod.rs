//! Stroke reconstruction — the core ink pipeline.
//!
//! Converts the ordered stream of raw pen samples into discrete renderable
//! [`Segment`](crate::domain::Segment)s.  Two mechanisms carry all the logic:
//!
//! - **Pressure hysteresis**: the pad reports two distinct pressure marks.
//!   The pen goes *down* only when pressure rises strictly above the on-mark
//!   and comes back *up* only when it drops to or below the off-mark, so
//!   jitter around a single cutoff cannot flicker the pen state.
//! - **Distance gating**: while the pen is down, a segment is only emitted
//!   once the mapped point has moved far enough from the last anchor.  This
//!   suppresses near-duplicate samples and yields visually smoother strokes
//!   than drawing every report.

pub mod reconstructor;

pub use reconstructor::{InkError, StrokeReconstructor, DISTANCE_GATE_SQ};
