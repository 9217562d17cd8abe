//! # glm-feeder: in-place feeder edits
//!
//! Operations that reshape a parsed [`GlmTree`](glm_core::GlmTree) before it
//! is handed to GridLAB-D:
//!
//! - [`time::adjust_time`] - point the clock and recorders at a new run window
//! - [`embed::fully_de_embed`] - flatten nested objects and embedded configurations
//! - [`recorders::attach_recorders`] / [`recorders::group_swing_kids`] - add measurement
//! - [`refs::remove_number_refs`] - replace `class:N` references with names
//! - [`lines::merge_contig_lines`] - collapse pass-through line pairs
//!
//! Every operation works on top-level leaves; run [`embed::fully_de_embed`]
//! first when the model still has nested objects.

pub mod embed;
pub mod lines;
pub mod recorders;
pub mod refs;
pub mod time;

pub use embed::{de_embed_once, fully_de_embed};
pub use lines::merge_contig_lines;
pub use recorders::{attach_named, attach_recorders, group_swing_kids, RecorderKind, SWING_GROUP};
pub use refs::remove_number_refs;
pub use time::{adjust_time, parse_start, ClockWindow, SimUnits, CLOCK_FORMAT};
