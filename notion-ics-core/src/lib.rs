//! Core conversion logic for notion-ics.
//!
//! Records arrive already fetched (see [`source`] for the Notion page shape),
//! dates are normalized by [`normalize`], and [`ics`] assembles the final
//! calendar text. Nothing in this crate performs network I/O.

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod event;
pub mod ics;
pub mod normalize;
pub mod source;

pub use diagnostic::{SkipReason, SkipWarning};
pub use error::{IcsError, IcsResult};
pub use event::{CalendarBundle, EventRecord, EventTime};
pub use ics::{Conversion, SerializeOptions, serialize};
pub use normalize::{normalize, parse_instant};
