//! Calendar text generation.
//!
//! Produces RFC 5545 text for a whole [`CalendarBundle`](crate::event::CalendarBundle).

mod generate;
mod text;

pub use generate::{Conversion, SerializeOptions, serialize};
pub use text::{escape_text, fold_line};
