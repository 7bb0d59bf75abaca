//! Parsing engine for Android bugreports.
//!
//! [`parser::BugreportParser`] splits a full report into its sections and
//! assembles a [`item::BugreportItem`]; every section parser can also be used
//! on its own. Parsers take `&mut self` and hold per-input state, so run one
//! instance per input (or [`clear`](parser::StreamParser::clear) between
//! inputs); instances are `Send` and can be moved to worker threads.
//!
//! [`parser::MonkeyLogParser`] reads the output of `adb shell monkey` runs,
//! which are captured apart from bugreports.

pub mod crossref;
pub mod error;
pub mod item;
pub mod parser;
pub mod patterns;
pub mod time;

pub use error::{ReportError, Result};
pub use item::{BugreportItem, Item, Section};
pub use parser::{BlockParser, BugreportParser, StreamParser};
pub use patterns::{LineMatcher, PatternRegistry};
