#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Modules
//!
//! - [`record`] — Core record structures (`Record`, `Field`, `Subfield`)
//! - [`graph`] — Framed/compacted JSON-LD graph model and loader
//! - [`convert`] — Graph-to-record conversion
//! - [`diff`] — Ordered field-by-field record comparison
//! - [`marcxml`] — MARCXML serialization/deserialization
//! - [`vocab`] — Vocabulary terms consumed from graph input
//! - [`error`] — Error types and result type

pub mod convert;
pub mod diff;
pub mod error;
pub mod graph;
pub mod marcxml;
pub mod record;
pub mod vocab;

pub use convert::{Converter, ConverterConfig, ErrorPolicy, MapEvent, MapOutcome};
pub use diff::{diff_fields, diff_records, render, DiffLine, DiffOptions};
pub use error::{BibmuxError, Result};
pub use graph::{Graph, GraphObject, PropertyValue};
pub use record::{ControlField, DataField, Field, FieldBuilder, Record, RecordBuilder, Subfield};
