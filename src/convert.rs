//! Graph-to-record conversion logic.
//!
//! This module implements the core mapping from a framed/compacted
//! linked-data [`Graph`] to MARC [`Record`]s. Top-level objects typed as
//! instances become one record each; all other objects (works, agents,
//! places) are auxiliary data reached through cross-references and are
//! reported as ignored, never as errors.
//!
//! Field construction is declarative: an ordered list of independent pure
//! rules, each inspecting the candidate instance and its resolved work and
//! contributing at most one field. Adding a field mapping means adding a
//! rule, not growing a conditional chain.
//!
//! The converter holds no mutable state across calls and performs no I/O;
//! diagnostics accumulate in an explicit [`MapEvent`] list on the
//! [`MapOutcome`] rather than in ambient logging state, so mapping the same
//! graph twice yields field-for-field identical records.

use std::fmt;

use crate::error::{BibmuxError, Result};
use crate::graph::{Graph, GraphObject};
use crate::record::{ControlField, DataField, Field, Record};
use crate::vocab::{classes, properties, schemes};

/// Id placeholder for objects without one, used in events and errors.
const NO_ID: &str = "NO-ID";

/// What to do when one candidate fails to map.
///
/// Link failures are always fatal for the record they occur in; this policy
/// only decides whether the rest of the run continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the whole run on the first failed candidate.
    #[default]
    Abort,
    /// Record a [`MapEvent::RecordSkipped`] event and continue.
    Skip,
}

/// Configuration for graph-to-record conversion.
///
/// # Examples
///
/// ```
/// use bibmux::{ConverterConfig, ErrorPolicy};
///
/// let config = ConverterConfig::new().with_error_policy(ErrorPolicy::Skip);
/// ```
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Type a top-level object must carry to become a mapping candidate.
    pub instance_type: String,
    /// Type the resolved cross-reference target must carry.
    pub work_type: String,
    /// Abort-or-skip policy for failed candidates.
    pub error_policy: ErrorPolicy,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            instance_type: classes::INSTANCE.to_string(),
            work_type: classes::WORK.to_string(),
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl ConverterConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the candidate type.
    #[must_use]
    pub fn with_instance_type(mut self, rdf_type: impl Into<String>) -> Self {
        self.instance_type = rdf_type.into();
        self
    }

    /// Sets the required cross-reference target type.
    #[must_use]
    pub fn with_work_type(mut self, rdf_type: impl Into<String>) -> Self {
        self.work_type = rdf_type.into();
        self
    }

    /// Sets the abort-or-skip policy.
    #[must_use]
    pub const fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}

/// A diagnostic event recorded during one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapEvent {
    /// A top-level object was not a mapping candidate and was skipped.
    ObjectIgnored {
        /// Object id, if present.
        id: Option<String>,
        /// Types on the object.
        types: Vec<String>,
    },
    /// A candidate was mapped to a record.
    RecordMapped {
        /// Candidate id.
        id: String,
    },
    /// A candidate failed to map and was skipped ([`ErrorPolicy::Skip`]).
    RecordSkipped {
        /// Candidate id.
        id: String,
        /// Rendered failure reason.
        reason: String,
    },
}

impl fmt::Display for MapEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapEvent::ObjectIgnored { id, types } => {
                let id = id.as_deref().unwrap_or("NO-URI");
                if types.is_empty() {
                    write!(f, "ignoring object {id} type NO-TYPE")
                } else {
                    write!(f, "ignoring object {id} type {}", types.join(","))
                }
            },
            MapEvent::RecordMapped { id } => write!(f, "created record for {id}"),
            MapEvent::RecordSkipped { id, reason } => {
                write!(f, "skipped record for {id}: {reason}")
            },
        }
    }
}

/// The result of one conversion run: records plus diagnostic events,
/// both in candidate-iteration order.
#[derive(Debug, Clone, Default)]
pub struct MapOutcome {
    /// Records emitted, one per successfully mapped candidate.
    pub records: Vec<Record>,
    /// Diagnostic events in the order they occurred.
    pub events: Vec<MapEvent>,
}

/// Graph-to-record converter.
///
/// # Examples
///
/// ```
/// use bibmux::{Converter, Graph};
///
/// # fn main() -> bibmux::Result<()> {
/// let graph = Graph::from_json_str(
///     r#"[
///         {"id": "i", "type": "bf:Instance",
///          "bf:instanceOf": {"id": "w"},
///          "bf:title": {"rdfs:label": "Clinical cardiopulmonary physiology."}},
///         {"id": "w", "type": "bf:Work"}
///     ]"#,
/// )?;
/// let outcome = Converter::default().map(&graph)?;
/// assert_eq!(outcome.records.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConverterConfig,
}

/// A field construction rule: inspects the candidate and its resolved work,
/// contributes at most one field. Absent source properties contribute
/// nothing; a rule only withholds its field when it would be empty.
type FieldRule = fn(&GraphObject, &GraphObject) -> Option<Field>;

/// Field rules in output order.
const FIELD_RULES: &[FieldRule] = &[fixed_data_field, title_field];

impl Converter {
    /// Create a converter with the given configuration.
    #[must_use]
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// The converter's configuration.
    #[must_use]
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Map a graph to zero or more records.
    ///
    /// Top-level objects are visited in document order; candidates (objects
    /// typed [`ConverterConfig::instance_type`]) each yield one record,
    /// everything else yields an [`MapEvent::ObjectIgnored`] event.
    ///
    /// # Errors
    ///
    /// Under [`ErrorPolicy::Abort`], returns the first candidate's link
    /// failure: [`BibmuxError::MissingRequiredLink`],
    /// [`BibmuxError::NotFound`], or [`BibmuxError::TypeMismatch`]. Under
    /// [`ErrorPolicy::Skip`] these become [`MapEvent::RecordSkipped`] events
    /// and `map` itself succeeds.
    pub fn map(&self, graph: &Graph) -> Result<MapOutcome> {
        let mut outcome = MapOutcome::default();
        for obj in graph.objects() {
            if !obj.has_type(&self.config.instance_type) {
                outcome.events.push(MapEvent::ObjectIgnored {
                    id: obj.id().map(str::to_string),
                    types: obj.types().to_vec(),
                });
                continue;
            }
            let id = obj.id().unwrap_or(NO_ID).to_string();
            match self.map_object(graph, obj) {
                Ok(record) => {
                    outcome.events.push(MapEvent::RecordMapped { id });
                    outcome.records.push(record);
                },
                Err(err) => match self.config.error_policy {
                    ErrorPolicy::Abort => return Err(err),
                    ErrorPolicy::Skip => {
                        outcome.events.push(MapEvent::RecordSkipped {
                            id,
                            reason: err.to_string(),
                        });
                    },
                },
            }
        }
        Ok(outcome)
    }

    /// Map one candidate object to a record.
    fn map_object(&self, graph: &Graph, instance: &GraphObject) -> Result<Record> {
        let work = self.resolve_work(graph, instance)?;
        let mut record = Record::new();
        for rule in FIELD_RULES {
            if let Some(field) = rule(instance, work) {
                record.fields.push(field);
            }
        }
        Ok(record)
    }

    /// Resolve the candidate's mandatory work cross-reference.
    ///
    /// Field data is split across the instance and its work by design of the
    /// source vocabulary, so the work must resolve before any rule runs.
    fn resolve_work<'g>(
        &self,
        graph: &'g Graph,
        instance: &GraphObject,
    ) -> Result<&'g GraphObject> {
        let work_id = instance
            .reference_id(properties::INSTANCE_OF)
            .ok_or_else(|| BibmuxError::MissingRequiredLink {
                id: instance.id().unwrap_or(NO_ID).to_string(),
                property: properties::INSTANCE_OF.to_string(),
            })?;
        let work = graph
            .find_by_id(work_id)
            .ok_or_else(|| BibmuxError::NotFound {
                id: work_id.to_string(),
            })?;
        if work.has_type(&self.config.work_type) {
            Ok(work)
        } else {
            Err(BibmuxError::TypeMismatch {
                id: work_id.to_string(),
                expected: self.config.work_type.clone(),
                found: work.types().to_vec(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

/// Width of the 008 fixed-length data field.
const FIXED_FIELD_WIDTH: usize = 40;
/// Column span of the publication year (date 1).
const YEAR_SPAN: (usize, usize) = (7, 4);
/// Column span of the place of publication code.
const PLACE_SPAN: (usize, usize) = (15, 3);
/// Column span of the language code.
const LANG_SPAN: (usize, usize) = (35, 3);

/// 008 rule: fixed-width date/place/language control field.
///
/// Year and place come from the candidate's publication activity; language
/// from the resolved work. Each sub-value is independently optional and an
/// absent one renders as its span filled with spaces — the field itself is
/// always emitted so column positions stay meaningful.
fn fixed_data_field(instance: &GraphObject, work: &GraphObject) -> Option<Field> {
    let activity = instance
        .object(properties::HAS_ACTIVITY)
        .filter(|a| a.has_type(classes::PUBLICATION_ACTIVITY));
    let year = activity.and_then(|a| a.scalar(properties::DATE));
    let place = activity
        .and_then(|a| a.reference_id(properties::AT_LOCATION))
        .and_then(|id| id.strip_prefix(schemes::PLACE));
    let language = work
        .reference_id(properties::LANGUAGE)
        .and_then(|id| id.strip_prefix(schemes::LANGUAGE));

    Some(Field::Control(ControlField {
        tag: "008".to_string(),
        data: fixed_field_data(year, place, language),
    }))
}

/// Build the 40-character 008 data string from optional sub-values.
fn fixed_field_data(year: Option<&str>, place: Option<&str>, language: Option<&str>) -> String {
    let mut data = vec![' '; FIXED_FIELD_WIDTH];
    write_span(&mut data, YEAR_SPAN, year);
    write_span(&mut data, PLACE_SPAN, place);
    write_span(&mut data, LANG_SPAN, language);
    data.into_iter().collect()
}

/// Right-justify a sub-value into its column span, truncating over-long
/// values so columns never shift.
fn write_span(data: &mut [char], (start, width): (usize, usize), value: Option<&str>) {
    let Some(value) = value else { return };
    let chars: Vec<char> = value.chars().take(width).collect();
    let offset = start + width - chars.len();
    data[offset..offset + chars.len()].copy_from_slice(&chars);
}

/// 245 rule: title and statement of responsibility.
///
/// Accumulates subfields in fixed priority order — `a` from the title
/// label, then `c` from the responsibility statement — and emits the field
/// only when at least one was found. Indicators are fixed at `00`.
fn title_field(instance: &GraphObject, _work: &GraphObject) -> Option<Field> {
    let mut field = DataField::new("245".to_string(), '0', '0');
    if let Some(label) = instance
        .object(properties::TITLE)
        .and_then(|title| title.scalar(properties::LABEL))
    {
        field.add_subfield_str('a', label);
    }
    if let Some(statement) = instance.scalar(properties::RESPONSIBILITY_STATEMENT) {
        field.add_subfield_str('c', statement);
    }
    if field.subfields.is_empty() {
        None
    } else {
        Some(Field::Data(field))
    }
}
