//! MARC bibliographic record structures and operations.
//!
//! This module provides the core record types:
//! - [`Record`] — an ordered sequence of fields
//! - [`Field`] — either a control field or a data field
//! - [`DataField`] — variable data field with indicators and subfields
//! - [`Subfield`] — named data elements within data fields
//!
//! Fields are stored in insertion order. Tag order is not enforced on the
//! record itself; it is a comparison key used by the [`diff`](crate::diff)
//! module, which consumes sequences produced by
//! [`Record::fields_in_tag_order`].
//!
//! # Examples
//!
//! Create a record with the builder API:
//!
//! ```
//! use bibmux::{DataField, Record};
//!
//! let record = Record::builder()
//!     .control_field_str("001", "102063")
//!     .field(
//!         DataField::builder("245".to_string(), '0', '0')
//!             .subfield_str('a', "Clinical cardiopulmonary physiology.")
//!             .build(),
//!     )
//!     .build();
//!
//! assert_eq!(record.len(), 2);
//! ```

use crate::error::{BibmuxError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Normalize a field tag to its numeric comparison key.
///
/// Tags compare as numeric keys everywhere (ordering and ignore-set
/// membership), so `"008"` and `"8"` name the same field.
///
/// # Errors
///
/// Returns [`BibmuxError::MalformedTag`] if the tag is empty or contains
/// non-digit characters.
pub fn tag_key(tag: &str) -> Result<u16> {
    if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BibmuxError::MalformedTag(tag.to_string()));
    }
    tag.parse()
        .map_err(|_| BibmuxError::MalformedTag(tag.to_string()))
}

/// A MARC bibliographic record: an ordered sequence of fields.
///
/// Insertion order is preserved exactly; once a record has been produced by
/// the converter it is plain immutable data owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Fields in insertion order.
    pub fields: Vec<Field>,
}

/// A field in a MARC record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    /// A control field: fixed-format data string, no indicators or subfields.
    Control(ControlField),
    /// A data field: two indicators and an ordered list of subfields.
    Data(DataField),
}

/// A control field (tags 000-009) holding a fixed-width data string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlField {
    /// Field tag (3 digits).
    pub tag: String,
    /// Field data; column positions are meaningful, rendered verbatim.
    pub data: String,
}

/// A data field in a MARC record (fields 010 and higher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    /// Field tag (3 digits).
    pub tag: String,
    /// First indicator.
    pub indicator1: char,
    /// Second indicator.
    pub indicator2: char,
    /// Subfields (stored in `SmallVec` to avoid allocation for typical fields
    /// with 4 or fewer subfields).
    pub subfields: SmallVec<[Subfield; 4]>,
}

/// A subfield within a data field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character).
    pub code: char,
    /// Subfield value.
    pub value: String,
}

impl Record {
    /// Create a new empty record.
    #[must_use]
    pub fn new() -> Self {
        Record { fields: Vec::new() }
    }

    /// Create a builder for fluently constructing records.
    #[must_use]
    pub fn builder() -> RecordBuilder {
        RecordBuilder {
            record: Record::new(),
        }
    }

    /// Append a control field.
    pub fn add_control_field(&mut self, tag: String, data: String) {
        self.fields.push(Field::Control(ControlField { tag, data }));
    }

    /// Append a control field using string slices.
    pub fn add_control_field_str(&mut self, tag: &str, data: &str) {
        self.add_control_field(tag.to_string(), data.to_string());
    }

    /// Append a data field.
    pub fn add_field(&mut self, field: DataField) {
        self.fields.push(Field::Data(field));
    }

    /// Get the data of the first control field with a given tag.
    #[must_use]
    pub fn get_control_field(&self, tag: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            Field::Control(cf) if cf.tag == tag => Some(cf.data.as_str()),
            _ => None,
        })
    }

    /// Get the first data field with a given tag.
    #[must_use]
    pub fn get_field(&self, tag: &str) -> Option<&DataField> {
        self.fields.iter().find_map(|f| match f {
            Field::Data(df) if df.tag == tag => Some(df),
            _ => None,
        })
    }

    /// Iterate over all fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Number of fields in the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Return the record's fields sorted by ascending numeric tag key.
    ///
    /// The sort is stable, so repeated fields with the same tag keep their
    /// relative order. This is the form the [`diff`](crate::diff) module
    /// consumes.
    ///
    /// # Errors
    ///
    /// Returns [`BibmuxError::MalformedTag`] if any field carries a
    /// non-numeric tag.
    pub fn fields_in_tag_order(&self) -> Result<Vec<Field>> {
        let mut keyed: Vec<(u16, &Field)> = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            keyed.push((tag_key(field.tag())?, field));
        }
        keyed.sort_by_key(|(key, _)| *key);
        Ok(keyed.into_iter().map(|(_, f)| f.clone()).collect())
    }
}

/// Builder for fluently constructing [`Record`]s.
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Add a control field to the record being built.
    #[must_use]
    pub fn control_field(mut self, tag: String, data: String) -> Self {
        self.record.add_control_field(tag, data);
        self
    }

    /// Add a control field using string slices.
    #[must_use]
    pub fn control_field_str(mut self, tag: &str, data: &str) -> Self {
        self.record.add_control_field_str(tag, data);
        self
    }

    /// Add a data field to the record being built.
    #[must_use]
    pub fn field(mut self, field: DataField) -> Self {
        self.record.add_field(field);
        self
    }

    /// Build the record.
    #[must_use]
    pub fn build(self) -> Record {
        self.record
    }
}

impl Field {
    /// The field's tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Field::Control(cf) => &cf.tag,
            Field::Data(df) => &df.tag,
        }
    }

    /// The field's numeric tag key.
    ///
    /// # Errors
    ///
    /// Returns [`BibmuxError::MalformedTag`] if the tag is non-numeric.
    pub fn tag_key(&self) -> Result<u16> {
        tag_key(self.tag())
    }
}

impl DataField {
    /// Create a new data field.
    #[must_use]
    pub fn new(tag: String, indicator1: char, indicator2: char) -> Self {
        DataField {
            tag,
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Create a builder for constructing data fields fluently.
    #[must_use]
    pub fn builder(tag: String, indicator1: char, indicator2: char) -> FieldBuilder {
        FieldBuilder {
            field: DataField::new(tag, indicator1, indicator2),
        }
    }

    /// Add a subfield.
    pub fn add_subfield(&mut self, code: char, value: String) {
        self.subfields.push(Subfield { code, value });
    }

    /// Add a subfield using a string slice.
    pub fn add_subfield_str(&mut self, code: char, value: &str) {
        self.add_subfield(code, value.to_string());
    }

    /// Get first value for a subfield code.
    #[must_use]
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Iterate over all subfields in order.
    pub fn subfields(&self) -> impl Iterator<Item = &Subfield> {
        self.subfields.iter()
    }
}

/// Builder for fluently constructing [`DataField`]s.
#[derive(Debug)]
pub struct FieldBuilder {
    field: DataField,
}

impl FieldBuilder {
    /// Add a subfield to the field being built.
    #[must_use]
    pub fn subfield(mut self, code: char, value: String) -> Self {
        self.field.add_subfield(code, value);
        self
    }

    /// Add a subfield using a string slice.
    #[must_use]
    pub fn subfield_str(mut self, code: char, value: &str) -> Self {
        self.field.add_subfield_str(code, value);
        self
    }

    /// Build the field.
    #[must_use]
    pub fn build(self) -> DataField {
        self.field
    }
}

/// Render a field in mnemonic text form.
///
/// Control fields render as `=TAG  data`, data fields as
/// `=TAG  I1I2$a...`, with blank indicators and blank control-field
/// positions shown as `\`. This rendering is the comparison text and the
/// line body of the diff output contract.
impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Control(cf) => {
                write!(f, "={}  {}", cf.tag, cf.data.replace(' ', "\\"))
            },
            Field::Data(df) => {
                let ind1 = if df.indicator1 == ' ' { '\\' } else { df.indicator1 };
                let ind2 = if df.indicator2 == ' ' { '\\' } else { df.indicator2 };
                write!(f, "={}  {}{}", df.tag, ind1, ind2)?;
                for sf in &df.subfields {
                    write!(f, "${}{}", sf.code, sf.value)?;
                }
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_key_normalization() {
        assert_eq!(tag_key("008").unwrap(), 8);
        assert_eq!(tag_key("8").unwrap(), 8);
        assert_eq!(tag_key("245").unwrap(), 245);
        assert!(matches!(tag_key(""), Err(BibmuxError::MalformedTag(_))));
        assert!(matches!(tag_key("24a"), Err(BibmuxError::MalformedTag(_))));
        assert!(matches!(tag_key("-10"), Err(BibmuxError::MalformedTag(_))));
    }

    #[test]
    fn test_record_preserves_insertion_order() {
        let mut record = Record::new();
        record.add_control_field_str("008", "data");
        record.add_control_field_str("001", "102063");
        let tags: Vec<&str> = record.fields().map(Field::tag).collect();
        assert_eq!(tags, vec!["008", "001"]);
    }

    #[test]
    fn test_fields_in_tag_order_is_numeric_and_stable() {
        let mut record = Record::new();
        record.add_field(
            DataField::builder("020".to_string(), ' ', ' ')
                .subfield_str('a', "first")
                .build(),
        );
        record.add_control_field_str("009", "nine");
        record.add_field(
            DataField::builder("020".to_string(), ' ', ' ')
                .subfield_str('a', "second")
                .build(),
        );
        let sorted = record.fields_in_tag_order().unwrap();
        let tags: Vec<&str> = sorted.iter().map(Field::tag).collect();
        assert_eq!(tags, vec!["009", "020", "020"]);
        // Stable: the two 020s keep insertion order
        match (&sorted[1], &sorted[2]) {
            (Field::Data(a), Field::Data(b)) => {
                assert_eq!(a.get_subfield('a'), Some("first"));
                assert_eq!(b.get_subfield('a'), Some("second"));
            },
            _ => panic!("expected data fields"),
        }
    }

    #[test]
    fn test_fields_in_tag_order_rejects_malformed_tag() {
        let mut record = Record::new();
        record.add_control_field_str("0x1", "data");
        assert!(matches!(
            record.fields_in_tag_order(),
            Err(BibmuxError::MalformedTag(_))
        ));
    }

    #[test]
    fn test_control_field_display() {
        let field = Field::Control(ControlField {
            tag: "001".to_string(),
            data: "abc".to_string(),
        });
        assert_eq!(field.to_string(), "=001  abc");
    }

    #[test]
    fn test_control_field_display_escapes_blanks() {
        let field = Field::Control(ControlField {
            tag: "008".to_string(),
            data: "  1957".to_string(),
        });
        assert_eq!(field.to_string(), "=008  \\\\1957");
    }

    #[test]
    fn test_data_field_display() {
        let field = Field::Data(
            DataField::builder("245".to_string(), '0', '0')
                .subfield_str('a', "Clinical cardiopulmonary physiology.")
                .subfield_str('c', "Sponsored by the American College of Chest Physicians.")
                .build(),
        );
        assert_eq!(
            field.to_string(),
            "=245  00$aClinical cardiopulmonary physiology.\
             $cSponsored by the American College of Chest Physicians."
        );
    }

    #[test]
    fn test_data_field_display_blank_indicators() {
        let field = Field::Data(
            DataField::builder("650".to_string(), ' ', '0')
                .subfield_str('a', "Physiology")
                .build(),
        );
        assert_eq!(field.to_string(), "=650  \\0$aPhysiology");
    }

    #[test]
    fn test_get_accessors() {
        let record = Record::builder()
            .control_field_str("001", "102063")
            .field(
                DataField::builder("245".to_string(), '0', '0')
                    .subfield_str('a', "Title")
                    .build(),
            )
            .build();
        assert_eq!(record.get_control_field("001"), Some("102063"));
        assert_eq!(record.get_control_field("008"), None);
        assert_eq!(
            record.get_field("245").and_then(|f| f.get_subfield('a')),
            Some("Title")
        );
        assert!(record.get_field("100").is_none());
    }
}
