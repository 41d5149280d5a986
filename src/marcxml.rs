//! MARCXML serialization and deserialization of MARC records.
//!
//! This module provides conversion between records and standard MARCXML,
//! as defined by the Library of Congress (<https://www.loc.gov/standards/marcxml/>).
//!
//! The output conforms to LOC's MARCXML schema: `tag`, `ind1`, `ind2`, and
//! `code` are serialized as XML **attributes**, and the root element carries
//! the `xmlns="http://www.loc.gov/MARC21/slim"` namespace declaration.
//! Control-field data is written verbatim — column positions are meaningful —
//! and field, indicator, and subfield order are preserved exactly, with
//! control fields grouped before data fields per the schema.
//!
//! Deserialization runs on the streaming event reader rather than serde
//! because the serde deserializer trims leading and trailing whitespace of
//! text nodes, and control-field data must survive a parse verbatim.
//! Elements are matched by local name, so both default-namespace
//! (`<record xmlns="...">`) and prefix-namespace (`<marc:record ...>`) forms
//! are accepted, and a `<leader>` element is tolerated and ignored (this
//! record model carries none).
//!
//! # Examples
//!
//! ```
//! use bibmux::{marcxml, Record};
//!
//! # fn main() -> bibmux::Result<()> {
//! let mut record = Record::new();
//! record.add_control_field_str("001", "102063");
//! let xml = marcxml::record_to_marcxml(&record)?;
//! let restored = marcxml::marcxml_to_record(&xml)?;
//! assert_eq!(restored.get_control_field("001"), Some("102063"));
//! # Ok(())
//! # }
//! ```

use crate::error::{BibmuxError, Result};
use crate::record::{DataField, Field, Record};
use lazy_static::lazy_static;
use quick_xml::events::{BytesStart, Event};
use quick_xml::se::to_string as xml_to_string;
use quick_xml::Reader;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

/// The MARCXML namespace URI.
const MARCXML_NS: &str = "http://www.loc.gov/MARC21/slim";

/// MARCXML record representation for serialization.
#[derive(Debug, Serialize)]
#[serde(rename = "record")]
pub struct MarcxmlRecord {
    /// Control fields (tags 000-009).
    pub controlfield: Vec<MarcxmlControlField>,
    /// Data fields (tags 010+).
    pub datafield: Vec<MarcxmlDataField>,
}

/// MARCXML control field representation.
#[derive(Debug, Serialize)]
pub struct MarcxmlControlField {
    /// Field tag as an XML attribute (e.g., "001", "008").
    #[serde(rename = "@tag")]
    pub tag: String,
    /// Control field value (text content).
    #[serde(rename = "$value")]
    pub value: String,
}

/// MARCXML data field representation.
#[derive(Debug, Serialize)]
pub struct MarcxmlDataField {
    /// Field tag as an XML attribute (e.g., "245", "650").
    #[serde(rename = "@tag")]
    pub tag: String,
    /// First indicator as an XML attribute.
    #[serde(rename = "@ind1")]
    pub ind1: String,
    /// Second indicator as an XML attribute.
    #[serde(rename = "@ind2")]
    pub ind2: String,
    /// Subfields.
    pub subfield: Vec<MarcxmlSubfield>,
}

/// MARCXML subfield representation.
#[derive(Debug, Serialize)]
pub struct MarcxmlSubfield {
    /// Subfield code as an XML attribute (e.g., "a", "c").
    #[serde(rename = "@code")]
    pub code: String,
    /// Subfield value (text content).
    #[serde(rename = "$value")]
    pub value: String,
}

/// MARCXML collection wrapper for multiple records.
#[derive(Debug, Serialize)]
#[serde(rename = "collection")]
pub struct MarcxmlCollection {
    /// Records in the collection.
    #[serde(rename = "record")]
    pub records: Vec<MarcxmlRecord>,
}

lazy_static! {
    static ref RE_CLOSE_TAG: Regex = Regex::new(r"(</\w+>)").unwrap();
    static ref RE_XML_DECL: Regex = Regex::new(r"(\?>)").unwrap();
    static ref RE_RECORD_OPEN: Regex = Regex::new(r"(<record>)").unwrap();
}

/// Insert newlines so the serialized XML is skimmable: after the XML
/// declaration, after every closing tag, and a blank line before each record.
fn pretty(xml: &str) -> String {
    let xml = RE_CLOSE_TAG.replace_all(xml, "$1\n");
    let xml = RE_XML_DECL.replace_all(&xml, "$1\n");
    RE_RECORD_OPEN.replace_all(&xml, "\n$1\n").to_string()
}

// ---------------------------------------------------------------------------
// Serialization: Record → MARCXML
// ---------------------------------------------------------------------------

/// Convert a record to a standard MARCXML `<record>` string.
///
/// # Errors
///
/// Returns [`BibmuxError::ParseError`] if the record cannot be serialized.
pub fn record_to_marcxml(record: &Record) -> Result<String> {
    let xml_record = to_marcxml_record(record);
    let body = xml_to_string(&xml_record)
        .map_err(|e| BibmuxError::ParseError(format!("failed to serialize to MARCXML: {e}")))?;
    let body = declare_ns(&body, "record");
    Ok(pretty(&format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>{body}"
    )))
}

/// Add the MARCXML namespace declaration to the root element, which the
/// serializer emits either as an open tag or self-closing when empty.
fn declare_ns(body: &str, element: &str) -> String {
    let open = format!("<{element}>");
    if body.contains(&open) {
        body.replacen(&open, &format!("<{element} xmlns=\"{MARCXML_NS}\">"), 1)
    } else {
        body.replacen(
            &format!("<{element}/>"),
            &format!("<{element} xmlns=\"{MARCXML_NS}\"/>"),
            1,
        )
    }
}

/// Convert records to a standard MARCXML `<collection>` string.
///
/// # Errors
///
/// Returns [`BibmuxError::ParseError`] if the records cannot be serialized.
pub fn records_to_marcxml(records: &[Record]) -> Result<String> {
    let collection = MarcxmlCollection {
        records: records.iter().map(to_marcxml_record).collect(),
    };
    let body = xml_to_string(&collection).map_err(|e| {
        BibmuxError::ParseError(format!("failed to serialize MARCXML collection: {e}"))
    })?;
    let body = declare_ns(&body, "collection");
    Ok(pretty(&format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>{body}"
    )))
}

/// Internal helper: partition a record into MARCXML field groups, keeping
/// insertion order within each group.
fn to_marcxml_record(record: &Record) -> MarcxmlRecord {
    let mut controlfields = Vec::new();
    let mut datafields = Vec::new();

    for field in record.fields() {
        match field {
            Field::Control(cf) => controlfields.push(MarcxmlControlField {
                tag: cf.tag.clone(),
                value: cf.data.clone(),
            }),
            Field::Data(df) => datafields.push(MarcxmlDataField {
                tag: df.tag.clone(),
                ind1: df.indicator1.to_string(),
                ind2: df.indicator2.to_string(),
                subfield: df
                    .subfields()
                    .map(|sf| MarcxmlSubfield {
                        code: sf.code.to_string(),
                        value: sf.value.clone(),
                    })
                    .collect(),
            }),
        }
    }

    MarcxmlRecord {
        controlfield: controlfields,
        datafield: datafields,
    }
}

// ---------------------------------------------------------------------------
// Deserialization: MARCXML → Record
// ---------------------------------------------------------------------------

fn xml_err(e: impl std::fmt::Display) -> BibmuxError {
    BibmuxError::ParseError(format!("failed to parse MARCXML: {e}"))
}

/// Get a required attribute's unescaped value.
fn require_attr(element: &BytesStart<'_>, name: &str) -> Result<String> {
    element
        .try_get_attribute(name)
        .map_err(xml_err)?
        .ok_or_else(|| {
            BibmuxError::ParseError(format!(
                "<{}> is missing the {name} attribute",
                String::from_utf8_lossy(element.local_name().as_ref())
            ))
        })?
        .unescape_value()
        .map_err(xml_err)
        .map(|v| v.into_owned())
}

/// Get an indicator attribute, defaulting absent or empty ones to blank.
fn indicator_attr(element: &BytesStart<'_>, name: &str) -> Result<char> {
    let value = match element.try_get_attribute(name).map_err(xml_err)? {
        Some(attr) => attr.unescape_value().map_err(xml_err)?.into_owned(),
        None => String::new(),
    };
    Ok(value.chars().next().unwrap_or(' '))
}

/// Which element, if any, is currently collecting text.
enum TextSink {
    None,
    Control { tag: String },
    Subfield { code: char },
}

/// Event-loop state for assembling records.
struct RecordsBuilder {
    records: Vec<Record>,
    record: Option<Record>,
    datafield: Option<DataField>,
    sink: TextSink,
    text: String,
    saw_root: bool,
}

impl RecordsBuilder {
    fn new() -> Self {
        RecordsBuilder {
            records: Vec::new(),
            record: None,
            datafield: None,
            sink: TextSink::None,
            text: String::new(),
            saw_root: false,
        }
    }

    /// Handle an element open; for self-closing elements the close runs
    /// immediately.
    fn open(&mut self, element: &BytesStart<'_>, is_empty: bool) -> Result<()> {
        let local = element.local_name().as_ref().to_vec();
        if !self.saw_root {
            self.saw_root = true;
            if local != b"collection" && local != b"record" {
                return Err(BibmuxError::ParseError(format!(
                    "unexpected root element <{}>, expected <collection> or <record>",
                    String::from_utf8_lossy(&local)
                )));
            }
        }
        match local.as_slice() {
            b"record" => self.record = Some(Record::new()),
            b"controlfield" => {
                self.sink = TextSink::Control {
                    tag: require_attr(element, "tag")?,
                };
                self.text.clear();
            },
            b"datafield" => {
                self.datafield = Some(DataField::new(
                    require_attr(element, "tag")?,
                    indicator_attr(element, "ind1")?,
                    indicator_attr(element, "ind2")?,
                ));
            },
            b"subfield" => {
                let code = require_attr(element, "code")?.chars().next().ok_or_else(|| {
                    BibmuxError::ParseError("empty subfield code".to_string())
                })?;
                self.sink = TextSink::Subfield { code };
                self.text.clear();
            },
            _ => {},
        }
        if is_empty {
            self.close(&local);
        }
        Ok(())
    }

    fn close(&mut self, local: &[u8]) {
        match local {
            b"record" => {
                if let Some(record) = self.record.take() {
                    self.records.push(record);
                }
            },
            b"controlfield" => {
                let sink = std::mem::replace(&mut self.sink, TextSink::None);
                if let (TextSink::Control { tag }, Some(record)) = (sink, self.record.as_mut()) {
                    record.add_control_field(tag, std::mem::take(&mut self.text));
                }
            },
            b"subfield" => {
                let sink = std::mem::replace(&mut self.sink, TextSink::None);
                if let (TextSink::Subfield { code }, Some(field)) = (sink, self.datafield.as_mut())
                {
                    field.add_subfield(code, std::mem::take(&mut self.text));
                }
            },
            b"datafield" => {
                if let (Some(field), Some(record)) = (self.datafield.take(), self.record.as_mut())
                {
                    record.add_field(field);
                }
            },
            // Leader and anything else: drop any collected text.
            _ => {
                self.sink = TextSink::None;
                self.text.clear();
            },
        }
    }

    fn append_text(&mut self, value: &str) {
        if !matches!(self.sink, TextSink::None) {
            self.text.push_str(value);
        }
    }
}

/// Convert a MARCXML string to records.
///
/// Accepts a `<collection>` wrapper containing any number of `<record>`
/// elements, or a bare `<record>`, with or without namespace prefixes.
/// Field text is preserved verbatim, whitespace included.
///
/// # Errors
///
/// Returns [`BibmuxError::ParseError`] on malformed XML, an unexpected root
/// element, or missing `tag`/`code` attributes.
pub fn marcxml_to_records(xml: &str) -> Result<Vec<Record>> {
    let mut reader = Reader::from_str(xml);
    let mut builder = RecordsBuilder::new();

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => builder.open(&e, false)?,
            Event::Empty(e) => builder.open(&e, true)?,
            Event::End(e) => builder.close(e.local_name().as_ref()),
            Event::Text(t) => {
                let value = t.unescape().map_err(xml_err)?;
                builder.append_text(&value);
            },
            // CDATA content is literal, no unescaping.
            Event::CData(t) => {
                builder.append_text(&String::from_utf8_lossy(&t.into_inner()));
            },
            Event::Eof => break,
            _ => {},
        }
    }

    Ok(builder.records)
}

/// Convert a MARCXML `<record>` string to a record.
///
/// # Errors
///
/// Returns [`BibmuxError::ParseError`] if the XML is invalid or holds no
/// record element.
pub fn marcxml_to_record(xml: &str) -> Result<Record> {
    marcxml_to_records(xml)?
        .into_iter()
        .next()
        .ok_or_else(|| BibmuxError::ParseError("no <record> element found".to_string()))
}

/// Parse a MARCXML source and return its first record, in ascending tag
/// order as the diff boundary requires.
///
/// When a source holds more than one record the first is deterministically
/// selected; this is documented behavior, not an error.
///
/// # Errors
///
/// Returns [`BibmuxError::NoRecords`] when the source holds zero records
/// (distinguishable from a parse failure), or
/// [`BibmuxError::ParseError`] / [`BibmuxError::MalformedTag`] on bad input.
pub fn first_record(xml: &str, source: &str) -> Result<Record> {
    let records = marcxml_to_records(xml)?;
    let count = records.len();
    let record = records
        .into_iter()
        .next()
        .ok_or_else(|| BibmuxError::NoRecords(source.to_string()))?;
    if count > 1 {
        tracing::info!("taking first of {count} records from {source}");
    }
    Ok(Record {
        fields: record.fields_in_tag_order()?,
    })
}

/// Read a MARCXML file and return its first record, in ascending tag order.
///
/// # Errors
///
/// Returns [`BibmuxError::Io`] if the file cannot be read; otherwise as
/// [`first_record`].
pub fn read_first_record_file<P: AsRef<Path>>(path: P) -> Result<Record> {
    let path = path.as_ref();
    tracing::debug!("reading {}", path.display());
    let xml = std::fs::read_to_string(path)?;
    first_record(&xml, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        let mut record = Record::new();
        record.add_control_field_str("001", "102063");
        record.add_control_field_str("008", "       1957    nyu                 eng  ");
        let mut field = DataField::new("245".to_string(), '0', '0');
        field.add_subfield_str('a', "Clinical cardiopulmonary physiology.");
        field.add_subfield_str('c', "Sponsored by the American College of Chest Physicians.");
        record.add_field(field);
        record
    }

    #[test]
    fn test_record_to_marcxml_output_format() {
        let xml = record_to_marcxml(&sample_record()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(&format!("xmlns=\"{MARCXML_NS}\"")));
        assert!(xml.contains("<controlfield tag=\"001\">102063</controlfield>"));
        assert!(xml.contains("<datafield tag=\"245\" ind1=\"0\" ind2=\"0\">"));
        assert!(xml.contains("<subfield code=\"a\">Clinical cardiopulmonary physiology.</subfield>"));
        // No leader is written
        assert!(!xml.contains("<leader>"));
    }

    #[test]
    fn test_control_field_data_written_verbatim() {
        let xml = record_to_marcxml(&sample_record()).unwrap();
        assert!(xml.contains(
            "<controlfield tag=\"008\">       1957    nyu                 eng  </controlfield>"
        ));
    }

    #[test]
    fn test_marcxml_roundtrip_preserves_whitespace() {
        let record = sample_record();
        let xml = record_to_marcxml(&record).unwrap();
        let restored = marcxml_to_record(&xml).unwrap();
        assert_eq!(restored, record);
        assert_eq!(
            restored.get_control_field("008"),
            Some("       1957    nyu                 eng  ")
        );
    }

    #[test]
    fn test_collection_roundtrip() {
        let records = vec![sample_record(), Record::new()];
        let xml = records_to_marcxml(&records).unwrap();
        let restored = marcxml_to_records(&xml).unwrap();
        assert_eq!(restored, records);
    }

    #[test]
    fn test_parse_record_with_leader_ignored() {
        let xml = r#"<record xmlns="http://www.loc.gov/MARC21/slim">
            <leader>01050cam a22003011  4500</leader>
            <controlfield tag="001">102063</controlfield>
        </record>"#;
        let record = marcxml_to_record(xml).unwrap();
        assert_eq!(record.get_control_field("001"), Some("102063"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_parse_marcxml_with_prefix_namespace() {
        let xml = r#"<marc:record xmlns:marc="http://www.loc.gov/MARC21/slim">
            <marc:controlfield tag="001">88888</marc:controlfield>
            <marc:datafield tag="245" ind1="1" ind2="0">
                <marc:subfield code="a">Prefixed title</marc:subfield>
            </marc:datafield>
        </marc:record>"#;
        let record = marcxml_to_record(xml).unwrap();
        assert_eq!(record.get_control_field("001"), Some("88888"));
        assert_eq!(
            record.get_field("245").and_then(|f| f.get_subfield('a')),
            Some("Prefixed title")
        );
    }

    #[test]
    fn test_first_record_takes_first_of_many() {
        let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim">
            <record><controlfield tag="001">test1</controlfield></record>
            <record><controlfield tag="001">test2</controlfield></record>
            <record><controlfield tag="001">test3</controlfield></record>
        </collection>"#;
        let record = first_record(xml, "three.xml").unwrap();
        assert_eq!(record.get_control_field("001"), Some("test1"));
    }

    #[test]
    fn test_first_record_sorts_fields_by_tag() {
        let xml = r#"<record>
            <controlfield tag="008">data</controlfield>
            <controlfield tag="001">abc</controlfield>
            <datafield tag="020" ind1=" " ind2=" ">
                <subfield code="a">isbn</subfield>
            </datafield>
        </record>"#;
        let record = first_record(xml, "r.xml").unwrap();
        let tags: Vec<&str> = record.fields().map(Field::tag).collect();
        assert_eq!(tags, vec!["001", "008", "020"]);
    }

    #[test]
    fn test_zero_records_is_distinguishable() {
        let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim"></collection>"#;
        match first_record(xml, "empty.xml") {
            Err(BibmuxError::NoRecords(source)) => assert_eq!(source, "empty.xml"),
            other => panic!("expected NoRecords, got {other:?}"),
        }
    }

    #[test]
    fn test_self_closing_elements() {
        let xml = r#"<collection>
            <record/>
            <record><controlfield tag="003"/></record>
        </collection>"#;
        let records = marcxml_to_records(xml).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_empty());
        assert_eq!(records[1].get_control_field("003"), Some(""));
    }

    #[test]
    fn test_cdata_content_preserved() {
        let xml = r#"<record>
            <controlfield tag="001"><![CDATA[abc]]></controlfield>
            <datafield tag="245" ind1="0" ind2="0">
                <subfield code="a"><![CDATA[Title & <markup>]]></subfield>
            </datafield>
        </record>"#;
        let record = marcxml_to_record(xml).unwrap();
        assert_eq!(record.get_control_field("001"), Some("abc"));
        assert_eq!(
            record.get_field("245").and_then(|f| f.get_subfield('a')),
            Some("Title & <markup>")
        );
    }

    #[test]
    fn test_empty_outputs_still_carry_namespace() {
        let xml = record_to_marcxml(&Record::new()).unwrap();
        assert!(xml.contains(&format!("<record xmlns=\"{MARCXML_NS}\"/>")));

        let xml = records_to_marcxml(&[]).unwrap();
        assert!(xml.contains(&format!("<collection xmlns=\"{MARCXML_NS}\"/>")));
    }

    #[test]
    fn test_invalid_xml_is_parse_error() {
        assert!(matches!(
            marcxml_to_records("<not-marcxml"),
            Err(BibmuxError::ParseError(_))
        ));
    }

    #[test]
    fn test_unexpected_root_is_parse_error() {
        assert!(matches!(
            marcxml_to_records("<catalog><record/></catalog>"),
            Err(BibmuxError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_tag_attribute_is_parse_error() {
        assert!(matches!(
            marcxml_to_records("<record><controlfield>x</controlfield></record>"),
            Err(BibmuxError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            read_first_record_file("/nonexistent/record.xml"),
            Err(BibmuxError::Io(_))
        ));
    }

    #[test]
    fn test_value_escaping_roundtrip() {
        let mut record = Record::new();
        let mut field = DataField::new("245".to_string(), '0', '0');
        field.add_subfield_str('a', "Ampersands & <angles>");
        record.add_field(field);
        let xml = record_to_marcxml(&record).unwrap();
        let restored = marcxml_to_record(&xml).unwrap();
        assert_eq!(
            restored.get_field("245").and_then(|f| f.get_subfield('a')),
            Some("Ampersands & <angles>")
        );
    }
}
