//! Ordered field-by-field comparison of MARC records.
//!
//! The differ is a linear two-pointer merge over two field sequences that
//! are already sorted by ascending numeric tag (the record parser's
//! contract — see [`Record::fields_in_tag_order`]). Each step classifies one
//! position as equal, changed, or present on only one side.
//!
//! Tags are compared as numeric keys throughout: `"008"` and `8` name the
//! same ignore key, and `"020"` sorts after `"009"` because the comparison
//! is numeric, never lexical.
//!
//! Output line text is a stable contract:
//!
//! ```text
//! == <rendering>      equal (verbose only)
//! -< <left rendering>  changed, left version
//! -> <right rendering> changed, right version
//! << <left rendering>  only in left
//! >> <right rendering> only in right
//! ```
//!
//! Repeated same-tag fields are compared pairwise in sequence order; no
//! cross-product alignment of repeated fields is attempted.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::Result;
use crate::record::{tag_key, Field, Record};

/// Options controlling a diff run.
///
/// # Examples
///
/// ```
/// use bibmux::DiffOptions;
///
/// # fn main() -> bibmux::Result<()> {
/// let options = DiffOptions::new()
///     .with_verbose(true)
///     .ignore_tag("008")?
///     .ignore_tag("1")?;
/// assert!(options.is_ignored(8));
/// assert!(options.is_ignored(1));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    verbose: bool,
    ignore: BTreeSet<u16>,
}

impl DiffOptions {
    /// Creates options with defaults: not verbose, nothing ignored.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether equal fields are reported.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Adds a tag to the ignore set, accepting numeric or zero-padded
    /// spellings (`"8"` and `"008"` are the same key).
    ///
    /// # Errors
    ///
    /// Returns [`BibmuxError::MalformedTag`](crate::BibmuxError::MalformedTag)
    /// if the tag is not numeric.
    pub fn ignore_tag(mut self, tag: &str) -> Result<Self> {
        self.ignore.insert(tag_key(tag)?);
        Ok(self)
    }

    /// Adds an already-normalized numeric tag key to the ignore set.
    #[must_use]
    pub fn ignore_key(mut self, key: u16) -> Self {
        self.ignore.insert(key);
        self
    }

    /// Whether equal fields are reported.
    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Whether a tag key is ignored.
    #[must_use]
    pub fn is_ignored(&self, key: u16) -> bool {
        self.ignore.contains(&key)
    }
}

/// One classified position in a diff report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    /// Both sides carry the field with identical text (verbose runs only).
    Equal {
        /// Numeric tag key.
        tag: u16,
        /// Rendered field text.
        text: String,
    },
    /// Both sides carry the tag but the text differs.
    Changed {
        /// Numeric tag key.
        tag: u16,
        /// Rendered left-side field text.
        left: String,
        /// Rendered right-side field text.
        right: String,
    },
    /// Only the left sequence carries this field.
    LeftOnly {
        /// Numeric tag key.
        tag: u16,
        /// Rendered field text.
        text: String,
    },
    /// Only the right sequence carries this field.
    RightOnly {
        /// Numeric tag key.
        tag: u16,
        /// Rendered field text.
        text: String,
    },
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffLine::Equal { text, .. } => write!(f, "== {text}"),
            DiffLine::Changed { left, right, .. } => write!(f, "-< {left}\n-> {right}"),
            DiffLine::LeftOnly { text, .. } => write!(f, "<< {text}"),
            DiffLine::RightOnly { text, .. } => write!(f, ">> {text}"),
        }
    }
}

/// Diff two field sequences, assumed pre-sorted by ascending numeric tag.
///
/// Either side may be empty; an empty side behaves as permanently exhausted
/// and every remaining field on the other side is reported as one-sided.
///
/// # Errors
///
/// Returns [`BibmuxError::MalformedTag`](crate::BibmuxError::MalformedTag)
/// when any field carries a non-numeric tag; fields never miscompare
/// silently.
pub fn diff_fields(
    left: &[Field],
    right: &[Field],
    options: &DiffOptions,
) -> Result<Vec<DiffLine>> {
    let mut lines = Vec::new();
    let mut li = 0;
    let mut ri = 0;

    while li < left.len() || ri < right.len() {
        match (left.get(li), right.get(ri)) {
            (Some(l), Some(r)) => {
                let lk = l.tag_key()?;
                let rk = r.tag_key()?;
                if lk == rk {
                    let left_text = l.to_string();
                    let right_text = r.to_string();
                    if left_text == right_text {
                        if options.is_verbose() {
                            lines.push(DiffLine::Equal {
                                tag: lk,
                                text: left_text,
                            });
                        }
                    } else if !options.is_ignored(lk) {
                        lines.push(DiffLine::Changed {
                            tag: lk,
                            left: left_text,
                            right: right_text,
                        });
                    }
                    li += 1;
                    ri += 1;
                } else if lk < rk {
                    if !options.is_ignored(lk) {
                        lines.push(DiffLine::LeftOnly {
                            tag: lk,
                            text: l.to_string(),
                        });
                    }
                    li += 1;
                } else {
                    if !options.is_ignored(rk) {
                        lines.push(DiffLine::RightOnly {
                            tag: rk,
                            text: r.to_string(),
                        });
                    }
                    ri += 1;
                }
            },
            (Some(l), None) => {
                let lk = l.tag_key()?;
                if !options.is_ignored(lk) {
                    lines.push(DiffLine::LeftOnly {
                        tag: lk,
                        text: l.to_string(),
                    });
                }
                li += 1;
            },
            (None, Some(r)) => {
                let rk = r.tag_key()?;
                if !options.is_ignored(rk) {
                    lines.push(DiffLine::RightOnly {
                        tag: rk,
                        text: r.to_string(),
                    });
                }
                ri += 1;
            },
            (None, None) => unreachable!("loop condition guarantees a field"),
        }
    }

    Ok(lines)
}

/// Diff two records, sorting each into ascending tag order first.
///
/// # Errors
///
/// Returns [`BibmuxError::MalformedTag`](crate::BibmuxError::MalformedTag)
/// when any field in either record carries a non-numeric tag.
pub fn diff_records(left: &Record, right: &Record, options: &DiffOptions) -> Result<Vec<DiffLine>> {
    diff_fields(
        &left.fields_in_tag_order()?,
        &right.fields_in_tag_order()?,
        options,
    )
}

/// Render a diff report as newline-joined text.
///
/// A [`DiffLine::Changed`] entry renders as its two output lines. An empty
/// report renders as the empty string.
#[must_use]
pub fn render(lines: &[DiffLine]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BibmuxError;
    use crate::record::DataField;

    fn control(tag: &str, data: &str) -> Field {
        Field::Control(crate::record::ControlField {
            tag: tag.to_string(),
            data: data.to_string(),
        })
    }

    fn titled(tag: &str, title: &str) -> Field {
        Field::Data(
            DataField::builder(tag.to_string(), '0', '0')
                .subfield_str('a', title)
                .build(),
        )
    }

    #[test]
    fn test_identical_single_field_records() {
        let a = vec![control("001", "abc")];
        let b = vec![control("001", "abc")];
        let lines = diff_fields(&a, &b, &DiffOptions::new()).unwrap();
        assert!(lines.is_empty());

        let lines = diff_fields(&a, &b, &DiffOptions::new().with_verbose(true)).unwrap();
        assert_eq!(render(&lines), "== =001  abc");
    }

    #[test]
    fn test_changed_field() {
        let a = vec![control("001", "abc"), control("002", "def")];
        let b = vec![control("001", "abc"), control("002", "ghi")];
        let lines = diff_fields(&a, &b, &DiffOptions::new()).unwrap();
        assert_eq!(render(&lines), "-< =002  def\n-> =002  ghi");
    }

    #[test]
    fn test_ignore_accepts_numeric_and_padded_spellings() {
        let a = vec![control("002", "def")];
        let b = vec![control("002", "ghi")];

        let options = DiffOptions::new().ignore_key(2);
        assert!(diff_fields(&a, &b, &options).unwrap().is_empty());

        let options = DiffOptions::new().ignore_tag("002").unwrap();
        assert!(diff_fields(&a, &b, &options).unwrap().is_empty());

        let options = DiffOptions::new().ignore_tag("2").unwrap();
        assert!(diff_fields(&a, &b, &options).unwrap().is_empty());
    }

    #[test]
    fn test_one_sided_fields_in_tag_order() {
        let a = vec![
            control("001", "abc"),
            control("002", "def"),
            control("003", "three"),
        ];
        let b = vec![
            control("001", "abc"),
            control("002", "ghi"),
            control("004", "four"),
        ];
        let options = DiffOptions::new().ignore_tag("002").unwrap();
        let lines = diff_fields(&a, &b, &options).unwrap();
        assert_eq!(render(&lines), "<< =003  three\n>> =004  four");

        let options = DiffOptions::new().ignore_key(2).ignore_key(4);
        let lines = diff_fields(&a, &b, &options).unwrap();
        assert_eq!(render(&lines), "<< =003  three");

        let options = DiffOptions::new().ignore_key(2).ignore_key(3);
        let lines = diff_fields(&a, &b, &options).unwrap();
        assert_eq!(render(&lines), ">> =004  four");
    }

    #[test]
    fn test_empty_left_side() {
        let b = vec![control("001", "abc"), titled("245", "T")];
        let lines = diff_fields(&[], &b, &DiffOptions::new()).unwrap();
        assert_eq!(render(&lines), ">> =001  abc\n>> =245  00$aT");
    }

    #[test]
    fn test_empty_right_side() {
        let a = vec![control("001", "abc")];
        let lines = diff_fields(&a, &[], &DiffOptions::new()).unwrap();
        assert_eq!(render(&lines), "<< =001  abc");
    }

    #[test]
    fn test_both_empty() {
        let lines = diff_fields(&[], &[], &DiffOptions::new()).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_numeric_tag_ordering() {
        // 020 must sort after 009: keys compare numerically.
        let a = vec![control("009", "nine")];
        let b = vec![titled("020", "isbn")];
        let lines = diff_fields(&a, &b, &DiffOptions::new()).unwrap();
        assert_eq!(
            lines,
            vec![
                DiffLine::LeftOnly {
                    tag: 9,
                    text: "=009  nine".to_string()
                },
                DiffLine::RightOnly {
                    tag: 20,
                    text: "=020  00$aisbn".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_data_field_comparison_includes_indicators_and_subfields() {
        let a = vec![Field::Data(
            DataField::builder("245".to_string(), '0', '0')
                .subfield_str('a', "T")
                .build(),
        )];
        let b = vec![Field::Data(
            DataField::builder("245".to_string(), '1', '0')
                .subfield_str('a', "T")
                .build(),
        )];
        let lines = diff_fields(&a, &b, &DiffOptions::new()).unwrap();
        assert_eq!(render(&lines), "-< =245  00$aT\n-> =245  10$aT");
    }

    #[test]
    fn test_malformed_tag_errors() {
        let a = vec![control("0x8", "data")];
        let b = vec![control("001", "abc")];
        assert!(matches!(
            diff_fields(&a, &b, &DiffOptions::new()),
            Err(BibmuxError::MalformedTag(_))
        ));
        assert!(matches!(
            DiffOptions::new().ignore_tag("abc"),
            Err(BibmuxError::MalformedTag(_))
        ));
    }

    #[test]
    fn test_verbose_reports_each_equal_field() {
        let a = vec![control("001", "abc"), titled("245", "T")];
        let lines = diff_fields(&a, &a, &DiffOptions::new().with_verbose(true)).unwrap();
        assert_eq!(render(&lines), "== =001  abc\n== =245  00$aT");
    }

    #[test]
    fn test_diff_records_sorts_before_comparing() {
        let mut left = Record::new();
        left.add_control_field_str("008", "x");
        left.add_control_field_str("001", "abc");
        let mut right = Record::new();
        right.add_control_field_str("001", "abc");
        right.add_control_field_str("008", "x");
        let lines = diff_records(&left, &right, &DiffOptions::new()).unwrap();
        assert!(lines.is_empty());
    }
}
