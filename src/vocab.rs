//! Vocabulary terms consumed from framed/compacted graph input.
//!
//! The external JSON-LD framing step compacts all property keys and type
//! names to the short prefixed forms listed here, so the converter matches
//! these exact strings rather than full namespace URIs.

/// Compacted class names.
pub mod classes {
    /// Instance - a material embodiment of a Work; the mapping candidate type.
    pub const INSTANCE: &str = "bf:Instance";
    /// Work - the conceptual essence of a resource.
    pub const WORK: &str = "bf:Work";
    /// A publication activity attached to an instance.
    pub const PUBLICATION_ACTIVITY: &str = "bib:PublicationActivity";
}

/// Compacted property names.
pub mod properties {
    /// The instance-to-work cross-reference (mandatory on candidates).
    pub const INSTANCE_OF: &str = "bf:instanceOf";
    /// Title entity on an instance.
    pub const TITLE: &str = "bf:title";
    /// Display label, used for title text.
    pub const LABEL: &str = "rdfs:label";
    /// Statement of responsibility text on an instance.
    pub const RESPONSIBILITY_STATEMENT: &str = "bf:responsibilityStatement";
    /// Activity entity on an instance (publication, manufacture, ...).
    pub const HAS_ACTIVITY: &str = "bib:hasActivity";
    /// Location of an activity.
    pub const AT_LOCATION: &str = "bib:atLocation";
    /// Date of an activity.
    pub const DATE: &str = "dcterms:date";
    /// Language of a work.
    pub const LANGUAGE: &str = "dcterms:language";
}

/// Compacted identifier scheme prefixes.
pub mod schemes {
    /// MARC country/place authority prefix on location ids.
    pub const PLACE: &str = "loc:";
    /// MARC language authority prefix on language ids.
    pub const LANGUAGE: &str = "lang:";
}
