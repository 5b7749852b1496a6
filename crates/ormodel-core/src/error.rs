//! Construction-time failures.
//!
//! Every variant is fatal to building a metamodel; there is no partial
//! model. `to_diagnostic` gives the stable code and location used by the
//! CLI and the JSON API.

use thiserror::Error;

use crate::attribute::{AttributeCategory, AttributeShape};
use crate::types::{Diagnostic, DiagnosticSeverity, SourceLocation};

pub type Result<T> = std::result::Result<T, MetamodelError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetamodelError {
    #[error("unrecognized attribute metadata kind \"{kind}\" in type \"{class}\" ({loc})")]
    UnrecognizedMetadataKind {
        class: String,
        kind: String,
        loc: SourceLocation,
    },

    #[error("duplicate attribute \"{name}\" in type \"{class}\" (declared at {first} and {second})")]
    DuplicateAttribute {
        class: String,
        name: String,
        first: SourceLocation,
        second: SourceLocation,
    },

    #[error("duplicate managed type \"{class}\" (declared at {first} and {second})")]
    DuplicateType {
        class: String,
        first: SourceLocation,
        second: SourceLocation,
    },

    #[error("attribute \"{class}.{attribute}\" targets \"{target}\" which is not a managed type")]
    UnresolvableTarget {
        class: String,
        attribute: String,
        target: String,
        loc: SourceLocation,
    },

    #[error(
        "attribute \"{class}.{attribute}\" targets \"{target}\" which is a {found}, expected {expected}"
    )]
    InvalidTarget {
        class: String,
        attribute: String,
        target: String,
        expected: &'static str,
        found: &'static str,
        loc: SourceLocation,
    },

    #[error(
        "superclass \"{superclass}\" of type \"{class}\" is ambiguous: {}",
        candidates.join(", ")
    )]
    AmbiguousSupertype {
        class: String,
        superclass: String,
        candidates: Vec<String>,
        loc: SourceLocation,
    },

    #[error("inheritance cycle: {}", chain.join(" → "))]
    InheritanceCycle {
        chain: Vec<String>,
        loc: SourceLocation,
    },

    /// Build-ordering invariant violated; a bug in this crate, not in the
    /// input metadata.
    #[error("internal error: type \"{class}\" processed before its supertype \"{supertype}\"")]
    UnresolvedSupertype { class: String, supertype: String },

    #[error(
        "attribute \"{class}.{name}\" overrides a {inherited} attribute declared by \"{declared_by}\" as {overriding}"
    )]
    CategoryChangingOverride {
        class: String,
        name: String,
        declared_by: String,
        inherited: AttributeCategory,
        overriding: AttributeCategory,
        loc: SourceLocation,
    },

    #[error("unknown managed type \"{0}\"")]
    UnknownType(String),
}

impl MetamodelError {
    pub fn code(&self) -> &'static str {
        match self {
            MetamodelError::UnrecognizedMetadataKind { .. } => "ORM-E001",
            MetamodelError::DuplicateAttribute { .. } => "ORM-E002",
            MetamodelError::DuplicateType { .. } => "ORM-E003",
            MetamodelError::UnresolvableTarget { .. } => "ORM-E004",
            MetamodelError::InvalidTarget { .. } => "ORM-E005",
            MetamodelError::InheritanceCycle { .. } => "ORM-E006",
            MetamodelError::UnresolvedSupertype { .. } => "ORM-E007",
            MetamodelError::CategoryChangingOverride { .. } => "ORM-E008",
            MetamodelError::UnknownType(_) => "ORM-E009",
            MetamodelError::AmbiguousSupertype { .. } => "ORM-E010",
        }
    }

    /// Where the offending declaration lives, when known.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            MetamodelError::UnrecognizedMetadataKind { loc, .. }
            | MetamodelError::UnresolvableTarget { loc, .. }
            | MetamodelError::InvalidTarget { loc, .. }
            | MetamodelError::InheritanceCycle { loc, .. }
            | MetamodelError::AmbiguousSupertype { loc, .. }
            | MetamodelError::CategoryChangingOverride { loc, .. } => Some(loc),
            MetamodelError::DuplicateAttribute { second, .. }
            | MetamodelError::DuplicateType { second, .. } => Some(second),
            MetamodelError::UnresolvedSupertype { .. } | MetamodelError::UnknownType(_) => None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let unknown = SourceLocation::default();
        let loc = self.location().unwrap_or(&unknown);
        Diagnostic::at(
            self.code(),
            DiagnosticSeverity::Error,
            loc,
            self.to_string(),
        )
    }
}

/// Narrowed lookup failures. Plain lookups return `Option` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no attribute named \"{0}\"")]
    NotFound(String),

    #[error("attribute \"{name}\" is {found}, not {expected}")]
    CategoryMismatch {
        name: String,
        expected: AttributeShape,
        found: AttributeCategory,
    },
}
