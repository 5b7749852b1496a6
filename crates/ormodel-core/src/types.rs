use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Source location
// ---------------------------------------------------------------------------

/// Declarative source position (annotation site or mapping-file line).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub col: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            file: file.into(),
            line,
            col,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

// ---------------------------------------------------------------------------
// Persistence hints shared by several attribute kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchType {
    Eager,
    Lazy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CascadeType {
    All,
    Persist,
    Merge,
    Remove,
    Refresh,
    Detach,
}

// ---------------------------------------------------------------------------
// Managed type metadata (input records)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKind {
    Entity,
    MappedSuperclass,
    Embeddable,
}

impl TypeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::Entity => "entity",
            TypeKind::MappedSuperclass => "mapped superclass",
            TypeKind::Embeddable => "embeddable",
        }
    }
}

/// Final, merged metadata for one declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedTypeMetadata {
    pub class_name: String,
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    #[serde(default)]
    pub loc: SourceLocation,
    #[serde(default)]
    pub attributes: AttributesMetadata,
    /// Only meaningful on mapping-file overlays: the overlay's attribute
    /// set replaces the annotated one instead of being merged into it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub metadata_complete: bool,
}

/// Attribute metadata of one type, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributesMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub basics: Vec<BasicAttributeMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub many_to_ones: Vec<SingularAssociationMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_to_ones: Vec<SingularAssociationMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_to_manies: Vec<PluralAssociationMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub many_to_manies: Vec<PluralAssociationMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeddeds: Vec<EmbeddedAttributeMetadata>,
    /// Kinds the source produced that this engine cannot classify
    /// (e.g. `elementCollections`). Rejected at build time.
    #[serde(flatten)]
    pub unrecognized: BTreeMap<String, serde_json::Value>,
}

impl AttributesMetadata {
    /// Names of every attribute record, in processing order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        names.extend(self.basics.iter().map(|a| a.name.as_str()));
        names.extend(self.many_to_ones.iter().map(|a| a.name.as_str()));
        names.extend(self.one_to_ones.iter().map(|a| a.name.as_str()));
        names.extend(self.one_to_manies.iter().map(|a| a.name.as_str()));
        names.extend(self.many_to_manies.iter().map(|a| a.name.as_str()));
        names.extend(self.embeddeds.iter().map(|a| a.name.as_str()));
        names
    }

    pub fn is_empty(&self) -> bool {
        self.names().is_empty() && self.unrecognized.is_empty()
    }

    /// Drop every record named `name`, whatever its kind.
    pub fn remove_named(&mut self, name: &str) {
        self.basics.retain(|a| a.name != name);
        self.many_to_ones.retain(|a| a.name != name);
        self.one_to_ones.retain(|a| a.name != name);
        self.one_to_manies.retain(|a| a.name != name);
        self.many_to_manies.retain(|a| a.name != name);
        self.embeddeds.retain(|a| a.name != name);
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicAttributeMetadata {
    pub name: String,
    pub java_type: String,
    #[serde(default)]
    pub loc: SourceLocation,
    #[serde(default = "default_true")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// Many-to-one and one-to-one records share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingularAssociationMetadata {
    pub name: String,
    pub java_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_entity: Option<String>,
    #[serde(default)]
    pub loc: SourceLocation,
    #[serde(default = "default_true")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cascades: Vec<CascadeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_by: Option<String>,
}

/// One-to-many and many-to-many records share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluralAssociationMetadata {
    pub name: String,
    pub java_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_entity: Option<String>,
    #[serde(default)]
    pub loc: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cascades: Vec<CascadeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedAttributeMetadata {
    pub name: String,
    pub java_type: String,
    #[serde(default)]
    pub loc: SourceLocation,
}

// ---------------------------------------------------------------------------
// Build options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Reject overrides that change an attribute's category instead of
    /// reporting them as warnings.
    #[serde(default)]
    pub strict: bool,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: DiagnosticSeverity,
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn at(
        code: &str,
        severity: DiagnosticSeverity,
        loc: &SourceLocation,
        message: String,
    ) -> Self {
        Self {
            code: code.to_string(),
            severity,
            file: loc.file.clone(),
            line: loc.line,
            col: loc.col,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}
