//! Attribute taxonomy and the resolved attribute node.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::catalogs::{parse_host_type, shape_of};
use crate::error::{MetamodelError, Result};
use crate::managed_type::{ManagedType, TypeId};
use crate::types::*;

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SingularKind {
    ManyToOne,
    OneToOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PluralKind {
    OneToMany,
    ManyToMany,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionShape {
    List,
    Set,
    Map,
    Collection,
}

/// Closed set of attribute categories. Downstream loading and flushing
/// dispatch on this, so every match over it stays exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum AttributeCategory {
    Basic,
    Embedded,
    SingularAssociation {
        kind: SingularKind,
    },
    PluralAssociation {
        kind: PluralKind,
        shape: CollectionShape,
    },
}

impl AttributeCategory {
    /// Basic, embedded and to-one attributes are singular.
    pub fn is_singular(self) -> bool {
        !self.is_plural()
    }

    pub fn is_plural(self) -> bool {
        matches!(self, AttributeCategory::PluralAssociation { .. })
    }

    pub fn is_association(self) -> bool {
        matches!(
            self,
            AttributeCategory::SingularAssociation { .. }
                | AttributeCategory::PluralAssociation { .. }
        )
    }

    pub fn shape(self) -> Option<CollectionShape> {
        match self {
            AttributeCategory::PluralAssociation { shape, .. } => Some(shape),
            _ => None,
        }
    }
}

impl fmt::Display for SingularKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingularKind::ManyToOne => f.write_str("many-to-one"),
            SingularKind::OneToOne => f.write_str("one-to-one"),
        }
    }
}

impl fmt::Display for PluralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluralKind::OneToMany => f.write_str("one-to-many"),
            PluralKind::ManyToMany => f.write_str("many-to-many"),
        }
    }
}

impl fmt::Display for CollectionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionShape::List => f.write_str("list"),
            CollectionShape::Set => f.write_str("set"),
            CollectionShape::Map => f.write_str("map"),
            CollectionShape::Collection => f.write_str("collection"),
        }
    }
}

impl fmt::Display for AttributeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeCategory::Basic => f.write_str("basic"),
            AttributeCategory::Embedded => f.write_str("embedded"),
            AttributeCategory::SingularAssociation { kind } => write!(f, "{kind}"),
            AttributeCategory::PluralAssociation { kind, shape } => write!(f, "{kind} {shape}"),
        }
    }
}

/// What a narrowed lookup expects to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeShape {
    Singular,
    Plural,
    List,
    Set,
    Map,
    Collection,
}

impl AttributeShape {
    pub fn matches(self, category: AttributeCategory) -> bool {
        match self {
            AttributeShape::Singular => category.is_singular(),
            AttributeShape::Plural => category.is_plural(),
            AttributeShape::List => category.shape() == Some(CollectionShape::List),
            AttributeShape::Set => category.shape() == Some(CollectionShape::Set),
            AttributeShape::Map => category.shape() == Some(CollectionShape::Map),
            AttributeShape::Collection => category.shape() == Some(CollectionShape::Collection),
        }
    }
}

impl fmt::Display for AttributeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttributeShape::Singular => "a singular attribute",
            AttributeShape::Plural => "a plural attribute",
            AttributeShape::List => "a list attribute",
            AttributeShape::Set => "a set attribute",
            AttributeShape::Map => "a map attribute",
            AttributeShape::Collection => "a collection attribute",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Persistence semantics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Persistence {
    pub nullable: bool,
    pub fetch: FetchType,
    /// Expanded: `all` never appears, it is replaced by every operation.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub cascades: BTreeSet<CascadeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_key: Option<String>,
}

impl Persistence {
    fn new(nullable: bool, fetch: FetchType) -> Self {
        Self {
            nullable,
            fetch,
            cascades: BTreeSet::new(),
            column: None,
            mapped_by: None,
            order_by: None,
            map_key: None,
        }
    }

    fn with_cascades(mut self, cascades: &[CascadeType]) -> Self {
        for c in cascades {
            match c {
                CascadeType::All => self.cascades.extend([
                    CascadeType::Persist,
                    CascadeType::Merge,
                    CascadeType::Remove,
                    CascadeType::Refresh,
                    CascadeType::Detach,
                ]),
                other => {
                    self.cascades.insert(*other);
                }
            }
        }
        self
    }

    pub fn cascades_on(&self, op: CascadeType) -> bool {
        match op {
            CascadeType::All => self.cascades.len() == 5,
            other => self.cascades.contains(&other),
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata records as one closed variant
// ---------------------------------------------------------------------------

/// One attribute-metadata record of any kind.
#[derive(Debug, Clone, Copy)]
pub enum AttributeMetadata<'a> {
    Basic(&'a BasicAttributeMetadata),
    ManyToOne(&'a SingularAssociationMetadata),
    OneToOne(&'a SingularAssociationMetadata),
    OneToMany(&'a PluralAssociationMetadata),
    ManyToMany(&'a PluralAssociationMetadata),
    Embedded(&'a EmbeddedAttributeMetadata),
}

impl<'a> AttributeMetadata<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            AttributeMetadata::Basic(m) => &m.name,
            AttributeMetadata::ManyToOne(m) | AttributeMetadata::OneToOne(m) => &m.name,
            AttributeMetadata::OneToMany(m) | AttributeMetadata::ManyToMany(m) => &m.name,
            AttributeMetadata::Embedded(m) => &m.name,
        }
    }

    pub fn loc(&self) -> &'a SourceLocation {
        match self {
            AttributeMetadata::Basic(m) => &m.loc,
            AttributeMetadata::ManyToOne(m) | AttributeMetadata::OneToOne(m) => &m.loc,
            AttributeMetadata::OneToMany(m) | AttributeMetadata::ManyToMany(m) => &m.loc,
            AttributeMetadata::Embedded(m) => &m.loc,
        }
    }
}

impl AttributesMetadata {
    /// Every record in processing order: basic, many-to-one, one-to-one,
    /// one-to-many, many-to-many, embedded.
    pub fn records(&self) -> impl Iterator<Item = AttributeMetadata<'_>> {
        self.basics
            .iter()
            .map(AttributeMetadata::Basic)
            .chain(self.many_to_ones.iter().map(AttributeMetadata::ManyToOne))
            .chain(self.one_to_ones.iter().map(AttributeMetadata::OneToOne))
            .chain(self.one_to_manies.iter().map(AttributeMetadata::OneToMany))
            .chain(self.many_to_manies.iter().map(AttributeMetadata::ManyToMany))
            .chain(self.embeddeds.iter().map(AttributeMetadata::Embedded))
    }
}

// ---------------------------------------------------------------------------
// Attribute
// ---------------------------------------------------------------------------

/// One persistent property of a managed type. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    category: AttributeCategory,
    declaring_type: TypeId,
    declaring_class: String,
    java_type: String,
    target_class: Option<String>,
    loc: SourceLocation,
    persistence: Persistence,
}

impl Attribute {
    /// Classify one metadata record for `owner`.
    pub fn from_metadata(owner: &ManagedType, metadata: AttributeMetadata<'_>) -> Result<Self> {
        match metadata {
            AttributeMetadata::Basic(m) => Ok(Self::basic(owner, m)),
            AttributeMetadata::ManyToOne(m) => Ok(Self::singular(owner, SingularKind::ManyToOne, m)),
            AttributeMetadata::OneToOne(m) => Ok(Self::singular(owner, SingularKind::OneToOne, m)),
            AttributeMetadata::OneToMany(m) => Self::plural(owner, PluralKind::OneToMany, m),
            AttributeMetadata::ManyToMany(m) => Self::plural(owner, PluralKind::ManyToMany, m),
            AttributeMetadata::Embedded(m) => Ok(Self::embedded(owner, m)),
        }
    }

    fn new(
        owner: &ManagedType,
        name: &str,
        category: AttributeCategory,
        java_type: &str,
        target_class: Option<String>,
        loc: &SourceLocation,
        persistence: Persistence,
    ) -> Self {
        Self {
            name: name.to_string(),
            category,
            declaring_type: owner.id(),
            declaring_class: owner.class_name().to_string(),
            java_type: java_type.to_string(),
            target_class,
            loc: loc.clone(),
            persistence,
        }
    }

    fn basic(owner: &ManagedType, m: &BasicAttributeMetadata) -> Self {
        let mut persistence = Persistence::new(m.optional, m.fetch.unwrap_or(FetchType::Eager));
        persistence.column = m.column.clone();
        Self::new(
            owner,
            &m.name,
            AttributeCategory::Basic,
            &m.java_type,
            None,
            &m.loc,
            persistence,
        )
    }

    fn singular(owner: &ManagedType, kind: SingularKind, m: &SingularAssociationMetadata) -> Self {
        let target = m
            .target_entity
            .clone()
            .unwrap_or_else(|| strip_generics(&m.java_type));
        let mut persistence = Persistence::new(m.optional, m.fetch.unwrap_or(FetchType::Eager))
            .with_cascades(&m.cascades);
        persistence.mapped_by = m.mapped_by.clone();
        Self::new(
            owner,
            &m.name,
            AttributeCategory::SingularAssociation { kind },
            &m.java_type,
            Some(target),
            &m.loc,
            persistence,
        )
    }

    fn plural(owner: &ManagedType, kind: PluralKind, m: &PluralAssociationMetadata) -> Result<Self> {
        let host = parse_host_type(&m.java_type);
        let shape = match host {
            Some(ref h) => h.shape(),
            None => shape_of(m.java_type.trim()),
        };

        let target = m
            .target_entity
            .clone()
            .or_else(|| host.as_ref().and_then(|h| h.element()).map(strip_generics))
            .ok_or_else(|| MetamodelError::UnresolvableTarget {
                class: owner.class_name().to_string(),
                attribute: m.name.clone(),
                target: m.java_type.clone(),
                loc: m.loc.clone(),
            })?;

        let mut persistence =
            Persistence::new(false, m.fetch.unwrap_or(FetchType::Lazy)).with_cascades(&m.cascades);
        persistence.mapped_by = m.mapped_by.clone();
        persistence.order_by = m.order_by.clone();
        persistence.map_key = match (&m.map_key, shape) {
            (Some(key), _) => Some(key.clone()),
            (None, CollectionShape::Map) => host
                .as_ref()
                .and_then(|h| h.map_key())
                .map(str::to_string),
            (None, _) => None,
        };

        Ok(Self::new(
            owner,
            &m.name,
            AttributeCategory::PluralAssociation { kind, shape },
            &m.java_type,
            Some(target),
            &m.loc,
            persistence,
        ))
    }

    fn embedded(owner: &ManagedType, m: &EmbeddedAttributeMetadata) -> Self {
        Self::new(
            owner,
            &m.name,
            AttributeCategory::Embedded,
            &m.java_type,
            Some(strip_generics(&m.java_type)),
            &m.loc,
            Persistence::new(true, FetchType::Eager),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> AttributeCategory {
        self.category
    }

    /// The managed type whose metadata introduced this attribute.
    pub fn declaring_type(&self) -> TypeId {
        self.declaring_type
    }

    pub fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    pub fn java_type(&self) -> &str {
        &self.java_type
    }

    /// Class name of the referenced type for associations and embedded
    /// attributes. Resolve it with `Metamodel::target_type`.
    pub fn target_class(&self) -> Option<&str> {
        self.target_class.as_deref()
    }

    pub fn loc(&self) -> &SourceLocation {
        &self.loc
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn is_singular(&self) -> bool {
        self.category.is_singular()
    }

    pub fn is_plural(&self) -> bool {
        self.category.is_plural()
    }

    pub fn is_association(&self) -> bool {
        self.category.is_association()
    }

    pub fn shape(&self) -> Option<CollectionShape> {
        self.category.shape()
    }
}

fn strip_generics(raw: &str) -> String {
    match parse_host_type(raw) {
        Some(h) => h.qualified,
        None => raw.trim().to_string(),
    }
}
