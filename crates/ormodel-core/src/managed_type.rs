//! Managed type registry entry: declared and visible attribute maps plus
//! the merge/override rules that populate them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::attribute::{Attribute, AttributeShape};
use crate::catalogs;
use crate::error::{LookupError, MetamodelError, Result};
use crate::types::*;

/// Stable index of a managed type inside its metamodel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type AttributeMap = BTreeMap<String, Arc<Attribute>>;

/// One entity, mapped superclass or embeddable.
#[derive(Debug, Clone)]
pub struct ManagedType {
    id: TypeId,
    class_name: String,
    kind: TypeKind,
    supertype: Option<TypeId>,
    loc: SourceLocation,
    resolved: bool,

    declared_attributes: AttributeMap,
    declared_singular_attributes: AttributeMap,
    declared_plural_attributes: AttributeMap,
    attributes: AttributeMap,
    singular_attributes: AttributeMap,
    plural_attributes: AttributeMap,
}

impl ManagedType {
    pub(crate) fn new(id: TypeId, class_name: String, kind: TypeKind, loc: SourceLocation) -> Self {
        Self {
            id,
            class_name,
            kind,
            supertype: None,
            loc,
            resolved: false,
            declared_attributes: AttributeMap::new(),
            declared_singular_attributes: AttributeMap::new(),
            declared_plural_attributes: AttributeMap::new(),
            attributes: AttributeMap::new(),
            singular_attributes: AttributeMap::new(),
            plural_attributes: AttributeMap::new(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The represented host class, fully qualified.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn simple_name(&self) -> &str {
        catalogs::simple_name(&self.class_name)
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_entity(&self) -> bool {
        self.kind == TypeKind::Entity
    }

    /// Nearest persistent ancestor, if any.
    pub fn supertype(&self) -> Option<TypeId> {
        self.supertype
    }

    pub fn loc(&self) -> &SourceLocation {
        &self.loc
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub(crate) fn mark_resolved(&mut self) {
        self.resolved = true;
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Record `attribute`, returning the visible attribute it shadows.
    ///
    /// Goes into the declared maps only when this type declares it; the
    /// visible maps are always overwritten by name. Singular and plural
    /// maps move in lock-step so only the winning category remains.
    pub(crate) fn add_attribute(&mut self, attribute: Arc<Attribute>) -> Option<Arc<Attribute>> {
        let name = attribute.name().to_string();
        let singular = attribute.is_singular();

        if attribute.declaring_type() == self.id {
            self.declared_attributes
                .insert(name.clone(), Arc::clone(&attribute));
            if singular {
                self.declared_plural_attributes.remove(&name);
                self.declared_singular_attributes
                    .insert(name.clone(), Arc::clone(&attribute));
            } else {
                self.declared_singular_attributes.remove(&name);
                self.declared_plural_attributes
                    .insert(name.clone(), Arc::clone(&attribute));
            }
        }

        if singular {
            self.plural_attributes.remove(&name);
            self.singular_attributes
                .insert(name.clone(), Arc::clone(&attribute));
        } else {
            self.singular_attributes.remove(&name);
            self.plural_attributes
                .insert(name.clone(), Arc::clone(&attribute));
        }

        self.attributes.insert(name, attribute)
    }

    /// Take over every attribute visible on `parent`, by reference.
    pub(crate) fn inherit_from(&mut self, parent: &ManagedType) {
        self.supertype = Some(parent.id);
        for attribute in parent.attributes.values() {
            self.add_attribute(Arc::clone(attribute));
        }
    }

    /// Build and register every attribute declared by `metadata`.
    ///
    /// Returns the warnings raised along the way. Two records of this type
    /// claiming one name is an error; shadowing an inherited attribute is
    /// not, unless it changes category under `strict`.
    pub(crate) fn add_attributes(
        &mut self,
        metadata: &ManagedTypeMetadata,
        options: &BuildOptions,
    ) -> Result<Vec<Diagnostic>> {
        let attributes = &metadata.attributes;

        if let Some(kind) = attributes.unrecognized.keys().next() {
            return Err(MetamodelError::UnrecognizedMetadataKind {
                class: self.class_name.clone(),
                kind: kind.clone(),
                loc: metadata.loc.clone(),
            });
        }

        let mut warnings = Vec::new();
        let mut seen: HashMap<&str, &SourceLocation> = HashMap::new();

        for record in attributes.records() {
            if let Some(first) = seen.insert(record.name(), record.loc()) {
                return Err(MetamodelError::DuplicateAttribute {
                    class: self.class_name.clone(),
                    name: record.name().to_string(),
                    first: first.clone(),
                    second: record.loc().clone(),
                });
            }

            let attribute = Arc::new(Attribute::from_metadata(self, record)?);
            trace!(
                class = %self.class_name,
                attribute = attribute.name(),
                category = %attribute.category(),
                "attribute registered"
            );

            let shadowed = match self.add_attribute(Arc::clone(&attribute)) {
                Some(previous) => previous,
                None => continue,
            };
            if shadowed.category() == attribute.category() {
                continue;
            }

            if options.strict {
                return Err(MetamodelError::CategoryChangingOverride {
                    class: self.class_name.clone(),
                    name: attribute.name().to_string(),
                    declared_by: shadowed.declaring_class().to_string(),
                    inherited: shadowed.category(),
                    overriding: attribute.category(),
                    loc: attribute.loc().clone(),
                });
            }

            warn!(
                class = %self.class_name,
                attribute = attribute.name(),
                inherited = %shadowed.category(),
                overriding = %attribute.category(),
                "override changes attribute category"
            );
            warnings.push(Diagnostic::at(
                "ORM-W001",
                DiagnosticSeverity::Warning,
                attribute.loc(),
                format!(
                    "Attribute \"{}\" in \"{}\" overrides {} attribute of \"{}\" as {}",
                    attribute.name(),
                    self.class_name,
                    shadowed.category(),
                    shadowed.declaring_class(),
                    attribute.category()
                ),
            ));
        }

        Ok(warnings)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// The attribute visible under `name`, declared here or inherited.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name).map(Arc::as_ref)
    }

    /// The attribute declared by this type itself under `name`.
    pub fn declared_attribute(&self, name: &str) -> Option<&Attribute> {
        self.declared_attributes.get(name).map(Arc::as_ref)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn singular(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.singular_attributes,
            &self.attributes,
            name,
            AttributeShape::Singular,
        )
    }

    pub fn plural(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.plural_attributes,
            &self.attributes,
            name,
            AttributeShape::Plural,
        )
    }

    pub fn list(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.plural_attributes,
            &self.attributes,
            name,
            AttributeShape::List,
        )
    }

    pub fn set(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.plural_attributes,
            &self.attributes,
            name,
            AttributeShape::Set,
        )
    }

    pub fn map(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.plural_attributes,
            &self.attributes,
            name,
            AttributeShape::Map,
        )
    }

    pub fn collection(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.plural_attributes,
            &self.attributes,
            name,
            AttributeShape::Collection,
        )
    }

    pub fn declared_singular(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.declared_singular_attributes,
            &self.declared_attributes,
            name,
            AttributeShape::Singular,
        )
    }

    pub fn declared_plural(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.declared_plural_attributes,
            &self.declared_attributes,
            name,
            AttributeShape::Plural,
        )
    }

    pub fn declared_list(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.declared_plural_attributes,
            &self.declared_attributes,
            name,
            AttributeShape::List,
        )
    }

    pub fn declared_set(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.declared_plural_attributes,
            &self.declared_attributes,
            name,
            AttributeShape::Set,
        )
    }

    pub fn declared_map(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.declared_plural_attributes,
            &self.declared_attributes,
            name,
            AttributeShape::Map,
        )
    }

    pub fn declared_collection(&self, name: &str) -> std::result::Result<&Attribute, LookupError> {
        narrow(
            &self.declared_plural_attributes,
            &self.declared_attributes,
            name,
            AttributeShape::Collection,
        )
    }

    // -----------------------------------------------------------------------
    // Enumeration (ordered by attribute name)
    // -----------------------------------------------------------------------

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values().map(Arc::as_ref)
    }

    pub fn declared_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.declared_attributes.values().map(Arc::as_ref)
    }

    pub fn singular_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.singular_attributes.values().map(Arc::as_ref)
    }

    pub fn plural_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.plural_attributes.values().map(Arc::as_ref)
    }

    pub fn declared_singular_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.declared_singular_attributes.values().map(Arc::as_ref)
    }

    pub fn declared_plural_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.declared_plural_attributes.values().map(Arc::as_ref)
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}

fn narrow<'a>(
    narrowed: &'a AttributeMap,
    all: &'a AttributeMap,
    name: &str,
    expected: AttributeShape,
) -> std::result::Result<&'a Attribute, LookupError> {
    if let Some(attribute) = narrowed.get(name) {
        if expected.matches(attribute.category()) {
            return Ok(attribute);
        }
        return Err(LookupError::CategoryMismatch {
            name: name.to_string(),
            expected,
            found: attribute.category(),
        });
    }
    match all.get(name) {
        Some(attribute) => Err(LookupError::CategoryMismatch {
            name: name.to_string(),
            expected,
            found: attribute.category(),
        }),
        None => Err(LookupError::NotFound(name.to_string())),
    }
}
