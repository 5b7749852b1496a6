//! The root registry: one managed type per host class, built
//! supertype-first so inherited attribute maps are complete before a
//! subtype layers its own declarations on top.

use std::collections::HashMap;
use std::ops::Index;

use tracing::{debug, info};

use crate::attribute::{Attribute, AttributeCategory};
use crate::catalogs::simple_name;
use crate::error::{MetamodelError, Result};
use crate::managed_type::{ManagedType, TypeId};
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Visiting,
    Done,
}

/// Immutable once built; share it freely across threads.
#[derive(Debug, Clone, Default)]
pub struct Metamodel {
    types: Vec<ManagedType>,
    by_class: HashMap<String, TypeId>,
    /// `None` marks a simple name shared by several classes.
    by_simple_name: HashMap<String, Option<TypeId>>,
    warnings: Vec<Diagnostic>,
}

impl Metamodel {
    /// Build the metamodel from one merged metadata record per type.
    pub fn build(metadata: &[ManagedTypeMetadata], options: &BuildOptions) -> Result<Self> {
        let mut model = Metamodel::default();

        for (i, m) in metadata.iter().enumerate() {
            model.register(TypeId(i), m)?;
        }

        let order = model.inheritance_order(metadata)?;
        for id in order {
            model.populate(id, &metadata[id.0], options)?;
        }

        model.validate_targets()?;

        info!(
            types = model.types.len(),
            warnings = model.warnings.len(),
            "metamodel built"
        );
        Ok(model)
    }

    fn register(&mut self, id: TypeId, m: &ManagedTypeMetadata) -> Result<()> {
        if let Some(&existing) = self.by_class.get(&m.class_name) {
            return Err(MetamodelError::DuplicateType {
                class: m.class_name.clone(),
                first: self.types[existing.0].loc().clone(),
                second: m.loc.clone(),
            });
        }

        self.types.push(ManagedType::new(
            id,
            m.class_name.clone(),
            m.kind,
            m.loc.clone(),
        ));
        self.by_class.insert(m.class_name.clone(), id);
        self.by_simple_name
            .entry(simple_name(&m.class_name).to_string())
            .and_modify(|slot| *slot = None)
            .or_insert(Some(id));
        Ok(())
    }

    /// Persistent supertype named by `m`. A superclass that is not itself a
    /// managed type is a plain host class and contributes nothing; a simple
    /// name shared by several managed types is an error.
    fn supertype_of(&self, m: &ManagedTypeMetadata) -> Result<Option<TypeId>> {
        let Some(superclass) = m.superclass.as_deref() else {
            return Ok(None);
        };
        if let Some(id) = self.lookup_id(superclass) {
            return Ok(Some(id));
        }

        if simple_name(superclass) == superclass && self.by_simple_name.contains_key(superclass) {
            let mut candidates: Vec<String> = self
                .types
                .iter()
                .filter(|t| t.simple_name() == superclass)
                .map(|t| t.class_name().to_string())
                .collect();
            candidates.sort();
            return Err(MetamodelError::AmbiguousSupertype {
                class: m.class_name.clone(),
                superclass: superclass.to_string(),
                candidates,
                loc: m.loc.clone(),
            });
        }

        debug!(
            class = %m.class_name,
            superclass,
            "superclass is not a managed type"
        );
        Ok(None)
    }

    /// Depth-first walk up the superclass chain; every type lands after
    /// its ancestors.
    fn inheritance_order(&self, metadata: &[ManagedTypeMetadata]) -> Result<Vec<TypeId>> {
        let mut order = Vec::with_capacity(metadata.len());
        let mut state = vec![Visit::New; metadata.len()];
        let mut stack: Vec<TypeId> = Vec::new();

        for i in 0..metadata.len() {
            self.visit(TypeId(i), metadata, &mut state, &mut stack, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        id: TypeId,
        metadata: &[ManagedTypeMetadata],
        state: &mut [Visit],
        stack: &mut Vec<TypeId>,
        order: &mut Vec<TypeId>,
    ) -> Result<()> {
        match state[id.0] {
            Visit::Done => return Ok(()),
            Visit::Visiting => {
                let start = stack.iter().position(|&t| t == id).unwrap_or(0);
                let chain = stack[start..]
                    .iter()
                    .chain(std::iter::once(&id))
                    .map(|t| self.types[t.0].class_name().to_string())
                    .collect();
                return Err(MetamodelError::InheritanceCycle {
                    chain,
                    loc: metadata[id.0].loc.clone(),
                });
            }
            Visit::New => {}
        }

        state[id.0] = Visit::Visiting;
        stack.push(id);
        if let Some(parent) = self.supertype_of(&metadata[id.0])? {
            self.visit(parent, metadata, state, stack, order)?;
        }
        stack.pop();
        state[id.0] = Visit::Done;
        order.push(id);
        Ok(())
    }

    fn populate(
        &mut self,
        id: TypeId,
        m: &ManagedTypeMetadata,
        options: &BuildOptions,
    ) -> Result<()> {
        if let Some(parent) = self.supertype_of(m)? {
            let (parent_type, current) = pair_mut(&mut self.types, parent, id);
            if !parent_type.is_resolved() {
                return Err(MetamodelError::UnresolvedSupertype {
                    class: current.class_name().to_string(),
                    supertype: parent_type.class_name().to_string(),
                });
            }
            current.inherit_from(parent_type);
        }

        let current = &mut self.types[id.0];
        let warnings = current.add_attributes(m, options)?;
        current.mark_resolved();

        debug!(
            class = %current.class_name(),
            kind = current.kind().as_str(),
            declared = current.declared_attributes().count(),
            visible = current.attribute_count(),
            "managed type resolved"
        );
        self.warnings.extend(warnings);
        Ok(())
    }

    /// Associations must reach an entity, embedded attributes an
    /// embeddable. Only declared attributes are checked; inherited ones
    /// were checked on their declaring type.
    fn validate_targets(&self) -> Result<()> {
        for managed in &self.types {
            for attribute in managed.declared_attributes() {
                let Some(target) = attribute.target_class() else {
                    continue;
                };
                let Some(target_type) = self.find(target) else {
                    return Err(MetamodelError::UnresolvableTarget {
                        class: managed.class_name().to_string(),
                        attribute: attribute.name().to_string(),
                        target: target.to_string(),
                        loc: attribute.loc().clone(),
                    });
                };

                let expected = match attribute.category() {
                    AttributeCategory::Embedded => TypeKind::Embeddable,
                    AttributeCategory::SingularAssociation { .. }
                    | AttributeCategory::PluralAssociation { .. } => TypeKind::Entity,
                    AttributeCategory::Basic => continue,
                };
                if target_type.kind() != expected {
                    return Err(MetamodelError::InvalidTarget {
                        class: managed.class_name().to_string(),
                        attribute: attribute.name().to_string(),
                        target: target.to_string(),
                        expected: expected.as_str(),
                        found: target_type.kind().as_str(),
                        loc: attribute.loc().clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn lookup_id(&self, class: &str) -> Option<TypeId> {
        if let Some(&id) = self.by_class.get(class) {
            return Some(id);
        }
        // Unqualified names fall back to the simple-name index.
        if simple_name(class) == class {
            return self.by_simple_name.get(class).copied().flatten();
        }
        None
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The managed type for `class`; not-found is an error.
    pub fn resolve(&self, class: &str) -> Result<&ManagedType> {
        self.find(class)
            .ok_or_else(|| MetamodelError::UnknownType(class.to_string()))
    }

    /// Like `resolve`, without the error. Accepts fully qualified names and
    /// unambiguous simple names.
    pub fn find(&self, class: &str) -> Option<&ManagedType> {
        self.lookup_id(class).map(|id| &self.types[id.0])
    }

    pub fn get(&self, id: TypeId) -> Option<&ManagedType> {
        self.types.get(id.0)
    }

    pub fn entity(&self, class: &str) -> Option<&ManagedType> {
        self.find(class).filter(|t| t.is_entity())
    }

    /// # Panics
    ///
    /// Panics if `attribute` was built by a different metamodel.
    pub fn declaring_type(&self, attribute: &Attribute) -> &ManagedType {
        &self[attribute.declaring_type()]
    }

    /// Resolve an association or embedded target on demand.
    pub fn target_type(&self, attribute: &Attribute) -> Option<&ManagedType> {
        attribute.target_class().and_then(|t| self.find(t))
    }

    /// Persistent ancestors of `managed`, nearest first, self excluded.
    pub fn ancestors<'a>(&'a self, managed: &ManagedType) -> Ancestors<'a> {
        Ancestors {
            model: self,
            next: managed.supertype(),
        }
    }

    /// Direct persistent subtypes of `managed`.
    pub fn subtypes_of(&self, managed: &ManagedType) -> Vec<&ManagedType> {
        self.types
            .iter()
            .filter(|t| t.supertype() == Some(managed.id()))
            .collect()
    }

    pub fn managed_types(&self) -> impl Iterator<Item = &ManagedType> {
        self.types.iter()
    }

    pub fn entities(&self) -> impl Iterator<Item = &ManagedType> {
        self.of_kind(TypeKind::Entity)
    }

    pub fn embeddables(&self) -> impl Iterator<Item = &ManagedType> {
        self.of_kind(TypeKind::Embeddable)
    }

    pub fn mapped_superclasses(&self) -> impl Iterator<Item = &ManagedType> {
        self.of_kind(TypeKind::MappedSuperclass)
    }

    fn of_kind(&self, kind: TypeKind) -> impl Iterator<Item = &ManagedType> {
        self.types.iter().filter(move |t| t.kind() == kind)
    }

    /// Non-fatal findings, e.g. category-changing overrides.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Index<TypeId> for Metamodel {
    type Output = ManagedType;

    fn index(&self, id: TypeId) -> &ManagedType {
        &self.types[id.0]
    }
}

pub struct Ancestors<'a> {
    model: &'a Metamodel,
    next: Option<TypeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a ManagedType;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.model.get(self.next?)?;
        self.next = current.supertype();
        Some(current)
    }
}

/// Shared parent, exclusive child. `parent` and `child` always differ:
/// a self-parented type is rejected as a cycle before population.
fn pair_mut(
    types: &mut [ManagedType],
    parent: TypeId,
    child: TypeId,
) -> (&ManagedType, &mut ManagedType) {
    if parent.0 < child.0 {
        let (head, tail) = types.split_at_mut(child.0);
        (&head[parent.0], &mut tail[0])
    } else {
        let (head, tail) = types.split_at_mut(parent.0);
        (&tail[0], &mut head[child.0])
    }
}
