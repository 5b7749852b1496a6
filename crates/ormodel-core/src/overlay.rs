//! Mapping-file overlays.
//!
//! Annotation metadata comes first; each mapping file is then folded in,
//! in declaration order, producing the single merged record per type that
//! `Metamodel::build` expects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use tracing::debug;

use crate::types::*;

/// One mapping file's worth of type metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingFile {
    pub source: String,
    #[serde(default)]
    pub types: Vec<ManagedTypeMetadata>,
}

/// Fold `overlays` into `primary`.
///
/// A type only present in an overlay is added. For a type present in both,
/// the overlay's kind and superclass win; a `metadataComplete` overlay
/// replaces the attribute set, otherwise overlay attributes replace
/// same-named primary attributes of any kind and new names are appended.
pub fn merge_overlays(
    primary: Vec<ManagedTypeMetadata>,
    overlays: &[MappingFile],
) -> Vec<ManagedTypeMetadata> {
    let mut merged = primary;
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, m)| (m.class_name.clone(), i))
        .collect();

    for file in overlays {
        for overlay in &file.types {
            match index.get(&overlay.class_name) {
                Some(&i) => {
                    debug!(
                        class = %overlay.class_name,
                        source = %file.source,
                        complete = overlay.metadata_complete,
                        "merging mapping overlay"
                    );
                    merge_type(&mut merged[i], overlay);
                }
                None => {
                    debug!(
                        class = %overlay.class_name,
                        source = %file.source,
                        "type added by mapping file"
                    );
                    index.insert(overlay.class_name.clone(), merged.len());
                    let mut added = overlay.clone();
                    added.metadata_complete = false;
                    merged.push(added);
                }
            }
        }
    }

    merged
}

fn merge_type(target: &mut ManagedTypeMetadata, overlay: &ManagedTypeMetadata) {
    target.kind = overlay.kind;
    if overlay.superclass.is_some() {
        target.superclass = overlay.superclass.clone();
    }

    if overlay.metadata_complete {
        target.attributes = overlay.attributes.clone();
        target.loc = overlay.loc.clone();
        return;
    }
    if overlay.attributes.is_empty() {
        return;
    }

    let attrs = &mut target.attributes;
    for name in overlay.attributes.names() {
        attrs.remove_named(name);
    }

    let incoming = &overlay.attributes;
    attrs.basics.extend(incoming.basics.iter().cloned());
    attrs.many_to_ones.extend(incoming.many_to_ones.iter().cloned());
    attrs.one_to_ones.extend(incoming.one_to_ones.iter().cloned());
    attrs.one_to_manies.extend(incoming.one_to_manies.iter().cloned());
    attrs.many_to_manies.extend(incoming.many_to_manies.iter().cloned());
    attrs.embeddeds.extend(incoming.embeddeds.iter().cloned());
    for (kind, value) in &incoming.unrecognized {
        attrs.unrecognized.insert(kind.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn basic(name: &str, file: &str) -> BasicAttributeMetadata {
        BasicAttributeMetadata {
            name: name.into(),
            java_type: "String".into(),
            loc: SourceLocation::new(file, 1, 1),
            optional: true,
            fetch: None,
            column: None,
        }
    }

    fn with_basics(class: &str, file: &str, names: &[&str]) -> ManagedTypeMetadata {
        ManagedTypeMetadata {
            class_name: class.into(),
            kind: TypeKind::Entity,
            superclass: None,
            loc: SourceLocation::new(file, 1, 1),
            attributes: AttributesMetadata {
                basics: names.iter().map(|n| basic(n, file)).collect(),
                ..Default::default()
            },
            metadata_complete: false,
        }
    }

    #[test]
    fn overlay_replaces_same_name_across_kinds() {
        let primary = vec![with_basics("Order", "Order.java", &["total", "note"])];
        let mut over = with_basics("Order", "orm.json", &["extra"]);
        over.attributes.embeddeds.push(EmbeddedAttributeMetadata {
            name: "note".into(),
            java_type: "Note".into(),
            loc: SourceLocation::new("orm.json", 9, 3),
        });
        let merged = merge_overlays(
            primary,
            &[MappingFile {
                source: "orm.json".into(),
                types: vec![over],
            }],
        );

        assert_eq!(merged.len(), 1);
        let attrs = &merged[0].attributes;
        assert_eq!(attrs.names(), vec!["total", "extra", "note"]);
        assert_eq!(attrs.embeddeds[0].loc.file, "orm.json");
    }

    #[test]
    fn kind_only_overlay_keeps_attributes() {
        let primary = vec![with_basics("Money", "Money.java", &["amount", "currency"])];
        let mut over = with_basics("Money", "orm.json", &[]);
        over.kind = TypeKind::Embeddable;
        assert!(over.attributes.is_empty());

        let merged = merge_overlays(
            primary,
            &[MappingFile {
                source: "orm.json".into(),
                types: vec![over],
            }],
        );

        assert_eq!(merged[0].kind, TypeKind::Embeddable);
        assert_eq!(merged[0].attributes.names(), vec!["amount", "currency"]);
        assert_eq!(merged[0].loc.file, "Money.java");
    }

    #[test]
    fn metadata_complete_replaces_everything() {
        let primary = vec![with_basics("Order", "Order.java", &["total", "note"])];
        let mut over = with_basics("Order", "orm.json", &["id"]);
        over.metadata_complete = true;
        over.superclass = Some("Base".into());
        let merged = merge_overlays(
            primary,
            &[MappingFile {
                source: "orm.json".into(),
                types: vec![over],
            }],
        );

        assert_eq!(merged[0].attributes.names(), vec!["id"]);
        assert_eq!(merged[0].superclass.as_deref(), Some("Base"));
        assert_eq!(merged[0].loc.file, "orm.json");
    }

    #[test]
    fn overlay_only_types_are_appended_in_order() {
        let primary = vec![with_basics("A", "A.java", &["a"])];
        let merged = merge_overlays(
            primary,
            &[
                MappingFile {
                    source: "one.json".into(),
                    types: vec![with_basics("B", "one.json", &["b"])],
                },
                MappingFile {
                    source: "two.json".into(),
                    types: vec![with_basics("B", "two.json", &["b2"])],
                },
            ],
        );
        let classes: Vec<&str> = merged.iter().map(|m| m.class_name.as_str()).collect();
        assert_eq!(classes, vec!["A", "B"]);
        assert_eq!(merged[1].attributes.names(), vec!["b", "b2"]);
    }
}
