use ormodel_core::*;
use pretty_assertions::assert_eq;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn loc(file: &str, line: usize) -> SourceLocation {
    SourceLocation::new(file, line, 5)
}

fn basic(name: &str, file: &str, line: usize) -> BasicAttributeMetadata {
    BasicAttributeMetadata {
        name: name.into(),
        java_type: "java.lang.String".into(),
        loc: loc(file, line),
        optional: true,
        fetch: None,
        column: None,
    }
}

fn many_to_one(name: &str, target: &str, file: &str) -> SingularAssociationMetadata {
    SingularAssociationMetadata {
        name: name.into(),
        java_type: target.into(),
        target_entity: None,
        loc: loc(file, 30),
        optional: true,
        fetch: None,
        cascades: vec![],
        mapped_by: None,
    }
}

fn one_to_many(name: &str, java_type: &str, file: &str) -> PluralAssociationMetadata {
    PluralAssociationMetadata {
        name: name.into(),
        java_type: java_type.into(),
        target_entity: None,
        loc: loc(file, 40),
        fetch: None,
        cascades: vec![],
        mapped_by: None,
        order_by: None,
        map_key: None,
    }
}

fn managed(
    class: &str,
    kind: TypeKind,
    superclass: Option<&str>,
    attributes: AttributesMetadata,
) -> ManagedTypeMetadata {
    ManagedTypeMetadata {
        class_name: class.into(),
        kind,
        superclass: superclass.map(String::from),
        loc: loc(&format!("{class}.java"), 1),
        attributes,
        metadata_complete: false,
    }
}

fn build(input: &[ManagedTypeMetadata]) -> Metamodel {
    Metamodel::build(input, &BuildOptions::default()).expect("metamodel should build")
}

/// Abstract/concrete pair plus a self-referencing entity and a small
/// order/line-item graph with an embeddable.
fn shop() -> Vec<ManagedTypeMetadata> {
    vec![
        managed(
            "test.ConcreteEntity",
            TypeKind::Entity,
            Some("test.AbstractEntity"),
            AttributesMetadata {
                basics: vec![basic("myConcreteProperty", "ConcreteEntity.java", 12)],
                ..Default::default()
            },
        ),
        managed(
            "test.AbstractEntity",
            TypeKind::Entity,
            None,
            AttributesMetadata {
                basics: vec![
                    basic("id", "AbstractEntity.java", 8),
                    basic("myAbstractProperty", "AbstractEntity.java", 10),
                ],
                ..Default::default()
            },
        ),
        managed(
            "test.Order",
            TypeKind::Entity,
            None,
            AttributesMetadata {
                basics: vec![basic("number", "Order.java", 5)],
                many_to_ones: vec![many_to_one("customer", "test.ConcreteEntity", "Order.java")],
                one_to_manies: vec![
                    one_to_many("lines", "java.util.List<test.OrderLine>", "Order.java"),
                    one_to_many("tags", "java.util.Set<test.Tag>", "Order.java"),
                    one_to_many(
                        "byCode",
                        "java.util.Map<String, test.OrderLine>",
                        "Order.java",
                    ),
                ],
                embeddeds: vec![EmbeddedAttributeMetadata {
                    name: "shipping".into(),
                    java_type: "test.Address".into(),
                    loc: loc("Order.java", 50),
                }],
                ..Default::default()
            },
        ),
        managed(
            "test.OrderLine",
            TypeKind::Entity,
            None,
            AttributesMetadata {
                basics: vec![basic("quantity", "OrderLine.java", 4)],
                many_to_ones: vec![many_to_one("order", "test.Order", "OrderLine.java")],
                ..Default::default()
            },
        ),
        managed(
            "test.Tag",
            TypeKind::Entity,
            None,
            AttributesMetadata {
                basics: vec![basic("label", "Tag.java", 4)],
                ..Default::default()
            },
        ),
        managed(
            "test.Address",
            TypeKind::Embeddable,
            None,
            AttributesMetadata {
                basics: vec![
                    basic("street", "Address.java", 3),
                    basic("city", "Address.java", 4),
                ],
                ..Default::default()
            },
        ),
    ]
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn abstract_and_concrete_entity() {
    let model = build(&shop());
    let concrete = model.resolve("test.ConcreteEntity").unwrap();
    let abstract_ = model.resolve("test.AbstractEntity").unwrap();

    let visible: Vec<&str> = concrete.attributes().map(|a| a.name()).collect();
    assert_eq!(visible, vec!["id", "myAbstractProperty", "myConcreteProperty"]);

    let declared: Vec<&str> = concrete.declared_attributes().map(|a| a.name()).collect();
    assert_eq!(declared, vec!["myConcreteProperty"]);

    let inherited = concrete.attribute("myAbstractProperty").unwrap();
    assert_eq!(inherited.declaring_type(), abstract_.id());
    assert_eq!(model.declaring_type(inherited).class_name(), "test.AbstractEntity");

    let own = concrete.attribute("myConcreteProperty").unwrap();
    assert_eq!(own.declaring_type(), concrete.id());
    assert_eq!(concrete.supertype(), Some(abstract_.id()));
}

#[test]
fn self_referencing_entity() {
    let foo = managed(
        "test.Foo",
        TypeKind::Entity,
        None,
        AttributesMetadata {
            basics: vec![basic("value", "Foo.java", 5)],
            many_to_ones: vec![many_to_one("other", "test.Foo", "Foo.java")],
            ..Default::default()
        },
    );
    let model = build(&[foo]);
    let foo = model.resolve("test.Foo").unwrap();
    let other = foo.attribute("other").unwrap();
    let target = model.target_type(other).unwrap();
    assert_eq!(target.id(), foo.id());
    assert!(std::ptr::eq(target, foo));
}

#[test]
fn mutual_references_resolve_in_any_order() {
    let model = build(&shop());
    let order = model.resolve("test.Order").unwrap();
    let line = model.resolve("test.OrderLine").unwrap();

    let lines = order.list("lines").unwrap();
    assert_eq!(model.target_type(lines).unwrap().id(), line.id());
    let back = line.singular("order").unwrap();
    assert_eq!(model.target_type(back).unwrap().id(), order.id());
}

// ===========================================================================
// Properties
// ===========================================================================

#[test]
fn declared_is_subset_of_visible_and_wins() {
    let model = build(&shop());
    for managed in model.managed_types() {
        for declared in managed.declared_attributes() {
            let visible = managed
                .attribute(declared.name())
                .expect("declared attribute must be visible");
            assert!(std::ptr::eq(visible, declared), "{}", declared.name());
        }
    }
}

#[test]
fn inheritance_shares_attribute_identity() {
    let model = build(&shop());
    let parent = model.resolve("test.AbstractEntity").unwrap();
    let child = model.resolve("test.ConcreteEntity").unwrap();
    for attribute in parent.attributes() {
        if child.declared_attribute(attribute.name()).is_some() {
            continue;
        }
        let seen = child.attribute(attribute.name()).unwrap();
        assert!(std::ptr::eq(seen, attribute), "{}", attribute.name());
    }
}

#[test]
fn override_shadows_only_in_subtype() {
    let input = vec![
        managed(
            "P",
            TypeKind::Entity,
            None,
            AttributesMetadata {
                basics: vec![basic("x", "P.java", 3)],
                ..Default::default()
            },
        ),
        managed(
            "T",
            TypeKind::Entity,
            None,
            AttributesMetadata::default(),
        ),
        managed(
            "S",
            TypeKind::Entity,
            Some("P"),
            AttributesMetadata {
                many_to_ones: vec![many_to_one("x", "T", "S.java")],
                ..Default::default()
            },
        ),
    ];
    let model = build(&input);
    let p = model.resolve("P").unwrap();
    let s = model.resolve("S").unwrap();

    assert_eq!(s.attribute("x").unwrap().declaring_class(), "S");
    assert_eq!(p.attribute("x").unwrap().declaring_class(), "P");
    assert_eq!(p.attribute("x").unwrap().category(), AttributeCategory::Basic);

    // basic → many-to-one changes category: reported, not rejected
    assert_eq!(model.warnings().len(), 1);
    assert_eq!(model.warnings()[0].code, "ORM-W001");
    assert_eq!(model.warnings()[0].file, "S.java");

    let strict = Metamodel::build(&input, &BuildOptions { strict: true }).unwrap_err();
    assert_eq!(strict.code(), "ORM-E008");
}

#[test]
fn narrowed_lookups_round_trip() {
    let model = build(&shop());
    let order = model.resolve("test.Order").unwrap();

    let lines = order.attribute("lines").unwrap();
    assert!(std::ptr::eq(order.list("lines").unwrap(), lines));
    assert!(matches!(
        order.set("lines"),
        Err(LookupError::CategoryMismatch {
            expected: AttributeShape::Set,
            ..
        })
    ));

    assert_eq!(order.set("tags").unwrap().shape(), Some(CollectionShape::Set));
    assert_eq!(order.map("byCode").unwrap().shape(), Some(CollectionShape::Map));
    assert_eq!(
        order.map("byCode").unwrap().persistence().map_key.as_deref(),
        Some("String")
    );
    assert_eq!(order.singular("shipping").unwrap().category(), AttributeCategory::Embedded);
    assert_eq!(order.plural_attributes().count(), 3);
    assert_eq!(order.singular_attributes().count(), 3);
    assert_eq!(
        order.collection("missing"),
        Err(LookupError::NotFound("missing".into()))
    );
}

#[test]
fn embedded_target_is_embeddable() {
    let model = build(&shop());
    let order = model.resolve("test.Order").unwrap();
    let shipping = order.attribute("shipping").unwrap();
    let address = model.target_type(shipping).unwrap();
    assert_eq!(address.kind(), TypeKind::Embeddable);
    assert_eq!(address.attribute_count(), 2);
}

#[test]
fn building_twice_is_structurally_identical() {
    let first = build(&shop());
    let second = build(&shop());

    let summary = |model: &Metamodel| -> Vec<(String, String, String, String)> {
        model
            .managed_types()
            .flat_map(|t| {
                t.attributes().map(move |a| {
                    (
                        t.class_name().to_string(),
                        a.name().to_string(),
                        a.category().to_string(),
                        a.declaring_class().to_string(),
                    )
                })
            })
            .collect()
    };
    assert_eq!(summary(&first), summary(&second));
}

#[test]
fn metamodel_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Metamodel>();

    let model = std::sync::Arc::new(build(&shop()));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let model = std::sync::Arc::clone(&model);
            std::thread::spawn(move || model.resolve("test.Order").unwrap().attribute_count())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 6);
    }
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn unresolvable_association_target() {
    let input = vec![managed(
        "A",
        TypeKind::Entity,
        None,
        AttributesMetadata {
            many_to_ones: vec![many_to_one("ghost", "Ghost", "A.java")],
            ..Default::default()
        },
    )];
    let err = Metamodel::build(&input, &BuildOptions::default()).unwrap_err();
    match err {
        MetamodelError::UnresolvableTarget {
            class,
            attribute,
            target,
            ..
        } => {
            assert_eq!(class, "A");
            assert_eq!(attribute, "ghost");
            assert_eq!(target, "Ghost");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unrecognized_kind_from_json() {
    let raw = r#"[{
        "className": "A",
        "kind": "entity",
        "loc": { "file": "A.java", "line": 1, "col": 1 },
        "attributes": {
            "basics": [{ "name": "id", "javaType": "long" }],
            "elementCollections": [{ "name": "nicknames" }]
        }
    }]"#;
    let input: Vec<ManagedTypeMetadata> = serde_json::from_str(raw).unwrap();
    let err = Metamodel::build(&input, &BuildOptions::default()).unwrap_err();
    assert_eq!(err.code(), "ORM-E001");
    assert_eq!(err.location().unwrap().file, "A.java");
}

#[test]
fn overlay_then_build() {
    let primary = vec![managed(
        "A",
        TypeKind::Entity,
        None,
        AttributesMetadata {
            basics: vec![basic("name", "A.java", 4)],
            ..Default::default()
        },
    )];
    let overlay = MappingFile {
        source: "orm.json".into(),
        types: vec![managed(
            "A",
            TypeKind::Entity,
            None,
            AttributesMetadata {
                basics: vec![
                    BasicAttributeMetadata {
                        optional: false,
                        ..basic("name", "orm.json", 9)
                    },
                    basic("code", "orm.json", 10),
                ],
                ..Default::default()
            },
        )],
    };
    let model = build(&merge_overlays(primary, &[overlay]));
    let a = model.resolve("A").unwrap();
    assert_eq!(a.attribute_count(), 2);
    let name = a.attribute("name").unwrap();
    assert!(!name.persistence().nullable);
    assert_eq!(name.loc().file, "orm.json");
}
