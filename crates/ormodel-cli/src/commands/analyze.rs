use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use ormodel_core::{AttributeCategory, ManagedType, Metamodel, TypeId};

use crate::build_model;

/// (source, target, relation)
type Edge = (String, String, String);

pub fn run_analyze(input_path: &Path, unit: Option<&str>, format: &str) -> Result<String, String> {
    let (_, model) = build_model(input_path, unit, false)?;

    let labels = node_labels(&model);
    let nodes: BTreeSet<String> = labels.values().cloned().collect();
    let mut edges = collect_edges(&model, &labels);

    // Deduplicate edges
    edges.sort();
    edges.dedup();

    match format {
        "dot" => Ok(render_dot(&nodes, &edges)),
        _ => Ok(render_mermaid(&nodes, &edges)),
    }
}

/// Simple names where unique, class names where two types share one.
fn node_labels(model: &Metamodel) -> HashMap<TypeId, String> {
    let mut simple_counts: HashMap<&str, usize> = HashMap::new();
    for managed in model.managed_types() {
        *simple_counts.entry(managed.simple_name()).or_insert(0) += 1;
    }

    model
        .managed_types()
        .map(|managed| {
            let label = if simple_counts[managed.simple_name()] > 1 {
                managed.class_name()
            } else {
                managed.simple_name()
            };
            (managed.id(), label.to_string())
        })
        .collect()
}

fn label_of(labels: &HashMap<TypeId, String>, managed: &ManagedType) -> String {
    labels
        .get(&managed.id())
        .cloned()
        .unwrap_or_else(|| managed.class_name().to_string())
}

fn collect_edges(model: &Metamodel, labels: &HashMap<TypeId, String>) -> Vec<Edge> {
    let mut edges: Vec<Edge> = Vec::new();

    for managed in model.managed_types() {
        let source = label_of(labels, managed);

        // Inheritance edges
        if let Some(parent) = managed.supertype().and_then(|id| model.get(id)) {
            edges.push((source.clone(), label_of(labels, parent), "inherits".into()));
        }

        // Only declared attributes: inherited ones are drawn on the ancestor.
        for attribute in managed.declared_attributes() {
            let Some(target) = model.target_type(attribute) else {
                continue;
            };
            let relation = match attribute.category() {
                AttributeCategory::Embedded => "embeds".to_string(),
                AttributeCategory::SingularAssociation { kind } => kind.to_string(),
                AttributeCategory::PluralAssociation { kind, .. } => kind.to_string(),
                AttributeCategory::Basic => continue,
            };
            edges.push((source.clone(), label_of(labels, target), relation));
        }
    }

    edges
}

fn render_mermaid(nodes: &BTreeSet<String>, edges: &[Edge]) -> String {
    let mut lines = vec!["graph LR".to_string()];

    let mut referenced: BTreeSet<&str> = BTreeSet::new();
    for (src, tgt, _) in edges {
        referenced.insert(src);
        referenced.insert(tgt);
    }

    // Isolated nodes
    for name in nodes {
        if !referenced.contains(name.as_str()) {
            lines.push(format!("    {name}"));
        }
    }

    for (src, tgt, rel) in edges {
        let arrow = if rel == "inherits" { "-.->" } else { "-->" };
        lines.push(format!("    {src} {arrow}|{rel}| {tgt}"));
    }

    lines.push(format!("%% {} nodes, {} edges", nodes.len(), edges.len()));

    lines.join("\n")
}

fn render_dot(nodes: &BTreeSet<String>, edges: &[Edge]) -> String {
    let mut lines = vec![
        "digraph Metamodel {".to_string(),
        "    rankdir=LR;".to_string(),
        "    node [shape=box, style=filled, fillcolor=lightyellow];".to_string(),
    ];

    for name in nodes {
        lines.push(format!("    \"{name}\";"));
    }

    let edge_styles: HashMap<&str, &str> = HashMap::from([
        ("inherits", "style=dashed, color=blue"),
        ("embeds", "color=black"),
        ("many-to-one", "color=red"),
        ("one-to-one", "color=red"),
        ("one-to-many", "color=green"),
        ("many-to-many", "color=green"),
    ]);

    for (src, tgt, rel) in edges {
        let style = edge_styles.get(rel.as_str()).unwrap_or(&"color=gray");
        lines.push(format!(
            "    \"{src}\" -> \"{tgt}\" [label=\"{rel}\", {style}];",
        ));
    }

    lines.push("}".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormodel_core::{
        AttributesMetadata, BuildOptions, ManagedTypeMetadata, SingularAssociationMetadata,
        SourceLocation, TypeKind,
    };

    fn model() -> Metamodel {
        let base = ManagedTypeMetadata {
            class_name: "app.Base".into(),
            kind: TypeKind::MappedSuperclass,
            superclass: None,
            loc: SourceLocation::default(),
            attributes: AttributesMetadata::default(),
            metadata_complete: false,
        };
        let node = ManagedTypeMetadata {
            class_name: "app.Node".into(),
            kind: TypeKind::Entity,
            superclass: Some("app.Base".into()),
            loc: SourceLocation::default(),
            attributes: AttributesMetadata {
                many_to_ones: vec![SingularAssociationMetadata {
                    name: "parent".into(),
                    java_type: "app.Node".into(),
                    target_entity: None,
                    loc: SourceLocation::default(),
                    optional: true,
                    fetch: None,
                    cascades: vec![],
                    mapped_by: None,
                }],
                ..Default::default()
            },
            metadata_complete: false,
        };
        Metamodel::build(&[base, node], &BuildOptions::default()).unwrap()
    }

    #[test]
    fn edges_cover_inheritance_and_associations() {
        let model = model();
        let mut edges = collect_edges(&model, &node_labels(&model));
        edges.sort();
        assert_eq!(
            edges,
            vec![
                ("Node".to_string(), "Base".to_string(), "inherits".to_string()),
                ("Node".to_string(), "Node".to_string(), "many-to-one".to_string()),
            ]
        );
    }

    #[test]
    fn mermaid_marks_inheritance_dashed() {
        let nodes: BTreeSet<String> = ["Base".to_string(), "Node".to_string()].into();
        let model = model();
        let out = render_mermaid(&nodes, &collect_edges(&model, &node_labels(&model)));
        assert!(out.starts_with("graph LR"));
        assert!(out.contains("Node -.->|inherits| Base"));
        assert!(out.contains("%% 2 nodes, 2 edges"));
    }

    #[test]
    fn shared_simple_names_fall_back_to_class_names() {
        let item = |class: &str| ManagedTypeMetadata {
            class_name: class.into(),
            kind: TypeKind::Entity,
            superclass: None,
            loc: SourceLocation::default(),
            attributes: AttributesMetadata::default(),
            metadata_complete: false,
        };
        let mut order = item("com.acme.Order");
        order.attributes.many_to_ones.push(SingularAssociationMetadata {
            name: "item".into(),
            java_type: "com.other.Item".into(),
            target_entity: None,
            loc: SourceLocation::default(),
            optional: true,
            fetch: None,
            cascades: vec![],
            mapped_by: None,
        });
        let model = Metamodel::build(
            &[order, item("com.acme.Item"), item("com.other.Item")],
            &BuildOptions::default(),
        )
        .unwrap();

        let labels = node_labels(&model);
        let mut names: Vec<&str> = labels.values().map(String::as_str).collect();
        names.sort();
        assert_eq!(names, vec!["Order", "com.acme.Item", "com.other.Item"]);

        let edges = collect_edges(&model, &labels);
        assert_eq!(
            edges,
            vec![(
                "Order".to_string(),
                "com.other.Item".to_string(),
                "many-to-one".to_string()
            )]
        );
    }
}
