use std::path::Path;

use ormodel_core::{Attribute, Metamodel};

use crate::build_model;

pub fn run_inspect(
    input_path: &Path,
    unit: Option<&str>,
    class: &str,
    declared_only: bool,
) -> Result<String, String> {
    let (_, model) = build_model(input_path, unit, false)?;
    let managed = model.resolve(class).map_err(|e| e.to_string())?;

    let mut lines: Vec<String> = Vec::new();

    let ancestors: Vec<&str> = model.ancestors(managed).map(|t| t.class_name()).collect();
    let mut header = format!("{} ({})", managed.class_name(), managed.kind().as_str());
    if !ancestors.is_empty() {
        header.push_str(&format!(" extends {}", ancestors.join(" → ")));
    }
    lines.push(header);

    let attributes: Vec<&Attribute> = if declared_only {
        managed.declared_attributes().collect()
    } else {
        managed.attributes().collect()
    };

    let name_width = attributes.iter().map(|a| a.name().len()).max().unwrap_or(0);
    let category_width = attributes
        .iter()
        .map(|a| a.category().to_string().len())
        .max()
        .unwrap_or(0);

    for attribute in &attributes {
        lines.push(format!(
            "  {:name_width$}  {:category_width$}{}",
            attribute.name(),
            attribute.category().to_string(),
            describe(&model, managed.id(), attribute),
        ));
    }

    let declared_count = managed.declared_attributes().count();
    let attr_word = if attributes.len() == 1 {
        "attribute"
    } else {
        "attributes"
    };
    lines.push(format!(
        "{} {attr_word} ({} declared, {} inherited).",
        attributes.len(),
        declared_count,
        managed.attribute_count() - declared_count
    ));

    Ok(lines.join("\n"))
}

fn describe(model: &Metamodel, owner: ormodel_core::TypeId, attribute: &Attribute) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(target) = model.target_type(attribute) {
        parts.push(format!("→ {}", target.class_name()));
    }
    if attribute.declaring_type() != owner {
        parts.push(format!(
            "(from {})",
            model.declaring_type(attribute).class_name()
        ));
    }
    if !attribute.persistence().nullable && !attribute.is_plural() {
        parts.push("not null".into());
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!("  {}", parts.join(" "))
    }
}
