//! JSON-oriented API.
//!
//! String in, string out: metadata records and options arrive as JSON and
//! the built metamodel (or the failure) leaves as a JSON envelope.

use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, AttributeCategory, Persistence};
use crate::catalogs::MODEL_VERSION;
use crate::managed_type::ManagedType;
use crate::metamodel::Metamodel;
use crate::overlay::{merge_overlays, MappingFile};
use crate::types::*;

// ---------------------------------------------------------------------------
// Document types (serialized output)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDocument {
    pub name: String,
    #[serde(flatten)]
    pub category: AttributeCategory,
    pub declaring_type: String,
    pub java_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub persistence: Persistence,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedTypeDocument {
    pub class_name: String,
    pub simple_name: String,
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supertype: Option<String>,
    pub ancestors: Vec<String>,
    /// Names declared by this type itself; the rest of `attributes` is
    /// inherited.
    pub declared: Vec<String>,
    pub attributes: Vec<AttributeDocument>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetamodelDocument {
    pub model_version: String,
    pub types: Vec<ManagedTypeDocument>,
    pub warnings: Vec<Diagnostic>,
}

impl MetamodelDocument {
    /// Snapshot of `model`, types ordered by class name and attributes by
    /// name.
    pub fn from_model(model: &Metamodel) -> Self {
        let mut types: Vec<ManagedTypeDocument> = model
            .managed_types()
            .map(|t| describe_type(model, t))
            .collect();
        types.sort_by(|a, b| a.class_name.cmp(&b.class_name));

        Self {
            model_version: MODEL_VERSION.to_string(),
            types,
            warnings: model.warnings().to_vec(),
        }
    }
}

fn describe_type(model: &Metamodel, managed: &ManagedType) -> ManagedTypeDocument {
    ManagedTypeDocument {
        class_name: managed.class_name().to_string(),
        simple_name: managed.simple_name().to_string(),
        kind: managed.kind(),
        supertype: managed
            .supertype()
            .and_then(|id| model.get(id))
            .map(|t| t.class_name().to_string()),
        ancestors: model
            .ancestors(managed)
            .map(|t| t.class_name().to_string())
            .collect(),
        declared: managed
            .declared_attributes()
            .map(|a| a.name().to_string())
            .collect(),
        attributes: managed
            .attributes()
            .map(|a| describe_attribute(model, a))
            .collect(),
        loc: managed.loc().clone(),
    }
}

fn describe_attribute(model: &Metamodel, attribute: &Attribute) -> AttributeDocument {
    AttributeDocument {
        name: attribute.name().to_string(),
        category: attribute.category(),
        declaring_type: attribute.declaring_class().to_string(),
        java_type: attribute.java_type().to_string(),
        target: model
            .target_type(attribute)
            .map(|t| t.class_name().to_string()),
        persistence: attribute.persistence().clone(),
        loc: attribute.loc().clone(),
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct JsonResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}

impl<T: Serialize> JsonResult<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            diagnostic: None,
        }
    }
}

fn failure(error: String, diagnostic: Option<Diagnostic>) -> String {
    let result = JsonResult::<()> {
        success: false,
        data: None,
        error: Some(error),
        diagnostic,
    };
    serde_json::to_string(&result)
        .unwrap_or_else(|_| r#"{"success":false,"error":"JSON serialization error"}"#.to_string())
}

/// Parse `raw` as JSON, treating blank input as `T::default()`.
fn parse_or_default<T>(raw: &str, what: &str) -> Result<T, String>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(raw).map_err(|e| format!("Invalid {what} JSON: {e}"))
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Merge, build and serialize in one call.
///
/// Input: a JSON array of type metadata records, a JSON array of mapping
/// files (blank for none) and an options object (blank for defaults).
/// Output: `{ "success": true, "data": <MetamodelDocument> }` or
/// `{ "success": false, "error": "...", "diagnostic": {...} }`.
pub fn build_to_json(metadata_json: &str, overlays_json: &str, options_json: &str) -> String {
    let metadata: Vec<ManagedTypeMetadata> = match parse_or_default(metadata_json, "metadata") {
        Ok(m) => m,
        Err(e) => return failure(e, None),
    };
    let overlays: Vec<MappingFile> = match parse_or_default(overlays_json, "mapping file") {
        Ok(o) => o,
        Err(e) => return failure(e, None),
    };
    let options: BuildOptions = match parse_or_default(options_json, "options") {
        Ok(o) => o,
        Err(e) => return failure(e, None),
    };

    let merged = merge_overlays(metadata, &overlays);

    match Metamodel::build(&merged, &options) {
        Ok(model) => {
            let document = MetamodelDocument::from_model(&model);
            serde_json::to_string(&JsonResult::ok(document))
                .unwrap_or_else(|e| failure(format!("JSON serialization error: {e}"), None))
        }
        Err(e) => failure(e.to_string(), Some(e.to_diagnostic())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_inputs_build_an_empty_model() {
        let out = build_to_json("", "", "");
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["data"]["types"].as_array().unwrap().len(), 0);
        assert_eq!(v["data"]["modelVersion"], MODEL_VERSION);
    }

    #[test]
    fn malformed_options_are_reported() {
        let out = build_to_json("[]", "", "{not json");
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["success"], false);
        assert!(v["error"].as_str().unwrap().starts_with("Invalid options JSON"));
    }
}
