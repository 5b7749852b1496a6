pub mod attribute;
pub mod catalogs;
pub mod error;
pub mod json;
pub mod managed_type;
pub mod metamodel;
pub mod overlay;
pub mod types;

pub use attribute::{
    Attribute, AttributeCategory, AttributeMetadata, AttributeShape, CollectionShape, Persistence,
    PluralKind, SingularKind,
};
pub use catalogs::MODEL_VERSION;
pub use error::{LookupError, MetamodelError};
pub use json::{build_to_json, MetamodelDocument};
pub use managed_type::{ManagedType, TypeId};
pub use metamodel::{Ancestors, Metamodel};
pub use overlay::{merge_overlays, MappingFile};
pub use types::*;
