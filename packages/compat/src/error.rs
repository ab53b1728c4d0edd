//! Typed errors for compatibility storage and resolution.

use normalizer::ComponentType;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur in the compatibility service.
///
/// Every variant is a structured, user-presentable failure; callers map
/// these onto an `error` field rather than surfacing a panic.
#[derive(Debug, Error)]
pub enum CompatError {
    /// Storage backend failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// No compatibility record exists for the product
    #[error("no compatibility record for product {product_id}")]
    RecordNotFound { product_id: Uuid },

    /// The record exists but is the wrong kind of component
    #[error("product {product_id} is a {actual}, expected a {expected}")]
    WrongComponentType {
        product_id: Uuid,
        expected: ComponentType,
        actual: ComponentType,
    },

    /// Motherboard has no resolvable memory type; RAM compatibility
    /// without that anchor is too unreliable to default.
    #[error("motherboard {product_id} has no known memory type")]
    UnknownMemoryType { product_id: Uuid },

    /// Admin override names a field the component type does not carry
    #[error("field {field:?} is not overridable for {component_type}")]
    FieldNotAllowed {
        field: String,
        component_type: ComponentType,
    },

    /// Admin override value has the wrong shape for the field
    #[error("invalid value for field {field:?}")]
    InvalidFieldValue { field: String },
}

/// Result type alias for compatibility operations.
pub type Result<T> = std::result::Result<T, CompatError>;
