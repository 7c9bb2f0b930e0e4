use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use super::models::ProductId;

/// The four record types held by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Category,
    Tag,
    Product,
    ProductDetail,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Category => "category",
            EntityKind::Tag => "tag",
            EntityKind::Product => "product",
            EntityKind::ProductDetail => "product detail",
        };
        f.write_str(label)
    }
}

/// Per-field validation messages, keyed by form field name.
///
/// Fields iterate in name order so rendering and test output are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of fields carrying at least one message.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fields in name order with their messages.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Folds another error set into this one. Messages for the same field are appended.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    /// Returns `Ok(value)` when no errors were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Errors produced by rejecting form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrors {
    /// A single form (category or tag) failed.
    Form(FieldErrors),
    /// The combined product and detail forms; either side may be empty.
    Dual {
        product: FieldErrors,
        detail: FieldErrors,
    },
}

impl ValidationErrors {
    /// All messages as one field-keyed map. Product and detail forms use disjoint field names.
    pub fn flatten(&self) -> FieldErrors {
        match self {
            ValidationErrors::Form(errors) => errors.clone(),
            ValidationErrors::Dual { product, detail } => {
                let mut merged = product.clone();
                merged.merge(detail.clone());
                merged
            }
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationErrors::Form(errors) => write!(f, "{}", errors),
            ValidationErrors::Dual { product, detail } => {
                match (product.is_empty(), detail.is_empty()) {
                    (false, false) => write!(f, "product: {}; detail: {}", product, detail),
                    (false, true) => write!(f, "product: {}", product),
                    (true, false) => write!(f, "detail: {}", detail),
                    (true, true) => write!(f, "no errors"),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: u64 },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The detail half of a product save failed after the product half was written.
    /// Both writes share a transaction, so the store has already been rolled back.
    #[error("detail write for product {product_id} failed, changes rolled back: {source}")]
    PartialWrite {
        product_id: ProductId,
        #[source]
        source: Box<CatalogError>,
    },

    #[error("not authorized to modify the catalog")]
    Unauthorized,

    #[error("storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    pub fn not_found(entity: EntityKind, id: impl Into<u64>) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Field errors to show inline in a form, if this is a validation failure.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            CatalogError::Validation(errors) => Some(errors.flatten()),
            _ => None,
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
