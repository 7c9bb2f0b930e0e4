//! Form validation for every catalog entity.
//!
//! Each validator takes raw text as the user typed it and returns either a
//! draft ready for the store or every problem found, keyed by field. None of
//! them mutate anything.

use super::catalog::Catalog;
use super::errors::FieldErrors;
use super::models::{
    CategoryDraft, CategoryId, DetailDraft, Fixed, Product, ProductDetail, ProductDraft, TagDraft,
    TagId,
};
use chrono::NaiveDate;
use std::collections::BTreeSet;

pub const CATEGORY_NAME_MAX: usize = 100;
pub const TAG_NAME_MAX: usize = 50;
pub const PRODUCT_NAME_MAX: usize = 200;
pub const DIMENSIONS_MAX: usize = 100;

const REQUIRED: &str = "This field is required.";
const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
const INVALID_DATE: &str = "Enter a valid date.";
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryForm {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagForm {
    pub name: String,
}

/// Raw product input. `category` and each entry of `tags` may be a record
/// name or a numeric id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: String,
    pub tags: Vec<String>,
}

impl ProductForm {
    /// Prefills the form from a stored product, using names for references.
    pub fn from_product(product: &Product, catalog: &Catalog) -> Self {
        let category = catalog
            .category(product.category_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|_| product.category_id.to_string());
        let tags = product
            .tag_ids
            .iter()
            .map(|id| {
                catalog
                    .tag(*id)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|_| id.to_string())
            })
            .collect();
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            category,
            tags,
        }
    }
}

/// Raw detail input. An empty `manufacture_date` means no date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailForm {
    pub weight: String,
    pub dimensions: String,
    pub manufacture_date: String,
}

impl DetailForm {
    /// Prefills from the product's current detail; blank when it has none.
    pub fn from_detail(detail: Option<&ProductDetail>) -> Self {
        match detail {
            Some(detail) => Self {
                weight: detail.weight.to_string(),
                dimensions: detail.dimensions.clone(),
                manufacture_date: detail
                    .manufacture_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            },
            None => Self::default(),
        }
    }
}

pub fn validate_category(
    form: &CategoryForm,
    catalog: &Catalog,
    editing: Option<CategoryId>,
) -> Result<CategoryDraft, FieldErrors> {
    let mut errors = FieldErrors::new();
    let name = required_text(&mut errors, "name", &form.name, CATEGORY_NAME_MAX);
    if let Some(name) = &name {
        if let Some(existing) = catalog.find_category_by_name(name) {
            if Some(existing.id) != editing {
                errors.add("name", "Category with this Name already exists.");
            }
        }
    }
    let name = name.unwrap_or_default();
    errors.into_result(CategoryDraft { name })
}

pub fn validate_tag(
    form: &TagForm,
    catalog: &Catalog,
    editing: Option<TagId>,
) -> Result<TagDraft, FieldErrors> {
    let mut errors = FieldErrors::new();
    let name = required_text(&mut errors, "name", &form.name, TAG_NAME_MAX);
    if let Some(name) = &name {
        if let Some(existing) = catalog.find_tag_by_name(name) {
            if Some(existing.id) != editing {
                errors.add("name", "Tag with this Name already exists.");
            }
        }
    }
    let name = name.unwrap_or_default();
    errors.into_result(TagDraft { name })
}

pub fn validate_product(form: &ProductForm, catalog: &Catalog) -> Result<ProductDraft, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = required_text(&mut errors, "name", &form.name, PRODUCT_NAME_MAX);
    let description = required_text(&mut errors, "description", &form.description, usize::MAX);
    let price = fixed_point::<10, 2>(&mut errors, "price", &form.price);

    let category_id = match form.category.trim() {
        "" => {
            errors.add("category", REQUIRED);
            None
        }
        reference => {
            let resolved = resolve_category(catalog, reference);
            if resolved.is_none() {
                errors.add("category", INVALID_CHOICE);
            }
            resolved
        }
    };

    let mut tag_ids = BTreeSet::new();
    for reference in form.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        match resolve_tag(catalog, reference) {
            Some(id) => {
                tag_ids.insert(id);
            }
            None => errors.add(
                "tags",
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    reference
                ),
            ),
        }
    }

    match (name, description, price, category_id) {
        (Some(name), Some(description), Some(price), Some(category_id)) if errors.is_empty() => {
            Ok(ProductDraft {
                name,
                description,
                price,
                category_id,
                tag_ids,
            })
        }
        _ => Err(errors),
    }
}

pub fn validate_detail(form: &DetailForm) -> Result<DetailDraft, FieldErrors> {
    let mut errors = FieldErrors::new();

    let weight = fixed_point::<5, 2>(&mut errors, "weight", &form.weight);
    let dimensions = required_text(&mut errors, "dimensions", &form.dimensions, DIMENSIONS_MAX);

    let manufacture_date = match form.manufacture_date.trim() {
        "" => None,
        raw => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                errors.add("manufacture_date", INVALID_DATE);
            }
            parsed
        }
    };

    match (weight, dimensions) {
        (Some(weight), Some(dimensions)) if errors.is_empty() => Ok(DetailDraft {
            weight,
            dimensions,
            manufacture_date,
        }),
        _ => Err(errors),
    }
}

/// Name match first, then numeric id.
pub fn resolve_category(catalog: &Catalog, reference: &str) -> Option<CategoryId> {
    if let Some(category) = catalog.find_category_by_name(reference) {
        return Some(category.id);
    }
    let id = CategoryId(reference.parse().ok()?);
    catalog.category(id).ok().map(|c| c.id)
}

pub fn resolve_tag(catalog: &Catalog, reference: &str) -> Option<TagId> {
    if let Some(tag) = catalog.find_tag_by_name(reference) {
        return Some(tag.id);
    }
    let id = TagId(reference.parse().ok()?);
    catalog.tag(id).ok().map(|t| t.id)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

fn required_text(errors: &mut FieldErrors, field: &str, raw: &str, max: usize) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    let length = value.chars().count();
    if length > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, length
            ),
        );
        return None;
    }
    Some(value.to_string())
}

fn fixed_point<const DIGITS: u32, const PLACES: u32>(
    errors: &mut FieldErrors,
    field: &str,
    raw: &str,
) -> Option<Fixed<DIGITS, PLACES>> {
    if raw.trim().is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            errors.add(field, err.to_string());
            None
        }
    }
}
