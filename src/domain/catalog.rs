//! The catalog aggregate: four tables and the rules that tie them together.
//!
//! Every mutating operation either applies completely or returns an error
//! and leaves the tables untouched. Cross-operation atomicity (the product
//! plus detail save) is provided one level up by the store's transactions.

use super::errors::{CatalogError, CatalogResult, EntityKind};
use super::models::{
    Category, CategoryDraft, CategoryId, DetailDraft, DetailId, Product, ProductDetail,
    ProductDraft, ProductId, ProductWithDetail, Tag, TagDraft, TagId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Records that know their own primary key.
pub trait Record {
    type Key: Ord + Copy;

    fn key(&self) -> Self::Key;
}

impl Record for Category {
    type Key = CategoryId;

    fn key(&self) -> CategoryId {
        self.id
    }
}

impl Record for Tag {
    type Key = TagId;

    fn key(&self) -> TagId {
        self.id
    }
}

impl Record for Product {
    type Key = ProductId;

    fn key(&self) -> ProductId {
        self.id
    }
}

impl Record for ProductDetail {
    type Key = DetailId;

    fn key(&self) -> DetailId {
        self.id
    }
}

/// Next free id per table. Ids are never reused, so id order is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct IdSequence {
    category: u64,
    tag: u64,
    product: u64,
    detail: u64,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self {
            category: 1,
            tag: 1,
            product: 1,
            detail: 1,
        }
    }
}

fn take(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter += 1;
    id
}

/// What a delete removed besides the record itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Products deleted along with their category.
    pub products: Vec<ProductId>,
    /// Details deleted along with their product.
    pub details: Vec<DetailId>,
    /// Products that lost a tag link but were kept.
    pub unlinked_products: Vec<ProductId>,
}

/// Listing filter matching the admin sidebar filters and search box.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<CategoryId>,
    pub tag: Option<TagId>,
    /// Case-insensitive substring of name or description.
    pub text: Option<String>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category {
            if product.category_id != category {
                return false;
            }
        }
        if let Some(tag) = self.tag {
            if !product.tag_ids.contains(&tag) {
                return false;
            }
        }
        match self.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let needle = text.to_lowercase();
                product.name.to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CatalogSnapshot")]
pub struct Catalog {
    #[serde(serialize_with = "serialize_table")]
    categories: BTreeMap<CategoryId, Category>,
    #[serde(serialize_with = "serialize_table")]
    tags: BTreeMap<TagId, Tag>,
    #[serde(serialize_with = "serialize_table")]
    products: BTreeMap<ProductId, Product>,
    #[serde(serialize_with = "serialize_table")]
    details: BTreeMap<DetailId, ProductDetail>,
    next_ids: IdSequence,
}

/// Catalog as read from disk. A snapshot without `next_ids` continues
/// numbering after the highest stored id of each table.
#[derive(Deserialize)]
struct CatalogSnapshot {
    #[serde(deserialize_with = "deserialize_table")]
    categories: BTreeMap<CategoryId, Category>,
    #[serde(deserialize_with = "deserialize_table")]
    tags: BTreeMap<TagId, Tag>,
    #[serde(deserialize_with = "deserialize_table")]
    products: BTreeMap<ProductId, Product>,
    #[serde(deserialize_with = "deserialize_table")]
    details: BTreeMap<DetailId, ProductDetail>,
    next_ids: Option<IdSequence>,
}

fn after_last<K: Copy + Into<u64>, V>(table: &BTreeMap<K, V>) -> u64 {
    table.keys().next_back().map_or(1, |id| (*id).into() + 1)
}

impl From<CatalogSnapshot> for Catalog {
    fn from(snapshot: CatalogSnapshot) -> Self {
        let next_ids = snapshot.next_ids.unwrap_or_else(|| IdSequence {
            category: after_last(&snapshot.categories),
            tag: after_last(&snapshot.tags),
            product: after_last(&snapshot.products),
            detail: after_last(&snapshot.details),
        });
        Self {
            categories: snapshot.categories,
            tags: snapshot.tags,
            products: snapshot.products,
            details: snapshot.details,
            next_ids,
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && self.tags.is_empty()
            && self.products.is_empty()
            && self.details.is_empty()
    }

    // --- categories ---

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn category(&self, id: CategoryId) -> CatalogResult<&Category> {
        self.categories
            .get(&id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Category, id))
    }

    pub fn find_category_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.values().find(|c| c.name == name)
    }

    pub fn insert_category(&mut self, draft: CategoryDraft) -> CatalogResult<Category> {
        self.ensure_category_name_free(&draft.name, None)?;
        let id = CategoryId(take(&mut self.next_ids.category));
        let category = Category {
            id,
            name: draft.name,
        };
        self.categories.insert(id, category.clone());
        Ok(category)
    }

    pub fn update_category(&mut self, id: CategoryId, draft: CategoryDraft) -> CatalogResult<Category> {
        self.category(id)?;
        self.ensure_category_name_free(&draft.name, Some(id))?;
        let category = Category {
            id,
            name: draft.name,
        };
        self.categories.insert(id, category.clone());
        Ok(category)
    }

    /// Deletes the category, every product in it, and those products' details.
    pub fn delete_category(&mut self, id: CategoryId) -> CatalogResult<CascadeReport> {
        self.category(id)?;
        let mut report = CascadeReport::default();
        let doomed: Vec<ProductId> = self.products_in_category(id).map(|p| p.id).collect();
        for product_id in doomed {
            let removed = self.delete_product(product_id)?;
            report.products.push(product_id);
            report.details.extend(removed.details);
        }
        self.categories.remove(&id);
        Ok(report)
    }

    fn ensure_category_name_free(&self, name: &str, except: Option<CategoryId>) -> CatalogResult<()> {
        match self.find_category_by_name(name) {
            Some(existing) if Some(existing.id) != except => Err(CatalogError::ConstraintViolation(
                format!("category name '{}' is already used by category {}", name, existing.id),
            )),
            _ => Ok(()),
        }
    }

    // --- tags ---

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn tag(&self, id: TagId) -> CatalogResult<&Tag> {
        self.tags
            .get(&id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Tag, id))
    }

    pub fn find_tag_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags.values().find(|t| t.name == name)
    }

    pub fn insert_tag(&mut self, draft: TagDraft) -> CatalogResult<Tag> {
        self.ensure_tag_name_free(&draft.name, None)?;
        let id = TagId(take(&mut self.next_ids.tag));
        let tag = Tag {
            id,
            name: draft.name,
        };
        self.tags.insert(id, tag.clone());
        Ok(tag)
    }

    pub fn update_tag(&mut self, id: TagId, draft: TagDraft) -> CatalogResult<Tag> {
        self.tag(id)?;
        self.ensure_tag_name_free(&draft.name, Some(id))?;
        let tag = Tag {
            id,
            name: draft.name,
        };
        self.tags.insert(id, tag.clone());
        Ok(tag)
    }

    /// Deletes the tag and unlinks it from every product. Products are kept.
    pub fn delete_tag(&mut self, id: TagId) -> CatalogResult<CascadeReport> {
        self.tag(id)?;
        let mut report = CascadeReport::default();
        for product in self.products.values_mut() {
            if product.tag_ids.remove(&id) {
                report.unlinked_products.push(product.id);
            }
        }
        self.tags.remove(&id);
        Ok(report)
    }

    fn ensure_tag_name_free(&self, name: &str, except: Option<TagId>) -> CatalogResult<()> {
        match self.find_tag_by_name(name) {
            Some(existing) if Some(existing.id) != except => Err(CatalogError::ConstraintViolation(
                format!("tag name '{}' is already used by tag {}", name, existing.id),
            )),
            _ => Ok(()),
        }
    }

    // --- products ---

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn product(&self, id: ProductId) -> CatalogResult<&Product> {
        self.products
            .get(&id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::Product, id))
    }

    pub fn products_in_category(&self, id: CategoryId) -> impl Iterator<Item = &Product> {
        self.products.values().filter(move |p| p.category_id == id)
    }

    pub fn products_with_tag(&self, id: TagId) -> impl Iterator<Item = &Product> {
        self.products.values().filter(move |p| p.tag_ids.contains(&id))
    }

    pub fn filter_products<'a>(&'a self, filter: &'a ProductFilter) -> impl Iterator<Item = &'a Product> {
        self.products.values().filter(move |p| filter.matches(p))
    }

    pub fn insert_product(&mut self, draft: ProductDraft) -> CatalogResult<Product> {
        self.ensure_product_references(&draft)?;
        let id = ProductId(take(&mut self.next_ids.product));
        let product = Product {
            id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            category_id: draft.category_id,
            tag_ids: draft.tag_ids,
        };
        self.products.insert(id, product.clone());
        Ok(product)
    }

    pub fn update_product(&mut self, id: ProductId, draft: ProductDraft) -> CatalogResult<Product> {
        self.product(id)?;
        self.ensure_product_references(&draft)?;
        let product = Product {
            id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            category_id: draft.category_id,
            tag_ids: draft.tag_ids,
        };
        self.products.insert(id, product.clone());
        Ok(product)
    }

    /// Deletes the product and its detail, if any.
    pub fn delete_product(&mut self, id: ProductId) -> CatalogResult<CascadeReport> {
        self.product(id)?;
        let mut report = CascadeReport::default();
        if let Some(detail_id) = self.detail_for(id).map(|d| d.id) {
            self.details.remove(&detail_id);
            report.details.push(detail_id);
        }
        self.products.remove(&id);
        Ok(report)
    }

    fn ensure_product_references(&self, draft: &ProductDraft) -> CatalogResult<()> {
        if !self.categories.contains_key(&draft.category_id) {
            return Err(CatalogError::ConstraintViolation(format!(
                "category {} does not exist",
                draft.category_id
            )));
        }
        if let Some(missing) = draft.tag_ids.iter().find(|t| !self.tags.contains_key(t)) {
            return Err(CatalogError::ConstraintViolation(format!(
                "tag {} does not exist",
                missing
            )));
        }
        Ok(())
    }

    // --- details ---

    pub fn details(&self) -> impl Iterator<Item = &ProductDetail> {
        self.details.values()
    }

    pub fn detail(&self, id: DetailId) -> CatalogResult<&ProductDetail> {
        self.details
            .get(&id)
            .ok_or_else(|| CatalogError::not_found(EntityKind::ProductDetail, id))
    }

    /// The product's detail. `None` is a normal state, not a lookup failure.
    pub fn detail_for(&self, product_id: ProductId) -> Option<&ProductDetail> {
        self.details.values().find(|d| d.product_id == product_id)
    }

    pub fn product_with_detail(&self, id: ProductId) -> CatalogResult<ProductWithDetail> {
        let product = self.product(id)?.clone();
        let detail = self.detail_for(id).cloned();
        Ok(ProductWithDetail { product, detail })
    }

    pub fn insert_detail(&mut self, product_id: ProductId, draft: DetailDraft) -> CatalogResult<ProductDetail> {
        if !self.products.contains_key(&product_id) {
            return Err(CatalogError::ConstraintViolation(format!(
                "product {} does not exist",
                product_id
            )));
        }
        if let Some(existing) = self.detail_for(product_id) {
            return Err(CatalogError::ConstraintViolation(format!(
                "product {} already has detail {}",
                product_id, existing.id
            )));
        }
        let id = DetailId(take(&mut self.next_ids.detail));
        let detail = ProductDetail {
            id,
            product_id,
            weight: draft.weight,
            dimensions: draft.dimensions,
            manufacture_date: draft.manufacture_date,
        };
        self.details.insert(id, detail.clone());
        Ok(detail)
    }

    /// Rewrites an existing detail. The detail must already belong to `product_id`.
    pub fn update_detail(
        &mut self,
        id: DetailId,
        product_id: ProductId,
        draft: DetailDraft,
    ) -> CatalogResult<ProductDetail> {
        let current = self.detail(id)?;
        if current.product_id != product_id {
            return Err(CatalogError::ConstraintViolation(format!(
                "detail {} belongs to product {}, not product {}",
                id, current.product_id, product_id
            )));
        }
        let detail = ProductDetail {
            id,
            product_id,
            weight: draft.weight,
            dimensions: draft.dimensions,
            manufacture_date: draft.manufacture_date,
        };
        self.details.insert(id, detail.clone());
        Ok(detail)
    }

    /// Checks the invariants a freshly loaded snapshot must satisfy.
    pub fn check_integrity(&self) -> CatalogResult<()> {
        let mut names = BTreeSet::new();
        for category in self.categories.values() {
            if !names.insert(category.name.as_str()) {
                return Err(CatalogError::ConstraintViolation(format!(
                    "duplicate category name '{}'",
                    category.name
                )));
            }
        }
        let mut names = BTreeSet::new();
        for tag in self.tags.values() {
            if !names.insert(tag.name.as_str()) {
                return Err(CatalogError::ConstraintViolation(format!(
                    "duplicate tag name '{}'",
                    tag.name
                )));
            }
        }
        for product in self.products.values() {
            if !self.categories.contains_key(&product.category_id) {
                return Err(CatalogError::ConstraintViolation(format!(
                    "product {} references missing category {}",
                    product.id, product.category_id
                )));
            }
            if let Some(tag) = product.tag_ids.iter().find(|t| !self.tags.contains_key(t)) {
                return Err(CatalogError::ConstraintViolation(format!(
                    "product {} references missing tag {}",
                    product.id, tag
                )));
            }
        }
        let mut owners = BTreeSet::new();
        for detail in self.details.values() {
            if !self.products.contains_key(&detail.product_id) {
                return Err(CatalogError::ConstraintViolation(format!(
                    "detail {} references missing product {}",
                    detail.id, detail.product_id
                )));
            }
            if !owners.insert(detail.product_id) {
                return Err(CatalogError::ConstraintViolation(format!(
                    "product {} has more than one detail",
                    detail.product_id
                )));
            }
        }

        let sequence_ok = self.categories.keys().all(|id| id.0 < self.next_ids.category)
            && self.tags.keys().all(|id| id.0 < self.next_ids.tag)
            && self.products.keys().all(|id| id.0 < self.next_ids.product)
            && self.details.keys().all(|id| id.0 < self.next_ids.detail);
        if !sequence_ok {
            return Err(CatalogError::ConstraintViolation(
                "id sequence is behind stored records".to_string(),
            ));
        }
        Ok(())
    }
}

fn serialize_table<S, T>(table: &BTreeMap<T::Key, T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: Record + Serialize,
{
    use serde::ser::SerializeSeq;
    let mut seq = serializer.serialize_seq(Some(table.len()))?;
    for record in table.values() {
        seq.serialize_element(record)?;
    }
    seq.end()
}

fn deserialize_table<'de, D, T>(deserializer: D) -> Result<BTreeMap<T::Key, T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Record + Deserialize<'de>,
{
    use serde::de::{Error, SeqAccess, Visitor};
    use std::fmt;
    use std::marker::PhantomData;

    struct TableVisitor<T>(PhantomData<T>);

    impl<'de, T> Visitor<'de> for TableVisitor<T>
    where
        T: Record + Deserialize<'de>,
    {
        type Value = BTreeMap<T::Key, T>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a sequence of records")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut table = BTreeMap::new();
            while let Some(record) = seq.next_element::<T>()? {
                if table.insert(record.key(), record).is_some() {
                    return Err(A::Error::custom("duplicate record id"));
                }
            }
            Ok(table)
        }
    }

    deserializer.deserialize_seq(TableVisitor(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Price, Weight};

    fn category(catalog: &mut Catalog, name: &str) -> Category {
        catalog
            .insert_category(CategoryDraft {
                name: name.to_string(),
            })
            .unwrap()
    }

    fn product(catalog: &mut Catalog, name: &str, category_id: CategoryId, price: &str) -> Product {
        catalog
            .insert_product(ProductDraft {
                name: name.to_string(),
                description: format!("{} description", name),
                price: price.parse::<Price>().unwrap(),
                category_id,
                tag_ids: BTreeSet::new(),
            })
            .unwrap()
    }

    fn detail_draft(weight: &str) -> DetailDraft {
        DetailDraft {
            weight: weight.parse::<Weight>().unwrap(),
            dimensions: "80x40x90".to_string(),
            manufacture_date: None,
        }
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let mut catalog = Catalog::new();
        let a = category(&mut catalog, "Zapatos");
        let b = category(&mut catalog, "Abrigos");

        let names: Vec<&str> = catalog.categories().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zapatos", "Abrigos"]);
        assert!(a.id < b.id);
    }

    #[test]
    fn test_ids_are_not_reused_after_delete() {
        let mut catalog = Catalog::new();
        let first = category(&mut catalog, "A");
        catalog.delete_category(first.id).unwrap();
        let second = category(&mut catalog, "B");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_duplicate_category_name_is_rejected() {
        let mut catalog = Catalog::new();
        category(&mut catalog, "Hogar");
        let before = catalog.clone();

        let result = catalog.insert_category(CategoryDraft {
            name: "Hogar".to_string(),
        });
        assert!(matches!(result, Err(CatalogError::ConstraintViolation(_))));
        assert_eq!(catalog, before);

        // Case-sensitive: a different spelling is a different name.
        assert!(
            catalog
                .insert_category(CategoryDraft {
                    name: "hogar".to_string()
                })
                .is_ok()
        );
    }

    #[test]
    fn test_rename_category_to_own_name_is_allowed() {
        let mut catalog = Catalog::new();
        let hogar = category(&mut catalog, "Hogar");
        let other = category(&mut catalog, "Jardin");

        assert!(
            catalog
                .update_category(hogar.id, CategoryDraft { name: "Hogar".to_string() })
                .is_ok()
        );
        assert!(matches!(
            catalog.update_category(other.id, CategoryDraft { name: "Hogar".to_string() }),
            Err(CatalogError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_duplicate_tag_name_is_rejected() {
        let mut catalog = Catalog::new();
        catalog.insert_tag(TagDraft { name: "oferta".to_string() }).unwrap();
        let before = catalog.clone();

        let result = catalog.insert_tag(TagDraft { name: "oferta".to_string() });
        assert!(matches!(result, Err(CatalogError::ConstraintViolation(_))));
        assert_eq!(catalog, before);
    }

    #[test]
    fn test_get_missing_records() {
        let catalog = Catalog::new();
        assert_eq!(
            catalog.product(ProductId(9)).unwrap_err(),
            CatalogError::NotFound {
                entity: EntityKind::Product,
                id: 9
            }
        );
        assert!(matches!(
            catalog.category(CategoryId(1)),
            Err(CatalogError::NotFound { entity: EntityKind::Category, .. })
        ));
        assert!(catalog.detail_for(ProductId(9)).is_none());
    }

    #[test]
    fn test_product_requires_existing_category_and_tags() {
        let mut catalog = Catalog::new();
        let result = catalog.insert_product(ProductDraft {
            name: "Silla".to_string(),
            description: "".to_string(),
            price: "45".parse().unwrap(),
            category_id: CategoryId(99),
            tag_ids: BTreeSet::new(),
        });
        assert!(matches!(result, Err(CatalogError::ConstraintViolation(_))));

        let hogar = category(&mut catalog, "Hogar");
        let result = catalog.insert_product(ProductDraft {
            name: "Silla".to_string(),
            description: "".to_string(),
            price: "45".parse().unwrap(),
            category_id: hogar.id,
            tag_ids: [TagId(5)].into_iter().collect(),
        });
        assert!(matches!(result, Err(CatalogError::ConstraintViolation(_))));
        assert_eq!(catalog.products().count(), 0);
    }

    #[test]
    fn test_delete_category_cascades_to_products_and_details() {
        let mut catalog = Catalog::new();
        let hogar = category(&mut catalog, "Hogar");
        let jardin = category(&mut catalog, "Jardin");

        let silla = product(&mut catalog, "Silla", hogar.id, "45.00");
        let mesa = product(&mut catalog, "Mesa", hogar.id, "120.00");
        let pala = product(&mut catalog, "Pala", jardin.id, "15.00");
        let silla_detail = catalog.insert_detail(silla.id, detail_draft("5.00")).unwrap();
        catalog.insert_detail(pala.id, detail_draft("1.20")).unwrap();

        let report = catalog.delete_category(hogar.id).unwrap();

        assert_eq!(report.products, vec![silla.id, mesa.id]);
        assert_eq!(report.details, vec![silla_detail.id]);
        assert!(catalog.category(hogar.id).is_err());
        assert_eq!(catalog.products_in_category(hogar.id).count(), 0);
        assert_eq!(catalog.products().count(), 1);
        assert_eq!(catalog.details().count(), 1);
        assert!(catalog.detail_for(pala.id).is_some());
    }

    #[test]
    fn test_delete_product_cascades_to_detail() {
        let mut catalog = Catalog::new();
        let hogar = category(&mut catalog, "Hogar");
        let silla = product(&mut catalog, "Silla", hogar.id, "45.00");
        let detail = catalog.insert_detail(silla.id, detail_draft("5.00")).unwrap();

        let report = catalog.delete_product(silla.id).unwrap();
        assert_eq!(report.details, vec![detail.id]);
        assert!(catalog.detail(detail.id).is_err());
    }

    #[test]
    fn test_delete_tag_unlinks_products() {
        let mut catalog = Catalog::new();
        let hogar = category(&mut catalog, "Hogar");
        let oferta = catalog.insert_tag(TagDraft { name: "oferta".to_string() }).unwrap();
        let silla = catalog
            .insert_product(ProductDraft {
                name: "Silla".to_string(),
                description: "Silla de madera".to_string(),
                price: "45".parse().unwrap(),
                category_id: hogar.id,
                tag_ids: [oferta.id].into_iter().collect(),
            })
            .unwrap();
        assert_eq!(catalog.products_with_tag(oferta.id).count(), 1);

        let report = catalog.delete_tag(oferta.id).unwrap();
        assert_eq!(report.unlinked_products, vec![silla.id]);
        assert!(catalog.product(silla.id).unwrap().tag_ids.is_empty());
    }

    #[test]
    fn test_one_detail_per_product() {
        let mut catalog = Catalog::new();
        let hogar = category(&mut catalog, "Hogar");
        let silla = product(&mut catalog, "Silla", hogar.id, "45.00");

        catalog.insert_detail(silla.id, detail_draft("5.00")).unwrap();
        assert!(matches!(
            catalog.insert_detail(silla.id, detail_draft("6.00")),
            Err(CatalogError::ConstraintViolation(_))
        ));
        assert!(matches!(
            catalog.insert_detail(ProductId(77), detail_draft("6.00")),
            Err(CatalogError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_update_detail_must_match_owner() {
        let mut catalog = Catalog::new();
        let hogar = category(&mut catalog, "Hogar");
        let silla = product(&mut catalog, "Silla", hogar.id, "45.00");
        let mesa = product(&mut catalog, "Mesa", hogar.id, "80.00");
        let detail = catalog.insert_detail(silla.id, detail_draft("5.00")).unwrap();

        assert!(matches!(
            catalog.update_detail(detail.id, mesa.id, detail_draft("7.00")),
            Err(CatalogError::ConstraintViolation(_))
        ));
        let updated = catalog
            .update_detail(detail.id, silla.id, detail_draft("7.00"))
            .unwrap();
        assert_eq!(updated.weight.to_string(), "7.00");
    }

    #[test]
    fn test_filter_products() {
        let mut catalog = Catalog::new();
        let hogar = category(&mut catalog, "Hogar");
        let jardin = category(&mut catalog, "Jardin");
        product(&mut catalog, "Silla", hogar.id, "45.00");
        product(&mut catalog, "Sillon", hogar.id, "300.00");
        product(&mut catalog, "Pala", jardin.id, "15.00");

        let filter = ProductFilter {
            text: Some("SILL".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(catalog.filter_products(&filter).count(), 2);

        let filter = ProductFilter {
            category: Some(jardin.id),
            ..ProductFilter::default()
        };
        let names: Vec<&str> = catalog.filter_products(&filter).map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Pala"]);

        // Description matches too.
        let filter = ProductFilter {
            text: Some("pala description".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(catalog.filter_products(&filter).count(), 1);

        let oferta = catalog.insert_tag(TagDraft { name: "oferta".to_string() }).unwrap();
        let sillon = catalog.products().find(|p| p.name == "Sillon").unwrap().clone();
        catalog
            .update_product(
                sillon.id,
                ProductDraft {
                    name: sillon.name.clone(),
                    description: sillon.description.clone(),
                    price: sillon.price,
                    category_id: sillon.category_id,
                    tag_ids: [oferta.id].into_iter().collect(),
                },
            )
            .unwrap();

        let filter = ProductFilter {
            tag: Some(oferta.id),
            ..ProductFilter::default()
        };
        let names: Vec<&str> = catalog.filter_products(&filter).map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Sillon"]);

        // Category and tag combine.
        let filter = ProductFilter {
            category: Some(jardin.id),
            tag: Some(oferta.id),
            ..ProductFilter::default()
        };
        assert_eq!(catalog.filter_products(&filter).count(), 0);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut catalog = Catalog::new();
        let hogar = category(&mut catalog, "Hogar");
        let silla = product(&mut catalog, "Silla", hogar.id, "19.99");
        catalog.insert_detail(silla.id, detail_draft("5.25")).unwrap();

        let json = serde_json::to_string(&catalog).unwrap();
        let loaded: Catalog = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded, catalog);
        assert_eq!(loaded.product(silla.id).unwrap().price.to_string(), "19.99");
        assert!(loaded.check_integrity().is_ok());
    }

    #[test]
    fn test_snapshot_with_duplicate_ids_is_rejected() {
        let json = r#"{
            "categories": [{"id": 1, "name": "A"}, {"id": 1, "name": "B"}],
            "tags": [], "products": [], "details": []
        }"#;
        assert!(serde_json::from_str::<Catalog>(json).is_err());
    }

    #[test]
    fn test_snapshot_without_id_sequence_continues_numbering() {
        let json = r#"{
            "categories": [{"id": 1, "name": "Hogar"}, {"id": 4, "name": "Jardin"}],
            "tags": [],
            "products": [
                {"id": 7, "name": "Pala", "description": "Pala", "price": "15.00", "category_id": 4}
            ],
            "details": []
        }"#;
        let mut catalog: Catalog = serde_json::from_str(json).unwrap();
        assert!(catalog.check_integrity().is_ok());

        let oficina = category(&mut catalog, "Oficina");
        assert_eq!(oficina.id, CategoryId(5));
        let tag = catalog.insert_tag(TagDraft { name: "oferta".to_string() }).unwrap();
        assert_eq!(tag.id, TagId(1));
        let lampara = product(&mut catalog, "Lampara", oficina.id, "20");
        assert_eq!(lampara.id, ProductId(8));
    }

    #[test]
    fn test_integrity_detects_dangling_detail() {
        let json = r#"{
            "categories": [],
            "tags": [],
            "products": [],
            "details": [{"id": 1, "product_id": 4, "weight": "1.00", "dimensions": "1x1"}],
            "next_ids": {"category": 1, "tag": 1, "product": 5, "detail": 2}
        }"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();
        assert!(matches!(
            catalog.check_integrity(),
            Err(CatalogError::ConstraintViolation(_))
        ));
    }
}
