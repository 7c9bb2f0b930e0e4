//! Write workflows over the catalog store.
//!
//! [`CatalogService`] is the single entry point for anything that changes the
//! catalog: it checks permission, validates raw form input, and performs the
//! writes inside one store transaction. The product save is the only
//! multi-record write and is driven by [`DualSave`].

use crate::domain::{
    CascadeReport, Catalog, CatalogError, CatalogResult, Category, CategoryForm, CategoryId,
    DetailForm, DetailId, FieldErrors, Product, ProductFilter, ProductForm, ProductId,
    ProductWithDetail, Report, ReportSettings, Tag, TagForm, TagId, ValidationErrors,
    validate_category, validate_detail, validate_product, validate_tag,
};
use crate::infrastructure::CatalogStore;
use tracing::{debug, info, warn};

/// Where a product save is in its lifecycle.
///
/// `Received → Validating → {Rejected | Writing} → {Committed | RolledBack}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Received,
    Validating,
    /// Input failed validation or could not be checked; nothing was written.
    Rejected,
    Writing,
    Committed,
    /// A write failed inside the transaction; the store is unchanged.
    RolledBack,
}

impl SaveState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SaveState::Rejected | SaveState::Committed | SaveState::RolledBack
        )
    }
}

/// Which product a save targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    Create,
    /// `current_detail` is the product's existing detail, if it has one.
    Update {
        product_id: ProductId,
        current_detail: Option<DetailId>,
    },
}

/// One product + detail save. Both records are written in a single
/// transaction, product first so the detail can point at its id.
#[derive(Debug)]
pub struct DualSave<'a> {
    store: &'a CatalogStore,
    state: SaveState,
}

impl<'a> DualSave<'a> {
    pub fn new(store: &'a CatalogStore) -> Self {
        Self {
            store,
            state: SaveState::Received,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    fn advance(&mut self, next: SaveState) {
        debug!(from = ?self.state, to = ?next, "product save");
        self.state = next;
    }

    pub fn run(
        &mut self,
        target: SaveTarget,
        product_form: &ProductForm,
        detail_form: &DetailForm,
    ) -> CatalogResult<ProductWithDetail> {
        self.advance(SaveState::Validating);
        let validated = self.store.read(|catalog| {
            (
                validate_product(product_form, catalog),
                validate_detail(detail_form),
            )
        });
        let (product, detail) = match validated {
            Ok(results) => results,
            Err(err) => {
                self.advance(SaveState::Rejected);
                warn!(error = %err, "product save rejected, catalog unreadable");
                return Err(err);
            }
        };

        let (product_draft, detail_draft) = match (product, detail) {
            (Ok(product), Ok(detail)) => (product, detail),
            (product, detail) => {
                self.advance(SaveState::Rejected);
                let errors = ValidationErrors::Dual {
                    product: product.err().unwrap_or_else(FieldErrors::new),
                    detail: detail.err().unwrap_or_else(FieldErrors::new),
                };
                return Err(CatalogError::Validation(errors));
            }
        };

        self.advance(SaveState::Writing);
        let result = self.store.transaction(|tx| {
            let product = match target {
                SaveTarget::Create => tx.insert_product(product_draft)?,
                SaveTarget::Update { product_id, .. } => {
                    tx.update_product(product_id, product_draft)?
                }
            };

            let current_detail = match target {
                SaveTarget::Create => None,
                SaveTarget::Update { current_detail, .. } => current_detail,
            };
            let detail = match current_detail {
                None => tx.insert_detail(product.id, detail_draft),
                Some(detail_id) => tx.update_detail(detail_id, product.id, detail_draft),
            }
            .map_err(|source| CatalogError::PartialWrite {
                product_id: product.id,
                source: Box::new(source),
            })?;

            Ok(ProductWithDetail {
                product,
                detail: Some(detail),
            })
        });

        match &result {
            Ok(saved) => {
                self.advance(SaveState::Committed);
                info!(product = %saved.product.id, name = %saved.product.name, "product saved");
            }
            Err(err) => {
                self.advance(SaveState::RolledBack);
                warn!(error = %err, "product save rolled back");
            }
        }
        result
    }
}

/// Permission-checked catalog operations.
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: CatalogStore,
    authorized: bool,
}

impl CatalogService {
    pub fn new(store: CatalogStore, authorized: bool) -> Self {
        Self { store, authorized }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    fn ensure_authorized(&self) -> CatalogResult<()> {
        if self.authorized {
            Ok(())
        } else {
            warn!("write attempted without authorization");
            Err(CatalogError::Unauthorized)
        }
    }

    // --- reads ---

    pub fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        self.store.read(|c| c.categories().cloned().collect())
    }

    pub fn list_tags(&self) -> CatalogResult<Vec<Tag>> {
        self.store.read(|c| c.tags().cloned().collect())
    }

    pub fn list_products(&self) -> CatalogResult<Vec<Product>> {
        self.store.read(|c| c.products().cloned().collect())
    }

    pub fn filter_products(&self, filter: &ProductFilter) -> CatalogResult<Vec<Product>> {
        self.store
            .read(|c| c.filter_products(filter).cloned().collect())
    }

    pub fn product_with_detail(&self, id: ProductId) -> CatalogResult<ProductWithDetail> {
        self.ensure_authorized()?;
        self.store.read(|c| c.product_with_detail(id))?
    }

    pub fn report(&self, settings: &ReportSettings) -> CatalogResult<Report> {
        self.ensure_authorized()?;
        self.store.read(|c| Report::build(c, settings))
    }

    /// Runs `f` against the current catalog; used to prefill edit forms.
    pub fn with_catalog<R>(&self, f: impl FnOnce(&Catalog) -> R) -> CatalogResult<R> {
        self.store.read(f)
    }

    // --- categories ---

    pub fn create_category(&self, form: &CategoryForm) -> CatalogResult<Category> {
        self.ensure_authorized()?;
        let category = self.store.transaction(|tx| {
            let draft = validate_category(form, tx, None).map_err(form_error)?;
            tx.insert_category(draft)
        })?;
        info!(id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub fn update_category(&self, id: CategoryId, form: &CategoryForm) -> CatalogResult<Category> {
        self.ensure_authorized()?;
        let category = self.store.transaction(|tx| {
            tx.category(id)?;
            let draft = validate_category(form, tx, Some(id)).map_err(form_error)?;
            tx.update_category(id, draft)
        })?;
        info!(id = %category.id, name = %category.name, "category updated");
        Ok(category)
    }

    /// Deletes the category together with its products and their details.
    pub fn delete_category(&self, id: CategoryId) -> CatalogResult<CascadeReport> {
        self.ensure_authorized()?;
        let report = self.store.transaction(|tx| tx.delete_category(id))?;
        info!(
            id = %id,
            products = report.products.len(),
            details = report.details.len(),
            "category deleted"
        );
        Ok(report)
    }

    // --- tags ---

    pub fn create_tag(&self, form: &TagForm) -> CatalogResult<Tag> {
        self.ensure_authorized()?;
        let tag = self.store.transaction(|tx| {
            let draft = validate_tag(form, tx, None).map_err(form_error)?;
            tx.insert_tag(draft)
        })?;
        info!(id = %tag.id, name = %tag.name, "tag created");
        Ok(tag)
    }

    pub fn update_tag(&self, id: TagId, form: &TagForm) -> CatalogResult<Tag> {
        self.ensure_authorized()?;
        let tag = self.store.transaction(|tx| {
            tx.tag(id)?;
            let draft = validate_tag(form, tx, Some(id)).map_err(form_error)?;
            tx.update_tag(id, draft)
        })?;
        info!(id = %tag.id, name = %tag.name, "tag updated");
        Ok(tag)
    }

    pub fn delete_tag(&self, id: TagId) -> CatalogResult<CascadeReport> {
        self.ensure_authorized()?;
        let report = self.store.transaction(|tx| tx.delete_tag(id))?;
        info!(id = %id, unlinked = report.unlinked_products.len(), "tag deleted");
        Ok(report)
    }

    // --- products ---

    pub fn create_product(
        &self,
        product_form: &ProductForm,
        detail_form: &DetailForm,
    ) -> CatalogResult<ProductWithDetail> {
        self.ensure_authorized()?;
        DualSave::new(&self.store).run(SaveTarget::Create, product_form, detail_form)
    }

    /// Saves both forms over an existing product. When the product has no
    /// detail yet, pass `None` and one is created.
    pub fn update_product(
        &self,
        product_id: ProductId,
        product_form: &ProductForm,
        detail_form: &DetailForm,
        current_detail: Option<DetailId>,
    ) -> CatalogResult<ProductWithDetail> {
        self.ensure_authorized()?;
        let target = SaveTarget::Update {
            product_id,
            current_detail,
        };
        DualSave::new(&self.store).run(target, product_form, detail_form)
    }

    pub fn delete_product(&self, id: ProductId) -> CatalogResult<CascadeReport> {
        self.ensure_authorized()?;
        let report = self.store.transaction(|tx| tx.delete_product(id))?;
        info!(id = %id, details = report.details.len(), "product deleted");
        Ok(report)
    }
}

fn form_error(errors: FieldErrors) -> CatalogError {
    CatalogError::Validation(ValidationErrors::Form(errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryDraft, EntityKind, ProductDraft};
    use std::collections::BTreeSet;

    fn service() -> CatalogService {
        CatalogService::new(CatalogStore::default(), true)
    }

    fn category_form(name: &str) -> CategoryForm {
        CategoryForm {
            name: name.to_string(),
        }
    }

    fn product_form(name: &str, price: &str) -> ProductForm {
        ProductForm {
            name: name.to_string(),
            description: format!("{} de madera", name),
            price: price.to_string(),
            category: "Hogar".to_string(),
            tags: vec![],
        }
    }

    fn detail_form(weight: &str) -> DetailForm {
        DetailForm {
            weight: weight.to_string(),
            dimensions: "80x40x90".to_string(),
            manufacture_date: String::new(),
        }
    }

    #[test]
    fn test_create_product_links_detail() {
        let service = service();
        service.create_category(&category_form("Hogar")).unwrap();

        let saved = service
            .create_product(&product_form("Silla", "45.00"), &detail_form("5.00"))
            .unwrap();

        let detail = saved.detail.unwrap();
        assert_eq!(detail.product_id, saved.product.id);
        let stored = service.product_with_detail(saved.product.id).unwrap();
        assert_eq!(stored.detail, Some(detail));
    }

    #[test]
    fn test_invalid_detail_blocks_product_write() {
        let service = service();
        service.create_category(&category_form("Hogar")).unwrap();
        let before = service.store().snapshot().unwrap();

        let store = service.store().clone();
        let mut save = DualSave::new(&store);
        let err = save
            .run(
                SaveTarget::Create,
                &product_form("Silla", "45.00"),
                &detail_form("abc"),
            )
            .unwrap_err();

        assert_eq!(save.state(), SaveState::Rejected);
        match err {
            CatalogError::Validation(ValidationErrors::Dual { product, detail }) => {
                assert!(product.is_empty());
                assert_eq!(detail.get("weight"), &["Enter a number.".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(service.store().snapshot().unwrap(), before);
    }

    #[test]
    fn test_both_forms_report_errors() {
        let service = service();
        let err = service
            .create_product(&product_form("", "1"), &detail_form(""))
            .unwrap_err();

        let fields = err.field_errors().unwrap();
        assert!(fields.has("name"));
        assert!(fields.has("category"));
        assert!(fields.has("weight"));
        assert_eq!(service.list_products().unwrap().len(), 0);
    }

    #[test]
    fn test_edit_price_keeps_detail() {
        let service = service();
        service.create_category(&category_form("Hogar")).unwrap();
        let saved = service
            .create_product(&product_form("Silla", "45.00"), &detail_form("5.00"))
            .unwrap();
        let original_detail = saved.detail.clone().unwrap();

        let (product_form, detail_form) = service
            .with_catalog(|catalog| {
                let current = catalog.product_with_detail(saved.product.id).unwrap();
                (
                    ProductForm::from_product(&current.product, catalog),
                    DetailForm::from_detail(current.detail.as_ref()),
                )
            })
            .unwrap();
        let product_form = ProductForm {
            price: "55.00".to_string(),
            ..product_form
        };

        let updated = service
            .update_product(
                saved.product.id,
                &product_form,
                &detail_form,
                Some(original_detail.id),
            )
            .unwrap();

        assert_eq!(updated.product.price.to_string(), "55.00");
        assert_eq!(updated.detail, Some(original_detail));
        assert_eq!(service.store().read(|c| c.details().count()).unwrap(), 1);
    }

    #[test]
    fn test_edit_product_without_detail_creates_one() {
        let service = service();
        let hogar = service.create_category(&category_form("Hogar")).unwrap();
        // A product created outside the combined form has no detail.
        let bare = service
            .store()
            .transaction(|tx| {
                tx.insert_product(ProductDraft {
                    name: "Mesa".to_string(),
                    description: "Mesa baja".to_string(),
                    price: "80".parse().unwrap(),
                    category_id: hogar.id,
                    tag_ids: BTreeSet::new(),
                })
            })
            .unwrap();
        assert!(service.product_with_detail(bare.id).unwrap().detail.is_none());

        let updated = service
            .update_product(bare.id, &product_form("Mesa", "80"), &detail_form("12.5"), None)
            .unwrap();

        let detail = updated.detail.unwrap();
        assert_eq!(detail.product_id, bare.id);
        assert_eq!(detail.weight.to_string(), "12.50");
    }

    #[test]
    fn test_failed_detail_write_rolls_back_product() {
        let service = service();
        service.create_category(&category_form("Hogar")).unwrap();
        let silla = service
            .create_product(&product_form("Silla", "45.00"), &detail_form("5.00"))
            .unwrap();
        let before = service.store().snapshot().unwrap();

        // Claiming "no detail" for a product that has one breaks the one-to-one rule.
        let store = service.store().clone();
        let mut save = DualSave::new(&store);
        let err = save
            .run(
                SaveTarget::Update {
                    product_id: silla.product.id,
                    current_detail: None,
                },
                &product_form("Silla", "99.00"),
                &detail_form("5.00"),
            )
            .unwrap_err();

        assert_eq!(save.state(), SaveState::RolledBack);
        match err {
            CatalogError::PartialWrite { product_id, source } => {
                assert_eq!(product_id, silla.product.id);
                assert!(matches!(*source, CatalogError::ConstraintViolation(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let after = service.store().snapshot().unwrap();
        assert_eq!(after, before);
        assert_eq!(after.product(silla.product.id).unwrap().price.to_string(), "45.00");
    }

    #[test]
    fn test_update_missing_product() {
        let service = service();
        service.create_category(&category_form("Hogar")).unwrap();

        let err = service
            .update_product(ProductId(40), &product_form("Silla", "1"), &detail_form("1"), None)
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::NotFound {
                entity: EntityKind::Product,
                id: 40
            }
        );
    }

    #[test]
    fn test_committed_state() {
        let service = service();
        service.create_category(&category_form("Hogar")).unwrap();

        let mut save = DualSave::new(service.store());
        assert_eq!(save.state(), SaveState::Received);
        save.run(SaveTarget::Create, &product_form("Silla", "45"), &detail_form("5"))
            .unwrap();
        assert_eq!(save.state(), SaveState::Committed);
        assert!(save.state().is_terminal());
    }

    #[test]
    fn test_unreadable_store_rejects_save() {
        let service = service();
        service.create_category(&category_form("Hogar")).unwrap();

        // A writer panicking mid-transaction poisons the lock.
        let store = service.store().clone();
        let crashed = std::thread::spawn(move || {
            let _ = store.transaction(|_tx| -> CatalogResult<()> { panic!("writer crashed") });
        })
        .join();
        assert!(crashed.is_err());

        let mut save = DualSave::new(service.store());
        let err = save
            .run(SaveTarget::Create, &product_form("Silla", "45"), &detail_form("5"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Storage(_)));
        assert_eq!(save.state(), SaveState::Rejected);
        assert!(save.state().is_terminal());
    }

    #[test]
    fn test_category_uniqueness_through_service() {
        let service = service();
        service.create_category(&category_form("Hogar")).unwrap();

        let err = service.create_category(&category_form("Hogar")).unwrap_err();
        let fields = err.field_errors().unwrap();
        assert_eq!(
            fields.get("name"),
            &["Category with this Name already exists.".to_string()]
        );
        assert_eq!(service.list_categories().unwrap().len(), 1);
    }

    #[test]
    fn test_update_category_and_tag() {
        let service = service();
        let hogar = service.create_category(&category_form("Hogar")).unwrap();
        let renamed = service
            .update_category(hogar.id, &category_form("Casa"))
            .unwrap();
        assert_eq!(renamed.name, "Casa");

        let tag = service.create_tag(&TagForm { name: "oferta".to_string() }).unwrap();
        let renamed = service
            .update_tag(tag.id, &TagForm { name: "rebaja".to_string() })
            .unwrap();
        assert_eq!(renamed.name, "rebaja");

        assert!(matches!(
            service.update_tag(TagId(99), &TagForm { name: "x".to_string() }),
            Err(CatalogError::NotFound { entity: EntityKind::Tag, .. })
        ));
    }

    #[test]
    fn test_delete_category_cascade_through_service() {
        let service = service();
        let hogar = service.create_category(&category_form("Hogar")).unwrap();
        service.create_category(&category_form("Jardin")).unwrap();
        for name in ["Silla", "Mesa", "Cama"] {
            service
                .create_product(&product_form(name, "10"), &detail_form("1"))
                .unwrap();
        }
        let pala = ProductForm {
            category: "Jardin".to_string(),
            ..product_form("Pala", "15")
        };
        service.create_product(&pala, &detail_form("2")).unwrap();

        let report = service.delete_category(hogar.id).unwrap();

        assert_eq!(report.products.len(), 3);
        assert_eq!(report.details.len(), 3);
        let remaining = service.list_products().unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().all(|p| p.category_id != hogar.id));
        assert_eq!(service.store().read(|c| c.details().count()).unwrap(), 1);
    }

    #[test]
    fn test_delete_tag_and_product() {
        let service = service();
        service.create_category(&category_form("Hogar")).unwrap();
        let tag = service.create_tag(&TagForm { name: "oferta".to_string() }).unwrap();
        let form = ProductForm {
            tags: vec!["oferta".to_string()],
            ..product_form("Silla", "45")
        };
        let silla = service.create_product(&form, &detail_form("5")).unwrap();

        let report = service.delete_tag(tag.id).unwrap();
        assert_eq!(report.unlinked_products, vec![silla.product.id]);

        let report = service.delete_product(silla.product.id).unwrap();
        assert_eq!(report.details.len(), 1);
        assert!(service.list_products().unwrap().is_empty());
    }

    #[test]
    fn test_read_only_service_rejects_writes() {
        let store = CatalogStore::default();
        store
            .transaction(|tx| tx.insert_category(CategoryDraft { name: "Hogar".to_string() }))
            .unwrap();
        let service = CatalogService::new(store, false);

        assert_eq!(
            service.create_category(&category_form("Jardin")),
            Err(CatalogError::Unauthorized)
        );
        assert_eq!(
            service.create_product(&product_form("Silla", "1"), &detail_form("1")),
            Err(CatalogError::Unauthorized)
        );
        assert_eq!(
            service.delete_category(CategoryId(1)),
            Err(CatalogError::Unauthorized)
        );
        assert!(service.report(&ReportSettings::default()).is_err());
        // Listing stays public.
        assert_eq!(service.list_categories().unwrap().len(), 1);
    }

    #[test]
    fn test_report_scenario() {
        let service = service();
        service.create_category(&category_form("Hogar")).unwrap();
        for (name, price) in [("Silla", "45.00"), ("Mesa", "55.00"), ("Cama", "60.00")] {
            service
                .create_product(&product_form(name, price), &detail_form("1"))
                .unwrap();
        }

        let report = service.report(&ReportSettings::default()).unwrap();
        let names: Vec<&str> = report.priced_above.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Mesa", "Cama"]);
        assert!(report.excluding_category.is_empty());
        assert_eq!(report.priced_below.len(), 1);
    }

    #[test]
    fn test_filter_products() {
        let service = service();
        service.create_category(&category_form("Hogar")).unwrap();
        service
            .create_product(&product_form("Silla", "45"), &detail_form("1"))
            .unwrap();
        service
            .create_product(&product_form("Mesa", "55"), &detail_form("1"))
            .unwrap();

        let filter = ProductFilter {
            text: Some("sil".to_string()),
            ..ProductFilter::default()
        };
        let found = service.filter_products(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Silla");
    }
}
