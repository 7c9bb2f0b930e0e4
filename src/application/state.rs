//! Application state management for the terminal catalog.
//!
//! This module contains the main application state, the screen and mode
//! machinery, and the form buffers the user types into. Every change to the
//! catalog is delegated to [`CatalogService`].

use super::workflow::CatalogService;
use crate::domain::{
    CatalogError, CatalogResult, Category, CategoryForm, CategoryId, DetailForm, DetailId,
    FieldErrors, Product, ProductFilter, ProductForm, ProductId, ProductWithDetail, Report,
    ReportSection, ReportSettings, Tag, TagForm, TagId,
};
use crate::infrastructure::{CatalogStore, CsvExporter, FileRepository};
use std::path::Path;
use tracing::{info, warn};

/// The list currently shown in the main area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Products,
    Categories,
    Tags,
    Reports,
}

impl Screen {
    pub const ALL: [Screen; 4] = [
        Screen::Products,
        Screen::Categories,
        Screen::Tags,
        Screen::Reports,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Products => "Products",
            Screen::Categories => "Categories",
            Screen::Tags => "Tags",
            Screen::Reports => "Reports",
        }
    }

    pub fn next(&self) -> Screen {
        match self {
            Screen::Products => Screen::Categories,
            Screen::Categories => Screen::Tags,
            Screen::Tags => Screen::Reports,
            Screen::Reports => Screen::Products,
        }
    }

    pub fn previous(&self) -> Screen {
        match self {
            Screen::Products => Screen::Reports,
            Screen::Categories => Screen::Products,
            Screen::Tags => Screen::Categories,
            Screen::Reports => Screen::Tags,
        }
    }
}

/// Represents the current mode of the application.
///
/// The mode decides how key presses are interpreted and which popup, if any,
/// is drawn over the list.
#[derive(Debug)]
pub enum AppMode {
    /// Browsing the current list
    Normal,
    /// Help screen is displayed
    Help,
    /// A create or edit form is open
    Form,
    /// Waiting for the user to confirm a delete
    ConfirmDelete,
    /// Read-only view of one product and its detail
    ProductView,
    /// Typing a product search
    Search,
    /// Save dialog is open
    SaveAs,
    /// Load dialog is open
    LoadFile,
    /// CSV export dialog is open
    ExportCsv,
}

/// What an open form will create or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    NewCategory,
    EditCategory(CategoryId),
    NewTag,
    EditTag(TagId),
    NewProduct,
    EditProduct {
        product_id: ProductId,
        current_detail: Option<DetailId>,
    },
}

impl FormKind {
    pub fn title(&self) -> &'static str {
        match self {
            FormKind::NewCategory => "New Category",
            FormKind::EditCategory(_) => "Edit Category",
            FormKind::NewTag => "New Tag",
            FormKind::EditTag(_) => "Edit Tag",
            FormKind::NewProduct => "New Product",
            FormKind::EditProduct { .. } => "Edit Product",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
}

/// Text buffers for one open form plus the errors from the last submit.
#[derive(Debug, Clone)]
pub struct FormState {
    pub kind: FormKind,
    pub fields: Vec<FormField>,
    /// Index of the field receiving keystrokes
    pub focused: usize,
    /// Cursor position, in characters, within the focused field
    pub cursor: usize,
    pub errors: FieldErrors,
}

impl FormState {
    fn new(kind: FormKind, fields: Vec<(&'static str, &'static str, String)>) -> Self {
        let fields: Vec<FormField> = fields
            .into_iter()
            .map(|(key, label, value)| FormField { key, label, value })
            .collect();
        let cursor = fields.first().map(|f| f.value.chars().count()).unwrap_or(0);
        Self {
            kind,
            fields,
            focused: 0,
            cursor,
            errors: FieldErrors::new(),
        }
    }

    pub fn category(kind: FormKind, form: CategoryForm) -> Self {
        Self::new(kind, vec![("name", "Name", form.name)])
    }

    pub fn tag(kind: FormKind, form: TagForm) -> Self {
        Self::new(kind, vec![("name", "Name", form.name)])
    }

    pub fn product(kind: FormKind, product: ProductForm, detail: DetailForm) -> Self {
        Self::new(
            kind,
            vec![
                ("name", "Name", product.name),
                ("description", "Description", product.description),
                ("price", "Price", product.price),
                ("category", "Category", product.category),
                ("tags", "Tags (comma separated)", product.tags.join(", ")),
                ("weight", "Weight (kg)", detail.weight),
                ("dimensions", "Dimensions", detail.dimensions),
                (
                    "manufacture_date",
                    "Manufacture date (YYYY-MM-DD)",
                    detail.manufacture_date,
                ),
            ],
        )
    }

    pub fn value(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

    pub fn focused_field(&self) -> &FormField {
        &self.fields[self.focused]
    }

    pub fn focus_next(&mut self) {
        self.focused = (self.focused + 1) % self.fields.len();
        self.cursor = self.fields[self.focused].value.chars().count();
    }

    pub fn focus_previous(&mut self) {
        self.focused = (self.focused + self.fields.len() - 1) % self.fields.len();
        self.cursor = self.fields[self.focused].value.chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        insert_char(&mut self.fields[self.focused].value, &mut self.cursor, c);
    }

    pub fn backspace(&mut self) {
        remove_before(&mut self.fields[self.focused].value, &mut self.cursor);
    }

    pub fn delete(&mut self) {
        remove_at(&mut self.fields[self.focused].value, self.cursor);
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let len = self.fields[self.focused].value.chars().count();
        if self.cursor < len {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.fields[self.focused].value.chars().count();
    }

    pub fn category_form(&self) -> CategoryForm {
        CategoryForm {
            name: self.value("name").to_string(),
        }
    }

    pub fn tag_form(&self) -> TagForm {
        TagForm {
            name: self.value("name").to_string(),
        }
    }

    pub fn product_forms(&self) -> (ProductForm, DetailForm) {
        let product = ProductForm {
            name: self.value("name").to_string(),
            description: self.value("description").to_string(),
            price: self.value("price").to_string(),
            category: self.value("category").to_string(),
            tags: self
                .value("tags")
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        };
        let detail = DetailForm {
            weight: self.value("weight").to_string(),
            dimensions: self.value("dimensions").to_string(),
            manufacture_date: self.value("manufacture_date").to_string(),
        };
        (product, detail)
    }
}

fn byte_offset(text: &str, cursor: usize) -> usize {
    text.char_indices()
        .nth(cursor)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Inserts at a character-indexed cursor and advances it.
pub fn insert_char(text: &mut String, cursor: &mut usize, c: char) {
    let at = byte_offset(text, *cursor);
    text.insert(at, c);
    *cursor += 1;
}

/// Removes the character left of the cursor.
pub fn remove_before(text: &mut String, cursor: &mut usize) {
    if *cursor > 0 {
        *cursor -= 1;
        let at = byte_offset(text, *cursor);
        text.remove(at);
    }
}

/// Removes the character under the cursor.
pub fn remove_at(text: &mut String, cursor: usize) {
    if cursor < text.chars().count() {
        let at = byte_offset(text, cursor);
        text.remove(at);
    }
}

/// A delete waiting for confirmation, with the name shown in the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Category(CategoryId, String),
    Tag(TagId, String),
    Product(ProductId, String),
}

impl DeleteTarget {
    pub fn describe(&self) -> String {
        match self {
            DeleteTarget::Category(_, name) => {
                format!("category '{}' and all of its products", name)
            }
            DeleteTarget::Tag(_, name) => format!("tag '{}'", name),
            DeleteTarget::Product(_, name) => format!("product '{}'", name),
        }
    }
}

/// A product flattened for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: String,
    pub tags: String,
}

/// Narrows the products screen to one category or one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    Category(CategoryId, String),
    Tag(TagId, String),
}

impl ListFilter {
    pub fn describe(&self) -> String {
        match self {
            ListFilter::Category(_, name) => format!("category '{}'", name),
            ListFilter::Tag(_, name) => format!("tag '{}'", name),
        }
    }

    fn is_removed_by(&self, target: &DeleteTarget) -> bool {
        match (self, target) {
            (ListFilter::Category(id, _), DeleteTarget::Category(deleted, _)) => id == deleted,
            (ListFilter::Tag(id, _), DeleteTarget::Tag(deleted, _)) => id == deleted,
            _ => false,
        }
    }
}

/// Main application state containing the catalog service and UI state.
///
/// # Examples
///
/// ```
/// use tcatalog::application::{App, Screen};
///
/// let app = App::default();
/// assert_eq!(app.screen, Screen::Products);
/// assert_eq!(app.selected, 0);
/// ```
#[derive(Debug)]
pub struct App {
    /// Catalog operations, shared store and permission
    pub service: CatalogService,
    /// List shown in the main area
    pub screen: Screen,
    /// Current application mode
    pub mode: AppMode,
    /// Selected row (zero-based) in the current list
    pub selected: usize,
    /// Open create/edit form
    pub form: Option<FormState>,
    /// Delete awaiting confirmation
    pub pending_delete: Option<DeleteTarget>,
    /// Product shown in the detail view
    pub viewing: Option<ProductWithDetail>,
    /// Last computed report
    pub report: Option<Report>,
    pub report_settings: ReportSettings,
    /// Report section listed on the reports screen
    pub report_section: ReportSection,
    /// Product search text; empty means no filter
    pub search_query: String,
    /// Category or tag the products screen is narrowed to
    pub list_filter: Option<ListFilter>,
    /// Current filename (if the catalog has been saved/loaded)
    pub filename: Option<String>,
    /// Input buffer for filename entry
    pub filename_input: String,
    /// Cursor position within the search or filename buffer
    pub cursor_position: usize,
    /// Scroll position in help text
    pub help_scroll: usize,
    /// Temporary status message to display
    pub status_message: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self::new(
            CatalogService::new(CatalogStore::default(), true),
            ReportSettings::default(),
            None,
        )
    }
}

impl App {
    pub fn new(service: CatalogService, report_settings: ReportSettings, filename: Option<String>) -> Self {
        Self {
            service,
            screen: Screen::Products,
            mode: AppMode::Normal,
            selected: 0,
            form: None,
            pending_delete: None,
            viewing: None,
            report: None,
            report_settings,
            report_section: ReportSection::PricedAbove,
            search_query: String::new(),
            list_filter: None,
            filename,
            filename_input: String::new(),
            cursor_position: 0,
            help_scroll: 0,
            status_message: None,
        }
    }

    // --- lists ---

    fn rows_for<'a>(catalog: &crate::domain::Catalog, products: impl Iterator<Item = &'a Product>) -> Vec<ProductRow> {
        products
            .map(|p| ProductRow {
                id: p.id,
                name: p.name.clone(),
                category: catalog
                    .category(p.category_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
                price: p.price.to_string(),
                tags: p
                    .tag_ids
                    .iter()
                    .filter_map(|id| catalog.tag(*id).ok())
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
            .collect()
    }

    pub fn product_filter(&self) -> ProductFilter {
        ProductFilter {
            category: match self.list_filter {
                Some(ListFilter::Category(id, _)) => Some(id),
                _ => None,
            },
            tag: match self.list_filter {
                Some(ListFilter::Tag(id, _)) => Some(id),
                _ => None,
            },
            text: Some(self.search_query.clone()).filter(|q| !q.trim().is_empty()),
        }
    }

    /// Products matching the current filter and search, in catalog order.
    pub fn product_rows(&self) -> CatalogResult<Vec<ProductRow>> {
        let filter = self.product_filter();
        self.service
            .with_catalog(|catalog| Self::rows_for(catalog, catalog.filter_products(&filter)))
    }

    /// Categories with their product counts.
    pub fn category_rows(&self) -> CatalogResult<Vec<(Category, usize)>> {
        self.service.with_catalog(|catalog| {
            catalog
                .categories()
                .map(|c| (c.clone(), catalog.products_in_category(c.id).count()))
                .collect()
        })
    }

    /// Tags with the number of products carrying them.
    pub fn tag_rows(&self) -> CatalogResult<Vec<(Tag, usize)>> {
        self.service.with_catalog(|catalog| {
            catalog
                .tags()
                .map(|t| (t.clone(), catalog.products_with_tag(t.id).count()))
                .collect()
        })
    }

    pub fn report_rows(&self) -> CatalogResult<Vec<ProductRow>> {
        let Some(report) = &self.report else {
            return Ok(Vec::new());
        };
        let products = report.section(self.report_section);
        self.service
            .with_catalog(|catalog| Self::rows_for(catalog, products.iter()))
    }

    /// Unwraps a list read, reporting a failure in the status bar.
    fn rows_or_status<T>(&mut self, rows: CatalogResult<Vec<T>>) -> Vec<T> {
        rows.unwrap_or_else(|err| {
            warn!(error = %err, "catalog list unavailable");
            self.status_message = Some(format!("Catalog unavailable: {}", err));
            Vec::new()
        })
    }

    fn selected_product_rows(&mut self) -> Vec<ProductRow> {
        let rows = match self.screen {
            Screen::Products => self.product_rows(),
            Screen::Reports => self.report_rows(),
            _ => Ok(Vec::new()),
        };
        self.rows_or_status(rows)
    }

    pub fn row_count(&mut self) -> usize {
        match self.screen {
            Screen::Products | Screen::Reports => self.selected_product_rows().len(),
            Screen::Categories => {
                let rows = self.category_rows();
                self.rows_or_status(rows).len()
            }
            Screen::Tags => {
                let rows = self.tag_rows();
                self.rows_or_status(rows).len()
            }
        }
    }

    pub fn selected_product_id(&mut self) -> Option<ProductId> {
        let selected = self.selected;
        self.selected_product_rows().get(selected).map(|r| r.id)
    }

    fn selected_category(&mut self) -> Option<Category> {
        let rows = self.category_rows();
        let selected = self.selected;
        self.rows_or_status(rows).into_iter().nth(selected).map(|(c, _)| c)
    }

    fn selected_tag(&mut self) -> Option<Tag> {
        let rows = self.tag_rows();
        let selected = self.selected;
        self.rows_or_status(rows).into_iter().nth(selected).map(|(t, _)| t)
    }

    /// Shows the products of the selected category or tag.
    pub fn show_selected_products(&mut self) {
        let filter = match self.screen {
            Screen::Categories => self
                .selected_category()
                .map(|c| ListFilter::Category(c.id, c.name)),
            Screen::Tags => self.selected_tag().map(|t| ListFilter::Tag(t.id, t.name)),
            Screen::Products | Screen::Reports => return,
        };
        let Some(filter) = filter else {
            return;
        };
        self.status_message = Some(format!("Products in {} (Esc shows all)", filter.describe()));
        self.list_filter = Some(filter);
        self.set_screen(Screen::Products);
    }

    /// Drops the category or tag filter. Returns whether one was active.
    pub fn clear_list_filter(&mut self) -> bool {
        if self.list_filter.take().is_some() {
            self.selected = 0;
            true
        } else {
            false
        }
    }

    // --- navigation ---

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.row_count() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Keeps the selection inside the list after rows disappear.
    pub fn clamp_selection(&mut self) {
        let count = self.row_count();
        if self.selected >= count {
            self.selected = count.saturating_sub(1);
        }
    }

    pub fn set_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.selected = 0;
        if screen == Screen::Reports {
            self.refresh_report();
        }
    }

    pub fn next_screen(&mut self) {
        self.set_screen(self.screen.next());
    }

    pub fn previous_screen(&mut self) {
        self.set_screen(self.screen.previous());
    }

    // --- reports ---

    pub fn refresh_report(&mut self) {
        match self.service.report(&self.report_settings) {
            Ok(report) => self.report = Some(report),
            Err(err) => {
                self.report = None;
                self.status_message = Some(format!("Report unavailable: {}", err));
            }
        }
        self.clamp_selection();
    }

    pub fn next_report_section(&mut self) {
        self.report_section = self.report_section.next();
        self.selected = 0;
    }

    // --- forms ---

    fn ensure_writable(&mut self) -> bool {
        if self.service.is_authorized() {
            true
        } else {
            self.status_message = Some(format!("Read-only: {}", CatalogError::Unauthorized));
            false
        }
    }

    fn open_form(&mut self, form: FormState) {
        self.form = Some(form);
        self.mode = AppMode::Form;
        self.status_message = None;
    }

    /// Opens an empty form for the current screen.
    pub fn start_create(&mut self) {
        if !self.ensure_writable() {
            return;
        }
        let form = match self.screen {
            Screen::Products => FormState::product(
                FormKind::NewProduct,
                ProductForm::default(),
                DetailForm::default(),
            ),
            Screen::Categories => FormState::category(FormKind::NewCategory, CategoryForm::default()),
            Screen::Tags => FormState::tag(FormKind::NewTag, TagForm::default()),
            Screen::Reports => {
                self.status_message = Some("Reports are read-only".to_string());
                return;
            }
        };
        self.open_form(form);
    }

    /// Opens the selected record in an edit form, prefilled with its values.
    pub fn start_edit(&mut self) {
        if !self.ensure_writable() {
            return;
        }
        let form = match self.screen {
            Screen::Products | Screen::Reports => {
                let Some(id) = self.selected_product_id() else {
                    return;
                };
                match self.product_edit_form(id) {
                    Ok(form) => form,
                    Err(err) => {
                        self.status_message = Some(err.to_string());
                        return;
                    }
                }
            }
            Screen::Categories => {
                let Some(category) = self.selected_category() else {
                    return;
                };
                FormState::category(
                    FormKind::EditCategory(category.id),
                    CategoryForm { name: category.name },
                )
            }
            Screen::Tags => {
                let Some(tag) = self.selected_tag() else {
                    return;
                };
                FormState::tag(FormKind::EditTag(tag.id), TagForm { name: tag.name })
            }
        };
        self.open_form(form);
    }

    fn product_edit_form(&self, id: ProductId) -> CatalogResult<FormState> {
        self.service.with_catalog(|catalog| {
            let current = catalog.product_with_detail(id)?;
            let kind = FormKind::EditProduct {
                product_id: id,
                current_detail: current.detail.as_ref().map(|d| d.id),
            };
            Ok(FormState::product(
                kind,
                ProductForm::from_product(&current.product, catalog),
                DetailForm::from_detail(current.detail.as_ref()),
            ))
        })?
    }

    /// Sends the open form to the service. On validation failure the form
    /// stays open with the errors attached.
    pub fn submit_form(&mut self) {
        let Some(form) = &self.form else {
            return;
        };
        let result: CatalogResult<String> = match form.kind {
            FormKind::NewCategory => self
                .service
                .create_category(&form.category_form())
                .map(|_| "Category created.".to_string()),
            FormKind::EditCategory(id) => self
                .service
                .update_category(id, &form.category_form())
                .map(|_| "Category updated.".to_string()),
            FormKind::NewTag => self
                .service
                .create_tag(&form.tag_form())
                .map(|_| "Tag created.".to_string()),
            FormKind::EditTag(id) => self
                .service
                .update_tag(id, &form.tag_form())
                .map(|_| "Tag updated.".to_string()),
            FormKind::NewProduct => {
                let (product, detail) = form.product_forms();
                self.service
                    .create_product(&product, &detail)
                    .map(|_| "Product created.".to_string())
            }
            FormKind::EditProduct {
                product_id,
                current_detail,
            } => {
                let (product, detail) = form.product_forms();
                self.service
                    .update_product(product_id, &product, &detail, current_detail)
                    .map(|_| "Product updated.".to_string())
            }
        };

        match result {
            Ok(message) => {
                self.form = None;
                self.mode = AppMode::Normal;
                self.status_message = Some(message);
                self.after_write();
            }
            Err(err) => match err.field_errors() {
                Some(errors) => {
                    if let Some(form) = &mut self.form {
                        form.errors = errors;
                    }
                    self.status_message = Some("Please correct the errors below.".to_string());
                }
                None => self.status_message = Some(err.to_string()),
            },
        }
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
        self.mode = AppMode::Normal;
    }

    fn after_write(&mut self) {
        if self.screen == Screen::Reports {
            self.refresh_report();
        }
        self.clamp_selection();
    }

    // --- delete ---

    pub fn start_delete(&mut self) {
        if !self.ensure_writable() {
            return;
        }
        let target = match self.screen {
            Screen::Products | Screen::Reports => {
                let selected = self.selected;
                self.selected_product_rows()
                    .into_iter()
                    .nth(selected)
                    .map(|r| DeleteTarget::Product(r.id, r.name))
            }
            Screen::Categories => self
                .selected_category()
                .map(|c| DeleteTarget::Category(c.id, c.name)),
            Screen::Tags => self.selected_tag().map(|t| DeleteTarget::Tag(t.id, t.name)),
        };
        if let Some(target) = target {
            self.pending_delete = Some(target);
            self.mode = AppMode::ConfirmDelete;
        }
    }

    pub fn confirm_delete(&mut self) {
        let Some(target) = self.pending_delete.take() else {
            self.mode = AppMode::Normal;
            return;
        };
        let result = match &target {
            DeleteTarget::Category(id, _) => self.service.delete_category(*id).map(|report| {
                format!(
                    "Category deleted ({} products removed).",
                    report.products.len()
                )
            }),
            DeleteTarget::Tag(id, _) => self
                .service
                .delete_tag(*id)
                .map(|_| "Tag deleted.".to_string()),
            DeleteTarget::Product(id, _) => self
                .service
                .delete_product(*id)
                .map(|_| "Product deleted.".to_string()),
        };
        if result.is_ok() && self.list_filter.as_ref().is_some_and(|f| f.is_removed_by(&target)) {
            self.list_filter = None;
        }
        self.status_message = Some(match result {
            Ok(message) => message,
            Err(err) => format!("Delete failed: {}", err),
        });
        self.mode = AppMode::Normal;
        self.after_write();
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.mode = AppMode::Normal;
    }

    // --- product view ---

    pub fn view_selected_product(&mut self) {
        let Some(id) = self.selected_product_id() else {
            return;
        };
        match self.service.product_with_detail(id) {
            Ok(product) => {
                self.viewing = Some(product);
                self.mode = AppMode::ProductView;
            }
            Err(err) => self.status_message = Some(err.to_string()),
        }
    }

    pub fn close_view(&mut self) {
        self.viewing = None;
        self.mode = AppMode::Normal;
    }

    // --- search ---

    pub fn start_search(&mut self) {
        if self.screen != Screen::Products {
            self.set_screen(Screen::Products);
        }
        self.mode = AppMode::Search;
        self.cursor_position = self.search_query.chars().count();
        self.status_message = None;
    }

    /// Keeps the query as the active filter.
    pub fn finish_search(&mut self) {
        self.mode = AppMode::Normal;
        self.cursor_position = 0;
        self.selected = 0;
    }

    /// Drops the query and shows every product again.
    pub fn cancel_search(&mut self) {
        self.search_query.clear();
        self.mode = AppMode::Normal;
        self.cursor_position = 0;
        self.selected = 0;
    }

    // --- files ---

    /// Switches to save-as mode to prompt for a filename.
    pub fn start_save_as(&mut self) {
        self.mode = AppMode::SaveAs;
        self.filename_input = self.filename.clone().unwrap_or_else(|| "catalog.json".to_string());
        self.cursor_position = self.filename_input.chars().count();
        self.status_message = None;
    }

    /// Switches to load-file mode to prompt for a filename.
    pub fn start_load_file(&mut self) {
        if !self.ensure_writable() {
            return;
        }
        self.mode = AppMode::LoadFile;
        self.filename_input = self.filename.clone().unwrap_or_else(|| "catalog.json".to_string());
        self.cursor_position = self.filename_input.chars().count();
        self.status_message = None;
    }

    /// Switches to CSV export mode. Exports the product list, or the shown
    /// report section when on the reports screen.
    pub fn start_csv_export(&mut self) {
        self.mode = AppMode::ExportCsv;
        self.filename_input = match self.screen {
            Screen::Reports => "report.csv".to_string(),
            _ => "products.csv".to_string(),
        };
        self.cursor_position = self.filename_input.chars().count();
        self.status_message = None;
    }

    /// Cancels filename input and returns to normal mode.
    pub fn cancel_filename_input(&mut self) {
        self.mode = AppMode::Normal;
        self.filename_input.clear();
        self.cursor_position = 0;
    }

    fn entered_filename(&self, default: &str) -> String {
        if self.filename_input.trim().is_empty() {
            default.to_string()
        } else {
            self.filename_input.trim().to_string()
        }
    }

    fn close_filename_input(&mut self) {
        self.mode = AppMode::Normal;
        self.filename_input.clear();
        self.cursor_position = 0;
    }

    pub fn save_catalog(&mut self) {
        let filename = self.entered_filename("catalog.json");
        let result = self
            .service
            .store()
            .snapshot()
            .and_then(|catalog| FileRepository::save_catalog(&catalog, Path::new(&filename)))
            .and_then(|()| self.service.store().rebind_autosave(Path::new(&filename)));
        match result {
            Ok(()) => {
                info!(file = %filename, "catalog saved");
                self.status_message = Some(format!("Saved to {}", filename));
                self.filename = Some(filename);
            }
            Err(err) => self.status_message = Some(format!("Save failed: {}", err)),
        }
        self.close_filename_input();
    }

    pub fn load_catalog(&mut self) {
        let filename = self.entered_filename("catalog.json");
        let path = Path::new(&filename);
        let result = FileRepository::load_catalog(path)
            .and_then(|catalog| self.service.store().replace(catalog, path))
            .and_then(|()| self.service.store().autosave_path());
        match result {
            Ok(autosave) => {
                self.status_message = Some(match autosave {
                    Some(target) => format!("Loaded from {} (autosaving to {})", filename, target.display()),
                    None => format!("Loaded from {}", filename),
                });
                self.filename = Some(filename);
                self.selected = 0;
                self.search_query.clear();
                self.list_filter = None;
                if self.screen == Screen::Reports {
                    self.refresh_report();
                }
            }
            Err(err) => self.status_message = Some(format!("Load failed: {}", err)),
        }
        self.close_filename_input();
    }

    pub fn export_csv(&mut self) {
        let filename = self.entered_filename("products.csv");
        let products: CatalogResult<Vec<Product>> = match (&self.screen, &self.report) {
            (Screen::Reports, Some(report)) => Ok(report.section(self.report_section).to_vec()),
            _ => self.service.filter_products(&self.product_filter()),
        };
        let result = products.and_then(|products| {
            self.service
                .with_catalog(|catalog| CsvExporter::export_products(&products, catalog, &filename))?
        });
        self.status_message = Some(match result {
            Ok(filename) => format!("Exported to {}", filename),
            Err(err) => format!("Export failed: {}", err),
        });
        self.close_filename_input();
    }
}
