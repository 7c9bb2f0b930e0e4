//! Canned product reports.

use super::catalog::Catalog;
use super::models::Product;
use rust_decimal::Decimal;

/// A read-only predicate over products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportFilter {
    /// Price strictly greater than the threshold.
    PricedAbove(Decimal),
    /// Price strictly less than the threshold.
    PricedBelow(Decimal),
    /// Every product whose category has a different name.
    ExcludingCategory(String),
}

impl ReportFilter {
    pub fn matches(&self, product: &Product, catalog: &Catalog) -> bool {
        match self {
            ReportFilter::PricedAbove(threshold) => product.price.value() > *threshold,
            ReportFilter::PricedBelow(threshold) => product.price.value() < *threshold,
            ReportFilter::ExcludingCategory(name) => catalog
                .category(product.category_id)
                .map(|c| &c.name != name)
                .unwrap_or(true),
        }
    }

    /// Matching products in catalog order.
    pub fn apply(&self, catalog: &Catalog) -> Vec<Product> {
        catalog
            .products()
            .filter(|p| self.matches(p, catalog))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub price_threshold: Decimal,
    pub excluded_category: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            price_threshold: Decimal::new(50, 0),
            excluded_category: "Hogar".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSection {
    PricedAbove,
    ExcludingCategory,
    PricedBelow,
}

impl ReportSection {
    pub const ALL: [ReportSection; 3] = [
        ReportSection::PricedAbove,
        ReportSection::ExcludingCategory,
        ReportSection::PricedBelow,
    ];

    pub fn filter(&self, settings: &ReportSettings) -> ReportFilter {
        match self {
            ReportSection::PricedAbove => ReportFilter::PricedAbove(settings.price_threshold),
            ReportSection::ExcludingCategory => {
                ReportFilter::ExcludingCategory(settings.excluded_category.clone())
            }
            ReportSection::PricedBelow => ReportFilter::PricedBelow(settings.price_threshold),
        }
    }

    pub fn title(&self, settings: &ReportSettings) -> String {
        match self {
            ReportSection::PricedAbove => {
                format!("Priced above {}", settings.price_threshold)
            }
            ReportSection::ExcludingCategory => {
                format!("Not in category '{}'", settings.excluded_category)
            }
            ReportSection::PricedBelow => {
                format!("Priced below {}", settings.price_threshold)
            }
        }
    }

    pub fn next(&self) -> ReportSection {
        match self {
            ReportSection::PricedAbove => ReportSection::ExcludingCategory,
            ReportSection::ExcludingCategory => ReportSection::PricedBelow,
            ReportSection::PricedBelow => ReportSection::PricedAbove,
        }
    }
}

/// All three report sections computed from one consistent catalog view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub priced_above: Vec<Product>,
    pub excluding_category: Vec<Product>,
    pub priced_below: Vec<Product>,
}

impl Report {
    pub fn build(catalog: &Catalog, settings: &ReportSettings) -> Self {
        Self {
            priced_above: ReportSection::PricedAbove.filter(settings).apply(catalog),
            excluding_category: ReportSection::ExcludingCategory.filter(settings).apply(catalog),
            priced_below: ReportSection::PricedBelow.filter(settings).apply(catalog),
        }
    }

    pub fn section(&self, section: ReportSection) -> &[Product] {
        match section {
            ReportSection::PricedAbove => &self.priced_above,
            ReportSection::ExcludingCategory => &self.excluding_category,
            ReportSection::PricedBelow => &self.priced_below,
        }
    }
}
