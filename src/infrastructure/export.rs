use crate::domain::{Catalog, CatalogError, CatalogResult, Product};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 6] = ["id", "name", "category", "price", "tags", "description"];

pub struct CsvExporter;

impl CsvExporter {
    /// Writes one row per product. Category and tags are written by name;
    /// tags are joined with `;`.
    pub fn write_products<W: Write>(
        writer: W,
        products: &[Product],
        catalog: &Catalog,
    ) -> CatalogResult<usize> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(HEADER).map_err(storage_error)?;

        for product in products {
            let category = catalog
                .category(product.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            let tags = product
                .tag_ids
                .iter()
                .filter_map(|id| catalog.tag(*id).ok())
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(";");
            csv.write_record([
                product.id.to_string(),
                product.name.clone(),
                category,
                product.price.to_string(),
                tags,
                product.description.clone(),
            ])
            .map_err(storage_error)?;
        }

        csv.flush()
            .map_err(|e| CatalogError::Storage(e.to_string()))?;
        Ok(products.len())
    }

    pub fn export_products(
        products: &[Product],
        catalog: &Catalog,
        filename: &str,
    ) -> CatalogResult<String> {
        let file = File::create(Path::new(filename))
            .map_err(|e| CatalogError::Storage(format!("{}: {}", filename, e)))?;
        Self::write_products(file, products, catalog)?;
        Ok(filename.to_string())
    }
}

fn storage_error(err: csv::Error) -> CatalogError {
    CatalogError::Storage(format!("CSV write failed: {}", err))
}
