use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::aggregates::Grouped;
use crate::error::RenderError;

pub const PRODUCT_HEADER: &str = "Product Name";
pub const CORRELATION_HEADER: &str = "Correlation";

/// Writes one sheet with a `Product Name | Correlation` header followed by a
/// row per product. Returns the number of product rows written.
pub fn write_correlation_workbook(
    products: &Grouped<String>,
    path: &Path,
) -> Result<usize, RenderError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    sheet.write_string_with_format(0, 0, PRODUCT_HEADER, &header)?;
    sheet.write_string_with_format(0, 1, CORRELATION_HEADER, &header)?;
    sheet.set_column_width(0, 60)?;
    sheet.set_column_width(1, 14)?;

    for (idx, entry) in products.iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_string(row, 0, entry.key.as_str())?;
        sheet.write_number(row, 1, entry.value)?;
    }

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    workbook.save(path)?;
    info!(path = %path.display(), rows = products.len(), "wrote correlation workbook");
    Ok(products.len())
}
