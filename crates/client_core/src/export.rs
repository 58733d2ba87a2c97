//! Customer CSV export.

use std::{fs::File, io::Write, path::Path};

use csv::{QuoteStyle, WriterBuilder};
use shared::domain::Customer;
use thiserror::Error;
use tracing::{info, warn};

pub const CSV_HEADER: [&str; 7] = [
    "firstname",
    "lastname",
    "email",
    "phone",
    "streetaddress",
    "postcode",
    "city",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no customers to export")]
    NoCustomers,
    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes `customers` as semicolon-separated, fully quoted CSV with a
/// header row. Returns the number of data rows written.
pub fn write_customers_csv<W: Write>(
    customers: &[Customer],
    writer: W,
) -> Result<usize, ExportError> {
    if customers.is_empty() {
        warn!("customer export requested with an empty list");
        return Err(ExportError::NoCustomers);
    }

    let mut csv = WriterBuilder::new()
        .delimiter(b';')
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for customer in customers {
        csv.write_record([
            &customer.firstname,
            &customer.lastname,
            &customer.email,
            &customer.phone,
            &customer.streetaddress,
            &customer.postcode,
            &customer.city,
        ])?;
    }
    csv.flush()?;
    Ok(customers.len())
}

/// File variant of [`write_customers_csv`]. No file is created when there is
/// nothing to export.
pub fn export_customers_to_path(
    customers: &[Customer],
    path: impl AsRef<Path>,
) -> Result<usize, ExportError> {
    if customers.is_empty() {
        warn!("customer export requested with an empty list");
        return Err(ExportError::NoCustomers);
    }

    let path = path.as_ref();
    let file = File::create(path)?;
    let rows = write_customers_csv(customers, file)?;
    info!(path = %path.display(), rows, "customers exported");
    Ok(rows)
}

#[cfg(test)]
#[path = "tests/export_tests.rs"]
mod tests;
