use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::error::Result;
use crate::models::Transaction;
use crate::reports::{list_page, RangeFilter};
use crate::store::Store;

/// Page size used when walking the transaction store for export.
const EXPORT_PAGE: usize = 200;

const HEADER: [&str; 7] = [
    "id",
    "date",
    "type",
    "category",
    "amount",
    "currency",
    "description",
];

fn write_row<W: Write>(writer: &mut csv::Writer<W>, txn: &Transaction) -> Result<()> {
    let date = txn.date.format("%Y-%m-%d").to_string();
    let amount = txn.amount.to_string();
    writer.write_record([
        txn.id.as_str(),
        date.as_str(),
        txn.kind.as_str(),
        txn.category.as_str(),
        amount.as_str(),
        txn.currency.as_str(),
        txn.description.as_str(),
    ])?;
    Ok(())
}

fn export_into<S: Store, W: Write>(
    store: &S,
    user_id: &str,
    filter: &RangeFilter,
    page_size: usize,
    out: W,
) -> Result<usize> {
    let mut writer = WriterBuilder::new().from_writer(out);
    writer.write_record(HEADER)?;

    let mut written = 0;
    let mut after_id: Option<String> = None;
    loop {
        let page = list_page(store, user_id, filter, page_size, after_id)?;
        for txn in &page.transactions {
            write_row(&mut writer, txn)?;
            written += 1;
        }
        if !page.has_more {
            break;
        }
        after_id = page.last_id;
        if after_id.is_none() {
            break;
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Stream every transaction matching the filter into a CSV file, walking the
/// cursor pagination to completion. Returns the number of data rows written.
pub fn export_csv<S: Store>(
    store: &S,
    user_id: &str,
    filter: &RangeFilter,
    path: &Path,
) -> Result<usize> {
    let file = std::fs::File::create(path)?;
    export_into(store, user_id, filter, EXPORT_PAGE, file)
}
