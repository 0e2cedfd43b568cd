//! Workbook encoding for tabular orders.
//!
//! Rows are written to a single worksheet with a fixed header
//! (Item, Quantity, Remarks) so the recipient always sees the same layout.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};

use super::OrderRow;
use crate::error::SpreadsheetError;

/// Worksheet that holds the order rows.
pub const SHEET_NAME: &str = "Order";

/// Column headers, in output order.
pub const COLUMNS: [&str; 3] = ["Item", "Quantity", "Remarks"];

static EMPTY_CELL: Data = Data::Empty;

/// Serialize rows into an `.xlsx` workbook.
pub fn write_workbook(rows: &[OrderRow]) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, title) in (0u16..).zip(COLUMNS) {
        worksheet.write_string_with_format(0, col, title, &header)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let r = u32::try_from(index + 1).map_err(|_| SpreadsheetError::InvalidCell {
            row: index + 1,
            column: COLUMNS[0],
            reason: "too many rows".into(),
        })?;

        // Empty strings are left as blank cells.
        if !row.item.is_empty() {
            worksheet.write_string(r, 0, row.item.as_str())?;
        }
        worksheet.write_number(r, 1, row.quantity)?;
        if !row.remarks.is_empty() {
            worksheet.write_string(r, 2, row.remarks.as_str())?;
        }
    }

    worksheet.set_column_width(0, 30)?;
    worksheet.set_column_width(2, 40)?;

    Ok(workbook.save_to_buffer()?)
}

/// Read rows back from a workbook produced by [`write_workbook`].
///
/// The header row is skipped and fully blank rows are ignored.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<OrderRow>, SpreadsheetError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let range = workbook.worksheet_range(SHEET_NAME)?;

    let mut rows = Vec::new();
    for (index, cells) in range.rows().enumerate().skip(1) {
        let cell = |col: usize| cells.get(col).unwrap_or(&EMPTY_CELL);

        if (0..COLUMNS.len()).all(|col| matches!(cell(col), Data::Empty)) {
            continue;
        }

        rows.push(OrderRow {
            item: cell_text(cell(0)),
            quantity: cell_quantity(cell(1)).map_err(|reason| SpreadsheetError::InvalidCell {
                row: index,
                column: COLUMNS[1],
                reason,
            })?,
            remarks: cell_text(cell(2)),
        });
    }
    Ok(rows)
}

fn cell_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell_quantity(data: &Data) -> Result<u32, String> {
    match data {
        Data::Empty => Ok(0),
        Data::Int(i) => u32::try_from(*i).map_err(|_| format!("{i} is out of range")),
        Data::Float(f) => {
            if f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX) {
                Ok(*f as u32)
            } else {
                Err(format!("{f} is not a whole non-negative number"))
            }
        }
        Data::String(s) => s
            .trim()
            .parse()
            .map_err(|_| format!("{s:?} is not a quantity")),
        other => Err(format!("unexpected cell value {other}")),
    }
}
