//! Capacity sheet

use sprintkpi_core::{CellSource, CellValue, RawCapacityRow, SchemaError};

use crate::schema::{resolve_headers, CapacityColumn, CAPACITY_HEADER_ROW};

/// Read capacity rows below the header row, stopping at the first blank row
pub fn extract_capacity<S: CellSource + ?Sized>(source: &S) -> Result<Vec<RawCapacityRow>, SchemaError> {
    let columns = resolve_headers(
        source,
        CAPACITY_HEADER_ROW,
        &CapacityColumn::ALL,
        |c| c.aliases(),
        |c| c.label(),
        |c| c.is_required(),
    )?;

    let read = |row: u32, column: CapacityColumn| -> CellValue {
        columns
            .get(&column)
            .map(|resolved| source.cell(row, resolved.col))
            .unwrap_or_default()
    };

    let mut rows = Vec::new();
    for row in (CAPACITY_HEADER_ROW + 1)..=source.max_row() {
        let record = RawCapacityRow {
            row,
            name: read(row, CapacityColumn::Name),
            capacity: read(row, CapacityColumn::Capacity),
            team: read(row, CapacityColumn::Team),
        };
        if record.name.is_blank() && record.capacity.is_blank() && record.team.is_blank() {
            break;
        }
        rows.push(record);
    }

    tracing::debug!(sheet = source.sheet_name(), rows = rows.len(), "read capacity table");
    Ok(rows)
}
