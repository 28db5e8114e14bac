//! Sprint metadata from the labeled cells of the Data sheet

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use sprintkpi_core::{CellSource, CellValue, MetadataError, SprintMetadata};

use crate::schema::{MetadataField, METADATA_FIRST_ROW, METADATA_LABEL_COL, METADATA_LAST_ROW, METADATA_VALUE_COL};

/// Read sprint metadata from rows 3-10 (label in column A, value in column B).
///
/// Labels may appear in any order within the range; the first occurrence of
/// a label wins.
pub fn extract_metadata<S: CellSource + ?Sized>(source: &S) -> Result<SprintMetadata, MetadataError> {
    let mut found: BTreeMap<MetadataField, (u32, CellValue)> = BTreeMap::new();

    for row in METADATA_FIRST_ROW..=METADATA_LAST_ROW {
        let Some(label) = source.cell(row, METADATA_LABEL_COL).as_text() else {
            continue;
        };
        if let Some(field) = MetadataField::from_label(&label) {
            found
                .entry(field)
                .or_insert_with(|| (row, source.cell(row, METADATA_VALUE_COL)));
        }
    }

    let sprint_name = required(&found, MetadataField::SprintName, |v| v.as_text(), "cell is blank")?;
    let sprint_number = required(&found, MetadataField::SprintNumber, parse_sprint_number, "expected a positive whole number")?;
    let start_date = required(&found, MetadataField::StartDate, |v| v.as_date(), "expected a date")?;
    let end_date = required(&found, MetadataField::EndDate, |v| v.as_date(), "expected a date")?;

    if end_date < start_date {
        return Err(MetadataError::DateOrder {
            start: start_date,
            end: end_date,
        });
    }

    let teams = found
        .get(&MetadataField::Team)
        .and_then(|(_, v)| v.as_text())
        .map(|text| {
            text.split([',', ';'])
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let planned_effort = match found.get(&MetadataField::PlannedEffort) {
        Some((_, v)) if v.is_blank() => None,
        Some((row, v)) => {
            let parsed = v.as_number().filter(|n| *n >= 0.0);
            if parsed.is_none() {
                tracing::warn!(row, value = %v, "ignoring non-numeric planned effort");
            }
            parsed
        }
        None => None,
    };

    Ok(SprintMetadata {
        sprint_name,
        sprint_number,
        start_date,
        end_date,
        teams,
        planned_effort,
    })
}

fn required<T>(
    found: &BTreeMap<MetadataField, (u32, CellValue)>,
    field: MetadataField,
    parse: impl Fn(&CellValue) -> Option<T>,
    reason: &str,
) -> Result<T, MetadataError> {
    let (row, value) = found
        .get(&field)
        .ok_or(MetadataError::Missing { field: field.label() })?;

    if value.is_blank() {
        return Err(MetadataError::Invalid {
            field: field.label(),
            row: *row,
            reason: "cell is blank".into(),
        });
    }

    parse(value).ok_or_else(|| MetadataError::Invalid {
        field: field.label(),
        row: *row,
        reason: format!("{} (found '{}')", reason, value),
    })
}

/// Accepts `42`, `"42"` and `"Sprint 42"`
fn parse_sprint_number(value: &CellValue) -> Option<u32> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();

    match value {
        CellValue::Number(n) if *n >= 1.0 && n.fract() == 0.0 && *n <= u32::MAX as f64 => Some(*n as u32),
        CellValue::Text(text) => {
            let re = DIGITS.get_or_init(|| Regex::new(r"^(?i:sprint\s*#?\s*)?(\d+)$").expect("valid regex"));
            re.captures(text.trim())
                .and_then(|caps| caps[1].parse::<u32>().ok())
                .filter(|n| *n >= 1)
        }
        _ => None,
    }
}
