//! Fixed layout of the Data and Capacity sheets
//!
//! Header labels are matched trimmed and case-insensitively, with a trailing
//! colon ignored. Each logical column accepts a list of aliases in priority
//! order; when several aliases of the same column are present, the earliest
//! alias in the list wins.

use std::collections::BTreeMap;

use sprintkpi_core::{CellSource, Column, SchemaError};

/// First row scanned for metadata labels
pub const METADATA_FIRST_ROW: u32 = 3;

/// Last row scanned for metadata labels
pub const METADATA_LAST_ROW: u32 = 10;

/// Column holding metadata labels
pub const METADATA_LABEL_COL: u32 = 1;

/// Column holding metadata values
pub const METADATA_VALUE_COL: u32 = 2;

/// Header row of the work item table
pub const WORK_ITEM_HEADER_ROW: u32 = 21;

/// Header row of the Capacity sheet
pub const CAPACITY_HEADER_ROW: u32 = 1;

/// Labeled metadata cells of the Data sheet
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataField {
    SprintName,
    SprintNumber,
    StartDate,
    EndDate,
    Team,
    PlannedEffort,
}

impl MetadataField {
    pub const ALL: [MetadataField; 6] = [
        MetadataField::SprintName,
        MetadataField::SprintNumber,
        MetadataField::StartDate,
        MetadataField::EndDate,
        MetadataField::Team,
        MetadataField::PlannedEffort,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetadataField::SprintName => "Sprint Name",
            MetadataField::SprintNumber => "Sprint Number",
            MetadataField::StartDate => "Start Date",
            MetadataField::EndDate => "End Date",
            MetadataField::Team => "Team",
            MetadataField::PlannedEffort => "Planned Effort",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            MetadataField::SprintName => &["Sprint Name", "Sprint"],
            MetadataField::SprintNumber => &["Sprint Number", "Sprint No", "Sprint #"],
            MetadataField::StartDate => &["Start Date", "Sprint Start"],
            MetadataField::EndDate => &["End Date", "Sprint End"],
            MetadataField::Team => &["Team", "Teams"],
            MetadataField::PlannedEffort => &["Planned Effort", "Estimated Effort"],
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, MetadataField::Team | MetadataField::PlannedEffort)
    }

    /// Field whose alias list contains `label`
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.aliases().iter().any(|alias| header_matches(label, alias)))
    }
}

/// Header aliases of a work item column, in priority order
pub fn column_aliases(column: Column) -> &'static [&'static str] {
    match column {
        Column::Id => &["ID", "Work Item ID"],
        Column::WorkItemType => &["Work Item Type", "Type"],
        Column::State => &["State", "Status"],
        Column::AssignedTo => &["Assigned To", "Assignee"],
        Column::Effort => &["Effort", "Story Points", "Completed Work"],
        Column::Title => &["Title"],
        Column::Team => &["Team", "Area Path"],
        Column::OriginalEstimate => &["Original Estimate", "Estimate"],
        Column::CreatedDate => &["Created Date"],
        Column::ClosedDate => &["Closed Date"],
        Column::Addition => &["Addition", "MidSprint Addition", "Mid-Sprint Addition"],
        Column::Category => &["Category"],
    }
}

/// Columns of the Capacity sheet
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CapacityColumn {
    Name,
    Capacity,
    Team,
}

impl CapacityColumn {
    pub const ALL: [CapacityColumn; 3] = [CapacityColumn::Name, CapacityColumn::Capacity, CapacityColumn::Team];

    pub fn label(&self) -> &'static str {
        match self {
            CapacityColumn::Name => "Name",
            CapacityColumn::Capacity => "Capacity",
            CapacityColumn::Team => "Team",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CapacityColumn::Name => &["Name", "Team Member", "Staff", "Staff Name"],
            CapacityColumn::Capacity => &["Capacity", "Capacity (Days)", "Capacity (Hours)", "Available"],
            CapacityColumn::Team => &["Team"],
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, CapacityColumn::Team)
    }
}

/// Compare a header cell against an alias
pub fn header_matches(cell: &str, alias: &str) -> bool {
    let cell = cell.trim().trim_end_matches(':').trim();
    cell.eq_ignore_ascii_case(alias)
}

/// A header resolved to a sheet column
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedColumn {
    /// 1-based sheet column
    pub col: u32,
    /// Index of the alias that matched
    pub alias: usize,
}

/// Map logical columns to sheet columns by scanning one header row.
///
/// `aliases` yields the alias list of a logical column. Fails on the first
/// missing required column (in `columns` order) or on a repeated header.
pub fn resolve_headers<C, S>(
    source: &S,
    row: u32,
    columns: &[C],
    aliases: impl Fn(C) -> &'static [&'static str],
    label: impl Fn(C) -> &'static str,
    required: impl Fn(C) -> bool,
) -> Result<BTreeMap<C, ResolvedColumn>, SchemaError>
where
    C: Copy + Ord,
    S: CellSource + ?Sized,
{
    let mut resolved: BTreeMap<C, ResolvedColumn> = BTreeMap::new();

    for col in 1..=source.max_col() {
        let Some(header) = source.cell(row, col).as_text() else {
            continue;
        };
        for &column in columns {
            let Some(alias) = aliases(column).iter().position(|a| header_matches(&header, a)) else {
                continue;
            };
            match resolved.get(&column) {
                Some(existing) if existing.alias == alias => {
                    return Err(SchemaError::DuplicateColumn {
                        sheet: source.sheet_name().to_string(),
                        column: label(column),
                        row,
                    });
                }
                Some(existing) if existing.alias < alias => {}
                _ => {
                    resolved.insert(column, ResolvedColumn { col, alias });
                }
            }
            break;
        }
    }

    for &column in columns {
        if required(column) && !resolved.contains_key(&column) {
            return Err(SchemaError::MissingColumn {
                sheet: source.sheet_name().to_string(),
                column: label(column),
                row,
            });
        }
    }

    Ok(resolved)
}
