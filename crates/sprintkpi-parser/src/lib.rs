//! # sprintkpi-parser
//!
//! Extractor for the input sheets of a sprint tracking workbook.
//!
//! The Data sheet holds labeled sprint metadata in rows 3-10 and an Azure
//! DevOps work item export whose header sits on row 21. The Capacity sheet
//! holds one row per staff member below a header on row 1.
//!
//! Extraction only checks layout: missing metadata or missing required
//! headers fail here, while row-level problems are left to validation.
//!
//! ## Example
//!
//! ```rust
//! use sprintkpi_core::Grid;
//! use sprintkpi_parser::extract;
//!
//! let mut data = Grid::new("Data");
//! data.set_row(3, 1, ["Sprint Name", "Sprint 5"]);
//! data.set_row(4, 1, ["Sprint Number", "5"]);
//! data.set_row(5, 1, ["Start Date", "2025-03-03"]);
//! data.set_row(6, 1, ["End Date", "2025-03-14"]);
//! data.set_row(21, 1, ["ID", "Work Item Type", "State", "Assigned To", "Effort"]);
//! data.set_row(22, 1, ["1", "Task", "Done", "Maria", "3"]);
//!
//! let mut capacity = Grid::new("Capacity");
//! capacity.set_row(1, 1, ["Name", "Capacity"]);
//! capacity.set_row(2, 1, ["Maria", "8"]);
//!
//! let extraction = extract(&data, &capacity).unwrap();
//! assert_eq!(extraction.metadata.sprint_number, 5);
//! assert_eq!(extraction.items.len(), 1);
//! assert_eq!(extraction.capacity.len(), 1);
//! ```

pub mod capacity;
pub mod metadata;
pub mod schema;
pub mod table;

pub use capacity::extract_capacity;
pub use metadata::extract_metadata;
pub use table::extract_work_items;

use sprintkpi_core::{CellSource, MetadataError, ProcessError, RawCapacityRow, RawWorkItem, SchemaError, SprintMetadata};
use thiserror::Error;

/// Everything read from the input sheets
#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    pub metadata: SprintMetadata,
    pub items: Vec<RawWorkItem>,
    pub capacity: Vec<RawCapacityRow>,
}

/// Extraction failure
#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<ExtractError> for ProcessError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Metadata(e) => ProcessError::Metadata(e),
            ExtractError::Schema(e) => ProcessError::Schema(e),
        }
    }
}

/// Read sprint metadata, work items and capacity rows
pub fn extract<D, C>(data: &D, capacity: &C) -> Result<Extraction, ExtractError>
where
    D: CellSource + ?Sized,
    C: CellSource + ?Sized,
{
    let metadata = extract_metadata(data)?;
    let items = extract_work_items(data)?;
    let capacity = extract_capacity(capacity)?;

    tracing::info!(
        sprint = %metadata.sprint_name,
        work_items = items.len(),
        capacity_rows = capacity.len(),
        "extracted sprint data"
    );

    Ok(Extraction {
        metadata,
        items,
        capacity,
    })
}
