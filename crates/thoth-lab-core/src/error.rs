// crates/thoth-lab-core/src/error.rs

use thiserror::Error;
use thoth_lab_store::StoreError;

use crate::adviser::{AggregateError, ExtractError};
use crate::flatten::FlattenError;
use crate::inspection::InspectionError;
use crate::json_structure::StructureError;
use crate::solver::SolverError;
use crate::statistics::StatisticsError;

#[derive(Error, Debug)]
pub enum LabError {
    #[error("result store failed: {0}")]
    Store(#[from] StoreError),

    #[error("justification extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("flattening failed: {0}")]
    Flatten(#[from] FlattenError),

    #[error("structure listing failed: {0}")]
    Structure(#[from] StructureError),

    #[error("inspection processing failed: {0}")]
    Inspection(#[from] InspectionError),

    #[error("solver report processing failed: {0}")]
    Solver(#[from] SolverError),

    #[error("statistics failed: {0}")]
    Statistics(#[from] StatisticsError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LabError>;
