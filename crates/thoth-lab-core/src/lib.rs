pub mod adviser;
pub mod error;
pub mod export;
pub mod flatten;
pub mod inspection;
pub mod json_structure;
pub mod solver;
pub mod statistics;
pub mod timestamps;

pub use error::{LabError, Result};
