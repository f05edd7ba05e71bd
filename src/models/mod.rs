pub mod case;
pub mod dilemma;
pub mod enums;
pub mod report;

pub use case::*;
pub use dilemma::*;
pub use enums::*;
pub use report::*;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid value '{value}' for {field}")]
    InvalidEnum { field: String, value: String },
    #[error("{0}")]
    Validation(String),
}
