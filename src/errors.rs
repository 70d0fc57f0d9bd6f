//! Errors raised by the aggregation engine.
//!
//! - [`EmptyInput`] every aggregate refuses an empty dataset.
//! - [`InsufficientData`] a top-N ranking was asked for more transactions than
//!   the dataset holds.
//!
//! [`EmptyInput`]: AggregationError::EmptyInput
//! [`InsufficientData`]: AggregationError::InsufficientData
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("cannot aggregate an empty transaction list")]
    EmptyInput,

    #[error("need at least {required} transactions, only {available} available")]
    InsufficientData { required: usize, available: usize },
}

pub type AggregationResult<T> = std::result::Result<T, AggregationError>;
