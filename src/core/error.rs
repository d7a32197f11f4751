use thiserror::Error;

use super::types::PayoutOption;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown product identifier: {0}")]
    UnknownProduct(String),

    #[error("unknown state of residence: {0}")]
    UnknownState(String),

    #[error("product {product_id} does not offer the {option:?} payout option")]
    UnsupportedPayoutOption {
        product_id: String,
        option: PayoutOption,
    },

    #[error("product {product_id} has no roll-up option named {option}")]
    UnknownRollUpOption { product_id: String, option: String },
}

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
