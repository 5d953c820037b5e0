use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Order nesting exceeds {0} levels")]
    OrderTooDeep(usize),

    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),

    #[error("Invalid page: {0}")]
    InvalidPage(String),
}
