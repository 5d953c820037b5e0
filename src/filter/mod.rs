pub mod types;
pub mod filter;
pub mod filter_order;
pub mod filter_page;
pub mod error;

pub use types::*;
pub use filter::Filter;
pub use filter_order::FilterOrder;
pub use filter_page::{paginate, parse_page, total_pages};
pub use error::FilterError;
