// Handlers behind the JWT middleware.
//
// Resource handlers are generic over `Resource`; the router attaches the concrete
// resource to each route as a request extension, so one handler serves
// /api/locations, /api/products, /api/stocks, /api/categories and /api/books.
pub mod data;
pub mod feedback;

pub use data::{record_get, resource_list};
pub use feedback::name_feedback;
