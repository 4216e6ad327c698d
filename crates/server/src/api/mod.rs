pub mod audit;
pub mod batch;
pub mod cases;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pricing;
pub mod routes;

pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
