pub mod models;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use router::billing_routes;
