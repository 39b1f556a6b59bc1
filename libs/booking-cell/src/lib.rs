pub mod models;
pub mod error;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use error::*;
pub use router::booking_routes;
