//! HTTP request handlers.

pub mod auth_handler;
pub mod health_handler;
pub mod parcel_handler;
pub mod track_handler;
pub mod user_handler;

pub use auth_handler::auth_routes;
pub use health_handler::health_routes;
pub use parcel_handler::parcel_routes;
pub use track_handler::track_routes;
pub use user_handler::user_routes;
