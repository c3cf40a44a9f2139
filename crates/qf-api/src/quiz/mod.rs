pub mod access;
pub mod model;
pub mod routes;

pub use routes::routes;
