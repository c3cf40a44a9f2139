pub mod join_code;
pub mod routes;

pub use routes::routes;
