// All repository functions are generic over `E: Executor<'e, Database = Postgres>`
// so they accept both a `&PgPool` (direct query) and a `&mut Transaction` (atomic operations).

pub mod attempt;
pub mod connection;
pub mod flashcard;
pub mod quiz;
pub mod section;
pub mod token;
pub mod user;
