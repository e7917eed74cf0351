pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod pending;
pub mod preferences;
pub mod routes;

pub use routes::create_router;
