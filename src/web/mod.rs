pub mod handlers;
pub mod routes;
pub mod templates;
pub mod view;

pub use routes::create_router;
