pub mod dto;
pub mod handlers;
pub mod pipeline;
pub mod services;

pub use handlers::routes as router;
