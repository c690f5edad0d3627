//! HTTP adapters - REST endpoints and the top-level router.

pub mod answers;
pub mod health;
pub mod router;

pub use answers::answer_routes;
pub use health::health_routes;
pub use router::app_router;
