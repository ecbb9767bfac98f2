// Link shortener service: the entry module a built unit launches.

pub mod app;
pub mod codes;
pub mod store;

pub use app::{build_router, AppState};
pub use store::LocalLinkStore;
