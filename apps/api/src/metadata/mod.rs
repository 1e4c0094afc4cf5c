// Per-event metadata (image reference, category, notes) and display-image
// resolution built on top of it.

pub mod handlers;
pub mod images;
pub mod models;
pub mod store;
