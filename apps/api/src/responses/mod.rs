// Like/dislike responses: one per (event, participant), plus the
// per-event and overall counts derived from them.

pub mod handlers;
pub mod models;
pub mod statistics;
pub mod store;
