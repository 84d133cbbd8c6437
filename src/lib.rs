//! taskcanvas: backend for a visual task manager. A task repository
//! over a hosted table store, canvas/board/calendar projections, and an
//! AI assistant that turns free text into executed task actions.

pub mod ai;
pub mod board;
pub mod cache;
pub mod canvas;
pub mod chat;
pub mod config;
pub mod errors;
pub mod models;
pub mod notify;
pub mod repo;
pub mod server;
pub mod store;
pub mod util;
