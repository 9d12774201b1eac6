//! MediBot - a personal health assistant web application.
//!
//! Serves a landing page and four route groups (auth, chatbot, dashboard,
//! health tracker) over a document database, plus a background service that
//! sends medication reminders. The binary in `main.rs` wires these together.

pub mod chatbot;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod middleware;
pub mod password;
pub mod reminder;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
pub mod templates;
