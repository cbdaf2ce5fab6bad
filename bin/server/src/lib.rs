//! staffdesk web server.
//!
//! Serves the staff dashboard shell: resolves each request's session
//! against the backend, enforces section access before any page or API
//! handler runs, and exposes the sidebar as JSON.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod pages;
