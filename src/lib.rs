//! Headless SaaS form and feedback widgets with a terminal showcase.
//!
//! The [`widgets`] module holds the reusable state machines: a multi-step
//! form controller, a file intake with simulated upload progress, a
//! verification code entry, a data table, and a notification center. The
//! remaining modules drive them from a ratatui terminal application.

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod logger;
pub mod state;
pub mod ui;
pub mod widgets;
