//! Application state management module.
//!
//! This module contains the core state management for the showcase, including:
//! - Main `State` struct that owns every widget
//! - Navigation types (View, TableInput)
//! - Sample onboarding form and customer data
//! - State error handling

pub mod demo;
mod error;
mod navigation;

pub use error::StateError;
pub use navigation::{TableInput, View};

#[path = "state_impl.rs"]
mod state_impl;

pub use state_impl::{OnboardingController, State, StepCommand};
