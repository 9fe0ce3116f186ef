//! Reusable UI widget components.
//!
//! This module contains styling helpers shared by the render modules.

pub mod styling;
