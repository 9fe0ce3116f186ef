//! Event handling module.
//!
//! This module contains handlers for different types of events:
//! - Terminal events: key presses, pastes and ticks from crossterm
//! - Widget events: callbacks and timers raised by the widgets

pub mod terminal;
pub mod widget;
