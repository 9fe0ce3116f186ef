use super::{footer, log, notifications, otp, steps, table, tabs, toasts, upload, Frame};
use crate::state::{State, View};
use ratatui::layout::{Constraint, Direction, Layout, Rect};

const TABS_HEIGHT: u16 = 3;
const LOG_HEIGHT: u16 = 8;
const FOOTER_HEIGHT: u16 = 1;

/// Render the whole screen according to state.
///
pub fn all(frame: &mut Frame, state: &mut State) {
    let size = frame.size();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(TABS_HEIGHT),
            Constraint::Min(10),
            Constraint::Length(LOG_HEIGHT),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .split(size);

    tabs(frame, rows[0], state);
    main(frame, rows[1], state);
    log(frame, rows[2], state);
    footer(frame, rows[3], state);

    // Toasts sit above every view
    toasts(frame, size, state);
}

fn main(frame: &mut Frame, size: Rect, state: &mut State) {
    match state.current_view() {
        View::Steps => steps::steps(frame, size, state),
        View::Upload => upload::upload(frame, size, state),
        View::Otp => otp::otp(frame, size, state),
        View::Table => table::table(frame, size, state),
        View::Notifications => notifications::notifications(frame, size, state),
    }
}
