use super::Frame;
use crate::state::{State, View};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

const GLOBAL_HINTS: &str = "Tab: next view, Ctrl+T: theme, Ctrl+C: quit";

/// Key hints for the current view.
///
fn hints_for_view(state: &State) -> &'static str {
    match state.current_view() {
        View::Steps => "Type to edit, Up/Down: field, Enter: next, PgUp: back, F1-F4: jump, Ctrl+S: skip, Ctrl+R: restart",
        View::Upload => "Type or drop a path, Enter: add, Up/Down: select, Del: remove, Ctrl+L: clear",
        View::Otp => "0-9: digit, Left/Right: move, Backspace: delete, Enter: verify, Ctrl+V: paste, r: resend",
        View::Table if state.get_table_input().is_some() => "Type to filter, Enter/Esc: done",
        View::Table => "/: search, f: filter column, c: clear, s: sort, v: hide/show, Space/a/x: select, Enter: open, n/p/g/G: page, +/-: size",
        View::Notifications => "s/e/w/i: add toast, d: dismiss newest, x: clear all",
    }
}

/// Render footer widget according to state.
///
pub fn footer(frame: &mut Frame, size: Rect, state: &mut State) {
    let theme = state.get_theme();
    let mode = if state.is_text_entry() { " INPUT " } else { " NORMAL " };
    let line = Line::from(vec![
        Span::styled(
            mode,
            Style::default()
                .bg(theme.highlight_bg.to_color())
                .fg(theme.highlight_fg.to_color())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} | {}", hints_for_view(state), GLOBAL_HINTS),
            Style::default().fg(theme.text_muted.to_color()),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), size);
}
