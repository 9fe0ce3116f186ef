use crate::error::AppResult;
use crate::state::{State, StepCommand, TableInput, View};
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::*;
use std::{thread, time::Duration};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Specify terminal event poll rate in milliseconds.
///
const TICK_RATE_IN_MS: u64 = 60;

/// Specify different terminal event types.
///
#[derive(Debug)]
pub enum Event<I> {
    Input(I),
    Paste(String),
    Tick,
}

pub type TerminalEvent = Event<KeyEvent>;

/// Spawn the input polling thread and return the receiving end of its
/// channel. The thread stops once the receiver is dropped.
///
pub fn spawn_poller() -> UnboundedReceiver<TerminalEvent> {
    let (tx, rx) = unbounded_channel();
    thread::spawn(move || {
        let tick_rate = Duration::from_millis(TICK_RATE_IN_MS);
        loop {
            let event = match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Some(Event::Input(key)),
                    Ok(CrosstermEvent::Paste(text)) => Some(Event::Paste(text)),
                    Ok(_) => None,
                    Err(e) => {
                        error!("Failed to read terminal event: {}", e);
                        break;
                    }
                },
                Ok(false) => Some(Event::Tick),
                Err(e) => {
                    error!("Failed to poll terminal events: {}", e);
                    break;
                }
            };
            if let Some(event) = event {
                if tx.send(event).is_err() {
                    break;
                }
            }
        }
    });
    rx
}

/// Handle a terminal event. Returns true if the application should continue
/// or false if exit was requested.
///
pub fn handle(event: TerminalEvent, state: &mut State) -> bool {
    match event {
        Event::Tick => true,
        Event::Paste(text) => {
            debug!("Processing paste of {} bytes...", text.len());
            if let Err(e) = paste(text, state) {
                state.report_error("Paste failed", &e);
            }
            true
        }
        Event::Input(key) => handle_key(key, state),
    }
}

fn handle_key(key: KeyEvent, state: &mut State) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => {
            debug!("Processing exit terminal event '{:?}'...", key);
            return false;
        }
        KeyCode::Char('q') if !ctrl && !state.is_text_entry() => {
            debug!("Processing exit terminal event '{:?}'...", key);
            return false;
        }
        KeyCode::Char('t') if ctrl => {
            state.cycle_theme();
            return true;
        }
        KeyCode::Tab => {
            state.next_view();
            return true;
        }
        KeyCode::BackTab => {
            state.previous_view();
            return true;
        }
        _ => {}
    }

    let result = match state.current_view() {
        View::Steps => steps_key(key, state),
        View::Upload => upload_key(key, state),
        View::Otp => otp_key(key, state),
        View::Table => table_key(key, state),
        View::Notifications => {
            notifications_key(key, state);
            Ok(())
        }
    };
    if let Err(e) = result {
        state.report_error("Action failed", &e);
    }
    true
}

fn paste(text: String, state: &mut State) -> AppResult<()> {
    match state.current_view() {
        View::Upload => state.add_paths(&text),
        View::Otp => {
            state.otp_mut().paste(&text);
            Ok(())
        }
        View::Steps => {
            text.chars().filter(|c| !c.is_control()).for_each(|c| {
                state.add_step_char(c);
            });
            Ok(())
        }
        View::Table => {
            let line: String = text.chars().filter(|c| !c.is_control()).collect();
            state.edit_table_input(|value| value.push_str(&line))
        }
        View::Notifications => Ok(()),
    }
}

fn steps_key(key: KeyEvent, state: &mut State) -> AppResult<()> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('s') if ctrl => state.request_step(StepCommand::Skip)?,
        KeyCode::Char('r') if ctrl => state.reset_onboarding()?,
        KeyCode::Char(c) if !ctrl => {
            state.add_step_char(c);
        }
        KeyCode::Backspace => {
            state.remove_step_char();
        }
        KeyCode::Down => {
            state.next_step_field();
        }
        KeyCode::Up => {
            state.previous_step_field();
        }
        KeyCode::Enter | KeyCode::PageDown => state.request_step(StepCommand::Next)?,
        KeyCode::PageUp => state.request_step(StepCommand::Previous)?,
        KeyCode::F(n) if (1..=9).contains(&n) => state.request_step(StepCommand::Jump(n as usize - 1))?,
        _ => {}
    }
    Ok(())
}

fn upload_key(key: KeyEvent, state: &mut State) -> AppResult<()> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('l') if ctrl => {
            state.clear_uploads();
        }
        KeyCode::Char(c) if !ctrl => {
            state.add_path_char(c);
        }
        KeyCode::Backspace => {
            state.remove_path_char();
        }
        KeyCode::Enter => state.submit_path()?,
        KeyCode::Down => {
            state.next_upload();
        }
        KeyCode::Up => {
            state.previous_upload();
        }
        KeyCode::Delete => {
            state.remove_selected_upload();
        }
        _ => {}
    }
    Ok(())
}

fn otp_key(key: KeyEvent, state: &mut State) -> AppResult<()> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('v') if ctrl => state.paste_otp_from_clipboard()?,
        KeyCode::Char('r') => {
            if let Err(e) = state.otp_mut().resend() {
                info!("{}", e);
            }
        }
        KeyCode::Char(c) if c.is_ascii_digit() => {
            state.otp_mut().type_char(c);
        }
        KeyCode::Backspace => state.otp_mut().backspace(),
        KeyCode::Left => state.otp_mut().focus_left(),
        KeyCode::Right => state.otp_mut().focus_right(),
        KeyCode::Enter => state.otp_mut().verify()?,
        _ => {}
    }
    Ok(())
}

fn table_key(key: KeyEvent, state: &mut State) -> AppResult<()> {
    if state.get_table_input().is_some() {
        return table_input_key(key, state);
    }
    match key.code {
        KeyCode::Char('/') => {
            state.start_table_search();
        }
        KeyCode::Char('f') => {
            state.start_column_filter();
        }
        KeyCode::Char('c') => {
            state.table_mut().clear_filters();
            state.clamp_table_row();
        }
        KeyCode::Char('s') => state.sort_focused_column()?,
        KeyCode::Char('v') => state.toggle_focused_column()?,
        KeyCode::Char(' ') => {
            state.toggle_table_row_selection();
        }
        KeyCode::Char('a') => state.table_mut().toggle_page_selected(),
        KeyCode::Char('x') => state.table_mut().clear_selection(),
        KeyCode::Enter => {
            state.click_table_row();
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.move_table_row(1);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.move_table_row(-1);
        }
        KeyCode::Left | KeyCode::Char('h') => {
            state.move_table_column(-1);
        }
        KeyCode::Right | KeyCode::Char('l') => {
            state.move_table_column(1);
        }
        KeyCode::Char('n') | KeyCode::PageDown => {
            state.table_mut().next_page();
            state.clamp_table_row();
        }
        KeyCode::Char('p') | KeyCode::PageUp => {
            state.table_mut().previous_page();
            state.clamp_table_row();
        }
        KeyCode::Char('g') | KeyCode::Home => {
            state.table_mut().first_page();
            state.clamp_table_row();
        }
        KeyCode::Char('G') | KeyCode::End => {
            state.table_mut().last_page();
            state.clamp_table_row();
        }
        KeyCode::Char('+') => state.cycle_page_size(true)?,
        KeyCode::Char('-') => state.cycle_page_size(false)?,
        _ => {}
    }
    Ok(())
}

fn table_input_key(key: KeyEvent, state: &mut State) -> AppResult<()> {
    match key.code {
        KeyCode::Enter | KeyCode::Esc => {
            state.end_table_input();
        }
        KeyCode::Backspace => state.edit_table_input(|value| {
            value.pop();
        })?,
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.edit_table_input(|value| value.push(c))?
        }
        _ => {}
    }
    if let Some(TableInput::ColumnFilter(column)) = state.get_table_input() {
        trace!("Editing filter for column {}", column);
    }
    Ok(())
}

fn notifications_key(key: KeyEvent, state: &mut State) {
    let center = state.notifications();
    match key.code {
        KeyCode::Char('s') => {
            center.success("Changes saved", Some("Your profile was updated".to_string()));
        }
        KeyCode::Char('e') => {
            center.error("Payment failed", Some("The card on file was declined".to_string()));
        }
        KeyCode::Char('w') => {
            center.warning("Storage almost full", Some("You have used 90% of your quota".to_string()));
        }
        KeyCode::Char('i') => {
            center.info("New feature", Some("Dark mode is now available".to_string()));
        }
        KeyCode::Char('d') => {
            if let Some(newest) = center.notifications().first() {
                center.remove(&newest.id);
            }
        }
        KeyCode::Char('x') => center.clear(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::logger::LogBuffer;

    fn test_state() -> State {
        let (tx, _rx) = unbounded_channel();
        let mut config = Config::new();
        config.spec.steps.auto_save = false;
        State::new(&config, LogBuffer::new(), tx).unwrap()
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> TerminalEvent {
        Event::Input(KeyEvent::new(code, modifiers))
    }

    fn press(code: KeyCode) -> TerminalEvent {
        key(code, KeyModifiers::NONE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ctrl_c_exits() {
        let mut state = test_state();
        assert!(handle(Event::Tick, &mut state));
        assert!(!handle(key(KeyCode::Char('c'), KeyModifiers::CONTROL), &mut state));
    }

    #[tokio::test(start_paused = true)]
    async fn test_q_is_text_on_form_views() {
        let mut state = test_state();
        assert!(handle(press(KeyCode::Char('q')), &mut state));
        assert_eq!(state.steps().lock().await.data().name, "q");

        state.set_view(View::Notifications);
        assert!(!handle(press(KeyCode::Char('q')), &mut state));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tab_switches_views() {
        let mut state = test_state();
        handle(press(KeyCode::Tab), &mut state);
        assert_eq!(state.current_view(), View::Upload);
        handle(press(KeyCode::BackTab), &mut state);
        handle(press(KeyCode::BackTab), &mut state);
        assert_eq!(state.current_view(), View::Notifications);
    }

    #[tokio::test(start_paused = true)]
    async fn test_otp_keys() {
        let mut state = test_state();
        state.set_view(View::Otp);
        for c in ['4', 'x', '2'] {
            handle(press(KeyCode::Char(c)), &mut state);
        }
        handle(press(KeyCode::Backspace), &mut state);
        handle(press(KeyCode::Backspace), &mut state);
        assert_eq!(state.otp().cells()[0], Some('4'));
        assert_eq!(state.otp().cells()[1], None);

        handle(press(KeyCode::Enter), &mut state);
        assert_eq!(state.notifications().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paste_on_otp_view() {
        let mut state = test_state();
        state.set_view(View::Otp);
        handle(Event::Paste("12-34 56".to_string()), &mut state);
        assert!(state.otp().is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_table_search_captures_keys() {
        let mut state = test_state();
        state.set_view(View::Table);
        handle(press(KeyCode::Char('/')), &mut state);
        handle(press(KeyCode::Char('q')), &mut state);
        assert_eq!(state.table().global_filter(), "q");
        handle(press(KeyCode::Esc), &mut state);
        assert!(state.get_table_input().is_none());

        handle(press(KeyCode::Char('+')), &mut state);
        assert_eq!(state.table().page_size(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notification_keys() {
        let mut state = test_state();
        state.set_view(View::Notifications);
        for c in ['s', 'e', 'w', 'i'] {
            handle(press(KeyCode::Char(c)), &mut state);
        }
        assert_eq!(state.notifications().len(), 4);
        handle(press(KeyCode::Char('d')), &mut state);
        assert_eq!(state.notifications().notifications()[0].title, "Storage almost full");
        handle(press(KeyCode::Char('x')), &mut state);
        assert!(state.notifications().is_empty());
    }
}
