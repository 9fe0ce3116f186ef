use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::events::terminal as terminal_events;
use crate::events::widget::{Handler as WidgetEventHandler, WidgetEventReceiver};
use crate::logger::{self, LogBuffer};
use crate::state::State;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::*;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{stdout, Stdout};
use tokio::sync::mpsc::unbounded_channel;

type ShowcaseTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Oversees event processing, state management, and terminal output.
///
pub struct App {
    config: Config,
    log: LogBuffer,
}

impl App {
    /// Start a new application according to the given configuration. Returns
    /// the result of the application execution.
    ///
    pub async fn start(config: Config, level: LevelFilter) -> AppResult<()> {
        let log = LogBuffer::new();
        logger::init(&log, level)?;

        info!("Starting application...");
        if let Some(path) = config.file_path() {
            debug!("Using configuration at {}", path.display());
        }
        let mut app = App { config, log };
        let result = app.start_ui().await;
        info!("Exiting application...");
        result
    }

    /// Set up the terminal, run the render loop and restore the terminal
    /// whatever the outcome.
    ///
    async fn start_ui(&mut self) -> AppResult<()> {
        debug!("Starting user interface on main thread...");
        let (widget_sender, mut widget_receiver) = unbounded_channel();
        let mut state = State::new(&self.config, self.log.clone(), widget_sender)?;

        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
        enable_raw_mode()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;

        let result = self.run(&mut terminal, &mut state, &mut widget_receiver).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)?;
        terminal.show_cursor()?;
        result
    }

    /// Draw, then wait for the next terminal or widget event. Returns once
    /// exit is requested.
    ///
    async fn run(
        &mut self,
        terminal: &mut ShowcaseTerminal,
        state: &mut State,
        widget_receiver: &mut WidgetEventReceiver,
    ) -> AppResult<()> {
        let mut terminal_receiver = terminal_events::spawn_poller();
        state.notifications().info(
            "Welcome to Launchkit",
            Some("Press Tab to move between widgets".to_string()),
        );

        loop {
            terminal.draw(|frame| crate::ui::render(frame, state))?;
            tokio::select! {
                event = terminal_receiver.recv() => match event {
                    Some(event) => {
                        if !terminal_events::handle(event, state) {
                            debug!("Received application exit request.");
                            break;
                        }
                    }
                    None => return Err(AppError::Terminal("Input polling stopped".to_string())),
                },
                Some(event) = widget_receiver.recv() => WidgetEventHandler::new(state).handle(event),
            }

            if let Some(theme_name) = state.take_theme_change() {
                self.config.spec.theme_name = theme_name;
                if let Err(e) = self.config.save() {
                    error!("Failed to save config: {}", e);
                }
            }
        }
        Ok(())
    }
}
