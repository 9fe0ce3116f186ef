use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::events::widget::{Event as WidgetEvent, WidgetEventSender};
use crate::logger::LogBuffer;
use crate::ui::Theme;
use crate::widgets::{
    DataTable, FileIntake, IncomingFile, NotificationCenter, OtpEntry, StepConfig, StepController,
    TableFeatures, TaskHandle, Transition, UploadStatus, WidgetError,
};
use clipboard::{ClipboardContext, ClipboardProvider};
use log::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

use super::demo::{
    customer_columns, fake_customers, onboarding_steps, step_fields, Customer, FormField,
    OnboardingForm, DEMO_VERIFICATION_CODE,
};
use super::error::StateError;
use super::navigation::{TableInput, View};

const CUSTOMER_COUNT: usize = 137;
const PLAN_CHECK_DELAY: Duration = Duration::from_millis(600);
const VERIFICATION_DELAY: Duration = Duration::from_millis(800);
const UPLOAD_ROUND_TRIP: Duration = Duration::from_millis(300);

pub type OnboardingController = StepController<OnboardingForm>;

/// Step transitions requested from the keyboard.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCommand {
    Next,
    Previous,
    Skip,
    Jump(usize),
}

/// Houses data representative of application state.
///
pub struct State {
    widget_sender: WidgetEventSender,
    current_view: View,
    theme: Theme,
    theme_changed: bool,
    log: LogBuffer,
    notifications: NotificationCenter,
    // Onboarding
    step_config: StepConfig,
    steps: Arc<AsyncMutex<OnboardingController>>,
    step_task: Option<TaskHandle>, // Transition currently awaiting validation
    step_field: usize,             // Focused field on the current step
    // Upload
    upload: FileIntake,
    path_input: String,
    upload_index: usize,
    // Verification
    otp: OtpEntry,
    verification: Option<TaskHandle>,
    // Customers
    table: DataTable<Customer>,
    table_row: usize,    // Cursor position on the current page
    table_column: usize, // Cursor position among visible columns
    table_input: Option<TableInput>,
}

impl State {
    /// Build every widget from the loaded configuration. Must be called
    /// inside a tokio runtime since several widgets start timers.
    ///
    pub fn new(config: &Config, log: LogBuffer, widget_sender: WidgetEventSender) -> AppResult<State> {
        let spec = &config.spec;
        let theme = Theme::from_name(&spec.theme_name).unwrap_or_else(|| {
            warn!("Unknown theme '{}', using default", spec.theme_name);
            Theme::default()
        });
        let step_config = spec.steps.to_step_config();
        let steps = build_onboarding(step_config.clone(), &widget_sender)?;

        let change_sender = widget_sender.clone();
        let upload_sender = widget_sender.clone();
        let upload = FileIntake::new(spec.upload.to_upload_config()?)
            .on_change(move |entries| {
                let uploading = entries
                    .iter()
                    .filter(|e| e.status == UploadStatus::Uploading)
                    .count();
                let _ = change_sender.send(WidgetEvent::FilesChanged {
                    total: entries.len(),
                    uploading,
                });
            })
            .on_upload(move |files: Vec<Arc<IncomingFile>>| {
                let sender = upload_sender.clone();
                let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
                async move {
                    tokio::time::sleep(UPLOAD_ROUND_TRIP).await;
                    sender
                        .send(WidgetEvent::UploadFinished(names))
                        .map_err(|e| anyhow::anyhow!("Upload listener gone: {}", e))
                }
            });

        let verify_sender = widget_sender.clone();
        let resend_sender = widget_sender.clone();
        let otp = OtpEntry::new(spec.otp.to_otp_config())?
            .on_verify(move |code| {
                let _ = verify_sender.send(WidgetEvent::VerifyCode(code.to_string()));
            })
            .on_resend(move || {
                let _ = resend_sender.send(WidgetEvent::ResendCode);
            });

        let click_sender = widget_sender.clone();
        let features = TableFeatures {
            searchable: true,
            filterable_columns: true,
            selectable: true,
            paginated: true,
        };
        let table = DataTable::new(customer_columns(), fake_customers(CUSTOMER_COUNT), features)?
            .with_page_sizes(spec.table.page_size_menu())
            .with_page_size(spec.table.default_page_size)
            .on_row_click(move |customer: &Customer| {
                let _ = click_sender.send(WidgetEvent::RowClicked(customer.clone()));
            });

        Ok(State {
            widget_sender,
            current_view: View::Steps,
            theme,
            theme_changed: false,
            log,
            notifications: NotificationCenter::new(spec.notifications.to_notification_config()),
            step_config,
            steps: Arc::new(AsyncMutex::new(steps)),
            step_task: None,
            step_field: 0,
            upload,
            path_input: String::new(),
            upload_index: 0,
            otp,
            verification: None,
            table,
            table_row: 0,
            table_column: 0,
            table_input: None,
        })
    }

    // Navigation and appearance

    pub fn current_view(&self) -> View {
        self.current_view
    }

    pub fn set_view(&mut self, view: View) -> &mut Self {
        debug!("Switching to view {:?}", view);
        self.current_view = view;
        self.table_input = None;
        self
    }

    pub fn next_view(&mut self) -> &mut Self {
        self.set_view(self.current_view.next())
    }

    pub fn previous_view(&mut self) -> &mut Self {
        self.set_view(self.current_view.previous())
    }

    /// Whether key presses are captured as text on the current view.
    ///
    pub fn is_text_entry(&self) -> bool {
        match self.current_view {
            View::Steps | View::Upload => true,
            View::Table => self.table_input.is_some(),
            View::Otp | View::Notifications => false,
        }
    }

    pub fn get_theme(&self) -> &Theme {
        &self.theme
    }

    /// Switch to the next available theme.
    ///
    pub fn cycle_theme(&mut self) -> &mut Self {
        let themes = Theme::available_themes();
        let position = themes.iter().position(|name| *name == self.theme.name).unwrap_or(0);
        let next = &themes[(position + 1) % themes.len()];
        if let Some(theme) = Theme::from_name(next) {
            info!("Theme set to {}", theme.name);
            self.theme = theme;
            self.theme_changed = true;
        }
        self
    }

    /// Name of the theme if it changed since the last call.
    ///
    pub fn take_theme_change(&mut self) -> Option<String> {
        if std::mem::take(&mut self.theme_changed) {
            Some(self.theme.name.clone())
        } else {
            None
        }
    }

    pub fn get_log(&self) -> &LogBuffer {
        &self.log
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Surface a failed action as a persistent toast.
    ///
    pub fn report_error(&self, title: &str, error: &AppError) {
        error!("{}: {}", title, error);
        self.notifications.error(title, Some(error.to_string()));
    }

    // Onboarding

    pub fn steps(&self) -> &Arc<AsyncMutex<OnboardingController>> {
        &self.steps
    }

    pub fn get_step_field(&self) -> usize {
        self.step_field
    }

    pub fn reset_step_field(&mut self) -> &mut Self {
        self.step_field = 0;
        self
    }

    /// Whether a transition is waiting on validation.
    ///
    pub fn is_step_transition_running(&self) -> bool {
        self.step_task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn focused_field(&self, controller: &OnboardingController) -> Option<FormField> {
        step_fields(controller.current_index()).get(self.step_field).copied()
    }

    pub fn next_step_field(&mut self) -> &mut Self {
        if let Ok(controller) = self.steps.try_lock() {
            let count = step_fields(controller.current_index()).len();
            if count > 0 {
                self.step_field = (self.step_field + 1) % count;
            }
        }
        self
    }

    pub fn previous_step_field(&mut self) -> &mut Self {
        if let Ok(controller) = self.steps.try_lock() {
            let count = step_fields(controller.current_index()).len();
            if count > 0 {
                self.step_field = (self.step_field + count - 1) % count;
            }
        }
        self
    }

    pub fn add_step_char(&mut self, c: char) -> &mut Self {
        if let Ok(mut controller) = self.steps.try_lock() {
            if let Some(field) = self.focused_field(&controller) {
                field.value_mut(controller.data_mut()).push(c);
            }
        }
        self
    }

    pub fn remove_step_char(&mut self) -> &mut Self {
        if let Ok(mut controller) = self.steps.try_lock() {
            if let Some(field) = self.focused_field(&controller) {
                field.value_mut(controller.data_mut()).pop();
            }
        }
        self
    }

    /// Run a transition in the background so the UI keeps drawing while an
    /// async validator is pending.
    ///
    pub fn request_step(&mut self, command: StepCommand) -> AppResult<()> {
        if self.is_step_transition_running() {
            return Err(StateError::TransitionInProgress.into());
        }
        let steps = Arc::clone(&self.steps);
        let task = TaskHandle::spawn(async move {
            let mut controller = steps.lock().await;
            let transition = match command {
                StepCommand::Next => controller.next_step().await,
                StepCommand::Previous => controller.prev_step(),
                StepCommand::Skip => controller.skip_step(),
                StepCommand::Jump(target) => controller.jump_to_step(target).await,
            };
            if transition == Transition::Blocked {
                debug!("Step {} did not validate", controller.current_index());
            }
        })?;
        self.step_task = Some(task);
        Ok(())
    }

    /// Start the onboarding form over with empty data.
    ///
    pub fn reset_onboarding(&mut self) -> AppResult<()> {
        let controller = build_onboarding(self.step_config.clone(), &self.widget_sender)?;
        self.step_task = None;
        self.steps = Arc::new(AsyncMutex::new(controller));
        self.step_field = 0;
        info!("Onboarding form reset");
        Ok(())
    }

    // Upload

    pub fn upload(&self) -> &FileIntake {
        &self.upload
    }

    pub fn get_path_input(&self) -> &str {
        &self.path_input
    }

    pub fn add_path_char(&mut self, c: char) -> &mut Self {
        self.path_input.push(c);
        self
    }

    pub fn remove_path_char(&mut self) -> &mut Self {
        self.path_input.pop();
        self
    }

    /// Read the typed path and add it to the upload list.
    ///
    pub fn submit_path(&mut self) -> AppResult<()> {
        let input = std::mem::take(&mut self.path_input);
        self.add_paths(&input)
    }

    /// Add every path in `text`, one per line. Terminals paste dropped files
    /// quoted or with escaped spaces.
    ///
    pub fn add_paths(&mut self, text: &str) -> AppResult<()> {
        let paths: Vec<PathBuf> = text
            .lines()
            .map(clean_dropped_path)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();
        if paths.is_empty() {
            return Ok(());
        }
        let files = paths
            .iter()
            .map(|path| read_file(path))
            .collect::<Result<Vec<IncomingFile>, StateError>>()?;
        let ids = self.upload.add_files(files)?;
        if ids.is_empty() {
            self.notifications
                .warning("Nothing added", Some("No file matched the accepted types".to_string()));
        }
        Ok(())
    }

    pub fn get_upload_index(&self) -> usize {
        self.upload_index
    }

    pub fn next_upload(&mut self) -> &mut Self {
        let count = self.upload.len();
        if count > 0 {
            self.upload_index = (self.upload_index + 1).min(count - 1);
        }
        self
    }

    pub fn previous_upload(&mut self) -> &mut Self {
        self.upload_index = self.upload_index.saturating_sub(1);
        self
    }

    pub fn remove_selected_upload(&mut self) -> &mut Self {
        let entries = self.upload.entries();
        if let Some(entry) = entries.get(self.upload_index) {
            info!("Removing upload '{}'", entry.file.name);
            self.upload.remove(&entry.id);
        }
        self.clamp_upload_index();
        self
    }

    pub fn clear_uploads(&mut self) -> &mut Self {
        self.upload.clear();
        self.upload_index = 0;
        self
    }

    pub fn clamp_upload_index(&mut self) -> &mut Self {
        self.upload_index = self.upload_index.min(self.upload.len().saturating_sub(1));
        self
    }

    // Verification

    pub fn otp(&self) -> &OtpEntry {
        &self.otp
    }

    pub fn otp_mut(&mut self) -> &mut OtpEntry {
        &mut self.otp
    }

    /// Fill the code cells from the system clipboard.
    ///
    pub fn paste_otp_from_clipboard(&mut self) -> AppResult<()> {
        let mut context: ClipboardContext =
            ClipboardProvider::new().map_err(|e| StateError::Clipboard(e.to_string()))?;
        let contents = context
            .get_contents()
            .map_err(|e| StateError::Clipboard(e.to_string()))?;
        let filled = self.otp.paste(&contents);
        debug!("Pasted {} digits from clipboard", filled);
        Ok(())
    }

    /// Check a submitted code against the demo code after a short delay.
    ///
    pub fn begin_verification(&mut self, code: String) -> AppResult<()> {
        self.otp.set_loading(true);
        self.otp.clear_error();
        let sender = self.widget_sender.clone();
        let task = TaskHandle::after(VERIFICATION_DELAY, move || {
            let accepted = code == DEMO_VERIFICATION_CODE;
            let _ = sender.send(WidgetEvent::VerificationResult { accepted });
        });
        match task {
            Ok(task) => {
                self.verification = Some(task);
                Ok(())
            }
            Err(e) => {
                self.otp.set_loading(false);
                Err(e.into())
            }
        }
    }

    pub fn finish_verification(&mut self, accepted: bool) -> &mut Self {
        self.verification = None;
        self.otp.set_loading(false);
        if accepted {
            info!("Verification code accepted");
            self.notifications
                .success("Verified", Some("Your email address is confirmed".to_string()));
        } else {
            warn!("Verification code rejected");
            self.otp.set_error("Invalid code. Please try again.");
        }
        self
    }

    // Customers

    pub fn table(&self) -> &DataTable<Customer> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut DataTable<Customer> {
        &mut self.table
    }

    pub fn get_table_row(&self) -> usize {
        self.table_row
    }

    pub fn get_table_column(&self) -> usize {
        self.table_column
    }

    pub fn get_table_input(&self) -> Option<&TableInput> {
        self.table_input.as_ref()
    }

    /// Identifier of the column under the cursor.
    ///
    pub fn focused_column_id(&self) -> Option<String> {
        self.table
            .columns()
            .get(self.table_column)
            .map(|c| c.id.clone())
    }

    pub fn move_table_row(&mut self, delta: isize) -> &mut Self {
        let count = self.table.page_indices().len();
        if count == 0 {
            self.table_row = 0;
        } else {
            let row = self.table_row as isize + delta;
            self.table_row = row.clamp(0, count as isize - 1) as usize;
        }
        self
    }

    pub fn move_table_column(&mut self, delta: isize) -> &mut Self {
        let count = self.table.columns().len() as isize;
        self.table_column = (self.table_column as isize + delta).rem_euclid(count.max(1)) as usize;
        self
    }

    /// Keep the cursor on the page after paging or filtering.
    ///
    pub fn clamp_table_row(&mut self) -> &mut Self {
        self.move_table_row(0)
    }

    pub fn start_table_search(&mut self) -> &mut Self {
        self.table_input = Some(TableInput::Search);
        self
    }

    pub fn start_column_filter(&mut self) -> &mut Self {
        if let Some(column) = self.table.columns().get(self.table_column) {
            if column.filterable {
                self.table_input = Some(TableInput::ColumnFilter(column.id.clone()));
            }
        }
        self
    }

    pub fn end_table_input(&mut self) -> &mut Self {
        self.table_input = None;
        self
    }

    /// Apply a keystroke to the filter being edited.
    ///
    pub fn edit_table_input(&mut self, edit: impl FnOnce(&mut String)) -> AppResult<()> {
        match self.table_input.clone() {
            Some(TableInput::Search) => {
                let mut query = self.table.global_filter().to_string();
                edit(&mut query);
                self.table.set_global_filter(query);
            }
            Some(TableInput::ColumnFilter(column)) => {
                let mut value = self.table.column_filter(&column).unwrap_or_default().to_string();
                edit(&mut value);
                self.table.set_column_filter(&column, value)?;
            }
            None => return Ok(()),
        }
        self.clamp_table_row();
        Ok(())
    }

    pub fn sort_focused_column(&mut self) -> AppResult<()> {
        if let Some(column) = self.focused_column_id() {
            let direction = self.table.toggle_sort(&column)?;
            debug!("Sorting by {}: {:?}", column, direction);
        }
        Ok(())
    }

    pub fn toggle_focused_column(&mut self) -> AppResult<()> {
        if let Some(column) = self.focused_column_id() {
            self.table.toggle_column_visibility(&column)?;
        }
        Ok(())
    }

    pub fn toggle_table_row_selection(&mut self) -> &mut Self {
        if let Some(index) = self.table.page_indices().get(self.table_row).copied() {
            self.table.toggle_selected(index);
        }
        self
    }

    pub fn click_table_row(&mut self) -> &mut Self {
        self.table.click_row(self.table_row);
        self
    }

    /// Cycle through the page size menu.
    ///
    pub fn cycle_page_size(&mut self, forward: bool) -> AppResult<()> {
        let sizes = self.table.page_sizes().to_vec();
        let position = sizes
            .iter()
            .position(|s| *s == self.table.page_size())
            .unwrap_or(0);
        let next = if forward {
            (position + 1) % sizes.len()
        } else {
            (position + sizes.len() - 1) % sizes.len()
        };
        self.table.set_page_size(sizes[next])?;
        self.clamp_table_row();
        Ok(())
    }
}

fn build_onboarding(config: StepConfig, sender: &WidgetEventSender) -> Result<OnboardingController, WidgetError> {
    let change_sender = sender.clone();
    let complete_sender = sender.clone();
    Ok(StepController::new(onboarding_steps(PLAN_CHECK_DELAY), OnboardingForm::default(), config)?
        .on_step_change(move |index, direction| {
            let _ = change_sender.send(WidgetEvent::StepChanged { index, direction });
        })
        .on_complete(move |form: &OnboardingForm| {
            let _ = complete_sender.send(WidgetEvent::FormCompleted(form.clone()));
        }))
}

/// Strip the quoting terminals add to dropped paths.
///
fn clean_dropped_path(line: &str) -> String {
    let trimmed = line.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
    match unquoted {
        Some(path) => path.to_string(),
        None => trimmed.replace("\\ ", " "),
    }
}

fn read_file(path: &Path) -> Result<IncomingFile, StateError> {
    IncomingFile::from_path(path).map_err(|source| StateError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}
