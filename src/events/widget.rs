use crate::state::demo::{Customer, OnboardingForm};
use crate::state::State;
use crate::widgets::Direction;
use log::*;

pub type WidgetEventSender = tokio::sync::mpsc::UnboundedSender<Event>;
pub type WidgetEventReceiver = tokio::sync::mpsc::UnboundedReceiver<Event>;

/// Specify events raised by widget callbacks and timers.
///
#[derive(Debug, Clone)]
pub enum Event {
    StepChanged { index: usize, direction: Direction },
    FormCompleted(OnboardingForm),
    FilesChanged { total: usize, uploading: usize },
    UploadFinished(Vec<String>),
    VerifyCode(String),
    VerificationResult { accepted: bool },
    ResendCode,
    RowClicked(Customer),
}

/// Specify struct for applying widget events to state.
///
pub struct Handler<'a> {
    state: &'a mut State,
}

impl<'a> Handler<'a> {
    /// Return new instance with reference to state.
    ///
    pub fn new(state: &'a mut State) -> Self {
        Handler { state }
    }

    /// Handle widget events by type.
    ///
    pub fn handle(&mut self, event: Event) {
        debug!("Processing widget event '{:?}'...", event);
        match event {
            Event::StepChanged { index, direction } => self.step_changed(index, direction),
            Event::FormCompleted(form) => self.form_completed(form),
            Event::FilesChanged { total, uploading } => {
                debug!("{} files listed, {} uploading", total, uploading);
                self.state.clamp_upload_index();
            }
            Event::UploadFinished(names) => self.upload_finished(names),
            Event::VerifyCode(code) => self.verify_code(code),
            Event::VerificationResult { accepted } => {
                self.state.finish_verification(accepted);
            }
            Event::ResendCode => {
                info!("Verification code resent");
                self.state
                    .notifications()
                    .info("Code sent", Some("Check your inbox for a new code".to_string()));
            }
            Event::RowClicked(customer) => self.row_clicked(customer),
        }
    }

    fn step_changed(&mut self, index: usize, direction: Direction) {
        info!("Onboarding moved {:?} to step {}", direction, index + 1);
        self.state.reset_step_field();
    }

    fn form_completed(&mut self, form: OnboardingForm) {
        info!("Onboarding submitted for {} <{}>", form.name, form.email);
        self.state.notifications().success(
            "Workspace ready",
            Some(format!("Welcome aboard, {}! You're on the {} plan.", form.name, form.plan)),
        );
    }

    fn upload_finished(&mut self, names: Vec<String>) {
        info!("Uploaded {}", names.join(", "));
        let title = match names.len() {
            1 => "File uploaded".to_string(),
            n => format!("{} files uploaded", n),
        };
        self.state.notifications().success(title, Some(names.join(", ")));
    }

    fn verify_code(&mut self, code: String) {
        if let Err(e) = self.state.begin_verification(code) {
            self.state.report_error("Verification failed", &e);
        }
    }

    fn row_clicked(&mut self, customer: Customer) {
        info!("Opened customer #{} {}", customer.id, customer.name);
        self.state.notifications().info(
            customer.name.clone(),
            Some(format!("{} · {} · {} seats", customer.company, customer.plan, customer.seats)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::logger::LogBuffer;
    use tokio::sync::mpsc::unbounded_channel;

    fn test_state() -> (State, WidgetEventReceiver) {
        let (tx, rx) = unbounded_channel();
        let mut config = Config::new();
        config.spec.steps.auto_save = false;
        (State::new(&config, LogBuffer::new(), tx).unwrap(), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_form_completed_raises_toast() {
        let (mut state, _rx) = test_state();
        let form = OnboardingForm {
            name: "Ada".to_string(),
            plan: "Pro".to_string(),
            ..OnboardingForm::default()
        };
        Handler::new(&mut state).handle(Event::FormCompleted(form));
        let toasts = state.notifications().notifications();
        assert_eq!(toasts.len(), 1);
        assert!(toasts[0].message.as_deref().unwrap_or_default().contains("Pro plan"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_finished_title() {
        let (mut state, _rx) = test_state();
        Handler::new(&mut state).handle(Event::UploadFinished(vec!["a.png".to_string(), "b.pdf".to_string()]));
        assert_eq!(state.notifications().notifications()[0].title, "2 files uploaded");
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_code_starts_loading() {
        let (mut state, mut rx) = test_state();
        Handler::new(&mut state).handle(Event::VerifyCode("123456".to_string()));
        assert!(state.otp().is_loading());

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::VerificationResult { accepted: true }));
        Handler::new(&mut state).handle(event);
        assert!(!state.otp().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_changed_resets_field_focus() {
        let (mut state, _rx) = test_state();
        state.next_step_field();
        assert_eq!(state.get_step_field(), 1);
        Handler::new(&mut state).handle(Event::StepChanged {
            index: 1,
            direction: Direction::Forward,
        });
        assert_eq!(state.get_step_field(), 0);
    }
}
