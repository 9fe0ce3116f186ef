//! One-time-code entry.
//!
//! Six single-digit cells with a moving focus. Typing advances the focus,
//! backspace on an empty cell steps back, pasting fills the cells from the
//! start. Completing the code triggers verification once; a one-second
//! countdown gates the resend action.

use super::timer::TaskHandle;
use super::WidgetError;
use log::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const OTP_LENGTH: usize = 6;

const DEFAULT_RESEND_COUNTDOWN_SECS: u32 = 60;
const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

type VerifyCallback = Box<dyn FnMut(&str) + Send>;
type ResendCallback = Box<dyn FnMut() + Send>;

#[derive(Debug, Clone)]
pub struct OtpConfig {
    pub resend_countdown_secs: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        OtpConfig {
            resend_countdown_secs: DEFAULT_RESEND_COUNTDOWN_SECS,
        }
    }
}

/// OTP entry widget state.
///
pub struct OtpEntry {
    cells: [Option<char>; OTP_LENGTH],
    focus: usize,
    loading: bool,
    error: Option<String>,
    // Set once verification fired for the current completion; cleared as soon
    // as any cell is emptied or changed, or a full code is pasted.
    verification_sent: bool,
    countdown_secs: u32,
    remaining: Arc<AtomicU32>,
    countdown: Option<TaskHandle>,
    on_verify: Option<VerifyCallback>,
    on_resend: Option<ResendCallback>,
}

impl OtpEntry {
    /// Create an empty entry and start the resend countdown.
    ///
    pub fn new(config: OtpConfig) -> Result<Self, WidgetError> {
        let mut entry = OtpEntry {
            cells: [None; OTP_LENGTH],
            focus: 0,
            loading: false,
            error: None,
            verification_sent: false,
            countdown_secs: config.resend_countdown_secs,
            remaining: Arc::new(AtomicU32::new(config.resend_countdown_secs)),
            countdown: None,
            on_verify: None,
            on_resend: None,
        };
        entry.restart_countdown()?;
        Ok(entry)
    }

    pub fn on_verify<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_verify = Some(Box::new(callback));
        self
    }

    pub fn on_resend<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_resend = Some(Box::new(callback));
        self
    }

    /// Enter `value` into cell `index`. Only digits are taken; the focus then
    /// moves to the next cell.
    ///
    pub fn input(&mut self, index: usize, value: char) -> bool {
        if self.loading || index >= OTP_LENGTH || !value.is_ascii_digit() {
            return false;
        }
        if self.cells[index] != Some(value) {
            self.verification_sent = false;
        }
        self.cells[index] = Some(value);
        if index < OTP_LENGTH - 1 {
            self.focus = index + 1;
        } else {
            self.focus = index;
        }
        self.check_completion();
        true
    }

    /// Enter a character into the focused cell.
    ///
    pub fn type_char(&mut self, value: char) -> bool {
        self.input(self.focus, value)
    }

    /// Clear the focused cell, or step back when it is already empty.
    ///
    pub fn backspace(&mut self) {
        if self.loading {
            return;
        }
        if self.cells[self.focus].is_some() {
            self.cells[self.focus] = None;
            self.verification_sent = false;
        } else if self.focus > 0 {
            self.focus -= 1;
        }
    }

    /// Fill cells from the first one with the digits of `text`.
    ///
    pub fn paste(&mut self, text: &str) -> usize {
        if self.loading {
            return 0;
        }
        let digits: Vec<char> = text
            .chars()
            .filter(char::is_ascii_digit)
            .take(OTP_LENGTH)
            .collect();
        if digits.is_empty() {
            return 0;
        }
        if digits.len() == OTP_LENGTH {
            self.verification_sent = false;
        }
        for (cell, digit) in self.cells.iter_mut().zip(&digits) {
            *cell = Some(*digit);
        }
        self.focus = digits.len().min(OTP_LENGTH - 1);
        debug!("Pasted {} digits into code entry", digits.len());
        self.check_completion();
        digits.len()
    }

    pub fn focus_left(&mut self) {
        self.focus = self.focus.saturating_sub(1);
    }

    pub fn focus_right(&mut self) {
        self.focus = (self.focus + 1).min(OTP_LENGTH - 1);
    }

    pub fn set_focus(&mut self, index: usize) {
        self.focus = index.min(OTP_LENGTH - 1);
    }

    /// Manually verify a complete code.
    ///
    pub fn verify(&mut self) -> Result<(), WidgetError> {
        let code = self.code().ok_or(WidgetError::IncompleteCode)?;
        if self.loading {
            return Ok(());
        }
        self.verification_sent = true;
        self.dispatch_verify(&code);
        Ok(())
    }

    /// Restart the countdown, clear every cell and ask the host for a new code.
    ///
    pub fn resend(&mut self) -> Result<(), WidgetError> {
        let remaining_secs = self.remaining_secs();
        if remaining_secs > 0 {
            return Err(WidgetError::ResendUnavailable { remaining_secs });
        }
        info!("Resending verification code");
        self.cells = [None; OTP_LENGTH];
        self.focus = 0;
        self.verification_sent = false;
        self.error = None;
        self.restart_countdown()?;
        if let Some(callback) = self.on_resend.as_mut() {
            callback();
        }
        Ok(())
    }

    fn check_completion(&mut self) {
        if self.verification_sent {
            return;
        }
        if let Some(code) = self.code() {
            self.verification_sent = true;
            self.dispatch_verify(&code);
        }
    }

    fn dispatch_verify(&mut self, code: &str) {
        debug!("Verifying {}-digit code", code.len());
        if let Some(callback) = self.on_verify.as_mut() {
            callback(code);
        }
    }

    fn restart_countdown(&mut self) -> Result<(), WidgetError> {
        self.remaining.store(self.countdown_secs, Ordering::SeqCst);
        let remaining = Arc::clone(&self.remaining);
        self.countdown = None;
        if self.countdown_secs == 0 {
            return Ok(());
        }
        self.countdown = Some(TaskHandle::interval(COUNTDOWN_TICK, move || {
            match remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |secs| secs.checked_sub(1)) {
                Ok(previous) => previous > 1,
                Err(_) => false,
            }
        })?);
        Ok(())
    }

    /// The assembled code once every cell is filled.
    ///
    pub fn code(&self) -> Option<String> {
        self.cells.iter().copied().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn cells(&self) -> &[Option<char>; OTP_LENGTH] {
        &self.cells
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Show a verification failure. Entered digits are kept.
    ///
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn can_resend(&self) -> bool {
        self.remaining_secs() == 0
    }

    /// Countdown as `m:ss`.
    ///
    pub fn countdown_label(&self) -> String {
        let secs = self.remaining_secs();
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}
