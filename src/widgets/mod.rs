//! Headless widget state machines.
//!
//! Every widget here owns its state outright and talks to its host only
//! through the configuration and callbacks it was built with:
//! - `steps`: multi-step form controller with validation and auto-save
//! - `upload`: file intake with admission control and simulated upload
//! - `otp`: six-cell one-time-code entry with resend countdown
//! - `table`: generic sortable, filterable, paginated table
//! - `notifications`: shared toast queue with timed auto-dismiss

mod error;
pub mod notifications;
pub mod otp;
pub mod steps;
pub mod table;
pub mod timer;
pub mod upload;

pub use error::WidgetError;
pub use notifications::{Notification, NotificationCenter, Severity, ToastPosition};
pub use otp::{OtpConfig, OtpEntry, OTP_LENGTH};
pub use steps::{Direction, Step, StepConfig, StepController, StepStatus, Transition};
pub use table::{CellValue, Column, DataTable, SortDirection, SortSpec, TableFeatures};
pub use timer::TaskHandle;
pub use upload::{AcceptPattern, FileIntake, IncomingFile, UploadConfig, UploadEntry, UploadStatus};

use rand::{distributions::Alphanumeric, Rng};

const ID_LENGTH: usize = 9;

/// Generate a short random lowercase identifier for transient entries.
///
pub(crate) fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}
