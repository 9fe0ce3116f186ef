use crate::ui::theme::Theme;
use crate::widgets::{Severity, StepStatus, UploadStatus};
use ratatui::style::{Color, Modifier, Style};

/// Return the border style for active blocks.
///
pub fn active_block_border_style(theme: &Theme) -> Style {
    Style::default().fg(theme.border_active.to_color())
}

/// Return the border style for normal blocks.
///
pub fn normal_block_border_style(theme: &Theme) -> Style {
    Style::default().fg(theme.border_normal.to_color())
}

/// Return the style for current list items.
///
pub fn current_list_item_style(theme: &Theme) -> Style {
    Style::default()
        .fg(theme.text.to_color())
        .add_modifier(Modifier::BOLD)
}

/// Return the style for active list items.
///
pub fn active_list_item_style(theme: &Theme) -> Style {
    current_list_item_style(theme).fg(theme.primary.to_color())
}

/// Return the style for highlighted rows.
///
pub fn highlight_style(theme: &Theme) -> Style {
    Style::default()
        .bg(theme.highlight_bg.to_color())
        .fg(theme.highlight_fg.to_color())
}

/// Return the style for normal text.
///
pub fn normal_text_style(theme: &Theme) -> Style {
    Style::default().fg(theme.text.to_color())
}

pub fn muted_text_style(theme: &Theme) -> Style {
    Style::default().fg(theme.text_muted.to_color())
}

pub fn error_text_style(theme: &Theme) -> Style {
    Style::default().fg(theme.error.to_color())
}

pub fn severity_color(theme: &Theme, severity: Severity) -> Color {
    match severity {
        Severity::Success => theme.success.to_color(),
        Severity::Error => theme.error.to_color(),
        Severity::Warning => theme.warning.to_color(),
        Severity::Info => theme.info.to_color(),
    }
}

pub fn step_status_style(theme: &Theme, status: StepStatus) -> Style {
    match status {
        StepStatus::Complete => Style::default().fg(theme.success.to_color()),
        StepStatus::Current => active_list_item_style(theme),
        StepStatus::Upcoming => muted_text_style(theme),
        StepStatus::Error => error_text_style(theme).add_modifier(Modifier::BOLD),
    }
}

pub fn upload_status_color(theme: &Theme, status: UploadStatus) -> Color {
    match status {
        UploadStatus::Uploading => theme.info.to_color(),
        UploadStatus::Completed => theme.success.to_color(),
        UploadStatus::Failed => theme.error.to_color(),
    }
}
