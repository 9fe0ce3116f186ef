use super::{progress_bar, Frame};
use crate::state::State;
use crate::ui::widgets::styling;
use crate::widgets::upload::format_file_size;
use crate::widgets::UploadStatus;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

const PROGRESS_WIDTH: usize = 20;

/// Render the file intake according to state.
///
pub fn upload(frame: &mut Frame, size: Rect, state: &mut State) {
    let theme = state.get_theme();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3)])
        .split(size);

    // Drop zone
    let config = state.upload().config();
    let accepts = config
        .accept
        .as_ref()
        .map(|accept| accept.as_str().to_string())
        .unwrap_or_else(|| "any file".to_string());
    let limits = format!(
        "Accepts {} · up to {} each · max {} files{}",
        accepts,
        format_file_size(config.max_file_size),
        config.max_files,
        if config.multiple { "" } else { " · one at a time" }
    );
    let drop_zone = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Path: ", styling::muted_text_style(theme)),
            Span::styled(format!("{}▏", state.get_path_input()), styling::normal_text_style(theme)),
        ]),
        Line::from(Span::styled(
            "Drop files onto the terminal or type a path and press Enter",
            styling::muted_text_style(theme),
        )),
        Line::from(Span::styled(limits, styling::muted_text_style(theme))),
    ])
    .block(
        Block::default()
            .title("Upload files")
            .borders(Borders::ALL)
            .border_style(styling::active_block_border_style(theme)),
    );
    frame.render_widget(drop_zone, rows[0]);

    // File list
    let entries = state.upload().entries();
    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let color = styling::upload_status_color(theme, entry.status);
            let status = match entry.status {
                UploadStatus::Uploading => format!("{} {:>3}%", progress_bar(entry.progress, PROGRESS_WIDTH), entry.progress),
                UploadStatus::Completed => "Uploaded".to_string(),
                UploadStatus::Failed => entry.error.clone().unwrap_or_else(|| "Failed".to_string()),
            };
            let mut lines = vec![Line::from(vec![
                Span::styled(entry.file.name.clone(), styling::normal_text_style(theme)),
                Span::styled(
                    format!("  {} · {}", format_file_size(entry.file.size), entry.file.mime_type),
                    styling::muted_text_style(theme),
                ),
            ])];
            let mut detail = vec![Span::styled(format!("  {}", status), Style::default().fg(color))];
            if let Some(preview) = &entry.preview {
                detail.push(Span::styled(
                    format!("  · preview ready ({})", format_file_size(preview.len() as u64)),
                    styling::muted_text_style(theme),
                ));
            }
            lines.push(Line::from(detail));
            ListItem::new(lines)
        })
        .collect();

    let title = if state.upload().is_uploading() {
        format!("Files ({}) · uploading", entries.len())
    } else {
        format!("Files ({})", entries.len())
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(styling::normal_block_border_style(theme)),
        )
        .highlight_style(styling::active_list_item_style(theme))
        .highlight_symbol("> ");
    let mut list_state = ListState::default();
    if !entries.is_empty() {
        list_state.select(Some(state.get_upload_index().min(entries.len() - 1)));
    }
    frame.render_stateful_widget(list, rows[1], &mut list_state);
}
