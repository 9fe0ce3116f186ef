use super::Frame;
use crate::state::State;
use crate::ui::widgets::styling;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};
use tokio::time::Instant;

/// Render the notification queue according to state.
///
pub fn notifications(frame: &mut Frame, size: Rect, state: &mut State) {
    let theme = state.get_theme();
    let center = state.notifications();
    let now = Instant::now();
    let queue = center.notifications();

    let items: Vec<ListItem> = if queue.is_empty() {
        vec![ListItem::new(Span::styled(
            "No notifications. Press s, e, w or i to raise one.",
            styling::muted_text_style(theme),
        ))]
    } else {
        queue
            .iter()
            .map(|notification| {
                let color = styling::severity_color(theme, notification.severity);
                let remaining = match notification.remaining_fraction(now) {
                    Some(fraction) => format!("{:>3.0}% left", fraction * 100.0),
                    None => "sticky".to_string(),
                };
                let mut lines = vec![Line::from(vec![
                    Span::styled(
                        format!("{:<8}", format!("{:?}", notification.severity)),
                        Style::default().fg(color),
                    ),
                    Span::styled(notification.title.clone(), styling::current_list_item_style(theme)),
                    Span::styled(
                        format!("  {} · {}", notification.created_at.with_timezone(&chrono::Local).format("%H:%M:%S"), remaining),
                        styling::muted_text_style(theme),
                    ),
                ])];
                if let Some(message) = &notification.message {
                    lines.push(Line::from(Span::styled(
                        format!("        {}", message),
                        styling::normal_text_style(theme),
                    )));
                }
                ListItem::new(lines)
            })
            .collect()
    };

    let title = format!("Notifications ({}) · shown {:?}", queue.len(), center.position());
    let list = List::new(items).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(styling::active_block_border_style(theme)),
    );
    frame.render_widget(list, size);
}
