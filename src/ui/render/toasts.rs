use super::Frame;
use crate::state::State;
use crate::ui::widgets::styling;
use crate::widgets::{Notification, ToastPosition};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, LineGauge, Paragraph, Wrap},
};
use tokio::time::Instant;

const TOAST_WIDTH: u16 = 44;
const TOAST_HEIGHT: u16 = 5;

/// Area for the toast at `slot`, stacking away from the anchored edge.
///
fn toast_area(position: ToastPosition, slot: u16, size: Rect) -> Option<Rect> {
    let width = TOAST_WIDTH.min(size.width);
    let offset = slot * TOAST_HEIGHT + 1;
    if offset + TOAST_HEIGHT > size.height {
        return None;
    }
    let x = match position {
        ToastPosition::TopLeft | ToastPosition::BottomLeft => size.x + 1,
        ToastPosition::TopRight | ToastPosition::BottomRight => (size.x + size.width).saturating_sub(width + 1),
        ToastPosition::TopCenter | ToastPosition::BottomCenter => size.x + (size.width - width) / 2,
    };
    let y = if position.is_top() {
        size.y + offset
    } else {
        (size.y + size.height).saturating_sub(offset + TOAST_HEIGHT)
    };
    Some(Rect::new(x.max(size.x), y, width, TOAST_HEIGHT))
}

/// Render every queued toast on top of the screen.
///
pub fn toasts(frame: &mut Frame, size: Rect, state: &mut State) {
    let center = state.notifications();
    let now = Instant::now();
    for (slot, notification) in center.notifications().iter().enumerate() {
        let Some(area) = toast_area(center.position(), slot as u16, size) else {
            break;
        };
        toast(frame, area, notification, now, state);
    }
}

fn toast(frame: &mut Frame, area: Rect, notification: &Notification, now: Instant, state: &State) {
    let theme = state.get_theme();
    let color = styling::severity_color(theme, notification.severity);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(
            notification.title.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![];
    if let Some(message) = &notification.message {
        lines.push(Line::from(Span::styled(message.clone(), styling::normal_text_style(theme))));
    }
    if let Some(action) = &notification.action {
        lines.push(Line::from(Span::styled(action.clone(), styling::active_list_item_style(theme))));
    }
    let text_area = Rect::new(inner.x, inner.y, inner.width, inner.height.saturating_sub(1));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), text_area);

    if let Some(fraction) = notification.remaining_fraction(now) {
        let gauge_area = Rect::new(inner.x, inner.y + inner.height.saturating_sub(1), inner.width, 1);
        let gauge = LineGauge::default()
            .ratio(fraction.clamp(0.0, 1.0))
            .label("")
            .line_set(symbols::line::THICK)
            .gauge_style(Style::default().fg(color));
        frame.render_widget(gauge, gauge_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_right_stacks_downwards() {
        let screen = Rect::new(0, 0, 100, 40);
        let first = toast_area(ToastPosition::TopRight, 0, screen).unwrap();
        let second = toast_area(ToastPosition::TopRight, 1, screen).unwrap();
        assert_eq!(first.x, 100 - TOAST_WIDTH - 1);
        assert_eq!(first.y, 1);
        assert_eq!(second.y, 1 + TOAST_HEIGHT);
    }

    #[test]
    fn test_bottom_left_stacks_upwards() {
        let screen = Rect::new(0, 0, 100, 40);
        let first = toast_area(ToastPosition::BottomLeft, 0, screen).unwrap();
        let second = toast_area(ToastPosition::BottomLeft, 1, screen).unwrap();
        assert_eq!(first.x, 1);
        assert_eq!(first.y + TOAST_HEIGHT, 39);
        assert!(second.y < first.y);
    }

    #[test]
    fn test_overflowing_toasts_are_skipped() {
        let screen = Rect::new(0, 0, 60, 12);
        assert!(toast_area(ToastPosition::TopCenter, 1, screen).is_some());
        assert!(toast_area(ToastPosition::TopCenter, 2, screen).is_none());
    }
}
