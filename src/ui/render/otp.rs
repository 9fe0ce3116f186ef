use super::{centered_rect, Frame};
use crate::state::demo::DEMO_VERIFICATION_CODE;
use crate::state::State;
use crate::ui::widgets::styling;
use crate::widgets::OTP_LENGTH;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

const CELL_WIDTH: u16 = 5;

/// Render the verification code entry according to state.
///
pub fn otp(frame: &mut Frame, size: Rect, state: &mut State) {
    let theme = state.get_theme();
    let otp = state.otp();
    let outer = Block::default()
        .title("Verify your email")
        .borders(Borders::ALL)
        .border_style(styling::active_block_border_style(theme));
    let area = centered_rect(70, 80, outer.inner(size));
    frame.render_widget(outer, size);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(2),
        ])
        .split(area);

    let intro = Paragraph::new(vec![
        Line::from(Span::styled(
            "Enter the 6-digit code we sent to your inbox",
            styling::normal_text_style(theme),
        )),
        Line::from(Span::styled(
            format!("(demo code: {})", DEMO_VERIFICATION_CODE),
            styling::muted_text_style(theme),
        )),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(intro, rows[0]);

    // Code cells, centered as a group
    let group_width = CELL_WIDTH * OTP_LENGTH as u16 + (OTP_LENGTH as u16 - 1);
    let offset = rows[1].width.saturating_sub(group_width) / 2;
    for (index, cell) in otp.cells().iter().enumerate() {
        let x = rows[1].x + offset + index as u16 * (CELL_WIDTH + 1);
        let cell_area = Rect::new(x, rows[1].y, CELL_WIDTH, 3).intersection(rows[1]);
        let border_style = if otp.error().is_some() {
            styling::error_text_style(theme)
        } else if index == otp.focus() && !otp.is_loading() {
            styling::active_block_border_style(theme)
        } else {
            styling::normal_block_border_style(theme)
        };
        let digit = cell.map(String::from).unwrap_or_default();
        let paragraph = Paragraph::new(Span::styled(
            digit,
            styling::normal_text_style(theme).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(border_style));
        frame.render_widget(paragraph, cell_area);
    }

    let status = if otp.is_loading() {
        Span::styled("Verifying...", styling::active_list_item_style(theme))
    } else if let Some(error) = otp.error() {
        Span::styled(error.to_string(), styling::error_text_style(theme))
    } else {
        Span::raw("")
    };
    frame.render_widget(Paragraph::new(status).alignment(Alignment::Center), rows[2]);

    let resend = if otp.can_resend() {
        Span::styled("Didn't get it? Press r to resend", styling::active_list_item_style(theme))
    } else {
        Span::styled(
            format!("Resend code in {}", otp.countdown_label()),
            styling::muted_text_style(theme),
        )
    };
    frame.render_widget(
        Paragraph::new(vec![Line::from(""), Line::from(resend)]).alignment(Alignment::Center),
        rows[3],
    );
}
