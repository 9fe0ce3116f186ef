use super::{centered_rect, Frame};
use crate::state::demo::{step_fields, OnboardingForm};
use crate::state::{OnboardingController, State};
use crate::ui::widgets::styling;
use crate::ui::Theme;
use crate::widgets::StepStatus;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
};

const BLOCK_TITLE: &str = "Onboarding";

/// Render the multi-step form according to state.
///
pub fn steps(frame: &mut Frame, size: Rect, state: &mut State) {
    let theme = state.get_theme();
    let block = Block::default()
        .title(BLOCK_TITLE)
        .borders(Borders::ALL)
        .border_style(styling::active_block_border_style(theme));
    let inner = block.inner(size);
    frame.render_widget(block, size);

    // A running transition holds the controller while its validator runs
    let Ok(controller) = state.steps().try_lock() else {
        validating_popup(frame, inner, theme);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(1)])
        .split(inner);
    progress(frame, rows[0], &controller, theme);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(20)])
        .split(rows[1]);
    step_list(frame, columns[0], &controller, theme);
    if controller.is_finished() {
        finished(frame, columns[1], controller.data(), theme);
    } else {
        current_step(frame, columns[1], &controller, state.get_step_field(), theme);
    }
    auto_save(frame, rows[2], &controller, theme);
}

fn progress(frame: &mut Frame, size: Rect, controller: &OnboardingController, theme: &Theme) {
    let percent = controller.progress_percent();
    let label = format!(
        "Step {} of {} · {}% complete",
        controller.current_index() + 1,
        controller.len(),
        percent
    );
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::BOTTOM).border_style(styling::normal_block_border_style(theme)))
        .gauge_style(Style::default().fg(theme.primary.to_color()).bg(theme.surface.to_color()))
        .percent(u16::from(percent))
        .label(label);
    frame.render_widget(gauge, size);
}

fn step_list(frame: &mut Frame, size: Rect, controller: &OnboardingController, theme: &Theme) {
    let items: Vec<ListItem> = controller
        .steps()
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let status = controller.step_status(index);
            let marker = match status {
                StepStatus::Complete => "✓",
                StepStatus::Current => "●",
                StepStatus::Upcoming => "○",
                StepStatus::Error => "✗",
            };
            let mut spans = vec![Span::styled(
                format!(" {} {}. {}", marker, index + 1, step.title),
                styling::step_status_style(theme, status),
            )];
            if step.optional {
                spans.push(Span::styled(" (optional)", styling::muted_text_style(theme)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::RIGHT)
            .border_style(styling::normal_block_border_style(theme)),
    );
    frame.render_widget(list, size);
}

fn current_step(frame: &mut Frame, size: Rect, controller: &OnboardingController, focused: usize, theme: &Theme) {
    let step = controller.current_step();
    let mut lines = vec![Line::from(Span::styled(
        step.title.clone(),
        styling::active_list_item_style(theme),
    ))];
    if let Some(description) = &step.description {
        lines.push(Line::from(Span::styled(description.clone(), styling::muted_text_style(theme))));
    }
    lines.push(Line::from(""));

    let fields = step_fields(controller.current_index());
    if fields.is_empty() {
        lines.extend(summary(controller.data(), theme));
    }
    for (index, field) in fields.iter().enumerate() {
        let value = field.value(controller.data());
        let (label_style, cursor) = if index == focused {
            (styling::active_list_item_style(theme), "▏")
        } else {
            (styling::normal_text_style(theme), "")
        };
        lines.push(Line::from(Span::styled(field.label(), label_style)));
        lines.push(Line::from(vec![
            Span::styled("  > ", styling::muted_text_style(theme)),
            Span::styled(format!("{}{}", value, cursor), styling::normal_text_style(theme)),
        ]));
    }

    if let Some(error) = controller.current_error() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.to_string(),
            styling::error_text_style(theme).add_modifier(Modifier::BOLD),
        )));
    }

    let action = if controller.is_last() { "Enter: finish" } else { "Enter: continue" };
    lines.push(Line::from(""));
    let mut hints = vec![Span::styled(action, styling::muted_text_style(theme))];
    if !controller.is_first() {
        hints.push(Span::styled(" · PgUp: back", styling::muted_text_style(theme)));
    }
    if controller.can_skip() {
        hints.push(Span::styled(" · Ctrl+S: skip", styling::muted_text_style(theme)));
    }
    lines.push(Line::from(hints));

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::NONE))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, size.inner(&ratatui::layout::Margin::new(2, 0)));
}

fn summary(form: &OnboardingForm, theme: &Theme) -> Vec<Line<'static>> {
    let rows = [
        ("Name", &form.name),
        ("Email", &form.email),
        ("Company", &form.company),
        ("Team size", &form.team_size),
        ("Plan", &form.plan),
    ];
    rows.iter()
        .map(|(label, value)| {
            let value = if value.is_empty() { "-".to_string() } else { value.to_string() };
            Line::from(vec![
                Span::styled(format!("{:<10}", label), styling::muted_text_style(theme)),
                Span::styled(value, styling::normal_text_style(theme)),
            ])
        })
        .collect()
}

fn finished(frame: &mut Frame, size: Rect, form: &OnboardingForm, theme: &Theme) {
    let mut lines = vec![
        Line::from(Span::styled(
            "All set!",
            Style::default().fg(theme.success.to_color()).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(summary(form, theme));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Ctrl+R: start over",
        styling::muted_text_style(theme),
    )));
    frame.render_widget(Paragraph::new(lines), size.inner(&ratatui::layout::Margin::new(2, 0)));
}

fn auto_save(frame: &mut Frame, size: Rect, controller: &OnboardingController, theme: &Theme) {
    let text = if controller.is_auto_saving() {
        "Saving draft...".to_string()
    } else {
        match controller.last_saved() {
            Some(saved) => format!(
                "Draft saved at {}",
                saved.with_timezone(&chrono::Local).format("%H:%M:%S")
            ),
            None => String::new(),
        }
    };
    let paragraph = Paragraph::new(Span::styled(text, styling::muted_text_style(theme)))
        .alignment(Alignment::Right);
    frame.render_widget(paragraph, size);
}

fn validating_popup(frame: &mut Frame, size: Rect, theme: &Theme) {
    let area = centered_rect(40, 30, size);
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(Line::from(Span::styled(
        "Validating...",
        styling::active_list_item_style(theme),
    )))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(styling::active_block_border_style(theme)),
    );
    frame.render_widget(paragraph, area);
}
