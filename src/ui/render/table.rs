use super::Frame;
use crate::state::{State, TableInput};
use crate::ui::widgets::styling;
use crate::widgets::SortDirection;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};

/// Render the customers table according to state.
///
pub fn table(frame: &mut Frame, size: Rect, state: &mut State) {
    let theme = state.get_theme();
    let table = state.table();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3), Constraint::Length(1)])
        .split(size);

    // Filters
    let editing = state.get_table_input();
    let search_style = if editing == Some(&TableInput::Search) {
        styling::active_list_item_style(theme)
    } else {
        styling::normal_text_style(theme)
    };
    let mut filters = vec![
        Span::styled("Search: ", styling::muted_text_style(theme)),
        Span::styled(
            format!("{}{}", table.global_filter(), if editing == Some(&TableInput::Search) { "▏" } else { "" }),
            search_style,
        ),
    ];
    for column in table.columns() {
        let active = matches!(editing, Some(TableInput::ColumnFilter(id)) if *id == column.id);
        if let Some(value) = table.column_filter(&column.id) {
            filters.push(Span::styled(
                format!("  {}: {}{}", column.header, value, if active { "▏" } else { "" }),
                styling::active_list_item_style(theme),
            ));
        } else if active {
            filters.push(Span::styled(
                format!("  {}: ▏", column.header),
                styling::active_list_item_style(theme),
            ));
        }
    }
    frame.render_widget(Paragraph::new(Line::from(filters)), rows[0]);

    // Rows
    let focused = state.focused_column_id();
    let columns = table.visible_columns();
    let mut header_cells = vec![Cell::from(" ")];
    header_cells.extend(columns.iter().map(|column| {
        let arrow = match table.sort_direction(&column.id) {
            Some(SortDirection::Ascending) => " ▲",
            Some(SortDirection::Descending) => " ▼",
            None => "",
        };
        let style = if focused.as_deref() == Some(column.id.as_str()) {
            styling::active_list_item_style(theme).add_modifier(Modifier::UNDERLINED)
        } else {
            styling::current_list_item_style(theme)
        };
        Cell::from(Span::styled(format!("{}{}", column.header, arrow), style))
    }));
    let header = Row::new(header_cells).bottom_margin(1);

    let body: Vec<Row> = table
        .page_indices()
        .into_iter()
        .filter_map(|index| table.row(index).map(|row| (index, row)))
        .map(|(index, row)| {
            let mark = if table.is_selected(index) { "[x]" } else { "[ ]" };
            let mut cells = vec![Cell::from(mark)];
            cells.extend(columns.iter().map(|column| Cell::from(column.value(row).to_string())));
            Row::new(cells).style(styling::normal_text_style(theme))
        })
        .collect();

    let mut widths = vec![Constraint::Length(4)];
    widths.extend(columns.iter().map(|column| match column.id.as_str() {
        "id" => Constraint::Length(4),
        "seats" | "active" => Constraint::Length(7),
        "mrr" | "plan" => Constraint::Length(11),
        _ => Constraint::Min(12),
    }));

    let hidden = table.columns().len() - columns.len();
    let title = if hidden > 0 {
        format!("Customers ({} hidden columns)", hidden)
    } else {
        "Customers".to_string()
    };
    let widget = Table::new(body, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(styling::active_block_border_style(theme)),
        )
        .highlight_style(styling::highlight_style(theme))
        .column_spacing(1);
    let mut table_state = TableState::default();
    if !table.page_indices().is_empty() {
        table_state.select(Some(state.get_table_row()));
    }
    frame.render_stateful_widget(widget, rows[1], &mut table_state);

    // Pagination
    let (start, end, total) = table.showing();
    let mut summary = format!(
        "Showing {}-{} of {} · Page {} of {} · {} per page",
        start,
        end,
        total,
        table.page_index() + 1,
        table.page_count().max(1),
        table.page_size()
    );
    if table.selected_count() > 0 {
        summary.push_str(&format!(" · {} selected", table.selected_count()));
    }
    frame.render_widget(
        Paragraph::new(Span::styled(summary, styling::muted_text_style(theme))),
        rows[2],
    );
}
