use super::Frame;
use crate::state::{State, View};
use crate::ui::widgets::styling;
use ratatui::{
    layout::Rect,
    widgets::{Block, Borders, Tabs},
};

const BLOCK_TITLE: &str = "Launchkit";

/// Render view tabs according to state.
///
pub fn tabs(frame: &mut Frame, size: Rect, state: &mut State) {
    let theme = state.get_theme();
    let titles: Vec<&str> = View::ALL.iter().map(|view| view.title()).collect();
    let tabs = Tabs::new(titles)
        .select(state.current_view().index())
        .style(styling::muted_text_style(theme))
        .highlight_style(styling::active_list_item_style(theme))
        .block(
            Block::default()
                .title(BLOCK_TITLE)
                .borders(Borders::ALL)
                .border_style(styling::normal_block_border_style(theme)),
        );
    frame.render_widget(tabs, size);
}
