use crate::app::App;
use ratatui::{
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, Tabs},
    Frame,
};

/// Render the facet tab bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let (tabs, active) = app.tabs();
    let titles: Vec<Line> = tabs.iter().map(|t| Line::from(t.label().to_string())).collect();

    let widget = Tabs::new(titles)
        .select(active)
        .style(app.theme.tab)
        .highlight_style(app.theme.tab_active)
        .divider("|")
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(app.theme.panel_border),
        );

    f.render_widget(widget, area);
}
