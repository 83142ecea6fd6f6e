use crate::app::App;
use crate::feed::FeedEntry;
use crate::theme::Palette;
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};
use unicode_width::UnicodeWidthStr;

const DRAFT_BADGE: &str = " DRAFT ";

/// Build the display lines for one post.
///
/// The first post of the list is featured: its title gets the featured
/// style and it carries an author line.
fn entry_lines(
    entry: &FeedEntry,
    featured: bool,
    selected: bool,
    show_draft: bool,
    width: usize,
    theme: &Palette,
) -> Vec<Line<'static>> {
    let title = strip_control_chars(&entry.post.title).into_owned();
    let date = entry.date.clone();

    let badge_width = if show_draft { DRAFT_BADGE.len() + 1 } else { 0 };
    let title_budget = width.saturating_sub(date.width() + badge_width + 2);
    let title = truncate_to_width(&title, title_budget).into_owned();

    let title_style = if selected {
        theme.post_selected
    } else if featured {
        theme.featured_title
    } else {
        theme.post_title
    };

    let mut head = Vec::with_capacity(4);
    if show_draft {
        head.push(Span::styled(DRAFT_BADGE, theme.draft_badge));
        head.push(Span::raw(" "));
    }
    let pad = title_budget.saturating_sub(title.width()) + 2;
    head.push(Span::styled(title, title_style));
    head.push(Span::raw(" ".repeat(pad)));
    head.push(Span::styled(date, theme.post_date));

    let excerpt = strip_control_chars(&entry.excerpt);
    let mut lines = vec![
        Line::from(head),
        Line::from(Span::styled(
            truncate_to_width(&excerpt, width).into_owned(),
            theme.post_excerpt,
        )),
    ];
    if featured {
        if let Some(author) = entry.post.author_name.as_deref() {
            lines.push(Line::from(Span::styled(
                format!("by {}", strip_control_chars(author)),
                theme.post_date,
            )));
        }
    }
    lines.push(Line::from(""));
    lines
}

/// Render the post list for the active facet
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let width = area.width.saturating_sub(2) as usize;
    let entries = app.composer.entries();
    let admin = app.composer.viewer_is_admin();

    let mut items: Vec<ListItem> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            ListItem::new(entry_lines(
                entry,
                i == 0,
                i == app.selected,
                admin && entry.post.is_draft,
                width,
                &app.theme,
            ))
        })
        .collect();

    if app.composer.is_loading() {
        items.push(ListItem::new(Line::from(Span::styled(
            "Loading...",
            app.theme.load_more,
        ))));
    } else if app.composer.has_more() && !entries.is_empty() {
        items.push(ListItem::new(Line::from(Span::styled(
            "[m] Load more",
            app.theme.load_more,
        ))));
    } else if entries.is_empty() {
        items.push(ListItem::new("No posts yet"));
    }

    let title = format!("{} ({})", app.composer.active_facet(), entries.len());
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.theme.panel_border)
            .title(title),
    );

    let mut state = ListState::default().with_selected((!entries.is_empty()).then_some(app.selected));
    f.render_stateful_widget(list, area, &mut state);
}
