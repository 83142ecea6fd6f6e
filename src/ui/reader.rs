use crate::app::{App, MAX_SCROLL};
use crate::feed::format_date;
use crate::store::Post;
use crate::theme::Palette;
use crate::util::{html_to_text, strip_control_chars};
use ratatui::{
    layout::Rect,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Build the reader text for a post: header, tags, then the body as
/// plain text.
pub fn post_lines(post: &Post, views: i64, theme: &Palette) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        strip_control_chars(&post.title).into_owned(),
        theme.reader_title,
    ))];

    if let Some(subtitle) = post.subtitle.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(Line::from(Span::styled(
            strip_control_chars(subtitle).into_owned(),
            theme.reader_subtitle,
        )));
    }

    let mut meta = format_date(post.created_at);
    if let Some(author) = post.author_name.as_deref() {
        meta = format!("{} • {}", strip_control_chars(author), meta);
    }
    meta.push_str(&format!(" • {} views", views));
    lines.push(Line::from(Span::styled(meta, theme.reader_metadata)));

    if !post.tags.is_empty() {
        let tags: Vec<Span<'static>> = post
            .tags
            .iter()
            .flat_map(|t| {
                [
                    Span::styled(
                        format!("#{} ({})", t.name, t.category_name),
                        theme.reader_tag,
                    ),
                    Span::raw(" "),
                ]
            })
            .collect();
        lines.push(Line::from(tags));
    }

    lines.push(Line::from(""));

    let body = html_to_text(&post.content);
    let body = strip_control_chars(&body);
    lines.extend(
        body.lines()
            .map(|l| Line::from(Span::styled(l.to_string(), theme.reader_body))),
    );
    lines
}

/// Render the post reader view
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let Some(post) = app.reader_post.as_ref() else {
        let paragraph = Paragraph::new("No post selected")
            .block(Block::default().borders(Borders::ALL).title("Reader"));
        f.render_widget(paragraph, area);
        return;
    };

    // The store's count includes this visit once it has been recorded
    let views = app.reader_views.unwrap_or(post.views);
    let text = Text::from(post_lines(post, views, &app.theme));

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.theme.panel_border)
                .title("Post"),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset.min(MAX_SCROLL) as u16, 0));

    f.render_widget(paragraph, area);
}
