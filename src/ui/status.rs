use crate::app::{App, View};
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Spinner frames shown while a page is loading.
pub(super) const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Text and whether it reports an error.
fn status_text(app: &App) -> (Cow<'_, str>, bool) {
    if let Some(err) = app.composer.error() {
        let hint = if err.is_retryable() {
            " | [m] retry [Esc] dismiss"
        } else {
            ""
        };
        return (Cow::Owned(format!("{}{}", err, hint)), true);
    }
    if let Some((msg, _)) = &app.status_message {
        return (Cow::Borrowed(msg.as_ref()), false);
    }
    if app.view == View::Browse && app.composer.is_loading() {
        let frame = SPINNER[app.spinner_frame % SPINNER.len()];
        return (Cow::Owned(format!("{} Loading posts...", frame)), false);
    }

    let hints = match app.view {
        View::Browse => "[Tab/h/l]facet [j/k]move [Enter]open [m]ore [t]heme [q]uit",
        View::Reader => "[Esc]back [j/k]scroll [Ctrl+d/u]page [q]uit",
    };
    (Cow::Borrowed(hints), false)
}

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let (text, is_error) = status_text(app);
    let style = if is_error {
        app.theme.status_error
    } else {
        app.theme.status_bar
    };
    f.render_widget(Paragraph::new(text).style(style), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::AppContext;
    use crate::store::StoreError;

    async fn test_app() -> App {
        let config = Config::parse("app_id = \"blog\"\nowner_uid = \"alice\"\n").unwrap();
        let ctx = AppContext::open(config, ":memory:").await.unwrap();
        App::new(&ctx)
    }

    #[tokio::test]
    async fn test_error_takes_precedence() {
        let mut app = test_app().await;
        app.set_status("Theme: Light");
        app.composer.on_snapshot_error(&StoreError::SubscriptionClosed);
        let (text, is_error) = status_text(&app);
        assert!(is_error);
        assert!(text.contains("retry"));
    }

    #[tokio::test]
    async fn test_loading_then_hints() {
        let mut app = test_app().await;
        let _request = app.composer.start();
        let (text, _) = status_text(&app);
        assert!(text.contains("Loading posts"));

        app.select_facet(crate::feed::Facet::Top);
        app.composer.on_remote_snapshot(vec![]);
        let (text, is_error) = status_text(&app);
        assert!(!is_error);
        assert!(text.starts_with("[Tab/h/l]"));
    }
}
