//! Color palettes for the TUI.
//!
//! `ThemeVariant` selects between Dark and Light; `Palette` maps every
//! visual role of the feed and reader views to a ratatui `Style`.

use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeVariant {
    #[default]
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Self::Dark => Palette::dark(),
            Self::Light => Palette::light(),
        }
    }

    /// Dark → Light → Dark.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    // -- Tab bar --
    pub tab: Style,
    pub tab_active: Style,

    // -- Post list --
    pub post_title: Style,
    pub post_selected: Style,
    pub post_excerpt: Style,
    pub post_date: Style,
    pub draft_badge: Style,
    pub featured_title: Style,
    pub load_more: Style,

    // -- Reader --
    pub reader_title: Style,
    pub reader_subtitle: Style,
    pub reader_body: Style,
    pub reader_metadata: Style,
    pub reader_tag: Style,

    // -- Chrome --
    pub status_bar: Style,
    pub status_error: Style,
    pub panel_border: Style,
}

impl Palette {
    fn dark() -> Self {
        Self {
            tab: Style::default().fg(Color::Gray),
            tab_active: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),

            post_title: Style::default().add_modifier(Modifier::BOLD),
            post_selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            post_excerpt: Style::default().fg(Color::Gray),
            post_date: Style::default().fg(Color::DarkGray),
            draft_badge: Style::default().fg(Color::Black).bg(Color::Yellow),
            featured_title: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            load_more: Style::default().fg(Color::Cyan),

            reader_title: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            reader_subtitle: Style::default().add_modifier(Modifier::ITALIC),
            reader_body: Style::default(),
            reader_metadata: Style::default().fg(Color::DarkGray),
            reader_tag: Style::default().fg(Color::Yellow),

            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            status_error: Style::default().bg(Color::Red).fg(Color::White),
            panel_border: Style::default().fg(Color::DarkGray),
        }
    }

    fn light() -> Self {
        Self {
            tab: Style::default().fg(Color::DarkGray),
            tab_active: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),

            post_title: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            post_selected: Style::default().bg(Color::Blue).fg(Color::White),
            post_excerpt: Style::default().fg(Color::DarkGray),
            post_date: Style::default().fg(Color::DarkGray),
            draft_badge: Style::default().fg(Color::White).bg(Color::Magenta),
            featured_title: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            load_more: Style::default().fg(Color::Blue),

            reader_title: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            reader_subtitle: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::ITALIC),
            reader_body: Style::default().fg(Color::Black),
            reader_metadata: Style::default().fg(Color::DarkGray),
            reader_tag: Style::default().fg(Color::Magenta),

            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            status_error: Style::default().bg(Color::Red).fg(Color::White),
            panel_border: Style::default().fg(Color::Gray),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_from_str_name() {
        assert_eq!(ThemeVariant::from_str_name("dark"), Some(ThemeVariant::Dark));
        assert_eq!(ThemeVariant::from_str_name("LIGHT"), Some(ThemeVariant::Light));
        assert_eq!(ThemeVariant::from_str_name("sepia"), None);
    }

    #[test]
    fn variant_cycles() {
        assert_eq!(ThemeVariant::Dark.next(), ThemeVariant::Light);
        assert_eq!(ThemeVariant::Light.next().name(), "Dark");
    }

    #[test]
    fn light_palette_differs_from_dark() {
        let dark = ThemeVariant::Dark.palette();
        let light = ThemeVariant::Light.palette();
        assert_ne!(dark.post_selected, light.post_selected);
        assert_ne!(dark.status_bar, light.status_bar);
    }

    #[test]
    fn dark_status_bar_is_gray() {
        let p = ThemeVariant::Dark.palette();
        assert_eq!(p.status_bar, Style::default().bg(Color::DarkGray).fg(Color::White));
    }
}
