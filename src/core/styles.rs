//! Colour roles for report output and `--help`
//!
//! Rendering code asks for a role rather than a colour, and passes its own
//! `enabled` flag, so nothing here depends on global terminal state.
//!
//! ```
//! use phiscan::core::styles::StyleRole;
//! assert_eq!(StyleRole::Finding.paint("Person", false), "Person");
//! assert_eq!(StyleRole::Finding.paint("Person", true), "\x1b[31mPerson\x1b[0m");
//! ```

use clap::builder::styling::{AnsiColor, Color as ClapColor, Style, Styles};
use colored::Color;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StyleRole {
    Header,
    Key,
    Accent,
    Clean,
    Finding,
    Error,
    Dim,
    Value,
}

impl StyleRole {
    pub fn color(self) -> Option<Color> {
        match self {
            StyleRole::Header => Some(Color::Yellow),
            StyleRole::Key => Some(Color::BrightGreen),
            StyleRole::Accent => Some(Color::Blue),
            StyleRole::Clean => Some(Color::Green),
            StyleRole::Finding => Some(Color::Red),
            StyleRole::Error => Some(Color::BrightRed),
            StyleRole::Dim => Some(Color::BrightBlack),
            StyleRole::Value => None,
        }
    }

    pub fn paint(self, text: &str, enabled: bool) -> String {
        match self.color() {
            Some(color) if enabled => format!("\x1b[{}m{}\x1b[0m", color.to_fg_str(), text),
            _ => text.to_string(),
        }
    }

    fn ansi(self) -> Option<AnsiColor> {
        match self {
            StyleRole::Header => Some(AnsiColor::Yellow),
            StyleRole::Key => Some(AnsiColor::BrightGreen),
            StyleRole::Accent => Some(AnsiColor::Blue),
            StyleRole::Clean => Some(AnsiColor::Green),
            StyleRole::Finding => Some(AnsiColor::Red),
            StyleRole::Error => Some(AnsiColor::BrightRed),
            StyleRole::Dim => Some(AnsiColor::BrightBlack),
            StyleRole::Value => None,
        }
    }

    fn clap_style(self) -> Style {
        Style::new().fg_color(self.ansi().map(ClapColor::Ansi))
    }
}

/// clap help styles built from the same roles
pub fn help_styles(enabled: bool) -> Styles {
    if !enabled {
        return Styles::plain();
    }
    Styles::styled()
        .header(StyleRole::Header.clap_style().bold())
        .usage(StyleRole::Header.clap_style().bold())
        .literal(StyleRole::Key.clap_style())
        .placeholder(StyleRole::Accent.clap_style())
        .valid(StyleRole::Clean.clap_style())
        .invalid(StyleRole::Finding.clap_style())
        .error(StyleRole::Error.clap_style().bold())
}
