use opcon_core::highlight::{Severity, TokenClass};
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const MUTED: Style = Style::new().fg(Color::Rgb(146, 131, 116));
pub const FIELD_LABEL: Style = Style::new().fg(Color::Rgb(189, 174, 147));

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::new().fg(Color::Cyan)
    } else {
        Style::new().fg(Color::Rgb(80, 73, 69))
    }
}

pub fn severity_color(sev: Severity) -> Color {
    match sev {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Rgb(255, 165, 0),
        Severity::Info => Color::Green,
        Severity::Debug => Color::Blue,
    }
}

/// Terminal styling for one highlight span class; mirrors the markup
/// renderer's fixed palette.
pub fn token_style(class: TokenClass) -> Style {
    match class {
        TokenClass::Timestamp => Style::new().fg(Color::Green),
        TokenClass::Quoted => Style::new().fg(Color::Red),
        TokenClass::Number => Style::new().fg(Color::Blue),
        TokenClass::Severity(sev) => Style::new()
            .fg(severity_color(sev))
            .add_modifier(Modifier::BOLD),
    }
}

pub fn agent_status_color(status: &str) -> Color {
    match status.to_lowercase().as_str() {
        "running" => Color::Rgb(184, 187, 38),
        "stopped" => Color::Rgb(250, 189, 47),
        "crashed" | "error" => Color::Rgb(254, 128, 25),
        _ => Color::Rgb(146, 131, 116),
    }
}

pub fn status_note_style(note: &str) -> Style {
    let lowered = note.to_lowercase();
    if lowered.contains("failed") || lowered.contains("error") || lowered.contains("required") {
        Style::new().fg(Color::Rgb(254, 128, 25))
    } else {
        Style::new().fg(Color::Rgb(142, 192, 124))
    }
}
