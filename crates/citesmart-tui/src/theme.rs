use ratatui::style::{Color, Modifier, Style};

use citesmart_core::FormPhase;

/// Color theme for the TUI.
pub struct Theme {
    pub success: Color,
    pub error: Color,
    pub notice: Color,
    pub mark_fg: Color,
    pub mark_bg: Color,

    pub header_fg: Color,
    pub header_bg: Color,
    pub border: Color,
    pub text: Color,
    pub dim: Color,
    pub highlight_bg: Color,
    pub active: Color,
    pub spinner: Color,
    pub footer_fg: Color,
    pub footer_bg: Color,
}

impl Theme {
    /// Hacker-green terminal theme.
    pub fn hacker() -> Self {
        Self {
            success: Color::Green,
            error: Color::Red,
            notice: Color::Yellow,
            mark_fg: Color::Black,
            mark_bg: Color::Yellow,

            header_fg: Color::Black,
            header_bg: Color::Green,
            border: Color::DarkGray,
            text: Color::White,
            dim: Color::DarkGray,
            highlight_bg: Color::Rgb(30, 50, 30),
            active: Color::Cyan,
            spinner: Color::Cyan,
            footer_fg: Color::DarkGray,
            footer_bg: Color::Reset,
        }
    }

    pub fn phase_color(&self, phase: FormPhase) -> Color {
        match phase {
            FormPhase::Idle => self.dim,
            FormPhase::Submitting => self.spinner,
            FormPhase::Success => self.success,
            FormPhase::Failure => self.error,
        }
    }

    /// Style for a highlighted term inside a quote.
    pub fn mark_style(&self) -> Style {
        Style::default()
            .fg(self.mark_fg)
            .bg(self.mark_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn header_style(&self) -> Style {
        Style::default().fg(self.header_fg).bg(self.header_bg).add_modifier(Modifier::BOLD)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default().bg(self.highlight_bg).add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Border of the focused form field.
    pub fn focus_style(&self) -> Style {
        Style::default().fg(self.active)
    }

    pub fn footer_style(&self) -> Style {
        Style::default().fg(self.footer_fg).bg(self.footer_bg)
    }
}
