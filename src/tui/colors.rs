//! Color constants for the terminal user interface.

use ratatui::style::Color;

/// Focus percentage at or above target.
pub const HEALTHY_GREEN: Color = Color::Rgb(22, 163, 74);
/// Focus percentage below target.
pub const ALERT_RED: Color = Color::Rgb(220, 38, 38);
/// Focus-tagged task accents.
pub const FOCUS_TAG: Color = Color::Rgb(34, 197, 94);
/// Today's column border.
pub const TODAY_BLUE: Color = Color::Rgb(59, 130, 246);
/// The settings screen's focus divider row.
pub const DIVIDER_GREY: Color = Color::Rgb(148, 163, 184);
