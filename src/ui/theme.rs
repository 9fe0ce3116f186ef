use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Theme color palette defining all colors used in the application.
///
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    // Primary colors
    pub primary: ColorSpec,
    pub secondary: ColorSpec,
    pub accent: ColorSpec,

    // Text colors
    pub text: ColorSpec,
    pub text_muted: ColorSpec,

    // Background colors
    pub surface: ColorSpec,

    // Status colors
    pub success: ColorSpec,
    pub warning: ColorSpec,
    pub error: ColorSpec,
    pub info: ColorSpec,

    // UI element colors
    pub border_active: ColorSpec,
    pub border_normal: ColorSpec,
    pub highlight_bg: ColorSpec,
    pub highlight_fg: ColorSpec,
}

/// Color specification that can be serialized/deserialized.
///
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorSpec {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorSpec {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        ColorSpec { r, g, b }
    }

    pub fn to_color(&self) -> Color {
        Color::Rgb(self.r, self.g, self.b)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::tokyo_night()
    }
}

impl Theme {
    /// Tokyo Night theme.
    ///
    pub fn tokyo_night() -> Self {
        Theme {
            name: "tokyo-night".to_string(),
            primary: ColorSpec::rgb(125, 207, 255),      // Blue
            secondary: ColorSpec::rgb(158, 206, 106),    // Green
            accent: ColorSpec::rgb(255, 159, 196),       // Magenta
            text: ColorSpec::rgb(169, 177, 214),         // Foreground
            text_muted: ColorSpec::rgb(117, 121, 148),   // Comment
            surface: ColorSpec::rgb(36, 40, 59),         // Selection
            success: ColorSpec::rgb(158, 206, 106),      // Green
            warning: ColorSpec::rgb(255, 202, 40),       // Yellow
            error: ColorSpec::rgb(247, 118, 142),        // Red
            info: ColorSpec::rgb(125, 207, 255),         // Blue
            border_active: ColorSpec::rgb(125, 207, 255),
            border_normal: ColorSpec::rgb(117, 121, 148),
            highlight_bg: ColorSpec::rgb(125, 207, 255),
            highlight_fg: ColorSpec::rgb(26, 27, 38),    // Background
        }
    }

    /// Dracula theme.
    ///
    pub fn dracula() -> Self {
        Theme {
            name: "dracula".to_string(),
            primary: ColorSpec::rgb(189, 147, 249),      // Purple
            secondary: ColorSpec::rgb(139, 233, 253),    // Cyan
            accent: ColorSpec::rgb(255, 121, 198),       // Pink
            text: ColorSpec::rgb(248, 248, 242),         // Foreground
            text_muted: ColorSpec::rgb(98, 114, 164),    // Comment
            surface: ColorSpec::rgb(68, 71, 90),         // Selection
            success: ColorSpec::rgb(80, 250, 123),       // Green
            warning: ColorSpec::rgb(255, 184, 108),      // Orange
            error: ColorSpec::rgb(255, 85, 85),          // Red
            info: ColorSpec::rgb(139, 233, 253),         // Cyan
            border_active: ColorSpec::rgb(189, 147, 249),
            border_normal: ColorSpec::rgb(98, 114, 164),
            highlight_bg: ColorSpec::rgb(139, 233, 253),
            highlight_fg: ColorSpec::rgb(40, 42, 54),    // Background
        }
    }

    /// Catppuccin Mocha theme.
    ///
    pub fn catppuccin_mocha() -> Self {
        Theme {
            name: "catppuccin-mocha".to_string(),
            primary: ColorSpec::rgb(203, 166, 247),      // Mauve
            secondary: ColorSpec::rgb(166, 227, 161),    // Green
            accent: ColorSpec::rgb(250, 179, 135),       // Peach
            text: ColorSpec::rgb(205, 214, 244),         // Text
            text_muted: ColorSpec::rgb(166, 173, 200),   // Subtext0
            surface: ColorSpec::rgb(24, 24, 37),         // Mantle
            success: ColorSpec::rgb(166, 227, 161),      // Green
            warning: ColorSpec::rgb(249, 226, 175),      // Yellow
            error: ColorSpec::rgb(243, 139, 168),        // Red
            info: ColorSpec::rgb(137, 180, 250),         // Blue
            border_active: ColorSpec::rgb(203, 166, 247),
            border_normal: ColorSpec::rgb(166, 173, 200),
            highlight_bg: ColorSpec::rgb(137, 180, 250),
            highlight_fg: ColorSpec::rgb(17, 17, 27),    // Base
        }
    }

    /// Rose Pine Dawn theme.
    ///
    pub fn rose_pine_dawn() -> Self {
        Theme {
            name: "rose-pine-dawn".to_string(),
            primary: ColorSpec::rgb(161, 119, 255),      // Purple
            secondary: ColorSpec::rgb(59, 247, 209),     // Green
            accent: ColorSpec::rgb(255, 109, 146),       // Pink
            text: ColorSpec::rgb(88, 82, 96),            // Text
            text_muted: ColorSpec::rgb(152, 147, 165),   // Muted
            surface: ColorSpec::rgb(255, 250, 243),      // Surface
            success: ColorSpec::rgb(59, 247, 209),       // Pine
            warning: ColorSpec::rgb(255, 210, 0),        // Gold
            error: ColorSpec::rgb(235, 111, 146),        // Love
            info: ColorSpec::rgb(61, 174, 233),          // Foam
            border_active: ColorSpec::rgb(161, 119, 255),
            border_normal: ColorSpec::rgb(88, 82, 96),
            highlight_bg: ColorSpec::rgb(61, 174, 233),
            highlight_fg: ColorSpec::rgb(0, 0, 0),
        }
    }

    /// Get theme by name.
    ///
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tokyo-night" => Some(Self::tokyo_night()),
            "dracula" => Some(Self::dracula()),
            "catppuccin-mocha" => Some(Self::catppuccin_mocha()),
            "rose-pine-dawn" => Some(Self::rose_pine_dawn()),
            _ => None,
        }
    }

    /// Get list of all available theme names.
    ///
    pub fn available_themes() -> Vec<String> {
        vec![
            "tokyo-night".to_string(),
            "dracula".to_string(),
            "catppuccin-mocha".to_string(),
            "rose-pine-dawn".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_theme_resolves() {
        for name in Theme::available_themes() {
            let theme = Theme::from_name(&name).unwrap();
            assert_eq!(theme.name, name);
        }
        assert!(Theme::from_name("solarized").is_none());
    }

    #[test]
    fn test_default_is_tokyo_night() {
        assert_eq!(Theme::default().name, "tokyo-night");
        assert_eq!(
            Theme::default().primary.to_color(),
            Color::Rgb(125, 207, 255)
        );
    }
}
