use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for the CLI's status lines and object listings
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    /// Field names and type names in object listings
    pub key: Style,
}

impl Theme {
    /// With `color` off every style is plain
    pub fn new(color: bool) -> Self {
        let pick = |style: Style| if color { style } else { Style::new() };
        Self {
            header: pick(Style::new().cyan().bold()),
            success: pick(Style::new().green().bold()),
            error: pick(Style::new().red().bold()),
            warn: pick(Style::new().yellow().bold()),
            info: pick(Style::new().magenta()),
            dim: pick(Style::new().bright_black()),
            key: pick(Style::new().blue()),
        }
    }
}

/// Colored when stdout is a terminal and color is not switched off
/// (`NO_COLOR`, `CLICOLOR=0`)
pub fn theme() -> &'static Theme {
    THEME.get_or_init(|| Theme::new(console::Term::stdout().is_term() && console::colors_enabled()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_theme_has_no_styles() {
        let plain = Theme::new(false);
        for style in [plain.header, plain.success, plain.error, plain.warn, plain.info, plain.dim, plain.key] {
            assert!(style.is_plain());
        }
        assert!(!Theme::new(true).key.is_plain());
    }
}
