use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Terminal styles for stock reports
#[derive(Debug, Clone)]
pub struct Theme {
    /// Section titles and command headers
    pub header: Style,
    pub success: Style,
    pub error: Style,
    /// Rejected rows and refused movements
    pub warn: Style,
    /// Icons in front of labels
    pub accent: Style,
    /// Labels of key/value lines, checksums
    pub dim: Style,
    /// Pair counts and totals
    pub quantity: Style,
}

impl Theme {
    /// Colored on a terminal unless `NO_COLOR` is set, plain otherwise
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        if no_color || !console::colors_enabled() || !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().blue().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow(),
            accent: Style::new().cyan(),
            dim: Style::new().bright_black(),
            quantity: Style::new().bold(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            accent: Style::new(),
            dim: Style::new(),
            quantity: Style::new(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
