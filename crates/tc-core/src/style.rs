//! Terminal styling helpers with NO_COLOR support.

/// Check if color output is enabled (respects `NO_COLOR` env var).
pub fn color_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// Escape codes for the chat output, empty when color is off.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    enabled: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}

impl Style {
    pub fn new() -> Self {
        Self {
            enabled: color_enabled(),
        }
    }

    /// Create a style with colors explicitly enabled (for tests).
    pub fn force_enabled() -> Self {
        Self { enabled: true }
    }

    /// Create a style with colors explicitly disabled.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    fn code(&self, code: &'static str) -> &'static str {
        if self.enabled {
            code
        } else {
            ""
        }
    }

    /// Thinking text is shown dimmed.
    pub fn thinking_start(&self) -> &'static str {
        self.code("\x1b[2m")
    }

    /// Model label and prompt marker.
    pub fn label_start(&self) -> &'static str {
        self.code("\x1b[1m\x1b[36m")
    }

    pub fn error_start(&self) -> &'static str {
        self.code("\x1b[31m")
    }

    pub fn ok_start(&self) -> &'static str {
        self.code("\x1b[32m")
    }

    pub fn reset(&self) -> &'static str {
        self.code("\x1b[0m")
    }

    /// Wrap `text` in `start` and a reset.
    pub fn paint(&self, start: &'static str, text: &str) -> String {
        format!("{start}{text}{}", self.reset())
    }
}
