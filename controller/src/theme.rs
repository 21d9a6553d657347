use serde::{Deserialize, Serialize};

/// Theme preference stored in settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    System,
    Light,
    Dark,
}

/// Theme actually applied to the view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedTheme {
    Light,
    #[default]
    Dark,
}

impl ThemeMode {
    pub fn follows_system(&self) -> bool {
        matches!(self, ThemeMode::System)
    }
}

pub fn resolve_theme(mode: ThemeMode, system: ResolvedTheme) -> ResolvedTheme {
    match mode {
        ThemeMode::System => system,
        ThemeMode::Light => ResolvedTheme::Light,
        ThemeMode::Dark => ResolvedTheme::Dark,
    }
}
