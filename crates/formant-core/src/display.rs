//! Error display policy: when a known validation message becomes
//! visible.
//!
//! The result map always holds the truth; this module only decides what
//! the user should currently see. Errors and warnings are filtered
//! independently — warnings never block submission, so they get their
//! own visibility switch rather than riding the error mode.

use std::str::FromStr;

use formant_types::ConfigError;

/// When field errors are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Show an error as soon as it exists.
    Immediate,
    /// Show only once the field is touched, or the form submitted.
    #[default]
    OnTouch,
    /// Show only after the first submit attempt.
    OnSubmit,
    /// Never shown automatically; the host reads the result map itself.
    Manual,
}

impl DisplayMode {
    /// Pure visibility decision for one field's errors.
    pub fn should_show_errors(self, touched: bool, submitted: bool, has_entry: bool) -> bool {
        has_entry
            && match self {
                DisplayMode::Immediate => true,
                DisplayMode::OnTouch => touched || submitted,
                DisplayMode::OnSubmit => submitted,
                DisplayMode::Manual => false,
            }
    }
}

impl FromStr for DisplayMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" => Ok(DisplayMode::Immediate),
            "on-touch" => Ok(DisplayMode::OnTouch),
            "on-submit" => Ok(DisplayMode::OnSubmit),
            "manual" => Ok(DisplayMode::Manual),
            other => Err(ConfigError::UnknownDisplayMode(other.to_string())),
        }
    }
}

/// When field warnings are shown. Independent of [`DisplayMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningVisibility {
    /// Warnings are visible whenever they exist.
    #[default]
    Always,
    /// Warnings appear once the field has been edited.
    OnChange,
    /// Warnings are never shown automatically.
    Never,
}

impl WarningVisibility {
    /// Pure visibility decision for one field's warnings.
    pub fn should_show_warnings(self, dirty: bool, has_entry: bool) -> bool {
        has_entry
            && match self {
                WarningVisibility::Always => true,
                WarningVisibility::OnChange => dirty,
                WarningVisibility::Never => false,
            }
    }
}

impl FromStr for WarningVisibility {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(WarningVisibility::Always),
            "on-change" => Ok(WarningVisibility::OnChange),
            "never" => Ok(WarningVisibility::Never),
            other => Err(ConfigError::UnknownWarningVisibility(other.to_string())),
        }
    }
}
