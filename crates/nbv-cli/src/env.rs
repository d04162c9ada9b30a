//! Environment-variable defaults.
//!
//! The documented NBV_* names, read once into a record the capability
//! resolver merges below explicit flags. Nothing else in the pipeline
//! reads the environment.

use nbv_core::capability::{ColorSystem, EnvDefaults, ImageAlgorithm};

/// Environment defaults: the capability record plus the rendering
/// options that sit outside the capability set.
#[derive(Debug, Clone, Default)]
pub struct EnvLayer {
    pub capabilities: EnvDefaults,
    pub theme: Option<String>,
    pub line_numbers: bool,
    pub code_wrap: bool,
    pub hide_output: bool,
}

impl EnvLayer {
    pub fn read() -> Self {
        EnvLayer {
            capabilities: EnvDefaults {
                decorated: env_bool("NBV_PLAIN").map(|plain| !plain),
                images: env_bool("NBV_IMAGES"),
                image_algorithm: env_var("NBV_IMAGE_DRAWING")
                    .and_then(|v| ImageAlgorithm::from_name(&v.to_lowercase())),
                positive_space: env_bool("NBV_POSITIVE_SPACE"),
                hyperlinks: env_bool("NBV_HYPERLINKS"),
                hide_hyperlink_hints: env_bool("NBV_HIDE_HYPERLINK_HINTS"),
                color: env_bool("NBV_COLOR"),
                color_system: env_var("NBV_COLOR_SYSTEM")
                    .and_then(|v| ColorSystem::from_name(&v.to_lowercase())),
                width: env_var("NBV_WIDTH").and_then(|v| v.parse().ok()),
                nerd_font: env_bool("NBV_NERD_FONT"),
                files: env_bool("NBV_NO_FILES").map(|no_files| !no_files),
            },
            theme: env_var("NBV_THEME"),
            line_numbers: env_bool("NBV_LINE_NUMBERS").unwrap_or(false),
            code_wrap: env_bool("NBV_CODE_WRAP").unwrap_or(false),
            hide_output: env_bool("NBV_HIDE_OUTPUT").unwrap_or(false),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Boolean convention: 1/true/yes/on enable, 0/false/no/off disable,
/// anything else counts as unset.
fn env_bool(name: &str) -> Option<bool> {
    match env_var(name)?.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
