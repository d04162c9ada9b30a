//! Terminal capability resolution.
//!
//! Explicit overrides, environment defaults, and probed terminal facts are
//! merged once into an immutable [`CapabilityDecision`]. Everything
//! downstream consumes the decision by reference; no renderer reads the
//! environment or global state directly.

/// How to draw raster images as terminal glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageAlgorithm {
    /// Half-height block glyphs, one color pair per cell. Highest fidelity.
    #[default]
    Block,
    /// A fixed ramp of ASCII characters ordered by visual density.
    Character,
    /// 2x4 braille dot matrices, one code point per cell.
    Braille,
}

impl ImageAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            ImageAlgorithm::Block => "block",
            ImageAlgorithm::Character => "character",
            ImageAlgorithm::Braille => "braille",
        }
    }

    /// Parses a lowercase algorithm name (used by the env-default layer).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "block" => Some(ImageAlgorithm::Block),
            "character" => Some(ImageAlgorithm::Character),
            "braille" => Some(ImageAlgorithm::Braille),
            _ => None,
        }
    }
}

/// Which brightness range maps to "filled" glyphs in character drawings.
///
/// Negative space suits figures on light backgrounds (dark strokes become
/// dense glyphs); positive space suits dark-background figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpacePolarity {
    #[default]
    Negative,
    Positive,
}

/// The color range the terminal supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSystem {
    /// No color output at all.
    None,
    /// The 8/16 basic ANSI colors.
    #[default]
    Standard,
    /// The 256-color palette.
    EightBit,
    /// 24-bit RGB.
    Truecolor,
}

impl ColorSystem {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(ColorSystem::None),
            "standard" => Some(ColorSystem::Standard),
            "256" | "eightbit" => Some(ColorSystem::EightBit),
            "truecolor" => Some(ColorSystem::Truecolor),
            _ => None,
        }
    }
}

/// Explicit user overrides (CLI flags). `None` leaves the field to the
/// environment default or the probe.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub decorated: Option<bool>,
    pub images: Option<bool>,
    pub image_algorithm: Option<ImageAlgorithm>,
    pub positive_space: Option<bool>,
    pub hyperlinks: Option<bool>,
    pub hide_hyperlink_hints: Option<bool>,
    pub color: Option<bool>,
    pub color_system: Option<ColorSystem>,
    pub width: Option<u16>,
    pub nerd_font: Option<bool>,
    pub files: Option<bool>,
}

/// Environment-variable defaults, one layer below explicit overrides.
/// Gathered by the CLI from the documented `NBV_*` names.
#[derive(Debug, Clone, Default)]
pub struct EnvDefaults {
    pub decorated: Option<bool>,
    pub images: Option<bool>,
    pub image_algorithm: Option<ImageAlgorithm>,
    pub positive_space: Option<bool>,
    pub hyperlinks: Option<bool>,
    pub hide_hyperlink_hints: Option<bool>,
    pub color: Option<bool>,
    pub color_system: Option<ColorSystem>,
    pub width: Option<u16>,
    pub nerd_font: Option<bool>,
    pub files: Option<bool>,
}

/// Probed terminal facts, the lowest precedence layer.
#[derive(Debug, Clone)]
pub struct ProbedFacts {
    /// Whether stdout is an interactive terminal.
    pub is_terminal: bool,
    pub width: u16,
    pub height: u16,
    /// Best guess at the color range from TERM/COLORTERM conventions.
    pub color_system: ColorSystem,
    /// Whether a no-color convention (NO_COLOR, TERM=dumb) is in effect.
    pub no_color: bool,
}

impl Default for ProbedFacts {
    fn default() -> Self {
        ProbedFacts {
            is_terminal: false,
            width: 80,
            height: 24,
            color_system: ColorSystem::Standard,
            no_color: false,
        }
    }
}

/// The immutable per-invocation capability snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityDecision {
    pub decorated: bool,
    pub images_enabled: bool,
    pub image_algorithm: ImageAlgorithm,
    pub space_polarity: SpacePolarity,
    pub hyperlinks_enabled: bool,
    pub hint_hyperlinks: bool,
    pub color_system: ColorSystem,
    pub terminal_width: u16,
    pub terminal_height: u16,
    pub nerd_font_icons: bool,
    pub write_files_allowed: bool,
}

impl CapabilityDecision {
    /// Whether any color should be emitted.
    pub fn color(&self) -> bool {
        self.color_system != ColorSystem::None
    }
}

/// A capability combination rejected during resolution.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Braille drawings threshold dots directly and have no positive-space
    /// mode.
    BraillePositiveSpace,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::BraillePositiveSpace => write!(
                f,
                "braille image drawing has no positive-space mode; \
                 use --image-drawing character with --positive-space"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

fn pick<T: Copy>(explicit: Option<T>, env: Option<T>, fallback: T) -> T {
    explicit.or(env).unwrap_or(fallback)
}

/// Merges the three input records into one decision.
///
/// Precedence per field: explicit override > environment default > probed
/// value > built-in default. `decorated` defaults to "stdout is an
/// interactive terminal"; the other boolean capabilities each default to
/// the same tty probe independently, so forcing plain text does not turn
/// off images or hyperlinks.
pub fn resolve(
    overrides: &Overrides,
    env: &EnvDefaults,
    probed: &ProbedFacts,
) -> Result<CapabilityDecision, ConfigError> {
    let decorated = pick(overrides.decorated, env.decorated, probed.is_terminal);
    let images_enabled = pick(overrides.images, env.images, probed.is_terminal);
    let hyperlinks_enabled = pick(overrides.hyperlinks, env.hyperlinks, probed.is_terminal);
    let write_files_allowed = pick(overrides.files, env.files, probed.is_terminal);
    let nerd_font_icons = pick(overrides.nerd_font, env.nerd_font, false);
    let hint_hyperlinks = !pick(
        overrides.hide_hyperlink_hints,
        env.hide_hyperlink_hints,
        false,
    );

    let image_algorithm = pick(
        overrides.image_algorithm,
        env.image_algorithm,
        ImageAlgorithm::Block,
    );
    let space_polarity = if pick(overrides.positive_space, env.positive_space, false) {
        SpacePolarity::Positive
    } else {
        SpacePolarity::Negative
    };
    if image_algorithm == ImageAlgorithm::Braille && space_polarity == SpacePolarity::Positive {
        return Err(ConfigError::BraillePositiveSpace);
    }

    let color_default = probed.is_terminal && !probed.no_color;
    let color = pick(overrides.color, env.color, color_default);
    let color_system = if color {
        let probed_system = match probed.color_system {
            // An explicit --color beats the no-color probe.
            ColorSystem::None => ColorSystem::Standard,
            system => system,
        };
        pick(overrides.color_system, env.color_system, probed_system)
    } else {
        ColorSystem::None
    };

    let terminal_width = pick(overrides.width, env.width, probed.width).max(1);

    Ok(CapabilityDecision {
        decorated,
        images_enabled,
        image_algorithm,
        space_polarity,
        hyperlinks_enabled,
        hint_hyperlinks,
        color_system,
        terminal_width,
        terminal_height: probed.height.max(1),
        nerd_font_icons,
        write_files_allowed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tty() -> ProbedFacts {
        ProbedFacts {
            is_terminal: true,
            width: 120,
            height: 40,
            color_system: ColorSystem::Truecolor,
            no_color: false,
        }
    }

    /// Decoration defaults to the tty probe.
    #[test]
    fn test_decorated_defaults_to_tty() {
        let decision = resolve(&Overrides::default(), &EnvDefaults::default(), &tty()).unwrap();
        assert!(decision.decorated);

        let piped = resolve(
            &Overrides::default(),
            &EnvDefaults::default(),
            &ProbedFacts::default(),
        )
        .unwrap();
        assert!(!piped.decorated);
    }

    /// Forcing plain text leaves the other capabilities on their own
    /// defaults: images stay enabled on a tty.
    #[test]
    fn test_plain_does_not_disable_images() {
        let overrides = Overrides {
            decorated: Some(false),
            ..Overrides::default()
        };
        let decision = resolve(&overrides, &EnvDefaults::default(), &tty()).unwrap();
        assert!(!decision.decorated);
        assert!(decision.images_enabled);
        assert!(decision.hyperlinks_enabled);
    }

    /// Explicit override beats environment default beats probe.
    #[test]
    fn test_precedence_order() {
        let overrides = Overrides {
            images: Some(false),
            ..Overrides::default()
        };
        let env = EnvDefaults {
            images: Some(true),
            hyperlinks: Some(false),
            ..EnvDefaults::default()
        };
        let decision = resolve(&overrides, &env, &tty()).unwrap();
        assert!(!decision.images_enabled, "explicit flag wins over env");
        assert!(!decision.hyperlinks_enabled, "env default wins over probe");
    }

    /// Braille cannot be combined with positive space; rejected during
    /// resolution, before any rendering.
    #[test]
    fn test_braille_positive_space_rejected() {
        let overrides = Overrides {
            image_algorithm: Some(ImageAlgorithm::Braille),
            positive_space: Some(true),
            ..Overrides::default()
        };
        let err = resolve(&overrides, &EnvDefaults::default(), &tty()).unwrap_err();
        assert_eq!(err, ConfigError::BraillePositiveSpace);
    }

    /// Braille with the default negative polarity is fine.
    #[test]
    fn test_braille_negative_space_accepted() {
        let overrides = Overrides {
            image_algorithm: Some(ImageAlgorithm::Braille),
            ..Overrides::default()
        };
        let decision = resolve(&overrides, &EnvDefaults::default(), &tty()).unwrap();
        assert_eq!(decision.image_algorithm, ImageAlgorithm::Braille);
    }

    /// --no-color collapses the color system to none regardless of probe.
    #[test]
    fn test_no_color_override() {
        let overrides = Overrides {
            color: Some(false),
            ..Overrides::default()
        };
        let decision = resolve(&overrides, &EnvDefaults::default(), &tty()).unwrap();
        assert_eq!(decision.color_system, ColorSystem::None);
    }

    /// --color on a no-color probe forces at least the standard palette.
    #[test]
    fn test_force_color_on_dumb_terminal() {
        let probed = ProbedFacts {
            is_terminal: true,
            color_system: ColorSystem::None,
            no_color: true,
            ..tty()
        };
        let overrides = Overrides {
            color: Some(true),
            ..Overrides::default()
        };
        let decision = resolve(&overrides, &EnvDefaults::default(), &probed).unwrap();
        assert_eq!(decision.color_system, ColorSystem::Standard);
    }

    /// Width override beats the probed size.
    #[test]
    fn test_width_override() {
        let overrides = Overrides {
            width: Some(72),
            ..Overrides::default()
        };
        let decision = resolve(&overrides, &EnvDefaults::default(), &tty()).unwrap();
        assert_eq!(decision.terminal_width, 72);
    }
}
