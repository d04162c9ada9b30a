//! Terminal fact probing.
//!
//! tty-ness, size, and the color conventions (NO_COLOR, TERM=dumb,
//! COLORTERM) gathered into the record the resolver consumes as its
//! lowest precedence layer.

use std::io::IsTerminal;

use nbv_core::capability::{ColorSystem, ProbedFacts};

pub fn probe() -> ProbedFacts {
    let is_terminal = std::io::stdout().is_terminal();
    let (width, height) = if is_terminal {
        crossterm::terminal::size().unwrap_or((80, 24))
    } else {
        (80, 24)
    };
    let no_color = no_color_requested();

    ProbedFacts {
        is_terminal,
        width,
        height,
        color_system: if no_color {
            ColorSystem::None
        } else {
            color_system_from_term()
        },
        no_color,
    }
}

fn no_color_requested() -> bool {
    let set = |name: &str| std::env::var_os(name).is_some_and(|v| !v.is_empty());
    set("NO_COLOR") || set("NBV_NO_COLOR") || term() == "dumb"
}

fn term() -> String {
    std::env::var("TERM").unwrap_or_default().to_lowercase()
}

fn color_system_from_term() -> ColorSystem {
    let colorterm = std::env::var("COLORTERM")
        .unwrap_or_default()
        .to_lowercase();
    if colorterm.contains("truecolor") || colorterm.contains("24bit") {
        return ColorSystem::Truecolor;
    }
    if term().contains("256color") {
        return ColorSystem::EightBit;
    }
    ColorSystem::Standard
}
