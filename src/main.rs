//! Sumdrop — falling-block arithmetic puzzle in the terminal.

mod app;
mod game;
mod input;
mod session;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that affect game behaviour (mode, rng seed).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub mode: Mode,
    pub seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        mode: args.mode,
        seed: args.seed,
    };
    let mut app = App::new(args, config, theme);
    app.run()?;
    Ok(())
}

/// Falling-block arithmetic puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "sumdrop",
    version,
    about = "Falling-block arithmetic puzzle in the terminal. Select blocks that sum to the target; don't let the stack reach the top.",
    long_about = "Sumdrop is a terminal puzzle game.\n\n\
        The board fills with numbered blocks. Select blocks whose values sum exactly to the \
        displayed target to clear them; the survivors fall, and the stack grows from the \
        bottom. In classic mode a row spawns after every clear; in time mode a row spawns \
        whenever the countdown runs out. The game ends when the stack reaches the top row.\n\n\
        CONTROLS (normal):\n  Arrows      Move cursor   Enter/Space  Toggle block\n  C           Deselect all  P            Pause      Q / Esc  Quit\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor   Space        Toggle block\n  p           Pause         q            Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Game mode: classic (row spawns after every clear) or time (row spawns when the countdown expires).
    #[arg(short, long, default_value = "classic")]
    pub mode: Mode,

    /// RNG seed for reproducible games (block values and targets).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the match-clear flash animation.
    #[arg(long)]
    pub no_animation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

/// Row-spawn policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// A row spawns after every successful clear.
    #[default]
    Classic,
    /// A row spawns whenever the countdown timer expires.
    Time,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Classic => "Classic",
            Self::Time => "Time",
        }
    }
}
