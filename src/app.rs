//! App: terminal init, main loop, input handling, screen flow.

use crate::game::{GRID_COLS, GRID_ROWS};
use crate::input::{Action, key_to_action};
use crate::session::Session;
use crate::theme::Theme;
use crate::{Args, GameConfig, Mode};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    Mode,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub selected_mode: Mode,
    pub animation_start: Instant,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            current_tab: MenuTab::Mode,
            selected_mode: Mode::Classic,
            animation_start: Instant::now(),
        }
    }
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    session: Session,
    screen: Screen,
    paused: bool,
    /// Board cursor (row, col).
    cursor: (usize, usize),
    menu_state: MenuState,
    quit_selected: QuitOption,
    best_classic: u32,
    best_time: u32,
    /// Set when a match just cleared cells; the next draw builds the fade.
    flash_armed: bool,
    clear_effect: Option<Effect>,
    clear_effect_time: Option<Instant>,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Self {
        let session = Session::new(&config, Instant::now());
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let menu_state = MenuState {
            selected_mode: config.mode,
            ..MenuState::default()
        };
        Self {
            args,
            config,
            theme,
            session,
            screen,
            paused: false,
            cursor: (GRID_ROWS - 1, GRID_COLS / 2),
            menu_state,
            quit_selected: QuitOption::Resume,
            best_classic: 0,
            best_time: 0,
            flash_armed: false,
            clear_effect: None,
            clear_effect_time: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = ratatui::Terminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn start_game(&mut self, mode: Mode, now: Instant) {
        self.session.init_game(mode, now);
        self.screen = Screen::Playing;
        self.paused = false;
        self.cursor = (GRID_ROWS - 1, GRID_COLS / 2);
        self.flash_armed = false;
        self.clear_effect = None;
        self.clear_effect_time = None;
    }

    fn best_for_mode(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Classic => self.best_classic,
            Mode::Time => self.best_time,
        }
    }

    /// Bookkeeping after any transition: session-lifetime best score and the
    /// game-over screen switch.
    fn after_transition(&mut self) {
        let state = self.session.state();
        let score = state.score;
        match state.mode {
            Mode::Classic => self.best_classic = self.best_classic.max(score),
            Mode::Time => self.best_time = self.best_time.max(score),
        }
        if state.game_over && self.screen == Screen::Playing {
            self.screen = Screen::GameOver;
        }
    }

    /// Click the block under the cursor, arming the clear flash on a match.
    fn toggle_at_cursor(&mut self, now: Instant) {
        let (row, col) = self.cursor;
        let Some(id) = self.session.state().grid.get(row, col).map(|b| b.id) else {
            return;
        };
        let score_before = self.session.state().score;
        self.session.handle_block_click(id, now);
        if self.session.state().score > score_before && !self.args.no_animation {
            self.flash_armed = true;
            self.clear_effect = None;
            self.clear_effect_time = None;
        }
        self.after_transition();
    }

    /// Toggle every selected block off. Each removal only lowers the sum, so
    /// no step of this can trigger a match.
    fn deselect_all(&mut self, now: Instant) {
        for id in self.session.state().selected.clone() {
            self.session.handle_block_click(id, now);
        }
        self.after_transition();
    }

    fn move_cursor(&mut self, action: Action) {
        let (row, col) = self.cursor;
        self.cursor = match action {
            Action::MoveUp => (row.saturating_sub(1), col),
            Action::MoveDown => ((row + 1).min(GRID_ROWS - 1), col),
            Action::MoveLeft => (row, col.saturating_sub(1)),
            Action::MoveRight => (row, (col + 1).min(GRID_COLS - 1)),
            _ => (row, col),
        };
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));
        loop {
            let now = Instant::now();

            if self.screen == Screen::Playing && !self.paused {
                self.session.poll(now);
                self.after_transition();
            }

            let best = self.best_for_mode(self.session.state().mode);
            let quit_selected =
                (self.screen == Screen::QuitMenu).then_some(self.quit_selected);
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    self.session.state(),
                    &self.theme,
                    self.paused,
                    self.cursor,
                    best,
                    &self.menu_state,
                    quit_selected,
                    &mut self.flash_armed,
                    &mut self.clear_effect,
                    &mut self.clear_effect_time,
                    now,
                    self.args.no_animation,
                )
            })?;

            if self.clear_effect.as_ref().is_some_and(|e| e.done()) {
                self.clear_effect = None;
                self.clear_effect_time = None;
            }

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        let action = key_to_action(key);
                        let now = Instant::now();
                        match self.screen {
                            Screen::Menu => {
                                if self.handle_menu_key(action, now) {
                                    return Ok(());
                                }
                            }
                            Screen::Playing => self.handle_playing_key(action, now),
                            Screen::QuitMenu => {
                                if self.handle_quit_menu_key(action, now) {
                                    return Ok(());
                                }
                            }
                            Screen::GameOver => {
                                if action == Action::Quit {
                                    return Ok(());
                                }
                                match key.code {
                                    KeyCode::Char('r') | KeyCode::Char('R') => {
                                        let mode = self.config.mode;
                                        self.start_game(mode, now);
                                    }
                                    KeyCode::Char('m') | KeyCode::Char('M') => {
                                        self.menu_state.animation_start = now;
                                        self.screen = Screen::Menu;
                                    }
                                    _ => {}
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Returns true when the app should exit.
    fn handle_menu_key(&mut self, action: Action, now: Instant) -> bool {
        match action {
            Action::Quit => return true,
            Action::MoveLeft | Action::MoveRight => {
                if self.menu_state.current_tab == MenuTab::Mode {
                    self.menu_state.selected_mode = match self.menu_state.selected_mode {
                        Mode::Classic => Mode::Time,
                        Mode::Time => Mode::Classic,
                    };
                }
            }
            Action::MoveUp | Action::MoveDown => {
                self.menu_state.current_tab = match self.menu_state.current_tab {
                    MenuTab::Mode => MenuTab::Start,
                    MenuTab::Start => MenuTab::Mode,
                };
            }
            Action::Toggle => {
                if self.menu_state.current_tab == MenuTab::Start {
                    self.config.mode = self.menu_state.selected_mode;
                    self.start_game(self.menu_state.selected_mode, now);
                } else {
                    self.menu_state.current_tab = MenuTab::Start;
                }
            }
            _ => {}
        }
        false
    }

    fn handle_playing_key(&mut self, action: Action, now: Instant) {
        if self.paused {
            match action {
                Action::Pause => {
                    self.paused = false;
                    self.session.resume(now);
                }
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                _ => {}
            }
            return;
        }
        match action {
            Action::Pause => {
                self.paused = true;
                self.session.pause(now);
            }
            Action::Quit => {
                self.screen = Screen::QuitMenu;
                self.quit_selected = QuitOption::Resume;
                self.session.pause(now);
            }
            Action::MoveUp | Action::MoveDown | Action::MoveLeft | Action::MoveRight => {
                self.move_cursor(action);
            }
            Action::Toggle => self.toggle_at_cursor(now),
            Action::DeselectAll => self.deselect_all(now),
            Action::None => {}
        }
    }

    /// Returns true when the app should exit.
    fn handle_quit_menu_key(&mut self, action: Action, now: Instant) -> bool {
        match action {
            Action::MoveDown | Action::MoveRight => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::MainMenu,
                    QuitOption::MainMenu => QuitOption::Exit,
                    QuitOption::Exit => QuitOption::Resume,
                };
            }
            Action::MoveUp | Action::MoveLeft => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::Exit,
                    QuitOption::MainMenu => QuitOption::Resume,
                    QuitOption::Exit => QuitOption::MainMenu,
                };
            }
            Action::Toggle => match self.quit_selected {
                QuitOption::Resume => {
                    self.screen = Screen::Playing;
                    if !self.paused {
                        self.session.resume(now);
                    }
                }
                QuitOption::MainMenu => {
                    self.menu_state.animation_start = now;
                    self.screen = Screen::Menu;
                }
                QuitOption::Exit => return true,
            },
            Action::Pause | Action::Quit => {
                self.screen = Screen::Playing;
                if !self.paused {
                    self.session.resume(now);
                }
            }
            _ => {}
        }
        false
    }
}
