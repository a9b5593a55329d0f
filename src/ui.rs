//! Layout and drawing: menu, board, sidebar, pause, quit menu, game over.

use crate::Mode;
use crate::app::{MenuState, MenuTab, QuitOption, Screen};
use crate::game::{GRID_COLS, GRID_ROWS, GameState};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each grid cell is CELL_W × CELL_H terminal cells.
const CELL_W: u16 = 5;
const CELL_H: u16 = 2;
const SIDEBAR_WIDTH: u16 = 22;

/// Duration of the match-clear fade (TachyonFX), matching the classic-mode
/// spawn delay so the flash ends as the board grows.
const CLEAR_FADE_MS: u32 = 300;

/// Board size in terminal cells (grid + border).
fn board_pixel_size() -> (u16, u16) {
    (
        GRID_COLS as u16 * CELL_W + 2,
        GRID_ROWS as u16 * CELL_H + 2,
    )
}

/// Board inner rect (no border) for the given area; matches draw_game layout.
fn board_inner_rect(area: Rect) -> Rect {
    let (bw, bh) = board_pixel_size();
    let total_w = bw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(bh) / 2;
    Rect {
        x: x + 1,
        y: y + 1,
        width: (GRID_COLS as u16 * CELL_W).min(area.width.saturating_sub(2)),
        height: (GRID_ROWS as u16 * CELL_H).min(area.height.saturating_sub(2)),
    }
}

/// Buffer (x, y) positions covered by the given grid cells.
fn cell_buffer_positions(board: Rect, cells: &[(usize, usize)]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &(row, col) in cells {
        let x0 = board.x + col as u16 * CELL_W;
        let y0 = board.y + row as u16 * CELL_H;
        for bx in x0..(x0 + CELL_W).min(board.x + board.width) {
            for by in y0..(y0 + CELL_H).min(board.y + board.height) {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Create or update the match-clear fade and process it (fade the cleared
/// cells back to the board background). A new effect is only built while
/// `flash_armed`; the caller arms it once per match.
fn apply_clear_effect(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    flash_armed: &mut bool,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_inner_rect(area);
    let delta = clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *clear_process_time = Some(now);

    if clear_effect.is_none() {
        if !*flash_armed {
            return;
        }
        *flash_armed = false;
        let clearing_set = cell_buffer_positions(board, &state.cleared_cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing_set.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *clear_effect = Some(effect);
    }

    if let Some(effect) = clear_effect {
        frame.render_effect(effect, board, tfx_delta);
    }
}

/// Draw the current screen. The clear effect is built lazily on the first
/// frame after a match armed the flash.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    cursor: (usize, usize),
    best: u32,
    menu_state: &MenuState,
    quit_selected: Option<QuitOption>,
    flash_armed: &mut bool,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu_state, area, now),
        Screen::Playing => {
            draw_game(frame, state, theme, area, cursor, best);
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
            if !no_animation && (*flash_armed || clear_effect.is_some()) {
                apply_clear_effect(
                    frame,
                    state,
                    theme,
                    area,
                    flash_armed,
                    clear_effect,
                    clear_process_time,
                    now,
                );
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, state, theme, area, cursor, best);
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
        Screen::GameOver => draw_game_over(frame, state, theme, area, best),
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, menu_state: &MenuState, area: Rect, now: Instant) {
    let popup_w = 44u16;
    let popup_h = 16u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" sum ", Style::default().fg(theme.title).bold()),
        Span::styled(" drop ", Style::default().fg(theme.main_fg).bold()),
    ]);

    let highlight_style = Style::default().fg(Color::Black).bg(theme.title).bold();
    let selected_style = Style::default().fg(theme.title).bold();
    let normal_style = Style::default().fg(theme.main_fg);

    fn tab_style(current: bool, selected: bool, highlight: Style, select: Style, normal: Style) -> Style {
        if current {
            highlight
        } else if selected {
            select
        } else {
            normal
        }
    }

    let mode_classic = Span::styled(
        " CLASSIC ",
        tab_style(
            menu_state.current_tab == MenuTab::Mode && menu_state.selected_mode == Mode::Classic,
            menu_state.selected_mode == Mode::Classic,
            highlight_style,
            selected_style,
            normal_style,
        ),
    );
    let mode_time = Span::styled(
        " TIME ",
        tab_style(
            menu_state.current_tab == MenuTab::Mode && menu_state.selected_mode == Mode::Time,
            menu_state.selected_mode == Mode::Time,
            highlight_style,
            selected_style,
            normal_style,
        ),
    );

    let start_btn = if menu_state.current_tab == MenuTab::Start {
        Span::styled(" [ START ] ", highlight_style)
    } else {
        Span::styled(" [ START ] ", normal_style)
    };

    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(
            " ─ MODE ─ ",
            Style::default().fg(theme.div_line),
        )),
        Line::from(vec![mode_classic, Span::from("  "), mode_time]),
        Line::from(""),
        Line::from(""),
        Line::from(start_btn),
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↕ ", Style::default().fg(theme.selected)),
            Span::from("NAVIGATE   "),
            Span::styled(" ↔ ", Style::default().fg(theme.selected)),
            Span::from("CHANGE   "),
            Span::styled(" ENTER ", Style::default().fg(theme.selected)),
            Span::from("START"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " [Q] QUIT ",
            Style::default().fg(theme.inactive_fg),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );

    // Startup animation: slide in from below, ease-out cubic.
    let elapsed = now.duration_since(menu_state.animation_start).as_millis() as u32;
    let anim_duration = 500u32;
    let t = (elapsed as f32 / anim_duration as f32).min(1.0);
    let offset_t = 1.0 - (1.0 - t).powi(3);
    let anim_y_offset = ((1.0 - offset_t) * 8.0) as u16;
    let mut anim_popup = popup;
    anim_popup.y += anim_y_offset;
    let anim_popup = anim_popup.intersection(area);

    p.render(anim_popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect, best: u32) {
    let (bw, bh) = board_pixel_size();
    let total_w = bw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(bh) / 2;
    let popup = Rect {
        x,
        y,
        width: total_w.min(area.width),
        height: bh.min(area.height),
    };
    let new_record = state.score > 0 && state.score >= best;
    let mut lines: Vec<Line> = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", state.score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Best: {} ", best.max(state.score)),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Level: {}   Matches: {} ", state.level, state.matches),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Mode: {} ", state.mode.label()),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if new_record {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R — Restart    M — Menu    Q — Quit ",
        Style::default().fg(theme.main_fg),
    )));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" sumdrop ", Style::default().fg(theme.title))),
    );
    p.render(popup, frame.buffer_mut());
}

/// Draw game: board + sidebar, centered in the full area.
fn draw_game(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    cursor: (usize, usize),
    best: u32,
) {
    let (bw, bh) = board_pixel_size();
    let total_w = bw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let active = vert[1];

    let (board_area, sidebar_area) = {
        let inner = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
            .split(active);
        (inner[0], inner[1])
    };

    draw_board(frame, state, theme, board_area, cursor);
    draw_sidebar(frame, state, theme, sidebar_area, best);
}

fn draw_board(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    cursor: (usize, usize),
) {
    let title = format!(" sumdrop  Target: {} ", state.target);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLS {
            let x0 = inner.x + col as u16 * CELL_W;
            let y0 = inner.y + row as u16 * CELL_H;
            if x0 + CELL_W > inner.x + inner.width || y0 + CELL_H > inner.y + inner.height {
                continue;
            }

            let cell = state.grid.get(row, col);
            let selected = cell.is_some_and(|b| state.selected.contains(&b.id));
            let (fill, digit_style) = match cell {
                Some(_) if selected => {
                    let bg = theme.selected;
                    (bg, Style::default().fg(Color::Black).bg(bg).bold())
                }
                Some(b) if b.is_new => {
                    let bg = theme.block_color(b.value);
                    (bg, Style::default().fg(Color::White).bg(bg).bold())
                }
                Some(b) => {
                    let bg = theme.block_color(b.value);
                    (bg, Style::default().fg(Color::Black).bg(bg))
                }
                None => (theme.bg, Style::default().fg(theme.bg).bg(theme.bg)),
            };

            for dy in 0..CELL_H {
                for dx in 0..CELL_W {
                    buf[(x0 + dx, y0 + dy)]
                        .set_symbol(" ")
                        .set_style(Style::default().bg(fill));
                }
            }
            if let Some(b) = cell {
                buf.set_string(x0 + CELL_W / 2, y0 + CELL_H / 2, b.value.to_string(), digit_style);
            }

            if (row, col) == cursor {
                let marker = Style::default().fg(Color::White).bg(fill).bold();
                buf.set_string(x0, y0 + CELL_H / 2, "▸", marker);
                buf.set_string(x0 + CELL_W - 1, y0 + CELL_H / 2, "◂", marker);
            }
        }
    }
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect, best: u32) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Target (border + number + selection sum)
            Constraint::Length(1), // gap
            Constraint::Length(7), // Stats
            Constraint::Length(1), // gap
            Constraint::Length(4), // Timer / keys
        ])
        .split(area);

    // --- Target ---
    let target_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let target_inner = target_block.inner(chunks[0]);
    target_block.render(chunks[0], frame.buffer_mut());
    let sum = state.selection_sum();
    let sum_style = if sum > state.target {
        Style::default().fg(Color::Red).bold()
    } else if sum == state.target {
        Style::default().fg(Color::Green).bold()
    } else {
        fg_style
    };
    let target_lines = vec![
        Line::from(Span::styled("Target", title_style)),
        Line::from(Span::styled(
            state.target.to_string(),
            Style::default().fg(theme.title).bold(),
        )),
        Line::from(vec![
            Span::styled("Sum: ", title_style),
            Span::styled(format!("{} ({})", sum, state.selected.len()), sum_style),
        ]),
    ];
    Paragraph::new(target_lines).render(target_inner, frame.buffer_mut());

    // --- Stats ---
    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best: ", title_style),
            Span::styled(best.max(state.score).to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Level: ", title_style),
            Span::styled(state.level.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Matches: ", title_style),
            Span::styled(state.matches.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Mode: ", title_style),
            Span::styled(state.mode.label(), fg_style),
        ]),
    ];
    Paragraph::new(stats_lines).render(stats_inner, frame.buffer_mut());

    // --- Timer (time mode) or key hints ---
    let third_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let third_inner = third_block.inner(chunks[4]);
    third_block.render(chunks[4], frame.buffer_mut());
    if state.mode == Mode::Time {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(third_inner);
        Paragraph::new(Line::from(Span::styled("Next row", title_style)))
            .render(layout[0], frame.buffer_mut());
        let ratio = if state.max_time() > 0.0 {
            (state.time_left() / state.max_time()).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let bar_color = if ratio > 0.6 {
            Color::Green
        } else if ratio > 0.3 {
            Color::Yellow
        } else {
            Color::Red
        };
        let gauge = Gauge::default()
            .ratio(ratio)
            .label(format!("{:.1}s", state.time_left()))
            .gauge_style(Style::default().fg(bar_color));
        gauge.render(layout[1], frame.buffer_mut());
    } else {
        let lines = vec![
            Line::from(Span::styled("Enter  select", fg_style)),
            Line::from(Span::styled("C      deselect", fg_style)),
        ];
        Paragraph::new(lines).render(third_inner, frame.buffer_mut());
    }
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24;
    let qh = 8;
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw,
        height: qh,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    for y in quit_rect.y..quit_rect.y + quit_rect.height {
        for x in quit_rect.x..quit_rect.x + quit_rect.width {
            frame.buffer_mut()[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        frame.buffer_mut().set_string(rx, ry, label, style);
    }
}
