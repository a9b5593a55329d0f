//! Game engine: grid model, selection evaluation, gravity, row spawn, countdown.

use crate::Mode;
use rand::Rng;

/// Board height in rows. Row 0 is the top.
pub const GRID_ROWS: usize = 10;
/// Board width in columns.
pub const GRID_COLS: usize = 6;
/// Rows pre-filled at game start, counted from the bottom.
pub const INITIAL_ROWS: usize = 4;
/// Inclusive block value range.
pub const BLOCK_MIN: u8 = 1;
pub const BLOCK_MAX: u8 = 9;
/// Inclusive target range.
pub const TARGET_MIN: u32 = 10;
pub const TARGET_MAX: u32 = 20;
/// Points per cleared block.
pub const SCORE_PER_BLOCK: u32 = 10;
/// Successful matches per level step.
pub const MATCHES_PER_LEVEL: u32 = 5;
/// Countdown tick period in time mode.
pub const TICK_PERIOD_MS: u64 = 100;
/// Seconds removed per countdown tick.
pub const TICK_DECREMENT: f64 = 0.1;
/// Full countdown length in ticks (10 seconds at 0.1 s per tick).
pub const MAX_TIME_TICKS: u32 = 100;
/// Delay before the post-match row spawn in classic mode.
pub const SPAWN_DELAY_MS: u64 = 300;

/// Opaque block identifier, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u64);

/// Monotonic id source. A fresh counter per session; ids never repeat, so a
/// duplicate id in the grid is impossible by construction.
#[derive(Debug, Clone, Default)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> BlockId {
        let id = BlockId(self.next);
        self.next += 1;
        id
    }
}

/// One numbered block. `row`/`col` always equal the grid cell holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub value: u8,
    pub row: usize,
    pub col: usize,
    /// Transient spawn marker; cleared at the start of the next transition.
    pub is_new: bool,
}

/// Fixed-size block matrix. Queries never mutate; transitions work on clones
/// so earlier snapshots stay consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [[Option<Block>; GRID_COLS]; GRID_ROWS],
}

impl Grid {
    pub fn empty() -> Self {
        Self {
            cells: [[None; GRID_COLS]; GRID_ROWS],
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&Block> {
        self.cells[row][col].as_ref()
    }

    /// Linear scan by id. Fine at 60 cells.
    pub fn find(&self, id: BlockId) -> Option<&Block> {
        self.blocks().find(|b| b.id == id)
    }

    pub fn row_occupied(&self, row: usize) -> bool {
        self.cells[row].iter().any(Option::is_some)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.cells.iter().flatten().filter_map(Option::as_ref)
    }

    fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.cells.iter_mut().flatten().filter_map(Option::as_mut)
    }

    pub(crate) fn take(&mut self, row: usize, col: usize) -> Option<Block> {
        self.cells[row][col].take()
    }

    pub(crate) fn put(&mut self, row: usize, col: usize, block: Block) {
        self.cells[row][col] = Some(block);
    }
}

/// Classification of a candidate selection's sum against the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SumCheck {
    Match,
    Overshoot,
    Pending,
}

/// Total value of the blocks referenced by `ids`. Ids no longer present in
/// the grid contribute 0.
pub fn selection_sum(grid: &Grid, ids: &[BlockId]) -> u32 {
    ids.iter()
        .filter_map(|&id| grid.find(id))
        .map(|b| u32::from(b.value))
        .sum()
}

pub fn classify(sum: u32, target: u32) -> SumCheck {
    if sum == target {
        SumCheck::Match
    } else if sum > target {
        SumCheck::Overshoot
    } else {
        SumCheck::Pending
    }
}

fn random_block_value<R: Rng>(rng: &mut R) -> u8 {
    rng.random_range(BLOCK_MIN..=BLOCK_MAX)
}

fn random_target<R: Rng>(rng: &mut R) -> u32 {
    rng.random_range(TARGET_MIN..=TARGET_MAX)
}

/// The single source of truth for one game. Mutated only through [`step`].
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub grid: Grid,
    pub target: u32,
    pub score: u32,
    pub level: u32,
    /// Successful matches so far; drives the level counter.
    pub matches: u32,
    pub game_over: bool,
    /// Selected block ids in click order.
    pub selected: Vec<BlockId>,
    pub mode: Mode,
    time_left_ticks: u32,
    max_time_ticks: u32,
    /// Cells emptied by the most recent match (pre-gravity positions), for
    /// the clear animation. Transient like `is_new`.
    pub cleared_cells: Vec<(usize, usize)>,
}

impl GameState {
    /// Fresh game: bottom `INITIAL_ROWS` rows seeded, random target, full
    /// countdown.
    pub fn new<R: Rng>(mode: Mode, rng: &mut R, ids: &mut IdGen) -> Self {
        let mut grid = Grid::empty();
        for row in GRID_ROWS - INITIAL_ROWS..GRID_ROWS {
            for col in 0..GRID_COLS {
                grid.put(
                    row,
                    col,
                    Block {
                        id: ids.next_id(),
                        value: random_block_value(rng),
                        row,
                        col,
                        is_new: false,
                    },
                );
            }
        }
        Self {
            grid,
            target: random_target(rng),
            score: 0,
            level: 1,
            matches: 0,
            game_over: false,
            selected: Vec::new(),
            mode,
            time_left_ticks: MAX_TIME_TICKS,
            max_time_ticks: MAX_TIME_TICKS,
            cleared_cells: Vec::new(),
        }
    }

    /// Countdown remaining, in seconds.
    pub fn time_left(&self) -> f64 {
        f64::from(self.time_left_ticks) * TICK_DECREMENT
    }

    /// Full countdown length, in seconds.
    pub fn max_time(&self) -> f64 {
        f64::from(self.max_time_ticks) * TICK_DECREMENT
    }

    /// Sum of the current selection, re-derived from the grid.
    pub fn selection_sum(&self) -> u32 {
        selection_sum(&self.grid, &self.selected)
    }
}

/// One discrete input to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Player clicked the block with this id.
    Click(BlockId),
    /// One countdown tick elapsed (time mode).
    CountdownTick,
    /// Grow the stack by one row (deferred classic-mode spawn).
    SpawnRow,
}

/// Timer work the caller must schedule after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    /// Arm a single-shot row spawn `SPAWN_DELAY_MS` from now.
    ScheduleSpawn,
}

/// Result of applying one action.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: GameState,
    pub followup: Option<Followup>,
}

/// Pure state transition: `(state, action) -> (state, followup)`. The only
/// inputs besides the state are the injected generators, so a seeded rng
/// replays a game exactly. Terminal states pass through untouched.
pub fn step<R: Rng>(
    state: &GameState,
    action: Action,
    rng: &mut R,
    ids: &mut IdGen,
) -> Transition {
    if state.game_over {
        return Transition {
            state: state.clone(),
            followup: None,
        };
    }
    let mut next = state.clone();
    // Previous spawn markers and clear highlights are one beat old by now.
    next.cleared_cells.clear();
    for b in next.grid.blocks_mut() {
        b.is_new = false;
    }
    let followup = match action {
        Action::Click(id) => apply_click(&mut next, id, rng),
        Action::CountdownTick => {
            apply_countdown_tick(&mut next, rng, ids);
            None
        }
        Action::SpawnRow => {
            spawn_row(&mut next, rng, ids);
            None
        }
    };
    Transition {
        state: next,
        followup,
    }
}

/// Toggle the clicked id, classify the new selection, and on a match clear
/// the blocks, settle the grid, and re-roll the target.
fn apply_click<R: Rng>(state: &mut GameState, id: BlockId, rng: &mut R) -> Option<Followup> {
    if let Some(pos) = state.selected.iter().position(|&s| s == id) {
        state.selected.remove(pos);
    } else if state.grid.find(id).is_some() {
        state.selected.push(id);
    } else {
        // Stale click (block already cleared). Never enters the selection.
        return None;
    }

    let sum = selection_sum(&state.grid, &state.selected);
    match classify(sum, state.target) {
        SumCheck::Match => {
            let mut cleared = Vec::with_capacity(state.selected.len());
            for id in state.selected.clone() {
                if let Some(&Block { row, col, .. }) = state.grid.find(id) {
                    state.grid.take(row, col);
                    cleared.push((row, col));
                }
            }
            apply_gravity(&mut state.grid);
            state.score += state.selected.len() as u32 * SCORE_PER_BLOCK;
            state.matches += 1;
            state.level = 1 + state.matches / MATCHES_PER_LEVEL;
            state.selected.clear();
            state.target = random_target(rng);
            state.time_left_ticks = state.max_time_ticks;
            state.cleared_cells = cleared;
            (state.mode == Mode::Classic).then_some(Followup::ScheduleSpawn)
        }
        SumCheck::Overshoot => {
            state.selected.clear();
            None
        }
        SumCheck::Pending => None,
    }
}

/// Time-mode countdown. The tick that empties the timer is the expiry tick:
/// it spawns a row and rearms the countdown instead of leaving a zero.
fn apply_countdown_tick<R: Rng>(state: &mut GameState, rng: &mut R, ids: &mut IdGen) {
    if state.mode != Mode::Time {
        return;
    }
    state.time_left_ticks = state.time_left_ticks.saturating_sub(1);
    if state.time_left_ticks == 0 {
        spawn_row(state, rng, ids);
        state.time_left_ticks = state.max_time_ticks;
    }
}

/// Shift the whole grid up one row and fill the bottom with fresh blocks,
/// or flag game over if the top row is already occupied. The check reflects
/// the grid as it stands, not the row about to spawn. No-op once game over.
fn spawn_row<R: Rng>(state: &mut GameState, rng: &mut R, ids: &mut IdGen) {
    if state.game_over {
        return;
    }
    if state.grid.row_occupied(0) {
        state.game_over = true;
        return;
    }
    for row in 0..GRID_ROWS - 1 {
        for col in 0..GRID_COLS {
            if let Some(mut b) = state.grid.take(row + 1, col) {
                b.row = row;
                state.grid.put(row, col, b);
            }
        }
    }
    let bottom = GRID_ROWS - 1;
    for col in 0..GRID_COLS {
        state.grid.put(
            bottom,
            col,
            Block {
                id: ids.next_id(),
                value: random_block_value(rng),
                row: bottom,
                col,
                is_new: true,
            },
        );
    }
}

/// Settle every column independently: occupied cells pack to the bottom,
/// preserving their top-to-bottom order. Idempotent.
pub fn apply_gravity(grid: &mut Grid) {
    for col in 0..GRID_COLS {
        let mut write = GRID_ROWS - 1;
        for row in (0..GRID_ROWS).rev() {
            if let Some(mut b) = grid.take(row, col) {
                b.row = write;
                b.col = col;
                grid.put(write, col, b);
                write = write.saturating_sub(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn place(grid: &mut Grid, ids: &mut IdGen, value: u8, row: usize, col: usize) -> BlockId {
        let id = ids.next_id();
        grid.put(
            row,
            col,
            Block {
                id,
                value,
                row,
                col,
                is_new: false,
            },
        );
        id
    }

    fn bare_state(grid: Grid, target: u32, mode: Mode) -> GameState {
        GameState {
            grid,
            target,
            score: 0,
            level: 1,
            matches: 0,
            game_over: false,
            selected: Vec::new(),
            mode,
            time_left_ticks: MAX_TIME_TICKS,
            max_time_ticks: MAX_TIME_TICKS,
            cleared_cells: Vec::new(),
        }
    }

    fn selection_in_grid(state: &GameState) -> bool {
        state
            .selected
            .iter()
            .all(|&id| state.grid.find(id).is_some())
    }

    #[test]
    fn test_new_game_seeds_bottom_rows() {
        let state = GameState::new(Mode::Classic, &mut rng(), &mut IdGen::new());
        for row in 0..GRID_ROWS - INITIAL_ROWS {
            assert!(!state.grid.row_occupied(row));
        }
        for row in GRID_ROWS - INITIAL_ROWS..GRID_ROWS {
            for col in 0..GRID_COLS {
                let b = state.grid.get(row, col).expect("seeded cell");
                assert!((BLOCK_MIN..=BLOCK_MAX).contains(&b.value));
                assert_eq!((b.row, b.col), (row, col));
            }
        }
        assert!((TARGET_MIN..=TARGET_MAX).contains(&state.target));
        assert_eq!(state.score, 0);
        assert_eq!(state.level, 1);
        assert!(!state.game_over);
    }

    #[test]
    fn test_generated_values_stay_in_range() {
        let mut r = rng();
        for _ in 0..1000 {
            assert!((BLOCK_MIN..=BLOCK_MAX).contains(&random_block_value(&mut r)));
            assert!((TARGET_MIN..=TARGET_MAX).contains(&random_target(&mut r)));
        }
    }

    #[test]
    fn test_id_gen_never_repeats() {
        let mut ids = IdGen::new();
        let a = ids.next_id();
        let b = ids.next_id();
        let c = ids.next_id();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_toggle_selects_then_deselects() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        let a = place(&mut grid, &mut ids, 3, 9, 0);
        let state = bare_state(grid, 15, Mode::Classic);

        let t = step(&state, Action::Click(a), &mut rng(), &mut ids);
        assert_eq!(t.state.selected, vec![a]);
        let t = step(&t.state, Action::Click(a), &mut rng(), &mut ids);
        assert!(t.state.selected.is_empty());
    }

    #[test]
    fn test_selection_keeps_click_order() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        let a = place(&mut grid, &mut ids, 2, 9, 0);
        let b = place(&mut grid, &mut ids, 3, 9, 1);
        let c = place(&mut grid, &mut ids, 4, 9, 2);
        let state = bare_state(grid, 20, Mode::Classic);

        let t = step(&state, Action::Click(b), &mut rng(), &mut ids);
        let t = step(&t.state, Action::Click(a), &mut rng(), &mut ids);
        let t = step(&t.state, Action::Click(c), &mut rng(), &mut ids);
        assert_eq!(t.state.selected, vec![b, a, c]);
    }

    #[test]
    fn test_selection_sum_ignores_missing_ids() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        let a = place(&mut grid, &mut ids, 5, 9, 0);
        let ghost = ids.next_id();
        assert_eq!(selection_sum(&grid, &[a, ghost]), 5);
    }

    #[test]
    fn test_classify_in_order() {
        assert_eq!(classify(10, 10), SumCheck::Match);
        assert_eq!(classify(11, 10), SumCheck::Overshoot);
        assert_eq!(classify(9, 10), SumCheck::Pending);
        assert_eq!(classify(0, 10), SumCheck::Pending);
    }

    #[test]
    fn test_stale_click_is_ignored() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        place(&mut grid, &mut ids, 3, 9, 0);
        let ghost = ids.next_id();
        let state = bare_state(grid, 10, Mode::Classic);

        let t = step(&state, Action::Click(ghost), &mut rng(), &mut ids);
        assert!(t.state.selected.is_empty());
        assert!(selection_in_grid(&t.state));
    }

    // Single column [3, 7] in rows 0-1, target 10: clicking both matches,
    // scores 20, empties the board; gravity has nothing to move.
    #[test]
    fn test_match_clears_blocks_and_scores() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        let a = place(&mut grid, &mut ids, 3, 0, 0);
        let b = place(&mut grid, &mut ids, 7, 1, 0);
        let state = bare_state(grid, 10, Mode::Classic);

        let t = step(&state, Action::Click(a), &mut rng(), &mut ids);
        assert_eq!(t.state.selected, vec![a]);
        assert!(t.followup.is_none());

        let t = step(&t.state, Action::Click(b), &mut rng(), &mut ids);
        assert_eq!(t.state.score, 2 * SCORE_PER_BLOCK);
        assert_eq!(t.state.grid.blocks().count(), 0);
        assert!(t.state.selected.is_empty());
        assert_eq!(t.state.matches, 1);
        assert_eq!(t.followup, Some(Followup::ScheduleSpawn));
        assert_eq!(t.state.cleared_cells.len(), 2);
        assert!((TARGET_MIN..=TARGET_MAX).contains(&t.state.target));
    }

    #[test]
    fn test_match_in_time_mode_schedules_nothing_and_resets_timer() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        let a = place(&mut grid, &mut ids, 4, 9, 0);
        let b = place(&mut grid, &mut ids, 6, 9, 1);
        let mut state = bare_state(grid, 10, Mode::Time);
        state.time_left_ticks = 17;

        let t = step(&state, Action::Click(a), &mut rng(), &mut ids);
        let t = step(&t.state, Action::Click(b), &mut rng(), &mut ids);
        assert!(t.followup.is_none());
        assert_eq!(t.state.time_left_ticks, t.state.max_time_ticks);
    }

    // Sum 15 against target 10: the selection resets and nothing else moves.
    #[test]
    fn test_overshoot_resets_selection_only() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        let a = place(&mut grid, &mut ids, 7, 9, 0);
        let b = place(&mut grid, &mut ids, 8, 9, 1);
        let state = bare_state(grid.clone(), 10, Mode::Classic);

        let t = step(&state, Action::Click(a), &mut rng(), &mut ids);
        let t = step(&t.state, Action::Click(b), &mut rng(), &mut ids);
        assert!(t.state.selected.is_empty());
        assert_eq!(t.state.grid, grid);
        assert_eq!(t.state.score, 0);
        assert_eq!(t.state.target, 10);
    }

    #[test]
    fn test_gravity_compacts_and_preserves_order() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        place(&mut grid, &mut ids, 1, 2, 3);
        place(&mut grid, &mut ids, 2, 5, 3);
        place(&mut grid, &mut ids, 3, 7, 3);
        apply_gravity(&mut grid);

        assert_eq!(grid.get(7, 3).map(|b| b.value), Some(1));
        assert_eq!(grid.get(8, 3).map(|b| b.value), Some(2));
        assert_eq!(grid.get(9, 3).map(|b| b.value), Some(3));
        for row in 0..7 {
            assert!(grid.get(row, 3).is_none());
        }
        for b in grid.blocks() {
            assert_eq!(b.col, 3);
        }
    }

    #[test]
    fn test_gravity_is_idempotent() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        place(&mut grid, &mut ids, 4, 1, 0);
        place(&mut grid, &mut ids, 9, 6, 0);
        place(&mut grid, &mut ids, 2, 3, 5);
        apply_gravity(&mut grid);
        let settled = grid.clone();
        apply_gravity(&mut grid);
        assert_eq!(grid, settled);
    }

    #[test]
    fn test_gravity_leaves_columns_independent() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        place(&mut grid, &mut ids, 1, 0, 0);
        place(&mut grid, &mut ids, 2, 9, 1);
        apply_gravity(&mut grid);
        assert_eq!(grid.get(9, 0).map(|b| b.value), Some(1));
        assert_eq!(grid.get(9, 1).map(|b| b.value), Some(2));
    }

    #[test]
    fn test_spawn_shifts_up_and_fills_bottom() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        let a = place(&mut grid, &mut ids, 5, 5, 2);
        let state = bare_state(grid, 10, Mode::Classic);

        let t = step(&state, Action::SpawnRow, &mut rng(), &mut ids);
        assert!(!t.state.game_over);
        let moved = t.state.grid.find(a).expect("survivor");
        assert_eq!((moved.row, moved.col), (4, 2));
        for col in 0..GRID_COLS {
            let b = t.state.grid.get(GRID_ROWS - 1, col).expect("fresh row");
            assert!(b.is_new);
            assert!((BLOCK_MIN..=BLOCK_MAX).contains(&b.value));
        }
    }

    #[test]
    fn test_spawn_with_occupied_top_row_ends_game() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        place(&mut grid, &mut ids, 5, 0, 0);
        place(&mut grid, &mut ids, 6, 9, 3);
        let state = bare_state(grid.clone(), 10, Mode::Classic);

        let t = step(&state, Action::SpawnRow, &mut rng(), &mut ids);
        assert!(t.state.game_over);
        assert_eq!(t.state.grid, grid);
    }

    #[test]
    fn test_spawn_markers_clear_on_next_transition() {
        let mut ids = IdGen::new();
        let state = bare_state(Grid::empty(), 10, Mode::Classic);
        let t = step(&state, Action::SpawnRow, &mut rng(), &mut ids);
        assert!(t.state.grid.blocks().all(|b| b.is_new));
        let t = step(&t.state, Action::SpawnRow, &mut rng(), &mut ids);
        // Only the newest bottom row carries the marker now.
        for b in t.state.grid.blocks() {
            assert_eq!(b.is_new, b.row == GRID_ROWS - 1);
        }
    }

    #[test]
    fn test_countdown_tick_decrements() {
        let mut ids = IdGen::new();
        let state = bare_state(Grid::empty(), 10, Mode::Time);
        let t = step(&state, Action::CountdownTick, &mut rng(), &mut ids);
        assert_eq!(t.state.time_left_ticks, MAX_TIME_TICKS - 1);
        assert_eq!(t.state.grid.blocks().count(), 0);
    }

    #[test]
    fn test_countdown_expiry_spawns_and_resets() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        let a = place(&mut grid, &mut ids, 5, 9, 0);
        let mut state = bare_state(grid, 10, Mode::Time);
        state.time_left_ticks = 1;

        let t = step(&state, Action::CountdownTick, &mut rng(), &mut ids);
        assert_eq!(t.state.time_left_ticks, t.state.max_time_ticks);
        let moved = t.state.grid.find(a).expect("survivor");
        assert_eq!(moved.row, 8);
        assert!(t.state.grid.row_occupied(GRID_ROWS - 1));
    }

    #[test]
    fn test_countdown_runs_one_spawn_per_full_cycle() {
        let mut ids = IdGen::new();
        let mut state = bare_state(Grid::empty(), 10, Mode::Time);
        let mut spawns = 0;
        let mut r = rng();
        for _ in 0..MAX_TIME_TICKS {
            let before = state.grid.blocks().count();
            state = step(&state, Action::CountdownTick, &mut r, &mut ids).state;
            if state.grid.blocks().count() > before {
                spawns += 1;
            }
        }
        assert_eq!(spawns, 1);
        assert_eq!(state.time_left_ticks, state.max_time_ticks);
    }

    #[test]
    fn test_countdown_ignored_in_classic_mode() {
        let mut ids = IdGen::new();
        let state = bare_state(Grid::empty(), 10, Mode::Classic);
        let t = step(&state, Action::CountdownTick, &mut rng(), &mut ids);
        assert_eq!(t.state.time_left_ticks, MAX_TIME_TICKS);
        assert_eq!(t.state.grid.blocks().count(), 0);
    }

    #[test]
    fn test_game_over_is_terminal() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        let a = place(&mut grid, &mut ids, 5, 9, 0);
        let mut state = bare_state(grid, 10, Mode::Time);
        state.game_over = true;

        for action in [Action::Click(a), Action::CountdownTick, Action::SpawnRow] {
            let t = step(&state, action, &mut rng(), &mut ids);
            assert_eq!(t.state, state);
            assert!(t.followup.is_none());
        }
    }

    #[test]
    fn test_level_steps_every_fifth_match() {
        let mut grid = Grid::empty();
        let mut ids = IdGen::new();
        let a = place(&mut grid, &mut ids, 4, 9, 0);
        let b = place(&mut grid, &mut ids, 6, 9, 1);
        let mut state = bare_state(grid, 10, Mode::Classic);
        state.matches = MATCHES_PER_LEVEL - 1;

        let t = step(&state, Action::Click(a), &mut rng(), &mut ids);
        let t = step(&t.state, Action::Click(b), &mut rng(), &mut ids);
        assert_eq!(t.state.matches, MATCHES_PER_LEVEL);
        assert_eq!(t.state.level, 2);
    }

    #[test]
    fn test_selection_invariant_survives_transitions() {
        let mut ids = IdGen::new();
        let mut r = rng();
        let mut state = GameState::new(Mode::Classic, &mut r, &mut ids);
        let clicked: Vec<BlockId> = state.grid.blocks().take(5).map(|b| b.id).collect();
        for id in clicked {
            state = step(&state, Action::Click(id), &mut r, &mut ids).state;
            assert!(selection_in_grid(&state));
        }
        state = step(&state, Action::SpawnRow, &mut r, &mut ids).state;
        assert!(selection_in_grid(&state));
    }
}
