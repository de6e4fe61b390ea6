//! 对局核心逻辑模块（棋盘、规则引擎、会话状态）。

pub mod board;
pub mod rules;
pub mod state;

pub use board::{
    index_to_coords,
    Board,
    Cell,
    Move,
    Side,
    BOARD_SIZE,
    CELL_COUNT,
    WIN_COMBINATIONS,
    WIN_LINES,
};
pub use rules::{
    check_for_draw,
    check_for_win,
    is_game_over,
    PlaceMarkAction,
    RuleEngine,
    RuleError,
    RuleResolution,
};
pub use state::{GameEvent, GameOutcome, GamePhase, GameState, IntegrityError};
