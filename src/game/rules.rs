use serde::{Deserialize, Serialize};

use super::board::{Board, Side, BOARD_SIZE, WIN_LINES};
use super::state::{GameEvent, GameOutcome, GameState, IntegrityError};

/// side 是否占满任意一条胜利线。纯函数，只依赖棋盘。
pub fn check_for_win(board: &Board, side: Side) -> bool {
    let target = side.cell();
    WIN_LINES
        .iter()
        .any(|line| line.iter().all(|&(row, col)| board.get(row, col) == target))
}

/// 棋盘是否已全部填满。
pub fn check_for_draw(board: &Board) -> bool {
    board.is_full()
}

/// 任意一方获胜或棋盘填满即对局结束。
pub fn is_game_over(board: &Board) -> bool {
    check_for_win(board, Side::X) || check_for_win(board, Side::O) || check_for_draw(board)
}

/// 唯一会改动对局的动作：当前回合方在 (row, col) 落子。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaceMarkAction {
    pub side: Side,
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    GameFinished,
    NotPlayerTurn { side: Side },
    OutOfBounds { row: usize, col: usize },
    CellOccupied { row: usize, col: usize },
    UnknownSide { value: String },
    IntegrityViolation { error: IntegrityError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameOutcome>,
}

impl RuleResolution {
    pub fn new(state: GameState, mut events: Vec<GameEvent>) -> Self {
        let outcome = state.outcome;
        if let Some(outcome) = outcome {
            let has_event = events
                .iter()
                .any(|event| matches!(event, GameEvent::GameWon { .. } | GameEvent::GameDrawn));
            if !has_event {
                events.push(match outcome {
                    GameOutcome::Won { winner } => GameEvent::GameWon { winner },
                    GameOutcome::Drawn => GameEvent::GameDrawn,
                });
            }
        }

        Self {
            state,
            events,
            outcome,
        }
    }
}

#[derive(Debug, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    fn ensure_live_game(state: &GameState) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        Ok(())
    }

    fn ensure_turn_owner(state: &GameState, side: Side) -> Result<(), RuleError> {
        if state.current_player != side {
            return Err(RuleError::NotPlayerTurn { side });
        }
        Ok(())
    }

    fn ensure_in_bounds(row: usize, col: usize) -> Result<(), RuleError> {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return Err(RuleError::OutOfBounds { row, col });
        }
        Ok(())
    }

    fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    /// 当前回合方落子。返回本次触发的事件；非法请求不改动状态。
    pub fn place_mark(
        &mut self,
        state: &mut GameState,
        action: PlaceMarkAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_live_game(state)?;
        Self::ensure_integrity(state)?;
        Self::ensure_in_bounds(action.row, action.col)?;
        Self::ensure_turn_owner(state, action.side)?;
        if !state.board.is_empty_cell(action.row, action.col) {
            return Err(RuleError::CellOccupied {
                row: action.row,
                col: action.col,
            });
        }

        let log_start = state.event_log.len();
        state.apply_mark(action.side, action.row, action.col);

        if check_for_win(&state.board, action.side) {
            state.declare_outcome(GameOutcome::Won {
                winner: action.side,
            });
        } else if check_for_draw(&state.board) {
            state.declare_outcome(GameOutcome::Drawn);
        } else {
            state.swap_turn();
            state.record_event(GameEvent::TurnPassed {
                next: state.current_player,
            });
        }

        Ok(state.event_log[log_start..].to_vec())
    }

    /// 重新开局（对应界面上的 Reset/Restart 按钮）。
    pub fn reset(&mut self, state: &mut GameState) -> Vec<GameEvent> {
        state.reset();
        vec![GameEvent::GameReset]
    }

    pub fn check_victory(state: &mut GameState) -> Option<GameOutcome> {
        state.evaluate_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Cell, WIN_COMBINATIONS};
    use crate::game::{index_to_coords, GamePhase};

    fn place(engine: &mut RuleEngine, state: &mut GameState, side: Side, row: usize, col: usize) {
        let action = PlaceMarkAction { side, row, col };
        engine
            .place_mark(state, action)
            .expect("mark should be accepted");
    }

    #[test]
    fn every_combination_counts_as_a_win() {
        for combination in WIN_COMBINATIONS {
            let mut board = Board::new();
            for idx in combination {
                let (row, col) = index_to_coords(idx);
                board.set(row, col, Cell::O);
            }
            assert!(check_for_win(&board, Side::O));
            assert!(!check_for_win(&board, Side::X));
            assert!(is_game_over(&board));
        }
    }

    #[test]
    fn full_board_without_line_is_a_draw() {
        use Cell::{O, X};
        let board = Board::from_cells([[X, O, X], [X, O, O], [O, X, X]]);
        assert!(check_for_draw(&board));
        assert!(!check_for_win(&board, Side::X));
        assert!(!check_for_win(&board, Side::O));
        assert!(is_game_over(&board));
    }

    #[test]
    fn partial_board_is_not_over() {
        let mut board = Board::new();
        board.set(1, 1, Cell::X);
        assert!(!check_for_draw(&board));
        assert!(!is_game_over(&board));
    }

    #[test]
    fn first_mark_starts_the_game_and_passes_turn() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();

        let events = engine
            .place_mark(
                &mut state,
                PlaceMarkAction {
                    side: Side::X,
                    row: 1,
                    col: 1,
                },
            )
            .expect("opening mark should be accepted");

        assert_eq!(state.phase, GamePhase::InProgress);
        assert_eq!(state.current_player, Side::O);
        assert_eq!(
            events,
            vec![
                GameEvent::MarkPlaced {
                    side: Side::X,
                    row: 1,
                    col: 1
                },
                GameEvent::TurnPassed { next: Side::O },
            ]
        );
    }

    #[test]
    fn rejects_mark_out_of_turn() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();

        let result = engine.place_mark(
            &mut state,
            PlaceMarkAction {
                side: Side::O,
                row: 0,
                col: 0,
            },
        );
        assert_eq!(result, Err(RuleError::NotPlayerTurn { side: Side::O }));
        assert_eq!(state, GameState::new());
    }

    #[test]
    fn rejects_occupied_cell() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        place(&mut engine, &mut state, Side::X, 0, 0);

        let result = engine.place_mark(
            &mut state,
            PlaceMarkAction {
                side: Side::O,
                row: 0,
                col: 0,
            },
        );
        assert_eq!(result, Err(RuleError::CellOccupied { row: 0, col: 0 }));
    }

    #[test]
    fn rejects_out_of_bounds_coordinates() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();

        let result = engine.place_mark(
            &mut state,
            PlaceMarkAction {
                side: Side::X,
                row: BOARD_SIZE,
                col: 0,
            },
        );
        assert_eq!(
            result,
            Err(RuleError::OutOfBounds {
                row: BOARD_SIZE,
                col: 0
            })
        );
    }

    #[test]
    fn completed_row_wins_and_locks_the_game() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        place(&mut engine, &mut state, Side::X, 0, 0);
        place(&mut engine, &mut state, Side::O, 1, 0);
        place(&mut engine, &mut state, Side::X, 0, 1);
        place(&mut engine, &mut state, Side::O, 1, 1);

        let events = engine
            .place_mark(
                &mut state,
                PlaceMarkAction {
                    side: Side::X,
                    row: 0,
                    col: 2,
                },
            )
            .expect("winning mark should be accepted");

        assert_eq!(state.outcome, Some(GameOutcome::Won { winner: Side::X }));
        assert!(events.contains(&GameEvent::GameWon { winner: Side::X }));
        // 胜负已定，回合不再交换。
        assert_eq!(state.current_player, Side::X);

        let result = engine.place_mark(
            &mut state,
            PlaceMarkAction {
                side: Side::O,
                row: 2,
                col: 2,
            },
        );
        assert_eq!(result, Err(RuleError::GameFinished));
    }

    #[test]
    fn filling_the_board_without_line_draws() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        // 终盘为 X O X / X O O / O X X 的和棋行棋序。
        let script = [
            (Side::X, 0, 0),
            (Side::O, 0, 1),
            (Side::X, 0, 2),
            (Side::O, 1, 1),
            (Side::X, 1, 0),
            (Side::O, 1, 2),
            (Side::X, 2, 1),
            (Side::O, 2, 0),
        ];
        for (side, row, col) in script {
            place(&mut engine, &mut state, side, row, col);
        }

        let events = engine
            .place_mark(
                &mut state,
                PlaceMarkAction {
                    side: Side::X,
                    row: 2,
                    col: 2,
                },
            )
            .expect("final mark should be accepted");

        assert_eq!(state.outcome, Some(GameOutcome::Drawn));
        assert!(events.contains(&GameEvent::GameDrawn));
        assert!(check_for_draw(&state.board));
    }

    #[test]
    fn reset_reopens_a_finished_game() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        place(&mut engine, &mut state, Side::X, 0, 0);

        let events = engine.reset(&mut state);
        assert_eq!(events, vec![GameEvent::GameReset]);
        assert_eq!(state.phase, GamePhase::Idle);
        assert_eq!(state.board, Board::new());

        place(&mut engine, &mut state, Side::X, 2, 2);
        assert_eq!(state.current_player, Side::O);
    }

    #[test]
    fn corrupt_state_is_rejected_before_mutation() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        state.board.set(0, 0, Cell::X);
        state.board.set(0, 1, Cell::X);
        state.board.set(0, 2, Cell::X);
        state.current_player = Side::O;

        let result = engine.place_mark(
            &mut state,
            PlaceMarkAction {
                side: Side::O,
                row: 2,
                col: 2,
            },
        );
        assert_eq!(
            result,
            Err(RuleError::IntegrityViolation {
                error: IntegrityError::MarkCountSkewed {
                    x_marks: 3,
                    o_marks: 0
                }
            })
        );
    }

    #[test]
    fn check_victory_derives_outcome_from_raw_board() {
        let mut state = GameState::new();
        for idx in [0, 4, 8] {
            let (row, col) = index_to_coords(idx);
            state.board.set(row, col, Cell::O);
        }

        assert_eq!(
            RuleEngine::check_victory(&mut state),
            Some(GameOutcome::Won { winner: Side::O })
        );
        assert!(state.is_finished());
    }

    #[test]
    fn resolution_appends_missing_terminal_event() {
        let mut state = GameState::new();
        state.outcome = Some(GameOutcome::Won { winner: Side::X });

        let resolution = RuleResolution::new(state, Vec::new());
        assert_eq!(
            resolution.events,
            vec![GameEvent::GameWon { winner: Side::X }]
        );
        assert_eq!(
            resolution.outcome,
            Some(GameOutcome::Won { winner: Side::X })
        );
    }
}
