use serde::{Deserialize, Serialize};

use super::board::{Board, Side};
use super::rules::check_for_win;

/// 对局阶段。Idle 表示还没有任何落子。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GamePhase {
    Idle,
    InProgress,
}

impl Default for GamePhase {
    fn default() -> Self {
        GamePhase::Idle
    }
}

/// 终局结果。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameOutcome {
    Won { winner: Side },
    Drawn,
}

/// 对局事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MarkPlaced { side: Side, row: usize, col: usize },
    TurnPassed { next: Side },
    GameWon { winner: Side },
    GameDrawn,
    GameReset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    MarkCountSkewed {
        x_marks: usize,
        o_marks: usize,
    },
    CurrentPlayerMismatch {
        expected: Side,
        actual: Side,
    },
    MissingWinningLine {
        claimed: Side,
    },
}

/// 对局整体状态。回合归属是这里的字段，而不是模块级全局量。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    #[serde(default)]
    pub board: Board,
    pub current_player: Side,
    #[serde(default)]
    pub phase: GamePhase,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameOutcome>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current_player: Side::X,
            phase: GamePhase::Idle,
            event_log: Vec::new(),
            outcome: None,
        }
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// 在指定格子落子并进入 InProgress。格子合法性由规则层把关。
    pub fn apply_mark(&mut self, side: Side, row: usize, col: usize) {
        self.board.set(row, col, side.cell());
        self.phase = GamePhase::InProgress;
        self.record_event(GameEvent::MarkPlaced { side, row, col });
    }

    pub fn swap_turn(&mut self) {
        self.current_player = self.current_player.opponent();
    }

    pub fn declare_outcome(&mut self, outcome: GameOutcome) -> GameOutcome {
        if self.outcome.is_none() {
            let event = match outcome {
                GameOutcome::Won { winner } => GameEvent::GameWon { winner },
                GameOutcome::Drawn => GameEvent::GameDrawn,
            };
            self.record_event(event);
            self.outcome = Some(outcome);
        }
        outcome
    }

    /// 从棋盘推导终局结果并宣布；已有结果时直接返回。
    pub fn evaluate_outcome(&mut self) -> Option<GameOutcome> {
        if self.outcome.is_some() {
            return self.outcome;
        }

        let derived = if check_for_win(&self.board, Side::X) {
            Some(GameOutcome::Won { winner: Side::X })
        } else if check_for_win(&self.board, Side::O) {
            Some(GameOutcome::Won { winner: Side::O })
        } else if self.board.is_full() {
            Some(GameOutcome::Drawn)
        } else {
            None
        };

        if let Some(outcome) = derived {
            self.declare_outcome(outcome);
        }
        self.outcome
    }

    /// 回到空棋盘、X 先手的初始状态（对应界面上的重开按钮）。
    pub fn reset(&mut self) {
        self.board.reset();
        self.current_player = Side::X;
        self.phase = GamePhase::Idle;
        self.outcome = None;
        self.record_event(GameEvent::GameReset);
    }

    /// 一致性检查：双方落子数最多相差 1（任意一方都可能先手）；
    /// 数目不等时回合必须轮到落子少的一方；宣布的胜者必须真的连成一线。
    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let x_marks = self.board.mark_count(Side::X);
        let o_marks = self.board.mark_count(Side::O);
        if x_marks.abs_diff(o_marks) > 1 {
            return Err(IntegrityError::MarkCountSkewed { x_marks, o_marks });
        }

        if self.outcome.is_none() && x_marks != o_marks {
            let expected = if x_marks > o_marks { Side::O } else { Side::X };
            if self.current_player != expected {
                return Err(IntegrityError::CurrentPlayerMismatch {
                    expected,
                    actual: self.current_player,
                });
            }
        }

        if let Some(GameOutcome::Won { winner }) = self.outcome {
            if !check_for_win(&self.board, winner) {
                return Err(IntegrityError::MissingWinningLine { claimed: winner });
            }
        }

        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
