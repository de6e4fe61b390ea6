use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::game::{check_for_win, is_game_over, Board, Cell, Move, Side, BOARD_SIZE, CELL_COUNT};

/// 胜负基准分。必须大于最大搜索深度，胜负才始终压过深度加成。
pub const WIN_SCORE: i32 = 15;
/// 固定搜索深度，超过 9 个格子，3×3 对局总能算到底。
pub const MAX_DEPTH: u8 = 12;

const _: () = assert!(WIN_SCORE > MAX_DEPTH as i32);

/// 静态评估：X 连成一线得 WIN_SCORE + depth，O 连线取负值，其余 0。
/// depth 是剩余搜索深度，剩得越多说明赢得越早，分数也越高；
/// 反过来输棋拖得越久扣得越少。
pub fn static_eval(board: &Board, depth: u8) -> i32 {
    if check_for_win(board, Side::X) {
        WIN_SCORE + depth as i32
    } else if check_for_win(board, Side::O) {
        -(WIN_SCORE + depth as i32)
    } else {
        0
    }
}

/// 按行优先顺序枚举所有空格。顺序决定同分时保留哪一步。
pub fn possible_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    for row in 0..BOARD_SIZE {
        for col in 0..BOARD_SIZE {
            if board.is_empty_cell(row, col) {
                moves.push(Move::new(row, col));
            }
        }
    }
    moves
}

/// 搜索统计。
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub nodes: u64,
}

/// 带 alpha-beta 剪枝的极小极大搜索。
/// 落子与撤销严格配对，函数返回时棋盘与进入时逐格一致。
pub fn minimax(
    board: &mut Board,
    depth: u8,
    mut alpha: i32,
    mut beta: i32,
    maximizing: bool,
    stats: &mut SearchStats,
) -> i32 {
    stats.nodes += 1;

    let score = static_eval(board, depth);
    if score != 0 || depth == 0 || is_game_over(board) {
        return score;
    }

    if maximizing {
        let mut value = i32::MIN;
        for mov in possible_moves(board) {
            board.set(mov.row, mov.col, Cell::X);
            let evaluation = minimax(board, depth - 1, alpha, beta, false, stats);
            board.clear(mov.row, mov.col);
            value = value.max(evaluation);
            alpha = alpha.max(evaluation);
            if beta <= alpha {
                break;
            }
        }
        value
    } else {
        let mut value = i32::MAX;
        for mov in possible_moves(board) {
            board.set(mov.row, mov.col, Cell::O);
            let evaluation = minimax(board, depth - 1, alpha, beta, true, stats);
            board.clear(mov.row, mov.col);
            value = value.min(evaluation);
            beta = beta.min(evaluation);
            if beta <= alpha {
                break;
            }
        }
        value
    }
}

/// 搜索配置。random_opening 控制空棋盘第一手是否随机选点。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AiConfig {
    pub max_depth: u8,
    pub random_opening: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            random_opening: true,
        }
    }
}

/// 一次选点的结果。mov 为 None 表示棋盘上已没有合法落点。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDecision {
    #[serde(rename = "move")]
    pub mov: Option<Move>,
    pub evaluation: i32,
    pub nodes: u64,
    pub random_opening: bool,
}

pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// 为 side 选出最佳落点：逐一试下候选点并用 minimax 评估，
    /// X 取最大分，O 取最小分，同分保留先枚举到的那步。
    /// 返回前撤销所有试下，棋盘保持原样。
    pub fn find_best_move(&mut self, board: &mut Board, side: Side) -> AiDecision {
        let moves = possible_moves(board);
        if moves.is_empty() {
            return AiDecision {
                mov: None,
                evaluation: static_eval(board, 0),
                nodes: 0,
                random_opening: false,
            };
        }

        // 空棋盘第一手随机选点：省掉一轮全深度搜索，开局也有变化。
        if self.config.random_opening && moves.len() == CELL_COUNT {
            let mov = moves.choose(&mut self.rng).copied();
            return AiDecision {
                mov,
                evaluation: 0,
                nodes: 0,
                random_opening: true,
            };
        }

        let maximizing = side.is_maximizing();
        let mut stats = SearchStats::default();
        let mut best_move = None;
        let mut best_score = if maximizing { i32::MIN } else { i32::MAX };

        for mov in moves {
            board.set(mov.row, mov.col, side.cell());
            let evaluation = minimax(
                board,
                self.config.max_depth,
                i32::MIN,
                i32::MAX,
                side.opponent().is_maximizing(),
                &mut stats,
            );
            board.clear(mov.row, mov.col);

            if (maximizing && evaluation > best_score) || (!maximizing && evaluation < best_score) {
                best_score = evaluation;
                best_move = Some(mov);
            }
        }

        AiDecision {
            mov: best_move,
            evaluation: best_score,
            nodes: stats.nodes,
            random_opening: false,
        }
    }
}
