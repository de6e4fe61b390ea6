//! AI 算法模块（极小极大搜索与 alpha-beta 剪枝）。

pub mod minimax;

pub use minimax::{
    minimax,
    possible_moves,
    static_eval,
    AiAgent,
    AiConfig,
    AiDecision,
    SearchStats,
    MAX_DEPTH,
    WIN_SCORE,
};
