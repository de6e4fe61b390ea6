use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// 棋盘边长。
pub const BOARD_SIZE: usize = 3;
/// 格子总数。
pub const CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// 8 条胜利线（线性下标表示：3 行、3 列、2 条对角线）。
pub const WIN_COMBINATIONS: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// 胜利线的 (row, col) 形式，首次访问时由线性下标推导。
pub static WIN_LINES: Lazy<[[(usize, usize); 3]; 8]> =
    Lazy::new(|| WIN_COMBINATIONS.map(|line| line.map(index_to_coords)));

/// 将格子的线性下标转换为 (row, col)。
pub fn index_to_coords(idx: usize) -> (usize, usize) {
    (idx / BOARD_SIZE, idx % BOARD_SIZE)
}

/// 单个格子的状态。序列化成 ""/"x"/"o"，与前端持有的棋盘数组一致。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Cell {
    #[serde(rename = "")]
    Empty,
    #[serde(rename = "x")]
    X,
    #[serde(rename = "o")]
    O,
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Empty
    }
}

/// 对局双方。X 为极大化方，O 为极小化方。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    X,
    O,
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::X => Side::O,
            Side::O => Side::X,
        }
    }

    pub fn cell(&self) -> Cell {
        match self {
            Side::X => Cell::X,
            Side::O => Cell::O,
        }
    }

    pub fn is_maximizing(&self) -> bool {
        matches!(self, Side::X)
    }
}

impl FromStr for Side {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" | "a" | "player1" => Ok(Side::X),
            "o" | "b" | "player2" => Ok(Side::O),
            _ => Err(()),
        }
    }
}

/// 一步落子的坐标（0 起始）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Move {
    pub row: usize,
    pub col: usize,
}

impl Move {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// 3×3 棋盘。越界坐标属于调用方错误，访问时直接 panic。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    pub fn from_cells(cells: [[Cell; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row][col] = cell;
    }

    pub fn clear(&mut self, row: usize, col: usize) {
        self.cells[row][col] = Cell::Empty;
    }

    pub fn is_empty_cell(&self, row: usize, col: usize) -> bool {
        self.cells[row][col] == Cell::Empty
    }

    pub fn is_full(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .all(|&cell| cell != Cell::Empty)
    }

    pub fn mark_count(&self, side: Side) -> usize {
        let target = side.cell();
        self.cells
            .iter()
            .flatten()
            .filter(|&&cell| cell == target)
            .count()
    }

    pub fn reset(&mut self) {
        self.cells = [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE];
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
