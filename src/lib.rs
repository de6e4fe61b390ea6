pub mod ai;
pub mod game;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{AiAgent, AiConfig, AiDecision, SearchStats, MAX_DEPTH, WIN_SCORE};
pub use game::{
    Board, Cell, GameEvent, GameOutcome, GamePhase, GameState, IntegrityError, Move,
    PlaceMarkAction, RuleEngine, RuleError, RuleResolution, Side, BOARD_SIZE, CELL_COUNT,
    WIN_COMBINATIONS,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    web_sys::console::log_1(&"wasm_tictactoe core ready".into());
}

fn make_resolution(state: GameState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state, events)
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn resolution_from_events(state: &GameState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state.clone(), events)
}

fn execute_with_engine<F>(state: &mut GameState, action: F) -> Result<Vec<GameEvent>, JsValue>
where
    F: FnOnce(&mut RuleEngine, &mut GameState) -> Result<Vec<GameEvent>, RuleError>,
{
    let mut engine = RuleEngine::new();
    action(&mut engine, state).map_err(to_js_error)
}

fn parse_side(value: &str) -> Result<Side, JsValue> {
    Side::from_str(value).map_err(|_| {
        to_js_error(RuleError::UnknownSide {
            value: value.to_string(),
        })
    })
}

fn build_agent(random_opening: Option<bool>) -> AiAgent {
    let mut config = AiConfig::default();
    if let Some(flag) = random_opening {
        config.random_opening = flag;
    }
    AiAgent::new(config)
}

#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<RuleResolution>,
}

#[wasm_bindgen]
pub struct GameEngine {
    state: GameState,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(initial_state_json: Option<String>) -> Result<GameEngine, JsValue> {
        let state = if let Some(json) = initial_state_json {
            serde_json::from_str(&json).map_err(serde_to_js_error)?
        } else {
            GameState::new()
        };
        Ok(GameEngine { state })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.state = state;
        Ok(())
    }

    pub fn place_mark_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: PlaceMarkAction =
            serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let events = execute_with_engine(&mut self.state, |engine, state| {
            engine.place_mark(state, action)
        })?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn reset(&mut self) -> Result<String, JsValue> {
        let mut engine = RuleEngine::new();
        let events = engine.reset(&mut self.state);
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn apply_ai_move(
        &mut self,
        side: Option<String>,
        random_opening: Option<bool>,
    ) -> Result<String, JsValue> {
        let side = match side {
            Some(value) => parse_side(&value)?,
            None => self.state.current_player,
        };

        // 先在状态副本上决策，再把选出的落点交给规则层执行。
        let mut board = self.state.board.clone();
        let mut agent = build_agent(random_opening);
        let decision = agent.find_best_move(&mut board, side);

        let applied = if let Some(mov) = decision.mov {
            let action = PlaceMarkAction {
                side,
                row: mov.row,
                col: mov.col,
            };
            let events = execute_with_engine(&mut self.state, |engine, state| {
                engine.place_mark(state, action)
            })?;
            Some(resolution_from_events(&self.state, events))
        } else {
            None
        };

        let response = AiMoveResponse { decision, applied };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    pub fn think_ai(
        &self,
        side: Option<String>,
        delay_ms: Option<u32>,
        random_opening: Option<bool>,
    ) -> Promise {
        let state = self.state.clone();
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let side = match side {
                Some(value) => parse_side(&value)?,
                None => state.current_player,
            };
            let mut board = state.board.clone();
            let mut agent = build_agent(random_opening);
            let decision = agent.find_best_move(&mut board, side);
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }
}

/// 返回一局新棋的初始状态，方便前端初始化。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&GameState::new()).map_err(JsValue::from)
}

/// 将传入的对局状态深拷贝后返回。
#[wasm_bindgen(js_name = "cloneGameState")]
pub fn clone_game_state(state: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let cloned = state.clone();
    to_value(&cloned).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "placeMark")]
pub fn place_mark(state: JsValue, action: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let action: PlaceMarkAction = from_value(action).map_err(JsValue::from)?;
    let mut engine = RuleEngine::new();
    match engine.place_mark(&mut state, action) {
        Ok(events) => to_value(&make_resolution(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "resetGame")]
pub fn reset_game(state: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let mut engine = RuleEngine::new();
    let events = engine.reset(&mut state);
    to_value(&make_resolution(state, events)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "checkVictory")]
pub fn check_victory(state: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let outcome = RuleEngine::check_victory(&mut state);
    to_value(&outcome).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

/// 查询接口：side 是否已连成一线。
#[wasm_bindgen(js_name = "checkForWin")]
pub fn check_for_win(board: JsValue, side: &str) -> Result<bool, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let side = parse_side(side)?;
    Ok(game::check_for_win(&board, side))
}

#[wasm_bindgen(js_name = "checkForDraw")]
pub fn check_for_draw(board: JsValue) -> Result<bool, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    Ok(game::check_for_draw(&board))
}

#[wasm_bindgen(js_name = "isGameOver")]
pub fn is_game_over(board: JsValue) -> Result<bool, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    Ok(game::is_game_over(&board))
}

#[wasm_bindgen(js_name = "possibleMoves")]
pub fn possible_moves(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    to_value(&ai::possible_moves(&board)).map_err(JsValue::from)
}

/// 为 side 计算最佳落点。棋盘已满时返回 null，调用方需要自行检查。
#[wasm_bindgen(js_name = "findBestMove")]
pub fn find_best_move(
    board: JsValue,
    side: &str,
    random_opening: Option<bool>,
) -> Result<JsValue, JsValue> {
    let mut board: Board = from_value(board).map_err(JsValue::from)?;
    let side = parse_side(side)?;
    let mut agent = build_agent(random_opening);
    let decision = agent.find_best_move(&mut board, side);
    to_value(&decision.mov).map_err(JsValue::from)
}

/// 完整的 AI 决策信息（含评估分与搜索节点数）。
#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(
    state: JsValue,
    side: Option<String>,
    random_opening: Option<bool>,
) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let side = match side {
        Some(value) => parse_side(&value)?,
        None => state.current_player,
    };
    let mut board = state.board.clone();
    let mut agent = build_agent(random_opening);
    let decision = agent.find_best_move(&mut board, side);
    to_value(&decision).map_err(JsValue::from)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
