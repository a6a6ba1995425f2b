//! 在浏览器或 Node 中运行：`wasm-pack test --node`。
#![cfg(target_arch = "wasm32")]

use arcade_cabinet::{
    evaluate_formula, Game2048Engine, SurvivalEngine, TankEngine, TicTacToeEngine,
    TwentyFourEngine,
};
use serde_json::Value;
use wasm_bindgen_test::*;

fn parse(json: &str) -> Value {
    serde_json::from_str(json).expect("engine output should be valid JSON")
}

#[wasm_bindgen_test]
fn game_2048_reports_moves() {
    let mut engine =
        Game2048Engine::new(None, Some(128), Some(7)).expect("default 2048 config is valid");
    assert_eq!(engine.best_score(), 128);
    let state = parse(&engine.state_json().expect("state serializes"));
    let tiles = state["board"]["cells"]
        .as_array()
        .expect("cells array")
        .iter()
        .filter(|cell| cell.as_u64() != Some(0))
        .count();
    assert_eq!(tiles, 2);
    assert!(engine.move_json("sideways").is_err());
    let resolution = parse(&engine.move_json("ArrowLeft").expect("known direction"));
    assert!(resolution["events"].is_array());
}

#[wasm_bindgen_test]
fn twenty_four_accepts_a_revealed_solution() {
    let mut engine = TwentyFourEngine::new(None, Some(3)).expect("default 24 config is valid");
    let state = parse(&engine.state_json().expect("state serializes"));
    let cards: Vec<u32> = state["cards"]
        .as_array()
        .expect("cards array")
        .iter()
        .map(|card| card.as_u64().expect("card value") as u32)
        .collect();
    let solution = arcade_cabinet::Solver::default()
        .solve(&cards)
        .expect("deals are solvable by default");
    let resolution = parse(&engine.submit_json(&solution.expression).expect("submit"));
    assert_eq!(resolution["events"][0]["type"], "Solved");
}

#[wasm_bindgen_test]
fn formula_errors_cross_the_boundary() {
    assert_eq!(evaluate_formula("(1+2)*8", false).expect("valid formula"), 24.0);
    assert!(evaluate_formula("3!", false).is_err());
    assert!(evaluate_formula("1/0", false).is_err());
}

#[wasm_bindgen_test]
fn tic_tac_toe_pvp_turns_alternate() {
    let mut engine = TicTacToeEngine::new(None, Some(1)).expect("default board");
    assert!(engine.play_json(0, 0).is_err());
    engine.start_json("pvp").expect("pvp mode");
    engine.play_json(2, 2).expect("empty cell");
    let resolution = parse(&engine.play_json(0, 0).expect("empty cell"));
    assert_eq!(resolution["state"]["current"], "Red");
    assert!(engine.play_json(2, 2).is_err());
}

#[wasm_bindgen_test]
fn tic_tac_toe_ai_moves_in_pve() {
    let mut engine = TicTacToeEngine::new(None, Some(9)).expect("default board");
    engine.start_json("pve").expect("pve mode");
    if !engine.ai_to_move() {
        engine.play_json(0, 0).expect("human opens");
    }
    let response = parse(&engine.apply_ai_move(Some("easy".into())).expect("ai turn"));
    assert!(response["decision"]["cell"].is_object());
    assert!(!engine.ai_to_move());
}

#[wasm_bindgen_test]
async fn think_ai_resolves_after_delay() {
    let mut engine = TicTacToeEngine::new(None, Some(4)).expect("default board");
    engine.start_json("pve").expect("pve mode");
    let value = wasm_bindgen_futures::JsFuture::from(engine.think_ai(Some("normal".into()), Some(10)))
        .await
        .expect("think_ai resolves");
    let decision = parse(&value.as_string().expect("decision JSON"));
    assert!(decision["nodes"].is_number());
}

#[wasm_bindgen_test]
fn real_time_engines_advance_on_frames() {
    let mut tank = TankEngine::new(None).expect("default tank config");
    let resolution = parse(
        &tank
            .frame(1000.0 / 60.0 + 1.0, Some(r#"{"fire":true}"#.into()))
            .expect("frame"),
    );
    assert_eq!(resolution["events"][0]["type"], "ShellFired");

    let mut survival = SurvivalEngine::new(None, Some(5)).expect("default survival config");
    let resolution = parse(
        &survival
            .frame(20.0, Some(r#"[{"type":"Move","dx":1,"dy":0}]"#.into()))
            .expect("frame"),
    );
    assert_eq!(resolution["state"]["player"]["pos"]["x"], 11);
}
