use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Twenty48,
    TwentyFour,
    TicTacToe,
    Duel,
    Tank,
    Survival,
}

/// 前端菜单使用的游戏描述。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameInfo {
    pub kind: GameKind,
    pub id: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl GameKind {
    pub fn all() -> [GameKind; 6] {
        [
            GameKind::Twenty48,
            GameKind::TwentyFour,
            GameKind::TicTacToe,
            GameKind::Duel,
            GameKind::Tank,
            GameKind::Survival,
        ]
    }

    pub fn id(self) -> &'static str {
        match self {
            GameKind::Twenty48 => "2048",
            GameKind::TwentyFour => "24",
            GameKind::TicTacToe => "tictactoe",
            GameKind::Duel => "duel",
            GameKind::Tank => "tank",
            GameKind::Survival => "survival",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            GameKind::Twenty48 => "2048",
            GameKind::TwentyFour => "24 Game",
            GameKind::TicTacToe => "Tic-Tac-Toe",
            GameKind::Duel => "CS Battle",
            GameKind::Tank => "Tank Battle",
            GameKind::Survival => "Grid Survival Game",
        }
    }

    /// 画布尺寸（像素）。
    pub fn canvas_size(self) -> (u32, u32) {
        match self {
            // 4 * (100 + 10) + 10，底部再留 100 给分数与按钮
            GameKind::Twenty48 => (450, 550),
            GameKind::TicTacToe => (900, 800),
            GameKind::TwentyFour | GameKind::Duel | GameKind::Tank | GameKind::Survival => {
                (800, 600)
            }
        }
    }

    pub fn info(self) -> GameInfo {
        let (width, height) = self.canvas_size();
        GameInfo {
            kind: self,
            id: self.id().to_string(),
            title: self.title().to_string(),
            width,
            height,
        }
    }
}

impl FromStr for GameKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        GameKind::all()
            .into_iter()
            .find(|kind| kind.id() == needle)
            .ok_or(())
    }
}

pub fn catalog() -> Vec<GameInfo> {
    GameKind::all().into_iter().map(GameKind::info).collect()
}
