use serde::{Deserialize, Serialize};
use specs::storage::VecStorage;
use specs::{Component, FlaggedStorage};
use vek::*;

use crate::vision::normalize_angle;

/// Position
#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pos(pub Vec2<f32>);

impl Component for Pos {
    type Storage = VecStorage<Self>;
}

/// 面向角（弧度）
#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Facing(pub f32);

impl Facing {
    pub fn new(angle: f32) -> Self {
        Facing(normalize_angle(angle))
    }

    pub fn x(&self) -> f32 {
        self.0.cos()
    }

    pub fn y(&self) -> f32 {
        self.0.sin()
    }
}

impl Component for Facing {
    type Storage = FlaggedStorage<Self, VecStorage<Self>>;
}
