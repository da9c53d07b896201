/// Open MOBA Line-of-Sight Library
///
/// 2D 角度分箱視線場：建構、查詢、每幀重算排程，以及接到 specs ECS 的組件與系統

pub mod comp;
pub mod vision;
pub mod config;
pub mod tick;
pub mod state;

// Re-export commonly used types
pub use crate::comp::*;
pub use crate::vision::*;
pub use crate::state::State;
pub use crate::tick::{LosFrameStats, LosTick};
