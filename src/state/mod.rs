/// 狀態管理模塊
///
/// 負責 ECS 世界、時間循環與視線系統的分派

pub mod core;
pub mod time_management;

pub use self::core::State;
pub use time_management::{TimeManager, TimeStats};
