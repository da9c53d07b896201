pub mod los_tick;

pub use self::{
    los_tick::*,
};
