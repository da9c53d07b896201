pub mod phys;
pub mod resources;
pub mod line_of_sight;

pub use self::{
    phys::*,
    resources::*,
    line_of_sight::*,
};
