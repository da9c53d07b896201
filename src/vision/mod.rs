/// 視線系統模組
///
/// 角度分箱視線場的建構、查詢與每幀重算排程，不依賴 ECS
pub mod angle_math;
pub mod geometry_utils;
pub mod field;
pub mod field_builder;
pub mod queries;
pub mod scheduler;

pub use self::{
    angle_math::{angle_in_span, angle_to_bin, for_each_bin_in_short_span, normalize_angle, AngularSpan},
    geometry_utils::GeometryUtils,
    field::*,
    field_builder::{FieldConfig, VisibilityFieldBuilder},
    queries::*,
    scheduler::*,
};
