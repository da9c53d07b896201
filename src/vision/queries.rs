/// 視線場查詢
///
/// 點可見性、部分遮蔽比例、輪廓多邊形。所有查詢在輸入無效時一律回傳可見，
/// 光影瑕疵比錯誤隱藏遊戲物件好。
use hashbrown::HashMap;
use vek::Vec2;

use crate::vision::angle_math::angle_to_bin;
use crate::vision::field::{Observer, OccluderId, OccluderShape, VisibilityField, MIN_BINS};
use crate::vision::field_builder::{trace_shape, ShapeTrace};
use crate::vision::geometry_utils::GeometryUtils;

/// 觀察者周圍永遠可見的小範圍
pub const NEAR_FIELD_RADIUS: f32 = 0.35;

/// 點是否可見
///
/// 落在近身範圍內一律可見；否則比較點距離與所在分箱的深度。
pub fn is_point_visible(field: &VisibilityField, observer: &Observer, point: Vec2<f32>, slack: f32) -> bool {
    if !observer.is_valid() || !GeometryUtils::is_finite(point) || field.is_empty() {
        return true;
    }
    let offset = observer.delta_to(point);
    let dist = offset.magnitude();
    if !dist.is_finite() || dist <= NEAR_FIELD_RADIUS {
        return true;
    }

    let slack = if slack.is_finite() { slack.max(0.0) } else { 0.0 };
    let bin = angle_to_bin(GeometryUtils::angle_of(offset), field.bins());
    dist <= field.depth(bin) + slack
}

/// 物件外形有多少比例是該方向上最近的可見表面，回傳 [0, 1]
///
/// 觀察者在外形內時為 1；量不到任何分箱時退回以中心點做二元判斷。
pub fn coverage_ratio(field: &VisibilityField, observer: &Observer, footprint: &OccluderShape, slack: f32) -> f32 {
    if field.is_empty() || !observer.is_valid() || !footprint.is_valid() {
        return 1.0;
    }
    if let OccluderShape::Polygon { vertices } = footprint {
        let local: Vec<Vec2<f32>> = vertices.iter().map(|v| observer.delta_to(*v)).collect();
        if GeometryUtils::point_in_polygon(Vec2::zero(), &local) {
            return 1.0;
        }
    }

    let bins = field.bins();
    // 每個分箱取外形邊界最近的交點
    let mut nearest: HashMap<usize, f32> = HashMap::new();
    let trace = trace_shape(observer, footprint, bins, |bin, t| {
        let entry = nearest.entry(bin).or_insert(t);
        *entry = entry.min(t);
    });
    if trace == ShapeTrace::Envelops {
        return 1.0;
    }

    if nearest.is_empty() {
        let exposed = footprint
            .centroid()
            .map(|c| is_point_visible(field, observer, c, slack))
            .unwrap_or(true);
        return if exposed { 1.0 } else { 0.0 };
    }

    let slack = if slack.is_finite() { slack.max(0.0) } else { 0.0 };
    let exposed = nearest
        .iter()
        .filter(|(bin, t)| field.depth(**bin) + slack >= **t)
        .count();
    (exposed as f32 / nearest.len() as f32).max(0.0).min(1.0)
}

/// 視線場轉為世界座標輪廓，每個分箱一點
///
/// 距離取 min(深度, far_distance)；分箱數不足時回傳空序列。
pub fn field_to_world_polygon(field: &VisibilityField, observer: &Observer, far_distance: f32) -> Vec<Vec2<f32>> {
    if field.bins() < MIN_BINS || !observer.is_valid() || !far_distance.is_finite() {
        return Vec::new();
    }
    let far = far_distance.max(0.0);

    (0..field.bins())
        .map(|bin| {
            let reach = field.depth(bin).min(far);
            observer.position + GeometryUtils::direction(field.bin_center_angle(bin)) * reach
        })
        .collect()
}

/// 輪廓多邊形面積
pub fn silhouette_area(points: &[Vec2<f32>]) -> f32 {
    GeometryUtils::polygon_area(points)
}

/// 在 `max_distance` 內被看見的遮擋物
pub fn visible_owners_within(field: &VisibilityField, max_distance: f32) -> Vec<OccluderId> {
    let mut owners: Vec<OccluderId> = field
        .owners()
        .iter()
        .zip(field.depths())
        .filter_map(|(owner, depth)| owner.filter(|_| *depth <= max_distance))
        .collect();
    owners.sort();
    owners.dedup();
    owners
}
