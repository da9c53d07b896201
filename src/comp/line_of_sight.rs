/// 視線相關組件
///
/// 把 ECS 實體接到視線場：遮擋物實體帶 `Blocker`，觀察者實體帶 `LineOfSight`
use std::sync::Arc;

use specs::storage::VecStorage;
use specs::Component;
use vek::Vec2;

use crate::comp::phys::{Facing, Pos};
use crate::vision::{
    coverage_ratio, field_to_world_polygon, is_point_visible, FieldConfig, Observer, OccluderShape,
    RecomputeScheduler, SchedulerSettings, VisibilityField, WorldMetric,
};

/// 遮擋物組件
///
/// 外形座標相對於實體的 `Pos`；沒有 `Pos` 時視為世界座標。
#[derive(Debug, Clone, PartialEq)]
pub struct Blocker {
    pub shape: OccluderShape,
    /// 已摧毀但尚未刪除的遮擋物
    pub removed: bool,
}

impl Blocker {
    pub fn new(shape: OccluderShape) -> Self {
        Self { shape, removed: false }
    }

    pub fn circle(radius: f32) -> Self {
        Self::new(OccluderShape::Circle { center: Vec2::zero(), radius })
    }

    pub fn polygon(vertices: Vec<Vec2<f32>>) -> Self {
        Self::new(OccluderShape::Polygon { vertices })
    }

    /// 換算成世界座標外形
    pub fn world_shape(&self, pos: Option<&Pos>) -> OccluderShape {
        let offset = pos.map(|p| p.0).unwrap_or_else(Vec2::zero);
        match &self.shape {
            OccluderShape::Circle { center, radius } => OccluderShape::Circle {
                center: *center + offset,
                radius: *radius,
            },
            OccluderShape::Polygon { vertices } => OccluderShape::Polygon {
                vertices: vertices.iter().map(|v| *v + offset).collect(),
            },
        }
    }
}

impl Component for Blocker {
    type Storage = VecStorage<Self>;
}

/// 觀察者的視線子系統
///
/// 每個觀察者各自持有排程器與快取的視線場，彼此獨立。
pub struct LineOfSight {
    pub scheduler: RecomputeScheduler,
    pub fov_half_angle: Option<f32>,
    pub metric: Option<Arc<dyn WorldMetric>>,
    /// 點查詢與遮蔽比例的容許誤差
    pub query_slack: f32,
    /// 輪廓最遠距離
    pub far_distance: f32,
    /// 本幀的觀察者，由視線系統寫入
    observer: Option<Observer>,
}

impl LineOfSight {
    pub fn new(config: FieldConfig, settings: SchedulerSettings) -> Self {
        Self {
            scheduler: RecomputeScheduler::new(config, settings),
            fov_half_angle: None,
            metric: None,
            query_slack: 0.05,
            far_distance: 30.0,
            observer: None,
        }
    }

    pub fn with_fov_half_angle(mut self, half_angle: f32) -> Self {
        self.fov_half_angle = Some(half_angle);
        self
    }

    pub fn with_metric(mut self, metric: Arc<dyn WorldMetric>) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn with_query_slack(mut self, slack: f32) -> Self {
        self.query_slack = slack;
        self
    }

    pub fn with_far_distance(mut self, far: f32) -> Self {
        self.far_distance = far;
        self
    }

    /// 由位置與面向組出觀察者
    pub fn make_observer(&self, pos: &Pos, facing: Option<&Facing>) -> Observer {
        let mut observer = Observer::new(pos.0, facing.map(|f| f.0).unwrap_or(0.0));
        observer.fov_half_angle = self.fov_half_angle;
        observer.metric = self.metric.clone();
        observer
    }

    pub(crate) fn set_observer(&mut self, observer: Option<Observer>) {
        self.observer = observer;
    }

    pub fn observer(&self) -> Option<&Observer> {
        self.observer.as_ref()
    }

    pub fn field(&self) -> &VisibilityField {
        self.scheduler.field()
    }

    pub fn set_omnivision(&mut self, enabled: bool) {
        self.scheduler.set_omnivision(enabled);
    }

    /// 嚴格的二元可見判斷，給角色顯示/隱藏用
    pub fn is_point_visible(&self, point: Vec2<f32>) -> bool {
        match &self.observer {
            Some(observer) => is_point_visible(self.field(), observer, point, self.query_slack),
            None => true,
        }
    }

    /// 部分照明的混合係數
    pub fn coverage_ratio(&self, footprint: &OccluderShape) -> f32 {
        match &self.observer {
            Some(observer) => coverage_ratio(self.field(), observer, footprint, self.query_slack),
            None => 1.0,
        }
    }

    /// 可見區域輪廓；全視模式或尚未建場時為空
    pub fn silhouette(&self) -> Vec<Vec2<f32>> {
        match &self.observer {
            Some(observer) => field_to_world_polygon(self.field(), observer, self.far_distance),
            None => Vec::new(),
        }
    }
}

impl Default for LineOfSight {
    fn default() -> Self {
        Self::new(FieldConfig::default(), SchedulerSettings::default())
    }
}

impl Component for LineOfSight {
    type Storage = VecStorage<Self>;
}
