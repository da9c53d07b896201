use vek::Vec2;

/// 行列式小於此值視為平行
pub const PARALLEL_EPSILON: f32 = 1e-8;

pub struct GeometryUtils;

impl GeometryUtils {
    /// 2D 外積
    #[inline]
    pub fn cross(a: Vec2<f32>, b: Vec2<f32>) -> f32 {
        a.x * b.y - a.y * b.x
    }

    /// 射線與線段相交，回傳射線參數 t（方向為單位向量時即距離）
    pub fn ray_segment_distance(
        origin: Vec2<f32>,
        dir: Vec2<f32>,
        seg_start: Vec2<f32>,
        seg_end: Vec2<f32>,
    ) -> Option<f32> {
        let seg = seg_end - seg_start;
        let denom = Self::cross(dir, seg);
        if !denom.is_finite() || denom.abs() < PARALLEL_EPSILON {
            return None;
        }

        let to_start = seg_start - origin;
        let t = Self::cross(to_start, seg) / denom;
        let u = Self::cross(to_start, dir) / denom;

        if t >= 0.0 && (0.0..=1.0).contains(&u) {
            Some(t)
        } else {
            None
        }
    }

    /// 射線與圓相交，回傳最小的非負根
    ///
    /// 起點在圓內時回傳離開點。
    pub fn ray_circle_distance(
        origin: Vec2<f32>,
        dir: Vec2<f32>,
        center: Vec2<f32>,
        radius: f32,
    ) -> Option<f32> {
        let a = dir.magnitude_squared();
        if a < PARALLEL_EPSILON {
            return None;
        }
        let oc = origin - center;
        let b = oc.dot(dir);
        let c = oc.magnitude_squared() - radius * radius;
        let disc = b * b - a * c;
        if !disc.is_finite() || disc < 0.0 {
            return None;
        }

        let sq = disc.sqrt();
        let near = (-b - sq) / a;
        let far = (-b + sq) / a;
        if near >= 0.0 {
            Some(near)
        } else if far >= 0.0 {
            Some(far)
        } else {
            None
        }
    }

    /// 點是否在多邊形內（偶奇規則）
    pub fn point_in_polygon(point: Vec2<f32>, vertices: &[Vec2<f32>]) -> bool {
        if vertices.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = vertices.len() - 1;
        for i in 0..vertices.len() {
            let (vi, vj) = (vertices[i], vertices[j]);
            if (vi.y > point.y) != (vj.y > point.y)
                && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// 頂點平均
    pub fn vertex_centroid(vertices: &[Vec2<f32>]) -> Option<Vec2<f32>> {
        if vertices.is_empty() {
            return None;
        }
        let sum = vertices.iter().fold(Vec2::zero(), |acc, v| acc + *v);
        Some(sum / vertices.len() as f32)
    }

    /// 多邊形面積（鞋帶公式）
    pub fn polygon_area(vertices: &[Vec2<f32>]) -> f32 {
        if vertices.len() < 3 {
            return 0.0;
        }

        let mut area = 0.0;
        let n = vertices.len();

        for i in 0..n {
            let j = (i + 1) % n;
            area += vertices[i].x * vertices[j].y;
            area -= vertices[j].x * vertices[i].y;
        }

        area.abs() / 2.0
    }

    pub fn is_finite(v: Vec2<f32>) -> bool {
        v.x.is_finite() && v.y.is_finite()
    }

    /// 角度的單位方向向量
    #[inline]
    pub fn direction(angle: f32) -> Vec2<f32> {
        Vec2::new(angle.cos(), angle.sin())
    }

    /// 向量角度
    #[inline]
    pub fn angle_of(v: Vec2<f32>) -> f32 {
        v.y.atan2(v.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_ray_segment_hit_and_miss() {
        let origin = Vec2::new(0.0, 0.0);
        let east = Vec2::new(1.0, 0.0);

        let hit = GeometryUtils::ray_segment_distance(
            origin, east, Vec2::new(3.0, -1.0), Vec2::new(3.0, 1.0),
        );
        assert!((hit.unwrap() - 3.0).abs() < EPSILON);

        // 線段在背後
        let behind = GeometryUtils::ray_segment_distance(
            origin, east, Vec2::new(-3.0, -1.0), Vec2::new(-3.0, 1.0),
        );
        assert!(behind.is_none());

        // 線段在射線旁邊
        let beside = GeometryUtils::ray_segment_distance(
            origin, east, Vec2::new(3.0, 0.5), Vec2::new(3.0, 2.0),
        );
        assert!(beside.is_none());
    }

    #[test]
    fn test_ray_segment_parallel_is_no_hit() {
        let hit = GeometryUtils::ray_segment_distance(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(5.0, 0.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_ray_segment_endpoint_counts() {
        let hit = GeometryUtils::ray_segment_distance(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 3.0),
        );
        assert!((hit.unwrap() - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_ray_circle_front_hit() {
        let d = GeometryUtils::ray_circle_distance(
            Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(5.0, 0.0), 1.0,
        );
        assert!((d.unwrap() - 4.0).abs() < EPSILON);

        let miss = GeometryUtils::ray_circle_distance(
            Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(5.0, 0.0), 1.0,
        );
        assert!(miss.is_none());

        let behind = GeometryUtils::ray_circle_distance(
            Vec2::new(0.0, 0.0), Vec2::new(-1.0, 0.0), Vec2::new(5.0, 0.0), 1.0,
        );
        assert!(behind.is_none());
    }

    #[test]
    fn test_ray_circle_from_inside_returns_exit() {
        let d = GeometryUtils::ray_circle_distance(
            Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.5, 0.0), 2.0,
        );
        assert!((d.unwrap() - 2.5).abs() < EPSILON);
    }

    #[test]
    fn test_point_in_polygon_square() {
        let square = [
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ];
        assert!(GeometryUtils::point_in_polygon(Vec2::new(0.0, 0.0), &square));
        assert!(!GeometryUtils::point_in_polygon(Vec2::new(2.0, 0.0), &square));
        assert!(!GeometryUtils::point_in_polygon(Vec2::new(0.0, 0.0), &square[..2]));
        assert!((GeometryUtils::polygon_area(&square) - 4.0).abs() < EPSILON);
    }
}
