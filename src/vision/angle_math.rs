/// 角度工具
///
/// 角度正規化、扇區包含判斷、角度到分箱(bin)的映射，以及沿最短弧走訪分箱
use std::f32::consts::{PI, TAU};

/// 正規化角度到 (-π, π]
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return angle;
    }
    let a = angle.rem_euclid(TAU);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

/// 角度是否落在從 `start` 逆時針掃到 `end` 的扇區內
///
/// 這是方向性的掃掠判斷，不是最短弧判斷：`start > end` 時會繞過 ±π。
pub fn angle_in_span(angle: f32, start: f32, end: f32) -> bool {
    let mut span = normalize_angle(end - start);
    if span < 0.0 {
        span += TAU;
    }
    let mut offset = normalize_angle(angle - start);
    if offset < 0.0 {
        offset += TAU;
    }
    offset <= span
}

/// 角度映射到分箱索引，結果必定在 [0, bins)
pub fn angle_to_bin(angle: f32, bins: usize) -> usize {
    if bins == 0 {
        return 0;
    }
    let idx = ((angle + PI) / TAU * bins as f32).floor();
    // NaN 轉型為 0，無限值飽和
    (idx.max(0.0) as usize).min(bins - 1)
}

/// 分箱中心角
pub fn bin_center_angle(bin: usize, bins: usize) -> f32 {
    -PI + (bin as f32 + 0.5) * (TAU / bins as f32)
}

/// 沿 `a0` 到 `a1` 的最短有號弧逐一走訪分箱（含兩端）
///
/// 只做候選剪枝，呼叫端仍需自行確認每個分箱的實際包含/相交。
pub fn for_each_bin_in_short_span<F: FnMut(usize)>(a0: f32, a1: f32, bins: usize, mut visit: F) {
    if bins == 0 || !a0.is_finite() || !a1.is_finite() {
        return;
    }
    let from = angle_to_bin(a0, bins);
    let to = angle_to_bin(a1, bins);
    let forward = normalize_angle(a1 - a0) >= 0.0;
    let steps = if forward {
        (to + bins - from) % bins
    } else {
        (from + bins - to) % bins
    };

    let mut bin = from;
    let mut last = usize::MAX;
    for _ in 0..=steps.min(bins - 1) {
        if bin != last {
            visit(bin);
            last = bin;
        }
        bin = if forward {
            (bin + 1) % bins
        } else {
            (bin + bins - 1) % bins
        };
    }
}

/// 一段有向角度扇區
///
/// 建構時保證 `start` 逆時針掃到 `end` 就是兩者間的最短弧，
/// 因此 [`AngularSpan::contains`]（方向性判斷）與 [`AngularSpan::for_each_bin`]
/// （最短弧走訪）對同一組角度永遠一致。圓形與多邊形邊都必須經由此型別取得分箱。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularSpan {
    pub start: f32,
    pub end: f32,
}

impl AngularSpan {
    /// 以中心角與半角建立扇區，半角限制在 [0, π/2]
    pub fn around(center: f32, half_angle: f32) -> Self {
        let half = half_angle.max(0.0).min(PI * 0.5);
        Self {
            start: normalize_angle(center - half),
            end: normalize_angle(center + half),
        }
    }

    /// 兩個端點角之間的最短弧，端點順序自動調整為逆時針
    pub fn between(a: f32, b: f32) -> Self {
        if normalize_angle(b - a) >= 0.0 {
            Self { start: normalize_angle(a), end: normalize_angle(b) }
        } else {
            Self { start: normalize_angle(b), end: normalize_angle(a) }
        }
    }

    pub fn contains(&self, angle: f32) -> bool {
        angle_in_span(angle, self.start, self.end)
    }

    /// 扇區寬度（弧度，0..=π）
    pub fn width(&self) -> f32 {
        let w = normalize_angle(self.end - self.start);
        if w < 0.0 { w + TAU } else { w }
    }

    pub fn for_each_bin<F: FnMut(usize)>(&self, bins: usize, visit: F) {
        for_each_bin_in_short_span(self.start, self.end, bins, visit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_normalize_angle_range() {
        for k in -20..=20 {
            let a = k as f32 * 0.7;
            let n = normalize_angle(a);
            assert!(n > -PI - EPSILON && n <= PI + EPSILON, "{} -> {}", a, n);
            assert!((n.sin() - a.sin()).abs() < 1e-3);
            assert!((n.cos() - a.cos()).abs() < 1e-3);
        }
        assert!((normalize_angle(-PI) - PI).abs() < EPSILON);
        assert!((normalize_angle(3.0 * PI).cos() + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_angle_in_span_is_directional() {
        // 從 -0.5 逆時針到 0.5
        assert!(angle_in_span(0.0, -0.5, 0.5));
        assert!(!angle_in_span(PI, -0.5, 0.5));
        // 反向給端點時是繞過背面的大扇區
        assert!(angle_in_span(PI, 0.5, -0.5));
        assert!(!angle_in_span(0.0, 0.5, -0.5));
        // 跨越 ±π
        assert!(angle_in_span(PI, 3.0, -3.0));
        assert!(angle_in_span(-3.1, 3.0, -3.0));
    }

    #[test]
    fn test_angle_in_zero_span_only_matches_itself() {
        assert!(angle_in_span(1.0, 1.0, 1.0));
        assert!(!angle_in_span(1.001, 1.0, 1.0));
        assert!(!angle_in_span(0.999, 1.0, 1.0));
        assert!(!angle_in_span(-2.0, 1.0, 1.0));
    }

    #[test]
    fn test_angle_to_bin_is_total() {
        let bins = 100;
        let samples = [
            -PI, PI, 0.0, -100.0, 100.0, f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 1e30, -1e30,
        ];
        for a in samples {
            assert!(angle_to_bin(a, bins) < bins, "{} 超出範圍", a);
        }
        assert_eq!(angle_to_bin(-PI, bins), 0);
        assert_eq!(angle_to_bin(PI, bins), bins - 1);
        assert_eq!(angle_to_bin(0.0, bins), bins / 2);
    }

    #[test]
    fn test_bin_center_maps_back_to_bin() {
        let bins = 360;
        for i in 0..bins {
            assert_eq!(angle_to_bin(bin_center_angle(i, bins), bins), i);
        }
    }

    #[test]
    fn test_short_span_walks_forward_and_backward() {
        let bins = 64;
        let mut forward = Vec::new();
        for_each_bin_in_short_span(0.0, 0.3, bins, |b| forward.push(b));
        let mut backward = Vec::new();
        for_each_bin_in_short_span(0.3, 0.0, bins, |b| backward.push(b));

        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(forward.first(), Some(&angle_to_bin(0.0, bins)));
        assert_eq!(forward.last(), Some(&angle_to_bin(0.3, bins)));
        for w in forward.windows(2) {
            assert_eq!(w[1], w[0] + 1);
        }
    }

    #[test]
    fn test_short_span_wraps_across_pi() {
        let bins = 64;
        let mut visited = Vec::new();
        for_each_bin_in_short_span(PI - 0.1, -PI + 0.1, bins, |b| visited.push(b));
        assert!(visited.contains(&(bins - 1)));
        assert!(visited.contains(&0));
        // 走短弧，不應經過 0 角附近
        assert!(!visited.contains(&(bins / 2)));
        assert!(visited.len() <= 6);
    }

    #[test]
    fn test_span_orders_endpoints_counter_clockwise() {
        let a = AngularSpan::between(0.4, -0.2);
        assert!((a.start + 0.2).abs() < EPSILON);
        assert!((a.end - 0.4).abs() < EPSILON);
        assert!(a.contains(0.0));
        assert!(!a.contains(PI));
        assert!((a.width() - 0.6).abs() < EPSILON);

        let wrap = AngularSpan::around(PI, 0.2);
        assert!(wrap.contains(PI));
        assert!(wrap.contains(-PI + 0.1));
        assert!(!wrap.contains(0.0));
    }

    #[test]
    fn test_span_bins_agree_with_contains() {
        let bins = 720;
        let span = AngularSpan::around(2.9, 0.4);
        let mut inside = 0;
        span.for_each_bin(bins, |b| {
            if span.contains(bin_center_angle(b, bins)) {
                inside += 1;
            }
        });
        // 所有在扇區內的分箱中心都必須被走訪到
        let expected = (0..bins)
            .filter(|&b| span.contains(bin_center_angle(b, bins)))
            .count();
        assert_eq!(inside, expected);
        assert!(expected > 0);
    }
}
