/// 防止两个分箱同时为零时除零
const EPSILON: f32 = 1e-10;

/// 计算两个特征向量的卡方距离
///
/// 距离对称且非负，相同向量距离为 0；长度不同的向量不可比，返回无穷大
pub fn chi2_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    let mut accum = 0f64;
    for (&x, &y) in a.iter().zip(b) {
        let num = x - y;
        let den = x + y + EPSILON;
        accum += (num * num / den) as f64;
    }
    accum / 2.0
}
