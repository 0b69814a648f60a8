/// 每个编码字符承载的比特数
const GROUP_BITS: usize = 6;

/// 从特征向量导出近似的分桶签名
///
/// 把每个分量近似为一个比特：质量达到均值（1/len）记 1，否则记 0，
/// 再按 6 比特一组编码为可打印字符。相似的图片大概率得到相同签名，
/// 但签名只用于裁剪候选集，查重以卡方距离为准。
pub fn bit_signature(values: &[f32]) -> String {
    let n = values.len();
    let mut out = Vec::with_capacity(n.div_ceil(GROUP_BITS));
    let thresh = 1.0 / n as f32;
    let mut accum = 0u32;
    for (i, &v) in values.iter().enumerate() {
        let bit = i % GROUP_BITS;
        if v >= thresh {
            accum |= 1 << bit;
        }
        if bit == GROUP_BITS - 1 {
            out.push(encode64(accum));
            accum = 0;
        }
    }
    if n % GROUP_BITS > 0 {
        out.push(encode64(accum));
    }
    out.into_iter().map(char::from).collect()
}

/// URL 安全的 radix-64 字母表：0-9 A-Z a-z - _
fn encode64(v: u32) -> u8 {
    debug_assert!(v < 64);
    match v {
        62 => b'-',
        63 => b'_',
        0..=9 => b'0' + v as u8,
        10..=35 => b'A' + (v as u8 - 10),
        _ => b'a' + (v as u8 - 36),
    }
}
