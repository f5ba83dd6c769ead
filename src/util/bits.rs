/// 表示 `max` 所需的最少位数，至少为 1。
#[inline]
pub fn bit_width(max: u64) -> u8 {
    if max == 0 {
        return 1;
    }
    (u64::BITS - max.leading_zeros()) as u8
}

/// 表示 `max` 所需的最少字节数，至少为 1。
#[inline]
pub fn byte_width(max: u64) -> u8 {
    (bit_width(max) + 7) / 8
}

/// ⌊log2(x)⌋，约定 log2(0) = 0。
#[inline]
pub fn log2_floor(x: u64) -> u32 {
    if x == 0 {
        0
    } else {
        63 - x.leading_zeros()
    }
}

/// 输入中出现过的不同字节个数（字母表大小 k）。
pub fn alphabet_size(text: &[u8]) -> u32 {
    let mut seen = [false; 256];
    let mut k = 0u32;
    for &b in text {
        if !seen[b as usize] {
            seen[b as usize] = true;
            k += 1;
        }
    }
    k
}

/// 短子串内联存储的长度上限：log(n) / log(k)，
/// 即长度不超过一个回指位置所占信息量的子串直接内联保存。
pub fn short_string_limit(n: u64, k: u32) -> u64 {
    let log_n = u64::from(log2_floor(n));
    let log_k = u64::from(log2_floor(u64::from(k)).max(1));
    (log_n / log_k).max(1)
}
