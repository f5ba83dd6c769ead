//! 诱导排序（SA-IS）构建后缀数组。
//!
//! 单一实现按运行时位宽工作：SA 是带符号位通道的 [`PackedArray`]，
//! 暂定位置以按位取反（`!j`）标记，不占额外内存。递归时约简串直接存放在
//! SA 的尾部空闲区，下一层通过 [`Text::Reduced`] 读取。

use log::trace;

use crate::error::{BwtError, Result};
use crate::packed::{PackedArray, Width};

/// 某一层递归的输入串
#[derive(Clone, Copy)]
enum Text<'a> {
    Packed(&'a PackedArray),
    /// 位于 SA 自身 `[offset, offset + n)` 的约简串
    Reduced { offset: usize },
}

#[inline]
fn chr(text: Text<'_>, sa: &PackedArray, i: usize) -> usize {
    match text {
        Text::Packed(t) => t.get_value(i) as usize,
        Text::Reduced { offset } => sa.get_signed(offset + i) as usize,
    }
}

/// 构建统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaisStats {
    /// 最大递归深度（不递归为 0）
    pub depth: usize,
    /// 处理过的层数
    pub levels: usize,
}

/// 对 `text`（每个元素 < k）构建后缀数组，返回 `[0, n)` 的一个排列。
pub fn sais(text: &PackedArray, k: u64) -> Result<PackedArray> {
    sais_with_stats(text, k).map(|(sa, _)| sa)
}

pub fn sais_with_stats(text: &PackedArray, k: u64) -> Result<(PackedArray, SaisStats)> {
    let n = text.len();
    let mut stats = SaisStats::default();
    if n == 0 {
        return Ok((PackedArray::new(0, Width::Bits(1))?, stats));
    }
    if k == 0 {
        return Err(BwtError::InvalidInput("alphabet size must be positive".into()));
    }
    if let Some(bad) = text.iter().find(|&x| x >= k) {
        return Err(BwtError::InvalidInput(format!("symbol {} outside alphabet of size {}", bad, k)));
    }
    let k = usize::try_from(k).map_err(|_| BwtError::InvalidInput(format!("alphabet size {} too large", k)))?;

    let mut sa = PackedArray::new_signed(n, Width::Max(n as u64))?;
    sais_main(Text::Packed(text), &mut sa, 0, n, k, 0, &mut stats)?;
    Ok((sa.into_unsigned(), stats))
}

/// 字节串的后缀数组（后缀为前缀时较短者在前）
pub fn build_sa(text: &[u8]) -> Result<Vec<u32>> {
    let n = text.len();
    if n > u32::MAX as usize {
        return Err(BwtError::InvalidInput(format!("text of {} bytes does not fit 32-bit positions", n)));
    }
    let mut packed = PackedArray::new(n, Width::Bits(8))?;
    for (i, &b) in text.iter().enumerate() {
        packed.set_value(i, u64::from(b));
    }
    let sa = sais(&packed, 256)?;
    Ok(sa.iter().map(|x| x as u32).collect())
}

/// 按 LMS 位置从右向左走的游标。
///
/// `c0` 是当前字符，`c1` 是其右邻；相等字符沿用右侧的类型。
struct LmsCursor {
    i: isize,
    c0: usize,
    c1: usize,
}

impl LmsCursor {
    fn new(text: Text<'_>, sa: &PackedArray, n: usize) -> Self {
        let mut cur = Self { i: n as isize - 1, c0: chr(text, sa, n - 1), c1: 0 };
        cur.skip_l(text, sa);
        cur
    }

    /// 跳过一段 L 型（c0 >= c1）
    fn skip_l(&mut self, text: Text<'_>, sa: &PackedArray) {
        loop {
            self.c1 = self.c0;
            self.i -= 1;
            if self.i < 0 {
                break;
            }
            self.c0 = chr(text, sa, self.i as usize);
            if self.c0 < self.c1 {
                break;
            }
        }
    }

    /// 跳过一段 S 型（c0 <= c1）
    fn skip_s(&mut self, text: Text<'_>, sa: &PackedArray) {
        loop {
            self.c1 = self.c0;
            self.i -= 1;
            if self.i < 0 {
                break;
            }
            self.c0 = chr(text, sa, self.i as usize);
            if self.c0 > self.c1 {
                break;
            }
        }
    }

    /// 下一个（更靠左的）LMS 位置及其首字符
    fn next(&mut self, text: Text<'_>, sa: &PackedArray) -> Option<(usize, usize)> {
        if self.i < 0 {
            return None;
        }
        self.skip_s(text, sa);
        if self.i < 0 {
            return None;
        }
        let found = ((self.i + 1) as usize, self.c1);
        self.skip_l(text, sa);
        Some(found)
    }
}

fn get_counts(text: Text<'_>, sa: &PackedArray, n: usize, k: usize) -> Result<PackedArray> {
    let mut c = PackedArray::new(k, Width::Max(n as u64))?;
    for i in 0..n {
        let x = chr(text, sa, i);
        c.set_value(x, c.get_value(x) + 1);
    }
    Ok(c)
}

/// 桶边界：`end` 为真时是各桶的结束（不含），否则是开始
fn get_buckets(c: &PackedArray, b: &mut PackedArray, end: bool) {
    let mut sum = 0u64;
    for i in 0..c.len() {
        let cnt = c.get_value(i);
        sum += cnt;
        b.set_value(i, if end { sum } else { sum - cnt });
    }
}

#[inline]
fn get(sa: &PackedArray, i: usize) -> i64 {
    sa.get_signed(i)
}

#[inline]
fn set(sa: &mut PackedArray, i: usize, x: i64) {
    sa.set_signed(i, x);
}

/// 对 LMS 子串做一轮诱导排序（只求子串序）
fn lms_sort1(text: Text<'_>, sa: &mut PackedArray, n: usize, c: &PackedArray, b: &mut PackedArray) {
    // L 型：从左到右
    get_buckets(c, b, false);
    let mut j = n - 1;
    let mut c1 = chr(text, sa, j);
    let mut bb = b.get_value(c1) as usize;
    j -= 1;
    let v = if chr(text, sa, j) < c1 { !(j as i64) } else { j as i64 };
    set(sa, bb, v);
    bb += 1;
    for i in 0..n {
        let s = get(sa, i);
        if s > 0 {
            let mut j = s as usize;
            let c0 = chr(text, sa, j);
            if c0 != c1 {
                b.set_value(c1, bb as u64);
                c1 = c0;
                bb = b.get_value(c1) as usize;
            }
            j -= 1;
            let v = if chr(text, sa, j) < c1 { !(j as i64) } else { j as i64 };
            set(sa, bb, v);
            bb += 1;
            set(sa, i, 0);
        } else if s < 0 {
            set(sa, i, !s);
        }
    }

    // S 型：从右到左
    get_buckets(c, b, true);
    c1 = 0;
    bb = b.get_value(c1) as usize;
    for i in (0..n).rev() {
        let s = get(sa, i);
        if s > 0 {
            let mut j = s as usize;
            let c0 = chr(text, sa, j);
            if c0 != c1 {
                b.set_value(c1, bb as u64);
                c1 = c0;
                bb = b.get_value(c1) as usize;
            }
            j -= 1;
            bb -= 1;
            let v = if chr(text, sa, j) > c1 { !((j + 1) as i64) } else { j as i64 };
            set(sa, bb, v);
            set(sa, i, 0);
        }
    }
}

/// 把排好序的 LMS 子串压到 SA 前 m 项，并给它们命名。返回不同名字的个数。
///
/// 名字写在 `sa[m + p / 2]`，相邻 LMS 位置至少相距 2，因此不会冲突。
fn lms_postproc1(text: Text<'_>, sa: &mut PackedArray, n: usize, m: usize) -> usize {
    let mut i = 0;
    while get(sa, i) < 0 {
        let s = get(sa, i);
        set(sa, i, !s);
        i += 1;
    }
    if i < m {
        let mut j = i;
        i += 1;
        loop {
            let p = get(sa, i);
            if p < 0 {
                set(sa, j, !p);
                j += 1;
                set(sa, i, 0);
                if j == m {
                    break;
                }
            }
            i += 1;
        }
    }

    // 子串长度
    let mut j = n - 1;
    let mut cur = LmsCursor::new(text, sa, n);
    while let Some((p, _)) = cur.next(text, sa) {
        set(sa, m + (p >> 1), (j + 1 - p) as i64);
        j = p;
    }

    // 相邻比较命名
    let mut name = 0usize;
    let mut q = n;
    let mut qlen = 0usize;
    for i in 0..m {
        let p = get(sa, i) as usize;
        let plen = get(sa, m + (p >> 1)) as usize;
        let mut diff = true;
        if plen == qlen && q + plen < n {
            let mut j = 0;
            while j < plen && chr(text, sa, p + j) == chr(text, sa, q + j) {
                j += 1;
            }
            diff = j != plen;
        }
        if diff {
            name += 1;
            q = p;
            qlen = plen;
        }
        set(sa, m + (p >> 1), name as i64);
    }
    name
}

/// 由已排好序的 LMS 后缀诱导出全部后缀
fn induce_sa(text: Text<'_>, sa: &mut PackedArray, n: usize, c: &PackedArray, b: &mut PackedArray) {
    get_buckets(c, b, false);
    let j = n - 1;
    let mut c1 = chr(text, sa, j);
    let mut bb = b.get_value(c1) as usize;
    let v = if j > 0 && chr(text, sa, j - 1) < c1 { !(j as i64) } else { j as i64 };
    set(sa, bb, v);
    bb += 1;
    for i in 0..n {
        let s = get(sa, i);
        set(sa, i, !s);
        if s > 0 {
            let j = (s - 1) as usize;
            let c0 = chr(text, sa, j);
            if c0 != c1 {
                b.set_value(c1, bb as u64);
                c1 = c0;
                bb = b.get_value(c1) as usize;
            }
            let v = if j > 0 && chr(text, sa, j - 1) < c1 { !(j as i64) } else { j as i64 };
            set(sa, bb, v);
            bb += 1;
        }
    }

    get_buckets(c, b, true);
    c1 = 0;
    bb = b.get_value(c1) as usize;
    for i in (0..n).rev() {
        let s = get(sa, i);
        if s > 0 {
            let j = (s - 1) as usize;
            let c0 = chr(text, sa, j);
            if c0 != c1 {
                b.set_value(c1, bb as u64);
                c1 = c0;
                bb = b.get_value(c1) as usize;
            }
            bb -= 1;
            let v = if j == 0 || chr(text, sa, j - 1) > c1 { !(j as i64) } else { j as i64 };
            set(sa, bb, v);
        } else {
            set(sa, i, !s);
        }
    }
}

/// 一层 SA-IS。`sa` 的 `[0, n + fs)` 归本层使用；
/// 约简串放在 `[m + newfs, n + fs)`，交给下一层。
fn sais_main(
    text: Text<'_>,
    sa: &mut PackedArray,
    fs: usize,
    n: usize,
    k: usize,
    depth: usize,
    stats: &mut SaisStats,
) -> Result<()> {
    stats.depth = stats.depth.max(depth);
    stats.levels += 1;

    let c = get_counts(text, sa, n, k)?;
    let mut b = PackedArray::new(k, Width::Max(n as u64))?;
    get_buckets(&c, &mut b, true);
    for i in 0..n {
        set(sa, i, 0);
    }

    // 阶段 1：LMS 后缀放到各自桶尾。保存的是 p - 1，写入滞后一步
    let mut m = 0usize;
    let mut pending: Option<usize> = None;
    let mut j = 0usize;
    let mut cur = LmsCursor::new(text, sa, n);
    while let Some((p, c1)) = cur.next(text, sa) {
        if let Some(slot) = pending {
            set(sa, slot, j as i64);
        }
        let slot = b.get_value(c1) as usize - 1;
        b.set_value(c1, slot as u64);
        pending = Some(slot);
        j = p - 1;
        m += 1;
    }

    let name = match pending {
        Some(slot) if m > 1 => {
            set(sa, slot, j as i64);
            lms_sort1(text, sa, n, &c, &mut b);
            lms_postproc1(text, sa, n, m)
        }
        Some(slot) => {
            set(sa, slot, j as i64 + 1);
            1
        }
        None => 0,
    };
    trace!("sais depth={} n={} k={} lms={} names={}", depth, n, k, m, name);

    if name < m {
        // 阶段 2：名字有重复，对约简串递归
        let newfs = n + fs - 2 * m;
        let ra = m + newfs;
        let mut jj = m;
        for i in (m..m + (n >> 1)).rev() {
            let s = get(sa, i);
            if s != 0 {
                jj = jj
                    .checked_sub(1)
                    .ok_or_else(|| BwtError::Internal(format!("more than {} LMS names at depth {}", m, depth)))?;
                set(sa, ra + jj, s - 1);
            }
        }
        if jj != 0 {
            return Err(BwtError::Internal(format!("only {} of {} LMS names at depth {}", m - jj, m, depth)));
        }
        sais_main(Text::Reduced { offset: ra }, sa, newfs, m, name, depth + 1, stats)?;

        // 约简串后缀序映射回本层位置
        let mut jj = m;
        let mut cur = LmsCursor::new(text, sa, n);
        while let Some((p, _)) = cur.next(text, sa) {
            jj -= 1;
            set(sa, ra + jj, p as i64);
        }
        for i in 0..m {
            let x = get(sa, i) as usize;
            let p = get(sa, ra + x);
            set(sa, i, p);
        }
    }

    // 阶段 3：有序的 LMS 后缀放回桶尾，再诱导全部后缀
    if m > 1 {
        get_buckets(&c, &mut b, true);
        let mut i = m as isize - 1;
        let mut j = n;
        let mut p = get(sa, m - 1) as usize;
        let mut c1 = chr(text, sa, p);
        'place: loop {
            let c0 = c1;
            let q = b.get_value(c0) as usize;
            while q < j {
                j -= 1;
                set(sa, j, 0);
            }
            loop {
                j -= 1;
                set(sa, j, p as i64);
                i -= 1;
                if i < 0 {
                    break 'place;
                }
                p = get(sa, i as usize) as usize;
                c1 = chr(text, sa, p);
                if c1 != c0 {
                    break;
                }
            }
        }
        while j > 0 {
            j -= 1;
            set(sa, j, 0);
        }
    }
    induce_sa(text, sa, n, &c, &mut b);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_sa(text: &[u8]) -> Vec<u32> {
        let n = text.len();
        let mut suffixes: Vec<(usize, &[u8])> = (0..n).map(|i| (i, &text[i..])).collect();
        suffixes.sort_by(|a, b| a.1.cmp(b.1));
        suffixes.into_iter().map(|(i, _)| i as u32).collect()
    }

    fn naive_sa_u64(text: &[u64]) -> Vec<u64> {
        let mut idx: Vec<usize> = (0..text.len()).collect();
        idx.sort_by(|&a, &b| text[a..].cmp(&text[b..]));
        idx.into_iter().map(|i| i as u64).collect()
    }

    fn make_text(len: usize, sigma: u32, seed: u32) -> Vec<u8> {
        let mut x: u32 = seed;
        let mut v = Vec::with_capacity(len);
        for _ in 0..len {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            v.push(((x >> 16) % sigma) as u8);
        }
        v
    }

    fn fibonacci_word(len: usize) -> Vec<u8> {
        let (mut a, mut b) = (b"a".to_vec(), b"ab".to_vec());
        while b.len() < len {
            let next = [b.as_slice(), a.as_slice()].concat();
            a = b;
            b = next;
        }
        b.truncate(len);
        b
    }

    #[test]
    fn sa_basic() {
        // 文本：A C G T $  -> 1 2 3 4 0
        let text = [1u8, 2, 3, 4, 0];
        let sa = build_sa(&text).unwrap();
        assert_eq!(sa, vec![4, 0, 1, 2, 3]);
    }

    #[test]
    fn sa_matches_naive_on_small_random_texts() {
        for len in 1..=60 {
            for sigma in [1u32, 2, 3, 5, 26] {
                let text = make_text(len, sigma, 1_234_567 + len as u32);
                let sa_fast = build_sa(&text).unwrap();
                let sa_naive = naive_sa(&text);
                assert_eq!(sa_fast, sa_naive, "mismatch on len={} sigma={}", len, sigma);
            }
        }
    }

    #[test]
    fn sa_handles_multiple_separators() {
        let text = [1u8, 2, 0, 3, 0];
        assert_eq!(build_sa(&text).unwrap(), naive_sa(&text));
    }

    #[test]
    fn sa_on_repetitive_texts_recurses() {
        let periodic = b"abcab".repeat(200);
        let packed = PackedArray::from_slice(&periodic.iter().map(|&b| u64::from(b - b'a')).collect::<Vec<_>>()).unwrap();
        let (sa, stats) = sais_with_stats(&packed, 3).unwrap();
        assert!(stats.depth >= 1);
        let got: Vec<u32> = sa.iter().map(|x| x as u32).collect();
        assert_eq!(got, naive_sa(&periodic));

        let fib = fibonacci_word(3000);
        let packed = PackedArray::from_slice(&fib.iter().map(|&b| u64::from(b - b'a')).collect::<Vec<_>>()).unwrap();
        let (sa, stats) = sais_with_stats(&packed, 2).unwrap();
        assert!(stats.depth >= 3, "depth={}", stats.depth);
        assert_eq!(stats.levels, stats.depth + 1);
        let got: Vec<u32> = sa.iter().map(|x| x as u32).collect();
        assert_eq!(got, naive_sa(&fib));
    }

    #[test]
    fn sa_on_uniform_and_monotone_texts() {
        for text in [vec![7u8; 500], (0..=255u8).collect(), (0..=255u8).rev().collect::<Vec<u8>>()] {
            assert_eq!(build_sa(&text).unwrap(), naive_sa(&text));
        }
    }

    #[test]
    fn sais_over_large_alphabet_reduced_strings() {
        // 形如 T1 的输入：首项最大、末项为 0、中间为名字
        for seed in 0..40u32 {
            let body = make_text(30 + seed as usize, 7, seed);
            let mut t: Vec<u64> = vec![9];
            t.extend(body.iter().map(|&b| u64::from(b) + 1));
            t.push(0);
            let packed = PackedArray::from_slice(&t).unwrap();
            let sa = sais(&packed, 10).unwrap();
            let got = sa.to_vec();
            assert_eq!(got, naive_sa_u64(&t), "seed={}", seed);
            assert_eq!(got[0] as usize, t.len() - 1);
            assert_eq!(*got.last().unwrap(), 0);
        }
    }

    #[test]
    fn output_is_a_permutation() {
        let text = make_text(5000, 4, 99);
        let sa = build_sa(&text).unwrap();
        let mut seen = vec![false; text.len()];
        for &p in &sa {
            assert!(!seen[p as usize]);
            seen[p as usize] = true;
        }
        for w in sa.windows(2) {
            assert!(text[w[0] as usize..] < text[w[1] as usize..]);
        }
    }

    #[test]
    fn rejects_bad_alphabet() {
        let packed = PackedArray::from_slice(&[0, 3, 1]).unwrap();
        assert!(matches!(sais(&packed, 3), Err(BwtError::InvalidInput(_))));
        assert!(matches!(sais(&packed, 0), Err(BwtError::InvalidInput(_))));
        assert!(sais(&packed, 4).is_ok());
    }

    #[test]
    fn trivial_lengths() {
        assert!(build_sa(&[]).unwrap().is_empty());
        assert_eq!(build_sa(&[42]).unwrap(), vec![0]);
        assert_eq!(build_sa(&[2, 1]).unwrap(), vec![1, 0]);
        assert_eq!(build_sa(&[1, 1]).unwrap(), vec![1, 0]);
    }
}
