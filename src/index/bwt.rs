//! BWT 的诱导构造、基于完整后缀数组的参考构造，以及逆变换。
//!
//! 行 0 对应虚拟终止符开头的后缀；`last` 是后缀 T[0..] 所在的行，
//! 该行的 BWT 字符就是终止符本身，输出时省略。

use log::debug;

use crate::error::{BwtError, Result};
use crate::lms::Freq;
use crate::packed::{PackedArray, Queue, Width};

#[derive(Debug, Clone, Copy)]
enum Kind {
    L = 0,
    S = 1,
    Lms = 2,
}

/// 3 × 256 个队列，按 (后缀类型, 首字符) 索引
struct QueueSet {
    queues: Vec<Queue>,
}

impl QueueSet {
    fn new(width: Width) -> Self {
        Self { queues: (0..3 * 256).map(|_| Queue::new(width)).collect() }
    }

    #[inline]
    fn get(&mut self, kind: Kind, c: usize) -> &mut Queue {
        &mut self.queues[kind as usize * 256 + c]
    }

    fn swap(&mut self, a: Kind, b: Kind, c: usize) {
        self.queues.swap(a as usize * 256 + c, b as usize * 256 + c);
    }

    fn heap_bytes(&self) -> usize {
        self.queues.iter().map(Queue::heap_bytes).sum()
    }
}

/// 由按后缀序排好的 LMS 位置诱导出 BWT，不构造完整后缀数组。
///
/// 每个字节桶的行区间为 `[M3[c], M3[c] + M[c])`，其中前 `NL[c]` 行是 L 型后缀。
/// L 扫描按字符升序，用 M2 从桶头向后写；S 扫描按字符降序，用 C2 从桶尾向前写。
/// 返回 (BWT, last)，BWT 长度为 n，不含终止符。
pub fn induce_bwt(text: &[u8], freq: &Freq, lms: &PackedArray) -> Result<(Vec<u8>, u64)> {
    let n = text.len();
    if n == 0 {
        return Err(BwtError::InvalidInput("empty input".into()));
    }
    let (total, _, _) = freq.sums();
    if total != n as u64 {
        return Err(BwtError::InvalidInput(format!("frequency table counts {} bytes, text has {}", total, n)));
    }

    let mut m3 = [0u64; 256];
    let mut acc = 1u64;
    for c in 0..256 {
        m3[c] = acc;
        acc += freq.total[c];
    }
    let mut m2 = m3;
    let mut c2 = [0u64; 256];
    for c in 0..256 {
        c2[c] = m3[c] + freq.total[c];
    }

    let mut out = Vec::new();
    out.try_reserve_exact(n + 1).map_err(BwtError::alloc(n + 1, "bwt bytes"))?;
    out.resize(n + 1, 0u8);

    let mut qs = QueueSet::new(Width::Max(n as u64));
    for r in 0..lms.len() {
        let p = lms.get_value(r) as usize;
        if p == 0 || p >= n {
            return Err(BwtError::InvalidInput(format!("LMS position {} outside (0, {})", p, n)));
        }
        qs.get(Kind::Lms, text[p] as usize).enqueue(p as u64)?;
    }

    // 行 0：终止符开头的后缀，前驱为 T[n-1]，且 n-1 总是 L 型
    out[0] = text[n - 1];
    qs.get(Kind::L, text[n - 1] as usize).enqueue(n as u64 - 1)?;

    let mut last = None;
    let mut peak_queue = 0usize;

    for c in 0..256 {
        loop {
            let Some(i) = qs.get(Kind::L, c).dequeue() else { break };
            let row = m2[c] as usize;
            m2[c] += 1;
            if i == 0 {
                last = Some(row);
                continue;
            }
            let i = i as usize;
            let p = text[i - 1];
            *slot(&mut out, row)? = p;
            if p as usize >= c {
                qs.get(Kind::L, p as usize).enqueue(i as u64 - 1)?;
            } else {
                // 前驱是 S 型，留到 S 扫描；倒序放入使其按行号降序出队
                qs.get(Kind::S, c).enqueue_front(i as u64)?;
            }
        }
        loop {
            let Some(i) = qs.get(Kind::Lms, c).dequeue() else { break };
            let i = i as usize;
            let p = text[i - 1];
            qs.get(Kind::L, p as usize).enqueue(i as u64 - 1)?;
        }
        peak_queue = peak_queue.max(qs.heap_bytes());
        qs.swap(Kind::S, Kind::Lms, c);
        if m2[c] != m3[c] + freq.l_type[c] {
            return Err(BwtError::Internal(format!(
                "L sweep filled {} rows of bucket {}, expected {}",
                m2[c] - m3[c],
                c,
                freq.l_type[c]
            )));
        }
    }

    for c in (0..256).rev() {
        loop {
            let Some(i) = qs.get(Kind::S, c).dequeue() else { break };
            c2[c] = c2[c]
                .checked_sub(1)
                .ok_or_else(|| BwtError::Internal(format!("S sweep underflow in bucket {}", c)))?;
            let row = c2[c] as usize;
            if i == 0 {
                last = Some(row);
                continue;
            }
            let i = i as usize;
            let p = text[i - 1];
            *slot(&mut out, row)? = p;
            if p as usize <= c {
                qs.get(Kind::S, p as usize).enqueue(i as u64 - 1)?;
            }
        }
        // L 扫描留下的后缀：它们的前驱是 S 型
        loop {
            let Some(i) = qs.get(Kind::Lms, c).dequeue() else { break };
            let i = i as usize;
            let p = text[i - 1];
            qs.get(Kind::S, p as usize).enqueue(i as u64 - 1)?;
        }
        peak_queue = peak_queue.max(qs.heap_bytes());
        if c2[c] != m3[c] + freq.l_type[c] {
            return Err(BwtError::Internal(format!(
                "S sweep filled {} rows of bucket {}, expected {}",
                m3[c] + freq.total[c] - c2[c],
                c,
                freq.total[c] - freq.l_type[c]
            )));
        }
    }

    let last = last.ok_or_else(|| BwtError::Internal("suffix 0 was never induced".into()))?;
    out.remove(last);
    debug!("induce: n={} seeds={} last={} peak_queue_bytes={}", n, lms.len(), last, peak_queue);
    Ok((out, last as u64))
}

#[inline]
fn slot(out: &mut [u8], row: usize) -> Result<&mut u8> {
    let len = out.len();
    out.get_mut(row)
        .ok_or_else(|| BwtError::Internal(format!("bwt row {} outside {} rows", row, len)))
}

/// 由完整后缀数组构建 BWT（参考实现）。
/// `sa` 是不含终止符的后缀数组；返回值与 [`induce_bwt`] 相同。
pub fn bwt_from_sa(text: &[u8], sa: &[u32]) -> (Vec<u8>, u64) {
    let n = text.len();
    if n == 0 {
        return (Vec::new(), 0);
    }
    let mut bwt = Vec::with_capacity(n);
    bwt.push(text[n - 1]);
    let mut last = 0;
    for (r, &p) in sa.iter().enumerate() {
        let i = p as usize;
        if i == 0 {
            last = r as u64 + 1;
        } else {
            bwt.push(text[i - 1]);
        }
    }
    (bwt, last)
}

/// 逆 BWT（LF 映射）。在行 `last` 处补回终止符后从行 0 倒推原文。
pub fn inverse_bwt(bwt: &[u8], last: u64) -> Result<Vec<u8>> {
    let n = bwt.len();
    if n == 0 {
        return Err(BwtError::InvalidInput("empty bwt".into()));
    }
    if last == 0 || last > n as u64 {
        return Err(BwtError::InvalidInput(format!("last = {} outside [1, {}]", last, n)));
    }
    let last = last as usize;
    let column = |r: usize| if r < last { bwt[r] } else { bwt[r - 1] };

    let mut counts = [0usize; 256];
    for &b in bwt {
        counts[b as usize] += 1;
    }
    let mut first = [0usize; 256];
    let mut acc = 1usize;
    for c in 0..256 {
        first[c] = acc;
        acc += counts[c];
    }

    // lf[r]：行 r 的前驱后缀所在行
    let mut lf = Vec::new();
    lf.try_reserve_exact(n + 1).map_err(BwtError::alloc(n + 1, "lf entries"))?;
    let mut seen = [0usize; 256];
    for r in 0..=n {
        if r == last {
            lf.push(0);
            continue;
        }
        let c = column(r) as usize;
        lf.push(first[c] + seen[c]);
        seen[c] += 1;
    }

    let mut text = vec![0u8; n];
    let mut r = 0usize;
    for k in (0..n).rev() {
        if r == last {
            return Err(BwtError::InvalidInput(format!("bwt cycles back to the terminator after {} bytes", n - 1 - k)));
        }
        text[k] = column(r);
        r = lf[r];
    }
    if r != last {
        return Err(BwtError::InvalidInput("bwt does not return to the terminator row".into()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformOpt;
    use crate::index::sa::{build_sa, sais};
    use crate::lms::{create_reduced_string, extract_lms_strings, sort_lms_strings};

    /// 朴素 BWT：把 n + 1 个带终止符的后缀直接排序
    fn naive_bwt(text: &[u8]) -> (Vec<u8>, u64) {
        let n = text.len();
        let mut rows: Vec<usize> = (0..=n).collect();
        rows.sort_by(|&a, &b| text[a..].cmp(&text[b..]));
        let mut bwt = Vec::with_capacity(n);
        let mut last = 0;
        for (r, &s) in rows.iter().enumerate() {
            if s == 0 {
                last = r as u64;
            } else {
                bwt.push(text[s - 1]);
            }
        }
        (bwt, last)
    }

    fn make_text(len: usize, sigma: u32, seed: u32) -> Vec<u8> {
        let mut x: u32 = seed;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((x >> 16) % sigma) as u8
            })
            .collect()
    }

    /// 走一遍提取、命名、约简与递归排序，再诱导 BWT
    fn pipeline(text: &[u8]) -> (Vec<u8>, u64) {
        let mut c = extract_lms_strings(text, None, &TransformOpt::default()).unwrap();
        let ranking = sort_lms_strings(&mut c).unwrap();
        let reduced = create_reduced_string(&c, &ranking).unwrap();
        let sa1 = sais(&reduced.t1, reduced.alphabet).unwrap();
        let lms = reduced.sorted_lms(&sa1).unwrap();
        induce_bwt(text, &c.freq, &lms).unwrap()
    }

    #[test]
    fn reference_fixture() {
        let (bwt, last) = pipeline(b"mmississiippii$");
        assert_eq!(bwt, b"$iipsismmpissii".to_vec());
        assert_eq!(last, 9);
    }

    #[test]
    fn small_fixtures() {
        assert_eq!(pipeline(b"i$"), (b"$i".to_vec(), 2));
        assert_eq!(pipeline(b"x"), (b"x".to_vec(), 1));
        assert_eq!(pipeline(b"abc"), (b"cab".to_vec(), 1));
        assert_eq!(pipeline(b"banana"), (b"annbaa".to_vec(), 4));
        assert_eq!(pipeline(b"bababa"), (b"abbbaa".to_vec(), 6));
        assert_eq!(pipeline(b"aaaa"), (b"aaaa".to_vec(), 4));
        assert_eq!(pipeline(&[0, 0, 1, 0]), (vec![0, 1, 0, 0], 2));
    }

    #[test]
    fn induced_matches_naive_on_random_texts() {
        for sigma in [1u32, 2, 3, 4, 256] {
            for len in [1usize, 2, 5, 17, 64, 200, 777] {
                let t = make_text(len, sigma, len as u32 ^ sigma.wrapping_mul(2_654_435_761));
                assert_eq!(pipeline(&t), naive_bwt(&t), "sigma={} len={}", sigma, len);
            }
        }
    }

    #[test]
    fn induced_matches_suffix_array_bwt() {
        let t = make_text(20_000, 4, 7);
        let sa = build_sa(&t).unwrap();
        assert_eq!(pipeline(&t), bwt_from_sa(&t, &sa));
    }

    #[test]
    fn bwt_from_sa_matches_naive() {
        for t in [&b"mmississiippii$"[..], &b"abracadabra"[..], &b"zzzzz"[..]] {
            let sa = build_sa(t).unwrap();
            assert_eq!(bwt_from_sa(t, &sa), naive_bwt(t));
        }
    }

    #[test]
    fn inverse_restores_text() {
        for t in [&b"mmississiippii$"[..], &b"x"[..], &b"abc"[..], &b"cba"[..], &[0u8, 0, 0][..]] {
            let (bwt, last) = naive_bwt(t);
            assert_eq!(inverse_bwt(&bwt, last).unwrap(), t.to_vec());
        }
        let t = make_text(3000, 256, 5);
        let (bwt, last) = naive_bwt(&t);
        assert_eq!(inverse_bwt(&bwt, last).unwrap(), t);
    }

    #[test]
    fn inverse_rejects_bad_last() {
        assert!(matches!(inverse_bwt(b"abc", 0), Err(BwtError::InvalidInput(_))));
        assert!(matches!(inverse_bwt(b"abc", 4), Err(BwtError::InvalidInput(_))));
        assert!(matches!(inverse_bwt(b"", 1), Err(BwtError::InvalidInput(_))));
        // "aa" 的合法 last 是 2；last = 1 时 LF 提前回到终止符
        assert!(inverse_bwt(b"aa", 1).is_err());
    }

    #[test]
    fn induce_rejects_inconsistent_tables() {
        let c = extract_lms_strings(b"abc", None, &TransformOpt::default()).unwrap();
        let empty = PackedArray::new(0, Width::Bits(2)).unwrap();
        assert!(matches!(induce_bwt(b"abcd", &c.freq, &empty), Err(BwtError::InvalidInput(_))));
        let bad = PackedArray::from_slice(&[0]).unwrap();
        assert!(matches!(induce_bwt(b"abc", &c.freq, &bad), Err(BwtError::InvalidInput(_))));
        assert_eq!(induce_bwt(b"abc", &c.freq, &empty).unwrap(), (b"cab".to_vec(), 1));
    }
}
