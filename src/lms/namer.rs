use log::debug;

use crate::error::{BwtError, Result};
use crate::lms::container::Container;
use crate::lms::interner::Handle;
use crate::lms::LmsScan;
use crate::packed::{PackedArray, Width};

/// 排序命名的结果
#[derive(Debug)]
pub struct Ranking {
    /// 按内容升序排列的全部不同 LMS 子串；第 r 个的名字为 r + 1
    pub order: Vec<Handle>,
    /// 头部子串 T[0..=head_end]，名字为 u + 1
    pub head: Handle,
    /// 终止符记录，名字为 0
    pub end: Handle,
}

/// 约简串 T1 及其位置映射
#[derive(Debug)]
pub struct Reduced {
    /// `[u + 1, name(p_1), ..., name(p_m), 0]`，长度 m + 2
    pub t1: PackedArray,
    /// T1 下标到原文位置：`[0, p_1, ..., p_m, n]`
    pub positions: PackedArray,
    /// T1 的字母表大小 u + 2
    pub alphabet: u64,
}

impl Reduced {
    #[inline]
    pub fn num_substrings(&self) -> usize {
        self.t1.len() - 2
    }

    pub fn heap_bytes(&self) -> usize {
        self.t1.heap_bytes() + self.positions.heap_bytes()
    }

    /// 把 T1 的后缀数组映射回原文，得到按后缀序排列的 LMS 位置。
    ///
    /// SA1 的首项必须是末尾的 0，末项必须是开头的 u + 1。
    pub fn sorted_lms(&self, sa1: &PackedArray) -> Result<PackedArray> {
        let len = self.t1.len();
        if sa1.len() != len {
            return Err(BwtError::Internal(format!(
                "reduced suffix array has {} entries, expected {}",
                sa1.len(),
                len
            )));
        }
        let m = len - 2;
        if sa1.get_value(0) as usize != m + 1 || sa1.get_value(m + 1) != 0 {
            return Err(BwtError::Internal("reduced string sentinels are not at the ends of its suffix array".into()));
        }
        let n = self.positions.get_value(m + 1);
        let mut lms = PackedArray::new(m, Width::Max(n))?;
        for r in 0..m {
            let x = sa1.get_value(r + 1) as usize;
            lms.set_value(r, self.positions.get_value(x));
        }
        Ok(lms)
    }
}

/// 收集全部不同子串、按内容排序并命名。
///
/// 前缀关系下较长者在前。头部子串与终止符记录不参与排序，
/// 分别命名为 u + 1 和 0。
pub fn sort_lms_strings(container: &mut Container<'_>) -> Result<Ranking> {
    let u = container.num_unique;
    let n = container.n;
    let interner = &mut container.interner;

    let mut order = Vec::new();
    order.try_reserve_exact(u).map_err(BwtError::alloc(u, "handles"))?;
    order.extend(interner.handles());
    if order.len() != u {
        return Err(BwtError::Internal(format!(
            "interner holds {} substrings, extractor counted {}",
            order.len(),
            u
        )));
    }

    order.sort_unstable_by(|&a, &b| interner.compare(a, b));
    for (r, &h) in order.iter().enumerate() {
        interner.set_name(h, r as u64 + 1);
    }

    let text = interner.text();
    let head = interner.push_synthetic(0, container.head_end + 1, 0)?;
    interner.set_name(head, u as u64 + 1);
    let end = interner.push_synthetic(n, 1, text[n - 1])?;
    interner.set_name(end, 0);

    debug!("name: {} unique substrings ranked", u);
    Ok(Ranking { order, head, end })
}

/// 按 LMS 子串在原文中从左到右的顺序写出它们的名字，两端加上头部与终止符的名字。
pub fn create_reduced_string(container: &Container<'_>, ranking: &Ranking) -> Result<Reduced> {
    let interner = &container.interner;
    let text = interner.text();
    let (n, m, u) = (container.n, container.num_substrings, container.num_unique);

    let mut t1 = PackedArray::new(m + 2, Width::Max(u as u64 + 1))?;
    let mut positions = PackedArray::new(m + 2, Width::Max(n as u64))?;
    t1.set_value(0, interner.name(ranking.head));
    t1.set_value(m + 1, interner.name(ranking.end));
    positions.set_value(m + 1, n as u64);

    // 从右向左扫描，依次填充 m, m-1, ..., 1
    let mut j = m + 1;
    for span in LmsScan::new(text).filter_map(|s| s.closed) {
        if j == 1 {
            return Err(BwtError::Internal(format!("more than {} LMS substrings on rescan", m)));
        }
        j -= 1;
        t1.set_value(j, interner.find_name(span.start, span.len())?);
        positions.set_value(j, span.start as u64);
    }
    if j != 1 {
        return Err(BwtError::Internal(format!("rescan found {} LMS substrings, expected {}", m + 1 - j, m)));
    }

    debug!("reduce: |T1|={} alphabet={}", m + 2, u + 2);
    Ok(Reduced { t1, positions, alphabet: u as u64 + 2 })
}
