use crate::lms::interner::SubstringInterner;

/// 每个字节值的频次表
#[derive(Clone, PartialEq, Eq)]
pub struct Freq {
    /// M：出现总次数
    pub total: [u64; 256],
    /// NL：其中 L 型的次数
    pub l_type: [u64; 256],
    /// C：以该字节开头的 LMS 子串个数
    pub lms: [u64; 256],
}

impl Freq {
    pub fn new() -> Self {
        Self { total: [0; 256], l_type: [0; 256], lms: [0; 256] }
    }

    /// 各类计数总和：(n, L 型个数, LMS 个数)
    pub fn sums(&self) -> (u64, u64, u64) {
        (self.total.iter().sum(), self.l_type.iter().sum(), self.lms.iter().sum())
    }
}

impl Default for Freq {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Freq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 只列出出现过的字节
        let mut map = f.debug_map();
        for c in 0..256 {
            if self.total[c] > 0 {
                map.entry(&c, &(self.total[c], self.l_type[c], self.lms[c]));
            }
        }
        map.finish()
    }
}

/// 一次变换的提取结果：频次表、子串计数和去重表。
/// 在约简串建好后即被丢弃。
pub struct Container<'t> {
    pub n: usize,
    /// 字母表大小
    pub k: u32,
    pub freq: Freq,
    /// LMS 子串总数 m
    pub num_substrings: usize,
    /// 不同 LMS 子串个数 u
    pub num_unique: usize,
    /// 最左 LMS 边界；头部子串为 T[0..=head_end]。没有 LMS 时等于 n
    pub head_end: usize,
    pub interner: SubstringInterner<'t>,
}

impl Container<'_> {
    pub fn heap_bytes(&self) -> usize {
        self.interner.heap_bytes()
    }
}

impl std::fmt::Debug for Container<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("n", &self.n)
            .field("k", &self.k)
            .field("num_substrings", &self.num_substrings)
            .field("num_unique", &self.num_unique)
            .field("head_end", &self.head_end)
            .field("freq", &self.freq)
            .finish()
    }
}
