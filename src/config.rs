use serde::{Deserialize, Serialize};

/// 哈希表桶数下限
pub const DEFAULT_HASH_TABLE_SIZE: usize = 67_777;
/// 自动桶数：每 `HASH_LOAD_DIVISOR` 个输入字节一个桶（LMS 子串至多 n/2 个）
pub const HASH_LOAD_DIVISOR: usize = 4;
/// 默认 arena 扩容步长（字节）
pub const DEFAULT_ARENA_INCREMENT: usize = 4096;

/// 变换参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOpt {
    /// 子串去重表的桶数；`None` 时按输入长度自动选择
    pub hash_table_size: Option<usize>,
    /// 记录 arena 每次扩容的最小字节数
    pub arena_increment: usize,
}

impl TransformOpt {
    /// 长度为 n 的输入实际使用的桶数，总在 `[1, n]` 内。
    ///
    /// 自动模式取 `max(DEFAULT_HASH_TABLE_SIZE, n / 4)`，平均链长保持常数。
    pub fn table_size_for(&self, n: usize) -> usize {
        let size = self
            .hash_table_size
            .unwrap_or_else(|| DEFAULT_HASH_TABLE_SIZE.max(n / HASH_LOAD_DIVISOR));
        size.clamp(1, n.max(1))
    }
}

impl Default for TransformOpt {
    fn default() -> Self {
        Self { hash_table_size: None, arena_increment: DEFAULT_ARENA_INCREMENT }
    }
}
