use std::cmp::Ordering;

use crate::error::{BwtError, Result};
use crate::packed::{PackedArray, Width};
use crate::util::bits::{byte_width, short_string_limit};

/// 多项式哈希的乘数
pub const HASH_MULTIPLIER: u64 = 101;

const BACKREF: u8 = 0x80;
const LENLEN_MASK: u8 = 0x0f;

/// 记录在 arena 中的字节偏移。偏移 0 是保留字节，用作“空链”。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

/// `insert` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insert {
    pub handle: Handle,
    pub is_new: bool,
}

/// 解析后的记录头
#[derive(Debug, Clone, Copy)]
struct Record {
    len: usize,
    backref: bool,
    sentinel: u8,
    /// 内联内容的 arena 偏移，或回指位置字段的偏移
    content: usize,
    name: usize,
    next: usize,
}

/// LMS 子串去重表。
///
/// 每个桶是一条单链表，记录按变长格式依次排列在同一个字节 arena 中：
///
/// ```text
/// [hdr][len: lenlen 字节][sentinel][内容 len 字节 | 起始位置 pos_bytes][name][next]
/// ```
///
/// `hdr` 低 4 位为 lenlen，最高位标记回指。长度不超过 `ss_limit` 且不触及
/// 终止符的子串内联保存，其余保存起始位置、比较时回到原文读取。
/// 各字段宽度在构造时由 n 和 k 一次性确定。
pub struct SubstringInterner<'t> {
    text: &'t [u8],
    table: PackedArray,
    arena: Vec<u8>,
    arena_increment: usize,
    ss_limit: usize,
    pos_bytes: usize,
    name_bytes: usize,
    link_bytes: usize,
    /// 链接与桶头能表示的最大偏移
    max_offset: usize,
    records: usize,
}

impl<'t> SubstringInterner<'t> {
    /// `table_size` 会被限制在 `[1, n]` 内；`k` 为字母表大小，决定内联上限。
    pub fn new(text: &'t [u8], k: u32, table_size: usize, arena_increment: usize) -> Result<Self> {
        let n = text.len();
        if n == 0 {
            return Err(BwtError::InvalidInput("cannot intern substrings of an empty text".into()));
        }
        let table_size = table_size.clamp(1, n);
        let ss_limit = short_string_limit(n as u64, k) as usize;
        let pos_bytes = byte_width(n as u64) as usize;
        let name_bytes = byte_width(n as u64 + 1) as usize;
        let len_bytes = byte_width(n as u64 + 1) as usize;

        // arena 上界：按 n + 2 条记录、8 字节链接估算
        let max_record = 1 + len_bytes + 1 + ss_limit.max(pos_bytes) + name_bytes + 8;
        let bound = (n + 2).saturating_mul(max_record).saturating_add(1);
        let link_bytes = byte_width(bound as u64) as usize;

        let table = PackedArray::new(table_size, Width::Max(bound as u64))?;
        let mut arena = Vec::new();
        let first = arena_increment.max(1);
        arena.try_reserve_exact(first).map_err(BwtError::alloc(first, "arena bytes"))?;
        arena.push(0);

        Ok(Self {
            text,
            table,
            arena,
            arena_increment: arena_increment.max(1),
            ss_limit,
            pos_bytes,
            name_bytes,
            link_bytes,
            max_offset: bound,
            records: 0,
        })
    }

    #[inline]
    pub fn text(&self) -> &'t [u8] {
        self.text
    }

    #[inline]
    pub fn table_size(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn ss_limit(&self) -> usize {
        self.ss_limit
    }

    /// 表中记录数（含合成记录）
    #[inline]
    pub fn num_records(&self) -> usize {
        self.records
    }

    pub fn heap_bytes(&self) -> usize {
        self.arena.capacity() + self.table.heap_bytes()
    }

    /// 子串 T[start..start+len) 的桶号；越过 n 的位置按 0 计
    pub fn hash(&self, start: usize, len: usize) -> usize {
        let mut x = 0u64;
        for i in start..start + len {
            let b = self.text.get(i).copied().unwrap_or(0);
            x = x.wrapping_mul(HASH_MULTIPLIER).wrapping_add(u64::from(b));
        }
        (x % self.table.len() as u64) as usize
    }

    /// 插入 T[start..start+len)（可以包含位置 n 的终止符）。
    /// 已存在相同内容时返回原记录且 `is_new = false`。
    pub fn insert(&mut self, start: usize, len: usize) -> Result<Insert> {
        self.check_range(start, len)?;
        let bucket = self.hash(start, len);
        let mut prev = None;
        let mut cur = self.table.get_value(bucket) as usize;
        while cur != 0 {
            let rec = self.record(cur);
            if self.matches(&rec, start, len) {
                return Ok(Insert { handle: Handle(cur as u64), is_new: false });
            }
            prev = Some(rec);
            cur = rec.next;
        }
        let sentinel = if start == 0 { 0 } else { self.text[start - 1] };
        let at = self.append(start, len, sentinel)?;
        match prev {
            Some(rec) => self.write_le(rec.next_field(self.name_bytes), self.link_bytes, at as u64),
            None => self.table.set_value(bucket, at as u64),
        }
        Ok(Insert { handle: Handle(at as u64), is_new: true })
    }

    pub fn find(&self, start: usize, len: usize) -> Option<Handle> {
        if self.check_range(start, len).is_err() {
            return None;
        }
        let mut cur = self.table.get_value(self.hash(start, len)) as usize;
        while cur != 0 {
            let rec = self.record(cur);
            if self.matches(&rec, start, len) {
                return Some(Handle(cur as u64));
            }
            cur = rec.next;
        }
        None
    }

    /// 取已插入内容的名字；内容从未插入过属于内部错误
    pub fn find_name(&self, start: usize, len: usize) -> Result<u64> {
        self.find(start, len)
            .map(|h| self.name(h))
            .ok_or_else(|| BwtError::Internal(format!("substring at {} (len {}) was never interned", start, len)))
    }

    pub fn set_name(&mut self, h: Handle, name: u64) {
        let rec = self.record(h.0 as usize);
        self.write_le(rec.name, self.name_bytes, name);
    }

    pub fn name(&self, h: Handle) -> u64 {
        let rec = self.record(h.0 as usize);
        self.read_le(rec.name, self.name_bytes)
    }

    pub fn len(&self, h: Handle) -> usize {
        self.record(h.0 as usize).len
    }

    /// 子串前一个字符（起始于 0 的记录为 0）
    pub fn sentinel(&self, h: Handle) -> u8 {
        self.record(h.0 as usize).sentinel
    }

    /// 是否以回指方式保存
    pub fn is_backref(&self, h: Handle) -> bool {
        self.record(h.0 as usize).backref
    }

    /// 追加一条不进入哈希链的记录（头部子串等），名字稍后设置
    pub fn push_synthetic(&mut self, start: usize, len: usize, sentinel: u8) -> Result<Handle> {
        self.check_range(start, len)?;
        let at = self.append(start, len, sentinel)?;
        Ok(Handle(at as u64))
    }

    /// 按内容比较两条记录。字节 b 记为 b + 1、终止符记为 0；
    /// 一方是另一方的真前缀时，较长的排在前面。
    pub fn compare(&self, a: Handle, b: Handle) -> Ordering {
        let ra = self.record(a.0 as usize);
        let rb = self.record(b.0 as usize);
        for j in 0..ra.len.min(rb.len) {
            let (x, y) = (self.symbol(&ra, j), self.symbol(&rb, j));
            if x != y {
                return x.cmp(&y);
            }
        }
        rb.len.cmp(&ra.len)
    }

    /// 按桶顺序遍历哈希链上的全部记录（不含合成记录）
    pub fn handles(&self) -> Handles<'_, 't> {
        Handles { interner: self, bucket: 0, cur: 0 }
    }

    fn check_range(&self, start: usize, len: usize) -> Result<()> {
        if len == 0 || start + len > self.text.len() + 1 {
            return Err(BwtError::InvalidInput(format!(
                "substring [{}, {}) outside text of length {}",
                start,
                start + len,
                self.text.len()
            )));
        }
        Ok(())
    }

    #[inline]
    fn text_symbol(&self, i: usize) -> u16 {
        self.text.get(i).map_or(0, |&b| u16::from(b) + 1)
    }

    #[inline]
    fn symbol(&self, rec: &Record, j: usize) -> u16 {
        if rec.backref {
            let pos = self.read_le(rec.content, self.pos_bytes) as usize;
            self.text_symbol(pos + j)
        } else {
            u16::from(self.arena[rec.content + j]) + 1
        }
    }

    fn matches(&self, rec: &Record, start: usize, len: usize) -> bool {
        if rec.len != len {
            return false;
        }
        if rec.backref {
            let pos = self.read_le(rec.content, self.pos_bytes) as usize;
            return pos == start || (0..len).all(|j| self.text_symbol(pos + j) == self.text_symbol(start + j));
        }
        if start + len > self.text.len() {
            return false;
        }
        self.arena[rec.content..rec.content + len] == self.text[start..start + len]
    }

    fn record(&self, at: usize) -> Record {
        let hdr = self.arena[at];
        let lenlen = (hdr & LENLEN_MASK) as usize;
        let len = self.read_le(at + 1, lenlen) as usize;
        let sentinel = self.arena[at + 1 + lenlen];
        let content = at + 2 + lenlen;
        let backref = hdr & BACKREF != 0;
        let body = if backref { self.pos_bytes } else { len };
        let name = content + body;
        Record { len, backref, sentinel, content, name, next: self.read_le(name + self.name_bytes, self.link_bytes) as usize }
    }

    fn append(&mut self, start: usize, len: usize, sentinel: u8) -> Result<usize> {
        let inline = len <= self.ss_limit && start + len <= self.text.len();
        let lenlen = byte_width(len as u64) as usize;
        let body = if inline { len } else { self.pos_bytes };
        let size = 2 + lenlen + body + self.name_bytes + self.link_bytes;
        if self.arena.len() + size > self.max_offset {
            return Err(BwtError::Allocation { requested: size, unit: "addressable arena bytes" });
        }
        if self.arena.capacity() - self.arena.len() < size {
            let step = self.arena_increment.max(size);
            self.arena.try_reserve_exact(step).map_err(BwtError::alloc(step, "arena bytes"))?;
        }

        let at = self.arena.len();
        let hdr = lenlen as u8 | if inline { 0 } else { BACKREF };
        self.arena.push(hdr);
        self.arena.extend_from_slice(&(len as u64).to_le_bytes()[..lenlen]);
        self.arena.push(sentinel);
        if inline {
            self.arena.extend_from_slice(&self.text[start..start + len]);
        } else {
            self.arena.extend_from_slice(&(start as u64).to_le_bytes()[..self.pos_bytes]);
        }
        self.arena.resize(at + size, 0);
        self.records += 1;
        Ok(at)
    }

    #[inline]
    fn read_le(&self, at: usize, width: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(&self.arena[at..at + width]);
        u64::from_le_bytes(buf)
    }

    #[inline]
    fn write_le(&mut self, at: usize, width: usize, x: u64) {
        debug_assert!(width == 8 || x >> (8 * width) == 0, "{} does not fit in {} bytes", x, width);
        self.arena[at..at + width].copy_from_slice(&x.to_le_bytes()[..width]);
    }
}

impl Record {
    #[inline]
    fn next_field(&self, name_bytes: usize) -> usize {
        self.name + name_bytes
    }
}

/// 哈希链遍历器
pub struct Handles<'a, 't> {
    interner: &'a SubstringInterner<'t>,
    bucket: usize,
    cur: usize,
}

impl Iterator for Handles<'_, '_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        while self.cur == 0 {
            if self.bucket == self.interner.table.len() {
                return None;
            }
            self.cur = self.interner.table.get_value(self.bucket) as usize;
            self.bucket += 1;
        }
        let h = Handle(self.cur as u64);
        self.cur = self.interner.record(self.cur).next;
        Some(h)
    }
}
