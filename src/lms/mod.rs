//! LMS 子串的提取、去重与命名。
//!
//! 约定：文本 T 长度为 n，位置 n 处有一个虚拟终止符，比所有字节都小，
//! 但从不出现在输出中。比较子串时字节 b 记为 `b + 1`，终止符记为 0，
//! 这样输入中真实的 0x00 也不会与终止符混淆。

pub mod container;
pub mod extract;
pub mod interner;
pub mod namer;

pub use container::{Container, Freq};
pub use extract::extract_lms_strings;
pub use interner::{Handle, SubstringInterner};
pub use namer::{create_reduced_string, sort_lms_strings, Ranking, Reduced};

/// 字符类型：S 型后缀小于其右邻后缀，L 型大于
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharType {
    S,
    L,
}

/// 一个 LMS 子串 T[start..=end]，两端都是 LMS 边界（end 可以是虚拟终止符 n）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// 扫描中的一步：位置、类型，以及在此处闭合的 LMS 子串（若有）
#[derive(Debug, Clone, Copy)]
pub struct Scanned {
    pub pos: usize,
    pub ty: CharType,
    pub closed: Option<Span>,
}

/// 从右向左的类型扫描。
///
/// T[n-1] 总是 L 型（大于终止符）。扫描到 T[i] > T[i+1] 且前一步为 S 型时，
/// i+1 是 LMS 边界，闭合子串 [i+1, q]，q 为上一个边界（初始为 n）。
/// 相等字符沿用右侧字符的类型，类型从不整体存储。
pub struct LmsScan<'t> {
    text: &'t [u8],
    next: usize,
    prev: CharType,
    boundary: usize,
}

impl<'t> LmsScan<'t> {
    pub fn new(text: &'t [u8]) -> Self {
        Self { text, next: text.len(), prev: CharType::L, boundary: text.len() }
    }

    /// 目前为止最左的 LMS 边界（没有则为 n）
    #[inline]
    pub fn boundary(&self) -> usize {
        self.boundary
    }
}

impl Iterator for LmsScan<'_> {
    type Item = Scanned;

    fn next(&mut self) -> Option<Scanned> {
        if self.next == 0 {
            return None;
        }
        self.next -= 1;
        let i = self.next;
        let t = self.text;
        if i + 1 == t.len() {
            self.prev = CharType::L;
            return Some(Scanned { pos: i, ty: CharType::L, closed: None });
        }
        let mut closed = None;
        let ty = if t[i] < t[i + 1] {
            CharType::S
        } else if t[i] > t[i + 1] {
            if self.prev == CharType::S {
                let span = Span { start: i + 1, end: self.boundary };
                self.boundary = i + 1;
                closed = Some(span);
            }
            CharType::L
        } else {
            self.prev
        };
        self.prev = ty;
        Some(Scanned { pos: i, ty, closed })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.next, Some(self.next))
    }
}
