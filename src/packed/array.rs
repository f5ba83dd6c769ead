use crate::error::{BwtError, Result};
use crate::util::bits::bit_width;

const WORD_BITS: usize = 64;

/// 元素位宽的两种给法：直接给位数，或给出需要表示的最大值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Bits(u8),
    Max(u64),
}

impl Width {
    pub fn bits(self) -> u8 {
        match self {
            Width::Bits(w) => w,
            Width::Max(max) => bit_width(max),
        }
    }
}

#[inline]
fn low_mask(w: usize) -> u64 {
    if w >= WORD_BITS {
        u64::MAX
    } else {
        (1u64 << w) - 1
    }
}

/// 位压缩整数数组：每个元素占固定 `w` 位（1..=64），元素可以跨越相邻两个 64 位字。
///
/// 可选的符号位通道为每个元素额外保存一位符号，`get_signed`/`set_signed`
/// 以“符号 + 绝对值”的方式读写有符号数（绝对值仍受位宽约束）。
/// SA-IS 用它来存放按位取反标记的临时值。
#[derive(Clone)]
pub struct PackedArray {
    len: usize,
    width: u8,
    words: Vec<u64>,
    signs: Option<Vec<u64>>,
}

impl PackedArray {
    pub fn new(len: usize, width: Width) -> Result<Self> {
        Self::with_signs(len, width, false)
    }

    /// 带符号位通道的数组
    pub fn new_signed(len: usize, width: Width) -> Result<Self> {
        Self::with_signs(len, width, true)
    }

    fn with_signs(len: usize, width: Width, signed: bool) -> Result<Self> {
        let w = width.bits();
        if w == 0 || w > 64 {
            return Err(BwtError::InvalidInput(format!("element width must be 1..=64 bits, got {}", w)));
        }
        let words = zeroed_words(word_count(len, w)?)?;
        let signs = if signed { Some(zeroed_words(word_count(len, 1)?)?) } else { None };
        Ok(Self { len, width: w, words, signs })
    }

    /// 由切片构造，位宽取切片最大值所需位数
    pub fn from_slice(values: &[u64]) -> Result<Self> {
        let max = values.iter().copied().max().unwrap_or(0);
        let mut pa = Self::new(values.len(), Width::Max(max))?;
        for (i, &v) in values.iter().enumerate() {
            pa.set_value(i, v);
        }
        Ok(pa)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    #[inline]
    pub fn is_signed(&self) -> bool {
        self.signs.is_some()
    }

    /// 当前可表示的最大值
    #[inline]
    pub fn max_value(&self) -> u64 {
        low_mask(self.width as usize)
    }

    /// 读取第 i 个元素（有符号数组上返回绝对值部分）
    #[inline]
    pub fn get_value(&self, i: usize) -> u64 {
        debug_assert!(i < self.len, "index {} out of bounds {}", i, self.len);
        let w = self.width as usize;
        let bit = i * w;
        let (wi, off) = (bit / WORD_BITS, bit % WORD_BITS);
        let mask = low_mask(w);
        if off + w <= WORD_BITS {
            (self.words[wi] >> off) & mask
        } else {
            // 跨字：低位在 words[wi] 高端，高位在 words[wi + 1] 低端
            let lo = self.words[wi] >> off;
            let hi = self.words[wi + 1] << (WORD_BITS - off);
            (lo | hi) & mask
        }
    }

    /// 写入第 i 个元素，只改动该元素占用的位
    #[inline]
    pub fn set_value(&mut self, i: usize, x: u64) {
        debug_assert!(i < self.len, "index {} out of bounds {}", i, self.len);
        debug_assert!(x <= self.max_value(), "value {} exceeds {}-bit width", x, self.width);
        let w = self.width as usize;
        let mask = low_mask(w);
        let x = x & mask;
        let bit = i * w;
        let (wi, off) = (bit / WORD_BITS, bit % WORD_BITS);
        if off + w <= WORD_BITS {
            self.words[wi] = (self.words[wi] & !(mask << off)) | (x << off);
        } else {
            let lo_bits = WORD_BITS - off;
            let hi_mask = low_mask(w - lo_bits);
            self.words[wi] = (self.words[wi] & low_mask(off)) | (x << off);
            self.words[wi + 1] = (self.words[wi + 1] & !hi_mask) | (x >> lo_bits);
        }
    }

    #[inline]
    pub fn get_signed(&self, i: usize) -> i64 {
        let mag = self.get_value(i) as i64;
        match &self.signs {
            Some(s) if (s[i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1 => -mag,
            _ => mag,
        }
    }

    #[inline]
    pub fn set_signed(&mut self, i: usize, x: i64) {
        self.set_value(i, x.unsigned_abs());
        if let Some(s) = self.signs.as_mut() {
            let bit = 1u64 << (i % WORD_BITS);
            if x < 0 {
                s[i / WORD_BITS] |= bit;
            } else {
                s[i / WORD_BITS] &= !bit;
            }
        } else {
            debug_assert!(x >= 0, "negative value {} in unsigned array", x);
        }
    }

    /// 改变长度并收缩/扩展底层存储。新增元素为 0，已有前缀不变。
    pub fn reallocate(&mut self, new_len: usize) -> Result<()> {
        let w = self.width;
        let old_len = self.len;
        resize_words(&mut self.words, old_len, new_len, w)?;
        if let Some(s) = self.signs.as_mut() {
            resize_words(s, old_len, new_len, 1)?;
        }
        self.len = new_len;
        Ok(())
    }

    /// 丢弃符号位通道（所有元素须已为非负）
    pub fn into_unsigned(mut self) -> Self {
        debug_assert!((0..self.len).all(|i| self.get_signed(i) >= 0));
        self.signs = None;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len).map(move |i| self.get_value(i))
    }

    pub fn to_vec(&self) -> Vec<u64> {
        self.iter().collect()
    }

    /// 底层存储占用的堆内存字节数
    pub fn heap_bytes(&self) -> usize {
        let signs = self.signs.as_ref().map_or(0, Vec::capacity);
        (self.words.capacity() + signs) * std::mem::size_of::<u64>()
    }
}

impl std::fmt::Debug for PackedArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        if self.is_signed() {
            list.entries((0..self.len).map(|i| self.get_signed(i)));
        } else {
            list.entries(self.iter());
        }
        list.finish()
    }
}

fn word_count(len: usize, w: u8) -> Result<usize> {
    len.checked_mul(w as usize)
        .map(|bits| (bits + WORD_BITS - 1) / WORD_BITS)
        .ok_or(BwtError::Allocation { requested: len, unit: "packed elements" })
}

fn zeroed_words(count: usize) -> Result<Vec<u64>> {
    let mut v = Vec::new();
    v.try_reserve_exact(count).map_err(BwtError::alloc(count, "words"))?;
    v.resize(count, 0);
    Ok(v)
}

fn resize_words(words: &mut Vec<u64>, old_len: usize, new_len: usize, w: u8) -> Result<()> {
    let count = word_count(new_len, w)?;
    if new_len < old_len {
        // 清掉新末尾之后的残留位，之后再扩展时新元素才会是 0
        let used = new_len * w as usize;
        let (wi, off) = (used / WORD_BITS, used % WORD_BITS);
        if off != 0 {
            words[wi] &= low_mask(off);
        }
        words.truncate(count);
        words.shrink_to_fit();
    } else if count > words.len() {
        let extra = count - words.len();
        words.try_reserve_exact(extra).map_err(BwtError::alloc(extra, "words"))?;
        words.resize(count, 0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_values(len: usize, w: u8, seed: u64) -> Vec<u64> {
        let mut x = seed;
        let mask = low_mask(w as usize);
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
                (x ^ (x >> 29)) & mask
            })
            .collect()
    }

    #[test]
    fn width_from_max_value() {
        assert_eq!(Width::Max(0).bits(), 1);
        assert_eq!(Width::Max(15).bits(), 4);
        assert_eq!(Width::Max(16).bits(), 5);
        assert_eq!(Width::Bits(42).bits(), 42);
        let pa = PackedArray::new(10, Width::Max(100)).unwrap();
        assert_eq!(pa.width(), 7);
        assert_eq!(pa.max_value(), 127);
    }

    #[test]
    fn rejects_zero_and_oversized_width() {
        assert!(matches!(PackedArray::new(4, Width::Bits(0)), Err(BwtError::InvalidInput(_))));
        assert!(matches!(PackedArray::new(4, Width::Bits(65)), Err(BwtError::InvalidInput(_))));
    }

    #[test]
    fn small_widths_basic() {
        let mut pa = PackedArray::new(100, Width::Bits(16)).unwrap();
        pa.set_value(0, 33);
        pa.set_value(1, 32767);
        pa.set_value(2, 6699);
        assert_eq!(pa.get_value(0), 33);
        assert_eq!(pa.get_value(1), 32767);
        assert_eq!(pa.get_value(2), 6699);

        let mut pa = PackedArray::new(100, Width::Bits(42)).unwrap();
        pa.set_value(0, 33);
        pa.set_value(1, 32767);
        pa.set_value(2, 6699);
        assert_eq!(pa.get_value(0), 33);
        assert_eq!(pa.get_value(1), 32767);
        assert_eq!(pa.get_value(2), 6699);
    }

    #[test]
    fn every_width_and_alignment_round_trips() {
        // 130 个元素：对任意 w，元素起始位覆盖 64 的所有余数类（w 与 64 互素时）
        let len = 130;
        for w in 1..=64u8 {
            let vals = make_values(len, w, u64::from(w));
            let mut pa = PackedArray::new(len, Width::Bits(w)).unwrap();
            for (i, &v) in vals.iter().enumerate() {
                pa.set_value(i, v);
            }
            for (i, &v) in vals.iter().enumerate() {
                assert_eq!(pa.get_value(i), v, "w={} i={}", w, i);
            }
        }
    }

    #[test]
    fn writes_never_disturb_neighbours() {
        let len = 70;
        for w in 1..=64u8 {
            let max = low_mask(w as usize);
            for &fill in &[0u64, max] {
                let mut pa = PackedArray::new(len, Width::Bits(w)).unwrap();
                for i in 0..len {
                    pa.set_value(i, fill);
                }
                let inverse = !fill & max;
                for i in 0..len {
                    pa.set_value(i, inverse);
                    assert_eq!(pa.get_value(i), inverse, "w={} i={}", w, i);
                    if i > 0 {
                        assert_eq!(pa.get_value(i - 1), fill, "w={} left of {}", w, i);
                    }
                    if i + 1 < len {
                        assert_eq!(pa.get_value(i + 1), fill, "w={} right of {}", w, i);
                    }
                    pa.set_value(i, fill);
                }
            }
        }
    }

    #[test]
    fn signed_channel_keeps_complement_marks() {
        let mut pa = PackedArray::new_signed(8, Width::Max(5_047_149_424)).unwrap();
        pa.set_signed(0, 7);
        pa.set_signed(1, -7);
        pa.set_signed(2, !5_047_149_423);
        pa.set_signed(3, 5_047_149_423);
        pa.set_signed(4, !0);
        assert_eq!(pa.get_signed(0), 7);
        assert_eq!(pa.get_signed(1), -7);
        assert_eq!(pa.get_signed(2), !5_047_149_423);
        assert_eq!(pa.get_signed(3), 5_047_149_423);
        assert_eq!(pa.get_signed(4), -1);
        assert_eq!(!pa.get_signed(4), 0);
        pa.set_signed(1, 3);
        assert_eq!(pa.get_signed(1), 3);
    }

    #[test]
    fn signed_bits_are_independent_per_element() {
        let mut pa = PackedArray::new_signed(200, Width::Bits(9)).unwrap();
        for i in 0..200 {
            let v = (i as i64 % 255) * if i % 3 == 0 { -1 } else { 1 };
            pa.set_signed(i, v);
        }
        for i in 0..200 {
            let v = (i as i64 % 255) * if i % 3 == 0 { -1 } else { 1 };
            assert_eq!(pa.get_signed(i), v, "i={}", i);
        }
    }

    #[test]
    fn reallocate_shrinks_then_grows_with_zeros() {
        for w in [3u8, 17, 33, 64] {
            let vals = make_values(100, w, 99);
            let mut pa = PackedArray::new(100, Width::Bits(w)).unwrap();
            for (i, &v) in vals.iter().enumerate() {
                pa.set_value(i, v);
            }
            pa.reallocate(37).unwrap();
            assert_eq!(pa.len(), 37);
            for i in 0..37 {
                assert_eq!(pa.get_value(i), vals[i]);
            }
            pa.reallocate(90).unwrap();
            for i in 0..37 {
                assert_eq!(pa.get_value(i), vals[i]);
            }
            for i in 37..90 {
                assert_eq!(pa.get_value(i), 0, "w={} stale bits at {}", w, i);
            }
        }
    }

    #[test]
    fn reallocate_releases_memory() {
        let mut pa = PackedArray::new_signed(10_000, Width::Bits(20)).unwrap();
        let before = pa.heap_bytes();
        pa.reallocate(100).unwrap();
        assert!(pa.heap_bytes() < before);
        assert_eq!(pa.get_signed(99), 0);
    }

    #[test]
    fn from_slice_and_iter() {
        let pa = PackedArray::from_slice(&[3, 0, 9, 1]).unwrap();
        assert_eq!(pa.width(), 4);
        assert_eq!(pa.to_vec(), vec![3, 0, 9, 1]);
        assert_eq!(format!("{:?}", pa), "[3, 0, 9, 1]");
        let empty = PackedArray::from_slice(&[]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn into_unsigned_keeps_magnitudes() {
        let mut pa = PackedArray::new_signed(5, Width::Bits(4)).unwrap();
        pa.set_signed(2, 7);
        pa.set_signed(3, 0);
        let pa = pa.into_unsigned();
        assert!(!pa.is_signed());
        assert_eq!(pa.to_vec(), vec![0, 0, 7, 0, 0]);
    }
}
