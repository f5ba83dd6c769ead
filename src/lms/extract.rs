use log::debug;

use crate::config::TransformOpt;
use crate::error::{BwtError, Result};
use crate::lms::container::{Container, Freq};
use crate::lms::interner::SubstringInterner;
use crate::lms::{CharType, LmsScan};
use crate::util::bits::alphabet_size;

/// 从右向左扫描一遍：统计频次、提取每个 LMS 子串并送入去重表。
///
/// `k` 为字母表大小，传 `None` 时现场统计。
pub fn extract_lms_strings<'t>(text: &'t [u8], k: Option<u32>, opt: &TransformOpt) -> Result<Container<'t>> {
    let n = text.len();
    if n == 0 {
        return Err(BwtError::InvalidInput("empty input".into()));
    }
    let k = match k {
        Some(0) => return Err(BwtError::InvalidInput("alphabet size must be positive".into())),
        Some(k) if k > 256 => return Err(BwtError::InvalidInput(format!("alphabet size {} exceeds 256", k))),
        Some(k) => k,
        None => alphabet_size(text),
    };

    let mut interner = SubstringInterner::new(text, k, opt.table_size_for(n), opt.arena_increment)?;
    let mut freq = Freq::new();
    let mut num_substrings = 0usize;
    let mut num_unique = 0usize;

    let mut scan = LmsScan::new(text);
    for step in scan.by_ref() {
        let c = text[step.pos] as usize;
        freq.total[c] += 1;
        if step.ty == CharType::L {
            freq.l_type[c] += 1;
        }
        if let Some(span) = step.closed {
            freq.lms[text[span.start] as usize] += 1;
            num_substrings += 1;
            if interner.insert(span.start, span.len())?.is_new {
                num_unique += 1;
            }
        }
    }
    let head_end = scan.boundary();

    debug!(
        "extract: n={} k={} lms={} unique={} head_end={} ss_limit={}",
        n,
        k,
        num_substrings,
        num_unique,
        head_end,
        interner.ss_limit()
    );

    Ok(Container { n, k, freq, num_substrings, num_unique, head_end, interner })
}
