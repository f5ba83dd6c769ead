//! 演示如何在 library 模式下使用 flbwt 计算与还原 BWT。
//!
//! 运行方式：
//! ```bash
//! cargo run --example simple_bwt
//! ```

use flbwt::index::{bwt, sa};
use flbwt::{inverse, transform_observed, PeakMemory, TransformOpt};

fn main() -> flbwt::Result<()> {
    // 1. 输入文本
    let text = b"mmississiippii$";
    println!("原文: {}", String::from_utf8_lossy(text));
    println!("长度: {} 字节", text.len());

    // 2. 诱导排序计算 BWT，同时统计各阶段内存峰值
    let mut mem = PeakMemory::default();
    let out = transform_observed(text, &TransformOpt::default(), &mut mem)?;
    println!("\nBWT: {}", String::from_utf8_lossy(&out.bwt));
    println!("last: {}", out.last);
    println!(
        "LMS 子串: {} 个（{} 个不同），SA-IS 递归深度 {}",
        out.report.num_substrings, out.report.num_unique, out.report.sais_depth
    );
    println!("登记内存峰值: {} 字节", mem.peak());

    // 3. 与完整后缀数组得到的结果对照
    let sa_arr = sa::build_sa(text)?;
    let (reference, reference_last) = bwt::bwt_from_sa(text, &sa_arr);
    println!("\n后缀数组: {:?}", sa_arr);
    println!("一致: {}", reference == out.bwt && reference_last == out.last);

    // 4. 逆变换
    let restored = inverse(&out.bwt, out.last)?;
    println!("\n还原: {}", String::from_utf8_lossy(&restored));
    Ok(())
}
