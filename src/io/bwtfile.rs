//! BWT 文件格式：8 字节大端 `last`，随后是 n 个 BWT 字节（不含终止符）。

use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use crate::error::{BwtError, Result};

pub fn write_bwt<W: Write>(w: &mut W, bwt: &[u8], last: u64) -> Result<()> {
    w.write_all(&last.to_be_bytes())?;
    w.write_all(bwt)?;
    Ok(())
}

/// 读取并校验：正文非空且 `last` 在 `[1, n]` 内
pub fn read_bwt<R: Read>(r: &mut R) -> Result<(Vec<u8>, u64)> {
    let mut head = [0u8; 8];
    if let Err(e) = r.read_exact(&mut head) {
        return Err(if e.kind() == ErrorKind::UnexpectedEof {
            BwtError::Format("shorter than the 8-byte header".into())
        } else {
            BwtError::Io(e)
        });
    }
    let last = u64::from_be_bytes(head);
    let mut bwt = Vec::new();
    r.read_to_end(&mut bwt)?;
    if bwt.is_empty() {
        return Err(BwtError::Format("no bwt bytes after the header".into()));
    }
    if last == 0 || last > bwt.len() as u64 {
        return Err(BwtError::Format(format!("last = {} outside [1, {}]", last, bwt.len())));
    }
    Ok((bwt, last))
}

pub fn save_to_file(path: impl AsRef<Path>, bwt: &[u8], last: u64) -> Result<()> {
    let mut w = BufWriter::new(std::fs::File::create(path)?);
    write_bwt(&mut w, bwt, last)?;
    w.flush()?;
    Ok(())
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<(Vec<u8>, u64)> {
    let mut r = BufReader::new(std::fs::File::open(path)?);
    read_bwt(&mut r)
}
