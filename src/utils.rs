use byteorder::{ByteOrder, LittleEndian};
use indicatif::ProgressStyle;

use crate::error::{Result, SearchError};

/// 默认返回的结果数量
pub const DEFAULT_LIMIT: usize = 8;
/// 单次搜索允许返回的最多结果数量
pub const MAX_LIMIT: usize = 20;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// 检查结果数量是否在 `1..=20` 范围内
pub fn check_limit(k: usize) -> Result<usize> {
    if !(1..=MAX_LIMIT).contains(&k) {
        return Err(SearchError::InvalidArgument(format!("结果数量必须在 1 到 {MAX_LIMIT} 之间，实际为 {k}")));
    }
    Ok(k)
}

/// 将向量编码为小端序 f32 字节序列
pub fn encode_vector(v: &[f32]) -> Vec<u8> {
    let mut buf = vec![0u8; v.len() * 4];
    LittleEndian::write_f32_into(v, &mut buf);
    buf
}

/// 从小端序 f32 字节序列解码向量
pub fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(SearchError::Corrupted(format!("向量数据长度 {} 不是 4 的倍数", bytes.len())));
    }
    let mut v = vec![0f32; bytes.len() / 4];
    LittleEndian::read_f32_into(bytes, &mut v);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_codec() {
        let v = vec![1.5f32, -2.25, 0., f32::MIN_POSITIVE];
        let bytes = encode_vector(&v);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..4], &1.5f32.to_le_bytes());
        assert_eq!(decode_vector(&bytes).unwrap(), v);
        assert!(matches!(decode_vector(&bytes[..5]), Err(SearchError::Corrupted(_))));
    }

    #[test]
    fn test_check_limit() {
        assert_eq!(check_limit(1).unwrap(), 1);
        assert_eq!(check_limit(20).unwrap(), 20);
        assert!(matches!(check_limit(0), Err(SearchError::InvalidArgument(_))));
        assert!(matches!(check_limit(21), Err(SearchError::InvalidArgument(_))));
    }
}
