/// Bytes sampled from the head of a file before scanning it
pub const SAMPLE_SIZE: usize = 8192;

/// Share of suspicious bytes above which a non-UTF-8 sample counts as binary
const BINARY_RATIO: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Binary,
    Text,
    Unknown,
}

/// Classifies a byte sample taken from the start of a file.
///
/// A NUL byte means binary. Valid UTF-8 (allowing a multi-byte sequence cut off
/// at the end of the sample) means text. Otherwise the share of control bytes
/// other than common whitespace decides between binary and unknown, which covers
/// legacy single-byte encodings.
pub fn classify(sample: &[u8]) -> Classification {
    if sample.is_empty() {
        return Classification::Text;
    }
    if sample.contains(&0) {
        return Classification::Binary;
    }

    match std::str::from_utf8(sample) {
        Ok(_) => return Classification::Text,
        Err(e) if e.error_len().is_none() => return Classification::Text,
        Err(_) => {}
    }

    let suspicious = sample
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\n' | b'\r' | b'\t' | 0x0c | 0x1b))
        .count();
    if suspicious as f64 / sample.len() as f64 > BINARY_RATIO {
        Classification::Binary
    } else {
        Classification::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text() {
        assert_eq!(classify(b"hello world\n"), Classification::Text);
        assert_eq!(classify("héllo".as_bytes()), Classification::Text);
        assert_eq!(classify(b""), Classification::Text);
    }

    #[test]
    fn test_truncated_utf8_is_text() {
        let bytes = "aé".as_bytes();
        assert_eq!(classify(&bytes[..2]), Classification::Text);
    }

    #[test]
    fn test_nul_is_binary() {
        assert_eq!(classify(b"ELF\0\x01\x02"), Classification::Binary);
    }

    #[test]
    fn test_control_heavy_is_binary() {
        let sample = [0x01, 0x02, 0x03, 0xff, 0x04, 0x05];
        assert_eq!(classify(&sample), Classification::Binary);
    }

    #[test]
    fn test_latin1_is_unknown() {
        // "café" in ISO-8859-1
        let sample = [b'c', b'a', b'f', 0xe9, b'\n'];
        assert_eq!(classify(&sample), Classification::Unknown);
    }
}
