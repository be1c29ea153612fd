//! 版本字符串

/// SDK 版本（来自 crate 版本号）
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// 把字符串复制到定长缓冲区，超长时截断
///
/// 只要 `dst` 非空，结果总以 NUL 结尾。返回写入的字节数（不含 NUL）。
/// 截断按字节进行，不保证落在 UTF-8 字符边界上。
pub fn copy_nul_terminated(src: &str, dst: &mut [u8]) -> usize {
    let Some(room) = dst.len().checked_sub(1) else {
        return 0;
    };
    let n = src.len().min(room);
    dst[..n].copy_from_slice(&src.as_bytes()[..n]);
    dst[n] = 0;
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_fits() {
        let mut buf = [0xFFu8; 8];
        assert_eq!(copy_nul_terminated("1.2.3", &mut buf), 5);
        assert_eq!(&buf[..6], b"1.2.3\0");
    }

    #[test]
    fn test_copy_truncates() {
        let mut buf = [0xFFu8; 4];
        assert_eq!(copy_nul_terminated("1.2.3.4", &mut buf), 3);
        assert_eq!(&buf, b"1.2\0");
    }

    #[test]
    fn test_copy_degenerate_buffers() {
        assert_eq!(copy_nul_terminated("abc", &mut []), 0);
        let mut one = [0xFFu8; 1];
        assert_eq!(copy_nul_terminated("abc", &mut one), 0);
        assert_eq!(one, [0]);
    }

    #[test]
    fn test_sdk_version_is_semver_like() {
        assert_eq!(SDK_VERSION.split('.').count(), 3);
    }
}
