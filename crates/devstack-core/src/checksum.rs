//! SHA-256 checksums for downloaded artifacts.
//!
//! Checksums are written as `sha256:<lowercase-hex>`. Any other algorithm
//! prefix is a format error, never a silent pass.

use crate::error::{Result, StackError};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Prefix every accepted checksum string starts with.
pub const SHA256_PREFIX: &str = "sha256:";

/// Chunk size for reading files (1MB).
const CHUNK_SIZE: usize = 1024 * 1024;

/// Extract the hex digest from a `sha256:<hex>` string. Uppercase hex is
/// rejected.
pub fn parse_checksum(expected: &str) -> Result<&str> {
    let digest = expected
        .strip_prefix(SHA256_PREFIX)
        .ok_or_else(|| StackError::ChecksumFormat {
            value: expected.to_string(),
        })?;

    if digest.len() != 64
        || !digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    {
        return Err(StackError::ChecksumFormat {
            value: expected.to_string(),
        });
    }
    Ok(digest)
}

/// Compute the SHA-256 of a file as lowercase hex.
pub fn sha256_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| StackError::io_with_path(e, path))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| StackError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the checksum string of in-memory bytes.
pub fn sha256_checksum(bytes: &[u8]) -> String {
    format!("{}{}", SHA256_PREFIX, hex::encode(Sha256::digest(bytes)))
}

/// Verify a file against an expected `sha256:<hex>` checksum.
///
/// The format is validated before the file is read, so a malformed checksum
/// fails the same way whatever the file contains.
pub fn verify_checksum(path: impl AsRef<Path>, expected: &str) -> Result<()> {
    let expected_digest = parse_checksum(expected)?;
    let actual_digest = sha256_file(path)?;

    if actual_digest != expected_digest {
        return Err(StackError::ChecksumMismatch {
            expected: expected.to_string(),
            actual: format!("{}{}", SHA256_PREFIX, actual_digest),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // sha256("hello world")
    const HELLO: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn write(dir: &TempDir, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join("artifact.tar.gz");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_matching_checksum_verifies() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, b"hello world");
        verify_checksum(&path, &format!("sha256:{}", HELLO)).unwrap();
        assert_eq!(sha256_checksum(b"hello world"), format!("sha256:{}", HELLO));
    }

    #[test]
    fn test_single_byte_mutation_is_a_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, b"hello worle");
        match verify_checksum(&path, &format!("sha256:{}", HELLO)) {
            Err(StackError::ChecksumMismatch { expected, actual }) => {
                assert!(expected.ends_with(HELLO));
                assert!(actual.starts_with("sha256:"));
                assert_ne!(actual, expected);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_prefix_is_format_error_regardless_of_content() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, b"hello world");
        for value in [
            format!("md5:{}", HELLO),
            format!("SHA256:{}", HELLO),
            HELLO.to_string(),
            "sha256:".to_string(),
            "sha256:xyz".to_string(),
        ] {
            assert!(
                matches!(verify_checksum(&path, &value), Err(StackError::ChecksumFormat { .. })),
                "{} should be rejected",
                value
            );
        }
    }

    #[test]
    fn test_uppercase_digest_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, b"hello world");
        let upper = format!("sha256:{}", HELLO.to_ascii_uppercase());
        assert!(matches!(parse_checksum(&upper), Err(StackError::ChecksumFormat { .. })));
        assert!(matches!(
            verify_checksum(&path, &upper),
            Err(StackError::ChecksumFormat { .. })
        ));

        let mixed = format!("sha256:B{}", &HELLO[1..]);
        assert!(matches!(parse_checksum(&mixed), Err(StackError::ChecksumFormat { .. })));
        assert_eq!(parse_checksum(&format!("sha256:{}", HELLO)).unwrap(), HELLO);
    }

    #[test]
    fn test_format_checked_before_file_read() {
        let result = verify_checksum("/definitely/missing/file", "md5:abc");
        assert!(matches!(result, Err(StackError::ChecksumFormat { .. })));
    }
}
