//! Content fingerprinting.
//!
//! A [`ContentDigest`] is the lowercase hex SHA-256 of a byte stream. It is
//! only ever compared for equality: the client hashes its local descriptor,
//! the server hashes its stored copy, and the descriptor is re-uploaded only
//! when the two differ.

use std::fmt;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

const READ_BUF_SIZE: usize = 8192;

/// Hex length of a SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self::finish(hasher)
    }

    /// Stream a blocking reader through the hasher.
    pub fn of_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self::finish(hasher))
    }

    /// Stream a file through the hasher without loading it into memory.
    pub async fn of_file(path: &Path) -> crate::Result<Self> {
        let fingerprint_err = |e| crate::Error::Fingerprint {
            path: path.to_path_buf(),
            source: e,
        };

        let mut file = tokio::fs::File::open(path).await.map_err(fingerprint_err)?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; READ_BUF_SIZE];
        loop {
            let n = file.read(&mut buf).await.map_err(fingerprint_err)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self::finish(hasher))
    }

    /// Parse a digest received over the wire. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, DigestParseError> {
        let trimmed = raw.trim();
        if trimmed.len() != DIGEST_HEX_LEN {
            return Err(DigestParseError::Length(trimmed.len()));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DigestParseError::NotHex);
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn finish(hasher: Sha256) -> Self {
        Self(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestParseError {
    #[error("digest has {0} characters, expected {expected}", expected = DIGEST_HEX_LEN)]
    Length(usize),

    #[error("digest is not hexadecimal")]
    NotHex,
}
