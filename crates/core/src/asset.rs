use std::fmt;

use thiserror::Error;

use crate::keys::PublicKey;

const MAX_CODE_LEN: usize = 12;

/// Issued asset identified by its code and issuing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    code: String,
    issuer: PublicKey,
}

impl Asset {
    /// Validates the code (1-12 ASCII alphanumerics) and binds it to the issuer.
    pub fn new(code: impl Into<String>, issuer: PublicKey) -> Result<Self, AssetError> {
        let code = code.into();
        if code.is_empty() || code.len() > MAX_CODE_LEN {
            return Err(AssetError::CodeLength(code));
        }
        if !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(AssetError::CodeCharacters(code));
        }
        Ok(Self { code, issuer })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn issuer(&self) -> PublicKey {
        self.issuer
    }

    pub fn kind(&self) -> AssetKind {
        if self.code.len() <= 4 {
            AssetKind::CreditAlphanum4
        } else {
            AssetKind::CreditAlphanum12
        }
    }

    /// Returns `true` when a Horizon balance line describes this asset.
    pub fn matches(&self, code: &str, issuer: &str) -> bool {
        self.code == code && self.issuer.account_id() == issuer
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.code, self.issuer)
    }
}

/// Ledger encoding width of an asset code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    CreditAlphanum4,
    CreditAlphanum12,
}

impl AssetKind {
    /// XDR `AssetType` discriminant.
    pub fn discriminant(self) -> i32 {
        match self {
            Self::CreditAlphanum4 => 1,
            Self::CreditAlphanum12 => 2,
        }
    }

    pub fn code_width(self) -> usize {
        match self {
            Self::CreditAlphanum4 => 4,
            Self::CreditAlphanum12 => 12,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("asset code '{0}' must be between 1 and 12 characters")]
    CodeLength(String),
    #[error("asset code '{0}' must contain only ASCII letters and digits")]
    CodeCharacters(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> PublicKey {
        PublicKey::from_bytes([7u8; 32])
    }

    #[test]
    fn short_codes_use_alphanum4() {
        let asset = Asset::new("FXR", issuer()).expect("valid code");
        assert_eq!(asset.kind(), AssetKind::CreditAlphanum4);
    }

    #[test]
    fn long_codes_use_alphanum12() {
        let asset = Asset::new("FUTUREX", issuer()).expect("valid code");
        assert_eq!(asset.kind(), AssetKind::CreditAlphanum12);
        assert_eq!(asset.kind().code_width(), 12);
    }

    #[test]
    fn rejects_invalid_codes() {
        assert_eq!(
            Asset::new("", issuer()),
            Err(AssetError::CodeLength(String::new()))
        );
        assert_eq!(
            Asset::new("ABCDEFGHIJKLM", issuer()),
            Err(AssetError::CodeLength("ABCDEFGHIJKLM".into()))
        );
        assert_eq!(
            Asset::new("FX-R", issuer()),
            Err(AssetError::CodeCharacters("FX-R".into()))
        );
    }

    #[test]
    fn matches_balance_lines_by_code_and_issuer() {
        let asset = Asset::new("FXR", issuer()).expect("valid code");
        let issuer_id = issuer().account_id();
        assert!(asset.matches("FXR", &issuer_id));
        assert!(!asset.matches("FXR2", &issuer_id));
        assert!(!asset.matches("FXR", "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF"));
    }
}
