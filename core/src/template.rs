use chrono::NaiveDate;
use thiserror::Error;

/// Placeholder token replaced with `YYYYMMDD-<commit>` on expansion.
pub const PLACEHOLDER: &str = "$$";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("asset name template `{template}` is missing the `$$` placeholder")]
    MissingPlaceholder { template: String },
    #[error("asset name template `{template}` contains more than one `$$` placeholder")]
    RepeatedPlaceholder { template: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("commit id `{sha}` is shorter than {} characters", ShortCommit::LEN)]
    TooShort { sha: String },
    #[error("commit id `{sha}` is not a hex string")]
    NotHex { sha: String },
}

/// An asset name template split around its single `$$` placeholder.
///
/// A template without the placeholder (or with several) is rejected here,
/// before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNameTemplate {
    prefix: String,
    suffix: String,
}

impl AssetNameTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let Some(at) = template.find(PLACEHOLDER) else {
            return Err(TemplateError::MissingPlaceholder {
                template: template.to_string(),
            });
        };
        let prefix = &template[..at];
        let suffix = &template[at + PLACEHOLDER.len()..];
        if suffix.contains(PLACEHOLDER) {
            return Err(TemplateError::RepeatedPlaceholder {
                template: template.to_string(),
            });
        }
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Expand the placeholder for the given date and commit.
    ///
    /// Pure: the same (template, date, commit) triple always yields the same
    /// name, which is what makes rerun detection possible at all.
    pub fn qualified_name(&self, date: NaiveDate, commit: &ShortCommit) -> String {
        format!(
            "{}{}-{}{}",
            self.prefix,
            date.format("%Y%m%d"),
            commit.as_str(),
            self.suffix
        )
    }
}

/// A commit id truncated to its first [`ShortCommit::LEN`] characters,
/// lowercased. This is the form embedded in qualified asset names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortCommit(String);

impl ShortCommit {
    pub const LEN: usize = 6;

    pub fn parse(sha: &str) -> Result<Self, CommitError> {
        let sha = sha.trim();
        let Some(short) = sha.get(..Self::LEN) else {
            return Err(CommitError::TooShort {
                sha: sha.to_string(),
            });
        };
        if !short.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CommitError::NotHex {
                sha: sha.to_string(),
            });
        }
        Ok(Self(short.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
