//! Board identifiers.

use std::fmt;
use std::str::FromStr;

use super::error::DomainError;

/// Name reserved for the meta-board that aggregates every board.
pub const ALL_BOARDS: &str = "all";

const MAX_BOARD_NAME_LEN: usize = 10;

/// Which board a view is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoardScope {
    /// The `/all/` meta-board spanning every board.
    All,
    /// A single named board.
    Board(String),
}

impl BoardScope {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_BOARDS,
            Self::Board(name) => name,
        }
    }
}

impl fmt::Display for BoardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardScope {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == ALL_BOARDS {
            return Ok(Self::All);
        }
        if value.is_empty() || value.len() > MAX_BOARD_NAME_LEN {
            return Err(DomainError::validation(
                "board",
                format!("name must be 1-{MAX_BOARD_NAME_LEN} characters, got `{value}`"),
            ));
        }
        if !value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Err(DomainError::validation(
                "board",
                format!("`{value}` may only contain lowercase letters and digits"),
            ));
        }
        Ok(Self::Board(value.to_string()))
    }
}
