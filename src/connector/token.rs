//! Connect tokens.
//!
//! Every attempt carries the token minted for it. The connector keeps exactly
//! one current token; an outcome carrying any other token belongs to a
//! superseded attempt.

use std::fmt;

/// Identity of one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectToken(u64);

impl ConnectToken {
    /// Sentinel that matches no attempt.
    pub const NONE: ConnectToken = ConnectToken(0);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for ConnectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ct-{}", self.0)
    }
}

/// Per-connector token source. Never yields `ConnectToken::NONE` and never
/// repeats a value.
#[derive(Debug)]
pub(crate) struct TokenMint {
    next: u64,
}

impl TokenMint {
    pub(crate) fn new() -> Self {
        Self { next: 1 }
    }

    pub(crate) fn mint(&mut self) -> ConnectToken {
        let token = ConnectToken(self.next);
        self.next += 1;
        token
    }
}
