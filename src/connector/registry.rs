//! Registry of attempts that may still report an outcome.
//!
//! An entry lives from the moment its attempt starts until the attempt's
//! outcome is handled (current or stale), or until it is closed before
//! resolving.

use std::collections::HashMap;
use std::sync::Arc;

use crate::connector::token::ConnectToken;
use crate::net::attempt::ConnectionAttempt;

#[derive(Debug)]
pub(crate) struct AttemptRegistry<T> {
    attempts: HashMap<ConnectToken, Arc<ConnectionAttempt<T>>>,
}

impl<T> AttemptRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            attempts: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, token: ConnectToken, attempt: Arc<ConnectionAttempt<T>>) {
        self.attempts.insert(token, attempt);
    }

    pub(crate) fn remove(&mut self, token: ConnectToken) -> Option<Arc<ConnectionAttempt<T>>> {
        self.attempts.remove(&token)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, token: ConnectToken) -> bool {
        self.attempts.contains_key(&token)
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Arc<ConnectionAttempt<T>>> + '_ {
        self.attempts.drain().map(|(_, attempt)| attempt)
    }

    pub(crate) fn len(&self) -> usize {
        self.attempts.len()
    }
}
