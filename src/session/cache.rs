// src/session/cache.rs
//! Read cache for engine-held properties
//!
//! Getters read the cached value. Setters only mark the property pending;
//! the value itself changes when the engine confirms it.

use crate::enums::CipherAlgorithm;
use crate::session::protocol::DatabaseProperties;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cached<T> {
    value: T,
    pending: usize,
}

impl<T: Copy + PartialEq> Cached<T> {
    pub fn new(value: T) -> Self {
        Self { value, pending: 0 }
    }

    pub fn get(&self) -> T {
        self.value
    }

    /// At least one change has been requested and not yet answered
    pub fn is_pending(&self) -> bool {
        self.pending > 0
    }

    pub fn request(&mut self) {
        self.pending += 1;
    }

    /// Engine confirmed a requested change; true if the value differs
    pub fn confirm(&mut self, value: T) -> bool {
        self.pending = self.pending.saturating_sub(1);
        self.observe(value)
    }

    /// Engine rejected a requested change
    pub fn reject(&mut self) {
        self.pending = self.pending.saturating_sub(1);
    }

    /// Value reported without a request (open/create or unsolicited); true if it differs
    pub fn observe(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }

    /// Drops pending marks and sets `value` without reporting a change
    pub fn reset(&mut self, value: T) {
        self.value = value;
        self.pending = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyCache {
    pub key_derivation_rounds: Cached<u64>,
    pub cipher_algorithm: Cached<CipherAlgorithm>,
}

impl PropertyCache {
    pub fn new(key_derivation_rounds: u64, cipher_algorithm: CipherAlgorithm) -> Self {
        Self {
            key_derivation_rounds: Cached::new(key_derivation_rounds),
            cipher_algorithm: Cached::new(cipher_algorithm),
        }
    }

    pub fn reset(&mut self, key_derivation_rounds: u64, cipher_algorithm: CipherAlgorithm) {
        self.key_derivation_rounds.reset(key_derivation_rounds);
        self.cipher_algorithm.reset(cipher_algorithm);
    }

    /// Returns which of (rounds, cipher) changed
    pub fn observe(&mut self, properties: &DatabaseProperties) -> (bool, bool) {
        (
            self.key_derivation_rounds
                .observe(properties.key_derivation_rounds),
            self.cipher_algorithm.observe(properties.cipher_algorithm),
        )
    }
}
