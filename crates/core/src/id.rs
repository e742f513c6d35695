// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types shared by master and worker.

pub use smol_str::SmolStr;

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Random suffix used by [`define_id!`](crate::define_id) identifiers.
pub fn random_suffix() -> String {
    nanoid::nanoid!(19)
}

crate::define_id! {
    /// Identity of one master↔worker connection.
    ///
    /// Minted by the master when a worker connects; every registry entry the
    /// master keeps for that worker dies with it.
    pub struct ConnectionId("conn-");
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
