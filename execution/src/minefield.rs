//! Hidden mine layouts.
//!
//! Layouts are drawn from a cryptographically secure source so that nothing a client can observe
//! (session id, timestamps, mine count) lets it reconstruct where the mines are.

use minestake_types::mines::Coordinate;
use rand::{seq::index, CryptoRng, Rng};
use std::collections::BTreeSet;

use crate::{Error, Result};

/// Place `mine_count` mines uniformly at random, without replacement, on a square board with
/// `side` cells per row.
///
/// At least one cell must stay free, so `1 <= mine_count < side * side`.
pub fn generate<R: Rng + CryptoRng>(
    rng: &mut R,
    side: u8,
    mine_count: u8,
) -> Result<BTreeSet<Coordinate>> {
    let cells = side as usize * side as usize;
    let mines = mine_count as usize;
    if mines == 0 || mines >= cells {
        return Err(Error::InvalidParameter(format!(
            "mine count must be between 1 and {} on a {side}x{side} board",
            cells.saturating_sub(1)
        )));
    }

    Ok(index::sample(rng, cells, mines)
        .into_iter()
        .map(|cell| Coordinate::from_index(cell, side))
        .collect())
}
