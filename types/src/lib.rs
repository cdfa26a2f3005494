//! Records and wire messages shared by the minestake engine and its HTTP backend.

pub mod api;
pub mod mines;
