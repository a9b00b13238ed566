//! FHE Tetris (workspace facade crate).
//!
//! Re-exports the workspace crates as `fhe_tetris::{core,input,ledger,term,types}` so the
//! binary, the integration tests and the benches share one import path.

pub use fhe_tetris_core as core;
pub use fhe_tetris_input as input;
pub use fhe_tetris_ledger as ledger;
pub use fhe_tetris_term as term;
pub use fhe_tetris_types as types;
