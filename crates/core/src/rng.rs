//! RNG module - seeded piece selection
//!
//! Every spawn picks one of the seven kinds uniformly at random. A small LCG keeps
//! the sequence deterministic per seed, which the tests and benches rely on.

use crate::types::PieceKind;

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    ///
    /// Uses the high bits; the low bits of a power-of-two LCG cycle quickly.
    pub fn next_range(&mut self, max: u32) -> u32 {
        (self.next_u32() >> 16) % max
    }
}

/// Uniform piece generator with a one-piece lookahead
#[derive(Debug, Clone)]
pub struct PieceQueue {
    next: PieceKind,
    rng: SimpleRng,
}

impl PieceQueue {
    /// Create a new piece queue with the given seed
    pub fn new(seed: u32) -> Self {
        let mut rng = SimpleRng::new(seed);
        let next = Self::roll(&mut rng);
        Self { next, rng }
    }

    fn roll(rng: &mut SimpleRng) -> PieceKind {
        PieceKind::ALL[rng.next_range(PieceKind::ALL.len() as u32) as usize]
    }

    /// Peek at the next piece without removing it
    pub fn peek(&self) -> PieceKind {
        self.next
    }

    /// Draw the next piece from the queue
    pub fn draw(&mut self) -> PieceKind {
        let piece = self.next;
        self.next = Self::roll(&mut self.rng);
        piece
    }
}

impl Default for PieceQueue {
    fn default() -> Self {
        Self::new(1)
    }
}
