//! Numeric equivalence sampling.
//!
//! When symbolic expansion cannot settle equality, both expressions are
//! evaluated over a fixed palette of sample points and the agreement
//! fraction becomes the partial-credit signal. The point generator is a
//! seeded xorshift so identical inputs always produce identical verdicts.

use std::collections::HashMap;

use crate::parser::Expr;

/// Sample values avoiding common poles and degenerate points (0, ±large).
pub const PALETTE: [f64; 11] = [
    -3.0, -2.0, -1.5, -1.0, -0.5, -0.25, 0.5, 1.0, 1.5, 2.0, 3.0,
];

/// Agreement tolerance per trial.
pub const TOLERANCE: f64 = 1e-6;

/// Most free symbols considered; extras are ignored (sorted order).
pub const MAX_SYMBOLS: usize = 3;

const SEED: u64 = 0x9E37_79B9_7F4A_7C15;

struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn pick(&mut self) -> f64 {
        PALETTE[(self.next() % PALETTE.len() as u64) as usize]
    }
}

/// Symbols that participate in sampling: the sorted union of both sides'
/// free symbols, capped at [`MAX_SYMBOLS`].
pub fn sampled_symbols(a: &Expr, b: &Expr) -> Vec<String> {
    let mut symbols = a.free_symbols();
    symbols.extend(b.free_symbols());
    symbols.into_iter().take(MAX_SYMBOLS).collect()
}

/// Fraction of sample trials where `a` and `b` agree within tolerance.
///
/// With no free symbols this is a single evaluation (1.0 or 0.0). A trial
/// where either side hits a domain error counts as disagreement.
pub fn agreement_fraction(a: &Expr, b: &Expr) -> f64 {
    let symbols = sampled_symbols(a, b);
    if symbols.is_empty() {
        return match (a.eval_constant(), b.eval_constant()) {
            (Some(va), Some(vb)) if (va - vb).abs() <= TOLERANCE => 1.0,
            _ => 0.0,
        };
    }

    let trials = if symbols.len() == 1 { 32 } else { 48 };
    let mut rng = Xorshift64::new(SEED);
    let mut agreed = 0usize;
    for _ in 0..trials {
        let assignment: HashMap<&str, f64> = symbols
            .iter()
            .map(|name| (name.as_str(), rng.pick()))
            .collect();
        let lookup = |name: &str| assignment.get(name).copied();
        if let (Some(va), Some(vb)) = (a.eval(&lookup), b.eval(&lookup)) {
            if (va - vb).abs() <= TOLERANCE {
                agreed += 1;
            }
        }
    }
    agreed as f64 / trials as f64
}
