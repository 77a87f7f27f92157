//! Multivariate polynomial expansion for symbolic equality.
//!
//! Two expressions are symbolically equal when both expand to polynomials
//! and every coefficient of their difference vanishes. Expressions outside
//! the polynomial fragment (trig, logs, symbolic exponents) decline to
//! expand and fall through to numeric sampling instead.

use std::collections::BTreeMap;

use crate::parser::Expr;

/// Coefficient below which a term is treated as zero.
const COEFF_EPSILON: f64 = 1e-9;

/// Largest integer exponent we will expand. Anything bigger is handled
/// numerically.
const MAX_EXPAND_POW: f64 = 32.0;

/// A monomial: symbol name to exponent, exponent-zero entries removed.
type Monomial = BTreeMap<String, u32>;

/// Sparse multivariate polynomial in expanded form.
#[derive(Debug, Clone, PartialEq)]
pub struct Poly {
    terms: BTreeMap<Monomial, f64>,
}

impl Poly {
    fn zero() -> Self {
        Self {
            terms: BTreeMap::new(),
        }
    }

    fn constant(value: f64) -> Self {
        let mut p = Self::zero();
        if value.abs() >= COEFF_EPSILON {
            p.terms.insert(Monomial::new(), value);
        }
        p
    }

    fn symbol(name: &str) -> Self {
        let mut p = Self::zero();
        p.terms
            .insert(BTreeMap::from([(name.to_string(), 1)]), 1.0);
        p
    }

    fn add_term(&mut self, monomial: Monomial, coeff: f64) {
        let entry = self.terms.entry(monomial).or_insert(0.0);
        *entry += coeff;
        if entry.abs() < COEFF_EPSILON {
            // Remove cancelled terms so equality is a plain comparison.
            let key: Vec<_> = self
                .terms
                .iter()
                .filter(|(_, c)| c.abs() < COEFF_EPSILON)
                .map(|(m, _)| m.clone())
                .collect();
            for k in key {
                self.terms.remove(&k);
            }
        }
    }

    fn add(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (m, c) in &other.terms {
            out.add_term(m.clone(), *c);
        }
        out
    }

    fn neg(&self) -> Poly {
        Poly {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), -c)).collect(),
        }
    }

    fn sub(&self, other: &Poly) -> Poly {
        self.add(&other.neg())
    }

    fn mul(&self, other: &Poly) -> Poly {
        let mut out = Poly::zero();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                let mut m = ma.clone();
                for (name, exp) in mb {
                    *m.entry(name.clone()).or_insert(0) += exp;
                }
                out.add_term(m, ca * cb);
            }
        }
        out
    }

    fn pow(&self, exp: u32) -> Poly {
        let mut out = Poly::constant(1.0);
        for _ in 0..exp {
            out = out.mul(self);
        }
        out
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Expand an expression into a polynomial, or decline.
pub fn expand(expr: &Expr) -> Option<Poly> {
    // A closed subtree folds to a numeric constant regardless of shape.
    if expr.free_symbols().is_empty() {
        return expr.eval_constant().map(Poly::constant);
    }

    match expr {
        Expr::Number(n) => Some(Poly::constant(*n)),
        Expr::Symbol(name) => Some(Poly::symbol(name)),
        Expr::Add(a, b) => Some(expand(a)?.add(&expand(b)?)),
        Expr::Sub(a, b) => Some(expand(a)?.sub(&expand(b)?)),
        Expr::Mul(a, b) => Some(expand(a)?.mul(&expand(b)?)),
        Expr::Neg(a) => Some(expand(a)?.neg()),
        Expr::Div(a, b) => {
            // Division only by a nonzero constant.
            if !b.free_symbols().is_empty() {
                return None;
            }
            let denom = b.eval_constant()?;
            if denom.abs() < COEFF_EPSILON {
                return None;
            }
            Some(expand(a)?.mul(&Poly::constant(1.0 / denom)))
        }
        Expr::Pow(base, exp) => {
            if !exp.free_symbols().is_empty() {
                return None;
            }
            let e = exp.eval_constant()?;
            if e.fract() != 0.0 || e < 0.0 || e > MAX_EXPAND_POW {
                return None;
            }
            Some(expand(base)?.pow(e as u32))
        }
        Expr::Call(_, _) => None,
    }
}

/// Whether two expressions are provably equal by polynomial expansion.
pub fn symbolic_equal(a: &Expr, b: &Expr) -> bool {
    match (expand(a), expand(b)) {
        (Some(pa), Some(pb)) => pa.sub(&pb).is_zero(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn equal(a: &str, b: &str) -> bool {
        symbolic_equal(&parse(a).unwrap(), &parse(b).unwrap())
    }

    #[test]
    fn binomial_square_expands() {
        assert!(equal("(x + 1)^2", "x^2 + 2x + 1"));
    }

    #[test]
    fn collected_terms_match() {
        assert!(equal("x + x", "2x"));
        assert!(equal("x*y + y*x", "2 x y"));
    }

    #[test]
    fn constants_fold() {
        assert!(equal("2 + 2", "4"));
        assert!(equal("(1)/(2)", "0.5"));
        assert!(equal("sqrt(4) x", "2x"));
    }

    #[test]
    fn distinct_polynomials_differ() {
        assert!(!equal("x^2", "x^2 + 1"));
        assert!(!equal("x + y", "x - y"));
    }

    #[test]
    fn division_by_constant() {
        assert!(equal("(2x + 4) / 2", "x + 2"));
    }

    #[test]
    fn non_polynomial_declines() {
        assert!(expand(&parse("sin(x)").unwrap()).is_none());
        assert!(expand(&parse("1/x").unwrap()).is_none());
        assert!(expand(&parse("2^x").unwrap()).is_none());
        assert!(!equal("sin(x)", "sin(x)"));
    }

    #[test]
    fn equation_difference_vanishes() {
        // y = x + 1 vs y - x = 1, both as lhs - rhs.
        assert!(equal("y = x + 1", "y - x = 1"));
    }

    #[test]
    fn cancellation_prunes_terms() {
        let p = expand(&parse("x - x + 3").unwrap()).unwrap();
        assert_eq!(p, Poly::constant(3.0));
    }
}
