//! Normal-form simplification.
//!
//! An expression is viewed as a rational function of its *kernels*: symbols,
//! `sin(...)`, `f(x, y)`, `x^(1/2)` and every other part that is not a sum,
//! product, integer power or number. Kernel arguments are simplified first
//! and integer multiples of an angle inside `sin`/`cos` are expanded through
//! the addition formulas. Then `cos(a)^n` with `|n| >= 2` is rewritten with
//! `1 - sin(a)^2` and the whole expression is put over a common denominator,
//! until neither step changes it. The result is zero exactly when the input
//! is identically zero over the field generated by the kernels, modulo the
//! Pythagorean identity.

use symbolica::atom::{Atom, AtomCore, AtomView, FunctionBuilder, Symbol};
use symbolica::coefficient::CoefficientView;
use tracing::trace;

use crate::error::{SymbolicError, SymbolicResult};
use crate::expr::Expr;

const MAX_PASSES: usize = 8;

impl Expr {
    /// Simplify to a canonical rational normal form.
    ///
    /// Fails only when the expression divides by something that simplifies
    /// to zero.
    pub fn simplify(&self) -> SymbolicResult<Expr> {
        if matches!(self.view(), AtomView::Num(_) | AtomView::Var(_)) {
            ensure_finite(&self.0)?;
            return Ok(self.clone());
        }
        normal_form(&self.0).map(Expr)
    }

    /// True when the expression simplifies to zero.
    pub fn is_identically_zero(&self) -> SymbolicResult<bool> {
        Ok(self.simplify()?.is_zero())
    }
}

fn ensure_finite(a: &Atom) -> SymbolicResult<()> {
    if a.is_finite() {
        Ok(())
    } else {
        Err(SymbolicError::division_by_zero("simplifying an expression"))
    }
}

fn normal_form(a: &Atom) -> SymbolicResult<Atom> {
    let mut current = expand_kernels(a)?;
    ensure_finite(&current)?;
    for pass in 0..MAX_PASSES {
        let reduced = reduce_cosine_powers(&current);
        ensure_finite(&reduced)?;
        let next = reduced.together();
        ensure_finite(&next)?;
        if next == current {
            trace!(pass, "reached normal form");
            return Ok(next);
        }
        current = next;
    }
    Ok(current)
}

fn expand_kernels(a: &Atom) -> SymbolicResult<Atom> {
    let mut failure = None;
    let out = a.replace_map(|view, _ctx, out| {
        if failure.is_some() {
            return;
        }
        match rewrite_kernel(view) {
            Ok(Some(atom)) => **out = atom,
            Ok(None) => {}
            Err(e) => failure = Some(e),
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(out),
    }
}

fn rewrite_kernel(view: AtomView<'_>) -> SymbolicResult<Option<Atom>> {
    match view {
        AtomView::Fun(f) => {
            let args = f
                .iter()
                .map(|arg| normal_form(&arg.to_owned()))
                .collect::<SymbolicResult<Vec<_>>>()?;
            let symbol = f.get_symbol();
            if args.len() == 1 && (symbol == Symbol::SIN || symbol == Symbol::COS) {
                if let Some((k, angle)) = integer_multiple(&args[0]) {
                    let (sin, cos) = multiple_angle(&angle, k.unsigned_abs());
                    let value = match (symbol == Symbol::SIN, k < 0) {
                        (true, true) => -sin,
                        (true, false) => sin,
                        (false, _) => cos,
                    };
                    return Ok(Some(value));
                }
            }
            let rebuilt = args
                .iter()
                .fold(FunctionBuilder::new(symbol), |b, arg| b.add_arg(arg))
                .finish();
            Ok(Some(rebuilt))
        }
        AtomView::Pow(p) => {
            let (base, exp) = p.get_base_exp();
            if integer_value(exp).is_some() {
                return Ok(None);
            }
            let base = normal_form(&base.to_owned())?;
            let exp = normal_form(&exp.to_owned())?;
            Ok(Some(base.pow(&exp)))
        }
        _ => Ok(None),
    }
}

fn integer_value(view: AtomView<'_>) -> Option<i64> {
    match view {
        AtomView::Num(n) => match n.get_coeff_view() {
            CoefficientView::Natural(num, 1, 0, _) => Some(num),
            _ => None,
        },
        _ => None,
    }
}

/// `k * angle` for an argument with an integer coefficient other than one.
fn integer_multiple(arg: &Atom) -> Option<(i64, Atom)> {
    let AtomView::Mul(m) = arg.as_view() else {
        return None;
    };
    let k = m.iter().find_map(integer_value)?;
    if k == 1 || k == 0 {
        return None;
    }
    Some((k, arg / k))
}

/// `(sin(k a), cos(k a))` as polynomials in `sin(a)` and `cos(a)`.
fn multiple_angle(angle: &Atom, k: u64) -> (Atom, Atom) {
    let (s1, c1) = (angle.sin(), angle.cos());
    let (mut sin, mut cos) = (s1.clone(), c1.clone());
    for _ in 1..k {
        let next_sin = (&sin * &c1 + &cos * &s1).expand();
        let next_cos = (&cos * &c1 - &sin * &s1).expand();
        sin = next_sin;
        cos = next_cos;
    }
    (sin, cos)
}

/// `cos(a)^n = cos(a)^(n % 2) * (1 - sin(a)^2)^(n / 2)` for `|n| >= 2`.
fn reduce_cosine_powers(a: &Atom) -> Atom {
    a.replace_map(|view, _ctx, out| {
        let AtomView::Pow(p) = view else {
            return;
        };
        let (base, exp) = p.get_base_exp();
        let AtomView::Fun(f) = base else {
            return;
        };
        if f.get_symbol() != Symbol::COS || f.get_nargs() != 1 {
            return;
        }
        let Some(n) = integer_value(exp).filter(|n| n.abs() >= 2) else {
            return;
        };
        let Some(angle) = f.iter().next() else {
            return;
        };
        let sin_squared = angle.to_owned().sin().pow(2);
        **out = (Atom::num(1) - sin_squared).pow(n / 2) * base.to_owned().pow(n % 2);
    })
}
