//! Scalar expressions backed by symbolica atoms.
//!
//! Every constructor returns a normalized atom: sums and products are
//! flattened and sorted, like terms and like powers are merged and numbers
//! are folded. Two expressions that differ only by commutativity or
//! associativity therefore compare equal. Deeper identities (rational
//! cancellation, `sin²+cos²=1`) are the job of
//! [`Expr::simplify`](crate::simplify).

use std::fmt;

use symbolica::atom::{Atom, AtomCore, AtomView, FunctionBuilder};
use symbolica::{symbol, try_symbol};

use crate::error::{SymbolicError, SymbolicResult};

/// Named scalar symbol such as a coordinate or a free parameter.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(pub(crate) symbolica::atom::Symbol);

impl Symbol {
    /// Register `name` with the backend.
    ///
    /// # Panics
    ///
    /// Panics if the backend rejects the name, e.g. one containing `:`.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        Symbol(symbol!(name))
    }

    pub fn try_new(name: impl AsRef<str>) -> SymbolicResult<Self> {
        let name = name.as_ref();
        try_symbol!(name)
            .map(Symbol)
            .map_err(|reason| SymbolicError::InvalidSymbol {
                name: name.to_string(),
                reason: reason.to_string(),
            })
    }

    pub fn name(&self) -> &str {
        self.0.get_stripped_name()
    }

    /// The symbol as an expression.
    pub fn expr(&self) -> Expr {
        Expr(Atom::var(self.0))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Symbol").field(&self.name()).finish()
    }
}

/// Split a whitespace or comma separated list into symbols.
///
/// ```no_run
/// use lyra_symbolic::symbols;
/// let s = symbols("t, r theta");
/// assert_eq!(s.len(), 3);
/// assert_eq!(s[2].name(), "theta");
/// ```
pub fn symbols(names: &str) -> Vec<Symbol> {
    names
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(Symbol::new)
        .collect()
}

/// Undefined function of one or more arguments, e.g. `f(x, y)`.
///
/// A function may share its name with a [`Symbol`]; curve parametrizations
/// replace a coordinate `x` by `x(tau)` this way.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Function(symbolica::atom::Symbol);

impl Function {
    pub fn new(name: impl AsRef<str>) -> Self {
        Function(Symbol::new(name).0)
    }

    pub fn name(&self) -> &str {
        self.0.get_stripped_name()
    }

    /// Apply the function to arguments.
    pub fn call<I>(&self, args: I) -> Expr
    where
        I: IntoIterator<Item = Expr>,
    {
        let builder = args
            .into_iter()
            .fold(FunctionBuilder::new(self.0), |b, arg| b.add_arg(&arg.0));
        Expr(builder.finish())
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Function").field(&self.name()).finish()
    }
}

/// Symbolic scalar expression.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Expr(pub(crate) Atom);

impl Expr {
    pub fn zero() -> Self {
        Expr(Atom::new())
    }

    pub fn one() -> Self {
        Expr(Atom::num(1))
    }

    pub fn int(n: i64) -> Self {
        Expr(Atom::num(n))
    }

    /// Exact fraction `numer/denom`.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is zero.
    pub fn rational(numer: i64, denom: i64) -> Self {
        assert!(denom != 0, "zero denominator in Expr::rational");
        Expr(Atom::num((numer, denom)))
    }

    pub fn sym(name: impl AsRef<str>) -> Self {
        Symbol::new(name).expr()
    }

    /// Undefined function application `name(args...)`.
    pub fn apply<I>(name: impl AsRef<str>, args: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Function::new(name).call(args)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    /// True for numbers and expressions free of symbols and undefined
    /// functions.
    pub fn is_constant(&self) -> bool {
        self.0.is_constant()
    }

    /// True when `sym` occurs as a variable or a function name.
    pub fn contains(&self, sym: &Symbol) -> bool {
        self.0.contains_symbol(sym.0)
    }

    /// Sum of `terms`.
    pub fn add_all<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr(terms.into_iter().fold(Atom::new(), |acc, t| acc + t.0))
    }

    /// Product of `factors`.
    pub fn mul_all<I>(factors: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr(factors.into_iter().fold(Atom::num(1), |acc, f| acc * f.0))
    }

    pub fn pow(&self, exp: impl Into<Expr>) -> Self {
        let exp: Expr = exp.into();
        Expr(self.0.pow(&exp.0))
    }

    pub fn powi(&self, exp: i64) -> Self {
        Expr(self.0.pow(exp))
    }

    pub fn sqrt(&self) -> Self {
        Expr(self.0.pow((1i64, 2i64)))
    }

    pub fn recip(&self) -> Self {
        self.powi(-1)
    }

    pub fn sin(&self) -> Self {
        Expr(self.0.sin())
    }

    pub fn cos(&self) -> Self {
        Expr(self.0.cos())
    }

    pub fn exp(&self) -> Self {
        Expr(self.0.exp())
    }

    pub fn ln(&self) -> Self {
        Expr(self.0.log())
    }

    pub(crate) fn view(&self) -> AtomView<'_> {
        self.0.as_view()
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::int(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Expr::int(i64::from(n))
    }
}

impl From<Symbol> for Expr {
    fn from(s: Symbol) -> Self {
        s.expr()
    }
}

impl From<&Symbol> for Expr {
    fn from(s: &Symbol) -> Self {
        s.expr()
    }
}

impl From<&Expr> for Expr {
    fn from(e: &Expr) -> Self {
        e.clone()
    }
}
