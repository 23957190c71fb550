//! Autoparallel curves of the connection.
//!
//! For each coordinate `x^a(λ)`:
//!
//! ```text
//! d²x^a/dλ² = −Σ_{bc} Γ^a_{bc}(x(λ)) dx^b/dλ dx^c/dλ
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lyra_symbolic::{Expr, Function, SymArray, Symbol};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GeometryError, GeometryResult};
use crate::space::TensorSpace;

/// Curve parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AffineParameter {
    /// Proper time `tau`
    #[default]
    Timelike,
    /// Affine parameter `lambda` of a null curve
    Null,
    Named(String),
}

impl AffineParameter {
    pub fn symbol(&self) -> Symbol {
        match self {
            AffineParameter::Timelike => Symbol::new("tau"),
            AffineParameter::Null => Symbol::new("lambda"),
            AffineParameter::Named(name) => Symbol::new(name),
        }
    }
}

impl FromStr for AffineParameter {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(GeometryError::parse(s, "empty curve parameter")),
            "timelike" | "tau" => Ok(AffineParameter::Timelike),
            "null" | "lambda" => Ok(AffineParameter::Null),
            other => {
                Symbol::try_new(other)?;
                Ok(AffineParameter::Named(other.to_string()))
            }
        }
    }
}

impl fmt::Display for AffineParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol().name())
    }
}

/// `lhs = rhs` for one coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoparallelEquation {
    /// `d²x^a/dλ²`
    pub lhs: Expr,
    pub rhs: Expr,
}

impl AutoparallelEquation {
    /// `lhs − rhs`, zero along a solution.
    pub fn residual(&self) -> Expr {
        self.lhs.clone() - self.rhs.clone()
    }
}

impl fmt::Display for AutoparallelEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

impl TensorSpace {
    /// One equation per coordinate, in coordinate order.
    pub fn autoparallel_equations(
        &self,
        parameter: &AffineParameter,
    ) -> GeometryResult<Vec<AutoparallelEquation>> {
        let gamma = self
            .connection()
            .ok_or_else(|| GeometryError::missing_connection("autoparallel equations"))?
            .components();
        let lambda = parameter.symbol();
        let dim = self.dim();
        debug!(dim, %parameter, "autoparallel equations");

        let curve: Vec<Expr> = self
            .coords()
            .iter()
            .map(|x| Function::new(x.name()).call([lambda.expr()]))
            .collect();
        let velocity: Vec<Expr> = curve.iter().map(|x| x.diff(&lambda)).collect();
        let along: HashMap<Symbol, Expr> = self
            .coords()
            .iter()
            .cloned()
            .zip(curve.iter().cloned())
            .collect();

        let mut equations = Vec::with_capacity(dim);
        for (a, x) in curve.iter().enumerate() {
            let mut terms = Vec::new();
            for b in 0..dim {
                for c in 0..dim {
                    let coefficient = &gamma[[a, b, c]];
                    if coefficient.is_zero() {
                        continue;
                    }
                    terms.push(coefficient.subs_all(&along) * &velocity[b] * &velocity[c]);
                }
            }
            equations.push(AutoparallelEquation {
                lhs: x.diff_n(&lambda, 2),
                rhs: (-Expr::add_all(terms)).simplify()?,
            });
        }
        Ok(equations)
    }
}

/// Autoparallel equations of the Levi-Civita connection of `metric`.
pub fn autoparallel_equations(
    metric: &SymArray,
    coords: &[Symbol],
    parameter: &AffineParameter,
) -> GeometryResult<Vec<AutoparallelEquation>> {
    let space = TensorSpace::builder(coords.to_vec())
        .metric(metric.clone())
        .build()?;
    space.autoparallel_equations(parameter)
}
