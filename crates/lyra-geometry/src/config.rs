//! Space-level configuration.
//!
//! A [`SpaceConfig`] picks the sign convention of the Riemann tensor, whether
//! covariant derivatives are simplified component by component, and the
//! side on which the derivative axis is added.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, GeometryResult};

/// Sign convention of the Riemann tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiemannConvention {
    /// Misner–Thorne–Wheeler
    #[default]
    Mtw,
    /// Landau–Lifshitz: the negative of MTW
    LandauLifshitz,
}

impl RiemannConvention {
    /// Overall factor applied to the MTW expression.
    pub fn sign(self) -> i64 {
        match self {
            RiemannConvention::Mtw => 1,
            RiemannConvention::LandauLifshitz => -1,
        }
    }
}

impl fmt::Display for RiemannConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiemannConvention::Mtw => write!(f, "mtw"),
            RiemannConvention::LandauLifshitz => write!(f, "landau-lifshitz"),
        }
    }
}

impl FromStr for RiemannConvention {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "mtw" => Ok(RiemannConvention::Mtw),
            "landau-lifshitz" | "ll" => Ok(RiemannConvention::LandauLifshitz),
            other => Err(GeometryError::Config(format!(
                "unknown Riemann convention '{other}'"
            ))),
        }
    }
}

/// Where the derivative axis of a covariant derivative goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Derivative index becomes the last axis
    #[default]
    Append,
    /// Derivative index becomes the first axis
    Prepend,
}

/// Complete space configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    /// Sign convention for Riemann, Ricci, scalar curvature and Einstein
    pub riemann_convention: RiemannConvention,
    /// Simplify every covariant-derivative component as it is built
    pub simplify_nabla: bool,
    /// Default placement of the derivative axis
    pub default_direction: Direction,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self::mtw()
    }
}

impl SpaceConfig {
    /// MTW sign convention (default).
    pub fn mtw() -> Self {
        Self {
            riemann_convention: RiemannConvention::Mtw,
            simplify_nabla: true,
            default_direction: Direction::Append,
        }
    }

    /// Landau–Lifshitz sign convention.
    pub fn landau_lifshitz() -> Self {
        Self {
            riemann_convention: RiemannConvention::LandauLifshitz,
            ..Self::mtw()
        }
    }

    pub fn with_convention(mut self, convention: RiemannConvention) -> Self {
        self.riemann_convention = convention;
        self
    }

    pub fn with_simplify_nabla(mut self, simplify: bool) -> Self {
        self.simplify_nabla = simplify;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.default_direction = direction;
        self
    }

    /// Parse a configuration from JSON; missing fields take defaults.
    pub fn from_json(json: &str) -> GeometryResult<Self> {
        serde_json::from_str(json).map_err(|e| GeometryError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> GeometryResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| GeometryError::Config(e.to_string()))
    }
}
