//! The coordinate space that owns every tensor.
//!
//! A [`TensorSpace`] holds the inputs of the geometry (coordinates, metric,
//! scale function, torsion, non-metricity, optionally an explicit
//! connection) and the quantities derived from them. Setters only change
//! inputs; derived quantities are recomputed by [`TensorSpace::update`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use indexmap::IndexMap;
use lyra_symbolic::{multi_indices, Expr, Function, SymArray, Symbol};
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn};

use crate::config::{RiemannConvention, SpaceConfig};
use crate::connection::{
    christoffel_first_kind, christoffel_second_kind, generalized_connection, ConnectionInputs,
};
use crate::contraction::{contract_factors, contract_operands, Operand};
use crate::curvature::{einstein_components, ricci_components, riemann_components, scalar_curvature};
use crate::error::{GeometryError, GeometryResult};
use crate::index::{Index, IndexedTensor, Slot};
use crate::notation::{expand_slots, parse_expression};
use crate::signature::{Signature, SignatureSpec, Variance, D, U};
use crate::tensor::{Tensor, TensorKind};

#[derive(Debug)]
struct MetricState {
    metric: Rc<SymArray>,
    inverse: Option<Rc<SymArray>>,
}

/// State shared by a space and all of its tensors.
#[derive(Debug)]
pub(crate) struct SpaceContext {
    coords: Vec<Symbol>,
    metric: RefCell<Option<MetricState>>,
    generation: Cell<u64>,
    tensor_counter: Cell<usize>,
    label_counter: Cell<usize>,
}

impl SpaceContext {
    fn new(coords: Vec<Symbol>) -> Rc<Self> {
        Rc::new(SpaceContext {
            coords,
            metric: RefCell::new(None),
            generation: Cell::new(0),
            tensor_counter: Cell::new(0),
            label_counter: Cell::new(0),
        })
    }

    pub(crate) fn dim(&self) -> usize {
        self.coords.len()
    }

    pub(crate) fn coords(&self) -> &[Symbol] {
        &self.coords
    }

    /// Bumped whenever the metric changes; conversion caches compare it.
    pub(crate) fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub(crate) fn next_tensor_name(&self) -> String {
        let n = self.tensor_counter.get() + 1;
        self.tensor_counter.set(n);
        format!("T{n}")
    }

    pub(crate) fn next_label(&self) -> usize {
        let n = self.label_counter.get() + 1;
        self.label_counter.set(n);
        n
    }

    fn install_metric(&self, metric: SymArray, inverse: Option<SymArray>) {
        *self.metric.borrow_mut() = Some(MetricState {
            metric: Rc::new(metric),
            inverse: inverse.map(Rc::new),
        });
        self.generation.set(self.generation.get() + 1);
    }

    pub(crate) fn metric(&self) -> Option<Rc<SymArray>> {
        self.metric.borrow().as_ref().map(|m| Rc::clone(&m.metric))
    }

    /// Inverse metric, computed on first use.
    pub(crate) fn metric_inv(&self) -> GeometryResult<Option<Rc<SymArray>>> {
        let mut state = self.metric.borrow_mut();
        let Some(state) = state.as_mut() else {
            return Ok(None);
        };
        if let Some(inverse) = &state.inverse {
            return Ok(Some(Rc::clone(inverse)));
        }
        let inverse = Rc::new(state.metric.inverse()?);
        state.inverse = Some(Rc::clone(&inverse));
        Ok(Some(inverse))
    }
}

/// A derivation step run by [`TensorSpace::update`], in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStep {
    /// Inverse metric
    Metric,
    /// Metric determinant
    Detg,
    /// Christoffel symbols of both kinds
    Christoffel,
    /// Generalized connection
    Connection,
    Riemann,
    /// Ricci tensor and scalar curvature
    Ricci,
    Einstein,
}

impl UpdateStep {
    pub const ALL: [UpdateStep; 7] = [
        UpdateStep::Metric,
        UpdateStep::Detg,
        UpdateStep::Christoffel,
        UpdateStep::Connection,
        UpdateStep::Riemann,
        UpdateStep::Ricci,
        UpdateStep::Einstein,
    ];
}

/// Which derived quantities an update recomputes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    steps: BTreeSet<UpdateStep>,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self::all()
    }
}

impl UpdateRequest {
    pub fn all() -> Self {
        Self::only(UpdateStep::ALL)
    }

    pub fn only(steps: impl IntoIterator<Item = UpdateStep>) -> Self {
        UpdateRequest {
            steps: steps.into_iter().collect(),
        }
    }

    /// Metric, determinant, Christoffel symbols and connection.
    pub fn geometry() -> Self {
        Self::only([
            UpdateStep::Metric,
            UpdateStep::Detg,
            UpdateStep::Christoffel,
            UpdateStep::Connection,
        ])
    }

    /// Riemann, Ricci and Einstein.
    pub fn curvature() -> Self {
        Self::only([UpdateStep::Riemann, UpdateStep::Ricci, UpdateStep::Einstein])
    }

    pub fn with(mut self, step: UpdateStep) -> Self {
        self.steps.insert(step);
        self
    }

    pub fn without(mut self, step: UpdateStep) -> Self {
        self.steps.remove(&step);
        self
    }

    pub fn contains(&self, step: UpdateStep) -> bool {
        self.steps.contains(&step)
    }

    pub fn steps(&self) -> impl Iterator<Item = UpdateStep> + '_ {
        self.steps.iter().copied()
    }
}

/// Source of a torsion or non-metricity tensor.
#[derive(Debug, Clone)]
pub enum TensorSource {
    /// Converted to the required signature through the metric
    Tensor(Tensor),
    /// Components already in the required signature
    Array(SymArray),
}

impl From<Tensor> for TensorSource {
    fn from(t: Tensor) -> Self {
        TensorSource::Tensor(t)
    }
}

impl From<&Tensor> for TensorSource {
    fn from(t: &Tensor) -> Self {
        TensorSource::Tensor(t.clone())
    }
}

impl From<SymArray> for TensorSource {
    fn from(a: SymArray) -> Self {
        TensorSource::Array(a)
    }
}

#[derive(Debug, Clone, Default)]
struct Derived {
    detg: Option<Expr>,
    christoffel1: Option<Tensor>,
    christoffel2: Option<Tensor>,
    connection: Option<Tensor>,
    riemann: Option<Tensor>,
    ricci: Option<Tensor>,
    scalar: Option<Tensor>,
    einstein: Option<Tensor>,
}

/// Coordinate space with metric, scale, torsion, non-metricity and the
/// connection and curvature derived from them.
pub struct TensorSpace {
    ctx: Rc<SpaceContext>,
    config: SpaceConfig,
    metric: Option<Tensor>,
    scale: Tensor,
    torsion: Tensor,
    nonmetricity: Tensor,
    metric_compatible: Option<bool>,
    explicit_connection: Option<Tensor>,
    derived: Derived,
    registry: RefCell<IndexMap<String, Tensor>>,
}

/// Spacetime flavoured alias.
pub type SpaceTime = TensorSpace;
/// Manifold flavoured alias.
pub type Manifold = TensorSpace;

/// Builder for [`TensorSpace`]; `build` runs a full update.
#[derive(Debug, Clone)]
pub struct TensorSpaceBuilder {
    coords: Vec<Symbol>,
    metric: Option<SymArray>,
    metric_inv: Option<SymArray>,
    connection: Option<SymArray>,
    scale: Option<Expr>,
    torsion: Option<SymArray>,
    nonmetricity: Option<SymArray>,
    config: SpaceConfig,
}

impl TensorSpaceBuilder {
    pub fn metric(mut self, metric: SymArray) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn metric_inv(mut self, metric_inv: SymArray) -> Self {
        self.metric_inv = Some(metric_inv);
        self
    }

    /// Explicit connection coefficients `Γ^a_{bc}`.
    pub fn connection(mut self, connection: SymArray) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn scale(mut self, phi: impl Into<Expr>) -> Self {
        self.scale = Some(phi.into());
        self
    }

    pub fn torsion(mut self, torsion: SymArray) -> Self {
        self.torsion = Some(torsion);
        self
    }

    pub fn nonmetricity(mut self, nonmetricity: SymArray) -> Self {
        self.nonmetricity = Some(nonmetricity);
        self
    }

    pub fn config(mut self, config: SpaceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn riemann_convention(mut self, convention: RiemannConvention) -> Self {
        self.config.riemann_convention = convention;
        self
    }

    pub fn build(self) -> GeometryResult<TensorSpace> {
        let mut space = TensorSpace::new(self.coords);
        space.config = self.config;
        if let Some(metric) = self.metric {
            space.set_metric(metric, self.metric_inv)?;
        }
        if let Some(phi) = self.scale {
            space.set_scale(Some(phi), None)?;
        }
        if let Some(torsion) = self.torsion {
            space.set_torsion(torsion)?;
        }
        if let Some(nonmetricity) = self.nonmetricity {
            space.set_nonmetricity(nonmetricity)?;
        }
        if let Some(connection) = self.connection {
            space.set_connection(Some(connection))?;
        }
        space.update(&UpdateRequest::all())?;
        Ok(space)
    }
}

fn check_shape(what: &str, array: &SymArray, dim: usize, rank: usize) -> GeometryResult<()> {
    if array.rank() != rank || array.shape().iter().any(|&n| n != dim) {
        return Err(GeometryError::RankMismatch(format!(
            "{what} must have shape {:?}, got {:?}",
            vec![dim; rank],
            array.shape()
        )));
    }
    Ok(())
}

/// Sign of the permutation `idx` of `0..n`; zero when an entry repeats.
fn permutation_sign(idx: &[usize]) -> i64 {
    let mut sign = 1;
    for i in 0..idx.len() {
        for j in (i + 1)..idx.len() {
            match idx[i].cmp(&idx[j]) {
                std::cmp::Ordering::Equal => return 0,
                std::cmp::Ordering::Greater => sign = -sign,
                std::cmp::Ordering::Less => {}
            }
        }
    }
    sign
}

impl TensorSpace {
    /// Space without a metric; scale 1, torsion and non-metricity zero.
    pub fn new(coords: Vec<Symbol>) -> Self {
        let ctx = SpaceContext::new(coords);
        let dim = ctx.dim();
        let named = |components, signature, name: &str| {
            Tensor::from_parts(
                Rc::clone(&ctx),
                components,
                signature,
                TensorKind::Plain,
                name.to_string(),
            )
        };
        let scale = named(SymArray::scalar(Expr::one()), vec![], "phi");
        let torsion = named(SymArray::zeros(&[dim; 3]), vec![D, D, D], "tau");
        let nonmetricity = named(SymArray::zeros(&[dim; 3]), vec![U, D, D], "M");

        let mut registry = IndexMap::new();
        for t in [&scale, &torsion, &nonmetricity] {
            registry.insert(t.name().to_string(), t.clone());
        }
        TensorSpace {
            ctx,
            config: SpaceConfig::default(),
            metric: None,
            scale,
            torsion,
            nonmetricity,
            metric_compatible: None,
            explicit_connection: None,
            derived: Derived::default(),
            registry: RefCell::new(registry),
        }
    }

    /// Space with coordinates `x0 .. x{dim-1}`.
    pub fn with_dimension(dim: usize) -> Self {
        TensorSpace::new((0..dim).map(|i| Symbol::new(format!("x{i}"))).collect())
    }

    pub fn builder(coords: Vec<Symbol>) -> TensorSpaceBuilder {
        TensorSpaceBuilder {
            coords,
            metric: None,
            metric_inv: None,
            connection: None,
            scale: None,
            torsion: None,
            nonmetricity: None,
            config: SpaceConfig::default(),
        }
    }

    pub fn dim(&self) -> usize {
        self.ctx.dim()
    }

    pub fn coords(&self) -> &[Symbol] {
        self.ctx.coords()
    }

    pub(crate) fn context(&self) -> &Rc<SpaceContext> {
        &self.ctx
    }

    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    /// Replace the configuration; derived tensors change on the next update.
    pub fn set_config(&mut self, config: SpaceConfig) {
        self.config = config;
    }

    pub fn riemann_convention(&self) -> RiemannConvention {
        self.config.riemann_convention
    }

    // ----- inputs -------------------------------------------------------

    /// Install a metric and optionally its known inverse.
    pub fn set_metric(&mut self, metric: SymArray, metric_inv: Option<SymArray>) -> GeometryResult<()> {
        let dim = self.dim();
        check_shape("metric", &metric, dim, 2)?;
        if let Some(inverse) = &metric_inv {
            check_shape("inverse metric", inverse, dim, 2)?;
        }
        let g = Tensor::from_parts(
            Rc::clone(&self.ctx),
            metric.clone(),
            vec![D, D],
            TensorKind::Plain,
            "g".to_string(),
        );
        self.ctx.install_metric(metric, metric_inv.clone());
        let mut registry = self.registry.borrow_mut();
        registry.insert("g".to_string(), g.clone());
        match metric_inv {
            Some(inverse) => {
                registry.insert("g_inv".to_string(), self.inverse_tensor(inverse));
            }
            None => {
                registry.shift_remove("g_inv");
            }
        }
        self.metric = Some(g);
        debug!(dim, "metric installed");
        Ok(())
    }

    fn inverse_tensor(&self, inverse: SymArray) -> Tensor {
        Tensor::from_parts(
            Rc::clone(&self.ctx),
            inverse,
            vec![U, U],
            TensorKind::Plain,
            "g_inv".to_string(),
        )
    }

    /// Install explicit connection coefficients `Γ^a_{bc}`, or go back to
    /// deriving the connection from the metric with `None`.
    ///
    /// [`TensorSpace::connection`] picks the change up at the next
    /// [`UpdateStep::Connection`].
    pub fn set_connection(&mut self, connection: Option<SymArray>) -> GeometryResult<()> {
        match connection {
            Some(components) => {
                check_shape("connection", &components, self.dim(), 3)?;
                self.explicit_connection = Some(Tensor::from_parts(
                    Rc::clone(&self.ctx),
                    components,
                    vec![U, D, D],
                    TensorKind::Connection,
                    "Gamma".to_string(),
                ));
            }
            None => self.explicit_connection = None,
        }
        Ok(())
    }

    /// Set the scale function φ.
    ///
    /// With `None` the scale becomes an undefined function `phi(x)` of the
    /// coordinate at position `coord`, by default the second coordinate (the
    /// first in one dimension).
    pub fn set_scale(&mut self, phi: Option<Expr>, coord: Option<usize>) -> GeometryResult<()> {
        let phi = match phi {
            Some(phi) => phi,
            None => {
                let default = if self.dim() > 1 { 1 } else { 0 };
                let pos = coord.unwrap_or(default);
                let x = self.coords().get(pos).ok_or_else(|| {
                    GeometryError::RankMismatch(format!(
                        "coordinate {pos} out of range for dimension {}",
                        self.dim()
                    ))
                })?;
                Function::new("phi").call([x.expr()])
            }
        };
        let scale = Tensor::from_parts(
            Rc::clone(&self.ctx),
            SymArray::scalar(phi),
            vec![],
            TensorKind::Plain,
            "phi".to_string(),
        );
        self.registry
            .borrow_mut()
            .insert("phi".to_string(), scale.clone());
        self.scale = scale;
        Ok(())
    }

    fn source_components(
        &self,
        what: &str,
        source: TensorSource,
        signature: &[Variance],
    ) -> GeometryResult<SymArray> {
        match source {
            TensorSource::Array(components) => {
                check_shape(what, &components, self.dim(), signature.len())?;
                Ok(components)
            }
            TensorSource::Tensor(t) => {
                if !t.belongs_to(&self.ctx) {
                    return Err(GeometryError::ForeignSpace {
                        name: t.name().to_string(),
                    });
                }
                if t.rank() != signature.len() {
                    return Err(GeometryError::RankMismatch(format!(
                        "{what} must have rank {}, got {}",
                        signature.len(),
                        t.rank()
                    )));
                }
                t.convert(signature)
            }
        }
    }

    /// Torsion `τ_{abc}`.
    pub fn set_torsion(&mut self, torsion: impl Into<TensorSource>) -> GeometryResult<()> {
        let components = self.source_components("torsion", torsion.into(), &[D, D, D])?;
        let tau = Tensor::from_parts(
            Rc::clone(&self.ctx),
            components,
            vec![D, D, D],
            TensorKind::Plain,
            "tau".to_string(),
        );
        self.registry.borrow_mut().insert("tau".to_string(), tau.clone());
        self.torsion = tau;
        Ok(())
    }

    /// Non-metricity `M^a_{bc}`.
    pub fn set_nonmetricity(&mut self, nonmetricity: impl Into<TensorSource>) -> GeometryResult<()> {
        let components = self.source_components("non-metricity", nonmetricity.into(), &[U, D, D])?;
        let m = Tensor::from_parts(
            Rc::clone(&self.ctx),
            components,
            vec![U, D, D],
            TensorKind::Plain,
            "M".to_string(),
        );
        self.registry.borrow_mut().insert("M".to_string(), m.clone());
        self.nonmetricity = m;
        Ok(())
    }

    /// Record whether the connection is declared metric compatible.
    pub fn set_metric_compatibility(&mut self, compatible: bool) {
        self.metric_compatible = Some(compatible);
    }

    pub fn metric_compatible(&self) -> Option<bool> {
        self.metric_compatible
    }

    // ----- accessors ----------------------------------------------------

    pub fn metric(&self) -> Option<&Tensor> {
        self.metric.as_ref()
    }

    /// Inverse metric `g^{ab}`, computed and registered on first use.
    pub fn metric_inv(&self) -> GeometryResult<Tensor> {
        if let Some(existing) = self.registry.borrow().get("g_inv") {
            return Ok(existing.clone());
        }
        let inverse = self
            .ctx
            .metric_inv()?
            .ok_or_else(|| GeometryError::missing_metric("inverse metric"))?;
        let tensor = self.inverse_tensor(SymArray::clone(&inverse));
        self.registry
            .borrow_mut()
            .insert("g_inv".to_string(), tensor.clone());
        Ok(tensor)
    }

    /// Determinant of the metric.
    pub fn detg(&self) -> GeometryResult<Expr> {
        if let Some(detg) = &self.derived.detg {
            return Ok(detg.clone());
        }
        let metric = self
            .ctx
            .metric()
            .ok_or_else(|| GeometryError::missing_metric("metric determinant"))?;
        Ok(metric.determinant()?)
    }

    /// The scale function as a rank-0 tensor.
    pub fn scale(&self) -> &Tensor {
        &self.scale
    }

    /// The scale function φ.
    pub fn phi(&self) -> Expr {
        self.scale.expr().unwrap_or_else(|_| Expr::one())
    }

    pub fn torsion(&self) -> &Tensor {
        &self.torsion
    }

    pub fn nonmetricity(&self) -> &Tensor {
        &self.nonmetricity
    }

    pub fn christoffel1(&self) -> Option<&Tensor> {
        self.derived.christoffel1.as_ref()
    }

    pub fn christoffel2(&self) -> Option<&Tensor> {
        self.derived.christoffel2.as_ref()
    }

    pub fn connection(&self) -> Option<&Tensor> {
        self.derived.connection.as_ref()
    }

    pub fn riemann(&self) -> Option<&Tensor> {
        self.derived.riemann.as_ref()
    }

    pub fn ricci(&self) -> Option<&Tensor> {
        self.derived.ricci.as_ref()
    }

    pub fn scalar_curvature(&self) -> Option<&Tensor> {
        self.derived.scalar.as_ref()
    }

    pub fn einstein(&self) -> Option<&Tensor> {
        self.derived.einstein.as_ref()
    }

    // ----- registry -----------------------------------------------------

    /// Register `tensor` under its name, replacing any previous entry.
    pub fn register(&self, tensor: Tensor) -> GeometryResult<Tensor> {
        if !tensor.belongs_to(&self.ctx) {
            return Err(GeometryError::ForeignSpace {
                name: tensor.name().to_string(),
            });
        }
        self.registry
            .borrow_mut()
            .insert(tensor.name().to_string(), tensor.clone());
        Ok(tensor)
    }

    pub fn get(&self, name: &str) -> Option<Tensor> {
        self.registry.borrow().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.borrow().keys().cloned().collect()
    }

    fn named(&self, components: SymArray, signature: Signature, kind: TensorKind, name: Option<&str>) -> Tensor {
        let name = name.map_or_else(|| self.ctx.next_tensor_name(), str::to_string);
        let tensor = Tensor::from_parts(Rc::clone(&self.ctx), components, signature, kind, name);
        self.registry
            .borrow_mut()
            .insert(tensor.name().to_string(), tensor.clone());
        tensor
    }

    // ----- factories ----------------------------------------------------

    pub fn scalar(&self, value: impl Into<Expr>, name: Option<&str>) -> Tensor {
        self.named(SymArray::scalar(value.into()), vec![], TensorKind::Plain, name)
    }

    pub fn zeros(&self, signature: impl SignatureSpec, name: Option<&str>) -> GeometryResult<Tensor> {
        let signature = signature.to_signature(None)?;
        let components = SymArray::zeros(&vec![self.dim(); signature.len()]);
        Ok(self.named(components, signature, TensorKind::Plain, name))
    }

    pub fn from_array(
        &self,
        components: SymArray,
        signature: impl SignatureSpec,
        name: Option<&str>,
    ) -> GeometryResult<Tensor> {
        let signature = signature.to_signature(Some(components.rank()))?;
        check_shape("tensor components", &components, self.dim(), signature.len())?;
        Ok(self.named(components, signature, TensorKind::Plain, name))
    }

    /// Tensor whose component at each multi-index is `f(index)`.
    pub fn from_function<F>(
        &self,
        signature: impl SignatureSpec,
        rank: usize,
        f: F,
        name: Option<&str>,
    ) -> GeometryResult<Tensor>
    where
        F: FnMut(&[usize]) -> Expr,
    {
        let signature = signature.to_signature(Some(rank))?;
        let components = SymArray::from_fn(&vec![self.dim(); rank], f);
        Ok(self.named(components, signature, TensorKind::Plain, name))
    }

    /// Tensor of undefined functions of the coordinates, `T01(x, y)` etc.
    pub fn generic(&self, name: &str, signature: impl SignatureSpec) -> GeometryResult<Tensor> {
        let signature = signature.to_signature(None)?;
        let args: Vec<Expr> = self.coords().iter().map(Symbol::expr).collect();
        let components = SymArray::from_fn(&vec![self.dim(); signature.len()], |idx| {
            let suffix: String = idx.iter().map(usize::to_string).collect();
            Function::new(format!("{name}{suffix}")).call(args.clone())
        });
        Ok(self.named(components, signature, TensorKind::Plain, Some(name)))
    }

    /// Kronecker delta `δ^a_b`.
    pub fn delta(&self) -> Tensor {
        let components = SymArray::identity(self.dim());
        Tensor::from_parts(
            Rc::clone(&self.ctx),
            components,
            vec![U, D],
            TensorKind::Symbol,
            "delta".to_string(),
        )
    }

    /// Levi-Civita symbol `ε_{a...}` with `ε_{01...} = 1`.
    pub fn levi_civita(&self) -> Tensor {
        let dim = self.dim();
        let components = SymArray::from_fn(&vec![dim; dim], |idx| Expr::int(permutation_sign(idx)));
        Tensor::from_parts(
            Rc::clone(&self.ctx),
            components,
            vec![D; dim],
            TensorKind::Symbol,
            "epsilon".to_string(),
        )
    }

    // ----- indices and contraction --------------------------------------

    /// Indices from space-separated names; `_`, `.` and `empty` give the
    /// empty index.
    pub fn index(&self, names: &str) -> Vec<Index> {
        names
            .split_whitespace()
            .map(|n| match n {
                "_" | "." | "empty" => Index::empty(),
                name => Index::new(name),
            })
            .collect()
    }

    /// Indices running over the coordinates, for [`IndexedTensor::partial`].
    pub fn coord_index(&self, names: &str) -> GeometryResult<Vec<Index>> {
        let indices = self.index(names);
        if indices.iter().any(Index::is_unlabeled) {
            return Err(GeometryError::parse(
                names,
                "coordinate indices must be named",
            ));
        }
        Ok(indices)
    }

    /// Einstein product of `operands`.
    pub fn contract(&self, operands: &[Operand]) -> GeometryResult<IndexedTensor> {
        contract_operands(&self.ctx, operands)
    }

    /// Evaluate an index-notation product such as `"A^a_b B^b_c"` over
    /// registered tensors.
    pub fn eval_contract(&self, expr: &str) -> GeometryResult<IndexedTensor> {
        let mut factors = Vec::new();
        for token in parse_expression(expr)? {
            let tensor = self
                .get(&token.name)
                .ok_or_else(|| GeometryError::UnknownTensor(token.name.clone()))?;
            let slots = expand_slots(tensor.rank(), &token.up, &token.down)?;
            factors.push(tensor.label_slots(slots)?);
        }
        contract_factors(&self.ctx, factors, Expr::one())
    }

    /// Plain tensor with axes ordered as `slots`.
    pub fn tensor<I>(&self, indexed: &IndexedTensor, slots: I) -> GeometryResult<Tensor>
    where
        I: IntoIterator,
        I::Item: Into<Slot>,
    {
        if !indexed.belongs_to(&self.ctx) {
            return Err(GeometryError::ForeignSpace {
                name: "indexed tensor".to_string(),
            });
        }
        indexed.reorder(slots)
    }

    // ----- derivation ---------------------------------------------------

    /// Recompute the requested derived quantities, in [`UpdateStep`] order.
    ///
    /// Either every requested step succeeds or nothing changes.
    pub fn update(&mut self, request: &UpdateRequest) -> GeometryResult<()> {
        let _span = info_span!("update", dim = self.dim()).entered();
        let mut next = self.derived.clone();
        let metric = self.ctx.metric();
        let mut metric_inv = None;

        if self.metric_compatible == Some(true) && !self.nonmetricity.components().is_zero() {
            warn!("space is declared metric compatible but has non-zero non-metricity");
        }

        for step in request.steps() {
            debug!(?step, "update step");
            match step {
                UpdateStep::Metric => {
                    metric_inv = self.ctx.metric_inv()?;
                }
                UpdateStep::Detg => {
                    next.detg = match &metric {
                        Some(g) => Some(g.determinant()?),
                        None => None,
                    };
                }
                UpdateStep::Christoffel => {
                    let (first, second) = self.christoffel_pair()?.unzip();
                    next.christoffel1 = first;
                    next.christoffel2 = second;
                }
                UpdateStep::Connection => {
                    next.connection = match (&self.explicit_connection, &metric) {
                        (Some(explicit), _) => Some(explicit.clone()),
                        (None, Some(_)) => Some(self.derive_connection(next.christoffel2.as_ref())?),
                        (None, None) => None,
                    };
                }
                UpdateStep::Riemann => {
                    next.riemann = match (&metric, &next.connection) {
                        (Some(_), Some(gamma)) => {
                            let components = riemann_components(
                                gamma.components(),
                                &self.phi(),
                                self.coords(),
                                self.config.riemann_convention,
                            )?;
                            Some(self.derived_named(components, vec![U, D, D, D], "Riemann"))
                        }
                        _ => None,
                    };
                }
                UpdateStep::Ricci => {
                    let inverse = match &metric_inv {
                        Some(inverse) => Some(Rc::clone(inverse)),
                        None => self.ctx.metric_inv()?,
                    };
                    (next.ricci, next.scalar) = match (&next.riemann, inverse) {
                        (Some(riemann), Some(inverse)) => {
                            let ricci = ricci_components(riemann.components())?;
                            let scalar = scalar_curvature(&ricci, &inverse)?;
                            (
                                Some(self.derived_named(ricci, vec![D, D], "Ricci")),
                                Some(self.derived_named(SymArray::scalar(scalar), vec![], "R")),
                            )
                        }
                        _ => (None, None),
                    };
                }
                UpdateStep::Einstein => {
                    next.einstein = match (&metric, &next.ricci, &next.scalar) {
                        (Some(g), Some(ricci), Some(scalar)) => {
                            let components =
                                einstein_components(ricci.components(), g, &scalar.expr()?)?;
                            Some(self.derived_named(components, vec![D, D], "Einstein"))
                        }
                        _ => None,
                    };
                }
            }
        }

        let mut registry = self.registry.borrow_mut();
        if let Some(inverse) = metric_inv {
            registry.insert("g_inv".to_string(), self.inverse_tensor(SymArray::clone(&inverse)));
        }
        for (name, tensor) in [
            ("Gamma", &next.connection),
            ("Riemann", &next.riemann),
            ("Ricci", &next.ricci),
            ("Einstein", &next.einstein),
        ] {
            match tensor {
                Some(t) => {
                    registry.insert(name.to_string(), t.clone());
                }
                None => {
                    registry.shift_remove(name);
                }
            }
        }
        drop(registry);
        self.derived = next;
        Ok(())
    }

    fn derived_named(&self, components: SymArray, signature: Signature, name: &str) -> Tensor {
        Tensor::from_parts(
            Rc::clone(&self.ctx),
            components,
            signature,
            TensorKind::Plain,
            name.to_string(),
        )
    }

    fn christoffel_pair(&self) -> GeometryResult<Option<(Tensor, Tensor)>> {
        let (Some(metric), Some(inverse)) = (self.ctx.metric(), self.ctx.metric_inv()?) else {
            return Ok(None);
        };
        let first = christoffel_first_kind(&metric, self.coords())?;
        let second = christoffel_second_kind(&inverse, &first)?;
        let wrap = |components, signature, name: &str| {
            Tensor::from_parts(
                Rc::clone(&self.ctx),
                components,
                signature,
                TensorKind::Connection,
                name.to_string(),
            )
        };
        Ok(Some((
            wrap(first, vec![D, D, D], "Christoffel1"),
            wrap(second, vec![U, D, D], "Christoffel2"),
        )))
    }

    fn derive_connection(&self, christoffel2: Option<&Tensor>) -> GeometryResult<Tensor> {
        let metric = self
            .ctx
            .metric()
            .ok_or_else(|| GeometryError::missing_metric("connection"))?;
        let inverse = self
            .ctx
            .metric_inv()?
            .ok_or_else(|| GeometryError::missing_metric("connection"))?;
        let second = match christoffel2 {
            Some(c) => c.components().clone(),
            None => christoffel_second_kind(&inverse, &christoffel_first_kind(&metric, self.coords())?)?,
        };
        let components = generalized_connection(&ConnectionInputs {
            metric: &metric,
            metric_inv: &inverse,
            christoffel2: &second,
            scale: &self.phi(),
            torsion: self.torsion.components(),
            nonmetricity: self.nonmetricity.components(),
            coords: self.coords(),
        })?;
        Ok(Tensor::from_parts(
            Rc::clone(&self.ctx),
            components,
            vec![U, D, D],
            TensorKind::Connection,
            "Gamma".to_string(),
        ))
    }

    /// Every multi-index of a rank-`rank` tensor over this space.
    pub fn multi_indices(&self, rank: usize) -> impl Iterator<Item = Vec<usize>> {
        multi_indices(&vec![self.dim(); rank])
    }
}

#[cfg(test)]
mod tests {
    use lyra_symbolic::{on_engine_thread, symbols};

    use super::*;

    fn sphere() -> TensorSpace {
        let coords = symbols("theta phi");
        let theta = coords[0].expr();
        TensorSpace::builder(coords)
            .metric(SymArray::diagonal(vec![Expr::one(), theta.sin().powi(2)]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults_without_metric() {
        on_engine_thread(|| {
            let space = TensorSpace::new(symbols("x y"));
            assert_eq!(space.dim(), 2);
            assert_eq!(space.phi(), Expr::one());
            assert_eq!(space.torsion().signature(), &[D, D, D]);
            assert_eq!(space.nonmetricity().signature(), &[U, D, D]);
            assert!(space.connection().is_none());
            assert!(space.riemann().is_none());
            assert!(matches!(space.metric_inv(), Err(GeometryError::MissingMetric { .. })));
            assert_eq!(space.names(), vec!["phi", "tau", "M"]);
        });
    }

    #[test]
    fn test_auto_names_count_per_space() {
        on_engine_thread(|| {
            let space = TensorSpace::new(symbols("x y"));
            let a = space.zeros([U], None).unwrap();
            let b = space.zeros("d", None).unwrap();
            assert_eq!(a.name(), "T1");
            assert_eq!(b.name(), "T2");
            let other = TensorSpace::new(symbols("x y"));
            assert_eq!(other.zeros([U], None).unwrap().name(), "T1");
        });
    }

    #[test]
    fn test_metric_registration() {
        on_engine_thread(|| {
            let space = sphere();
            assert!(space.get("g").is_some());
            assert!(space.get("g_inv").is_some());
            assert!(space.get("Riemann").is_some());
            let inv = space.metric_inv().unwrap();
            let expected = space.coords()[0].expr().sin().powi(-2);
            assert!((inv[[1, 1]].clone() - expected).is_identically_zero().unwrap());
            assert_eq!(space.detg().unwrap(), space.coords()[0].expr().sin().powi(2));
        });
    }

    #[test]
    fn test_bad_shapes_are_rejected() {
        on_engine_thread(|| {
            let mut space = TensorSpace::new(symbols("x y"));
            assert!(space.set_metric(SymArray::identity(3), None).is_err());
            assert!(space.set_torsion(SymArray::zeros(&[2, 2])).is_err());
            assert!(space.from_array(SymArray::zeros(&[2, 3]), [U, D], None).is_err());
            assert!(space.from_function([U, D], 3, |_| Expr::zero(), None).is_err());
        });
    }

    #[test]
    fn test_setters_do_not_recompute() {
        on_engine_thread(|| {
            let mut space = sphere();
            let before = space.connection().unwrap().components().clone();
            space.set_scale(None, None).unwrap();
            assert_eq!(space.connection().unwrap().components(), &before);
            assert_eq!(
                space.phi(),
                Function::new("phi").call([space.coords()[1].expr()])
            );
            space.update(&UpdateRequest::only([UpdateStep::Connection])).unwrap();
            assert_ne!(space.connection().unwrap().components(), &before);
        });
    }

    #[test]
    fn test_explicit_connection_waits_for_update() {
        on_engine_thread(|| {
            let mut space = sphere();
            let before = space.connection().unwrap().components().clone();
            space.set_connection(Some(SymArray::zeros(&[2, 2, 2]))).unwrap();
            assert_eq!(space.connection().unwrap().components(), &before);
            assert_eq!(space.get("Gamma").unwrap().components(), &before);
            space.update(&UpdateRequest::only([UpdateStep::Connection])).unwrap();
            assert!(space.connection().unwrap().components().is_zero());
        });
    }

    #[test]
    fn test_explicit_connection_survives_update() {
        on_engine_thread(|| {
            let mut space = TensorSpace::new(symbols("x y"));
            let gamma = SymArray::from_fn(&[2, 2, 2], |idx| Expr::int(idx.iter().sum::<usize>() as i64));
            space.set_connection(Some(gamma.clone())).unwrap();
            assert!(space.connection().is_none());
            assert!(space.get("Gamma").is_none());
            space.update(&UpdateRequest::all()).unwrap();
            assert_eq!(space.connection().unwrap().components(), &gamma);
            assert!(space.riemann().is_none());
            space.set_connection(None).unwrap();
            space.update(&UpdateRequest::all()).unwrap();
            assert!(space.connection().is_none());
        });
    }

    #[test]
    fn test_delta_and_levi_civita() {
        on_engine_thread(|| {
            let space = TensorSpace::new(symbols("x y"));
            let delta = space.delta();
            assert_eq!(delta[[0, 0]], Expr::one());
            assert_eq!(delta[[0, 1]], Expr::zero());
            let eps = space.levi_civita();
            assert_eq!(eps[[0, 1]], Expr::one());
            assert_eq!(eps[[1, 0]], Expr::int(-1));
            assert_eq!(eps[[1, 1]], Expr::zero());
            assert!(matches!(
                delta.with_signature([D, D]),
                Err(GeometryError::ImmutableConnection { .. })
            ));
        });
    }

    #[test]
    fn test_update_request_sets() {
        on_engine_thread(|| {
            let request = UpdateRequest::all().without(UpdateStep::Einstein);
            assert!(!request.contains(UpdateStep::Einstein));
            assert!(request.contains(UpdateStep::Riemann));
            let curvature = UpdateRequest::curvature().with(UpdateStep::Connection);
            assert_eq!(curvature.steps().next(), Some(UpdateStep::Connection));
        });
    }

    #[test]
    fn test_failed_update_changes_nothing() {
        on_engine_thread(|| {
            let mut space = TensorSpace::new(symbols("x y"));
            space
                .set_metric(SymArray::from_rows(vec![
                    vec![Expr::sym("x"), Expr::sym("x")],
                    vec![Expr::sym("x"), Expr::sym("x")],
                ]).unwrap(), None)
                .unwrap();
            assert!(space.update(&UpdateRequest::all()).is_err());
            assert!(space.connection().is_none());
            assert!(space.get("g_inv").is_none());
        });
    }
}
