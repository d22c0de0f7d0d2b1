//! Solver backends.
//!
//! The formulation never talks to a MILP engine directly. Anything that can
//! take a [`Model`] and hand back a status plus one value per variable is a
//! [`SolverBackend`]; the ones shipped here go through `good_lp`.

use std::fmt;

use good_lp::Solution as LpSolution;
use good_lp::solvers::{ResolutionError, Solver};
use good_lp::{Expression, SolverModel, Variable, variable, variables};
use serde::{Deserialize, Serialize};

use crate::error::DistributionError;
use crate::model::{Constraint, Domain, LinearExpr, Model, Relation, Sense, VarId, VariableSpec};

#[cfg(not(any(feature = "microlp", feature = "cbc")))]
compile_error!("enable at least one solver backend feature: `microlp` or `cbc`");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
        })
    }
}

/// What a backend reports back. Values are only present when optimal.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutput {
    status: SolveStatus,
    values: Vec<f64>,
}

impl SolverOutput {
    pub fn optimal(values: Vec<f64>) -> Self {
        Self {
            status: SolveStatus::Optimal,
            values,
        }
    }

    pub fn without_solution(status: SolveStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
        }
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.index()).copied()
    }

    /// Solved values indexed by [`VarId::index`].
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A synchronous MILP engine.
///
/// Infeasible and unbounded models are reported through [`SolveStatus`];
/// `Err` is reserved for the engine itself failing.
pub trait SolverBackend {
    fn name(&self) -> &'static str;

    fn solve(&mut self, model: &Model) -> Result<SolverOutput, DistributionError>;
}

impl<B: SolverBackend + ?Sized> SolverBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn solve(&mut self, model: &Model) -> Result<SolverOutput, DistributionError> {
        (**self).solve(model)
    }
}

/// Pure Rust branch and bound, always available with the default features.
#[cfg(feature = "microlp")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLp;

#[cfg(feature = "microlp")]
impl SolverBackend for MicroLp {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&mut self, model: &Model) -> Result<SolverOutput, DistributionError> {
        solve_with(self.name(), model, good_lp::solvers::microlp::microlp, |_| {})
    }
}

/// COIN-OR CBC. Requires the native library to be installed.
#[cfg(feature = "cbc")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Cbc;

#[cfg(feature = "cbc")]
impl SolverBackend for Cbc {
    fn name(&self) -> &'static str {
        "coin_cbc"
    }

    fn solve(&mut self, model: &Model) -> Result<SolverOutput, DistributionError> {
        solve_with(
            self.name(),
            model,
            good_lp::solvers::coin_cbc::coin_cbc,
            quiet_cbc,
        )
    }
}

#[cfg(feature = "cbc")]
#[allow(unused_variables)]
fn quiet_cbc(problem: &mut good_lp::solvers::coin_cbc::CoinCbcProblem) {
    #[cfg(not(debug_assertions))]
    problem.set_parameter("loglevel", "0");
}

/// CBC when compiled in, microlp otherwise.
#[cfg(feature = "cbc")]
pub fn default_backend() -> Box<dyn SolverBackend> {
    Box::new(Cbc)
}

/// CBC when compiled in, microlp otherwise.
#[cfg(all(feature = "microlp", not(feature = "cbc")))]
pub fn default_backend() -> Box<dyn SolverBackend> {
    Box::new(MicroLp)
}

/// Look a compiled-in backend up by its [`SolverBackend::name`].
pub fn backend_by_name(name: &str) -> Option<Box<dyn SolverBackend>> {
    match name {
        #[cfg(feature = "microlp")]
        "microlp" => Some(Box::new(MicroLp)),
        #[cfg(feature = "cbc")]
        "coin_cbc" | "cbc" => Some(Box::new(Cbc)),
        _ => None,
    }
}

/// Translate `model` into good_lp, solve it with `solver` and read every
/// variable back in creation order.
fn solve_with<S>(
    backend: &'static str,
    model: &Model,
    solver: S,
    configure: impl FnOnce(&mut S::Model),
) -> Result<SolverOutput, DistributionError>
where
    S: Solver,
    S::Model: SolverModel<Error = ResolutionError>,
{
    let mut problem_vars = variables!();
    let handles: Vec<Variable> = model
        .variables()
        .iter()
        .map(|spec| problem_vars.add(variable_definition(spec)))
        .collect();

    let objective = to_expression(model.objective(), &handles);
    let unsolved = match model.sense() {
        Sense::Minimize => problem_vars.minimise(objective),
        Sense::Maximize => problem_vars.maximise(objective),
    };

    let mut problem = unsolved.using(solver);
    configure(&mut problem);

    let problem = model
        .constraints()
        .iter()
        .fold(problem, |m, constraint| m.with(to_constraint(constraint, &handles)));

    match problem.solve() {
        Ok(solution) => Ok(SolverOutput::optimal(
            handles.iter().map(|&v| solution.value(v)).collect(),
        )),
        Err(ResolutionError::Infeasible) => Ok(SolverOutput::without_solution(SolveStatus::Infeasible)),
        Err(ResolutionError::Unbounded) => Ok(SolverOutput::without_solution(SolveStatus::Unbounded)),
        Err(err) => Err(DistributionError::SolverFault {
            backend,
            message: err.to_string(),
        }),
    }
}

fn variable_definition(spec: &VariableSpec) -> good_lp::VariableDefinition {
    let definition = variable().name(spec.name.clone());
    match spec.domain {
        Domain::Binary => definition.binary(),
        Domain::NonNegative => definition.min(0.0),
    }
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut expression = Expression::with_capacity(expr.len());
    for (var, coefficient) in expr.terms() {
        expression.add_mul(coefficient, handles[var.index()]);
    }
    expression
}

fn to_constraint(constraint: &Constraint, handles: &[Variable]) -> good_lp::Constraint {
    let lhs = to_expression(&constraint.expr, handles);
    match constraint.relation {
        Relation::LessOrEqual => lhs.leq(constraint.rhs),
        Relation::Equal => lhs.eq(constraint.rhs),
        Relation::GreaterOrEqual => lhs.geq(constraint.rhs),
    }
}
