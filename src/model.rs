//! Solver-neutral description of a mixed integer linear program.
//!
//! A [`Model`] only records variables, labelled constraints and an objective.
//! Backends in [`crate::solver`] translate it into whatever their engine
//! expects, and [`crate::lp_format`] renders it as LP text.

use std::collections::BTreeMap;

/// Handle to a variable, valid only for the [`Model`] that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Integer variable restricted to {0, 1}.
    Binary,
    /// Continuous variable bounded below by zero.
    NonNegative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    pub domain: Domain,
}

/// Sum of `coefficient * variable` terms, kept in variable-creation order.
///
/// Terms on the same variable are merged and exact zeros are dropped, so two
/// expressions built from the same inputs always compare and render equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, f64>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        let merged = self.terms.get(&var).copied().unwrap_or(0.0) + coefficient;
        if merged == 0.0 {
            self.terms.remove(&var);
        } else {
            self.terms.insert(var, merged);
        }
    }

    pub fn add_expr(&mut self, other: &LinearExpr, factor: f64) {
        for (&var, &coefficient) in &other.terms {
            self.add_term(var, coefficient * factor);
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        let mut expr = Self::new();
        expr.add_expr(self, factor);
        expr
    }

    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms.iter().map(|(&var, &coefficient)| (var, coefficient))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Value of the expression under `values`, indexed by [`VarId::index`].
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms()
            .map(|(var, coefficient)| coefficient * values.get(var.index()).copied().unwrap_or(0.0))
            .sum()
    }
}

impl FromIterator<(VarId, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        let mut expr = Self::new();
        for (var, coefficient) in iter {
            expr.add_term(var, coefficient);
        }
        expr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessOrEqual,
    Equal,
    GreaterOrEqual,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::LessOrEqual => "<=",
            Relation::Equal => "=",
            Relation::GreaterOrEqual => ">=",
        }
    }

    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Relation::LessOrEqual => lhs <= rhs,
            Relation::Equal => lhs == rhs,
            Relation::GreaterOrEqual => lhs >= rhs,
        }
    }
}

/// `expr <relation> rhs`, labelled for diagnostics and LP export.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub label: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(label: impl Into<String>, expr: LinearExpr, relation: Relation, rhs: f64) -> Self {
        Self {
            label: label.into(),
            expr,
            relation,
            rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    variables: Vec<VariableSpec>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
    sense: Sense,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: LinearExpr::new(),
            sense: Sense::Minimize,
        }
    }

    pub fn add_variable(&mut self, name: impl Into<String>, domain: Domain) -> VarId {
        self.variables.push(VariableSpec {
            name: name.into(),
            domain,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn set_objective(&mut self, sense: Sense, objective: LinearExpr) {
        self.sense = sense;
        self.objective = objective;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    pub fn variable(&self, var: VarId) -> &VariableSpec {
        &self.variables[var.index()]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// First constraint that has no terms and whose constant side makes it
    /// unsatisfiable, e.g. `0 = 1`.
    pub fn trivially_violated(&self) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.expr.is_empty() && !c.relation.holds(0.0, c.rhs))
    }
}
