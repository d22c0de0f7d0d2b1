//! Translation of a weight matrix into the fair-assignment MILP.
//!
//! Orientation is `weights[target][object]` throughout.

use std::collections::BTreeMap;

use crate::model::{Constraint, Domain, LinearExpr, Model, Relation, Sense, VarId};
use crate::timing::{Phase, PhaseTimer};

pub const MODEL_NAME: &str = "Fair Distribution Problem";

/// Position of an assignment variable in the weight matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssignmentKey {
    pub target: usize,
    pub object: usize,
}

/// LUTs of type (target, object) → Variable and back.
#[derive(Debug, Clone, Default)]
pub struct AssignmentVariables {
    grid: Vec<Vec<VarId>>,
    keys: BTreeMap<VarId, AssignmentKey>,
}

impl AssignmentVariables {
    pub fn get(&self, target: usize, object: usize) -> VarId {
        self.grid[target][object]
    }

    pub fn key(&self, var: VarId) -> Option<AssignmentKey> {
        self.keys.get(&var).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, AssignmentKey)> + '_ {
        self.keys.iter().map(|(&var, &key)| (var, key))
    }

    pub fn targets(&self) -> usize {
        self.grid.len()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The assembled model together with the tables needed to read a solution.
#[derive(Debug, Clone)]
pub struct Formulation {
    pub model: Model,
    pub assignments: AssignmentVariables,
    /// Summation #1, shared by the objective and the fairness constraints.
    pub cost: LinearExpr,
    /// One per target, empty when fairness is disabled.
    pub deviations: Vec<VarId>,
}

impl Formulation {
    /// Build the model for an already validated weight matrix.
    pub fn build(weights: &[Vec<f64>], objects: usize, fairness: bool) -> Self {
        Self::build_timed(weights, objects, fairness, &mut PhaseTimer::start())
    }

    pub(crate) fn build_timed(
        weights: &[Vec<f64>],
        objects: usize,
        fairness: bool,
        timer: &mut PhaseTimer,
    ) -> Self {
        let mut model = Model::new(MODEL_NAME);

        let assignments = init_variables(&mut model, weights.len(), objects);
        timer.lap(Phase::Preparing);

        let cost = create_cost_expression(&assignments, weights);
        timer.lap(Phase::Summation1);

        let deviations = if fairness {
            constrain_fair_effort(&mut model, &assignments, weights, &cost)
        } else {
            Vec::new()
        };
        timer.lap(Phase::Summation2);

        constrain_objects_assigned_once(&mut model, &assignments, objects);
        set_objective(&mut model, &cost, &deviations);
        timer.lap(Phase::Constraints);

        tracing::debug!(
            variables = model.variables().len(),
            constraints = model.constraints().len(),
            fairness,
            "model formulated"
        );

        Self {
            model,
            assignments,
            cost,
            deviations,
        }
    }
}

/// Create one binary variable per (target, object) pair, row by row.
fn init_variables(model: &mut Model, targets: usize, objects: usize) -> AssignmentVariables {
    let mut assignments = AssignmentVariables {
        grid: Vec::with_capacity(targets),
        keys: BTreeMap::new(),
    };

    for target in 0..targets {
        let row = (0..objects)
            .map(|object| {
                let var = model.add_variable(format!("x_{target}_{object}"), Domain::Binary);
                assignments.keys.insert(var, AssignmentKey { target, object });
                var
            })
            .collect();
        assignments.grid.push(row);
    }

    assignments
}

/// Summation #1: Σ_t Σ_o weight[t][o] · x(t, o)
fn create_cost_expression(assignments: &AssignmentVariables, weights: &[Vec<f64>]) -> LinearExpr {
    assignments
        .iter()
        .map(|(var, key)| (var, weights[key.target][key.object]))
        .collect()
}

/// effort(t) = Σ_o weight[t][o] · x(t, o)
fn effort_expression(assignments: &AssignmentVariables, weights: &[Vec<f64>], target: usize) -> LinearExpr {
    weights[target]
        .iter()
        .enumerate()
        .map(|(object, &weight)| (assignments.get(target, object), weight))
        .collect()
}

/// Summation #2: bound each target's scaled distance from the mean effort.
///
/// With T targets and `cost` = Σ_t effort(t), the mean is cost / T. Scaling
/// by T keeps the constraints free of division:
///
/// ```text
///  T · effort(t) − cost − deviation(t) <= 0
///  cost − T · effort(t) − deviation(t) <= 0
/// ```
///
/// so deviation(t) >= T · |effort(t) − mean|. Minimising Σ deviation(t)
/// makes each bound tight at the optimum.
fn constrain_fair_effort(
    model: &mut Model,
    assignments: &AssignmentVariables,
    weights: &[Vec<f64>],
    cost: &LinearExpr,
) -> Vec<VarId> {
    let total_targets = assignments.targets() as f64;

    (0..assignments.targets())
        .map(|target| {
            let deviation = model.add_variable(format!("deviation_{target}"), Domain::NonNegative);
            let effort = effort_expression(assignments, weights, target);

            let mut above_mean = effort.scaled(total_targets);
            above_mean.add_expr(cost, -1.0);
            let mut below_mean = above_mean.scaled(-1.0);

            above_mean.add_term(deviation, -1.0);
            below_mean.add_term(deviation, -1.0);

            model.add_constraint(Constraint::new(
                format!("effort_above_mean_{target}"),
                above_mean,
                Relation::LessOrEqual,
                0.0,
            ));
            model.add_constraint(Constraint::new(
                format!("effort_below_mean_{target}"),
                below_mean,
                Relation::LessOrEqual,
                0.0,
            ));

            deviation
        })
        .collect()
}

/// Every object must be given to exactly one target.
fn constrain_objects_assigned_once(model: &mut Model, assignments: &AssignmentVariables, objects: usize) {
    for object in 0..objects {
        let assigned: LinearExpr = (0..assignments.targets())
            .map(|target| (assignments.get(target, object), 1.0))
            .collect();
        model.add_constraint(Constraint::new(
            format!("cover_object_{object}"),
            assigned,
            Relation::Equal,
            1.0,
        ));
    }
}

fn set_objective(model: &mut Model, cost: &LinearExpr, deviations: &[VarId]) {
    let mut objective = cost.clone();
    for &deviation in deviations {
        objective.add_term(deviation, 1.0);
    }
    model.set_objective(Sense::Minimize, objective);
}
