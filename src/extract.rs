use std::collections::BTreeMap;

use crate::formulation::AssignmentVariables;
use crate::solver::SolverOutput;

/// Target label → labels of the objects it received.
pub type Assignment = BTreeMap<String, Vec<String>>;

/// Map every active assignment variable back to its (target, object) labels.
///
/// Variables are read in creation order, so each target's objects keep the
/// order of `objects`. Targets that receive nothing are left out.
pub fn create_assignment(
    output: &SolverOutput,
    assignments: &AssignmentVariables,
    targets: &[String],
    objects: &[String],
) -> Assignment {
    let mut assignment = Assignment::new();

    for (var, key) in assignments.iter() {
        let Some(value) = output.value(var) else {
            continue;
        };
        // Binary values come back as floats close to 0 or 1
        if value.round() <= 0.0 {
            continue;
        }

        assignment
            .entry(targets[key.target].clone())
            .or_default()
            .push(objects[key.object].clone());
    }

    assignment
}
