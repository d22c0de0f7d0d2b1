use std::path::PathBuf;

use serde::Serialize;

use crate::error::{DistributionError, Result, ValidationError};
use crate::extract::{Assignment, create_assignment};
use crate::formulation::Formulation;
use crate::lp_format::write_lp;
use crate::model::Model;
use crate::solver::{SolveStatus, SolverBackend, SolverOutput, default_backend};
use crate::timing::{Phase, PhaseTimer, PhaseTimings};
use crate::validate::validate_weights;

/// Holds the targets, objects and `weights[target][object]` of one problem.
///
/// Only the input data lives here. Every call to [`FairDistributor::distribute`]
/// builds and discards its own model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FairDistributor {
    targets: Vec<String>,
    objects: Vec<String>,
    weights: Vec<Vec<f64>>,
}

/// Per-call settings for [`FairDistributor::distribute`].
#[derive(Debug, Clone, PartialEq)]
pub struct DistributeOptions {
    /// Also minimise the spread of per-target effort. On by default.
    pub fairness: bool,
    /// Write the composed model as LP text here before solving.
    pub output: Option<PathBuf>,
}

impl Default for DistributeOptions {
    fn default() -> Self {
        Self {
            fairness: true,
            output: None,
        }
    }
}

impl DistributeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fairness(mut self, fairness: bool) -> Self {
        self.fairness = fairness;
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }
}

/// Result of one `distribute` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub status: SolveStatus,
    /// Empty unless `status` is optimal.
    pub assignment: Assignment,
    /// Objective value at the optimum.
    pub objective: Option<f64>,
    pub timings: PhaseTimings,
}

impl Distribution {
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// The assignment, or [`DistributionError::Unsolved`] if there is none.
    pub fn into_assignment(self) -> Result<Assignment> {
        match self.status {
            SolveStatus::Optimal => Ok(self.assignment),
            status => Err(DistributionError::Unsolved(status)),
        }
    }
}

impl FairDistributor {
    pub fn new<T, O>(
        targets: impl IntoIterator<Item = T>,
        objects: impl IntoIterator<Item = O>,
        weights: Vec<Vec<f64>>,
    ) -> Self
    where
        T: Into<String>,
        O: Into<String>,
    {
        let mut distributor = Self::default();
        distributor.set_data(targets, objects, weights);
        distributor
    }

    /// Replace all input data. Not validated until asked.
    pub fn set_data<T, O>(
        &mut self,
        targets: impl IntoIterator<Item = T>,
        objects: impl IntoIterator<Item = O>,
        weights: Vec<Vec<f64>>,
    ) where
        T: Into<String>,
        O: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self.objects = objects.into_iter().map(Into::into).collect();
        self.weights = weights;
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn objects(&self) -> &[String] {
        &self.objects
    }

    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    /// Yes/no form of [`FairDistributor::check`].
    pub fn validate(&self) -> bool {
        self.check().is_ok()
    }

    pub fn check(&self) -> std::result::Result<(), ValidationError> {
        validate_weights(self.targets.len(), self.objects.len(), &self.weights)
    }

    /// Validate and build the model without solving it.
    pub fn formulate(&self, fairness: bool) -> std::result::Result<Formulation, ValidationError> {
        self.check()?;
        Ok(Formulation::build(&self.weights, self.objects.len(), fairness))
    }

    /// Solve with [`default_backend`].
    pub fn distribute(&self, options: &DistributeOptions) -> Result<Distribution> {
        self.distribute_with(options, &mut default_backend())
    }

    /// Validate, formulate, optionally export, solve and extract.
    ///
    /// Invalid input fails before any model is built. A model without an
    /// optimal solution is not an error: the returned [`Distribution`]
    /// carries the status and an empty assignment.
    pub fn distribute_with<B>(&self, options: &DistributeOptions, backend: &mut B) -> Result<Distribution>
    where
        B: SolverBackend + ?Sized,
    {
        let _span = tracing::debug_span!(
            "distribute",
            targets = self.targets.len(),
            objects = self.objects.len(),
            backend = backend.name(),
        )
        .entered();

        let mut timer = PhaseTimer::start();
        self.check()?;
        timer.lap(Phase::Validating);

        let formulation = Formulation::build_timed(
            &self.weights,
            self.objects.len(),
            options.fairness,
            &mut timer,
        );

        if let Some(path) = &options.output {
            write_lp(&formulation.model, path)?;
        }
        timer.skip();

        let output = run_solver(&formulation.model, backend)?;
        timer.lap(Phase::Solving);

        let status = output.status();
        let assignment = create_assignment(
            &output,
            &formulation.assignments,
            &self.targets,
            &self.objects,
        );
        let objective = (status == SolveStatus::Optimal)
            .then(|| formulation.model.objective().evaluate(output.values()));
        let timings = timer.finish();

        match status {
            SolveStatus::Optimal => tracing::info!(
                objective = objective.unwrap_or_default(),
                targets_used = assignment.len(),
                "distribution solved"
            ),
            status => tracing::warn!(%status, "no optimal distribution"),
        }

        Ok(Distribution {
            status,
            assignment,
            objective,
            timings,
        })
    }
}

fn run_solver<B>(model: &Model, backend: &mut B) -> Result<SolverOutput>
where
    B: SolverBackend + ?Sized,
{
    if let Some(constraint) = model.trivially_violated() {
        tracing::debug!(constraint = %constraint.label, "constraint cannot hold, skipping solver");
        return Ok(SolverOutput::without_solution(SolveStatus::Infeasible));
    }
    if model.variables().is_empty() {
        return Ok(SolverOutput::optimal(Vec::new()));
    }
    backend.solve(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Backend driven by a closure, for exercising status handling.
    struct FnBackend<F>(F);

    impl<F> SolverBackend for FnBackend<F>
    where
        F: FnMut(&Model) -> Result<SolverOutput>,
    {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn solve(&mut self, model: &Model) -> Result<SolverOutput> {
            (self.0)(model)
        }
    }

    fn scripted<F>(solve: F) -> FnBackend<F>
    where
        F: FnMut(&Model) -> Result<SolverOutput>,
    {
        FnBackend(solve)
    }

    fn never_called() -> FnBackend<impl FnMut(&Model) -> Result<SolverOutput>> {
        scripted(|_| panic!("solver must not be invoked"))
    }

    fn three_by_three() -> FairDistributor {
        FairDistributor::new(
            ["u1", "u2", "u3"],
            ["t1", "t2", "t3"],
            vec![
                vec![1.0, 2.0, 3.0],
                vec![3.0, 2.0, 1.0],
                vec![2.0, 3.0, 1.0],
            ],
        )
    }

    #[test]
    fn constructor_stores_data() {
        let distributor = three_by_three();
        assert_eq!(distributor.targets(), ["u1", "u2", "u3"]);
        assert_eq!(distributor.objects(), ["t1", "t2", "t3"]);
        assert_eq!(distributor.weights()[1], vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn set_data_replaces_everything() {
        let mut distributor = three_by_three();
        distributor.set_data(["a".to_string()], ["b".to_string()], vec![vec![7.0]]);

        assert_eq!(distributor.targets(), ["a"]);
        assert_eq!(distributor.objects(), ["b"]);
        assert_eq!(distributor.weights(), [vec![7.0]]);
    }

    #[test]
    fn default_instances_start_empty_and_independent() {
        let mut first = FairDistributor::default();
        let second = FairDistributor::default();
        first.set_data(["x"], ["y"], vec![vec![1.0]]);

        assert!(second.targets().is_empty());
        assert!(second.weights().is_empty());
        assert!(second.validate());
    }

    #[test]
    fn validate_is_repeatable() {
        let valid = three_by_three();
        assert!(valid.validate());
        assert!(valid.validate());

        let invalid = FairDistributor::new(["u1"], ["t1", "t2", "t3"], vec![vec![1.0, 2.0, 3.0, 2.0]]);
        assert!(!invalid.validate());
        assert!(!invalid.validate());
        assert_eq!(invalid.check(), invalid.check());
    }

    #[test]
    fn invalid_input_never_reaches_solver_or_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.lp");
        let distributor = FairDistributor::new(
            ["u1", "u2"],
            ["t1", "t2"],
            vec![vec![-1.0, 2.0], vec![3.0, -4.0]],
        );

        let err = distributor
            .distribute_with(&DistributeOptions::new().output(&path), &mut never_called())
            .unwrap_err();

        assert!(matches!(
            err,
            DistributionError::Invalid(ValidationError::NegativeWeight { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn infeasible_status_is_reported_not_raised() {
        let mut backend = scripted(|_| Ok(SolverOutput::without_solution(SolveStatus::Infeasible)));
        let distribution = three_by_three()
            .distribute_with(&DistributeOptions::default(), &mut backend)
            .unwrap();

        assert_eq!(distribution.status, SolveStatus::Infeasible);
        assert!(distribution.assignment.is_empty());
        assert_eq!(distribution.objective, None);
        assert!(matches!(
            distribution.into_assignment(),
            Err(DistributionError::Unsolved(SolveStatus::Infeasible))
        ));
    }

    #[test]
    fn solver_fault_propagates() {
        let mut backend = scripted(|_| {
            Err(DistributionError::SolverFault {
                backend: "scripted",
                message: "crashed".to_string(),
            })
        });
        let err = three_by_three()
            .distribute_with(&DistributeOptions::default(), &mut backend)
            .unwrap_err();

        assert!(matches!(err, DistributionError::SolverFault { .. }));
    }

    #[test]
    fn objects_without_targets_is_infeasible_without_solving() {
        let distributor = FairDistributor::new(Vec::<String>::new(), ["t1"], vec![]);
        let distribution = distributor
            .distribute_with(&DistributeOptions::default(), &mut never_called())
            .unwrap();
        assert_eq!(distribution.status, SolveStatus::Infeasible);
    }

    #[test]
    fn empty_problem_is_trivially_optimal() {
        let distribution = FairDistributor::default()
            .distribute_with(&DistributeOptions::default(), &mut never_called())
            .unwrap();
        assert!(distribution.is_optimal());
        assert!(distribution.assignment.is_empty());
        assert_eq!(distribution.objective, Some(0.0));
    }

    #[test]
    fn backend_receives_the_composed_model() {
        let mut seen = None;
        let mut backend = scripted(|model| {
            seen = Some((model.variables().len(), model.constraints().len()));
            Ok(SolverOutput::without_solution(SolveStatus::Unbounded))
        });
        three_by_three()
            .distribute_with(&DistributeOptions::default(), &mut backend)
            .unwrap();

        // 9 assignments + 3 deviations; 2 per target + 1 per object
        assert_eq!(seen, Some((12, 9)));
    }

    #[test]
    fn records_every_phase() {
        let mut backend = scripted(|model| {
            Ok(SolverOutput::optimal(vec![0.0; model.variables().len()]))
        });
        let distribution = three_by_three()
            .distribute_with(&DistributeOptions::default(), &mut backend)
            .unwrap();

        let phases: Vec<Phase> = distribution.timings.iter().map(|t| t.phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Validating,
                Phase::Preparing,
                Phase::Summation1,
                Phase::Summation2,
                Phase::Constraints,
                Phase::Solving,
                Phase::Total,
            ]
        );
    }

    #[test]
    fn exports_model_before_solving() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.lp");
        let distributor = three_by_three();
        let options = DistributeOptions::new().fairness(false).output(&path);

        let mut backend = scripted(|_| {
            assert!(path.exists());
            Ok(SolverOutput::without_solution(SolveStatus::Infeasible))
        });
        distributor.distribute_with(&options, &mut backend).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let expected = crate::lp_format::to_lp_string(&distributor.formulate(false).unwrap().model);
        assert_eq!(written, expected);
        assert!(!written.contains("deviation"));
    }

    #[cfg(feature = "microlp")]
    mod solved {
        use super::*;
        use crate::solver::MicroLp;
        use proptest::prelude::*;

        fn solve(distributor: &FairDistributor, fairness: bool) -> Distribution {
            distributor
                .distribute_with(&DistributeOptions::new().fairness(fairness), &mut MicroLp)
                .unwrap()
        }

        #[test]
        fn pairs_cheapest_objects() {
            let distributor = FairDistributor::new(
                ["task1", "task2"],
                ["user1", "user2"],
                vec![vec![1.0, 2.0], vec![2.0, 1.0]],
            );
            let distribution = solve(&distributor, true);

            assert!(distribution.is_optimal());
            assert_eq!(
                distribution.assignment,
                Assignment::from([
                    ("task1".to_string(), vec!["user1".to_string()]),
                    ("task2".to_string(), vec!["user2".to_string()]),
                ])
            );
        }

        #[test]
        fn balances_three_teams_over_four_tasks() {
            let distributor = FairDistributor::new(
                ["Team A", "Team B", "Team C"],
                ["Task 1", "Task 2", "Task 3", "Task 4"],
                vec![
                    vec![1.0, 2.0, 3.0, 2.0],
                    vec![3.0, 1.0, 4.0, 2.0],
                    vec![3.0, 4.0, 1.0, 1.0],
                ],
            );
            let distribution = solve(&distributor, true);

            assert_eq!(
                distribution.assignment,
                Assignment::from([
                    ("Team A".to_string(), vec!["Task 1".to_string()]),
                    ("Team B".to_string(), vec!["Task 2".to_string()]),
                    ("Team C".to_string(), vec!["Task 3".to_string(), "Task 4".to_string()]),
                ])
            );
            let objective = distribution.objective.unwrap();
            assert!((objective - 8.0).abs() < 1e-6, "objective {objective}");
        }

        #[test]
        fn fairness_spreads_uniformly_cheap_work() {
            // Target "cheap" is cheapest for both objects.
            let distributor = FairDistributor::new(
                ["cheap", "pricey"],
                ["o1", "o2"],
                vec![vec![1.0, 1.0], vec![2.0, 2.0]],
            );

            let greedy = solve(&distributor, false);
            assert_eq!(greedy.assignment.len(), 1);
            assert_eq!(greedy.assignment["cheap"].len(), 2);

            let fair = solve(&distributor, true);
            assert_eq!(fair.assignment["cheap"].len(), 1);
            assert_eq!(fair.assignment["pricey"].len(), 1);
        }

        #[test]
        fn targets_without_objects_is_optimal_and_empty() {
            let distributor = FairDistributor::new(["a", "b"], Vec::<String>::new(), vec![vec![], vec![]]);
            let distribution = solve(&distributor, true);
            assert!(distribution.is_optimal());
            assert!(distribution.assignment.is_empty());
        }

        fn weight_matrix() -> impl Strategy<Value = Vec<Vec<f64>>> {
            (1usize..=3, 0usize..=4).prop_flat_map(|(targets, objects)| {
                prop::collection::vec(
                    prop::collection::vec((0u8..10).prop_map(f64::from), objects),
                    targets,
                )
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn every_object_assigned_exactly_once(weights in weight_matrix(), fairness in any::<bool>()) {
                let targets: Vec<String> = (0..weights.len()).map(|t| format!("target_{t}")).collect();
                let objects: Vec<String> = (0..weights[0].len()).map(|o| format!("object_{o}")).collect();
                let distributor = FairDistributor::new(targets, objects.clone(), weights);

                let distribution = solve(&distributor, fairness);
                prop_assert!(distribution.is_optimal());

                let mut assigned: Vec<String> = distribution.assignment.into_values().flatten().collect();
                assigned.sort();
                let mut expected = objects;
                expected.sort();
                prop_assert_eq!(assigned, expected);
            }
        }
    }
}
