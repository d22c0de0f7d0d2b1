//! Fair distribution of indivisible objects among targets.
//!
//! Given a `weights[target][object]` cost matrix, [`FairDistributor`] builds a
//! mixed integer linear program that gives every object to exactly one
//! target, minimising the total weight plus, optionally, how far each
//! target's effort strays from the mean. Solving is delegated to a
//! [`SolverBackend`].

pub mod distributor;
pub mod error;
pub mod extract;
pub mod formulation;
pub mod lp_format;
pub mod model;
pub mod solver;
pub mod timing;
pub mod types;
pub mod validate;

pub use distributor::{DistributeOptions, Distribution, FairDistributor};
pub use error::{DistributionError, ValidationError};
pub use extract::Assignment;
pub use solver::{SolveStatus, SolverBackend, SolverOutput, backend_by_name, default_backend};
pub use types::{Problem, Solution};
