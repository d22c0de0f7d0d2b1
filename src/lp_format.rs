//! CPLEX LP text rendering of a [`Model`].

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::DistributionError;
use crate::model::{Domain, LinearExpr, Model, Sense};

/// Render `model` as LP text. Output depends only on the model, so equal
/// models produce byte-identical text.
pub fn to_lp_string(model: &Model) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "\\* {} *\\", model.name());
    out.push_str(match model.sense() {
        Sense::Minimize => "Minimize\n",
        Sense::Maximize => "Maximize\n",
    });
    let _ = writeln!(out, "obj: {}", render_expr(model, model.objective()));

    out.push_str("Subject To\n");
    for constraint in model.constraints() {
        let _ = writeln!(
            out,
            "{}: {} {} {}",
            constraint.label,
            render_expr(model, &constraint.expr),
            constraint.relation.symbol(),
            constraint.rhs
        );
    }

    let continuous: Vec<&str> = names_in(model, Domain::NonNegative).collect();
    if !continuous.is_empty() {
        out.push_str("Bounds\n");
        for name in continuous {
            let _ = writeln!(out, "{name} >= 0");
        }
    }

    let binaries: Vec<&str> = names_in(model, Domain::Binary).collect();
    if !binaries.is_empty() {
        out.push_str("Binaries\n");
        for name in binaries {
            let _ = writeln!(out, "{name}");
        }
    }

    out.push_str("End\n");
    out
}

/// Write the LP text for `model` to `path`, replacing any existing file.
pub fn write_lp(model: &Model, path: &Path) -> Result<(), DistributionError> {
    fs::write(path, to_lp_string(model)).map_err(|source| DistributionError::ModelExport {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "wrote LP model");
    Ok(())
}

fn names_in(model: &Model, domain: Domain) -> impl Iterator<Item = &str> {
    model
        .variables()
        .iter()
        .filter(move |v| v.domain == domain)
        .map(|v| v.name.as_str())
}

fn render_expr(model: &Model, expr: &LinearExpr) -> String {
    if expr.is_empty() {
        return "0".to_string();
    }

    let mut out = String::new();
    for (position, (var, coefficient)) in expr.terms().enumerate() {
        let negative = coefficient < 0.0;
        match (position, negative) {
            (0, false) => {}
            (0, true) => out.push_str("- "),
            (_, false) => out.push_str(" + "),
            (_, true) => out.push_str(" - "),
        }

        let magnitude = coefficient.abs();
        if magnitude != 1.0 {
            let _ = write!(out, "{magnitude} ");
        }
        out.push_str(&model.variable(var).name);
    }
    out
}
