use crate::error::ValidationError;

/// Check that `weights` is a `targets x objects` matrix of non-negative,
/// finite values.
///
/// Shape is checked before values, so a ragged matrix is always reported as
/// a dimension error even if it also holds negative entries.
pub fn validate_weights(
    targets: usize,
    objects: usize,
    weights: &[Vec<f64>],
) -> Result<(), ValidationError> {
    if weights.len() != targets {
        return Err(ValidationError::RowCount {
            rows: weights.len(),
            targets,
        });
    }

    if let Some((row, columns)) = weights
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|&(_, columns)| columns != objects)
    {
        return Err(ValidationError::ColumnCount {
            row,
            columns,
            objects,
        });
    }

    for (target, row) in weights.iter().enumerate() {
        for (object, &weight) in row.iter().enumerate() {
            if !weight.is_finite() {
                return Err(ValidationError::NonFiniteWeight { target, object });
            }
            if weight < 0.0 {
                return Err(ValidationError::NegativeWeight {
                    target,
                    object,
                    weight,
                });
            }
        }
    }

    Ok(())
}
