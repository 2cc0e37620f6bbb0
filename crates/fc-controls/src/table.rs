//! Breakpoint tables for scheduled gains.

use fc_props::PropertyManager;

use crate::error::{ControlError, ControlResult};
use crate::value::Parameter;

/// Behaviour outside the breakpoint domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extrapolation {
    /// Hold the edge value.
    #[default]
    Clamp,
    /// Continue the slope of the edge segment.
    Linear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    /// `f(row)`.
    OneD {
        row: Parameter,
        keys: Vec<f64>,
        values: Vec<f64>,
        extrapolation: Extrapolation,
    },
    /// `f(row, column)`; `data[r][c]`.
    TwoD {
        row: Parameter,
        column: Parameter,
        row_keys: Vec<f64>,
        column_keys: Vec<f64>,
        data: Vec<Vec<f64>>,
        extrapolation: Extrapolation,
    },
}

fn check_keys(keys: &[f64], what: &str) -> ControlResult<()> {
    if keys.is_empty() {
        return Err(ControlError::InvalidConfig {
            component: "table".into(),
            what: format!("{what} keys are empty"),
        });
    }
    if keys.iter().any(|k| !k.is_finite()) || keys.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ControlError::InvalidConfig {
            component: "table".into(),
            what: format!("{what} keys must be finite and strictly increasing"),
        });
    }
    Ok(())
}

/// Piecewise-linear interpolation over sorted `keys`.
///
/// A NaN key yields NaN, which the owning component reports as a run failure.
pub fn interpolate(keys: &[f64], values: &[f64], x: f64, extrapolation: Extrapolation) -> f64 {
    let n = keys.len().min(values.len());
    match n {
        0 => return 0.0,
        _ if x.is_nan() => return f64::NAN,
        1 => return values[0],
        _ => {}
    }
    let segment = if x <= keys[0] {
        if extrapolation == Extrapolation::Clamp {
            return values[0];
        }
        0
    } else if x >= keys[n - 1] {
        if extrapolation == Extrapolation::Clamp {
            return values[n - 1];
        }
        n - 2
    } else {
        // first key strictly greater than x, minus one
        keys[..n].partition_point(|k| *k <= x) - 1
    };
    let (x0, x1) = (keys[segment], keys[segment + 1]);
    let (y0, y1) = (values[segment], values[segment + 1]);
    let factor = (x - x0) / (x1 - x0);
    y0 + factor * (y1 - y0)
}

impl Table {
    pub fn one_d(
        row: Parameter,
        keys: Vec<f64>,
        values: Vec<f64>,
        extrapolation: Extrapolation,
    ) -> ControlResult<Self> {
        check_keys(&keys, "row")?;
        if keys.len() != values.len() {
            return Err(ControlError::InvalidConfig {
                component: "table".into(),
                what: format!("{} keys but {} values", keys.len(), values.len()),
            });
        }
        Ok(Self::OneD {
            row,
            keys,
            values,
            extrapolation,
        })
    }

    pub fn two_d(
        row: Parameter,
        column: Parameter,
        row_keys: Vec<f64>,
        column_keys: Vec<f64>,
        data: Vec<Vec<f64>>,
        extrapolation: Extrapolation,
    ) -> ControlResult<Self> {
        check_keys(&row_keys, "row")?;
        check_keys(&column_keys, "column")?;
        if data.len() != row_keys.len() || data.iter().any(|r| r.len() != column_keys.len()) {
            return Err(ControlError::InvalidConfig {
                component: "table".into(),
                what: format!(
                    "data must be {} rows of {} columns",
                    row_keys.len(),
                    column_keys.len()
                ),
            });
        }
        Ok(Self::TwoD {
            row,
            column,
            row_keys,
            column_keys,
            data,
            extrapolation,
        })
    }

    /// Look up at the current values of the independent properties.
    pub fn value(&self, props: &PropertyManager) -> f64 {
        match self {
            Self::OneD {
                row,
                keys,
                values,
                extrapolation,
            } => interpolate(keys, values, row.value(props), *extrapolation),
            Self::TwoD {
                row,
                column,
                row_keys,
                column_keys,
                data,
                extrapolation,
            } => {
                let c = column.value(props);
                let column_at: Vec<f64> = data
                    .iter()
                    .map(|r| interpolate(column_keys, r, c, *extrapolation))
                    .collect();
                interpolate(row_keys, &column_at, row.value(props), *extrapolation)
            }
        }
    }
}
