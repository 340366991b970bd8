/// Derivative-free simplex minimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMead {
    pub max_iterations: usize,
    /// Stop once the spread of objective values across the simplex falls
    /// below `tolerance * (1 + |best|)`.
    pub tolerance: f64,
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            tolerance: 1e-10,
            initial_step: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    pub fn minimize<F>(&self, objective: F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let dims = start.len();
        let evaluate = |point: &[f64]| {
            let value = objective(point);
            if value.is_nan() {
                f64::INFINITY
            } else {
                value
            }
        };

        if dims == 0 {
            return Minimum {
                point: Vec::new(),
                value: evaluate(start),
                iterations: 0,
                converged: true,
            };
        }

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dims + 1);
        simplex.push((start.to_vec(), evaluate(start)));
        for axis in 0..dims {
            let mut vertex = start.to_vec();
            vertex[axis] += self.initial_step;
            let value = evaluate(&vertex);
            simplex.push((vertex, value));
        }

        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.max_iterations {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            let best = simplex[0].1;
            let worst = simplex[dims].1;
            if (worst - best).abs() <= self.tolerance * (1.0 + best.abs()) {
                converged = true;
                break;
            }
            iterations += 1;

            let centroid: Vec<f64> = (0..dims)
                .map(|axis| simplex[..dims].iter().map(|(v, _)| v[axis]).sum::<f64>() / dims as f64)
                .collect();
            let toward = |coefficient: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&simplex[dims].0)
                    .map(|(c, w)| c + coefficient * (c - w))
                    .collect()
            };

            let reflected = toward(REFLECTION);
            let reflected_value = evaluate(&reflected);
            let second_worst = simplex[dims - 1].1;

            if reflected_value < best {
                let expanded = toward(EXPANSION);
                let expanded_value = evaluate(&expanded);
                simplex[dims] = if expanded_value < reflected_value {
                    (expanded, expanded_value)
                } else {
                    (reflected, reflected_value)
                };
                continue;
            }
            if reflected_value < second_worst {
                simplex[dims] = (reflected, reflected_value);
                continue;
            }

            let contracted = if reflected_value < worst {
                toward(CONTRACTION * REFLECTION)
            } else {
                toward(-CONTRACTION)
            };
            let contracted_value = evaluate(&contracted);
            if contracted_value < worst.min(reflected_value) {
                simplex[dims] = (contracted, contracted_value);
                continue;
            }

            let anchor = simplex[0].0.clone();
            for (vertex, value) in simplex.iter_mut().skip(1) {
                for (coordinate, origin) in vertex.iter_mut().zip(&anchor) {
                    *coordinate = origin + SHRINK * (*coordinate - origin);
                }
                *value = evaluate(vertex);
            }
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (point, value) = simplex.swap_remove(0);
        Minimum {
            point,
            value,
            iterations,
            converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_quadratic_minimum() {
        let result = NelderMead::default().minimize(
            |p| (p[0] - 1.5).powi(2) + 3.0 * (p[1] + 0.25).powi(2),
            &[0.0, 0.0],
        );
        assert!(result.converged);
        assert!((result.point[0] - 1.5).abs() < 1e-4);
        assert!((result.point[1] + 0.25).abs() < 1e-4);
    }

    #[test]
    fn treats_nan_as_worst() {
        let result = NelderMead::default().minimize(
            |p| if p[0] < 0.0 { f64::NAN } else { (p[0] - 0.3).powi(2) },
            &[1.0],
        );
        assert!((result.point[0] - 0.3).abs() < 1e-4);
    }
}
