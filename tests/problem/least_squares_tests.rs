use crate::test_helpers::{approx_eq, matrix_approx_eq};
use dofopt_rs::error::{DofError, Result};
use dofopt_rs::function::Function;
use dofopt_rs::jacobian::{problem_jacobian, DiffConfig};
use dofopt_rs::models::{Adder, Identity, Rosenbrock};
use dofopt_rs::owner::Owners;
use dofopt_rs::problem::{DofProblem, LeastSquares, LeastSquaresTerm, Problem};
use ndarray::{array, Array1};
use std::cell::Cell;

/// Gauss-Newton iterations on the normal equations of a 2×2 problem.
fn gauss_newton_2d<P: Problem>(
    problem: &P,
    mut x: Array1<f64>,
    iterations: usize,
) -> Result<Array1<f64>> {
    for _ in 0..iterations {
        let r = problem.eval(&x)?;
        let j = problem.jacobian(&x)?;
        let jtj = j.t().dot(&j);
        let jtr = j.t().dot(&r);

        let det = jtj[[0, 0]] * jtj[[1, 1]] - jtj[[0, 1]] * jtj[[1, 0]];
        let dx0 = (jtj[[1, 1]] * jtr[0] - jtj[[0, 1]] * jtr[1]) / det;
        let dx1 = (jtj[[0, 0]] * jtr[1] - jtj[[1, 0]] * jtr[0]) / det;
        x = &x - &array![dx0, dx1];
    }
    Ok(x)
}

#[test]
fn test_rosenbrock_solves() -> Result<()> {
    let mut owners = Owners::new();
    let rosen = owners.insert_with(|id| Rosenbrock::with_coefficients(id, 1.0, 3.0).unwrap());
    let objective = LeastSquares::new(
        &owners,
        vec![LeastSquaresTerm::residual(Rosenbrock::terms_function(rosen))],
    )?;

    let problem = DofProblem::new(owners, objective)?;
    let start = problem.initial_params()?;
    assert_eq!(start, array![0.0, 0.0]);

    let solution = gauss_newton_2d(&problem, start, 20)?;
    assert!(approx_eq(solution[0], 1.0, 0.0, 1e-10));
    assert!(approx_eq(solution[1], 1.0, 0.0, 1e-10));
    assert!(problem.eval_cost(&solution)? < 1e-20);

    // The owners keep the last evaluated point
    let owners = problem.into_owners();
    let final_x = owners.get(rosen)?.full_x();
    assert!(approx_eq(final_x[0], 1.0, 0.0, 1e-10));

    Ok(())
}

#[test]
fn test_fixed_dofs_stay_put() -> Result<()> {
    let mut owners = Owners::new();
    let adder = owners
        .insert_with(|id| Adder::with_names(id, &[1.0, 2.0, 3.0], &["a", "b", "c"]).unwrap());
    if let Some(dofs) = owners.get_mut(adder)?.dofs_mut() {
        dofs.fix("b")?;
    }

    let objective = LeastSquares::new(
        &owners,
        vec![LeastSquaresTerm::new(Adder::function(adder), 10.0, 1.0)?],
    )?;
    let problem = DofProblem::new(owners, objective)?;
    assert_eq!(problem.parameter_count(), 2);
    assert_eq!(problem.residual_count(), 1);

    // a + 2 + c - 10
    assert_eq!(problem.eval(&array![3.0, 4.0])?, array![-1.0]);
    assert_eq!(problem.jacobian(&array![3.0, 4.0])?, array![[1.0, 1.0]]);

    let owners = problem.into_owners();
    assert_eq!(owners.get(adder)?.full_x(), array![3.0, 2.0, 4.0]);

    Ok(())
}

#[test]
fn test_problem_jacobian_matches_analytic() -> Result<()> {
    let mut owners = Owners::new();
    let identity = owners.insert_with(|id| Identity::new(id, 0.0));
    let rosen = owners.insert_with(Rosenbrock::new);

    let terms = vec![
        LeastSquaresTerm::new(Identity::function(identity), 2.0, 0.25)?,
        LeastSquaresTerm::new(Rosenbrock::terms_function(rosen), 0.5, 4.0)?,
        LeastSquaresTerm::residual(Function::try_of(rosen, "x_squared", |r: &Rosenbrock| {
            Ok(r.term1()?.powi(2))
        })),
    ];
    let objective = LeastSquares::new(&owners, terms)?;
    let problem = DofProblem::new(owners, objective)?;

    let params = array![1.5, -0.5, 2.0];
    let analytic = problem.jacobian(&params)?;
    let numeric = problem_jacobian(&problem, &params, &DiffConfig::centered(1e-6))?;

    assert_eq!(analytic.dim(), (4, 3));
    assert!(matrix_approx_eq(&analytic, &numeric, 1e-6, 1e-6));

    // 0.5·(1.5 - 2), then 2·(term1 - 0.5), then (x - 1)²
    let residuals = problem.eval(&params)?;
    assert!(approx_eq(residuals[0], -0.25, 0.0, 1e-15));
    assert!(approx_eq(residuals[1], 2.0 * (-1.5 - 0.5), 0.0, 1e-15));
    assert!(approx_eq(residuals[3], 2.25, 0.0, 1e-15));

    Ok(())
}

/// Problem that loses two residuals after its first evaluation.
struct Shrinking {
    calls: Cell<usize>,
}

impl Problem for Shrinking {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let calls = self.calls.get();
        self.calls.set(calls + 1);
        if calls == 0 {
            Ok(array![params[0], 2.0 * params[0], 3.0 * params[0]])
        } else {
            Ok(array![params[0]])
        }
    }

    fn parameter_count(&self) -> usize {
        1
    }

    fn residual_count(&self) -> usize {
        3
    }
}

#[test]
fn test_problem_jacobian_rejects_length_change() {
    for config in [DiffConfig::default(), DiffConfig::centered(1e-6)] {
        let problem = Shrinking {
            calls: Cell::new(0),
        };
        let result = problem_jacobian(&problem, &array![1.0], &config);
        assert!(matches!(result, Err(DofError::DimensionMismatch(_))));
    }
}
