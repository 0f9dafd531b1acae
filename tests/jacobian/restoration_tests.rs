use dofopt_rs::aggregator::{GlobalDofs, OutputShape};
use dofopt_rs::error::{DofError, Result};
use dofopt_rs::function::Function;
use dofopt_rs::models::{Adder, Identity};
use dofopt_rs::owner::{Optimizable, Owners};
use ndarray::array;

/// Identity function that refuses to be evaluated above `limit`.
fn guarded(owners: &mut Owners, value: f64, limit: f64) -> Function {
    let id = owners.insert_with(|id| Identity::new(id, value));
    Function::new(id, "guarded", move |owners: &Owners| {
        let value = owners.get_as::<Identity>(id)?.value();
        if value > limit {
            return Err(DofError::FunctionEvaluation(format!(
                "{} is above the limit {}",
                value, limit
            )));
        }
        Ok(value.into())
    })
}

#[test]
fn test_fd_jac_restores_x() -> Result<()> {
    let mut owners = Owners::new();
    let adder = owners.insert_with(|id| Adder::new(id, 3));
    owners.get_mut(adder)?.set_full_x(&array![0.5, -1.5, 2.5])?;

    let mut dofs = GlobalDofs::from_functions(&owners, vec![Adder::function(adder)])?;
    let x0 = dofs.x(&owners)?;

    dofs.fd_jac(&mut owners, false)?;
    assert_eq!(dofs.x(&owners)?, x0);
    dofs.fd_jac(&mut owners, true)?;
    assert_eq!(dofs.x(&owners)?, x0);

    Ok(())
}

#[test]
fn test_fd_jac_restores_x_on_error() -> Result<()> {
    let mut owners = Owners::new();
    let adder = owners.insert_with(|id| Adder::new(id, 2));
    let guard = guarded(&mut owners, 1.0, 1.0);
    let guard_owner = guard.owner();

    let mut dofs = GlobalDofs::from_functions(&owners, vec![Adder::function(adder), guard])?;
    let x0 = array![3.0, 4.0, 1.0];
    dofs.set_x(&mut owners, &x0)?;

    // The adder columns succeed, the guarded column fails on its first probe
    let result = dofs.fd_jac(&mut owners, false);
    assert!(matches!(result, Err(DofError::FunctionEvaluation(_))));
    assert_eq!(dofs.x(&owners)?, x0);
    assert_eq!(owners.get_as::<Identity>(guard_owner)?.value(), 1.0);

    // Output lengths were recorded before the sweep started
    assert_eq!(dofs.nvals_per_func(), Some(&[1, 1][..]));

    Ok(())
}

#[test]
fn test_failed_first_evaluation() -> Result<()> {
    let mut owners = Owners::new();
    let guard = guarded(&mut owners, 2.0, 1.0);
    let mut dofs = GlobalDofs::from_functions(&owners, vec![guard])?;

    assert!(dofs.jac(&mut owners).is_err());
    assert_eq!(dofs.output_shape(), &OutputShape::Unknown);
    assert_eq!(dofs.x(&owners)?, array![2.0]);

    Ok(())
}
