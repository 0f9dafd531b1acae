use crate::test_helpers::{array_approx_eq, matrix_approx_eq, random_x};
use dofopt_rs::aggregator::GlobalDofs;
use dofopt_rs::error::Result;
use dofopt_rs::function::Function;
use dofopt_rs::models::{Adder, Affine};
use dofopt_rs::owner::{OwnerId, Owners};
use ndarray::{s, Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Expected output block of one function and its Jacobian.
struct Block {
    values: Array1<f64>,
    jacobian: Array2<f64>,
}

fn affine(owners: &mut Owners, rng: &mut ChaCha8Rng, nparams: usize, nvals: usize) -> OwnerId {
    owners.insert_with(|id| Affine::random(id, nparams, nvals, rng))
}

fn expected_block(owners: &Owners, id: OwnerId, function: &Function) -> Result<Block> {
    let values = function.evaluate(owners)?.into_array();
    let jacobian = match owners.get_as::<Affine>(id) {
        Ok(affine) => affine.a().clone(),
        Err(_) => Array2::ones((1, owners.get(id)?.full_x().len())),
    };
    Ok(Block { values, jacobian })
}

/// Stack blocks into the expected output and block-diagonal Jacobian.
fn assemble(blocks: &[Block]) -> (Array1<f64>, Array2<f64>) {
    let nvals: usize = blocks.iter().map(|b| b.jacobian.nrows()).sum();
    let nparams: usize = blocks.iter().map(|b| b.jacobian.ncols()).sum();

    let mut f = Array1::zeros(nvals);
    let mut jac = Array2::zeros((nvals, nparams));
    let (mut row, mut col) = (0, 0);
    for block in blocks {
        let (m, n) = block.jacobian.dim();
        f.slice_mut(s![row..row + m]).assign(&block.values);
        jac.slice_mut(s![row..row + m, col..col + n])
            .assign(&block.jacobian);
        row += m;
        col += n;
    }
    (f, jac)
}

fn check(owners: &mut Owners, ids: &[OwnerId], functions: Vec<Function>) -> Result<()> {
    let mut dofs = GlobalDofs::from_functions(owners, functions)?;

    let blocks = ids
        .iter()
        .zip(dofs.functions())
        .map(|(&id, function)| expected_block(owners, id, function))
        .collect::<Result<Vec<_>>>()?;
    let (f, jac) = assemble(&blocks);

    assert!(array_approx_eq(&dofs.f(owners)?, &f, 1e-13, 1e-13));
    assert!(matrix_approx_eq(&dofs.jac(owners)?, &jac, 1e-13, 1e-13));
    assert!(matrix_approx_eq(&dofs.fd_jac(owners, true)?, &jac, 1e-7, 1e-7));
    assert!(matrix_approx_eq(&dofs.fd_jac(owners, false)?, &jac, 1e-6, 1e-6));
    Ok(())
}

#[test]
fn test_vector_valued() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for nparams in 1..5 {
        for nvals in 1..5 {
            let mut owners = Owners::new();
            let o = affine(&mut owners, &mut rng, nparams, nvals);
            let x = random_x(&mut rng, nparams);
            owners.get_mut(o)?.set_full_x(&x)?;

            let model = owners.get_as::<Affine>(o)?;
            let expected = model.a().dot(&x) + model.b();

            let mut dofs = GlobalDofs::from_functions(&owners, vec![Affine::function(o)])?;
            assert!(array_approx_eq(&dofs.f(&owners)?, &expected, 1e-13, 1e-13));
            assert_eq!(dofs.nvals(), Some(nvals));

            check(&mut owners, &[o], vec![Affine::function(o)])?;
        }
    }
    Ok(())
}

#[test]
fn test_multiple_vector_valued() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for nparams1 in 1..5 {
        for nvals1 in 1..5 {
            let mut owners = Owners::new();
            let o1 = affine(&mut owners, &mut rng, nparams1, nvals1);
            let (p2, v2) = (rng.gen_range(1..6), rng.gen_range(1..6));
            let o2 = affine(&mut owners, &mut rng, p2, v2);
            let (p3, v3) = (rng.gen_range(1..6), rng.gen_range(1..6));
            let o3 = affine(&mut owners, &mut rng, p3, v3);

            let functions = || vec![Affine::function(o1), Affine::function(o2), Affine::function(o3)];
            let dofs = GlobalDofs::from_functions(&owners, functions())?;
            dofs.set_x(&mut owners, &random_x(&mut rng, nparams1 + p2 + p3))?;

            check(&mut owners, &[o1, o2, o3], functions())?;
        }
    }
    Ok(())
}

#[test]
fn test_mixed_vector_valued() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(2021);

    for nparams1 in 1..5 {
        for nvals1 in 1..5 {
            let mut owners = Owners::new();
            let o1 = affine(&mut owners, &mut rng, nparams1, nvals1);
            let (p2, v2) = (rng.gen_range(1..6), rng.gen_range(1..6));
            let o2 = affine(&mut owners, &mut rng, p2, v2);
            let (p3, v3) = (rng.gen_range(1..6), rng.gen_range(1..6));
            let o3 = affine(&mut owners, &mut rng, p3, v3);
            let a1 = owners.insert_with(|id| Adder::new(id, 2));
            let a2 = owners.insert_with(|id| Adder::new(id, 3));

            let functions = || {
                vec![
                    Affine::function(o1),
                    Affine::function(o2),
                    Adder::function(a1),
                    Affine::function(o3),
                    Adder::function(a2),
                ]
            };
            let dofs = GlobalDofs::from_functions(&owners, functions())?;
            dofs.set_x(&mut owners, &random_x(&mut rng, nparams1 + p2 + p3 + 5))?;

            check(&mut owners, &[o1, o2, a1, o3, a2], functions())?;
        }
    }
    Ok(())
}
