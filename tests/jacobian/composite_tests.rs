use crate::test_helpers::matrix_approx_eq;
use dofopt_rs::aggregator::GlobalDofs;
use dofopt_rs::dofs::{Dof, DofRegistry};
use dofopt_rs::error::Result;
use dofopt_rs::function::Function;
use dofopt_rs::models::{Adder, Affine, Rosenbrock};
use dofopt_rs::owner::{Optimizable, OwnerId, Owners};
use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One DOF combined with two adders: `(val + 2·sum1) / (10 + sum2)`.
struct Inner {
    dofs: DofRegistry,
    adder1: OwnerId,
    adder2: OwnerId,
}

impl Inner {
    fn value(owners: &Owners, id: OwnerId) -> Result<f64> {
        let inner = owners.get_as::<Inner>(id)?;
        let val = inner.full_x()[0];
        let sum1 = owners.get_as::<Adder>(inner.adder1)?.sum();
        let sum2 = owners.get_as::<Adder>(inner.adder2)?.sum();
        Ok((val + 2.0 * sum1) / (10.0 + sum2))
    }

    fn function(id: OwnerId) -> Function {
        Function::new(id, "inner", move |owners: &Owners| Ok(Inner::value(owners, id)?.into()))
    }
}

impl Optimizable for Inner {
    fn depends_on(&self) -> Vec<OwnerId> {
        vec![self.adder1, self.adder2]
    }

    fn dofs(&self) -> Option<&DofRegistry> {
        Some(&self.dofs)
    }

    fn dofs_mut(&mut self) -> Option<&mut DofRegistry> {
        Some(&mut self.dofs)
    }
}

/// Two DOFs combined with an adder and an [`Inner`]:
/// `val1·val2 + sum + 4·inner`.
struct Outer {
    dofs: DofRegistry,
    adder: OwnerId,
    inner: OwnerId,
}

impl Outer {
    fn function(id: OwnerId) -> Function {
        Function::new(id, "outer", move |owners: &Owners| {
            let outer = owners.get_as::<Outer>(id)?;
            let x = outer.full_x();
            let sum = owners.get_as::<Adder>(outer.adder)?.sum();
            let inner = Inner::value(owners, outer.inner)?;
            Ok((x[0] * x[1] + sum + 4.0 * inner).into())
        })
    }
}

impl Optimizable for Outer {
    fn depends_on(&self) -> Vec<OwnerId> {
        vec![self.adder, self.inner]
    }

    fn dofs(&self) -> Option<&DofRegistry> {
        Some(&self.dofs)
    }

    fn dofs_mut(&mut self) -> Option<&mut DofRegistry> {
        Some(&mut self.dofs)
    }
}

struct Scene {
    owners: Owners,
    inner: OwnerId,
    outer: OwnerId,
    rosenbrock: OwnerId,
    affine: OwnerId,
}

fn random_values(rng: &mut ChaCha8Rng, n: usize, half_width: f64) -> Array1<f64> {
    Array1::from_shape_simple_fn(n, || rng.gen_range(-half_width..half_width))
}

fn adder(owners: &mut Owners, rng: &mut ChaCha8Rng, n: usize) -> Result<OwnerId> {
    let id = owners.insert_with(|id| Adder::new(id, n));
    owners.get_mut(id)?.set_full_x(&random_values(rng, n, 2.0))?;
    Ok(id)
}

fn build_scene(rng: &mut ChaCha8Rng) -> Result<Scene> {
    let mut owners = Owners::new();

    let adder1 = adder(&mut owners, rng, 3)?;
    let adder2 = adder(&mut owners, rng, 2)?;
    let val = rng.gen_range(-2.0..2.0);
    let inner = owners.insert_with(|id| Inner {
        dofs: [Dof::new(id, "val", val)].into_iter().collect(),
        adder1,
        adder2,
    });

    let outer_adder = adder(&mut owners, rng, 2)?;
    let (v1, v2) = (rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
    let outer = owners.insert_with(|id| Outer {
        dofs: [Dof::new(id, "val1", v1), Dof::new(id, "val2", v2)]
            .into_iter()
            .collect(),
        adder: outer_adder,
        inner,
    });

    let rosenbrock =
        owners.insert_with(|id| Rosenbrock::with_coefficients(id, 1.0, 3.0).unwrap());
    owners
        .get_mut(rosenbrock)?
        .set_full_x(&random_values(rng, 2, 1.5))?;
    let affine = owners.insert_with(|id| Affine::random(id, 3, 3, rng));

    // Randomly fix some of the degrees of freedom
    for id in [outer, outer_adder, adder1, adder2, rosenbrock, affine] {
        if let Some(dofs) = owners.get_mut(id)?.dofs_mut() {
            for dof in dofs.iter_mut() {
                if rng.gen_bool(0.5) {
                    dof.fix();
                }
            }
        }
    }

    Ok(Scene {
        owners,
        inner,
        outer,
        rosenbrock,
        affine,
    })
}

#[test]
fn test_jacobian() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(12345);

    for _ in 1..20 {
        let mut scene = build_scene(&mut rng)?;
        let (inner, outer, r, a) = (scene.inner, scene.outer, scene.rosenbrock, scene.affine);

        let cases: Vec<(Vec<Function>, usize, Vec<usize>)> = vec![
            (
                vec![
                    Outer::function(outer),
                    Rosenbrock::terms_function(r),
                    Inner::function(inner),
                ],
                4,
                vec![1, 2, 1],
            ),
            (
                vec![Rosenbrock::term2_function(r), Rosenbrock::terms_function(r)],
                3,
                vec![1, 2],
            ),
            (
                vec![
                    Rosenbrock::term2_function(r),
                    Inner::function(inner),
                    Rosenbrock::term1_function(r),
                    Outer::function(outer),
                ],
                4,
                vec![1, 1, 1, 1],
            ),
            (
                vec![Affine::function(a), Outer::function(outer)],
                4,
                vec![3, 1],
            ),
        ];

        for (functions, nvals, nvals_per_func) in cases {
            let mut dofs = GlobalDofs::from_functions(&scene.owners, functions)?;
            let x0 = dofs.x(&scene.owners)?;

            let jac = dofs.jac(&mut scene.owners)?;
            let fd_jac = dofs.fd_jac(&mut scene.owners, false)?;
            let fd_jac_centered = dofs.fd_jac(&mut scene.owners, true)?;

            assert!(matrix_approx_eq(&jac, &fd_jac, 1e-6, 1e-6));
            assert!(matrix_approx_eq(&fd_jac, &fd_jac_centered, 1e-6, 1e-6));
            assert_eq!(dofs.nvals(), Some(nvals));
            assert_eq!(dofs.nvals_per_func(), Some(nvals_per_func.as_slice()));

            // Differentiation leaves the owners where it found them
            assert_eq!(dofs.x(&scene.owners)?, x0);
        }
    }
    Ok(())
}
