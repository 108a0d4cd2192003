//! End-to-end estimation scenarios over grids and point sets.
//!
//! Each test builds a problem from a handful of observations, runs a solver
//! and checks the assembled result.

use approx::assert_relative_eq;
use geoestim_algorithms::prelude::*;
use nalgebra::{DMatrix, DVector};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

const THREE_POINTS: [[f64; 2]; 3] = [[25.0, 25.0], [50.0, 75.0], [75.0, 50.0]];

/// Three observations on a 100×100 unit grid.
fn three_points() -> SpatialData {
    SpatialData::from_points(&THREE_POINTS)
        .with_values("z", vec![1.0, 0.0, 1.0])
        .unwrap()
}

fn variables(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Kriging
// ---------------------------------------------------------------------------

#[test]
fn kriging_reproduces_observations_in_every_neighbor_configuration() {
    init_tracing();
    let data = three_points();
    let grid = RegularGrid::unit(vec![100, 100]).unwrap();
    let vars = variables(&["z"]);
    let problem = EstimationProblem::new(&data, &grid, &vars).unwrap();

    let base = KrigingParams::new(VariogramModel::gaussian(1.0, 35.0));
    let configs = [
        ("global", base.clone().with_max_neighbors(None)),
        ("nearest", base.clone().with_max_neighbors(Some(3))),
        (
            "ball",
            base.clone()
                .with_max_neighbors(Some(3))
                .with_neighborhood(Neighborhood::ball(100.0)),
        ),
    ];

    for (label, params) in configs {
        let result = KrigingSolver::new(params).solve(&problem).unwrap();
        let z = result.get("z").unwrap();
        assert_eq!(z.len(), grid.len());

        for (i, expected) in [1.0, 0.0, 1.0].into_iter().enumerate() {
            let node = grid.nearest_index(&THREE_POINTS[i]).unwrap();
            assert!(
                (z.mean[node] - expected).abs() < 1e-3,
                "{label}: observation {i} estimated as {}",
                z.mean[node]
            );
            assert!(z.variance[node] < 1e-3, "{label}: variance {}", z.variance[node]);
        }
        assert!(z.variance.iter().all(|&v| v >= -1e-10), "{label}: negative variance");
    }
}

#[test]
fn kriging_variants_through_the_solver() {
    init_tracing();
    let data = SpatialData::from_points(&[
        [0.0, 0.0],
        [10.0, 0.0],
        [0.0, 10.0],
        [10.0, 10.0],
        [5.0, 5.0],
        [3.0, 7.0],
        [8.0, 2.0],
    ])
    .with_values("z", vec![0.0, 10.0, 5.0, 15.0, 7.5, 6.5, 9.0])
    .unwrap();
    let grid = RegularGrid::new(vec![11, 11], vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
    let vars = variables(&["z"]);
    let problem = EstimationProblem::new(&data, &grid, &vars).unwrap();

    let variants = [
        KrigingVariant::from_options(Some(7.0), None, None),
        KrigingVariant::from_options(None, None, None),
        KrigingVariant::from_options(None, Some(1), None),
        KrigingVariant::from_options(
            None,
            None,
            Some(vec![DriftFn::constant(), DriftFn::new(|x| x[0] + 0.5 * x[1])]),
        ),
    ];

    for variant in variants {
        let name = variant.name();
        let params = KrigingParams::new(VariogramModel::exponential(4.0, 12.0))
            .with_variant(variant)
            .with_max_neighbors(None);
        let result = KrigingSolver::new(params).solve(&problem).unwrap();
        let z = result.get("z").unwrap();

        assert_eq!(z.undefined_count(), 0, "{name}");
        let corner = grid.nearest_index(&[10.0, 10.0]).unwrap();
        assert_relative_eq!(z.mean[corner], 15.0, epsilon = 1e-8);
        assert!(z.variance.iter().all(|&v| v >= 0.0), "{name}");
    }
}

#[test]
fn kriging_in_three_dimensions() {
    let data = SpatialData::from_points(&[
        [0.0, 0.0, 0.0],
        [4.0, 0.0, 0.0],
        [0.0, 4.0, 0.0],
        [0.0, 0.0, 4.0],
        [4.0, 4.0, 4.0],
    ])
    .with_values("t", vec![1.0, 2.0, 3.0, 4.0, 5.0])
    .unwrap();
    let grid = RegularGrid::new(vec![5, 5, 5], vec![0.0; 3], vec![1.0; 3]).unwrap();
    let vars = variables(&["t"]);
    let problem = EstimationProblem::new(&data, &grid, &vars).unwrap();

    let result = KrigingSolver::new(KrigingParams::new(VariogramModel::spherical(2.0, 8.0)))
        .solve(&problem)
        .unwrap();
    let volume = result.mean_array("t", &grid).unwrap();
    assert_eq!(volume.shape(), &[5, 5, 5]);
    assert_relative_eq!(volume[[4, 4, 4]], 5.0, epsilon = 1e-8);
    assert_relative_eq!(volume[[0, 0, 4]], 4.0, epsilon = 1e-8);
}

#[test]
fn collocated_observations_fail_numerically() {
    let data = SpatialData::from_points(&[[1.0, 1.0], [1.0, 1.0], [3.0, 3.0]])
        .with_values("z", vec![1.0, 2.0, 3.0])
        .unwrap();
    let domain = PointSet::from_points(&[[2.0, 2.0], [0.0, 0.0]]);
    let vars = variables(&["z"]);
    let problem = EstimationProblem::new(&data, &domain, &vars).unwrap();
    let params = KrigingParams::new(VariogramModel::gaussian(1.0, 5.0));

    let err = KrigingSolver::new(params.clone().with_max_neighbors(None))
        .solve(&problem)
        .unwrap_err();
    assert!(err.is_numerical(), "{err}");

    // Approximate mode can leave the failing locations undefined instead
    let result = KrigingSolver::new(params)
        .with_options(EstimationOptions::default().with_failure_policy(NumericalFailurePolicy::Undefined))
        .solve(&problem)
        .unwrap();
    assert_eq!(result.get("z").unwrap().undefined_count(), 2);
}

// ---------------------------------------------------------------------------
// IDW and LWR
// ---------------------------------------------------------------------------

#[test]
fn idw_is_exact_at_observations() {
    init_tracing();
    let data = three_points();
    let domain = PointSet::new(data.coords().to_owned());
    let vars = variables(&["z"]);
    let problem = EstimationProblem::new(&data, &domain, &vars).unwrap();

    let result = IdwSolver::new(IdwParams::default().with_neighbors(3))
        .solve(&problem)
        .unwrap();
    let z = result.get("z").unwrap();
    assert_eq!(z.mean, vec![1.0, 0.0, 1.0]);
    assert_eq!(z.variance, vec![0.0, 0.0, 0.0]);
}

#[test]
fn idw_on_geographic_coordinates() {
    // (longitude, latitude) in degrees
    let data = SpatialData::from_points(&[[-70.65, -33.45], [-71.62, -33.05], [-70.40, -23.65]])
        .with_values("temp", vec![18.0, 16.0, 20.0])
        .unwrap();
    let domain = PointSet::from_points(&[[-70.65, -33.45], [-71.0, -33.2]]);
    let vars = variables(&["temp"]);
    let problem = EstimationProblem::new(&data, &domain, &vars).unwrap();

    let params = IdwParams::default()
        .with_distance(DistanceMetric::haversine())
        .with_power(2.0)
        .with_neighbors(2);
    let result = IdwSolver::new(params).solve(&problem).unwrap();
    let temp = result.get("temp").unwrap();

    assert_eq!(temp.mean[0], 18.0);
    // Between Santiago and Valparaíso, both much closer than Antofagasta
    assert!(temp.mean[1] > 16.0 && temp.mean[1] < 18.0);
    // Nearest neighbor is tens of kilometers away
    assert!(temp.variance[1] > 10_000.0 && temp.variance[1] < 100_000.0);
}

#[test]
fn lwr_with_uniform_weights_matches_least_squares() {
    let coords = [[0.0, 0.0], [2.0, 1.0], [1.0, 3.0], [4.0, 4.0], [3.0, 0.5], [0.5, 2.5], [2.5, 2.5]];
    let z = vec![0.5, 2.0, 2.5, 5.5, 2.9, 1.4, 3.6];
    let data = SpatialData::from_points(&coords).with_values("z", z.clone()).unwrap();
    let grid = RegularGrid::new(vec![5, 5], vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
    let vars = variables(&["z"]);
    let problem = EstimationProblem::new(&data, &grid, &vars).unwrap();

    let params = LwrParams::default()
        .with_neighbors(coords.len())
        .with_weight_fn(WeightFn::uniform());
    let result = LwrSolver::new(params).solve(&problem).unwrap();
    let estimate = result.get("z").unwrap();

    // Normal equations XᵀX β = Xᵀz
    let x = DMatrix::from_fn(coords.len(), 3, |i, j| if j == 0 { 1.0 } else { coords[i][j - 1] });
    let beta = (x.transpose() * &x)
        .lu()
        .solve(&(x.transpose() * DVector::from_vec(z)))
        .unwrap();

    for index in 0..grid.len() {
        let loc = grid.location(index);
        let expected = beta[0] + beta[1] * loc[0] + beta[2] * loc[1];
        assert_relative_eq!(estimate.mean[index], expected, epsilon = 1e-8);
        assert!(estimate.variance[index] >= 0.0);
    }
}

// ---------------------------------------------------------------------------
// Result assembly and engine guarantees
// ---------------------------------------------------------------------------

#[test]
fn result_fields_follow_variable_order() {
    let data = SpatialData::from_points(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]])
        .with_values("b", vec![1.0, 2.0, 3.0])
        .unwrap()
        .with_variable("a", vec![Some(5.0), None, Some(6.0)])
        .unwrap();
    let grid = RegularGrid::unit(vec![2, 2]).unwrap();
    let vars = variables(&["b", "a"]);
    let problem = EstimationProblem::new(&data, &grid, &vars).unwrap();

    let result = IdwSolver::default().solve(&problem).unwrap();
    let names: Vec<String> = result.fields().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["b", "b_variance", "a", "a_variance"]);

    let a = result.mean_array("a", &grid).unwrap();
    assert_eq!(a[[0, 0]], 5.0);
    assert_eq!(a[[0, 1]], 6.0);
}

#[test]
fn repeated_runs_are_identical() {
    let data = three_points();
    let grid = RegularGrid::unit(vec![60, 60]).unwrap();
    let vars = variables(&["z"]);
    let problem = EstimationProblem::new(&data, &grid, &vars).unwrap();
    let solver = KrigingSolver::new(
        KrigingParams::new(VariogramModel::gaussian(1.0, 35.0)).with_max_neighbors(Some(2)),
    );

    let first = solver.solve(&problem).unwrap();
    let second = solver.solve(&problem).unwrap();
    let (a, b) = (first.get("z").unwrap(), second.get("z").unwrap());
    for i in 0..a.len() {
        assert_eq!(a.mean[i].to_bits(), b.mean[i].to_bits());
        assert_eq!(a.variance[i].to_bits(), b.variance[i].to_bits());
    }
}

#[test]
fn configuration_errors_are_reported_up_front() {
    let data = three_points();
    let grid = RegularGrid::unit(vec![10, 10]).unwrap();
    let vars = variables(&["z"]);
    let problem = EstimationProblem::new(&data, &grid, &vars).unwrap();

    let errors = [
        IdwSolver::new(IdwParams::default().with_power(0.0)).solve(&problem).unwrap_err(),
        IdwSolver::new(IdwParams::default().with_neighbors(4)).solve(&problem).unwrap_err(),
        LwrSolver::new(LwrParams::default().with_neighbors(0)).solve(&problem).unwrap_err(),
        KrigingSolver::new(KrigingParams::default().with_max_neighbors(Some(0)))
            .solve(&problem)
            .unwrap_err(),
        KrigingSolver::new(KrigingParams::new(VariogramModel::gaussian(1.0, -3.0)))
            .solve(&problem)
            .unwrap_err(),
    ];
    for err in errors {
        assert!(err.is_configuration(), "{err}");
    }

    let missing = variables(&["elevation"]);
    let err = EstimationProblem::new(&data, &grid, &missing).unwrap_err();
    assert!(matches!(err, Error::UnknownVariable(ref v) if v == "elevation"));
}

#[test]
fn cancelled_runs_stop_with_an_error() {
    let data = three_points();
    let grid = RegularGrid::unit(vec![100, 100]).unwrap();
    let vars = variables(&["z"]);
    let problem = EstimationProblem::new(&data, &grid, &vars).unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let err = IdwSolver::default()
        .with_options(EstimationOptions::default().with_cancellation(token))
        .solve(&problem)
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
