use approx::{assert_abs_diff_eq, assert_relative_eq};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::particles::{direct_field_at, octant_index, BarnesHutTree, Body, ParticlePool, ROOT_NODE};
use crate::utils::{SimulationConstants, FORCE_CONSTANT, OCTANT_OFFSETS, ROOT_NODE_SIZE, SELF_INTERACTION_EPSILON};

fn random_bodies(pool: &mut ParticlePool, count: usize, half_extent: f32, seed: u64) -> Vec<Body> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let position = Vector3::new(
                rng.random_range(-half_extent..half_extent),
                rng.random_range(-half_extent..half_extent),
                rng.random_range(-half_extent..half_extent),
            );
            let mass = rng.random_range(0.5..3.0);
            pool.create(position, Vector3::zeros(), mass, None).unwrap()
        })
        .collect()
}

fn build_tree(pool: &ParticlePool, bodies: &[Body]) -> BarnesHutTree {
    let mut tree = BarnesHutTree::new();
    for &body in bodies {
        tree.insert(pool, body);
    }
    tree
}

/// Sum over `bodies` of |tree field - exact field|, relative to the sum of |exact field|.
fn aggregate_error(tree: &BarnesHutTree, pool: &ParticlePool, bodies: &[Body], threshold: f32) -> f32 {
    let mut error = 0.0;
    let mut magnitude = 0.0;
    for body in bodies {
        let point = body.position(pool).unwrap();
        let exact = direct_field_at(pool, bodies, &point, FORCE_CONSTANT, SELF_INTERACTION_EPSILON);
        let approx = tree.field_at(&point, threshold);
        error += (approx - exact).norm();
        magnitude += exact.norm();
    }
    error / magnitude
}

#[test]
fn test_octant_index_bits() {
    let center = Vector3::zeros();
    assert_eq!(octant_index(&Vector3::new(-1.0, -1.0, -1.0), &center), 0);
    assert_eq!(octant_index(&Vector3::new(-1.0, -1.0, 1.0), &center), 1);
    assert_eq!(octant_index(&Vector3::new(-1.0, 1.0, -1.0), &center), 2);
    assert_eq!(octant_index(&Vector3::new(1.0, -1.0, -1.0), &center), 4);
    assert_eq!(octant_index(&Vector3::new(1.0, 1.0, 1.0), &center), 7);
    // Ties go to the upper half.
    assert_eq!(octant_index(&Vector3::zeros(), &center), 7);
}

#[test]
fn test_octant_offsets_match_index_bits() {
    for (index, offset) in OCTANT_OFFSETS.iter().enumerate() {
        assert_eq!(octant_index(offset, &Vector3::zeros()), index);
    }
}

#[test]
fn test_first_body_is_stored_without_children() {
    let mut pool = ParticlePool::with_capacity(4);
    let body = pool.create(Vector3::new(3.0, -2.0, 1.0), Vector3::zeros(), 2.5, None).unwrap();
    let tree = build_tree(&pool, &[body]);

    let root = tree.node(ROOT_NODE).unwrap();
    assert_eq!(tree.node_count(), 1);
    assert!(!root.has_children());
    assert_eq!(root.bodies(), &[body]);
    assert_eq!(root.mass(), 2.5);
    assert_eq!(root.center_of_mass(), Vector3::new(3.0, -2.0, 1.0));
    assert_eq!(root.center_of_mass_weighted(), Vector3::new(3.0f32, -2.0, 1.0) * 2.5);
}

#[test]
fn test_bodies_accumulate_at_every_ancestor() {
    let mut pool = ParticlePool::with_capacity(8);
    let bodies = vec![
        pool.create(Vector3::new(1.0, 1.0, 1.0), Vector3::zeros(), 1.0, None).unwrap(),
        pool.create(Vector3::new(-1.0, -1.0, -1.0), Vector3::zeros(), 1.0, None).unwrap(),
        pool.create(Vector3::new(2.0, 2.0, 2.0), Vector3::zeros(), 1.0, None).unwrap(),
    ];
    let tree = build_tree(&pool, &bodies);

    let root = tree.root();
    assert_eq!(root.bodies().len(), 3);

    let upper = tree.node(root.child(7).expect("upper octant spawned")).unwrap();
    let lower = tree.node(root.child(0).expect("lower octant spawned")).unwrap();
    assert_eq!(upper.bodies(), &[bodies[0], bodies[2]]);
    assert_eq!(lower.bodies(), &[bodies[1]]);
    assert!(upper.has_children(), "Two bodies in one octant must split further");
    assert!(!lower.has_children());

    // Each body reaches exactly one child of every node it passes through.
    for node in tree.nodes() {
        if node.has_children() {
            let below: usize = node
                .children()
                .iter()
                .flatten()
                .map(|&child| tree.node(child).unwrap().bodies().len())
                .sum();
            assert_eq!(below, node.bodies().len());
        }
    }
}

#[test]
fn test_child_geometry() {
    let mut pool = ParticlePool::with_capacity(64);
    let bodies = random_bodies(&mut pool, 40, 100.0, 11);
    let tree = build_tree(&pool, &bodies);

    let root = tree.root();
    assert_eq!(root.node_size(), ROOT_NODE_SIZE);
    assert_eq!(root.depth(), 0);

    for node in tree.nodes() {
        for (octant, child) in node.children().iter().enumerate() {
            let Some(child) = child else { continue };
            let child = tree.node(*child).unwrap();
            let expected = node.node_center() + 0.25 * node.node_size() * OCTANT_OFFSETS[octant];
            assert_eq!(child.node_center(), expected);
            assert_eq!(child.node_size(), 0.5 * node.node_size());
            assert_eq!(child.depth(), node.depth() + 1);
        }
    }
}

#[test]
fn test_mass_conservation() {
    let mut pool = ParticlePool::with_capacity(512);
    let bodies = random_bodies(&mut pool, 300, 250.0, 1);
    let tree = build_tree(&pool, &bodies);

    let total: f32 = bodies.iter().map(Body::mass).sum();
    assert_relative_eq!(tree.root().mass(), total, max_relative = 1e-5);
    assert_eq!(tree.root().bodies().len(), bodies.len());
}

#[test]
fn test_center_of_mass_matches_recorded_bodies() {
    let mut pool = ParticlePool::with_capacity(256);
    let bodies = random_bodies(&mut pool, 200, 100.0, 2);
    let tree = build_tree(&pool, &bodies);

    for node in tree.nodes() {
        if node.is_empty() {
            continue;
        }
        let mut mass = 0.0f64;
        let mut weighted = Vector3::<f64>::zeros();
        for body in node.bodies() {
            let p = body.position(&pool).unwrap();
            mass += body.mass() as f64;
            weighted += body.mass() as f64 * Vector3::new(p.x as f64, p.y as f64, p.z as f64);
        }
        let expected = weighted / mass;
        let com = node.center_of_mass();

        assert_relative_eq!(node.mass() as f64, mass, max_relative = 1e-4);
        assert_abs_diff_eq!(com.x as f64, expected.x, epsilon = 1e-2);
        assert_abs_diff_eq!(com.y as f64, expected.y, epsilon = 1e-2);
        assert_abs_diff_eq!(com.z as f64, expected.z, epsilon = 1e-2);
        assert_relative_eq!(com, node.center_of_mass_weighted() / node.mass(), epsilon = 1e-4);
    }
}

#[test]
fn test_octant_partition() {
    let mut pool = ParticlePool::with_capacity(256);
    let bodies = random_bodies(&mut pool, 200, 100.0, 3);
    let tree = build_tree(&pool, &bodies);

    for node in tree.nodes() {
        let center = node.node_center();
        for (octant, child) in node.children().iter().enumerate() {
            let Some(child) = child else { continue };
            for body in tree.node(*child).unwrap().bodies() {
                let p = body.position(&pool).unwrap();
                assert_eq!(p.x >= center.x, octant & 0b100 != 0);
                assert_eq!(p.y >= center.y, octant & 0b010 != 0);
                assert_eq!(p.z >= center.z, octant & 0b001 != 0);
            }
        }
    }
}

#[test]
fn test_self_exclusion() {
    let mut pool = ParticlePool::with_capacity(4);
    let body = pool.create(Vector3::new(5.0, 6.0, 7.0), Vector3::zeros(), 3.0, None).unwrap();
    let tree = build_tree(&pool, &[body]);

    let field = tree.field_at(&Vector3::new(5.0, 6.0, 7.0), 0.5);
    assert_eq!(field, Vector3::zeros());
}

#[test]
fn test_empty_tree_has_no_field() {
    let tree = BarnesHutTree::new();
    assert!(tree.is_empty());
    assert_eq!(tree.field_at(&Vector3::new(1.0, 2.0, 3.0), 0.5), Vector3::zeros());
}

#[test]
fn test_two_body_exact_field() {
    let (m1, m2, d) = (1.0, 3.0, 5.0);
    let mut pool = ParticlePool::with_capacity(4);
    let p1 = Vector3::new(1.0, 2.0, 3.0);
    let p2 = p1 + Vector3::new(d, 0.0, 0.0);
    let b1 = pool.create(p1, Vector3::zeros(), m1, None).unwrap();
    let b2 = pool.create(p2, Vector3::zeros(), m2, None).unwrap();
    let tree = build_tree(&pool, &[b1, b2]);

    let field = tree.field_at(&p1, 1.0);
    assert_relative_eq!(field.norm(), FORCE_CONSTANT * m2 / d, max_relative = 1e-4);
    assert_relative_eq!(field.normalize(), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-4);

    let back = tree.field_at(&p2, 1.0);
    assert_relative_eq!(back.norm(), FORCE_CONSTANT * m1 / d, max_relative = 1e-4);
    assert!(back.x < 0.0, "Field on the second body must point back at the first");
}

#[test]
fn test_distant_cluster_collapses_to_center_of_mass() {
    let mut pool = ParticlePool::with_capacity(64);
    let bodies = random_bodies(&mut pool, 20, 1.0, 4);
    let constants = SimulationConstants::default();
    let mut tree = BarnesHutTree::with_root(Vector3::zeros(), 4.0, &constants);
    for &body in &bodies {
        tree.insert(&pool, body);
    }

    let point = Vector3::new(1000.0, 0.0, 0.0);
    let root = tree.root();
    let offset = root.center_of_mass() - point;
    let expected = (FORCE_CONSTANT * root.mass() / offset.norm()) * offset.normalize();

    // size / distance is ~0.004, so the root alone answers.
    assert_relative_eq!(tree.field_at(&point, 0.5), expected, max_relative = 1e-5);
}

#[test]
fn test_reset_matches_fresh_tree() {
    let mut pool = ParticlePool::with_capacity(128);
    let bodies = random_bodies(&mut pool, 100, 50.0, 5);

    let mut tree = BarnesHutTree::new();
    tree.reset();
    for &body in &bodies {
        tree.insert(&pool, body);
    }
    let fresh = build_tree(&pool, &bodies);
    assert_eq!(tree.node_count(), fresh.node_count());

    // Reusing a populated tree after reset gives the same answers too.
    tree.reset();
    assert_eq!(tree.node_count(), 1);
    assert!(tree.is_empty());
    for &body in &bodies {
        tree.insert(&pool, body);
    }

    for body in &bodies {
        let point = body.position(&pool).unwrap();
        assert_eq!(tree.field_at(&point, 0.5), fresh.field_at(&point, 0.5));
    }
}

#[test]
fn test_zero_threshold_is_exact() {
    let mut pool = ParticlePool::with_capacity(256);
    let bodies = random_bodies(&mut pool, 150, 50.0, 6);
    let tree = build_tree(&pool, &bodies);

    assert!(aggregate_error(&tree, &pool, &bodies, 0.0) < 1e-4);
}

#[test]
fn test_smaller_threshold_converges_to_direct_sum() {
    let mut pool = ParticlePool::with_capacity(512);
    let bodies = random_bodies(&mut pool, 400, 50.0, 7);
    let tree = build_tree(&pool, &bodies);

    let exact = aggregate_error(&tree, &pool, &bodies, 0.0);
    let fine = aggregate_error(&tree, &pool, &bodies, 0.3);
    let coarse = aggregate_error(&tree, &pool, &bodies, 1.2);

    assert!(exact <= fine + 1e-5, "theta 0.0: {}, theta 0.3: {}", exact, fine);
    assert!(fine <= coarse, "theta 0.3: {}, theta 1.2: {}", fine, coarse);
    assert!(fine < 0.1, "theta 0.3 aggregate error too large: {}", fine);
}

#[test]
fn test_depth_limit_merges_coincident_bodies() {
    let constants = SimulationConstants { max_depth: 5, ..Default::default() };
    let mut pool = ParticlePool::with_capacity(8);
    let bodies: Vec<_> = (0..3)
        .map(|_| pool.create(Vector3::new(1.0, 1.0, 1.0), Vector3::zeros(), 1.0, None).unwrap())
        .collect();

    let mut tree = BarnesHutTree::from_constants(&constants);
    for &body in &bodies {
        tree.insert(&pool, body);
    }

    // One chain of single children down to the depth limit.
    assert_eq!(tree.node_count(), 6);
    let deepest = tree.nodes().iter().max_by_key(|node| node.depth()).unwrap();
    assert_eq!(deepest.depth(), 5);
    assert_eq!(deepest.bodies().len(), 3);
    assert_eq!(deepest.mass(), 3.0);
    assert!(!deepest.has_children());

    // Coincident bodies feel nothing from the merged leaf at their own position.
    assert_eq!(tree.field_at(&Vector3::new(1.0, 1.0, 1.0), 0.5), Vector3::zeros());
}

#[test]
fn test_default_depth_limit_handles_coincident_bodies() {
    let mut pool = ParticlePool::with_capacity(8);
    let bodies: Vec<_> = (0..4)
        .map(|_| pool.create(Vector3::new(-3.0, 2.0, 0.5), Vector3::zeros(), 1.0, None).unwrap())
        .collect();
    let tree = build_tree(&pool, &bodies);

    assert_eq!(tree.root().mass(), 4.0);
    assert!(tree.nodes().iter().all(|node| node.depth() <= tree.max_depth()));
}

fn assert_non_finite_positions_propagate(bad_position: Vector3<f32>) {
    let constants = SimulationConstants { max_depth: 12, ..Default::default() };
    let mut pool = ParticlePool::with_capacity(8);
    let mut bodies = vec![
        pool.create(Vector3::new(-2.0, -2.0, -2.0), Vector3::zeros(), 1.0, None).unwrap(),
        pool.create(Vector3::new(-1.0, -3.0, -2.5), Vector3::zeros(), 1.0, None).unwrap(),
        pool.create(Vector3::new(4.0, 1.0, 2.0), Vector3::zeros(), 1.0, None).unwrap(),
    ];
    bodies.push(pool.create(bad_position, Vector3::zeros(), 2.0, None).unwrap());

    let mut tree = BarnesHutTree::from_constants(&constants);
    for &body in &bodies {
        tree.insert(&pool, body);
    }

    assert_eq!(tree.root().bodies().len(), 4);
    assert_eq!(tree.root().mass(), 5.0);
    assert!(tree.nodes().iter().all(|node| node.depth() <= constants.max_depth));

    let field = tree.field_at(&Vector3::new(0.5, 0.5, 0.5), 0.5);
    assert!(field.iter().any(|component| !component.is_finite()), "got {:?}", field);
}

#[test]
fn test_nan_position_propagates_without_panicking() {
    assert_non_finite_positions_propagate(Vector3::new(f32::NAN, 1.0, -1.0));
}

#[test]
fn test_infinite_position_propagates_without_panicking() {
    assert_non_finite_positions_propagate(Vector3::new(f32::INFINITY, 0.0, 0.0));
}

#[test]
fn test_stale_handle_is_skipped() {
    let mut pool = ParticlePool::with_capacity(4);
    let stale = pool.create(Vector3::new(1.0, 0.0, 0.0), Vector3::zeros(), 1.0, None).unwrap();
    pool.reset();

    let mut tree = BarnesHutTree::new();
    tree.insert(&pool, stale);
    assert!(tree.is_empty());
    assert_eq!(tree.root().mass(), 0.0);
}

#[test]
fn test_display_dumps_every_node() {
    let mut pool = ParticlePool::with_capacity(4);
    let a = pool.create(Vector3::new(1.0, 1.0, 1.0), Vector3::zeros(), 1.0, None).unwrap();
    let b = pool.create(Vector3::new(-1.0, -1.0, -1.0), Vector3::zeros(), 1.0, None).unwrap();
    let tree = build_tree(&pool, &[a, b]);

    let dump = tree.to_string();
    assert_eq!(dump.matches("Node ").count(), tree.node_count());
    assert!(dump.starts_with("Node 0:"));
    assert!(dump.contains("- Mass           : 2"));
    assert!(dump.contains("\tNode 1:"));
    assert!(dump.contains("- Child Count    : 2"));
}
