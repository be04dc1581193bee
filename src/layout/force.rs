//! Spring-electrical batch layout.
//!
//! Every pair of nodes repels (inverse square) and every edge is a linear
//! spring. Cost is O(n²) per iteration, so callers should keep the device
//! count to a few thousand at most.

use crate::model::Position;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Distances below this are treated as coincident.
const EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct ForceParams {
    pub iterations: u32,
    pub repulsion: f32,
    pub spring: f32,
    pub spring_length: f32,
    pub damping: f32,
    pub extent: f32,
}

type Vec3 = [f32; 3];

#[inline]
fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn len(v: Vec3) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[inline]
fn add_scaled(acc: &mut Vec3, dir: Vec3, scale: f32) {
    acc[0] += dir[0] * scale;
    acc[1] += dir[1] * scale;
    acc[2] += dir[2] * scale;
}

/// Unit vector from `b` towards `a`, plus the distance. Coincident points
/// get a fixed axis so the result stays deterministic.
#[inline]
fn direction(a: Vec3, b: Vec3) -> (Vec3, f32) {
    let d = sub(a, b);
    let dist = len(d);
    if dist < EPSILON {
        ([1.0, 0.0, 0.0], EPSILON)
    } else {
        ([d[0] / dist, d[1] / dist, d[2] / dist], dist)
    }
}

/// Lay out `n` nodes connected by `edges` (index pairs). The output is in
/// node order and depends only on the inputs and `seed`.
pub fn layout(n: usize, edges: &[(usize, usize)], params: &ForceParams, seed: u64) -> Vec<Position> {
    let extent = params.extent;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pos: Vec<Vec3> = (0..n)
        .map(|_| {
            [
                rng.random_range(-extent..=extent),
                rng.random_range(-extent..=extent),
                rng.random_range(-extent..=extent),
            ]
        })
        .collect();
    let mut vel: Vec<Vec3> = vec![[0.0; 3]; n];
    let max_step = extent / 10.0;

    for _ in 0..params.iterations {
        let mut force: Vec<Vec3> = vec![[0.0; 3]; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let (dir, dist) = direction(pos[i], pos[j]);
                let push = params.repulsion / (dist * dist).max(0.01);
                add_scaled(&mut force[i], dir, push);
                add_scaled(&mut force[j], dir, -push);
            }
        }

        for &(a, b) in edges {
            if a == b || a >= n || b >= n {
                continue;
            }
            let (dir, dist) = direction(pos[b], pos[a]);
            let pull = params.spring * (dist - params.spring_length);
            add_scaled(&mut force[a], dir, pull);
            add_scaled(&mut force[b], dir, -pull);
        }

        for i in 0..n {
            for axis in 0..3 {
                let v = ((vel[i][axis] + force[i][axis]) * params.damping).clamp(-max_step, max_step);
                vel[i][axis] = v;
                pos[i][axis] = (pos[i][axis] + v).clamp(-extent, extent);
            }
        }
    }

    pos.into_iter().map(|p| Position::new(p[0], p[1], p[2])).collect()
}
