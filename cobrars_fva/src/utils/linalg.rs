//! Dense linear algebra helpers used by the loop preprocessing
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Basis of the (right) nullspace of `matrix`, one basis vector per column
///
/// Computed from the reduced row echelon form, so every basis vector has a 1 at one free
/// column and zeros at every other free column. This keeps the basis sparse, which matters
/// because reactions sharing a basis vector end up in the same connected component.
pub(crate) fn nullspace(matrix: &DMatrix<f64>, tolerance: f64) -> DMatrix<f64> {
    let (m, n) = matrix.shape();
    let mut r = matrix.clone();
    let mut pivots: Vec<usize> = Vec::new();
    let mut row = 0;
    for col in 0..n {
        if row >= m {
            break;
        }
        let (offset, max) = r
            .view((row, col), (m - row, 1))
            .iter()
            .enumerate()
            .fold((0, 0.), |(best, best_val), (i, v)| {
                if v.abs() > best_val {
                    (i, v.abs())
                } else {
                    (best, best_val)
                }
            });
        if max <= tolerance {
            continue;
        }
        r.swap_rows(row, row + offset);
        let pivot = r[(row, col)];
        for j in 0..n {
            r[(row, j)] /= pivot;
        }
        for i in 0..m {
            if i == row {
                continue;
            }
            let factor = r[(i, col)];
            if factor != 0. {
                for j in 0..n {
                    let delta = factor * r[(row, j)];
                    r[(i, j)] -= delta;
                }
            }
        }
        pivots.push(col);
        row += 1;
    }
    let free: Vec<usize> = (0..n).filter(|c| !pivots.contains(c)).collect();
    let mut basis = DMatrix::zeros(n, free.len());
    for (k, &f) in free.iter().enumerate() {
        basis[(f, k)] = 1.;
        for (i, &p) in pivots.iter().enumerate() {
            let value = -r[(i, f)];
            if value.abs() > tolerance {
                basis[(p, k)] = value;
            }
        }
    }
    basis
}

/// Orthonormal basis grown one vector at a time, used to project directions out of the span
/// of the vectors found so far
#[derive(Debug, Clone, Default)]
pub(crate) struct OrthonormalBasis {
    vectors: Vec<DVector<f64>>,
}

impl OrthonormalBasis {
    /// Remove the components of `w` lying in the span of the basis
    pub(crate) fn project_out(&self, w: &DVector<f64>) -> DVector<f64> {
        let mut projected = w.clone();
        for q in &self.vectors {
            let component = q.dot(&projected);
            projected.axpy(-component, q, 1.);
        }
        projected
    }

    /// Add `v` to the basis, returns false when `v` is (numerically) already in the span
    pub(crate) fn push(&mut self, v: &DVector<f64>, tolerance: f64) -> bool {
        let residual = self.project_out(v);
        let norm = residual.norm();
        if norm <= tolerance {
            return false;
        }
        self.vectors.push(residual / norm);
        true
    }
}

/// Weights drawn uniformly from [0.5, 1.5), the same for the same `seed`
pub(crate) fn random_weights(n: usize, seed: u64) -> DVector<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DVector::from_fn(n, |_, _| rng.gen_range(0.5..1.5))
}

/// Union-find over `0..n`
#[derive(Debug, Clone)]
pub(crate) struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    pub(crate) fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }

    /// Set label of every element, labels numbered 0.. in order of first appearance
    pub(crate) fn labels(&mut self) -> Vec<usize> {
        let n = self.parent.len();
        let mut label_of_root = vec![usize::MAX; n];
        let mut next = 0;
        (0..n)
            .map(|x| {
                let root = self.find(x);
                if label_of_root[root] == usize::MAX {
                    label_of_root[root] = next;
                    next += 1;
                }
                label_of_root[root]
            })
            .collect()
    }
}
