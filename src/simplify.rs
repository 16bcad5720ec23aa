//! pair contraction with quadric error metrics
//!
//! candidate pairs are either face edges or, with a positive epsilon,
//! vertex pairs closer than epsilon found through a kd-tree. each pair
//! caches the position minimizing the summed endpoint quadric and the
//! error at that position. the pairs sit in a min-heap keyed on error;
//! the loop pops the cheapest pair, merges its endpoints through the
//! union-find and re-keys every pair that touched the retired vertex,
//! until enough vertices are gone for the requested ratio.

use crate::glm;
use crate::heap::{HeapItem, IndexHeap};
use crate::kd::KdTree;
use crate::mesh::Mesh;
use crate::utils::math::{inverse, Quadric, Real};
use crate::utils::tools::midpoint;
use ahash::AHashSet;
use itertools::Itertools;

/// a candidate contraction: two representatives with the cached optimal
/// target position and its error
///
/// `slot` is the heap back-index; it moves together with the pair in
/// every sift. an invalidated pair stays in the arena but is skipped
/// everywhere
#[derive(Debug, Clone)]
struct Pair {
    p1: usize,
    p2: usize,
    opt: glm::DVec3,
    error: Real,
    valid: bool,
    slot: usize,
}

impl HeapItem for Pair {
    fn key(&self) -> Real {
        self.error
    }
    fn set_key(&mut self, key: Real) {
        self.error = key;
    }
    fn slot(&self) -> usize {
        self.slot
    }
    fn set_slot(&mut self, slot: usize) {
        self.slot = slot;
    }
}

/// position minimizing the quadric form, along with the error there
///
/// the linear solve fails when the quadric is singular; the fallback
/// picks the cheapest of the two endpoints and their midpoint, where a
/// later candidate wins only on strictly smaller error
fn optimal_contraction(v1: &glm::DVec3, v2: &glm::DVec3, q: &Quadric) -> (glm::DVec3, Real) {
    if let Some(inv) = inverse(&q.partial_derivative_matrix()) {
        let opt = glm::vec3(inv[(0, 3)], inv[(1, 3)], inv[(2, 3)]);
        return (opt, q.apply(&opt));
    }

    let mid = midpoint(v1, v2);
    let error_1 = q.apply(v1);
    let error_2 = q.apply(v2);
    let error_mid = q.apply(&mid);
    if error_1 < error_2 {
        if error_1 < error_mid {
            (*v1, error_1)
        } else {
            (mid, error_mid)
        }
    } else if error_2 < error_mid {
        (*v2, error_2)
    } else {
        (mid, error_mid)
    }
}

/// the running engine: the pair arena and heap over a borrowed mesh
struct Contraction<'m> {
    mesh: &'m mut Mesh,
    pairs: Vec<Pair>,
    heap: IndexHeap,
    survivors: usize,
}

impl<'m> Contraction<'m> {
    fn new(mesh: &'m mut Mesh, epsilon: Real) -> Self {
        for vertex in &mut mesh.verts {
            vertex.pairs.clear();
        }
        let survivors = mesh.survivor_count();
        let mut engine = Self {
            mesh,
            pairs: Vec::new(),
            heap: IndexHeap::new(),
            survivors,
        };

        let mut selected: AHashSet<(usize, usize)> = AHashSet::new();
        let edges: Vec<(usize, usize)> = engine
            .mesh
            .faces()
            .iter()
            .flat_map(|f| [(f.v1, f.v2), (f.v2, f.v3), (f.v3, f.v1)])
            .collect();
        for (a, b) in edges {
            let ra = engine.mesh.repr(a);
            let rb = engine.mesh.repr(b);
            if ra != rb {
                engine.add_pair(ra, rb, &mut selected);
            }
        }

        if epsilon > 0.0 {
            let points: Vec<(usize, glm::DVec3)> = (0..engine.mesh.vertex_count())
                .filter(|&v| engine.mesh.is_representative(v))
                .map(|v| (v, engine.mesh.position(v)))
                .collect();
            let tree = KdTree::build(points.clone());
            let mut hits = Vec::new();
            for (v, pos) in points {
                hits.clear();
                tree.radius_search(&pos, epsilon, &mut hits);
                for &w in &hits {
                    if w != v {
                        engine.add_pair(v, w, &mut selected);
                    }
                }
            }
        }
        log::debug!(
            "selected {} candidate pairs over {} vertices",
            engine.pairs.len(),
            engine.survivors
        );

        let ids = 0..engine.pairs.len();
        engine.heap = IndexHeap::build(&mut engine.pairs, ids);
        engine
    }

    /// registers the pair on both endpoints unless the unordered endpoint
    /// set was selected before
    fn add_pair(&mut self, a: usize, b: usize, selected: &mut AHashSet<(usize, usize)>) {
        if !selected.insert(normalized(a, b)) {
            return;
        }
        let id = self.pairs.len();
        let q = self.mesh.verts[a].q + self.mesh.verts[b].q;
        let (opt, error) = optimal_contraction(&self.mesh.verts[a].pos, &self.mesh.verts[b].pos, &q);
        self.pairs.push(Pair {
            p1: a,
            p2: b,
            opt,
            error,
            valid: true,
            slot: 0,
        });
        self.mesh.verts[a].pairs.push_back(id);
        self.mesh.verts[b].pairs.push_back(id);
    }

    /// pops and contracts minimum-error pairs until no more than `target`
    /// representatives remain; runs dry quietly when the heap empties first
    fn contract_until(&mut self, target: usize) {
        while self.survivors > target {
            let Some(top) = self.heap.peek() else {
                log::debug!(
                    "no contractible pair left at {} vertices (target {})",
                    self.survivors,
                    target
                );
                break;
            };
            if !self.pairs[top].valid {
                self.heap.remove(&mut self.pairs, top);
                continue;
            }
            let (a, b, pos) = {
                let pair = &self.pairs[top];
                (pair.p1, pair.p2, pair.opt)
            };
            self.merge(a, b, pos);
            self.survivors -= 1;
        }
    }

    /// contracts `b` into `a`: the mesh absorbs the retired vertex, then
    /// every pair that referenced it is rewritten and re-keyed, and pairs
    /// that collapsed onto an endpoint set already present on the survivor
    /// are dropped
    fn merge(&mut self, a: usize, b: usize, pos: glm::DVec3) {
        self.mesh.absorb(a, b, pos);

        let incident: Vec<usize> = self.mesh.verts[a].pairs.iter().copied().collect();
        let mut changed: AHashSet<(usize, usize)> = AHashSet::with_capacity(incident.len());
        for id in incident {
            if !self.pairs[id].valid {
                continue;
            }
            self.update_vertex(id, b, a);
            if self.pairs[id].valid {
                let pair = &self.pairs[id];
                if !changed.insert(normalized(pair.p1, pair.p2)) {
                    self.pairs[id].valid = false;
                    self.heap.remove(&mut self.pairs, id);
                }
            }
        }

        // drop retired entries from the survivor's incidence list
        let pairs = &self.pairs;
        let kept: std::collections::LinkedList<usize> = self.mesh.verts[a]
            .pairs
            .iter()
            .copied()
            .filter(|&id| pairs[id].valid)
            .collect();
        self.mesh.verts[a].pairs = kept;
    }

    /// replaces endpoint `x` with `y` on the pair; a pair whose endpoints
    /// became equal has collapsed and leaves the heap, otherwise it is
    /// re-solved and re-keyed in place
    fn update_vertex(&mut self, id: usize, x: usize, y: usize) {
        let pair = &mut self.pairs[id];
        if pair.p1 == x {
            pair.p1 = y;
        }
        if pair.p2 == x {
            pair.p2 = y;
        }
        if pair.p1 == pair.p2 {
            pair.valid = false;
            self.heap.remove(&mut self.pairs, id);
            return;
        }
        let (p1, p2) = (pair.p1, pair.p2);
        let q = self.mesh.verts[p1].q + self.mesh.verts[p2].q;
        let (opt, error) =
            optimal_contraction(&self.mesh.verts[p1].pos, &self.mesh.verts[p2].pos, &q);
        let pair = &mut self.pairs[id];
        pair.opt = opt;
        pair.error = error;
        self.heap.update(&mut self.pairs, id);
    }
}

fn normalized(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Mesh {
    /// simplifies towards every target ratio, largest first, calling
    /// `emit` with the mesh each time a ratio is reached
    ///
    /// a ratio is reached when no more than ratio * vertex_count
    /// representatives survive; a ratio already satisfied emits
    /// immediately. candidate pairs are face edges plus, for a positive
    /// `epsilon`, all vertex pairs within that distance
    pub fn simplify<E>(
        &mut self,
        ratios: &[Real],
        epsilon: Real,
        mut emit: impl FnMut(Real, &Mesh) -> Result<(), E>,
    ) -> Result<(), E> {
        let initial = self.vertex_count();
        let mut pending = ratios
            .iter()
            .copied()
            .sorted_by(Real::total_cmp)
            .collect_vec();
        let mut engine = Contraction::new(self, epsilon);
        while let Some(ratio) = pending.pop() {
            let target = (initial as Real * ratio) as usize;
            engine.contract_until(target);
            emit(ratio, engine.mesh)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn ok(_: Real, _: &Mesh) -> Result<(), Infallible> {
        Ok(())
    }

    #[test]
    fn fallback_prefers_strictly_smaller_error() {
        // a rank-deficient quadric: every point on the plane y = 0 is free
        let q = Quadric::from_plane(0.0, 1.0, 0.0, 0.0);
        let v1 = glm::vec3(0.0, 0.0, 0.0);
        let v2 = glm::vec3(2.0, 2.0, 0.0);
        let (opt, error) = optimal_contraction(&v1, &v2, &q);
        assert_eq!(opt, v1);
        assert_eq!(error, 0.0);

        // all three candidates tie: the midpoint wins
        let v2 = glm::vec3(2.0, 0.0, 0.0);
        let (opt, error) = optimal_contraction(&v1, &v2, &q);
        assert_eq!(opt, glm::vec3(1.0, 0.0, 0.0));
        assert_eq!(error, 0.0);
    }

    #[test]
    fn solved_target_minimizes_the_quadric() {
        // three independent planes meeting at (1, 2, 3)
        let q = Quadric::from_plane(1.0, 0.0, 0.0, -1.0)
            + Quadric::from_plane(0.0, 1.0, 0.0, -2.0)
            + Quadric::from_plane(0.0, 0.0, 1.0, -3.0);
        let (opt, error) = optimal_contraction(
            &glm::vec3(0.0, 0.0, 0.0),
            &glm::vec3(5.0, 5.0, 5.0),
            &q,
        );
        assert!(glm::distance(&opt, &glm::vec3(1.0, 2.0, 3.0)) < 1e-12);
        assert!(error.abs() < 1e-12);
    }

    #[test]
    fn every_contraction_retires_exactly_one_vertex() {
        let mut mesh = Mesh::new();
        let a = mesh.push_vertex(glm::vec3(0.0, 0.0, 0.0));
        let b = mesh.push_vertex(glm::vec3(1.0, 0.0, 0.0));
        let c = mesh.push_vertex(glm::vec3(0.0, 1.0, 1.0));
        let d = mesh.push_vertex(glm::vec3(1.0, 1.0, 1.0));
        mesh.push_face(a, b, c);
        mesh.push_face(b, d, c);

        let mut engine = Contraction::new(&mut mesh, 0.0);
        assert_eq!(engine.survivors, 4);
        // shared edge plus the four rim edges
        assert_eq!(engine.pairs.len(), 5);

        engine.contract_until(3);
        assert_eq!(engine.survivors, 3);
        assert_eq!(engine.mesh.survivor_count(), 3);

        // every live pair joins two distinct representatives
        for pair in engine.pairs.iter().filter(|p| p.valid) {
            assert!(engine.mesh.is_representative(pair.p1));
            assert!(engine.mesh.is_representative(pair.p2));
            assert_ne!(pair.p1, pair.p2);
        }
    }

    #[test]
    fn duplicate_pairs_collapse_after_a_merge() {
        // two triangles sharing the edge (b, c): contracting it folds the
        // pairs a-b / a-c and d-b / d-c onto each other
        let mut mesh = Mesh::new();
        let a = mesh.push_vertex(glm::vec3(-1.0, 0.0, 0.0));
        let b = mesh.push_vertex(glm::vec3(0.0, 0.0, 0.0));
        let c = mesh.push_vertex(glm::vec3(0.0, 1.0, 0.5));
        let d = mesh.push_vertex(glm::vec3(1.0, 0.0, 0.0));
        mesh.push_face(a, b, c);
        mesh.push_face(b, d, c);

        let mut engine = Contraction::new(&mut mesh, 0.0);
        let shared = engine
            .pairs
            .iter()
            .position(|p| normalized(p.p1, p.p2) == (b, c))
            .unwrap();
        let (pos, p1, p2) = {
            let pair = &engine.pairs[shared];
            (pair.opt, pair.p1, pair.p2)
        };
        engine.merge(p1, p2, pos);

        let live: Vec<(usize, usize)> = engine
            .pairs
            .iter()
            .filter(|p| p.valid)
            .map(|p| normalized(p.p1, p.p2))
            .collect();
        // one survivor towards a, one towards d
        assert_eq!(live.len(), 2);
        assert_eq!(live.iter().filter(|&&(x, _)| x == a).count(), 1);
        assert_eq!(live.iter().filter(|&&(_, y)| y == d).count(), 1);
        assert_eq!(engine.heap.len(), 2);
    }

    #[test]
    fn satisfied_ratio_contracts_nothing() {
        let mut mesh = Mesh::new();
        let a = mesh.push_vertex(glm::vec3(0.0, 0.0, 0.0));
        let b = mesh.push_vertex(glm::vec3(1.0, 0.0, 0.0));
        let c = mesh.push_vertex(glm::vec3(0.0, 1.0, 0.0));
        mesh.push_face(a, b, c);
        mesh.simplify(&[1.0], 0.0, ok).unwrap();
        assert_eq!(mesh.survivor_count(), 3);
    }
}
