use crate::glm;
use crate::utils::math::{cross, Quadric};
use std::collections::LinkedList;

/// a vertex of the arena: position, accumulated error quadric, the
/// union-find parent index (itself while the vertex is alive) and the
/// contraction pairs it currently participates in
///
/// vertices are never removed; a merged-away vertex keeps its slot and is
/// recognized by a parent link pointing elsewhere
#[derive(Debug)]
pub(crate) struct Vertex {
    pub(crate) pos: glm::DVec3,
    pub(crate) q: Quadric,
    pub(crate) parent: usize,
    pub(crate) pairs: LinkedList<usize>,
}

/// a triangle referencing vertices by arena index
///
/// faces are created at load time and never rewritten; whoever consumes
/// them resolves the corners through the union-find first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub v1: usize,
    pub v2: usize,
    pub v3: usize,
}

/// triangular mesh: an append-only vertex arena plus the face list
#[derive(Debug, Default)]
pub struct Mesh {
    pub(crate) verts: Vec<Vertex>,
    pub(crate) faces: Vec<Face>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// appends a vertex and returns its arena index
    pub fn push_vertex(&mut self, pos: glm::DVec3) -> usize {
        let id = self.verts.len();
        self.verts.push(Vertex {
            pos,
            q: Quadric::default(),
            parent: id,
            pairs: LinkedList::new(),
        });
        id
    }

    /// appends a triangle and accumulates its plane quadric into the three
    /// corners
    ///
    /// a face whose unit normal has any component that is not a finite
    /// normal number is degenerate: it stays in the face list but
    /// contributes no quadric
    pub fn push_face(&mut self, v1: usize, v2: usize, v3: usize) {
        self.faces.push(Face { v1, v2, v3 });

        let p1 = self.verts[v1].pos;
        let p2 = self.verts[v2].pos;
        let p3 = self.verts[v3].pos;
        let normal = cross(&(p2 - p1), &(p3 - p1)).normalize();
        if !normal.x.is_normal() || !normal.y.is_normal() || !normal.z.is_normal() {
            log::trace!("degenerate face ({v1}, {v2}, {v3}) contributes no quadric");
            return;
        }
        let d = -p1.dot(&normal);
        let kp = Quadric::from_plane(normal.x, normal.y, normal.z, d);
        self.verts[v1].q += kp;
        self.verts[v2].q += kp;
        self.verts[v3].q += kp;
    }

    /// number of vertices ever loaded, merged-away ones included
    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    /// number of faces ever loaded, collapsed ones included
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// number of vertices that are still their own representative
    pub fn survivor_count(&self) -> usize {
        (0..self.verts.len())
            .filter(|&v| self.verts[v].parent == v)
            .count()
    }

    pub fn position(&self, v: usize) -> glm::DVec3 {
        self.verts[v].pos
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// true while the vertex is its own union-find root
    pub fn is_representative(&self, v: usize) -> bool {
        self.verts[v].parent == v
    }

    /// representative lookup without path compression, usable on a shared
    /// mesh (the writer runs on this one)
    pub fn find(&self, mut v: usize) -> usize {
        while self.verts[v].parent != v {
            v = self.verts[v].parent;
        }
        v
    }

    /// representative lookup with path compression; every vertex on the
    /// walked chain is relinked straight to the root
    pub(crate) fn repr(&mut self, v: usize) -> usize {
        let mut root = v;
        while self.verts[root].parent != root {
            root = self.verts[root].parent;
        }
        let mut cur = v;
        while cur != root {
            let next = self.verts[cur].parent;
            self.verts[cur].parent = root;
            cur = next;
        }
        root
    }

    /// retires `b` into `a`: the survivor moves to `pos` and takes over
    /// the retired quadric, the union-find link and, by splicing, the pair
    /// incidence list
    pub(crate) fn absorb(&mut self, a: usize, b: usize, pos: glm::DVec3) {
        self.verts[a].pos = pos;
        let qb = self.verts[b].q;
        self.verts[a].q += qb;
        self.verts[b].parent = a;
        let mut moved = std::mem::take(&mut self.verts[b].pairs);
        self.verts[a].pairs.append(&mut moved);
    }
}
