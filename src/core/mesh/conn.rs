use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::shared::{FaceIdx, FePair, LedgeIdx, VtxIdx};

#[remain::sorted]
#[derive(Debug, Error, PartialEq)]
pub enum Err {
    #[error("face {0} has fewer than three corners")]
    DegenerateFace(FaceIdx),
    #[error("edge ({0}, {1}) is shared by more than two faces or traversed twice in the same direction")]
    NonManifoldEdge(VtxIdx, VtxIdx),
    #[error("face {0} names vertex {1} which is out of range")]
    VertexOutOfRange(FaceIdx, VtxIdx),
}

/// Half-edge connectivity over a polygon mesh.
///
/// Faces keep their corner order; the directed half-edge `(f, e)` runs from
/// corner `e` to corner `(e + 1) % deg`. Two faces sharing an edge must
/// traverse it in opposite directions; a half-edge without a partner is a
/// mesh boundary and is its own twin.
#[derive(Debug)]
pub struct Connectivity {
    /// Corner array offsets, one entry per face plus a terminator.
    offsets: Vec<usize>,
    /// Origin vertex of each corner.
    verts: Vec<VtxIdx>,
    /// Twin of each half-edge; boundary half-edges point at themselves.
    twins: Vec<FePair>,
}

impl Connectivity {
    pub fn new(faces: &[Vec<VtxIdx>], num_vertices: usize) -> Result<Connectivity, Err> {
        let mut offsets = Vec::with_capacity(faces.len() + 1);
        let mut verts = Vec::new();
        offsets.push(0);
        for (f, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(Err::DegenerateFace(f));
            }
            for &v in face {
                if v >= num_vertices {
                    return Err(Err::VertexOutOfRange(f, v));
                }
                verts.push(v);
            }
            offsets.push(verts.len());
        }

        let mut conn = Connectivity {
            offsets,
            verts,
            twins: Vec::new(),
        };
        conn.pair_twins(faces.len())?;
        Ok(conn)
    }

    fn pair_twins(&mut self, num_faces: usize) -> Result<(), Err> {
        // identity-initialized, boundary half-edges keep it
        let mut twins = Vec::with_capacity(self.verts.len());
        for f in 0..num_faces {
            for e in 0..self.num_edges(f) {
                twins.push(FePair::new(f, e));
            }
        }

        let mut open: FxHashMap<(VtxIdx, VtxIdx), FePair> = FxHashMap::default();
        for f in 0..num_faces {
            for e in 0..self.num_edges(f) {
                let h = FePair::new(f, e);
                let a = self.org(h);
                let b = self.dest(h);
                if let Some(opp) = open.remove(&(b, a)) {
                    twins[self.corner(h)] = opp;
                    twins[self.corner(opp)] = h;
                } else if open.contains_key(&(a, b)) {
                    return Err(Err::NonManifoldEdge(a, b));
                } else {
                    open.insert((a, b), h);
                }
            }
        }
        self.twins = twins;
        Ok(())
    }

    #[inline]
    fn corner(&self, e: FePair) -> usize {
        self.offsets[e.f()] + e.e()
    }

    #[inline]
    pub fn num_faces(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub fn num_edges(&self, f: FaceIdx) -> usize {
        self.offsets[f + 1] - self.offsets[f]
    }

    /// Origin vertex of the half-edge.
    #[inline]
    pub fn org(&self, e: FePair) -> VtxIdx {
        self.verts[self.corner(e)]
    }

    /// Destination vertex of the half-edge.
    #[inline]
    pub fn dest(&self, e: FePair) -> VtxIdx {
        self.verts[self.offsets[e.f()] + self.next_ledge(e.f(), e.e())]
    }

    /// Opposite half-edge, or `e` itself on a mesh boundary.
    #[inline]
    pub fn twin(&self, e: FePair) -> FePair {
        self.twins[self.corner(e)]
    }

    /// Successor of the half-edge in its face cycle.
    #[inline]
    pub fn enext(&self, e: FePair) -> FePair {
        FePair::new(e.f(), self.next_ledge(e.f(), e.e()))
    }

    /// Predecessor of the half-edge in its face cycle.
    #[inline]
    pub fn eprev(&self, e: FePair) -> FePair {
        let deg = self.num_edges(e.f());
        FePair::new(e.f(), (e.e() + deg - 1) % deg)
    }

    #[inline]
    fn next_ledge(&self, f: FaceIdx, e: LedgeIdx) -> LedgeIdx {
        let deg = self.num_edges(f);
        (e + 1) % deg
    }
}
