//! Shared prediction state of the encoder and the decoder.
//!
//! Both sides run the same gathering passes over the same connectivity, so
//! the selected predictions agree without any of them being transmitted.

use smallvec::SmallVec;

use crate::core::mesh::attr::AttributeStore;
use crate::core::mesh::conn::Connectivity;
use crate::core::shared::{FaceIdx, FePair, LedgeIdx, RegIdx, VtxIdx};
use crate::shared::prediction;

/// Collects the triangle fan around `org(ein)`: forward along the twins of
/// the edge cycle, and once a mesh boundary stops the forward walk, a
/// second leg backward from `eprev(ein)`.
fn fan_edges(conn: &Connectivity, ein: FePair, out: &mut SmallVec<[FePair; 8]>) {
    let mut e = ein;
    loop {
        out.push(e);
        let t = conn.twin(e);
        if t == e {
            break;
        }
        e = conn.enext(t);
        if e == ein {
            return;
        }
    }

    let ep = conn.eprev(ein);
    let t = conn.twin(ep);
    if t == ep {
        return;
    }
    let mut e = t;
    loop {
        out.push(e);
        let ep = conn.eprev(e);
        let t = conn.twin(ep);
        if t == ep {
            return;
        }
        e = t;
        if e == ein {
            return;
        }
    }
}

/// Prediction context: which elements are already coded, plus the candidate
/// counters of the round in flight.
pub struct PredictionCtx {
    vtx_is_encoded: Vec<bool>,
    face_is_encoded: Vec<bool>,
    curparal: usize,
    curneigh: usize,
    curhist: usize,
}

impl PredictionCtx {
    pub fn new(num_vtx: usize, num_face: usize) -> PredictionCtx {
        PredictionCtx {
            vtx_is_encoded: vec![false; num_vtx],
            face_is_encoded: vec![false; num_face],
            curparal: 0,
            curneigh: 0,
            curhist: 0,
        }
    }

    /// Adds one parallelogram candidate if all three source vertices are
    /// already coded and live in the target's region.
    fn use_paral(
        &mut self,
        attrs: &mut AttributeStore,
        v0: VtxIdx,
        v1: VtxIdx,
        vo: VtxIdx,
        r: RegIdx,
    ) {
        if !self.vtx_is_encoded[v0] || !self.vtx_is_encoded[v1] || !self.vtx_is_encoded[vo] {
            return;
        }
        if attrs.vtx2reg(v0) != r || attrs.vtx2reg(v1) != r || attrs.vtx2reg(vo) != r {
            return;
        }

        for a in 0..attrs.num_bindings_vtx_reg(r) {
            let l = attrs.binding_reg_vtxlist(r, a);
            let q = attrs.list(l).quant();
            let d0 = attrs.list(l).value(attrs.binding_vtx_attr(v0, a)).clone();
            let d1 = attrs.list(l).value(attrs.binding_vtx_attr(v1, a)).clone();
            let dop = attrs.list(l).value(attrs.binding_vtx_attr(vo, a)).clone();
            let pred = prediction::predict_value(&d0, &d1, &dop, q);
            attrs.list_mut(l).cache_set(self.curparal, pred);
        }
        self.curparal += 1;
    }

    /// Extracts the parallelogram candidates one fan edge contributes.
    /// Triangles reach across the opposite edge; quads use their own
    /// vertices; pentagons and larger contribute two parallelograms.
    fn paral(&mut self, conn: &Connectivity, attrs: &mut AttributeStore, e: FePair, r: RegIdx) {
        if conn.num_edges(e.f()) == 3 {
            let en = conn.enext(e);
            let t = conn.twin(en);
            if t == en {
                return;
            }
            let opp = conn.enext(conn.enext(t));
            self.use_paral(attrs, conn.org(t), conn.dest(t), conn.org(opp), r);
            return;
        }
        let e0 = conn.enext(e);
        let e1 = conn.eprev(e);
        self.use_paral(attrs, conn.org(e0), conn.org(e1), conn.dest(e0), r);
        if conn.num_edges(e.f()) > 4 {
            self.use_paral(attrs, conn.org(e0), conn.org(e1), conn.org(conn.eprev(e1)), r);
        }
    }

    /// Adds one corner candidate from the face on the far side of `e`.
    fn use_corner(&mut self, attrs: &mut AttributeStore, e: FePair, r: RegIdx) {
        let f = e.f();
        let lv = e.e();
        if !self.face_is_encoded[f] {
            return;
        }
        if attrs.face2reg(f) != r {
            return;
        }

        for a in 0..attrs.num_bindings_corner_reg(r) {
            let l = attrs.binding_reg_cornerlist(r, a);
            let q = attrs.list(l).quant();
            let d0 = attrs
                .list(l)
                .value(attrs.binding_corner_attr(f, lv, a))
                .clone();
            let pred = prediction::predict_face_value(&d0, q);
            attrs.list_mut(l).cache_set(self.curhist, pred);
        }
        self.curhist += 1;
    }

    /// Adds one face candidate.
    fn use_neigh(&mut self, attrs: &mut AttributeStore, f: FaceIdx, r: RegIdx) {
        if !self.face_is_encoded[f] {
            return;
        }
        if attrs.face2reg(f) != r {
            return;
        }

        for a in 0..attrs.num_bindings_face_reg(r) {
            let l = attrs.binding_reg_facelist(r, a);
            let q = attrs.list(l).quant();
            let d0 = attrs.list(l).value(attrs.binding_face_attr(f, a)).clone();
            let pred = prediction::predict_face_value(&d0, q);
            attrs.list_mut(l).cache_set(self.curneigh, pred);
        }
        self.curneigh += 1;
    }

    /// Walks the edge ring of the face and gathers every coded neighbor.
    fn neighs(&mut self, conn: &Connectivity, attrs: &mut AttributeStore, e: FePair, r: RegIdx) {
        let mut cur = e;
        loop {
            let n = conn.twin(cur);
            if n != cur {
                self.use_neigh(attrs, n.f(), r);
            }
            cur = conn.enext(cur);
            if cur == e {
                break;
            }
        }
    }

    /// Runs the vertex prediction round for `org((f, le))` and leaves the
    /// selected prediction in each bound list's accumulator. Marks the
    /// vertex coded.
    pub fn vtx(&mut self, conn: &Connectivity, attrs: &mut AttributeStore, f: FaceIdx, le: LedgeIdx) {
        let e = FePair::new(f, le);
        let v = conn.org(e);
        let r = attrs.vtx2reg(v);

        self.curparal = 0;
        let mut fan: SmallVec<[FePair; 8]> = SmallVec::new();
        fan_edges(conn, e, &mut fan);
        for fe in fan {
            self.paral(conn, attrs, fe, r);
        }
        self.vtx_is_encoded[v] = true;
        let n = self.curparal;

        for a in 0..attrs.num_bindings_vtx_reg(r) {
            let l = attrs.binding_reg_vtxlist(r, a);
            attrs.list_mut(l).select_prediction(n);
        }
    }

    /// Runs the face prediction round. Marks the face coded.
    pub fn face(&mut self, conn: &Connectivity, attrs: &mut AttributeStore, f: FaceIdx, le: LedgeIdx) {
        let r = attrs.face2reg(f);
        let e = FePair::new(f, le);

        self.curneigh = 0;
        self.neighs(conn, attrs, e, r);
        self.face_is_encoded[f] = true;
        let n = self.curneigh;

        for a in 0..attrs.num_bindings_face_reg(r) {
            let l = attrs.binding_reg_facelist(r, a);
            attrs.list_mut(l).select_prediction(n);
        }
    }

    /// Runs the corner prediction round. Must run after [`Self::face`] for
    /// the same face: the face is temporarily taken out of the coded set so
    /// the fan only picks up corners of earlier faces.
    pub fn corner(&mut self, conn: &Connectivity, attrs: &mut AttributeStore, f: FaceIdx, le: LedgeIdx) {
        let r = attrs.face2reg(f);
        let e = FePair::new(f, le);

        self.curhist = 0;
        debug_assert!(self.face_is_encoded[f]);
        self.face_is_encoded[f] = false;
        let mut fan: SmallVec<[FePair; 8]> = SmallVec::new();
        fan_edges(conn, e, &mut fan);
        for fe in fan {
            self.use_corner(attrs, fe, r);
        }
        self.face_is_encoded[f] = true;
        let n = self.curhist;

        for a in 0..attrs.num_bindings_corner_reg(r) {
            let l = attrs.binding_reg_cornerlist(r, a);
            attrs.list_mut(l).select_prediction(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::attr::{AttrList, AttributeStore, Region};
    use crate::core::mixing::{ScalarKind, Value};

    fn store_with_vtx_list() -> (AttributeStore, usize, usize) {
        let mut attrs = AttributeStore::new();
        let l = attrs.add_list(AttrList::new(ScalarKind::I32, 1, 0.0));
        let r = attrs.add_region(Region::new(vec![l], vec![], vec![]));
        (attrs, l, r)
    }

    fn push_vtx_val(attrs: &mut AttributeStore, l: usize, r: usize, val: i32) -> usize {
        let idx = attrs.list_mut(l).push_value(Value::of_i32(&[val]));
        attrs.push_vtx(r, &[idx])
    }

    #[test]
    fn single_parallelogram_across_a_shared_edge() {
        // two triangles (0, 1, 2) and (2, 1, 3); predict vertex 3
        let (mut attrs, l, r) = store_with_vtx_list();
        for val in [10, 20, 30, 0] {
            push_vtx_val(&mut attrs, l, r, val);
        }
        let conn = Connectivity::new(&[vec![0, 1, 2], vec![2, 1, 3]], 4).unwrap();

        let mut ctx = PredictionCtx::new(4, 2);
        ctx.vtx(&conn, &mut attrs, 0, 0);
        ctx.vtx(&conn, &mut attrs, 0, 1);
        ctx.vtx(&conn, &mut attrs, 0, 2);
        // no candidates for the first three vertices
        assert_eq!(attrs.list(l).accu(), &Value::of_i32(&[0]));

        ctx.vtx(&conn, &mut attrs, 1, 2);
        // prediction is a(1) + a(2) - a(0) = 20 + 30 - 10
        assert_eq!(attrs.list(l).accu(), &Value::of_i32(&[40]));
    }

    #[test]
    fn quad_contributes_one_parallelogram() {
        // one quad (0, 1, 2, 3); predict vertex 0 from the other three
        let (mut attrs, l, r) = store_with_vtx_list();
        for val in [5, 10, 30, 22] {
            push_vtx_val(&mut attrs, l, r, val);
        }
        let conn = Connectivity::new(&[vec![0, 1, 2, 3]], 4).unwrap();

        let mut ctx = PredictionCtx::new(4, 1);
        ctx.vtx_is_encoded[1] = true;
        ctx.vtx_is_encoded[2] = true;
        ctx.vtx_is_encoded[3] = true;
        ctx.vtx(&conn, &mut attrs, 0, 0);
        // one candidate: a(1) + a(3) - a(2) = 10 + 22 - 30
        assert_eq!(attrs.list(l).accu(), &Value::of_i32(&[2]));
    }

    #[test]
    fn pentagon_contributes_two_parallelograms() {
        let (mut attrs, l, r) = store_with_vtx_list();
        for val in [0, 10, 30, 14, 20] {
            push_vtx_val(&mut attrs, l, r, val);
        }
        let conn = Connectivity::new(&[vec![0, 1, 2, 3, 4]], 5).unwrap();

        let mut ctx = PredictionCtx::new(5, 1);
        for v in 1..5 {
            ctx.vtx_is_encoded[v] = true;
        }
        ctx.vtx(&conn, &mut attrs, 0, 0);
        // candidates a(1) + a(4) - a(2) = 0 and a(1) + a(4) - a(3) = 16;
        // their rounded mean is 8
        assert_eq!(attrs.list(l).accu(), &Value::of_i32(&[8]));
    }

    #[test]
    fn region_mismatch_suppresses_candidates() {
        let mut attrs = AttributeStore::new();
        let l = attrs.add_list(AttrList::new(ScalarKind::I32, 1, 0.0));
        let r0 = attrs.add_region(Region::new(vec![l], vec![], vec![]));
        let r1 = attrs.add_region(Region::new(vec![l], vec![], vec![]));
        for val in [10, 20, 30] {
            let idx = attrs.list_mut(l).push_value(Value::of_i32(&[val]));
            attrs.push_vtx(r0, &[idx]);
        }
        // vertex 3 lives in a different region
        let idx = attrs.list_mut(l).push_value(Value::of_i32(&[0]));
        attrs.push_vtx(r1, &[idx]);
        let conn = Connectivity::new(&[vec![0, 1, 2], vec![2, 1, 3]], 4).unwrap();

        let mut ctx = PredictionCtx::new(4, 2);
        for f in [(0, 0), (0, 1), (0, 2)] {
            ctx.vtx(&conn, &mut attrs, f.0, f.1);
        }
        ctx.vtx(&conn, &mut attrs, 1, 2);
        // the only parallelogram crosses into region 0, so no candidate
        assert_eq!(attrs.list(l).accu(), &Value::of_i32(&[0]));
    }

    #[test]
    fn face_neighbors_feed_the_face_prediction() {
        let mut attrs = AttributeStore::new();
        let lf = attrs.add_list(AttrList::new(ScalarKind::I32, 1, 0.0));
        let r = attrs.add_region(Region::new(vec![], vec![lf], vec![]));
        let faces = vec![
            vec![0, 1, 2],
            vec![0, 2, 3],
            vec![0, 3, 1],
            vec![1, 3, 2],
        ];
        for val in [8, 12, 100, 0] {
            let idx = attrs.list_mut(lf).push_value(Value::of_i32(&[val]));
            attrs.push_face(r, &[idx], &[]);
        }
        // regions for the vertices are irrelevant here but must exist
        let rv = attrs.add_region(Region::new(vec![], vec![], vec![]));
        for _ in 0..4 {
            attrs.push_vtx(rv, &[]);
        }
        let conn = Connectivity::new(&faces, 4).unwrap();

        let mut ctx = PredictionCtx::new(4, 4);
        ctx.face(&conn, &mut attrs, 0, 0);
        assert_eq!(attrs.list(lf).accu(), &Value::of_i32(&[0]));
        ctx.face(&conn, &mut attrs, 1, 0);
        // one coded neighbor: face 0
        assert_eq!(attrs.list(lf).accu(), &Value::of_i32(&[8]));
        ctx.face(&conn, &mut attrs, 2, 0);
        // coded neighbors 0 and 1: mean of 8 and 12
        assert_eq!(attrs.list(lf).accu(), &Value::of_i32(&[10]));
    }

    #[test]
    fn corner_fan_skips_the_own_face() {
        let mut attrs = AttributeStore::new();
        let lc = attrs.add_list(AttrList::new(ScalarKind::I32, 1, 0.0));
        let r = attrs.add_region(Region::new(vec![], vec![], vec![lc]));
        // two triangles sharing edge (1, 2); corner values per face corner
        let c0: Vec<usize> = [7, 9, 11]
            .iter()
            .map(|&v| attrs.list_mut(lc).push_value(Value::of_i32(&[v])))
            .collect();
        attrs.push_face(r, &[], &c0);
        let c1: Vec<usize> = [13, 15, 17]
            .iter()
            .map(|&v| attrs.list_mut(lc).push_value(Value::of_i32(&[v])))
            .collect();
        attrs.push_face(r, &[], &c1);
        let rv = attrs.add_region(Region::new(vec![], vec![], vec![]));
        for _ in 0..4 {
            attrs.push_vtx(rv, &[]);
        }
        let conn = Connectivity::new(&[vec![0, 1, 2], vec![2, 1, 3]], 4).unwrap();

        let mut ctx = PredictionCtx::new(4, 2);
        ctx.face(&conn, &mut attrs, 0, 0);
        ctx.corner(&conn, &mut attrs, 0, 0);
        // no other face is coded yet
        assert_eq!(attrs.list(lc).accu(), &Value::of_i32(&[0]));

        ctx.face(&conn, &mut attrs, 1, 0);
        // corner 0 of face 1 sits on vertex 2; face 0 holds that vertex at
        // its corner 2 with value 11
        ctx.corner(&conn, &mut attrs, 1, 0);
        assert_eq!(attrs.list(lc).accu(), &Value::of_i32(&[11]));
    }
}
