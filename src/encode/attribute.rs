//! Attribute encoding.
//!
//! Phase one happens during the connectivity traversal: the `vtx` and
//! `face` callbacks only record the emission order. Phase two replays that
//! order, runs the shared prediction rounds, and emits one symbol per
//! attribute binding: the residual for a slot seen for the first time, a
//! history back-reference otherwise.

use crate::core::mesh::Mesh;
use crate::core::progress::Progress;
use crate::core::shared::{FaceIdx, FePair, LedgeIdx};
use crate::shared::history::GlobalHistory;
use crate::shared::prediction::{decode_delta_value, encode_delta_value};
use crate::shared::prediction_ctx::PredictionCtx;
use crate::shared::symbols::AttrWriter;

pub(crate) struct AttrCoder {
    ghist: Vec<GlobalHistory>,
    order: Vec<FePair>,
    order_f: Vec<FePair>,
}

impl AttrCoder {
    pub fn new(attrs: &crate::core::mesh::attr::AttributeStore) -> AttrCoder {
        let mut ghist = Vec::with_capacity(attrs.size());
        for l in 0..attrs.size() {
            let mut h = GlobalHistory::new();
            h.resize(attrs.list(l).len());
            ghist.push(h);
        }
        AttrCoder {
            ghist,
            order: Vec::new(),
            order_f: Vec::new(),
        }
    }

    /// Traversal callback: vertex `org((f, le))` was emitted.
    pub fn vtx(&mut self, f: FaceIdx, le: LedgeIdx) {
        self.order.push(FePair::new(f, le));
    }

    /// Traversal callback: face `f` was emitted, entered through edge `le`.
    pub fn face(&mut self, f: FaceIdx, le: LedgeIdx) {
        self.order_f.push(FePair::new(f, le));
    }

    #[cfg(test)]
    pub fn vtx_order(&self) -> &[FePair] {
        &self.order
    }

    #[cfg(test)]
    pub fn face_order(&self) -> &[FePair] {
        &self.order_f
    }

    /// Phase two: emits every attribute symbol in emission order.
    pub fn encode<WR: AttrWriter, P: Progress>(&mut self, mesh: &mut Mesh, wr: &mut WR, prog: &mut P) {
        let mut ctx = PredictionCtx::new(mesh.attrs.num_vtx(), mesh.attrs.num_face());

        prog.start(self.order.len());
        for i in 0..self.order.len() {
            let e = self.order[i];
            self.vtx_post(mesh, &mut ctx, wr, e);
            prog.tick(i);
        }
        for i in 0..self.order_f.len() {
            let e = self.order_f[i];
            self.face_post(mesh, &mut ctx, wr, e);
            let ne = mesh.conn.num_edges(e.f());
            let mut c = e.e();
            loop {
                self.corner_post(mesh, &mut ctx, wr, e.f(), c);
                c += 1;
                if c == ne {
                    c = 0;
                }
                if c == e.e() {
                    break;
                }
            }
        }
        prog.end();
    }

    fn vtx_post<WR: AttrWriter>(
        &mut self,
        mesh: &mut Mesh,
        ctx: &mut PredictionCtx,
        wr: &mut WR,
        e: FePair,
    ) {
        let Mesh { conn, attrs } = mesh;
        let v = conn.org(e);
        let r = attrs.vtx2reg(v);

        ctx.vtx(conn, attrs, e.f(), e.e());
        wr.reg_vtx(r);

        for a in 0..attrs.num_bindings_vtx_reg(r) {
            let l = attrs.binding_reg_vtxlist(r, a);
            let idx = attrs.binding_vtx_attr(v, a);
            match self.ghist[l].lget_set(idx) {
                None => Self::emit_data(attrs, wr, l, idx),
                Some(offset) => wr.attr_ghist(offset, l),
            }
        }
    }

    fn face_post<WR: AttrWriter>(
        &mut self,
        mesh: &mut Mesh,
        ctx: &mut PredictionCtx,
        wr: &mut WR,
        e: FePair,
    ) {
        let Mesh { conn, attrs } = mesh;
        let f = e.f();
        let r = attrs.face2reg(f);

        ctx.face(conn, attrs, f, e.e());
        wr.reg_face(r);

        for a in 0..attrs.num_bindings_face_reg(r) {
            let l = attrs.binding_reg_facelist(r, a);
            let idx = attrs.binding_face_attr(f, a);
            match self.ghist[l].lget_set(idx) {
                None => Self::emit_data(attrs, wr, l, idx),
                Some(offset) => wr.attr_ghist(offset, l),
            }
        }
    }

    fn corner_post<WR: AttrWriter>(
        &mut self,
        mesh: &mut Mesh,
        ctx: &mut PredictionCtx,
        wr: &mut WR,
        f: FaceIdx,
        le: LedgeIdx,
    ) {
        let Mesh { conn, attrs } = mesh;
        let r = attrs.face2reg(f);

        ctx.corner(conn, attrs, f, le);

        for a in 0..attrs.num_bindings_corner_reg(r) {
            let l = attrs.binding_reg_cornerlist(r, a);
            let idx = attrs.binding_corner_attr(f, le, a);
            match self.ghist[l].lget_set(idx) {
                None => Self::emit_data(attrs, wr, l, idx),
                Some(offset) => wr.attr_ghist(offset, l),
            }
        }
    }

    /// Emits the residual for a first-sight slot. Float lists keep the
    /// reconstructed value so later predictions match the decoder's.
    fn emit_data<WR: AttrWriter>(
        attrs: &mut crate::core::mesh::attr::AttributeStore,
        wr: &mut WR,
        l: usize,
        idx: usize,
    ) {
        let q = attrs.list(l).quant();
        let raw = attrs.list(l).value(idx).clone();
        let pred = attrs.list(l).accu().clone();
        let res = encode_delta_value(&raw, &pred, q);
        wr.attr_data(&res, l);
        if attrs.list(l).kind().is_float() {
            let rec = decode_delta_value(&res, &pred, q);
            attrs.list_mut(l).set_value(idx, rec);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::attr::{AttrList, AttributeStore, Region};
    use crate::core::mixing::{ScalarKind, Value};
    use crate::core::progress::NoProgress;
    use crate::core::shared::{ListIdx, RegIdx};
    use crate::shared::symbols::AttrWriter;

    /// Writer that records the symbol stream for inspection.
    #[derive(Default)]
    struct TapeWriter {
        tape: Vec<Symbol>,
    }

    #[derive(Debug, PartialEq)]
    enum Symbol {
        RegVtx(RegIdx),
        RegFace(RegIdx),
        Data(Value, ListIdx),
        Ghist(usize, ListIdx),
    }

    impl AttrWriter for TapeWriter {
        fn reg_vtx(&mut self, r: RegIdx) {
            self.tape.push(Symbol::RegVtx(r));
        }
        fn reg_face(&mut self, r: RegIdx) {
            self.tape.push(Symbol::RegFace(r));
        }
        fn attr_data(&mut self, v: &Value, l: ListIdx) {
            self.tape.push(Symbol::Data(v.clone(), l));
        }
        fn attr_ghist(&mut self, offset: usize, l: ListIdx) {
            self.tape.push(Symbol::Ghist(offset, l));
        }
    }

    fn triangle_mesh(vals: &[i32], slots: &[usize]) -> Mesh {
        let mut attrs = AttributeStore::new();
        let l = attrs.add_list(AttrList::new(ScalarKind::I32, 1, 0.0));
        let r = attrs.add_region(Region::new(vec![l], vec![], vec![]));
        for &v in vals {
            attrs.list_mut(l).push_value(Value::of_i32(&[v]));
        }
        for &s in slots {
            attrs.push_vtx(r, &[s]);
        }
        attrs.push_face(r, &[], &[]);
        Mesh::new(vec![vec![0, 1, 2]], attrs).unwrap()
    }

    #[test]
    fn first_sight_values_go_out_as_raw_residuals() {
        let mut mesh = triangle_mesh(&[10, 20, 30], &[0, 1, 2]);
        let mut coder = AttrCoder::new(&mesh.attrs);
        for le in 0..3 {
            coder.vtx(0, le);
        }
        coder.face(0, 0);

        let mut tape = TapeWriter::default();
        coder.encode(&mut mesh, &mut tape, &mut NoProgress);
        // nothing is coded before each vertex, so residuals are the values
        assert_eq!(
            tape.tape,
            vec![
                Symbol::RegVtx(0),
                Symbol::Data(Value::of_i32(&[10]), 0),
                Symbol::RegVtx(0),
                Symbol::Data(Value::of_i32(&[20]), 0),
                Symbol::RegVtx(0),
                Symbol::Data(Value::of_i32(&[30]), 0),
                Symbol::RegFace(0),
            ]
        );
    }

    #[test]
    fn shared_slot_hits_the_history() {
        // vertices 0 and 1 bind the same value slot
        let mut mesh = triangle_mesh(&[10, 30], &[0, 0, 1]);
        let mut coder = AttrCoder::new(&mesh.attrs);
        for le in 0..3 {
            coder.vtx(0, le);
        }
        coder.face(0, 0);

        let mut tape = TapeWriter::default();
        coder.encode(&mut mesh, &mut tape, &mut NoProgress);
        assert_eq!(
            tape.tape,
            vec![
                Symbol::RegVtx(0),
                Symbol::Data(Value::of_i32(&[10]), 0),
                Symbol::RegVtx(0),
                Symbol::Ghist(0, 0),
                Symbol::RegVtx(0),
                Symbol::Data(Value::of_i32(&[30]), 0),
                Symbol::RegFace(0),
            ]
        );
    }

    #[test]
    fn parallelogram_residual_on_the_second_triangle() {
        let mut attrs = AttributeStore::new();
        let l = attrs.add_list(AttrList::new(ScalarKind::I32, 1, 0.0));
        let r = attrs.add_region(Region::new(vec![l], vec![], vec![]));
        for v in [10, 20, 30, 45] {
            let idx = attrs.list_mut(l).push_value(Value::of_i32(&[v]));
            attrs.push_vtx(r, &[idx]);
        }
        attrs.push_face(r, &[], &[]);
        attrs.push_face(r, &[], &[]);
        let mut mesh = Mesh::new(vec![vec![0, 1, 2], vec![2, 1, 3]], attrs).unwrap();

        let mut coder = AttrCoder::new(&mesh.attrs);
        coder.vtx(0, 0);
        coder.vtx(0, 1);
        coder.vtx(0, 2);
        coder.vtx(1, 2); // vertex 3 enters on face 1
        coder.face(0, 0);
        coder.face(1, 0);

        let mut tape = TapeWriter::default();
        coder.encode(&mut mesh, &mut tape, &mut NoProgress);
        // prediction for vertex 3 is a(1) + a(2) - a(0) = 40, raw is 45
        assert_eq!(
            tape.tape[7],
            Symbol::Data(Value::of_i32(&[5]), 0),
            "got tape {:?}",
            tape.tape
        );
    }

    #[test]
    fn quantized_float_values_are_requantized_in_place() {
        let mut attrs = AttributeStore::new();
        let l = attrs.add_list(AttrList::new(ScalarKind::F32, 1, 0.5));
        let r = attrs.add_region(Region::new(vec![l], vec![], vec![]));
        for v in [0.1f32, 0.6, 1.3] {
            let idx = attrs.list_mut(l).push_value(Value::of_f32(&[v]));
            attrs.push_vtx(r, &[idx]);
        }
        attrs.push_face(r, &[], &[]);
        let mut mesh = Mesh::new(vec![vec![0, 1, 2]], attrs).unwrap();

        let mut coder = AttrCoder::new(&mesh.attrs);
        for le in 0..3 {
            coder.vtx(0, le);
        }
        coder.face(0, 0);

        let mut tape = TapeWriter::default();
        coder.encode(&mut mesh, &mut tape, &mut NoProgress);
        // each value was replaced by prediction + steps * q
        assert_eq!(mesh.attrs.list(l).value(0), &Value::of_f32(&[0.0]));
        assert_eq!(mesh.attrs.list(l).value(1), &Value::of_f32(&[0.5]));
        assert_eq!(mesh.attrs.list(l).value(2), &Value::of_f32(&[1.5]));
    }
}
