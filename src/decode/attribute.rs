//! Attribute decoding.
//!
//! The vertex emission order is captured while the connectivity replays;
//! faces need no captured order because they were created in stream order.
//! The post-pass mirrors the encoder: the same prediction rounds run over
//! the rebuilt connectivity, then each symbol either delivers a residual
//! for the next fresh value slot or a back-reference into the history.

use crate::core::mesh::builder::MeshBuilder;
use crate::core::progress::Progress;
use crate::core::shared::{AttrIdx, FaceIdx, FePair, LedgeIdx};
use crate::decode::Err;
use crate::shared::header::Header;
use crate::shared::prediction::decode_delta_value;
use crate::shared::prediction_ctx::PredictionCtx;
use crate::shared::symbols::{AttrReader, SymbolKind};

pub(crate) struct AttrDecoder {
    cur_idx: Vec<AttrIdx>,
    order: Vec<FePair>,
    num_vtx: usize,
    num_faces: usize,
}

impl AttrDecoder {
    pub fn new(header: &Header) -> AttrDecoder {
        AttrDecoder {
            cur_idx: vec![0; header.lists.len()],
            order: Vec::new(),
            num_vtx: header.num_vertices,
            num_faces: header.num_faces,
        }
    }

    /// Connectivity callback: vertex `org((f, le))` was emitted.
    pub fn vtx(&mut self, f: FaceIdx, le: LedgeIdx) {
        self.order.push(FePair::new(f, le));
    }

    /// Post-pass over the captured vertex order and the canonical face
    /// order.
    pub fn decode<RD: AttrReader, P: Progress>(
        &mut self,
        builder: &mut MeshBuilder,
        rd: &mut RD,
        prog: &mut P,
    ) -> Result<(), Err> {
        let mut ctx = PredictionCtx::new(self.num_vtx, self.num_faces);

        prog.start(self.order.len());
        for i in 0..self.order.len() {
            let e = self.order[i];
            self.vtx_post(builder, &mut ctx, rd, e)?;
            prog.tick(i);
        }
        for f in 0..self.num_faces {
            self.face_post(builder, &mut ctx, rd, f)?;
            for c in 0..builder.conn().num_edges(f) {
                self.corner_post(builder, &mut ctx, rd, f, c)?;
            }
        }
        prog.end();
        Ok(())
    }

    fn vtx_post<RD: AttrReader>(
        &mut self,
        builder: &mut MeshBuilder,
        ctx: &mut PredictionCtx,
        rd: &mut RD,
        e: FePair,
    ) -> Result<(), Err> {
        let v = builder.conn().org(e);
        let r = rd.reg_vtx()?;
        if r >= builder.attrs().num_regions() {
            return Err(Err::DataFormat("region index out of range"));
        }
        builder.vtx_reg(v, r);

        let (conn, attrs) = builder.conn_and_attrs();
        ctx.vtx(conn, attrs, e.f(), e.e());

        for a in 0..builder.attrs().num_bindings_vtx_reg(r) {
            let l = builder.attrs().binding_reg_vtxlist(r, a);
            let idx = self.read_binding(builder, rd, l)?;
            builder.bind_vtx_attr(v, a, idx);
        }
        Ok(())
    }

    fn face_post<RD: AttrReader>(
        &mut self,
        builder: &mut MeshBuilder,
        ctx: &mut PredictionCtx,
        rd: &mut RD,
        f: FaceIdx,
    ) -> Result<(), Err> {
        let r = rd.reg_face()?;
        if r >= builder.attrs().num_regions() {
            return Err(Err::DataFormat("region index out of range"));
        }
        builder.face_reg(f, r);

        let (conn, attrs) = builder.conn_and_attrs();
        ctx.face(conn, attrs, f, 0);

        for a in 0..builder.attrs().num_bindings_face_reg(r) {
            let l = builder.attrs().binding_reg_facelist(r, a);
            let idx = self.read_binding(builder, rd, l)?;
            builder.bind_face_attr(f, a, idx);
        }
        Ok(())
    }

    fn corner_post<RD: AttrReader>(
        &mut self,
        builder: &mut MeshBuilder,
        ctx: &mut PredictionCtx,
        rd: &mut RD,
        f: FaceIdx,
        le: LedgeIdx,
    ) -> Result<(), Err> {
        // the face region was already read by face_post
        let r = builder.attrs().face2reg(f);

        let (conn, attrs) = builder.conn_and_attrs();
        ctx.corner(conn, attrs, f, le);

        for a in 0..builder.attrs().num_bindings_corner_reg(r) {
            let l = builder.attrs().binding_reg_cornerlist(r, a);
            let idx = self.read_binding(builder, rd, l)?;
            builder.bind_corner_attr(f, le, a, idx);
        }
        Ok(())
    }

    /// Reads one attribute symbol for list `l` and returns the value slot
    /// it names. A residual claims the next fresh slot and reconstructs it
    /// against the prediction left in the list accumulator.
    fn read_binding<RD: AttrReader>(
        &mut self,
        builder: &mut MeshBuilder,
        rd: &mut RD,
        l: usize,
    ) -> Result<AttrIdx, Err> {
        match rd.attr_type(l)? {
            SymbolKind::Data => {
                let idx = self.cur_idx[l];
                if idx >= builder.attrs().list(l).len() {
                    return Err(Err::DataFormat("more values than the schema counts"));
                }
                self.cur_idx[l] += 1;
                let delta = rd.attr_data(l)?;
                let (_, attrs) = builder.conn_and_attrs();
                let list = attrs.list(l);
                let val = decode_delta_value(&delta, list.accu(), list.quant());
                attrs.list_mut(l).set_value(idx, val);
                Ok(idx)
            }
            SymbolKind::Hist => {
                let offset = rd.attr_ghist(l)?;
                if offset >= self.cur_idx[l] {
                    return Err(Err::DataFormat("history reference before the first value"));
                }
                Ok(self.cur_idx[l] - 1 - offset)
            }
            SymbolKind::Lhist => Err(Err::DataFormat("local history symbol is reserved")),
        }
    }
}
