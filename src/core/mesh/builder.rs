//! Mesh assembly on the decode side.
//!
//! The connectivity pass delivers the full face list first; the builder
//! then sizes the attribute storage from the stream schema and lets the
//! attribute decoder fill in regions, bindings, and values.

use crate::core::mesh::attr::{AttrList, AttributeStore, Region};
use crate::core::mesh::conn::{self, Connectivity};
use crate::core::mesh::Mesh;
use crate::core::shared::{AttrIdx, FaceIdx, LedgeIdx, RegIdx, VtxIdx};
use crate::shared::header::Header;

pub struct MeshBuilder {
    conn: Connectivity,
    attrs: AttributeStore,
}

impl MeshBuilder {
    pub fn new(header: &Header, faces: Vec<[VtxIdx; 3]>) -> Result<MeshBuilder, conn::Err> {
        let face_vecs: Vec<Vec<VtxIdx>> = faces.iter().map(|f| f.to_vec()).collect();
        let conn = Connectivity::new(&face_vecs, header.num_vertices)?;

        let mut attrs = AttributeStore::new();
        for schema in &header.lists {
            attrs.add_list(AttrList::with_len(
                schema.kind,
                schema.dim,
                schema.quant,
                schema.len,
            ));
        }
        for schema in &header.regions {
            attrs.add_region(Region::new(
                schema.vtx_lists.clone(),
                schema.face_lists.clone(),
                schema.corner_lists.clone(),
            ));
        }
        attrs.reserve_elements(header.num_vertices, header.num_faces);

        Ok(MeshBuilder { conn, attrs })
    }

    #[inline]
    pub fn conn(&self) -> &Connectivity {
        &self.conn
    }

    /// Split borrow for the prediction passes, which query the connectivity
    /// while writing attribute scratch state.
    #[inline]
    pub fn conn_and_attrs(&mut self) -> (&Connectivity, &mut AttributeStore) {
        (&self.conn, &mut self.attrs)
    }

    #[inline]
    pub fn attrs(&self) -> &AttributeStore {
        &self.attrs
    }

    pub fn vtx_reg(&mut self, v: VtxIdx, r: RegIdx) {
        self.attrs.set_vtx_reg(v, r);
    }

    pub fn face_reg(&mut self, f: FaceIdx, r: RegIdx) {
        self.attrs.set_face_reg(f, r);
    }

    pub fn bind_vtx_attr(&mut self, v: VtxIdx, a: usize, idx: AttrIdx) {
        self.attrs.set_vtx_attr(v, a, idx);
    }

    pub fn bind_face_attr(&mut self, f: FaceIdx, a: usize, idx: AttrIdx) {
        self.attrs.set_face_attr(f, a, idx);
    }

    pub fn bind_corner_attr(&mut self, f: FaceIdx, le: LedgeIdx, a: usize, idx: AttrIdx) {
        self.attrs.set_corner_attr(f, le, a, idx);
    }

    pub fn finish(self) -> Mesh {
        Mesh {
            conn: self.conn,
            attrs: self.attrs,
        }
    }
}
