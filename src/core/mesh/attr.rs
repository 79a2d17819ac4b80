//! Attribute storage.
//!
//! Attribute values live in flat lists; vertices, faces, and corners refer
//! into them through bindings. A region groups elements that share a
//! binding schema: every vertex of region `r` binds one value slot in each
//! of the region's vertex lists, and likewise for faces and corners.
//! Several elements may bind the same value slot, which is what the global
//! history exploits.

use crate::core::mixing::{ScalarKind, Value};
use crate::core::shared::{AttrIdx, FaceIdx, LedgeIdx, ListIdx, RegIdx, VtxIdx};

/// One attribute list plus the scratch cells the prediction pipeline needs.
#[derive(Debug)]
pub struct AttrList {
    kind: ScalarKind,
    dim: usize,
    /// Quantization step; `0.0` means quantization is off. Only meaningful
    /// for float kinds.
    quant: f64,
    values: Vec<Value>,
    /// Prediction candidates of the current round.
    cache: Vec<Value>,
    /// Selected prediction, then (on the encode side) the residual.
    accu: Value,
    /// Widened running sum for the candidate mean.
    big: Value,
}

impl AttrList {
    pub fn new(kind: ScalarKind, dim: usize, quant: f64) -> AttrList {
        AttrList {
            kind,
            dim,
            quant,
            values: Vec::new(),
            cache: Vec::new(),
            accu: Value::zeros(kind, dim),
            big: Value::zeros(kind.widened(), dim),
        }
    }

    /// Same list shape with `len` zeroed value slots; used by the decoder.
    pub fn with_len(kind: ScalarKind, dim: usize, quant: f64, len: usize) -> AttrList {
        let mut list = AttrList::new(kind, dim, quant);
        list.values = vec![Value::zeros(kind, dim); len];
        list
    }

    #[inline]
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn quant(&self) -> f64 {
        self.quant
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push_value(&mut self, v: Value) -> AttrIdx {
        debug_assert_eq!(v.dim(), self.dim);
        self.values.push(v);
        self.values.len() - 1
    }

    #[inline]
    pub fn value(&self, idx: AttrIdx) -> &Value {
        &self.values[idx]
    }

    #[inline]
    pub fn set_value(&mut self, idx: AttrIdx, v: Value) {
        self.values[idx] = v;
    }

    #[inline]
    pub fn accu(&self) -> &Value {
        &self.accu
    }

    #[inline]
    pub fn set_accu(&mut self, v: Value) {
        self.accu = v;
    }

    /// Stores prediction candidate `i` of the current round.
    pub fn cache_set(&mut self, i: usize, v: Value) {
        if self.cache.len() <= i {
            self.cache.resize(i + 1, Value::zeros(self.kind, self.dim));
        }
        self.cache[i] = v;
    }

    /// Reduces the first `n` cached candidates into `accu`.
    ///
    /// The mean of the candidates is taken component-wise with
    /// round-to-nearest division. Integer lists and unquantized float lists
    /// keep the mean; quantized float lists snap each component to the
    /// candidate closest to the mean, earlier candidates winning ties.
    pub fn select_prediction(&mut self, n: usize) {
        if n == 0 {
            self.accu = Value::zeros(self.kind, self.dim);
            return;
        }

        self.big = Value::zeros(self.kind.widened(), self.dim);
        for i in 0..n {
            self.big.accumulate(&self.cache[i]);
        }
        let mean = self.big.mean(n, self.kind);

        if self.kind.is_float() && self.quant > 0.0 {
            let mut sel = self.cache[0].clone();
            for c in 0..self.dim {
                let m = mean.comp(c);
                for i in 1..n {
                    let cand = self.cache[i].comp(c);
                    if cand.abs_diff(m) < sel.comp(c).abs_diff(m) {
                        sel.set_comp(c, cand);
                    }
                }
            }
            self.accu = sel;
        } else {
            self.accu = mean;
        }
    }
}

/// Binding schema of one region: which lists its vertices, faces, and
/// corners bind, slot by slot.
#[derive(Clone, Debug, Default)]
pub struct Region {
    vtx_lists: Vec<ListIdx>,
    face_lists: Vec<ListIdx>,
    corner_lists: Vec<ListIdx>,
}

impl Region {
    pub fn new(vtx_lists: Vec<ListIdx>, face_lists: Vec<ListIdx>, corner_lists: Vec<ListIdx>) -> Region {
        Region {
            vtx_lists,
            face_lists,
            corner_lists,
        }
    }
}

/// All attribute lists of a mesh plus the region and binding tables.
#[derive(Debug, Default)]
pub struct AttributeStore {
    lists: Vec<AttrList>,
    regions: Vec<Region>,
    vtx_regions: Vec<RegIdx>,
    face_regions: Vec<RegIdx>,
    /// Value slot per vertex per region slot.
    vtx_attrs: Vec<Vec<AttrIdx>>,
    /// Value slot per face per region slot.
    face_attrs: Vec<Vec<AttrIdx>>,
    /// Value slot per face per (local edge, region slot), local-edge major.
    corner_attrs: Vec<Vec<AttrIdx>>,
}

impl AttributeStore {
    pub fn new() -> AttributeStore {
        AttributeStore::default()
    }

    pub fn add_list(&mut self, list: AttrList) -> ListIdx {
        self.lists.push(list);
        self.lists.len() - 1
    }

    pub fn add_region(&mut self, region: Region) -> RegIdx {
        self.regions.push(region);
        self.regions.len() - 1
    }

    /// Appends a vertex of region `r`; `slots` holds one value index per
    /// vertex list of the region.
    pub fn push_vtx(&mut self, r: RegIdx, slots: &[AttrIdx]) -> VtxIdx {
        debug_assert_eq!(slots.len(), self.regions[r].vtx_lists.len());
        self.vtx_regions.push(r);
        self.vtx_attrs.push(slots.to_vec());
        self.vtx_regions.len() - 1
    }

    /// Appends a face of region `r`. `corner_slots` is local-edge major:
    /// one run of corner-list slots per corner of the face.
    pub fn push_face(&mut self, r: RegIdx, slots: &[AttrIdx], corner_slots: &[AttrIdx]) -> FaceIdx {
        debug_assert_eq!(slots.len(), self.regions[r].face_lists.len());
        self.face_regions.push(r);
        self.face_attrs.push(slots.to_vec());
        self.corner_attrs.push(corner_slots.to_vec());
        self.face_regions.len() - 1
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.lists.len()
    }

    #[inline]
    pub fn num_vtx(&self) -> usize {
        self.vtx_regions.len()
    }

    #[inline]
    pub fn num_face(&self) -> usize {
        self.face_regions.len()
    }

    #[inline]
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn region(&self, r: RegIdx) -> &Region {
        &self.regions[r]
    }

    #[inline]
    pub fn vtx2reg(&self, v: VtxIdx) -> RegIdx {
        self.vtx_regions[v]
    }

    #[inline]
    pub fn face2reg(&self, f: FaceIdx) -> RegIdx {
        self.face_regions[f]
    }

    #[inline]
    pub fn num_bindings_vtx_reg(&self, r: RegIdx) -> usize {
        self.regions[r].vtx_lists.len()
    }

    #[inline]
    pub fn num_bindings_face_reg(&self, r: RegIdx) -> usize {
        self.regions[r].face_lists.len()
    }

    #[inline]
    pub fn num_bindings_corner_reg(&self, r: RegIdx) -> usize {
        self.regions[r].corner_lists.len()
    }

    #[inline]
    pub fn binding_reg_vtxlist(&self, r: RegIdx, a: usize) -> ListIdx {
        self.regions[r].vtx_lists[a]
    }

    #[inline]
    pub fn binding_reg_facelist(&self, r: RegIdx, a: usize) -> ListIdx {
        self.regions[r].face_lists[a]
    }

    #[inline]
    pub fn binding_reg_cornerlist(&self, r: RegIdx, a: usize) -> ListIdx {
        self.regions[r].corner_lists[a]
    }

    #[inline]
    pub fn binding_vtx_attr(&self, v: VtxIdx, a: usize) -> AttrIdx {
        self.vtx_attrs[v][a]
    }

    #[inline]
    pub fn binding_face_attr(&self, f: FaceIdx, a: usize) -> AttrIdx {
        self.face_attrs[f][a]
    }

    #[inline]
    pub fn binding_corner_attr(&self, f: FaceIdx, le: LedgeIdx, a: usize) -> AttrIdx {
        let n = self.num_bindings_corner_reg(self.face_regions[f]);
        self.corner_attrs[f][le * n + a]
    }

    #[inline]
    pub fn list(&self, l: ListIdx) -> &AttrList {
        &self.lists[l]
    }

    #[inline]
    pub fn list_mut(&mut self, l: ListIdx) -> &mut AttrList {
        &mut self.lists[l]
    }

    // Setters used when a mesh is rebuilt from a stream. The element tables
    // must have been pre-sized through `reserve_elements`.

    pub fn reserve_elements(&mut self, num_vtx: usize, num_face: usize) {
        self.vtx_regions = vec![0; num_vtx];
        self.vtx_attrs = vec![Vec::new(); num_vtx];
        self.face_regions = vec![0; num_face];
        self.face_attrs = vec![Vec::new(); num_face];
        self.corner_attrs = vec![Vec::new(); num_face];
    }

    pub fn set_vtx_reg(&mut self, v: VtxIdx, r: RegIdx) {
        self.vtx_regions[v] = r;
        self.vtx_attrs[v] = vec![AttrIdx::MAX; self.regions[r].vtx_lists.len()];
    }

    pub fn set_face_reg(&mut self, f: FaceIdx, r: RegIdx) {
        self.face_regions[f] = r;
        self.face_attrs[f] = vec![AttrIdx::MAX; self.regions[r].face_lists.len()];
    }

    pub fn set_vtx_attr(&mut self, v: VtxIdx, a: usize, idx: AttrIdx) {
        self.vtx_attrs[v][a] = idx;
    }

    pub fn set_face_attr(&mut self, f: FaceIdx, a: usize, idx: AttrIdx) {
        self.face_attrs[f][a] = idx;
    }

    pub fn set_corner_attr(&mut self, f: FaceIdx, le: LedgeIdx, a: usize, idx: AttrIdx) {
        let n = self.num_bindings_corner_reg(self.face_regions[f]);
        let flat = le * n + a;
        if self.corner_attrs[f].len() <= flat {
            self.corner_attrs[f].resize(flat + 1, AttrIdx::MAX);
        }
        self.corner_attrs[f][flat] = idx;
    }
}
