//! The cut border: the moving boundary between the already-encoded and the
//! not-yet-encoded region of the mesh.
//!
//! The boundary is a set of cyclic doubly-linked element rings, one ring
//! per part (connected boundary component under traversal). Elements live
//! in a pool preallocated at construction; the free list is threaded
//! through the same `next` links, so allocation and deletion are O(1) and
//! element handles stay stable for the whole run.
//!
//! Both the encoder and the decoder drive an instance of this structure
//! with the same operation sequence, which is what keeps them in lockstep.

use std::fmt;

use thiserror::Error;

use crate::core::shared::VtxIdx;

/// Element handle into the pool.
pub type ElemIdx = usize;

const NIL: ElemIdx = usize::MAX;

#[remain::sorted]
#[derive(Debug, Error, PartialEq)]
pub enum Err {
    #[error("cut-border element pool exhausted (capacity {0})")]
    ElementPoolExhausted(usize),
    #[error("vertex reported on the cut border but not locatable from the cursor")]
    InconsistentBorder,
    #[error("cut-border part stack exhausted (capacity {0})")]
    PartStackExhausted(usize),
}

/// Cursor advance policy. Depth-first keeps the cursor near the most
/// recently created elements and is the canonical order of the format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraversalOrder {
    BreadthFirst,
    DepthFirst,
}

/// Seed opcodes. `TriXYZ` seeds a triangle whose flagged corners reuse
/// vertices that an earlier part already emitted; `Eom` ends the mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitOp {
    Init,
    Tri100,
    Tri010,
    Tri001,
    Tri110,
    Tri101,
    Tri011,
    Tri111,
    Eom,
}

impl InitOp {
    pub fn to_byte(self) -> u8 {
        match self {
            InitOp::Init => 0,
            InitOp::Tri100 => 1,
            InitOp::Tri010 => 2,
            InitOp::Tri001 => 3,
            InitOp::Tri110 => 4,
            InitOp::Tri101 => 5,
            InitOp::Tri011 => 6,
            InitOp::Tri111 => 7,
            InitOp::Eom => 8,
        }
    }

    pub fn from_byte(b: u8) -> Option<InitOp> {
        Some(match b {
            0 => InitOp::Init,
            1 => InitOp::Tri100,
            2 => InitOp::Tri010,
            3 => InitOp::Tri001,
            4 => InitOp::Tri110,
            5 => InitOp::Tri101,
            6 => InitOp::Tri011,
            7 => InitOp::Tri111,
            8 => InitOp::Eom,
            _ => return None,
        })
    }

    /// Bit `k` set means seed corner `k` reuses an earlier vertex.
    pub fn from_mask(mask: u8) -> InitOp {
        match mask {
            0 => InitOp::Init,
            1 => InitOp::Tri100,
            2 => InitOp::Tri010,
            3 => InitOp::Tri110,
            4 => InitOp::Tri001,
            5 => InitOp::Tri101,
            6 => InitOp::Tri011,
            7 => InitOp::Tri111,
            _ => unreachable!("seed reuse mask has three bits"),
        }
    }

    pub fn mask(self) -> u8 {
        match self {
            InitOp::Init => 0,
            InitOp::Tri100 => 1,
            InitOp::Tri010 => 2,
            InitOp::Tri110 => 3,
            InitOp::Tri001 => 4,
            InitOp::Tri101 => 5,
            InitOp::Tri011 => 6,
            InitOp::Tri111 => 7,
            InitOp::Eom => unreachable!("end of mesh carries no seed mask"),
        }
    }
}

impl fmt::Display for InitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InitOp::Init => "\u{25b3}",
            InitOp::Tri100 | InitOp::Tri010 | InitOp::Tri001 => "\u{25b3}\u{b9}",
            InitOp::Tri110 | InitOp::Tri101 | InitOp::Tri011 => "\u{25b3}\u{b2}",
            InitOp::Tri111 => "\u{25b3}\u{b3}",
            InitOp::Eom => "/",
        };
        f.write_str(s)
    }
}

/// Boundary mutation opcodes. `CloseBwd` and `CloseFwd` are produced when a
/// connection collapses the last triangle of a part; they never reach the
/// wire, the decoder re-derives them from the border state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Border,
    ConnBwd,
    Split,
    Union,
    Nm,
    AddVtx,
    ConnFwd,
    CloseBwd,
    CloseFwd,
}

impl Op {
    pub fn to_byte(self) -> u8 {
        match self {
            Op::Border => 0,
            Op::ConnBwd => 1,
            Op::Split => 2,
            Op::Union => 3,
            Op::Nm => 4,
            Op::AddVtx => 5,
            Op::ConnFwd => 6,
            Op::CloseBwd | Op::CloseFwd => unreachable!("meta operations are never transmitted"),
        }
    }

    pub fn from_byte(b: u8) -> Option<Op> {
        Some(match b {
            0 => Op::Border,
            1 => Op::ConnBwd,
            2 => Op::Split,
            3 => Op::Union,
            4 => Op::Nm,
            5 => Op::AddVtx,
            6 => Op::ConnFwd,
            _ => return None,
        })
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Border => "_",
            Op::ConnBwd => "<",
            Op::Split => "\u{221e}",
            Op::Union => "\u{222a}",
            Op::Nm => "~",
            Op::AddVtx => "*",
            Op::ConnFwd => ">",
            Op::CloseBwd => "?<",
            Op::CloseFwd => "?>",
        };
        f.write_str(s)
    }
}

/// Payload of a boundary element: the mesh vertex it stands on plus an
/// application attachment (the drivers keep the encoded-side half-edge
/// leaving the element there).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Data<A> {
    pub vertex: VtxIdx,
    pub attach: A,
}

#[derive(Clone, Copy)]
struct Element<A> {
    prev: ElemIdx,
    next: ElemIdx,
    data: Data<A>,
    /// True while the directed boundary edge leaving this element is still
    /// a real cut-border edge.
    is_edge_begin: bool,
}

#[derive(Clone, Copy, Default)]
struct Part {
    root: ElemIdx,
    nr_vertices: usize,
    nr_edges: usize,
}

/// Outcome of [`CutBorder::find_and_update`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Found {
    ConnFwd { closed: bool },
    ConnBwd { closed: bool },
    Split { i: i64 },
    Union { i: i64, p: usize },
}

pub struct CutBorder<A: Copy + Default> {
    elems: Vec<Element<A>>,
    free_head: ElemIdx,
    parts: Vec<Part>,
    /// Index of the active part, `None` once the traversal has drained.
    cur: Option<usize>,
    /// Cursor: the active boundary edge runs from `element` to its `next`.
    element: ElemIdx,
    /// Element created by the most recent vertex insertion.
    last: ElemIdx,
    /// Pending part reordering after a backward split.
    swapped: Option<usize>,
    /// Per-vertex count of live elements standing on it.
    vertices: Vec<u32>,
    order: TraversalOrder,
    max_elems: usize,
    max_parts: usize,
    in_use: usize,
    high_water_elems: usize,
    high_water_parts: usize,
}

impl<A: Copy + Default> CutBorder<A> {
    pub fn new(max_parts: usize, max_elems: usize, vertex_hint: usize, order: TraversalOrder) -> Self {
        let placeholder = Element {
            prev: NIL,
            next: NIL,
            data: Data {
                vertex: 0,
                attach: A::default(),
            },
            is_edge_begin: true,
        };
        let mut elems = vec![placeholder; max_elems];
        for (i, e) in elems.iter_mut().enumerate() {
            e.next = if i + 1 == max_elems { NIL } else { i + 1 };
        }
        CutBorder {
            elems,
            free_head: if max_elems == 0 { NIL } else { 0 },
            parts: vec![Part::default(); max_parts],
            cur: None,
            element: NIL,
            last: NIL,
            swapped: None,
            vertices: vec![0; vertex_hint],
            order,
            max_elems,
            max_parts,
            in_use: 0,
            high_water_elems: 0,
            high_water_parts: 0,
        }
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.cur.is_none()
    }

    /// The active boundary edge `(v0, v1)`.
    pub fn traverse_step(&self) -> (Data<A>, Data<A>) {
        let e = &self.elems[self.element];
        (e.data, self.elems[e.next].data)
    }

    /// Stable handle of the cursor element.
    #[inline]
    pub fn cursor(&self) -> ElemIdx {
        self.element
    }

    /// Stable handle of the element created by the last insertion.
    #[inline]
    pub fn last(&self) -> ElemIdx {
        self.last
    }

    #[inline]
    pub fn attach_mut(&mut self, e: ElemIdx) -> &mut A {
        &mut self.elems[e].data.attach
    }

    #[inline]
    pub fn on_cut_border(&self, v: VtxIdx) -> bool {
        v < self.vertices.len() && self.vertices[v] != 0
    }

    pub fn part_count(&self) -> usize {
        self.cur.map_or(0, |c| c + 1)
    }

    /// High-water marks of the element pool and the part stack.
    pub fn stats(&self) -> (usize, usize) {
        (self.high_water_elems, self.high_water_parts)
    }

    #[inline]
    fn pick(&self, bfs: ElemIdx, dfs: ElemIdx) -> ElemIdx {
        match self.order {
            TraversalOrder::BreadthFirst => bfs,
            TraversalOrder::DepthFirst => dfs,
        }
    }

    /// Moves the cursor to the first live boundary edge at or after the
    /// candidate chosen by the traversal order.
    fn advance(&mut self, bfs: ElemIdx, dfs: ElemIdx) {
        let mut nxt = self.pick(bfs, dfs);
        let beg = nxt;
        while !self.elems[nxt].is_edge_begin {
            nxt = self.elems[nxt].next;
            debug_assert_ne!(nxt, beg, "no live edge left on the part");
        }
        self.element = nxt;
    }

    fn activate_vertex(&mut self, v: VtxIdx) {
        if v >= self.vertices.len() {
            self.vertices.resize(v + 1, 0);
        }
        self.vertices[v] += 1;
    }

    fn deactivate_vertex(&mut self, v: VtxIdx) {
        self.vertices[v] -= 1;
    }

    #[inline]
    fn link(&mut self, a: ElemIdx, b: ElemIdx) {
        self.elems[a].next = b;
        self.elems[b].prev = a;
    }

    fn new_element(&mut self, d: Data<A>) -> Result<ElemIdx, Err> {
        let e = self.free_head;
        if e == NIL {
            return Err(Err::ElementPoolExhausted(self.max_elems));
        }
        self.free_head = self.elems[e].next;
        self.activate_vertex(d.vertex);
        self.elems[e].data = d;
        self.elems[e].is_edge_begin = true;
        // cur is live whenever elements are created
        let c = self.cur.unwrap();
        self.parts[c].nr_vertices += 1;
        self.in_use += 1;
        self.high_water_elems = self.high_water_elems.max(self.in_use);
        Ok(e)
    }

    fn del_elements(&mut self, mut e: ElemIdx, n: usize) {
        let c = self.cur.unwrap();
        for _ in 0..n {
            let nxt = self.elems[e].next;
            self.deactivate_vertex(self.elems[e].data.vertex);
            let head = self.free_head;
            if head != NIL {
                self.elems[head].prev = e;
            }
            self.elems[e].next = head;
            self.free_head = e;
            self.parts[c].nr_vertices -= 1;
            self.in_use -= 1;
            e = nxt;
        }
    }

    fn new_part(&mut self, root: ElemIdx) -> Result<(), Err> {
        let c = self.cur.unwrap() + 1;
        if c >= self.max_parts {
            return Err(Err::PartStackExhausted(self.max_parts));
        }
        self.cur = Some(c);
        self.parts[c].root = root;
        self.high_water_parts = self.high_water_parts.max(c + 1);
        Ok(())
    }

    fn del_part(&mut self) {
        let c = self.cur.unwrap();
        debug_assert_eq!(self.parts[c].nr_vertices, 0);
        if c != 0 {
            self.cur = Some(c - 1);
            let r = self.parts[c - 1].root;
            self.advance(r, r);
        } else {
            self.cur = None;
            self.element = NIL;
        }
    }

    #[inline]
    fn istri(&self) -> bool {
        let c = self.cur.unwrap();
        self.parts[c].nr_edges == 3 && self.parts[c].nr_vertices == 3
    }

    /// Seeds the traversal with a triangle. The part stack must be empty.
    pub fn initial(&mut self, d0: Data<A>, d1: Data<A>, d2: Data<A>) -> Result<(), Err> {
        debug_assert!(self.at_end());
        self.cur = Some(0);
        self.high_water_parts = self.high_water_parts.max(1);
        let e0 = self.new_element(d0)?;
        let e1 = self.new_element(d1)?;
        let e2 = self.new_element(d2)?;
        self.link(e0, e1);
        self.link(e1, e2);
        self.link(e2, e0);
        self.parts[0].nr_edges = 3;
        self.advance(e0, e2);
        self.parts[0].root = self.element;
        Ok(())
    }

    /// Inserts a fresh vertex between the cursor and its successor.
    pub fn new_vertex(&mut self, d: Data<A>) -> Result<(), Err> {
        let v0 = self.element;
        let v2 = self.elems[v0].next;
        let v1 = self.new_element(d)?;
        self.last = v1;
        let c = self.cur.unwrap();
        self.parts[c].nr_edges += 1; // -1 + 2
        self.link(v0, v1);
        self.link(v1, v2);
        self.advance(v2, v1);
        Ok(())
    }

    /// Closes the edge to the vertex two ahead of the cursor. Returns the
    /// meta close op when this collapses the part's last triangle, plus the
    /// payload that was two ahead when entering (if its edge was live).
    pub fn connect_forward(&mut self) -> (Op, Option<Data<A>>) {
        let e = self.element;
        let nxt = self.elems[e].next;
        let d = if self.elems[nxt].is_edge_begin {
            Some(self.elems[self.elems[nxt].next].data)
        } else {
            None
        };
        if self.istri() {
            let c = self.cur.unwrap();
            self.del_elements(e, 3);
            self.parts[c].nr_edges = 0;
            self.del_part();
            (Op::CloseFwd, d)
        } else {
            self.elems[e].is_edge_begin = self.elems[nxt].is_edge_begin;
            let e1 = self.elems[nxt].next;
            let c = self.cur.unwrap();
            self.parts[c].nr_edges -= 1; // -2 + 1
            self.del_elements(nxt, 1);
            self.link(e, e1);
            self.advance(e1, e);
            (Op::ConnFwd, d)
        }
    }

    /// Closes the edge to the vertex behind the cursor. The surviving slot
    /// is the cursor's own: payloads are swapped before the predecessor is
    /// deleted, which keeps downstream handle arithmetic uniform.
    pub fn connect_backward(&mut self) -> (Op, Option<Data<A>>) {
        let e = self.element;
        let prv = self.elems[e].prev;
        let d = if self.elems[prv].is_edge_begin {
            Some(self.elems[prv].data)
        } else {
            None
        };
        if self.istri() {
            let c = self.cur.unwrap();
            self.del_elements(e, 3);
            self.parts[c].nr_edges = 0;
            self.del_part();
            (Op::CloseBwd, d)
        } else {
            let tmp = self.elems[e].data;
            self.elems[e].data = self.elems[prv].data;
            self.elems[prv].data = tmp;
            self.elems[e].is_edge_begin = self.elems[prv].is_edge_begin;
            let e0 = self.elems[prv].prev;
            let c = self.cur.unwrap();
            self.parts[c].nr_edges -= 1; // -2 + 1
            self.del_elements(prv, 1);
            self.link(e0, e);
            let bfs = self.elems[e].next;
            self.advance(bfs, e);
            (Op::ConnBwd, d)
        }
    }

    /// Leaves the current edge unmatched and advances. When the vertex under
    /// the cursor has a dead edge on exactly one side, the border advance
    /// degenerates into the corresponding connection; when both sides are
    /// dead the element pair is collapsed out of the ring.
    pub fn border(&mut self) -> Op {
        let c = self.cur.unwrap();
        self.parts[c].nr_edges -= 1;
        if self.parts[c].nr_edges == 0 {
            let e = self.element;
            self.elems[e].is_edge_begin = false;
            self.del_elements(e, self.parts[c].nr_vertices);
            self.del_part();
            return Op::Border;
        }

        let e = self.element;
        let prv_begin = self.elems[self.elems[e].prev].is_edge_begin;
        let nxt_begin = self.elems[self.elems[e].next].is_edge_begin;
        let nv = self.parts[c].nr_vertices;
        if nv >= 1 && (nv < 2 || prv_begin != nxt_begin) {
            self.parts[c].nr_edges += 1;
            if !prv_begin {
                self.connect_backward();
                return Op::ConnBwd;
            } else if !nxt_begin {
                self.connect_forward();
                return Op::ConnFwd;
            }
        } else if nv >= 2 && !prv_begin && !nxt_begin {
            self.elems[e].is_edge_begin = false;
            let n = self.elems[self.elems[e].next].next;
            let p = self.elems[e].prev;
            self.link(p, n);
            self.del_elements(e, 2);
            self.element = n;
        } else {
            self.elems[e].is_edge_begin = false;
        }

        let bfs = self.elems[self.element].next;
        self.advance(bfs, bfs);
        Op::Border
    }

    /// Consumes a pending part swap left behind by a backward split so the
    /// parts are processed in canonical traversal order. Called once before
    /// every traversal step.
    pub fn preserve_order(&mut self) {
        if let Some(sw) = self.swapped.take() {
            if let Some(c) = self.cur {
                if sw < c {
                    self.parts[c].root = self.element;
                    self.parts.swap(sw, c);
                    let r = self.parts[c].root;
                    self.advance(r, r);
                }
            }
        }
    }

    /// Walks `i` boundary steps from the cursor (or from the root of the
    /// part `p` below the top), counting crossed live edges.
    fn get_element(&self, i: i64, p: usize) -> (ElemIdx, usize) {
        let mut e1 = if p != 0 {
            self.parts[self.cur.unwrap() - p].root
        } else {
            self.element
        };
        let mut edgecnt = 0;
        if i > 0 {
            for j in 0..i {
                if j != 0 && self.elems[e1].is_edge_begin {
                    edgecnt += 1;
                }
                e1 = self.elems[e1].next;
            }
        } else {
            for _ in 0..-i {
                let prv = self.elems[e1].prev;
                if self.elems[prv].is_edge_begin {
                    edgecnt += 1;
                }
                e1 = prv;
            }
        }
        (e1, edgecnt)
    }

    /// Bidirectional search for `v`, first on the current part out from the
    /// cursor, then through the earlier parts from their roots. Positive `i`
    /// means `v` lies ahead through `next`, negative behind through `prev`.
    fn find_element(&self, v: VtxIdx) -> (i64, usize) {
        let mut l = self.element;
        let mut r = self.elems[self.element].next;
        let mut i: i64 = 0;
        let mut p = 0usize;
        loop {
            if self.elems[r].data.vertex == v {
                return (i + 1, p);
            }
            if self.elems[l].data.vertex == v {
                return (-i, p);
            }
            if l == r || self.elems[l].prev == r {
                p += 1;
                debug_assert!(self.cur.unwrap() >= p, "vertex not on any live part");
                i = 0;
                l = self.parts[self.cur.unwrap() - p].root;
                r = self.elems[l].next;
            } else {
                l = self.elems[l].prev;
                r = self.elems[r].next;
                i += 1;
            }
        }
    }

    /// Splits the current part: the incoming vertex sits on this part's
    /// border `i` steps away. A fresh element carrying a copy of that
    /// payload is created, the ring is cut into two, and the piece the
    /// traversal continues on becomes the top part. A backward split leaves
    /// a swap marker for `preserve_order`.
    pub fn split_cut_border(&mut self, i: i64) -> Result<Data<A>, Err> {
        let (e1, edgecnt) = self.get_element(i, 0);
        let e0 = self.element;
        let newroot = self.elems[e0].next;
        let newtail = self.elems[e1].prev;
        self.link(e0, e1);

        let dup = self.elems[e1].data;
        let split = self.new_element(dup)?;
        self.last = split;
        self.link(newtail, split);
        self.link(split, newroot);

        let c = self.cur.unwrap();
        if i > 0 {
            let i = (i - 1) as usize;
            self.parts[c].root = self.pick(e1, e0);
            self.parts[c].nr_vertices -= i + 1;
            self.parts[c].nr_edges -= edgecnt;
            self.new_part(newroot)?;
            let c = self.cur.unwrap();
            self.parts[c].nr_vertices += i + 1;
            self.parts[c].nr_edges += edgecnt + 1;
            self.advance(newroot, split);
        } else {
            let i = (-i) as usize;
            self.parts[c].root = self.pick(newroot, split);
            self.parts[c].nr_vertices -= i + 1;
            self.parts[c].nr_edges -= edgecnt;
            let root = self.pick(e1, e0);
            self.new_part(root)?;
            let c = self.cur.unwrap();
            self.parts[c].nr_vertices += i + 1;
            self.parts[c].nr_edges += edgecnt + 1;
            self.parts.swap(c, c - 1);
            self.swapped = Some(c - 1);
            self.advance(newroot, split);
        }

        Ok(self.elems[e1].data)
    }

    /// Merges the current part into the earlier part `p` on which the
    /// incoming vertex was found `i` steps from its root. The merged ring
    /// is moved up the stack so processing continues on it.
    pub fn cut_border_union(&mut self, i: i64, p: usize) -> Result<Data<A>, Err> {
        let (e1, _edgecnt) = self.get_element(i, p);
        let e0 = self.element;
        let newroot = self.elems[e0].next;
        let newtail = self.elems[e1].prev;
        self.link(e0, e1);

        let dup = self.elems[e1].data;
        let un = self.new_element(dup)?;
        self.last = un;
        self.link(newtail, un);
        self.link(un, newroot);

        let c = self.cur.unwrap();
        let target = c - p;
        self.parts[target].nr_vertices += self.parts[c].nr_vertices;
        self.parts[c].nr_vertices = 0;
        self.parts[target].nr_edges += self.parts[c].nr_edges + 1;
        self.parts[c].nr_edges = 0;
        self.parts[target].root = self.pick(newroot, un);
        // process the parts in correct traversal order
        self.parts.swap(target, c - 1);
        self.del_part();

        Ok(self.elems[e1].data)
    }

    /// Locates `v` on the border and performs the fitting operation.
    /// Returns `None` when `v` is not on the border (the caller then emits
    /// a fresh vertex).
    pub fn find_and_update(&mut self, v: VtxIdx) -> Result<Option<Found>, Err> {
        if !self.on_cut_border(v) {
            return Ok(None);
        }
        let (i, p) = self.find_element(v);

        if p > 0 {
            let d = self.cut_border_union(i, p)?;
            debug_assert_eq!(d.vertex, v);
            return Ok(Some(Found::Union { i, p }));
        }

        let e = self.element;
        let nxt = self.elems[e].next;
        let prv = self.elems[e].prev;
        if self.elems[nxt].is_edge_begin && self.elems[self.elems[nxt].next].data.vertex == v {
            let (op, _) = self.connect_forward();
            Ok(Some(Found::ConnFwd {
                closed: op == Op::CloseFwd,
            }))
        } else if self.elems[prv].is_edge_begin && self.elems[prv].data.vertex == v {
            let (op, _) = self.connect_backward();
            Ok(Some(Found::ConnBwd {
                closed: op == Op::CloseBwd,
            }))
        } else if i == 0 {
            Err(Err::InconsistentBorder)
        } else {
            let d = self.split_cut_border(i)?;
            debug_assert_eq!(d.vertex, v);
            Ok(Some(Found::Split { i }))
        }
    }

    /// Number of live elements on the part `p` positions below the top.
    pub fn part_vertices(&self, p: usize) -> usize {
        self.parts[self.cur.unwrap() - p].nr_vertices
    }

    pub fn part_edges(&self, p: usize) -> usize {
        self.parts[self.cur.unwrap() - p].nr_edges
    }
}
