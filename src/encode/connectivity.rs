//! Connectivity traversal of the encoder.
//!
//! The traversal keeps the cut border between the encoded and the open
//! region of the mesh. Each step reads the cursor edge, looks across it
//! through the half-edge twin, and classifies the gate face's third vertex:
//! unseen (`AddVtx`), adjacent on the border (`ConnFwd`/`ConnBwd`), on the
//! current ring (`Split`) or on an earlier ring (`Union`). Mesh boundaries
//! and gates already consumed from another ring advance with `Border`.
//! Each element carries the encoded-side half-edge
//! of its outgoing border edge, which is what makes the gate lookup O(1).

use crate::core::bit_coder::ByteWriter;
use crate::core::mesh::Mesh;
use crate::core::shared::FePair;
use crate::encode::attribute::AttrCoder;
use crate::encode::{Config, Err};
use crate::shared::cutborder::{CutBorder, Data, Found, InitOp, Op};
use crate::utils::bit_coder::{leb128_write, zigzag};

#[derive(Debug)]
pub(crate) struct Stats {
    /// Number of vertex emissions; the decoder's vertex count.
    pub num_emitted_vertices: usize,
}

pub(crate) fn encode_connectivity<W: ByteWriter>(
    mesh: &Mesh,
    attr: &mut AttrCoder,
    out: &mut W,
    cfg: &Config,
) -> Result<Stats, Err> {
    let conn = &mesh.conn;
    let num_faces = conn.num_faces();
    for f in 0..num_faces {
        let deg = conn.num_edges(f);
        if deg != 3 {
            return Err(Err::UnsupportedFaceDegree(f, deg));
        }
    }

    let mut cb: CutBorder<FePair> = CutBorder::new(
        cfg.part_cap(num_faces),
        cfg.elem_cap(num_faces),
        mesh.attrs.num_vtx(),
        cfg.order,
    );

    let mut visited = vec![false; num_faces];
    let mut num_visited = 0usize;
    // decode-side index of each emitted vertex; re-emission overwrites
    let mut emitted: Vec<Option<usize>> = vec![None; mesh.attrs.num_vtx()];
    let mut emit_count = 0usize;

    for seed in 0..num_faces {
        if visited[seed] {
            continue;
        }
        debug_assert!(cb.at_end());

        let vs = [
            conn.org(FePair::new(seed, 0)),
            conn.org(FePair::new(seed, 1)),
            conn.org(FePair::new(seed, 2)),
        ];
        let mut mask = 0u8;
        for (k, &v) in vs.iter().enumerate() {
            if emitted[v].is_some() {
                mask |= 1 << k;
            }
        }
        out.write_u8(InitOp::from_mask(mask).to_byte());
        for (k, &v) in vs.iter().enumerate() {
            match emitted[v] {
                Some(idx) => leb128_write(idx as u64, out),
                None => {
                    emitted[v] = Some(emit_count);
                    emit_count += 1;
                    attr.vtx(seed, k);
                }
            }
        }

        cb.initial(
            Data {
                vertex: vs[0],
                attach: FePair::new(seed, 0),
            },
            Data {
                vertex: vs[1],
                attach: FePair::new(seed, 1),
            },
            Data {
                vertex: vs[2],
                attach: FePair::new(seed, 2),
            },
        )?;
        visited[seed] = true;
        num_visited += 1;
        attr.face(seed, 0);

        while !cb.at_end() && num_visited < num_faces {
            cb.preserve_order();
            let (d0, _d1) = cb.traverse_step();
            let h = d0.attach;
            let t = conn.twin(h);
            // mesh boundary, or a gate that another ring already consumed
            if t == h || visited[t.f()] {
                out.write_u8(Op::Border.to_byte());
                cb.border();
                continue;
            }

            let gate = t.f();
            let en = conn.enext(t);
            let ep = conn.eprev(t);
            let w = conn.dest(en);
            visited[gate] = true;
            num_visited += 1;
            attr.face(gate, t.e());

            let cur = cb.cursor();
            match cb.find_and_update(w)? {
                None => {
                    out.write_u8(Op::AddVtx.to_byte());
                    cb.new_vertex(Data {
                        vertex: w,
                        attach: ep,
                    })?;
                    *cb.attach_mut(cur) = en;
                    // a vertex that already left the border is re-emitted
                    // as a split copy; its attributes then hit the history
                    emitted[w] = Some(emit_count);
                    emit_count += 1;
                    attr.vtx(gate, ep.e());
                }
                Some(Found::ConnFwd { closed }) => {
                    out.write_u8(Op::ConnFwd.to_byte());
                    if !closed {
                        *cb.attach_mut(cur) = en;
                    }
                }
                Some(Found::ConnBwd { closed }) => {
                    out.write_u8(Op::ConnBwd.to_byte());
                    if !closed {
                        *cb.attach_mut(cur) = ep;
                    }
                }
                Some(Found::Split { i }) => {
                    out.write_u8(Op::Split.to_byte());
                    leb128_write(zigzag(i), out);
                    *cb.attach_mut(cur) = en;
                    let last = cb.last();
                    *cb.attach_mut(last) = ep;
                }
                Some(Found::Union { i, p }) => {
                    out.write_u8(Op::Union.to_byte());
                    leb128_write(zigzag(i), out);
                    leb128_write(p as u64, out);
                    *cb.attach_mut(cur) = en;
                    let last = cb.last();
                    *cb.attach_mut(last) = ep;
                }
            }
        }

        if num_visited == num_faces {
            break;
        }
    }

    out.write_u8(InitOp::Eom.to_byte());
    Ok(Stats {
        num_emitted_vertices: emit_count,
    })
}
