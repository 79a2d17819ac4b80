//! Connectivity rebuild of the decoder.
//!
//! The opcode stream is replayed through a cut border of our own: every
//! opcode names the operation the encoder performed, the border state
//! supplies the vertices it operated on. Each gate face is created with the
//! gate edge first, which reproduces the encoder's face and corner
//! numbering without transmitting it.

use crate::core::bit_coder::ByteReader;
use crate::core::shared::{FePair, VtxIdx};
use crate::decode::attribute::AttrDecoder;
use crate::decode::Err;
use crate::shared::cutborder::{CutBorder, Data, InitOp, Op};
use crate::shared::header::Header;
use crate::utils::bit_coder::{leb128_read, unzigzag};

pub(crate) fn decode_connectivity<R: ByteReader>(
    rd: &mut R,
    header: &Header,
    attr: &mut AttrDecoder,
) -> Result<Vec<[VtxIdx; 3]>, Err> {
    let num_faces = header.num_faces;
    let mut faces: Vec<[VtxIdx; 3]> = Vec::with_capacity(num_faces);
    let mut next_vtx = 0usize;

    let mut cb: CutBorder<FePair> = CutBorder::new(
        num_faces + 4,
        3 * num_faces + 8,
        header.num_vertices,
        header.order,
    );

    loop {
        let b = rd.read_u8()?;
        let iop = InitOp::from_byte(b).ok_or(Err::DataFormat("unknown seed opcode"))?;
        if iop == InitOp::Eom {
            break;
        }
        if faces.len() == num_faces {
            return Err(Err::DataFormat("seed after the last face"));
        }
        if !cb.at_end() {
            return Err(Err::DataFormat("seed while a part is still open"));
        }

        let mask = iop.mask();
        let f = faces.len();
        let mut vs = [0usize; 3];
        for (k, v) in vs.iter_mut().enumerate() {
            if mask & (1 << k) != 0 {
                let idx = leb128_read(rd)? as usize;
                if idx >= next_vtx {
                    return Err(Err::DataFormat("seed back-reference out of range"));
                }
                *v = idx;
            } else {
                if next_vtx == header.num_vertices {
                    return Err(Err::DataFormat("more vertices than the header counts"));
                }
                *v = next_vtx;
                next_vtx += 1;
                attr.vtx(f, k);
            }
        }
        faces.push(vs);
        cb.initial(
            Data {
                vertex: vs[0],
                attach: FePair::new(f, 0),
            },
            Data {
                vertex: vs[1],
                attach: FePair::new(f, 1),
            },
            Data {
                vertex: vs[2],
                attach: FePair::new(f, 2),
            },
        )?;

        while !cb.at_end() && faces.len() < num_faces {
            cb.preserve_order();
            let (d0, d1) = cb.traverse_step();
            let cur = cb.cursor();
            let b = rd.read_u8()?;
            let op = Op::from_byte(b).ok_or(Err::DataFormat("unknown opcode"))?;
            match op {
                Op::Border => {
                    cb.border();
                }
                Op::AddVtx => {
                    if next_vtx == header.num_vertices {
                        return Err(Err::DataFormat("more vertices than the header counts"));
                    }
                    let w = next_vtx;
                    next_vtx += 1;
                    let f = faces.len();
                    faces.push([d1.vertex, d0.vertex, w]);
                    cb.new_vertex(Data {
                        vertex: w,
                        attach: FePair::new(f, 2),
                    })?;
                    *cb.attach_mut(cur) = FePair::new(f, 1);
                    attr.vtx(f, 2);
                }
                Op::ConnFwd => {
                    let f = faces.len();
                    let (real, d) = cb.connect_forward();
                    let w = d.ok_or(Err::DataFormat("forward connection without a live target"))?;
                    faces.push([d1.vertex, d0.vertex, w.vertex]);
                    if real == Op::ConnFwd {
                        *cb.attach_mut(cur) = FePair::new(f, 1);
                    }
                }
                Op::ConnBwd => {
                    let f = faces.len();
                    let (real, d) = cb.connect_backward();
                    let w = d.ok_or(Err::DataFormat("backward connection without a live target"))?;
                    faces.push([d1.vertex, d0.vertex, w.vertex]);
                    if real == Op::ConnBwd {
                        *cb.attach_mut(cur) = FePair::new(f, 2);
                    }
                }
                Op::Split => {
                    let i = unzigzag(leb128_read(rd)?);
                    if i == 0 || i.unsigned_abs() as usize > cb.part_vertices(0) {
                        return Err(Err::DataFormat("split offset out of range"));
                    }
                    let f = faces.len();
                    let d = cb.split_cut_border(i)?;
                    faces.push([d1.vertex, d0.vertex, d.vertex]);
                    *cb.attach_mut(cur) = FePair::new(f, 1);
                    let last = cb.last();
                    *cb.attach_mut(last) = FePair::new(f, 2);
                }
                Op::Union => {
                    let i = unzigzag(leb128_read(rd)?);
                    let p = leb128_read(rd)? as usize;
                    if p == 0 || p >= cb.part_count() {
                        return Err(Err::DataFormat("union part offset out of range"));
                    }
                    if i.unsigned_abs() as usize > cb.part_vertices(p) {
                        return Err(Err::DataFormat("union offset out of range"));
                    }
                    let f = faces.len();
                    let d = cb.cut_border_union(i, p)?;
                    faces.push([d1.vertex, d0.vertex, d.vertex]);
                    *cb.attach_mut(cur) = FePair::new(f, 1);
                    let last = cb.last();
                    *cb.attach_mut(last) = FePair::new(f, 2);
                }
                Op::Nm => {
                    return Err(Err::DataFormat("non-manifold opcode is reserved"));
                }
                Op::CloseBwd | Op::CloseFwd => {
                    return Err(Err::DataFormat("meta opcode on the wire"));
                }
            }
        }
    }

    if faces.len() != num_faces {
        return Err(Err::DataFormat("stream ended before the last face"));
    }
    if next_vtx != header.num_vertices {
        return Err(Err::DataFormat("vertex count does not match the header"));
    }
    Ok(faces)
}
