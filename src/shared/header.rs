//! Stream header: magic, counts, and the attribute schema the decoder
//! needs to rebuild the storage before any symbol is read.

use thiserror::Error;

use crate::core::bit_coder::{ByteReader, ByteWriter, ReaderErr};
use crate::core::mesh::attr::AttributeStore;
use crate::core::mixing::ScalarKind;
use crate::core::shared::ListIdx;
use crate::shared::cutborder::TraversalOrder;
use crate::utils::bit_coder::{leb128_read, leb128_write};

const MAGIC: [u8; 4] = *b"CBM1";
const VERSION: u8 = 1;

const FLAG_BREADTH_FIRST: u8 = 0x01;

#[remain::sorted]
#[derive(Debug, Error, PartialEq)]
pub enum Err {
    #[error("bad magic bytes, not a cut-border stream")]
    BadMagic,
    #[error("invalid component kind tag {0}")]
    InvalidKindTag(u8),
    #[error("reader error: {0}")]
    ReaderError(#[from] ReaderErr),
    #[error("unsupported stream version {0}")]
    UnsupportedVersion(u8),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListSchema {
    pub kind: ScalarKind,
    pub dim: usize,
    pub quant: f64,
    pub len: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionSchema {
    pub vtx_lists: Vec<ListIdx>,
    pub face_lists: Vec<ListIdx>,
    pub corner_lists: Vec<ListIdx>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub order: TraversalOrder,
    /// Vertex count after decoding, i.e. the number of vertex emissions.
    pub num_vertices: usize,
    pub num_faces: usize,
    pub lists: Vec<ListSchema>,
    pub regions: Vec<RegionSchema>,
}

impl Header {
    pub fn gather(
        attrs: &AttributeStore,
        order: TraversalOrder,
        num_vertices: usize,
        num_faces: usize,
    ) -> Header {
        let lists = (0..attrs.size())
            .map(|l| {
                let list = attrs.list(l);
                ListSchema {
                    kind: list.kind(),
                    dim: list.dim(),
                    quant: list.quant(),
                    len: list.len(),
                }
            })
            .collect();
        let regions = (0..attrs.num_regions())
            .map(|r| RegionSchema {
                vtx_lists: (0..attrs.num_bindings_vtx_reg(r))
                    .map(|a| attrs.binding_reg_vtxlist(r, a))
                    .collect(),
                face_lists: (0..attrs.num_bindings_face_reg(r))
                    .map(|a| attrs.binding_reg_facelist(r, a))
                    .collect(),
                corner_lists: (0..attrs.num_bindings_corner_reg(r))
                    .map(|a| attrs.binding_reg_cornerlist(r, a))
                    .collect(),
            })
            .collect();
        Header {
            order,
            num_vertices,
            num_faces,
            lists,
            regions,
        }
    }

    pub fn write<W: ByteWriter>(&self, wr: &mut W) {
        wr.write_bytes(&MAGIC);
        wr.write_u8(VERSION);
        let mut flags = 0u8;
        if self.order == TraversalOrder::BreadthFirst {
            flags |= FLAG_BREADTH_FIRST;
        }
        wr.write_u8(flags);
        leb128_write(self.num_vertices as u64, wr);
        leb128_write(self.num_faces as u64, wr);

        leb128_write(self.lists.len() as u64, wr);
        for list in &self.lists {
            wr.write_u8(list.kind.tag());
            wr.write_u8(list.dim as u8);
            wr.write_u64(list.quant.to_bits());
            leb128_write(list.len as u64, wr);
        }

        leb128_write(self.regions.len() as u64, wr);
        for region in &self.regions {
            for lists in [&region.vtx_lists, &region.face_lists, &region.corner_lists] {
                leb128_write(lists.len() as u64, wr);
                for &l in lists.iter() {
                    leb128_write(l as u64, wr);
                }
            }
        }
    }

    pub fn read<R: ByteReader>(rd: &mut R) -> Result<Header, Err> {
        let mut magic = [0u8; 4];
        for b in magic.iter_mut() {
            *b = rd.read_u8()?;
        }
        if magic != MAGIC {
            return Err(Err::BadMagic);
        }
        let version = rd.read_u8()?;
        if version != VERSION {
            return Err(Err::UnsupportedVersion(version));
        }
        let flags = rd.read_u8()?;
        let order = if flags & FLAG_BREADTH_FIRST != 0 {
            TraversalOrder::BreadthFirst
        } else {
            TraversalOrder::DepthFirst
        };
        let num_vertices = leb128_read(rd)? as usize;
        let num_faces = leb128_read(rd)? as usize;

        let num_lists = leb128_read(rd)? as usize;
        let mut lists = Vec::with_capacity(num_lists);
        for _ in 0..num_lists {
            let tag = rd.read_u8()?;
            let kind = ScalarKind::from_tag(tag).ok_or(Err::InvalidKindTag(tag))?;
            let dim = rd.read_u8()? as usize;
            let quant = f64::from_bits(rd.read_u64()?);
            let len = leb128_read(rd)? as usize;
            lists.push(ListSchema {
                kind,
                dim,
                quant,
                len,
            });
        }

        let num_regions = leb128_read(rd)? as usize;
        let mut regions = Vec::with_capacity(num_regions);
        for _ in 0..num_regions {
            let mut region = RegionSchema::default();
            for lists in [
                &mut region.vtx_lists,
                &mut region.face_lists,
                &mut region.corner_lists,
            ] {
                let n = leb128_read(rd)? as usize;
                for _ in 0..n {
                    lists.push(leb128_read(rd)? as usize);
                }
            }
            regions.push(region);
        }

        Ok(Header {
            order,
            num_vertices,
            num_faces,
            lists,
            regions,
        })
    }
}
