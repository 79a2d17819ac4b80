pub(crate) mod attribute;
pub(crate) mod connectivity;

use thiserror::Error;

use crate::core::bit_coder::ByteWriter;
use crate::core::mesh::Mesh;
use crate::core::progress::{NoProgress, Progress};
use crate::core::shared::ConfigType;
use crate::shared::cutborder::TraversalOrder;
use crate::shared::header::Header;
use crate::shared::symbols::{ListMeta, SymbolWriter};

#[remain::sorted]
#[derive(Debug, Error, PartialEq)]
pub enum Err {
    #[error("cut-border error: {0}")]
    CutBorder(#[from] crate::shared::cutborder::Err),
    #[error("face {0} has {1} corners; the opcode traversal covers triangles")]
    UnsupportedFaceDegree(usize, usize),
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Cursor policy of the cut border; recorded in the header so the
    /// decoder mirrors it.
    pub order: TraversalOrder,
    /// Element pool capacity; derived from the face count when `None`.
    pub max_elems: Option<usize>,
    /// Part stack capacity; derived from the face count when `None`.
    pub max_parts: Option<usize>,
}

impl ConfigType for Config {
    fn default() -> Self {
        Self {
            order: TraversalOrder::DepthFirst,
            max_elems: None,
            max_parts: None,
        }
    }
}

impl Config {
    pub(crate) fn elem_cap(&self, num_faces: usize) -> usize {
        // every seed creates three elements, every other face at most one
        self.max_elems.unwrap_or(3 * num_faces + 8)
    }

    pub(crate) fn part_cap(&self, num_faces: usize) -> usize {
        // the stack only grows on splits, and every split consumes a face
        self.max_parts.unwrap_or(num_faces + 4)
    }
}

/// Encodes the mesh into the writer. Float attribute values with an active
/// quantization step are replaced by their reconstructed values along the
/// way so encoder and decoder predict from identical data.
pub fn encode<W: ByteWriter>(mesh: &mut Mesh, writer: &mut W, cfg: &Config) -> Result<(), Err> {
    encode_with_progress(mesh, writer, cfg, &mut NoProgress)
}

pub fn encode_with_progress<W: ByteWriter, P: Progress>(
    mesh: &mut Mesh,
    writer: &mut W,
    cfg: &Config,
    prog: &mut P,
) -> Result<(), Err> {
    let mut attr = attribute::AttrCoder::new(&mesh.attrs);

    // run the traversal first: the header carries the emission counts
    let mut opstream: Vec<u8> = Vec::new();
    let stats = connectivity::encode_connectivity(mesh, &mut attr, &mut opstream, cfg)?;

    let header = Header::gather(
        &mesh.attrs,
        cfg.order,
        stats.num_emitted_vertices,
        mesh.conn.num_faces(),
    );
    header.write(writer);
    writer.write_bytes(&opstream);

    let meta = ListMeta::from_store(&mesh.attrs);
    let mut symbols = SymbolWriter::new(writer, meta);
    attr.encode(mesh, &mut symbols, prog);
    Ok(())
}
