pub(crate) mod attribute;
pub(crate) mod connectivity;

use thiserror::Error;

use crate::core::bit_coder::{ByteReader, ReaderErr};
use crate::core::mesh::builder::MeshBuilder;
use crate::core::mesh::Mesh;
use crate::core::progress::{NoProgress, Progress};
use crate::shared::header::Header;
use crate::shared::symbols::{ListMeta, SymbolReader};

#[remain::sorted]
#[derive(Debug, Error, PartialEq)]
pub enum Err {
    #[error("cut-border error: {0}")]
    CutBorder(#[from] crate::shared::cutborder::Err),
    #[error("malformed stream: {0}")]
    DataFormat(&'static str),
    #[error("header error: {0}")]
    Header(#[from] crate::shared::header::Err),
    #[error("decoded connectivity is inconsistent: {0}")]
    Mesh(#[from] crate::core::mesh::conn::Err),
    #[error("reader error: {0}")]
    Reader(#[from] ReaderErr),
    #[error("symbol error: {0}")]
    Symbol(#[from] crate::shared::symbols::Err),
}

/// Decodes one mesh from the reader.
pub fn decode<R: ByteReader>(reader: &mut R) -> Result<Mesh, Err> {
    decode_with_progress(reader, &mut NoProgress)
}

pub fn decode_with_progress<R: ByteReader, P: Progress>(
    reader: &mut R,
    prog: &mut P,
) -> Result<Mesh, Err> {
    let header = Header::read(reader)?;

    let mut attr = attribute::AttrDecoder::new(&header);
    let faces = connectivity::decode_connectivity(reader, &header, &mut attr)?;

    let mut builder = MeshBuilder::new(&header, faces)?;
    let meta = ListMeta::from_header(&header);
    let mut symbols = SymbolReader::new(reader, meta);
    attr.decode(&mut builder, &mut symbols, prog)?;

    Ok(builder.finish())
}
