//! Attribute symbol layer.
//!
//! The coders speak to the stream through the `AttrWriter`/`AttrReader`
//! traits; the byte-aligned implementations here lay the symbols out as a
//! tag byte per attribute entry followed by a leb128/zigzag payload.
//! Swapping in an entropy-coding backend only means implementing the two
//! traits differently.

use thiserror::Error;

use crate::core::bit_coder::{ByteReader, ByteWriter, ReaderErr};
use crate::core::mesh::attr::AttributeStore;
use crate::core::mixing::{Scalar, ScalarKind, Value};
use crate::core::shared::{ListIdx, RegIdx};
use crate::shared::header::Header;
use crate::utils::bit_coder::{leb128_read, leb128_write, unzigzag, zigzag};

const TAG_DATA: u8 = 0;
const TAG_HIST: u8 = 1;
const TAG_LHIST: u8 = 2;

/// Symbol kind of one attribute entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Data,
    Hist,
    /// Reserved for a local per-vertex history; not part of the current
    /// wire format.
    Lhist,
}

#[remain::sorted]
#[derive(Debug, Error, PartialEq)]
pub enum Err {
    #[error("invalid attribute symbol tag {0}")]
    InvalidTag(u8),
    #[error("reader error: {0}")]
    ReaderError(#[from] ReaderErr),
}

/// Wire contract consumed by the attribute encoder.
pub trait AttrWriter {
    fn reg_vtx(&mut self, r: RegIdx);
    fn reg_face(&mut self, r: RegIdx);
    fn attr_data(&mut self, v: &Value, l: ListIdx);
    fn attr_ghist(&mut self, offset: usize, l: ListIdx);
}

/// Wire contract consumed by the attribute decoder.
pub trait AttrReader {
    fn reg_vtx(&mut self) -> Result<RegIdx, Err>;
    fn reg_face(&mut self) -> Result<RegIdx, Err>;
    fn attr_type(&mut self, l: ListIdx) -> Result<SymbolKind, Err>;
    fn attr_data(&mut self, l: ListIdx) -> Result<Value, Err>;
    fn attr_ghist(&mut self, l: ListIdx) -> Result<usize, Err>;
}

/// Per-list layout facts the symbol layer needs.
#[derive(Clone, Debug)]
pub struct ListMeta {
    pub kind: ScalarKind,
    pub dim: usize,
    pub quant: f64,
}

impl ListMeta {
    pub fn from_store(attrs: &AttributeStore) -> Vec<ListMeta> {
        (0..attrs.size())
            .map(|l| {
                let list = attrs.list(l);
                ListMeta {
                    kind: list.kind(),
                    dim: list.dim(),
                    quant: list.quant(),
                }
            })
            .collect()
    }

    pub fn from_header(header: &Header) -> Vec<ListMeta> {
        header
            .lists
            .iter()
            .map(|l| ListMeta {
                kind: l.kind,
                dim: l.dim,
                quant: l.quant,
            })
            .collect()
    }

    /// True when residuals of this list travel as integer step counts.
    fn integer_residuals(&self) -> bool {
        !self.kind.is_float() || self.quant > 0.0
    }
}

pub struct SymbolWriter<'w, W: ByteWriter> {
    wr: &'w mut W,
    meta: Vec<ListMeta>,
}

impl<'w, W: ByteWriter> SymbolWriter<'w, W> {
    pub fn new(wr: &'w mut W, meta: Vec<ListMeta>) -> Self {
        SymbolWriter { wr, meta }
    }
}

fn residual_to_i64(s: Scalar) -> i64 {
    match s {
        Scalar::I32(x) => x as i64,
        Scalar::I64(x) => x,
        Scalar::U32(x) => x as i32 as i64,
        Scalar::U64(x) => x as i64,
        Scalar::F32(_) | Scalar::F64(_) => unreachable!("float residual in integer channel"),
    }
}

fn residual_from_i64(kind: ScalarKind, quant: f64, x: i64) -> Scalar {
    if kind.is_float() {
        debug_assert!(quant > 0.0);
        return Scalar::I64(x);
    }
    match kind {
        ScalarKind::I32 => Scalar::I32(x as i32),
        ScalarKind::I64 => Scalar::I64(x),
        ScalarKind::U32 => Scalar::U32(x as i32 as u32),
        ScalarKind::U64 => Scalar::U64(x as u64),
        ScalarKind::F32 | ScalarKind::F64 => unreachable!(),
    }
}

impl<'w, W: ByteWriter> AttrWriter for SymbolWriter<'w, W> {
    fn reg_vtx(&mut self, r: RegIdx) {
        leb128_write(r as u64, self.wr);
    }

    fn reg_face(&mut self, r: RegIdx) {
        leb128_write(r as u64, self.wr);
    }

    fn attr_data(&mut self, v: &Value, l: ListIdx) {
        self.wr.write_u8(TAG_DATA);
        let meta = &self.meta[l];
        for c in 0..v.dim() {
            if meta.integer_residuals() {
                leb128_write(zigzag(residual_to_i64(v.comp(c))), self.wr);
            } else {
                match v.comp(c) {
                    Scalar::F32(x) => self.wr.write_u32(x.to_bits()),
                    Scalar::F64(x) => self.wr.write_u64(x.to_bits()),
                    _ => unreachable!("integer residual in float channel"),
                }
            }
        }
    }

    fn attr_ghist(&mut self, offset: usize, l: ListIdx) {
        let _ = l;
        self.wr.write_u8(TAG_HIST);
        leb128_write(offset as u64, self.wr);
    }
}

pub struct SymbolReader<'r, R: ByteReader> {
    rd: &'r mut R,
    meta: Vec<ListMeta>,
}

impl<'r, R: ByteReader> SymbolReader<'r, R> {
    pub fn new(rd: &'r mut R, meta: Vec<ListMeta>) -> Self {
        SymbolReader { rd, meta }
    }
}

impl<'r, R: ByteReader> AttrReader for SymbolReader<'r, R> {
    fn reg_vtx(&mut self) -> Result<RegIdx, Err> {
        Ok(leb128_read(self.rd)? as usize)
    }

    fn reg_face(&mut self) -> Result<RegIdx, Err> {
        Ok(leb128_read(self.rd)? as usize)
    }

    fn attr_type(&mut self, l: ListIdx) -> Result<SymbolKind, Err> {
        let _ = l;
        match self.rd.read_u8()? {
            TAG_DATA => Ok(SymbolKind::Data),
            TAG_HIST => Ok(SymbolKind::Hist),
            TAG_LHIST => Ok(SymbolKind::Lhist),
            tag => Err(Err::InvalidTag(tag)),
        }
    }

    fn attr_data(&mut self, l: ListIdx) -> Result<Value, Err> {
        let meta = self.meta[l].clone();
        let mut out = Value::zeros(meta.kind, meta.dim);
        for c in 0..meta.dim {
            let s = if meta.integer_residuals() {
                residual_from_i64(meta.kind, meta.quant, unzigzag(leb128_read(self.rd)?))
            } else {
                match meta.kind {
                    ScalarKind::F32 => Scalar::F32(f32::from_bits(self.rd.read_u32()?)),
                    ScalarKind::F64 => Scalar::F64(f64::from_bits(self.rd.read_u64()?)),
                    _ => unreachable!(),
                }
            };
            out.set_comp(c, s);
        }
        Ok(out)
    }

    fn attr_ghist(&mut self, l: ListIdx) -> Result<usize, Err> {
        let _ = l;
        Ok(leb128_read(self.rd)? as usize)
    }
}
