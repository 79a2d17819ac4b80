use std::fmt;

/// Index of a vertex in the mesh.
pub type VtxIdx = usize;
/// Index of a face in the mesh.
pub type FaceIdx = usize;
/// Index of an attribute region.
pub type RegIdx = usize;
/// Index of an attribute list.
pub type ListIdx = usize;
/// Index of an attribute value slot inside a list.
pub type AttrIdx = usize;
/// Local edge index inside a face, `0..deg`.
pub type LedgeIdx = usize;

/// A (face, local edge) pair. The directed half-edge `e` of face `f` runs
/// from the face's corner `e` to its corner `(e + 1) % deg`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FePair {
    face: FaceIdx,
    edge: LedgeIdx,
}

impl FePair {
    #[inline]
    pub fn new(face: FaceIdx, edge: LedgeIdx) -> Self {
        FePair { face, edge }
    }

    #[inline]
    pub fn f(&self) -> FaceIdx {
        self.face
    }

    #[inline]
    pub fn e(&self) -> LedgeIdx {
        self.edge
    }
}

impl fmt::Display for FePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.face, self.edge)
    }
}

/// Configuration objects of this crate implement this trait instead of
/// `std::default::Default` so that the default construction is an explicit
/// part of the API surface.
pub trait ConfigType {
    fn default() -> Self;
}
