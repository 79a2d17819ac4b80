pub mod attr;
pub mod builder;
pub mod conn;

use crate::core::mesh::attr::AttributeStore;
use crate::core::mesh::conn::Connectivity;
use crate::core::shared::VtxIdx;

/// A polygonal mesh: connectivity queries plus the attribute store.
pub struct Mesh {
    pub conn: Connectivity,
    pub attrs: AttributeStore,
}

impl Mesh {
    /// Builds the connectivity for `faces` and pairs it with `attrs`. The
    /// attribute store must already describe every vertex and face named by
    /// `faces`.
    pub fn new(faces: Vec<Vec<VtxIdx>>, attrs: AttributeStore) -> Result<Mesh, conn::Err> {
        debug_assert_eq!(attrs.num_face(), faces.len());
        let conn = Connectivity::new(&faces, attrs.num_vtx())?;
        Ok(Mesh { conn, attrs })
    }
}
