//! PLY mesh loading

mod loader;
mod vertex;

pub use loader::load_mesh_from_ply;
pub use vertex::PlyVertex;
