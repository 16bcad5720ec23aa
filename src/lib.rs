pub mod heap;
pub mod kd;
pub mod mesh;
pub mod obj;
pub mod simplify;
pub mod utils;

pub use ahash;
pub use env_logger;
pub use itertools;
pub use log;
pub use nalgebra_glm as glm;

/// All features that are very common to use.
pub mod prelude {
    pub use crate::glm;
    pub use crate::glm::DVec3;
    pub use crate::heap::{HeapItem, IndexHeap};
    pub use crate::kd::KdTree;
    pub use crate::log;
    pub use crate::mesh::{Face, Mesh};
    pub use crate::obj::{read_obj, write_obj, ObjError};
    pub use crate::utils::math::{Quadric, Real};
    pub use crate::utils::tools::*;
    pub use ahash::{AHashMap, AHashSet};
    pub use itertools::Itertools;
}
