//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod callback;
pub mod synthesis;
pub mod voice;

pub use callback::*;
pub use synthesis::*;
pub use voice::*;
