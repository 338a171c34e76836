pub mod backend;
pub mod naming;
pub mod store;
pub mod token;
pub mod yadisk;

pub use backend::{MemoryBackend, ObjectBackend};
pub use store::{CollisionPolicy, DiskStore};
pub use token::TokenGuard;
pub use yadisk::{DiskToken, YaDiskBackend};
