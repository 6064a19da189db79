mod avatar;
mod buffer;
mod entity;
mod registry;

pub use avatar::Avatar;
pub use buffer::{SharedStateBuffer, StateBuffer};
pub use entity::{AuthorityState, Entity};
pub use registry::{EntityRegistry, RegistryError};
