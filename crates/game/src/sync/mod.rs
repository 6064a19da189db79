mod authority;
mod interpolation;
mod participant;

pub use authority::Authority;
pub use interpolation::{Blend, InterpolationMode, Interpolator};
pub use participant::Participant;
