//! Docker-style image reference parsing, reduced to what is needed to find
//! out which registry an image is pulled from.

mod error;
pub use error::*;
mod host;
pub use host::RegistryHost;
mod grammar;
mod reference;
pub use reference::{parse, resolve, ImageReference};
