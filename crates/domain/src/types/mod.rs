//! Domain data types.

pub mod audit;
pub mod documents;
pub mod payloads;
pub mod registry;
pub mod response;
pub mod scope;

pub use audit::*;
pub use documents::*;
pub use payloads::*;
pub use registry::*;
pub use response::*;
pub use scope::*;
