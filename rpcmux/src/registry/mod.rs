//! Setup-time lookup tables consulted by the dispatcher.

mod codec;
mod service;

pub use codec::CodecRegistry;
pub use service::{MethodSpec, ServiceRegistry};
