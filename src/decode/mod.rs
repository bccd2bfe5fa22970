mod backend;
mod backends;
mod registry;

pub use backend::Decoder;
pub use backends::{RqrrDecoder, StubDecoder};
pub use registry::DecoderRegistry;
