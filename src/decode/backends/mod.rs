pub mod rqrr;
pub mod stub;

pub use self::rqrr::RqrrDecoder;
pub use stub::StubDecoder;
