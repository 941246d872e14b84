pub mod decode;
pub mod encode;
pub mod filter;
pub mod protocol;
pub mod remap;

pub use decode::PodDecodeError;
pub use encode::PodEncodeError;
pub use filter::FilterError;
pub use protocol::ProtocolError;
pub use remap::RemapError;
