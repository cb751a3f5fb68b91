//! I/O utilities for rastermesh
//!
//! Provides the reading, writing and byte order primitives shared by the
//! grid and mesh-series formats.

pub mod traits;
pub mod byte_order;
pub mod buffer;

pub use traits::{RecordStream, SeekableReader};
pub use byte_order::{ByteOrder, ByteOrderHandler};
pub use buffer::BufferedReader;
