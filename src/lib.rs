//! rastermesh - Readers and writers for tiled grids and mesh time series
//!
//! rastermesh covers two binary geospatial formats:
//!
//! - **Arc/Info binary grids** (`formats::aig`): a cover directory of sparse
//!   tiles. Tiles are opened on first use, missing tiles read as nodata and
//!   compressed integer blocks are decoded on the fly.
//! - **Selafin mesh series** (`formats::selafin`): a triangular (or any fixed
//!   vertex count) mesh with per-point values for every time step. Fields,
//!   points, elements and steps can be added, removed or reordered; structural
//!   edits rewrite the file through a scratch copy.
//!
//! # Examples
//!
//! ## Reading a grid block
//!
//! ```no_run
//! use rastermesh::AigGrid;
//!
//! let mut grid = AigGrid::open("dem/hdr.adf")?;
//! let dims = grid.dimensions();
//! println!("Size: {} x {}", dims.width, dims.height);
//!
//! let block = grid.read_block_f32(0, 0)?;
//! println!("First cell: {}", block[0]);
//! # Ok::<(), rastermesh::Error>(())
//! ```
//!
//! ## Adding a field to a mesh
//!
//! ```no_run
//! use rastermesh::config::SelafinConfig;
//! use rastermesh::formats::selafin::{FieldDefn, LayerKind, SelafinDataset};
//!
//! let mut dataset = SelafinDataset::open("tide.slf", true, &SelafinConfig::default())?;
//! let mut layer = dataset.layer(0, LayerKind::Points)?;
//! layer.create_field(&FieldDefn::real("SALINITY"))?;
//! # Ok::<(), rastermesh::Error>(())
//! ```

pub mod io;
pub mod error;
pub mod types;
pub mod config;
pub mod formats;
pub mod compression;
pub mod cache;

pub use error::{Error, Result};
pub use types::{CellType, Dimensions, Extent, Statistics, GRID_FLOAT_NO_DATA, GRID_NO_DATA};
pub use config::{Config, GridConfig, SelafinConfig};
pub use formats::aig::{AigGrid, GridInfo};
pub use formats::selafin::{Layer, LayerKind, SelafinDataset};
pub use io::{ByteOrder, BufferedReader, SeekableReader};
