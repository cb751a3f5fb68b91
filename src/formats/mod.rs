//! Binary geospatial formats

pub mod aig;
pub mod selafin;
