//! Development triangles
//!
//! - `frame`: filtered claim records with bucketed periods, lags and value columns
//! - `builder`: value-column resolution and aggregation
//! - `matrix`: the cumulative, masked triangle itself

mod builder;
mod frame;
mod matrix;

pub use builder::{build_triangle, resolve_value_column, ColumnResolution};
pub use frame::{prepare_claims, ClaimFrame, FrameRow, PreparedClaims, ValueColumn};
pub use matrix::{Cell, Triangle};
