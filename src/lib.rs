pub mod bbox;
pub mod bounds;
pub mod config;
pub mod coords;
pub mod dom;
pub mod error;
pub mod parser;
pub mod version;
pub mod writer;

pub use bbox::{BoundingBox, PADDING_EPSILON};
pub use bounds::{compute_bounds, feature_bounds, BoundsStamper, DocumentBounds, FeatureBounds};
pub use config::BoundsConfig;
pub use coords::{CoordinateFormat, CoordinateList, TupleSource};
pub use dom::{Document, Element, Node};
pub use error::{GmlError, Result};
pub use version::GmlVersion;
pub use writer::BoundingBoxWriter;
