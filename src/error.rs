use thiserror::Error;

#[derive(Error, Debug)]
pub enum GmlError {
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unsupported GML version: {0}")]
    UnsupportedVersion(String),

    #[error("Coordinate value is NaN")]
    NanCoordinate,

    #[error("Inverted bounds on axis {axis}: lower {lower} > upper {upper}")]
    InvertedBounds { axis: usize, lower: f64, upper: f64 },

    #[error("Cannot write an empty bounding box")]
    EmptyBoundingBox,

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GmlError>;
