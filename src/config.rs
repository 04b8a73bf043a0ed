use crate::version::GmlVersion;

/// Options for stamping a document's `boundedBy`.
#[derive(Debug, Clone)]
pub struct BoundsConfig {
    pub version: GmlVersion,
    /// Overrides the `srsName` found on the document's geometries.
    pub srs_name: Option<String>,
    /// Widen a box that collapsed to a single point.
    pub pad_points: bool,
    /// Text of the null marker written when no geometry was found.
    pub null_reason: String,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            version: GmlVersion::default(),
            srs_name: None,
            pad_points: true,
            null_reason: "missing".to_string(),
        }
    }
}
