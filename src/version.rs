use std::fmt;
use std::str::FromStr;

use crate::error::GmlError;

/// Namespace shared by GML 2.x and GML 3.0/3.1.
pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml";
pub const GML_32_NAMESPACE: &str = "http://www.opengis.net/gml/3.2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GmlVersion {
    Gml2,
    #[default]
    Gml3,
}

impl GmlVersion {
    /// Local name of the element holding a non-empty box.
    pub fn box_element(self) -> &'static str {
        match self {
            GmlVersion::Gml2 => "Box",
            GmlVersion::Gml3 => "Envelope",
        }
    }

    /// Local name of the element marking a missing box.
    pub fn null_element(self) -> &'static str {
        match self {
            GmlVersion::Gml2 => "null",
            GmlVersion::Gml3 => "Null",
        }
    }

    pub fn namespaces(self) -> &'static [&'static str] {
        match self {
            GmlVersion::Gml2 => &[GML_NAMESPACE],
            GmlVersion::Gml3 => &[GML_NAMESPACE, GML_32_NAMESPACE],
        }
    }
}

impl FromStr for GmlVersion {
    type Err = GmlError;

    /// Accepts `2`, `3`, dotted versions such as `2.1.2` or `3.2.1`, and an optional `GML` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .strip_prefix("GML")
            .or_else(|| trimmed.strip_prefix("gml"))
            .unwrap_or(trimmed)
            .trim_start_matches(['_', ' ']);
        let major = number.split('.').next().unwrap_or("");
        match major {
            "2" => Ok(GmlVersion::Gml2),
            "3" => Ok(GmlVersion::Gml3),
            _ => Err(GmlError::UnsupportedVersion(s.to_string())),
        }
    }
}

impl fmt::Display for GmlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GmlVersion::Gml2 => write!(f, "GML 2"),
            GmlVersion::Gml3 => write!(f, "GML 3"),
        }
    }
}
