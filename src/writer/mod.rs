use tracing::debug;

use crate::bbox::BoundingBox;
use crate::coords::{write_coordinates, CoordinateFormat};
use crate::dom::{qualify, Element};
use crate::error::{GmlError, Result};
use crate::version::GmlVersion;

const BOUNDED_BY: &str = "boundedBy";
const FEATURE_MEMBERS: [&str; 2] = ["featureMember", "featureMembers"];

/// Writes a `boundedBy` property into an element, as `Box`/`null` for GML 2
/// or `Envelope`/`Null` for GML 3.
#[derive(Debug, Clone)]
pub struct BoundingBoxWriter {
    version: GmlVersion,
    prefix: String,
}

impl Default for BoundingBoxWriter {
    fn default() -> Self {
        Self::new(GmlVersion::default())
    }
}

impl BoundingBoxWriter {
    pub fn new(version: GmlVersion) -> Self {
        Self {
            version,
            prefix: "gml".to_string(),
        }
    }

    /// Fails with [`GmlError::UnsupportedVersion`] unless `version` names GML 2 or GML 3.
    pub fn for_version(version: &str) -> Result<Self> {
        Ok(Self::new(version.parse()?))
    }

    /// Uses `prefix` for the GML elements written, for documents not binding GML to `gml`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn version(&self) -> GmlVersion {
        self.version
    }

    pub fn write_bounding_box(
        &self,
        target: &mut Element,
        bbox: &BoundingBox,
        srs_name: Option<&str>,
    ) -> Result<()> {
        if bbox.is_empty() {
            return Err(GmlError::EmptyBoundingBox);
        }

        let mut geometry = Element::new(qualify(&self.prefix, self.version.box_element()));
        if let Some(srs_name) = srs_name {
            geometry.set_attribute("srsName", srs_name);
        }
        write_coordinates(
            &mut geometry,
            &bbox.corners(),
            &CoordinateFormat::default(),
            &self.prefix,
        );

        debug!(
            "Writing {} {} {:?} .. {:?} into <{}>",
            self.version,
            self.version.box_element(),
            bbox.lower_left(),
            bbox.upper_right(),
            target.name
        );
        self.replace_bounded_by(target, geometry);
        Ok(())
    }

    pub fn write_null(&self, target: &mut Element, reason: &str) {
        let null =
            Element::new(qualify(&self.prefix, self.version.null_element())).with_text(reason);
        debug!(
            "Writing {} null boundedBy ({}) into <{}>",
            self.version, reason, target.name
        );
        self.replace_bounded_by(target, null);
    }

    /// The new `boundedBy` takes the slot of the first existing one. Without one it goes
    /// before the first feature member, or last.
    fn replace_bounded_by(&self, target: &mut Element, content: Element) {
        let slot = target.position_of_child(&[BOUNDED_BY]);
        let removed = target.remove_children_named(BOUNDED_BY);
        if removed > 0 {
            debug!("Replaced {} existing boundedBy element(s)", removed);
        }

        let bounded_by = Element::new(qualify(&self.prefix, BOUNDED_BY)).with_child(content);
        match slot.or_else(|| target.position_of_child(&FEATURE_MEMBERS)) {
            Some(index) => target.insert_child(index, bounded_by),
            None => target.push_child(bounded_by),
        }
    }
}
