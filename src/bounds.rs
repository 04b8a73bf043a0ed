//! Document level bounds: one box per feature, unioned into the collection box
//! that ends up in the root's `boundedBy`.

use tracing::{debug, info, warn};

use crate::bbox::BoundingBox;
use crate::config::BoundsConfig;
use crate::dom::{Document, Element};
use crate::error::Result;
use crate::parser::extract_coordinates;
use crate::version::{GML_32_NAMESPACE, GML_NAMESPACE};
use crate::writer::BoundingBoxWriter;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBounds {
    /// Qualified element name of the feature.
    pub name: String,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentBounds {
    pub collection: BoundingBox,
    pub features: Vec<FeatureBounds>,
    /// First `srsName` found on any geometry.
    pub srs_name: Option<String>,
}

fn bounds_of(element: &Element) -> Result<(BoundingBox, Option<String>)> {
    let found = extract_coordinates(element)?;
    let mut bbox = BoundingBox::empty();
    for list in &found.lists {
        bbox.union(&BoundingBox::from_tuples(list)?)?;
    }
    Ok((bbox, found.srs_name))
}

/// Box enclosing every geometry of `feature`, ignoring any `boundedBy` it already has.
pub fn feature_bounds(feature: &Element) -> Result<BoundingBox> {
    bounds_of(feature).map(|(bbox, _)| bbox)
}

/// Computes per-feature boxes and their union.
///
/// Features are the children of `featureMember` / `featureMembers`. A root
/// without members is treated as a single feature.
pub fn compute_bounds(root: &Element) -> Result<DocumentBounds> {
    let members: Vec<&Element> = root
        .child_elements()
        .filter(|child| matches!(child.local_name(), "featureMember" | "featureMembers"))
        .collect();

    let features: Vec<&Element> = if members.is_empty() {
        vec![root]
    } else {
        members
            .into_iter()
            .flat_map(|member| member.child_elements())
            .collect()
    };

    let mut bounds = DocumentBounds::default();
    for feature in features {
        let (bbox, srs_name) = bounds_of(feature)?;
        if bounds.srs_name.is_none() {
            bounds.srs_name = srs_name;
        }
        bounds.collection.union(&bbox)?;
        debug!(
            "Feature <{}>: {:?} .. {:?}",
            feature.name,
            bbox.lower_left(),
            bbox.upper_right()
        );
        bounds.features.push(FeatureBounds {
            name: feature.name.clone(),
            bbox,
        });
    }

    Ok(bounds)
}

/// Computes a document's bounds and writes them into its root element.
#[derive(Debug, Clone, Default)]
pub struct BoundsStamper {
    config: BoundsConfig,
}

impl BoundsStamper {
    pub fn new(config: BoundsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BoundsConfig {
        &self.config
    }

    /// Rewrites the root's `boundedBy` and returns the bounds that were written.
    ///
    /// A document without coordinates gets the null marker instead of a box.
    pub fn stamp(&self, document: &mut Document) -> Result<DocumentBounds> {
        let mut bounds = compute_bounds(&document.root)?;
        let writer = BoundingBoxWriter::new(self.config.version)
            .with_prefix(gml_prefix(&mut document.root, &self.config));

        if bounds.collection.is_empty() {
            warn!(
                "No coordinates found under <{}>; writing null boundedBy",
                document.root.name
            );
            writer.write_null(&mut document.root, &self.config.null_reason);
            return Ok(bounds);
        }

        if self.config.pad_points {
            bounds.collection.pad();
        }
        let srs_name = self
            .config
            .srs_name
            .as_deref()
            .or(bounds.srs_name.as_deref());
        if srs_name.is_none() {
            warn!("No srsName configured or found; writing box without one");
        }
        writer.write_bounding_box(&mut document.root, &bounds.collection, srs_name)?;

        info!(
            "Stamped {} boundedBy over {} feature(s): {:?} .. {:?}",
            self.config.version,
            bounds.features.len(),
            bounds.collection.lower_left(),
            bounds.collection.upper_right()
        );
        Ok(bounds)
    }
}

/// Prefix `root` binds to GML, preferring the configured version's namespaces.
///
/// When no GML namespace is bound, declares `gml` on the root, or `gml1`, `gml2`, ...
/// if that prefix is already bound to something else.
fn gml_prefix(root: &mut Element, config: &BoundsConfig) -> String {
    let bound = config
        .version
        .namespaces()
        .iter()
        .chain(&[GML_NAMESPACE, GML_32_NAMESPACE])
        .find_map(|uri| root.namespace_prefix_for(uri));
    if let Some(prefix) = bound {
        return prefix.to_string();
    }

    let mut prefix = "gml".to_string();
    let mut suffix = 1;
    while root.attribute(&format!("xmlns:{}", prefix)).is_some() {
        prefix = format!("gml{}", suffix);
        suffix += 1;
    }
    debug!("No GML namespace declared on <{}>; declaring {}", root.name, prefix);
    root.set_attribute(format!("xmlns:{}", prefix), GML_NAMESPACE);
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GmlError;
    use crate::version::GmlVersion;
    use approx::assert_abs_diff_eq;

    const COLLECTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs" xmlns:gml="http://www.opengis.net/gml" xmlns:app="urn:app">
  <gml:boundedBy><gml:null>unknown</gml:null></gml:boundedBy>
  <gml:featureMember>
    <app:Road fid="r1">
      <app:geom><gml:LineString srsName="EPSG:4326"><gml:coordinates>1,1 4,2</gml:coordinates></gml:LineString></app:geom>
    </app:Road>
  </gml:featureMember>
  <gml:featureMember>
    <app:Road fid="r2">
      <app:geom><gml:Point><gml:coordinates>2,5</gml:coordinates></gml:Point></app:geom>
    </app:Road>
  </gml:featureMember>
</wfs:FeatureCollection>"#;

    #[test]
    fn test_compute_bounds_per_feature() {
        let document: Document = COLLECTION.parse().unwrap();
        let bounds = compute_bounds(&document.root).unwrap();

        assert_eq!(bounds.features.len(), 2);
        assert_eq!(bounds.features[0].name, "app:Road");
        assert_eq!(bounds.features[0].bbox.upper_right(), &[4.0, 2.0]);
        assert_eq!(bounds.features[1].bbox.lower_left(), &[2.0, 5.0]);
        assert_eq!(bounds.collection.lower_left(), &[1.0, 1.0]);
        assert_eq!(bounds.collection.upper_right(), &[4.0, 5.0]);
        assert_eq!(bounds.srs_name.as_deref(), Some("EPSG:4326"));
    }

    #[test]
    fn test_stamp_replaces_stale_bounded_by() {
        let mut document: Document = COLLECTION.parse().unwrap();
        let config = BoundsConfig {
            version: GmlVersion::Gml2,
            ..BoundsConfig::default()
        };
        BoundsStamper::new(config).stamp(&mut document).unwrap();

        let bounded: Vec<&Element> = document
            .root
            .child_elements()
            .filter(|e| e.local_name() == "boundedBy")
            .collect();
        assert_eq!(bounded.len(), 1);
        let boxed = bounded[0].find_child("Box").unwrap();
        assert_eq!(boxed.attribute("srsName"), Some("EPSG:4326"));
        assert_eq!(boxed.find_child("coordinates").unwrap().text(), "1,1 4,5");
        assert_eq!(
            document.root.position_of_child(&["boundedBy", "featureMember"]),
            document.root.position_of_child(&["boundedBy"])
        );
    }

    #[test]
    fn test_stamp_pads_single_point() {
        let mut document: Document = r#"<app:Spot xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:app="urn:app">
              <app:at><gml:Point srsName="EPSG:3857"><gml:pos>5 5</gml:pos></gml:Point></app:at>
            </app:Spot>"#
            .parse()
            .unwrap();
        let bounds = BoundsStamper::default().stamp(&mut document).unwrap();

        assert!(bounds.collection.is_padded());
        assert_abs_diff_eq!(bounds.collection.upper_right()[1], 5.000001, epsilon = 1e-12);
        let envelope = document
            .root
            .find_child("boundedBy")
            .and_then(|b| b.find_child("Envelope"))
            .unwrap();
        assert_eq!(envelope.name, "gml:Envelope");
        assert_eq!(envelope.attribute("srsName"), Some("EPSG:3857"));
    }

    #[test]
    fn test_stamp_without_padding_keeps_point() {
        let mut document: Document =
            r#"<f xmlns:gml="http://www.opengis.net/gml"><gml:pos>5 5</gml:pos></f>"#
                .parse()
                .unwrap();
        let config = BoundsConfig {
            pad_points: false,
            srs_name: Some("EPSG:4326".to_string()),
            ..BoundsConfig::default()
        };
        let bounds = BoundsStamper::new(config).stamp(&mut document).unwrap();
        assert!(!bounds.collection.is_padded());
        assert_eq!(bounds.collection.upper_right(), &[5.0, 5.0]);
    }

    #[test]
    fn test_stamp_empty_document_writes_null() {
        let mut document: Document = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs">
              <gml:featureMember xmlns:gml="http://www.opengis.net/gml"><app:Empty/></gml:featureMember>
            </wfs:FeatureCollection>"#
            .parse()
            .unwrap();
        let config = BoundsConfig {
            null_reason: "inapplicable".to_string(),
            ..BoundsConfig::default()
        };
        let bounds = BoundsStamper::new(config).stamp(&mut document).unwrap();

        assert!(bounds.collection.is_empty());
        assert_eq!(bounds.features.len(), 1);
        assert_eq!(
            document.root.attribute("xmlns:gml"),
            Some("http://www.opengis.net/gml")
        );
        let null = document
            .root
            .find_child("boundedBy")
            .and_then(|b| b.find_child("Null"))
            .unwrap();
        assert_eq!(null.name, "gml:Null");
        assert_eq!(null.text(), "inapplicable");
        assert_eq!(document.root.position_of_child(&["boundedBy"]), Some(1));
    }

    #[test]
    fn test_stamp_uses_bound_prefix() {
        let mut document: Document = r#"<g:FeatureCollection xmlns:g="http://www.opengis.net/gml">
              <g:featureMember><a:F><g:Point><g:coordinates>0,0</g:coordinates></g:Point></a:F></g:featureMember>
              <g:featureMember><a:F><g:Point><g:coordinates>3,4</g:coordinates></g:Point></a:F></g:featureMember>
            </g:FeatureCollection>"#
            .parse()
            .unwrap();
        BoundsStamper::default().stamp(&mut document).unwrap();

        let envelope = document
            .root
            .find_child("boundedBy")
            .and_then(|b| b.find_child("Envelope"))
            .unwrap();
        assert_eq!(envelope.name, "g:Envelope");
        assert_eq!(envelope.attribute("srsName"), None);
        assert_eq!(envelope.find_child("coordinates").unwrap().name, "g:coordinates");
        assert!(document.root.attribute("xmlns:gml").is_none());
    }

    #[test]
    fn test_stamp_keeps_gml32_binding_for_gml2() {
        let mut document: Document = r#"<gml:FeatureCollection xmlns:gml="http://www.opengis.net/gml/3.2">
              <gml:featureMember><F><gml:Point><gml:pos>1 2</gml:pos></gml:Point></F></gml:featureMember>
            </gml:FeatureCollection>"#
            .parse()
            .unwrap();
        let config = BoundsConfig {
            version: GmlVersion::Gml2,
            ..BoundsConfig::default()
        };
        BoundsStamper::new(config).stamp(&mut document).unwrap();

        assert_eq!(
            document.root.attribute("xmlns:gml"),
            Some("http://www.opengis.net/gml/3.2")
        );
        let boxed = document
            .root
            .find_child("boundedBy")
            .and_then(|b| b.find_child("Box"))
            .unwrap();
        assert_eq!(boxed.name, "gml:Box");
    }

    #[test]
    fn test_stamp_does_not_rebind_foreign_gml_prefix() {
        let mut document: Document = r#"<Collection xmlns:gml="urn:example:other" xmlns:gml1="urn:example:more">
              <F><Point xmlns="http://www.opengis.net/gml/3.2"><pos>1 2</pos></Point></F>
            </Collection>"#
            .parse()
            .unwrap();
        BoundsStamper::default().stamp(&mut document).unwrap();

        assert_eq!(document.root.attribute("xmlns:gml"), Some("urn:example:other"));
        assert_eq!(document.root.attribute("xmlns:gml1"), Some("urn:example:more"));
        assert_eq!(
            document.root.attribute("xmlns:gml2"),
            Some("http://www.opengis.net/gml")
        );
        let bounded_by = document.root.find_child("boundedBy").unwrap();
        assert_eq!(bounded_by.name, "gml2:boundedBy");
        assert_eq!(bounded_by.find_child("Envelope").unwrap().name, "gml2:Envelope");
    }

    #[test]
    fn test_mixed_dimensions_fail() {
        let document: Document = r#"<c xmlns:gml="http://www.opengis.net/gml">
              <gml:featureMember><f><gml:pos>1 2</gml:pos></f></gml:featureMember>
              <gml:featureMember><f><gml:pos>1 2 3</gml:pos></f></gml:featureMember>
            </c>"#
            .parse()
            .unwrap();
        assert!(matches!(
            compute_bounds(&document.root),
            Err(GmlError::DimensionMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_feature_bounds_ignores_own_bounded_by() {
        let document: Document = r#"<app:Road xmlns:gml="http://www.opengis.net/gml">
              <gml:boundedBy><gml:Box><gml:coordinates>-90,-90 90,90</gml:coordinates></gml:Box></gml:boundedBy>
              <gml:coordinates>1,2 3,4</gml:coordinates>
            </app:Road>"#
            .parse()
            .unwrap();
        let bbox = feature_bounds(&document.root).unwrap();
        assert_eq!(bbox.lower_left(), &[1.0, 2.0]);
        assert_eq!(bbox.upper_right(), &[3.0, 4.0]);
    }
}
