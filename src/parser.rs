//! Reads GML documents and pulls coordinate tuples out of their geometries.
//!
//! Recognised coordinate carriers (matched on local name, any prefix):
//! * `coordinates` with optional `decimal`, `cs` and `ts` separators (GML 2 and 3)
//! * `pos`, `lowerCorner`, `upperCorner` holding a single direct position
//! * `posList` split by `srsDimension` (or `dimension`), inherited from the
//!   enclosing geometry and defaulting to 2
//! * `coord` with `X`, `Y` and optional `Z` children (GML 2)
//!
//! Anything inside a `boundedBy` element is skipped so a stale envelope never
//! contributes to a freshly computed one.

use std::io::BufRead;

use tracing::{debug, info};

use crate::coords::{
    parse_coordinates, parse_pos_list, CoordinateFormat, CoordinateList, TupleSource,
};
use crate::dom::{Document, Element};
use crate::error::{GmlError, Result};

const DEFAULT_POS_LIST_DIMENSION: usize = 2;

/// Coordinate lists found under one element, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryCoordinates {
    pub lists: Vec<CoordinateList>,
    /// First `srsName` seen on a geometry element.
    pub srs_name: Option<String>,
}

impl GeometryCoordinates {
    pub fn tuple_count(&self) -> usize {
        self.lists.iter().map(|list| list.len()).sum()
    }
}

/// Parses a GML document into an element tree.
pub fn parse_gml<R: BufRead>(reader: R) -> Result<Document> {
    let document = Document::read(reader)?;
    info!(
        "Parsed document with root <{}> ({} child elements)",
        document.root.name,
        document.root.child_elements().count()
    );
    Ok(document)
}

/// Collects every coordinate list under `element`, including `element` itself.
pub fn extract_coordinates(element: &Element) -> Result<GeometryCoordinates> {
    let mut found = GeometryCoordinates::default();
    visit(element, None, &mut found)?;
    debug!(
        "Extracted {} coordinate lists ({} tuples) under <{}>",
        found.lists.len(),
        found.tuple_count(),
        element.name
    );
    Ok(found)
}

fn dimension_attribute(element: &Element) -> Result<Option<usize>> {
    let raw = match element
        .attribute("srsDimension")
        .or_else(|| element.attribute("dimension"))
    {
        Some(raw) => raw,
        None => return Ok(None),
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| GmlError::InvalidCoordinate(format!("invalid srsDimension '{}'", raw)))
}

fn visit(
    element: &Element,
    inherited_dimension: Option<usize>,
    found: &mut GeometryCoordinates,
) -> Result<()> {
    let local_name = element.local_name();
    if local_name == "boundedBy" {
        debug!("Skipping existing <{}>", element.name);
        return Ok(());
    }

    if found.srs_name.is_none() {
        if let Some(srs_name) = element.attribute("srsName").filter(|s| !s.is_empty()) {
            found.srs_name = Some(srs_name.to_string());
        }
    }
    let dimension = dimension_attribute(element)?.or(inherited_dimension);

    match local_name {
        "coordinates" => {
            let format = CoordinateFormat::from_element(element)?;
            found.lists.push(parse_coordinates(&element.text(), &format)?);
        }
        "pos" | "lowerCorner" | "upperCorner" => {
            let text = element.text();
            let values = text.split_whitespace().count();
            if values > 0 {
                found.lists.push(parse_pos_list(&text, values)?);
            }
        }
        "posList" => {
            let list = parse_pos_list(
                &element.text(),
                dimension.unwrap_or(DEFAULT_POS_LIST_DIMENSION),
            )?;
            found.lists.push(list);
        }
        "coord" => {
            let mut tuple: Vec<f64> = Vec::with_capacity(3);
            for axis in ["X", "Y", "Z"] {
                if let Some(value) = element.find_child(axis) {
                    let text = value.text();
                    let number: f64 = text.trim().parse().map_err(|_| {
                        GmlError::InvalidCoordinate(format!("'{}' is not a number", text.trim()))
                    })?;
                    tuple.push(number);
                }
            }
            found.lists.push(CoordinateList::new(vec![tuple]));
        }
        _ => {
            for child in element.child_elements() {
                visit(child, dimension, found)?;
            }
        }
    }
    Ok(())
}
