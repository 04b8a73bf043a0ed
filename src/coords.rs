//! Coordinate tuples and the `gml:coordinates` / `gml:posList` text encodings.

use tracing::debug;

use crate::dom::{qualify, Element};
use crate::error::{GmlError, Result};

/// An ordered, random-access source of coordinate tuples.
pub trait TupleSource {
    /// Dimension shared by every tuple, `None` when unknown or mixed.
    fn dimension(&self) -> Option<usize>;

    fn len(&self) -> usize;

    fn tuple(&self, index: usize) -> &[f64];

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoordinateList {
    dimension: Option<usize>,
    tuples: Vec<Vec<f64>>,
}

impl CoordinateList {
    /// Builds a list whose dimension is the common tuple length, or `None` if lengths differ.
    pub fn new(tuples: Vec<Vec<f64>>) -> Self {
        let dimension = match tuples.first() {
            Some(first) if tuples.iter().all(|t| t.len() == first.len()) => Some(first.len()),
            Some(_) => None,
            None => Some(0),
        };
        Self { dimension, tuples }
    }

    pub fn with_dimension(dimension: Option<usize>, tuples: Vec<Vec<f64>>) -> Self {
        Self { dimension, tuples }
    }

    pub fn tuples(&self) -> &[Vec<f64>] {
        &self.tuples
    }
}

impl TupleSource for CoordinateList {
    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn len(&self) -> usize {
        self.tuples.len()
    }

    fn tuple(&self, index: usize) -> &[f64] {
        &self.tuples[index]
    }
}

/// Separators of the `gml:coordinates` encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateFormat {
    pub decimal: String,
    pub cs: String,
    pub ts: String,
}

impl Default for CoordinateFormat {
    fn default() -> Self {
        Self {
            decimal: ".".to_string(),
            cs: ",".to_string(),
            ts: " ".to_string(),
        }
    }
}

impl CoordinateFormat {
    /// Reads `decimal`, `cs` and `ts` from a `coordinates` element, falling back to defaults.
    ///
    /// An empty `decimal` or `cs` is an [`GmlError::InvalidCoordinate`]. An empty `ts`
    /// separates tuples on whitespace.
    pub fn from_element(element: &Element) -> Result<Self> {
        let defaults = Self::default();
        let format = Self {
            decimal: element
                .attribute("decimal")
                .map_or(defaults.decimal, str::to_string),
            cs: element.attribute("cs").map_or(defaults.cs, str::to_string),
            ts: element.attribute("ts").map_or(defaults.ts, str::to_string),
        };
        for (name, value) in [("decimal", &format.decimal), ("cs", &format.cs)] {
            if value.is_empty() {
                return Err(GmlError::InvalidCoordinate(format!(
                    "empty '{}' separator on <{}>",
                    name, element.name
                )));
            }
        }
        Ok(format)
    }
}

fn parse_number(raw: &str, decimal: &str) -> Result<f64> {
    let normalized = if decimal == "." {
        raw.to_string()
    } else {
        raw.replace(decimal, ".")
    };
    normalized
        .parse()
        .map_err(|_| GmlError::InvalidCoordinate(format!("'{}' is not a number", raw)))
}

/// Parses `gml:coordinates` text such as `"0,0 10,10"`.
pub fn parse_coordinates(text: &str, format: &CoordinateFormat) -> Result<CoordinateList> {
    let raw_tuples: Vec<&str> = if format.ts.trim().is_empty() {
        text.split_whitespace().collect()
    } else {
        text.split(format.ts.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    };

    let mut tuples = Vec::with_capacity(raw_tuples.len());
    for raw in raw_tuples {
        let tuple = raw
            .split(format.cs.as_str())
            .map(|component| parse_number(component.trim(), &format.decimal))
            .collect::<Result<Vec<f64>>>()?;
        tuples.push(tuple);
    }
    debug!("Parsed {} coordinate tuples", tuples.len());
    Ok(CoordinateList::new(tuples))
}

/// Parses whitespace separated `gml:pos` / `gml:posList` values into tuples of `dimension`.
pub fn parse_pos_list(text: &str, dimension: usize) -> Result<CoordinateList> {
    if dimension == 0 {
        return Err(GmlError::InvalidCoordinate(
            "srsDimension must be positive".to_string(),
        ));
    }
    let values = text
        .split_whitespace()
        .map(|raw| parse_number(raw, "."))
        .collect::<Result<Vec<f64>>>()?;
    if values.len() % dimension != 0 {
        return Err(GmlError::InvalidCoordinate(format!(
            "{} values cannot form tuples of dimension {}",
            values.len(),
            dimension
        )));
    }
    let tuples = values.chunks(dimension).map(<[f64]>::to_vec).collect();
    Ok(CoordinateList::with_dimension(Some(dimension), tuples))
}

pub fn format_coordinates<S: TupleSource + ?Sized>(source: &S, format: &CoordinateFormat) -> String {
    (0..source.len())
        .map(|i| {
            source
                .tuple(i)
                .iter()
                .map(|v| {
                    let number = v.to_string();
                    if format.decimal == "." {
                        number
                    } else {
                        number.replace('.', &format.decimal)
                    }
                })
                .collect::<Vec<_>>()
                .join(&format.cs)
        })
        .collect::<Vec<_>>()
        .join(&format.ts)
}

/// Appends a `coordinates` element holding `source` to `parent`.
pub fn write_coordinates<S: TupleSource + ?Sized>(
    parent: &mut Element,
    source: &S,
    format: &CoordinateFormat,
    prefix: &str,
) {
    let defaults = CoordinateFormat::default();
    let mut coordinates = Element::new(qualify(prefix, "coordinates"));
    if format.decimal != defaults.decimal {
        coordinates.set_attribute("decimal", format.decimal.as_str());
    }
    if format.cs != defaults.cs {
        coordinates.set_attribute("cs", format.cs.as_str());
    }
    if format.ts != defaults.ts {
        coordinates.set_attribute("ts", format.ts.as_str());
    }
    let coordinates = coordinates.with_text(format_coordinates(source, format));
    parent.push_child(coordinates);
}
