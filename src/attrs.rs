//! Variable attribute resolution.
//!
//! NetCDF producers are inconsistent about decode metadata: attributes may be
//! absent, stored under a different numeric type than the variable, or split
//! across `valid_min`/`valid_max` instead of a single `valid_range` pair.
//! Absence is always recoverable here: every lookup falls back to a typed
//! default with a warning, never an error.

use netcdf::{AttributeValue, Variable};
use tracing::warn;

use crate::constants::{ATTR_VALID_MAX, ATTR_VALID_MIN, ATTR_VALID_RANGE};

/// Check whether the variable carries the named attribute.
///
/// Probing through `attribute_value` directly makes the HDF5 layer print
/// spurious diagnostics for absent attributes, so existence is checked by
/// iteration first.
fn has_attribute(variable: &Variable, name: &str) -> bool {
    variable.attributes().any(|attr| attr.name() == name)
}

/// Flatten an attribute value into its numeric payload.
///
/// Scalar and vector variants map to one- and n-element vectors; string
/// attributes have no numeric payload and map to an empty vector.
fn numeric_payload(value: AttributeValue) -> Vec<f64> {
    match value {
        AttributeValue::Uchar(v) => vec![v as f64],
        AttributeValue::Uchars(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Schar(v) => vec![v as f64],
        AttributeValue::Schars(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Ushort(v) => vec![v as f64],
        AttributeValue::Ushorts(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Short(v) => vec![v as f64],
        AttributeValue::Shorts(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Uint(v) => vec![v as f64],
        AttributeValue::Uints(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Int(v) => vec![v as f64],
        AttributeValue::Ints(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Ulonglong(v) => vec![v as f64],
        AttributeValue::Ulonglongs(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Longlong(v) => vec![v as f64],
        AttributeValue::Longlongs(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Float(v) => vec![v as f64],
        AttributeValue::Floats(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Double(v) => vec![v],
        AttributeValue::Doubles(v) => v,
        AttributeValue::Str(_) | AttributeValue::Strs(_) => Vec::new(),
    }
}

/// Integer payload of an attribute value, without a floating intermediate for
/// the integer-typed variants.
fn integer_payload(value: AttributeValue) -> Vec<i64> {
    match value {
        AttributeValue::Uchar(v) => vec![v as i64],
        AttributeValue::Uchars(v) => v.into_iter().map(|x| x as i64).collect(),
        AttributeValue::Schar(v) => vec![v as i64],
        AttributeValue::Schars(v) => v.into_iter().map(|x| x as i64).collect(),
        AttributeValue::Ushort(v) => vec![v as i64],
        AttributeValue::Ushorts(v) => v.into_iter().map(|x| x as i64).collect(),
        AttributeValue::Short(v) => vec![v as i64],
        AttributeValue::Shorts(v) => v.into_iter().map(|x| x as i64).collect(),
        AttributeValue::Uint(v) => vec![v as i64],
        AttributeValue::Uints(v) => v.into_iter().map(|x| x as i64).collect(),
        AttributeValue::Int(v) => vec![v as i64],
        AttributeValue::Ints(v) => v.into_iter().map(|x| x as i64).collect(),
        AttributeValue::Ulonglong(v) => vec![v as i64],
        AttributeValue::Ulonglongs(v) => v.into_iter().map(|x| x as i64).collect(),
        AttributeValue::Longlong(v) => vec![v],
        AttributeValue::Longlongs(v) => v,
        AttributeValue::Float(v) => vec![v as i64],
        AttributeValue::Floats(v) => v.into_iter().map(|x| x as i64).collect(),
        AttributeValue::Double(v) => vec![v as i64],
        AttributeValue::Doubles(v) => v.into_iter().map(|x| x as i64).collect(),
        AttributeValue::Str(_) | AttributeValue::Strs(_) => Vec::new(),
    }
}

fn read_payload<T>(
    variable: &Variable,
    name: &str,
    flatten: impl Fn(AttributeValue) -> Vec<T>,
) -> Option<Vec<T>> {
    if !has_attribute(variable, name) {
        return None;
    }
    let value = variable.attribute_value(name)?.ok()?;
    let payload = flatten(value);
    if payload.is_empty() { None } else { Some(payload) }
}

/// Text value of an attribute, `None` when absent or non-textual.
pub fn string_attribute(variable: &Variable, name: &str) -> Option<String> {
    if !has_attribute(variable, name) {
        return None;
    }
    match variable.attribute_value(name)?.ok()? {
        AttributeValue::Str(text) => Some(text),
        AttributeValue::Strs(texts) => texts.into_iter().next(),
        _ => None,
    }
}

/// Numeric value of an attribute, or `default` when absent or non-numeric.
pub fn numeric_attribute(variable: &Variable, name: &str, default: f64) -> f64 {
    match read_payload(variable, name, numeric_payload) {
        Some(payload) => payload[0],
        None => {
            warn!(
                "Could not locate attribute \"{}\" in variable \"{}\", using default value",
                name,
                variable.name()
            );
            default
        }
    }
}

/// Integer value of an attribute, or `default` when absent or non-numeric.
pub fn int_attribute(variable: &Variable, name: &str, default: i64) -> i64 {
    match read_payload(variable, name, integer_payload) {
        Some(payload) => payload[0],
        None => {
            warn!(
                "Could not locate attribute \"{}\" in variable \"{}\", using default value",
                name,
                variable.name()
            );
            default
        }
    }
}

/// Resolve the declared validity bounds of a variable.
///
/// Prefers the two-element `valid_range` attribute; otherwise combines
/// `valid_min` and `valid_max` when both are present; otherwise returns the
/// defaults.
pub fn valid_range(variable: &Variable, default_min: f64, default_max: f64) -> (f64, f64) {
    if let Some(range) = read_payload(variable, ATTR_VALID_RANGE, numeric_payload)
        && range.len() >= 2
    {
        return (range[0], range[1]);
    }
    let min = read_payload(variable, ATTR_VALID_MIN, numeric_payload);
    let max = read_payload(variable, ATTR_VALID_MAX, numeric_payload);
    match (min, max) {
        (Some(min), Some(max)) => (min[0], max[0]),
        _ => (default_min, default_max),
    }
}

/// Integer variant of [`valid_range`] for integer-typed variables.
pub fn valid_range_i64(variable: &Variable, default_min: i64, default_max: i64) -> (i64, i64) {
    if let Some(range) = read_payload(variable, ATTR_VALID_RANGE, integer_payload)
        && range.len() >= 2
    {
        return (range[0], range[1]);
    }
    let min = read_payload(variable, ATTR_VALID_MIN, integer_payload);
    let max = read_payload(variable, ATTR_VALID_MAX, integer_payload);
    match (min, max) {
        (Some(min), Some(max)) => (min[0], max[0]),
        _ => (default_min, default_max),
    }
}
