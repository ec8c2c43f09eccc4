//! Stored-value decoding.
//!
//! Turns a raw stored cell into a physical value or "no value" by applying the
//! variable's fill/missing/valid-range/scale/offset metadata. Integer and
//! floating variables are decoded along separate numeric paths: a 64-bit
//! integer must never be widened through a floating intermediate that could
//! lose precision at large magnitudes.
//!
//! Sentinel comparison is by exact equality (integer semantics on the integer
//! path, exact floating comparison on the float path). This mirrors the
//! conventional producer behavior; tolerance-based matching would reclassify
//! legitimately stored values.

use netcdf::types::{FloatType, IntType, NcVariableType};
use serde::Serialize;
use std::fmt;

/// Numeric storage classes eligible for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumericKind {
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl NumericKind {
    /// Classify a NetCDF variable type, returning `None` for non-exportable
    /// storage classes (strings, compounds, unsigned and 8-bit integers).
    pub fn from_nc_type(vartype: &NcVariableType) -> Option<Self> {
        match vartype {
            NcVariableType::Int(IntType::I16) => Some(NumericKind::Int16),
            NcVariableType::Int(IntType::I32) => Some(NumericKind::Int32),
            NcVariableType::Int(IntType::I64) => Some(NumericKind::Int64),
            NcVariableType::Float(FloatType::F32) => Some(NumericKind::Float32),
            NcVariableType::Float(FloatType::F64) => Some(NumericKind::Float64),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            NumericKind::Int16 | NumericKind::Int32 | NumericKind::Int64
        )
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NumericKind::Int16 => "int16",
            NumericKind::Int32 => "int32",
            NumericKind::Int64 => "int64",
            NumericKind::Float32 => "float32",
            NumericKind::Float64 => "float64",
        };
        f.write_str(name)
    }
}

/// A raw stored cell before decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    Int(i64),
    Float(f64),
}

/// A decoded physical value.
///
/// The integer path keeps `i64` all the way to formatting so large magnitudes
/// round-trip exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    Int(i64),
    Float(f64),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Decode metadata for an integer-typed variable, resolved to `i64`.
#[derive(Debug, Clone, Copy)]
pub struct IntRules {
    pub fill: i64,
    pub missing: i64,
    pub valid_min: i64,
    pub valid_max: i64,
    pub scale: i64,
    pub offset: i64,
}

/// Decode metadata for a float-typed variable, resolved to `f64`.
#[derive(Debug, Clone, Copy)]
pub struct FloatRules {
    pub fill: f64,
    pub missing: f64,
    pub valid_min: f64,
    pub valid_max: f64,
    pub scale: f64,
    pub offset: f64,
}

/// Per-variable decode rules, one closed case per numeric path.
#[derive(Debug, Clone, Copy)]
pub enum DecodeRules {
    Int(IntRules),
    Float(FloatRules),
}

impl DecodeRules {
    /// Decode one raw cell.
    ///
    /// Evaluation order: NaN (floating types only), fill, missing, valid
    /// range, then the affine transform.
    pub fn decode(&self, raw: RawValue) -> Option<CellValue> {
        match (self, raw) {
            (DecodeRules::Int(rules), RawValue::Int(v)) => {
                if v == rules.fill || v == rules.missing {
                    return None;
                }
                if v < rules.valid_min || v > rules.valid_max {
                    return None;
                }
                Some(CellValue::Int(v * rules.scale + rules.offset))
            }
            (DecodeRules::Float(rules), RawValue::Float(v)) => {
                if v.is_nan() {
                    return None;
                }
                if v == rules.fill || v == rules.missing {
                    return None;
                }
                if v < rules.valid_min || v > rules.valid_max {
                    return None;
                }
                Some(CellValue::Float(v * rules.scale + rules.offset))
            }
            // A raw value always travels with the rules built for its
            // variable; a mismatch is a caller bug, decoded as no-value.
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_rules() -> DecodeRules {
        DecodeRules::Float(FloatRules {
            fill: -999.0,
            missing: -888.0,
            valid_min: -50.0,
            valid_max: 50.0,
            scale: 0.5,
            offset: 10.0,
        })
    }

    fn int_rules() -> DecodeRules {
        DecodeRules::Int(IntRules {
            fill: -32768,
            missing: -32767,
            valid_min: -1000,
            valid_max: 1000,
            scale: 2,
            offset: 5,
        })
    }

    #[test]
    fn test_fill_and_missing_beat_scale_offset() {
        assert_eq!(float_rules().decode(RawValue::Float(-999.0)), None);
        assert_eq!(float_rules().decode(RawValue::Float(-888.0)), None);
        assert_eq!(int_rules().decode(RawValue::Int(-32768)), None);
        assert_eq!(int_rules().decode(RawValue::Int(-32767)), None);
    }

    #[test]
    fn test_out_of_range_is_no_value() {
        assert_eq!(float_rules().decode(RawValue::Float(50.5)), None);
        assert_eq!(float_rules().decode(RawValue::Float(-50.5)), None);
        assert_eq!(int_rules().decode(RawValue::Int(1001)), None);
        assert_eq!(int_rules().decode(RawValue::Int(-1001)), None);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        assert_eq!(
            float_rules().decode(RawValue::Float(50.0)),
            Some(CellValue::Float(35.0))
        );
        assert_eq!(
            int_rules().decode(RawValue::Int(1000)),
            Some(CellValue::Int(2005))
        );
    }

    #[test]
    fn test_nan_is_no_value() {
        assert_eq!(float_rules().decode(RawValue::Float(f64::NAN)), None);
    }

    #[test]
    fn test_affine_transform_is_exact() {
        assert_eq!(
            float_rules().decode(RawValue::Float(2.0)),
            Some(CellValue::Float(11.0))
        );
        assert_eq!(
            int_rules().decode(RawValue::Int(3)),
            Some(CellValue::Int(11))
        );
    }

    #[test]
    fn test_integer_path_keeps_large_magnitudes() {
        // 2^60 + 1 is not representable as f64; the integer path must keep it.
        let big = (1i64 << 60) + 1;
        let rules = DecodeRules::Int(IntRules {
            fill: i64::MIN,
            missing: i64::MIN + 1,
            valid_min: i64::MIN,
            valid_max: i64::MAX,
            scale: 1,
            offset: 0,
        });
        assert_eq!(rules.decode(RawValue::Int(big)), Some(CellValue::Int(big)));
    }

    #[test]
    fn test_kind_classification() {
        assert!(NumericKind::Int64.is_integer());
        assert!(!NumericKind::Float32.is_integer());
        assert_eq!(
            NumericKind::from_nc_type(&NcVariableType::Int(IntType::I16)),
            Some(NumericKind::Int16)
        );
        assert_eq!(
            NumericKind::from_nc_type(&NcVariableType::Int(IntType::U8)),
            None
        );
        assert_eq!(NumericKind::from_nc_type(&NcVariableType::String), None);
    }
}
