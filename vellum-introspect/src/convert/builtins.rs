//! Built-in conversion set.
//!
//! Constructed lazily the first time a `(formal, actual)` pair is probed;
//! the registry caches the result either way. All converters here are pure
//! and report failures through [`ConversionError`].

use std::str::FromStr;
use std::sync::Arc;

use crate::descriptor::TypeDesc;
use crate::error::ConversionError;
use crate::value::{ArgType, Value};

use super::Converter;

/// Looks up the built-in converter for a pair, if one exists.
pub(super) fn builtin_converter(formal: &TypeDesc, actual: &ArgType) -> Option<Converter> {
    match formal {
        // Universal stringifier: any value renders to a string.
        TypeDesc::Str => Some(Arc::new(|v| Ok(Value::str(v.to_string())))),

        TypeDesc::Bool => match actual {
            ArgType::I8 | ArgType::I16 | ArgType::I32 | ArgType::I64 => {
                Some(int_input("bool", |n| Ok(Value::Bool(n != 0))))
            }
            ArgType::F32 | ArgType::F64 => {
                Some(float_input("bool", |x| Ok(Value::Bool(x != 0.0))))
            }
            ArgType::Char => Some(Arc::new(|v| match v.as_char() {
                Some(c) => Ok(Value::Bool(c != '\0')),
                None => Err(shape_error(v, "bool")),
            })),
            ArgType::Str => Some(Arc::new(|v| match v.as_str() {
                Some(s) => Ok(Value::Bool(s.eq_ignore_ascii_case("true"))),
                None => Err(shape_error(v, "bool")),
            })),
            _ => None,
        },

        TypeDesc::I8 => match actual {
            ArgType::Str => Some(parse_str::<i8>("i8", Value::I8)),
            ArgType::I16 | ArgType::I32 | ArgType::I64 => Some(narrow_int(
                "i8",
                i64::from(i8::MIN),
                i64::from(i8::MAX),
                |n| Value::I8(n as i8),
            )),
            ArgType::F32 | ArgType::F64 => Some(float_to_int(
                "i8",
                f64::from(i8::MIN),
                f64::from(i8::MAX),
                |n| Value::I8(n as i8),
            )),
            ArgType::Bool => Some(bool_to_num(|b| Value::I8(i8::from(b)))),
            _ => None,
        },

        TypeDesc::I16 => match actual {
            ArgType::Str => Some(parse_str::<i16>("i16", Value::I16)),
            ArgType::I32 | ArgType::I64 => Some(narrow_int(
                "i16",
                i64::from(i16::MIN),
                i64::from(i16::MAX),
                |n| Value::I16(n as i16),
            )),
            ArgType::F32 | ArgType::F64 => Some(float_to_int(
                "i16",
                f64::from(i16::MIN),
                f64::from(i16::MAX),
                |n| Value::I16(n as i16),
            )),
            ArgType::Bool => Some(bool_to_num(|b| Value::I16(i16::from(b)))),
            _ => None,
        },

        TypeDesc::I32 => match actual {
            ArgType::Str => Some(parse_str::<i32>("i32", Value::I32)),
            ArgType::I64 => Some(narrow_int(
                "i32",
                i64::from(i32::MIN),
                i64::from(i32::MAX),
                |n| Value::I32(n as i32),
            )),
            ArgType::F32 | ArgType::F64 => Some(float_to_int(
                "i32",
                f64::from(i32::MIN),
                f64::from(i32::MAX),
                |n| Value::I32(n as i32),
            )),
            ArgType::Bool => Some(bool_to_num(|b| Value::I32(i32::from(b)))),
            _ => None,
        },

        TypeDesc::I64 => match actual {
            ArgType::Str => Some(parse_str::<i64>("i64", Value::I64)),
            ArgType::F32 | ArgType::F64 => Some(float_to_int(
                "i64",
                i64::MIN as f64,
                i64::MAX as f64,
                Value::I64,
            )),
            ArgType::Bool => Some(bool_to_num(|b| Value::I64(i64::from(b)))),
            _ => None,
        },

        TypeDesc::F32 => match actual {
            ArgType::Str => Some(parse_str::<f32>("f32", Value::F32)),
            ArgType::F64 => Some(float_input("f32", |x| {
                if x.is_finite() && x.abs() > f64::from(f32::MAX) {
                    Err(ConversionError::Range {
                        value: x.to_string(),
                        target: "f32".into(),
                    })
                } else {
                    Ok(Value::F32(x as f32))
                }
            })),
            ArgType::Bool => Some(bool_to_num(|b| Value::F32(f32::from(u8::from(b))))),
            _ => None,
        },

        TypeDesc::F64 => match actual {
            ArgType::Str => Some(parse_str::<f64>("f64", Value::F64)),
            ArgType::Bool => Some(bool_to_num(|b| Value::F64(f64::from(u8::from(b))))),
            _ => None,
        },

        // Object conversions (including string-to-enum-constant) arrive via
        // registration, not as builtins.
        TypeDesc::Char
        | TypeDesc::List(_)
        | TypeDesc::Map
        | TypeDesc::Object(_)
        | TypeDesc::Any => None,
    }
}

fn shape_error(value: &Value, target: &str) -> ConversionError {
    ConversionError::Format {
        value: format!("{value:?}"),
        target: target.into(),
    }
}

fn int_input(
    target: &'static str,
    apply: fn(i64) -> Result<Value, ConversionError>,
) -> Converter {
    Arc::new(move |v| match v.as_i64() {
        Some(n) => apply(n),
        None => Err(shape_error(v, target)),
    })
}

fn float_input(
    target: &'static str,
    apply: impl Fn(f64) -> Result<Value, ConversionError> + Send + Sync + 'static,
) -> Converter {
    Arc::new(move |v| match v.as_f64() {
        Some(x) => apply(x),
        None => Err(shape_error(v, target)),
    })
}

fn parse_str<T>(target: &'static str, make: fn(T) -> Value) -> Converter
where
    T: FromStr + Send + Sync + 'static,
{
    Arc::new(move |v| match v.as_str() {
        Some(s) => s.parse::<T>().map(make).map_err(|_| ConversionError::Format {
            value: s.to_string(),
            target: target.into(),
        }),
        None => Err(shape_error(v, target)),
    })
}

fn narrow_int(target: &'static str, min: i64, max: i64, make: fn(i64) -> Value) -> Converter {
    Arc::new(move |v| {
        let n = v.as_i64().ok_or_else(|| shape_error(v, target))?;
        if n < min || n > max {
            return Err(ConversionError::Range {
                value: n.to_string(),
                target: target.into(),
            });
        }
        Ok(make(n))
    })
}

fn float_to_int(target: &'static str, min: f64, max: f64, make: fn(i64) -> Value) -> Converter {
    Arc::new(move |v| {
        let x = v.as_f64().ok_or_else(|| shape_error(v, target))?;
        if x.is_nan() {
            return Err(ConversionError::Range {
                value: "NaN".into(),
                target: target.into(),
            });
        }
        let truncated = x.trunc();
        if truncated < min || truncated > max {
            return Err(ConversionError::Range {
                value: x.to_string(),
                target: target.into(),
            });
        }
        Ok(make(truncated as i64))
    })
}

fn bool_to_num(make: fn(bool) -> Value) -> Converter {
    Arc::new(move |v| match v.as_bool() {
        Some(b) => Ok(make(b)),
        None => Err(shape_error(v, "numeric")),
    })
}
