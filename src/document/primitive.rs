//! Primitive type inference for sampled document values
//!
//! Values arrive as extended JSON: wrapper objects such as `{"$oid": …}` or
//! `{"$date": …}` stand for the store's native types.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::datamodel::TypeIdentifier;

static OBJECT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").unwrap());

/// Key of the document id in the store
pub const ID_KEY: &str = "_id";

/// Type observed for one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalType {
    Scalar(TypeIdentifier),
    /// A nested document, analyzed as an embedded type
    Object,
}

impl fmt::Display for InternalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalType::Scalar(identifier) => f.write_str(identifier.as_str()),
            InternalType::Object => f.write_str("Object"),
        }
    }
}

/// Inference result for a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    /// `None` for `null` and for empty arrays
    pub ty: Option<InternalType>,
    pub is_array: bool,
    /// The value looks like a reference to another document
    pub is_relation_candidate: bool,
}

impl TypeInfo {
    fn scalar(identifier: TypeIdentifier) -> Self {
        Self {
            ty: Some(InternalType::Scalar(identifier)),
            is_array: false,
            is_relation_candidate: false,
        }
    }

    fn candidate(identifier: TypeIdentifier) -> Self {
        Self {
            is_relation_candidate: true,
            ..Self::scalar(identifier)
        }
    }

    fn empty(is_array: bool) -> Self {
        Self {
            ty: None,
            is_array,
            is_relation_candidate: false,
        }
    }
}

/// A value the datamodel cannot express
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsupportedType {
    #[error("Type not supported: {0}")]
    Value(String),
    /// Mixed, nested or unsupported array content
    #[error("Array type not supported: {0}")]
    Array(String),
}

impl UnsupportedType {
    pub fn type_name(&self) -> &str {
        match self {
            UnsupportedType::Value(name) | UnsupportedType::Array(name) => name,
        }
    }
}

/// Infers datamodel types from document values
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveInferrer {
    detect_formats: bool,
}

impl Default for PrimitiveInferrer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PrimitiveInferrer {
    /// With `detect_formats`, RFC 3339 and UUID strings get their own scalar
    pub fn new(detect_formats: bool) -> Self {
        Self { detect_formats }
    }

    pub fn infer_type(&self, value: &Value) -> Result<TypeInfo, UnsupportedType> {
        match value {
            Value::Array(items) => self.infer_array(items),
            other => self.infer_single(other),
        }
    }

    fn infer_single(&self, value: &Value) -> Result<TypeInfo, UnsupportedType> {
        let info = match value {
            Value::Null => TypeInfo::empty(false),
            Value::Bool(_) => TypeInfo::scalar(TypeIdentifier::Boolean),
            Value::Number(n) if n.is_i64() || n.is_u64() => TypeInfo::scalar(TypeIdentifier::Int),
            Value::Number(_) => TypeInfo::scalar(TypeIdentifier::Float),
            Value::String(s) => self.infer_string(s),
            Value::Object(map) => return infer_object(map),
            Value::Array(_) => return Err(UnsupportedType::Array("Array".to_string())),
        };
        Ok(info)
    }

    fn infer_string(&self, s: &str) -> TypeInfo {
        if OBJECT_ID.is_match(s) {
            return TypeInfo::candidate(TypeIdentifier::String);
        }
        if self.detect_formats {
            if chrono::DateTime::parse_from_rfc3339(s).is_ok() {
                return TypeInfo::scalar(TypeIdentifier::DateTime);
            }
            if uuid::Uuid::parse_str(s).is_ok() {
                return TypeInfo::scalar(TypeIdentifier::Uuid);
            }
        }
        TypeInfo::scalar(TypeIdentifier::String)
    }

    /// Arrays are homogeneous; Int and Float elements unify to Float
    fn infer_array(&self, items: &[Value]) -> Result<TypeInfo, UnsupportedType> {
        let mut element: Option<InternalType> = None;
        let mut is_relation_candidate = false;

        for item in items {
            if item.is_array() {
                return Err(UnsupportedType::Array("Array".to_string()));
            }
            let info = self
                .infer_single(item)
                .map_err(|e| UnsupportedType::Array(e.type_name().to_string()))?;
            is_relation_candidate |= info.is_relation_candidate;
            let Some(ty) = info.ty else {
                continue;
            };
            element = match element {
                None => Some(ty),
                Some(seen) if seen == ty => Some(seen),
                Some(seen) if is_numeric_pair(seen, ty) => {
                    Some(InternalType::Scalar(TypeIdentifier::Float))
                }
                Some(seen) => {
                    return Err(UnsupportedType::Array(format!("{seen}, {ty}")));
                }
            };
        }

        Ok(TypeInfo {
            ty: element,
            is_array: true,
            is_relation_candidate,
        })
    }
}

fn is_numeric_pair(a: InternalType, b: InternalType) -> bool {
    let numeric = |t: InternalType| {
        matches!(
            t,
            InternalType::Scalar(TypeIdentifier::Int | TypeIdentifier::Float)
        )
    };
    numeric(a) && numeric(b)
}

/// Extended JSON wrappers, or a nested document
fn infer_object(map: &Map<String, Value>) -> Result<TypeInfo, UnsupportedType> {
    let wrapper = match map.len() {
        1 => map.keys().next().map(String::as_str),
        // {"$binary": …, "$type": …} in legacy extended JSON
        2 if map.contains_key("$binary") => Some("$binary"),
        _ => None,
    };
    let info = match wrapper {
        Some("$oid") => TypeInfo::candidate(TypeIdentifier::Id),
        Some("$date") => TypeInfo::scalar(TypeIdentifier::DateTime),
        Some("$numberLong") => TypeInfo::scalar(TypeIdentifier::Long),
        Some("$numberInt") => TypeInfo::scalar(TypeIdentifier::Int),
        Some("$numberDouble") => TypeInfo::scalar(TypeIdentifier::Float),
        Some("$binary") => return Err(UnsupportedType::Value("Binary".to_string())),
        Some("$regularExpression" | "$regex") => {
            return Err(UnsupportedType::Value("RegExp".to_string()));
        }
        Some("$code") => return Err(UnsupportedType::Value("Code".to_string())),
        Some("$timestamp") => return Err(UnsupportedType::Value("Timestamp".to_string())),
        Some("$numberDecimal") => return Err(UnsupportedType::Value("Decimal128".to_string())),
        _ => TypeInfo {
            ty: Some(InternalType::Object),
            is_array: false,
            is_relation_candidate: false,
        },
    };
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn infer(value: Value) -> Result<TypeInfo, UnsupportedType> {
        PrimitiveInferrer::default().infer_type(&value)
    }

    fn ty(value: Value) -> Option<InternalType> {
        infer(value).unwrap().ty
    }

    #[test]
    fn test_json_scalars() {
        use TypeIdentifier::*;
        assert_eq!(ty(json!(true)), Some(InternalType::Scalar(Boolean)));
        assert_eq!(ty(json!(3)), Some(InternalType::Scalar(Int)));
        assert_eq!(ty(json!(1.5)), Some(InternalType::Scalar(Float)));
        assert_eq!(ty(json!("hello")), Some(InternalType::Scalar(String)));
        assert_eq!(ty(json!(null)), None);
        assert_eq!(ty(json!({"street": "Main"})), Some(InternalType::Object));
    }

    #[test]
    fn test_extended_json_wrappers() {
        let oid = infer(json!({"$oid": "5c8b8f1e2f8e4a3b9c1d2e3f"})).unwrap();
        assert_eq!(oid.ty, Some(InternalType::Scalar(TypeIdentifier::Id)));
        assert!(oid.is_relation_candidate);

        assert_eq!(
            ty(json!({"$date": "2019-01-01T00:00:00Z"})),
            Some(InternalType::Scalar(TypeIdentifier::DateTime))
        );
        assert_eq!(
            ty(json!({"$numberLong": "42"})),
            Some(InternalType::Scalar(TypeIdentifier::Long))
        );
        assert_eq!(
            infer(json!({"$numberDecimal": "1.0"})),
            Err(UnsupportedType::Value("Decimal128".into()))
        );
    }

    #[test]
    fn test_string_formats() {
        let hex = infer(json!("5c8b8f1e2f8e4a3b9c1d2e3f")).unwrap();
        assert_eq!(hex.ty, Some(InternalType::Scalar(TypeIdentifier::String)));
        assert!(hex.is_relation_candidate);

        assert_eq!(
            ty(json!("2019-03-01T10:00:00+01:00")),
            Some(InternalType::Scalar(TypeIdentifier::DateTime))
        );
        assert_eq!(
            ty(json!("67e55044-10b1-426f-9247-bb680e5fe0c8")),
            Some(InternalType::Scalar(TypeIdentifier::Uuid))
        );

        let plain = PrimitiveInferrer::new(false)
            .infer_type(&json!("2019-03-01T10:00:00+01:00"))
            .unwrap();
        assert_eq!(plain.ty, Some(InternalType::Scalar(TypeIdentifier::String)));
    }

    #[test]
    fn test_arrays() {
        let ints = infer(json!([1, 2, 3])).unwrap();
        assert!(ints.is_array);
        assert_eq!(ints.ty, Some(InternalType::Scalar(TypeIdentifier::Int)));

        assert_eq!(
            ty(json!([1, 2.5])),
            Some(InternalType::Scalar(TypeIdentifier::Float))
        );

        let empty = infer(json!([])).unwrap();
        assert!(empty.is_array);
        assert_eq!(empty.ty, None);

        assert!(matches!(infer(json!([1, "a"])), Err(UnsupportedType::Array(_))));
        assert!(matches!(infer(json!([[1]])), Err(UnsupportedType::Array(_))));
        assert_eq!(
            infer(json!([{"$code": "x"}])),
            Err(UnsupportedType::Array("Code".into()))
        );
    }
}
