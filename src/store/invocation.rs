//! Call-style normalization for `commit` and `dispatch`.

use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// Either a type string with a separate payload, or a descriptor object
/// carrying `type` (the whole object then becomes the payload).
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Typed { kind: String, payload: Value },
    Descriptor(Value),
}

/// Normalized `(type, payload)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub kind: String,
    pub payload: Value,
}

impl Invocation {
    pub fn normalize(self) -> Result<Call, StoreError> {
        match self {
            Invocation::Typed { kind, payload } => Ok(Call { kind, payload }),
            Invocation::Descriptor(descriptor) => match descriptor.get("type") {
                Some(Value::String(kind)) => Ok(Call {
                    kind: kind.clone(),
                    payload: descriptor,
                }),
                Some(other) => Err(StoreError::InvalidInvocation {
                    reason: format!("expects string as the type, but found {}", other),
                }),
                None => Err(StoreError::InvalidInvocation {
                    reason: "descriptor object has no \"type\" field".to_string(),
                }),
            },
        }
    }
}

impl From<&str> for Invocation {
    fn from(kind: &str) -> Self {
        Invocation::Typed {
            kind: kind.to_string(),
            payload: Value::Null,
        }
    }
}

impl From<String> for Invocation {
    fn from(kind: String) -> Self {
        Invocation::Typed {
            kind,
            payload: Value::Null,
        }
    }
}

impl<P: Into<Value>> From<(&str, P)> for Invocation {
    fn from((kind, payload): (&str, P)) -> Self {
        Invocation::Typed {
            kind: kind.to_string(),
            payload: payload.into(),
        }
    }
}

impl<P: Into<Value>> From<(String, P)> for Invocation {
    fn from((kind, payload): (String, P)) -> Self {
        Invocation::Typed {
            kind,
            payload: payload.into(),
        }
    }
}

impl From<Value> for Invocation {
    fn from(descriptor: Value) -> Self {
        Invocation::Descriptor(descriptor)
    }
}

/// Options for calls made through a local context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Skip the namespace prefix and address the root registry directly.
    pub root: bool,
}

impl CallOptions {
    pub fn root() -> Self {
        Self { root: true }
    }
}

/// A committed mutation as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

/// A dispatched action as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_both_styles_normalize_alike() {
        let typed = Invocation::from(("cart/add", json!({"type": "cart/add", "id": 1})))
            .normalize()
            .unwrap();
        let descriptor = Invocation::from(json!({"type": "cart/add", "id": 1}))
            .normalize()
            .unwrap();
        assert_eq!(typed, descriptor);
    }

    #[test]
    fn test_bare_type_has_null_payload() {
        let call = Invocation::from("reset").normalize().unwrap();
        assert_eq!(call.kind, "reset");
        assert_eq!(call.payload, Value::Null);
    }

    #[test]
    fn test_descriptor_without_string_type_is_rejected() {
        assert!(matches!(
            Invocation::from(json!({"type": 3})).normalize(),
            Err(StoreError::InvalidInvocation { .. })
        ));
        assert!(matches!(
            Invocation::from(json!({"id": 1})).normalize(),
            Err(StoreError::InvalidInvocation { .. })
        ));
        assert!(matches!(
            Invocation::from(json!("text")).normalize(),
            Err(StoreError::InvalidInvocation { .. })
        ));
    }

    #[test]
    fn test_record_serializes_type_field() {
        let record = MutationRecord {
            kind: "add".to_string(),
            payload: json!(1),
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"type": "add", "payload": 1})
        );
    }
}
