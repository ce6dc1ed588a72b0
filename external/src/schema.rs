//! Input/output descriptions for external functions.
//!
//! A [`Description`] is a tree of values, single structures (ordered named
//! fields) and multiple structures (homogeneous lists). The same tree is used
//! to validate caller input and to clean function output.

use serde_json::{Map, Value, json};

/// Primitive parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Int,
    Float,
    Bool,
    /// ASCII letters and digits only.
    Alphanum,
    Text,
    Url,
    Email,
    /// Unfiltered string.
    Raw,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Alphanum => "alphanum",
            Self::Text => "text",
            Self::Url => "url",
            Self::Email => "email",
            Self::Raw => "raw",
        }
    }
}

/// Whether a value must be supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    Default(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Description {
    Value {
        param_type: ParamType,
        desc: String,
        presence: Presence,
    },
    Single {
        desc: String,
        presence: Presence,
        fields: Vec<Field>,
    },
    Multiple {
        desc: String,
        presence: Presence,
        content: Box<Description>,
    },
}

/// A named member of a single structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub description: Description,
}

impl Field {
    pub fn new(name: impl Into<String>, description: Description) -> Self {
        Self {
            name: name.into(),
            description,
        }
    }
}

impl Description {
    /// A required primitive value.
    pub fn value(param_type: ParamType, desc: impl Into<String>) -> Self {
        Self::Value {
            param_type,
            desc: desc.into(),
            presence: Presence::Required,
        }
    }

    /// A required structure with the given fields, in order.
    pub fn single(desc: impl Into<String>, fields: Vec<Field>) -> Self {
        Self::Single {
            desc: desc.into(),
            presence: Presence::Required,
            fields,
        }
    }

    /// A required list whose items all match `content`.
    pub fn multiple(content: Description, desc: impl Into<String>) -> Self {
        Self::Multiple {
            desc: desc.into(),
            presence: Presence::Required,
            content: Box::new(content),
        }
    }

    pub fn optional(self) -> Self {
        self.with_presence(Presence::Optional)
    }

    pub fn with_default(self, default: Value) -> Self {
        self.with_presence(Presence::Default(default))
    }

    fn with_presence(self, presence: Presence) -> Self {
        match self {
            Self::Value {
                param_type, desc, ..
            } => Self::Value {
                param_type,
                desc,
                presence,
            },
            Self::Single { desc, fields, .. } => Self::Single {
                desc,
                presence,
                fields,
            },
            Self::Multiple { desc, content, .. } => Self::Multiple {
                desc,
                presence,
                content,
            },
        }
    }

    pub fn presence(&self) -> &Presence {
        match self {
            Self::Value { presence, .. }
            | Self::Single { presence, .. }
            | Self::Multiple { presence, .. } => presence,
        }
    }

    /// Look up a direct field of a single structure.
    pub fn field(&self, name: &str) -> Option<&Description> {
        match self {
            Self::Single { fields, .. } => fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| &f.description),
            _ => None,
        }
    }

    /// Field names of a single structure, in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            Self::Single { fields, .. } => fields.iter().map(|f| f.name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// JSON rendering used by `service.functions`.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        match self {
            Self::Value {
                param_type, desc, ..
            } => {
                out.insert("type".into(), json!(param_type.as_str()));
                out.insert("desc".into(), json!(desc));
            }
            Self::Single { desc, fields, .. } => {
                out.insert("type".into(), json!("object"));
                out.insert("desc".into(), json!(desc));
                let mut keys = Map::new();
                for field in fields {
                    keys.insert(field.name.clone(), field.description.to_json());
                }
                out.insert("keys".into(), Value::Object(keys));
            }
            Self::Multiple { desc, content, .. } => {
                out.insert("type".into(), json!("list"));
                out.insert("desc".into(), json!(desc));
                out.insert("content".into(), content.to_json());
            }
        }
        match self.presence() {
            Presence::Required => {
                out.insert("required".into(), json!(true));
            }
            Presence::Optional => {
                out.insert("required".into(), json!(false));
            }
            Presence::Default(default) => {
                out.insert("required".into(), json!(false));
                out.insert("default".into(), default.clone());
            }
        }
        Value::Object(out)
    }
}

/// The standard warnings list attached to every envelope.
pub fn warnings() -> Description {
    Description::multiple(
        Description::single(
            "warning",
            vec![
                Field::new(
                    "item",
                    Description::value(ParamType::Text, "item").optional(),
                ),
                Field::new(
                    "itemid",
                    Description::value(ParamType::Int, "item id").optional(),
                ),
                Field::new(
                    "warningcode",
                    Description::value(
                        ParamType::Alphanum,
                        "the warning code can be used by the client app to implement specific behaviour",
                    ),
                ),
                Field::new(
                    "message",
                    Description::value(
                        ParamType::Raw,
                        "untranslated english message to explain the warning",
                    ),
                ),
            ],
        ),
        "list of warnings",
    )
    .optional()
}

/// Envelope with only `status` and `warnings`.
pub fn status_with_warnings(status_desc: &str) -> Description {
    Description::single(
        "result",
        vec![
            Field::new("status", Description::value(ParamType::Bool, status_desc)),
            Field::new("warnings", warnings()),
        ],
    )
}
