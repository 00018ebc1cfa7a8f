//! schema model
//!
//! both loaders (sdl via graphql-parser, introspection json via serde) produce
//! the same model. argument defaults are stored as compact graphql literals,
//! rendered the same way the query builder renders argument values, so a
//! default can be compared against a rendered argument verbatim.

use super::CodegenError;
use crate::querybuilder::ArgValue;
use graphql_parser::query::{self as gql_query, Value as GqlValue};
use graphql_parser::schema::{self as gql, Definition, Directive, TypeDefinition};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// builtin scalar names
pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

const DEFAULT_DEPRECATION: &str = "No longer supported";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeKind {
    Scalar,
    Enum,
    InputObject,
    Object,
    Interface,
    Union,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Scalar => "scalar",
            TypeKind::Enum => "enum",
            TypeKind::InputObject => "input object",
            TypeKind::Object => "object",
            TypeKind::Interface => "interface",
            TypeKind::Union => "union",
        }
    }
}

/// reference to a named type with list/non-null wrappers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// the named type under all wrappers
    pub fn named(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// the type without a top-level non-null wrapper
    pub fn nullable(&self) -> &TypeRef {
        match self {
            TypeRef::NonNull(inner) => inner,
            other => other,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.nullable(), TypeRef::List(_))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputValueDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    /// compact graphql literal of the default value
    pub default_value: Option<String>,
}

impl InputValueDef {
    /// required arguments are non-null without a default
    pub fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default_value.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub args: Vec<InputValueDef>,
    pub ty: TypeRef,
    pub deprecation: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumValueDef {
    pub name: String,
    pub description: Option<String>,
    pub deprecation: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedType {
    pub name: String,
    pub kind: TypeKind,
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
    pub input_fields: Vec<InputValueDef>,
    pub enum_values: Vec<EnumValueDef>,
}

impl NamedType {
    fn new(name: String, kind: TypeKind, description: Option<String>) -> Self {
        Self {
            name,
            kind,
            description,
            fields: Vec::new(),
            input_fields: Vec::new(),
            enum_values: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// a loaded graphql schema
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    pub query_type: String,
    pub types: BTreeMap<String, NamedType>,
}

impl Schema {
    /// load sdl or introspection json, detected by the first character
    pub fn parse(text: &str) -> Result<Self, CodegenError> {
        if text.trim_start().starts_with('{') {
            Self::from_introspection(text)
        } else {
            Self::from_sdl(text)
        }
    }

    /// load a schema from sdl
    pub fn from_sdl(sdl: &str) -> Result<Self, CodegenError> {
        let document = gql::parse_schema::<String>(sdl)
            .map_err(|err| CodegenError::Parse(err.to_string()))?;

        let mut query_type = "Query".to_string();
        let mut types = BTreeMap::new();
        for definition in &document.definitions {
            match definition {
                Definition::SchemaDefinition(schema) => {
                    if let Some(query) = &schema.query {
                        query_type = query.clone();
                    }
                }
                Definition::TypeDefinition(definition) => {
                    let named = sdl_type(definition)?;
                    types.insert(named.name.clone(), named);
                }
                _ => {}
            }
        }

        Ok(Self { query_type, types })
    }

    /// load a schema from an introspection result
    ///
    /// accepts the full response (`{"data": {"__schema": ...}}`) or the
    /// bare `{"__schema": ...}` object.
    pub fn from_introspection(json: &str) -> Result<Self, CodegenError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_introspection_value(value)
    }

    pub fn from_introspection_value(value: Value) -> Result<Self, CodegenError> {
        let mut value = value;
        if let Some(data) = value.get_mut("data") {
            value = data.take();
        }
        let schema = value
            .get_mut("__schema")
            .map(Value::take)
            .ok_or_else(|| CodegenError::Introspection("missing `__schema`".to_string()))?;
        let schema: IntrospectionSchema = serde_json::from_value(schema)?;

        let query_type = schema
            .query_type
            .map(|query| query.name)
            .unwrap_or_else(|| "Query".to_string());
        let mut types = BTreeMap::new();
        for full in schema.types {
            let named = full.into_named()?;
            types.insert(named.name.clone(), named);
        }

        Ok(Self { query_type, types })
    }

    pub fn get(&self, name: &str) -> Option<&NamedType> {
        self.types.get(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<TypeKind> {
        if BUILTIN_SCALARS.contains(&name) {
            return Some(TypeKind::Scalar);
        }
        self.get(name).map(|ty| ty.kind)
    }

    /// the query root type
    pub fn query_root(&self) -> Result<&NamedType, CodegenError> {
        self.get(&self.query_type)
            .filter(|ty| ty.kind == TypeKind::Object)
            .ok_or_else(|| CodegenError::MissingQueryType(self.query_type.clone()))
    }

    /// the object type an id scalar refers to, if both exist
    ///
    /// `ContainerID` refers to `Container`; the builtin `ID` refers to nothing.
    pub fn id_target(&self, name: &str) -> Option<&str> {
        if name == "ID" || self.kind_of(name) != Some(TypeKind::Scalar) {
            return None;
        }
        let target = name.strip_suffix("ID")?;
        self.get(target)
            .filter(|ty| ty.kind == TypeKind::Object)
            .map(|ty| ty.name.as_str())
    }

    /// the root field that loads `type_name` from its id, if the schema has one
    pub fn id_loader(&self, type_name: &str) -> Option<&str> {
        let field = format!("load{type_name}FromID");
        self.query_root()
            .ok()?
            .field(&field)
            .map(|field| field.name.as_str())
    }

    /// user-defined types, skipping introspection types and builtin scalars
    pub fn user_types(&self) -> impl Iterator<Item = &NamedType> {
        self.types.values().filter(|ty| {
            !ty.name.starts_with("__") && !BUILTIN_SCALARS.contains(&ty.name.as_str())
        })
    }
}

fn sdl_type(definition: &TypeDefinition<'_, String>) -> Result<NamedType, CodegenError> {
    let named = match definition {
        TypeDefinition::Scalar(scalar) => NamedType::new(
            scalar.name.clone(),
            TypeKind::Scalar,
            scalar.description.clone(),
        ),
        TypeDefinition::Object(object) => {
            let mut named = NamedType::new(
                object.name.clone(),
                TypeKind::Object,
                object.description.clone(),
            );
            named.fields = sdl_fields(&object.fields)?;
            named
        }
        TypeDefinition::Interface(interface) => {
            let mut named = NamedType::new(
                interface.name.clone(),
                TypeKind::Interface,
                interface.description.clone(),
            );
            named.fields = sdl_fields(&interface.fields)?;
            named
        }
        TypeDefinition::Union(union_type) => NamedType::new(
            union_type.name.clone(),
            TypeKind::Union,
            union_type.description.clone(),
        ),
        TypeDefinition::Enum(enum_type) => {
            let mut named = NamedType::new(
                enum_type.name.clone(),
                TypeKind::Enum,
                enum_type.description.clone(),
            );
            named.enum_values = enum_type
                .values
                .iter()
                .map(|value| EnumValueDef {
                    name: value.name.clone(),
                    description: value.description.clone(),
                    deprecation: sdl_deprecation(&value.directives),
                })
                .collect();
            named
        }
        TypeDefinition::InputObject(input) => {
            let mut named = NamedType::new(
                input.name.clone(),
                TypeKind::InputObject,
                input.description.clone(),
            );
            named.input_fields = sdl_input_values(&input.fields)?;
            named
        }
    };
    Ok(named)
}

fn sdl_fields(fields: &[gql::Field<'_, String>]) -> Result<Vec<FieldDef>, CodegenError> {
    fields
        .iter()
        .map(|field| {
            Ok(FieldDef {
                name: field.name.clone(),
                description: field.description.clone(),
                args: sdl_input_values(&field.arguments)?,
                ty: sdl_type_ref(&field.field_type),
                deprecation: sdl_deprecation(&field.directives),
            })
        })
        .collect()
}

fn sdl_input_values(
    values: &[gql::InputValue<'_, String>],
) -> Result<Vec<InputValueDef>, CodegenError> {
    values
        .iter()
        .map(|value| {
            let default_value = match &value.default_value {
                Some(default) => Some(canonical_literal(default)?),
                None => None,
            };
            Ok(InputValueDef {
                name: value.name.clone(),
                description: value.description.clone(),
                ty: sdl_type_ref(&value.value_type),
                default_value,
            })
        })
        .collect()
}

fn sdl_type_ref(ty: &gql::Type<'_, String>) -> TypeRef {
    match ty {
        gql::Type::NamedType(name) => TypeRef::Named(name.clone()),
        gql::Type::ListType(inner) => TypeRef::List(Box::new(sdl_type_ref(inner))),
        gql::Type::NonNullType(inner) => TypeRef::NonNull(Box::new(sdl_type_ref(inner))),
    }
}

fn sdl_deprecation(directives: &[Directive<'_, String>]) -> Option<String> {
    let directive = directives
        .iter()
        .find(|directive| directive.name == "deprecated")?;
    let reason = directive
        .arguments
        .iter()
        .find_map(|(name, value)| match (name.as_str(), value) {
            ("reason", GqlValue::String(reason)) => Some(reason.clone()),
            _ => None,
        });
    Some(reason.unwrap_or_else(|| DEFAULT_DEPRECATION.to_string()))
}

/// convert a parsed graphql literal into an argument value
fn literal_value(value: &GqlValue<'_, String>) -> Result<ArgValue, CodegenError> {
    let value = match value {
        GqlValue::Null => ArgValue::null(),
        GqlValue::Boolean(value) => ArgValue::Literal(Value::Bool(*value)),
        GqlValue::Int(number) => {
            let number = number
                .as_i64()
                .ok_or_else(|| CodegenError::Parse("integer default out of range".to_string()))?;
            ArgValue::Literal(Value::from(number))
        }
        GqlValue::Float(number) => serde_json::Number::from_f64(*number)
            .map(|number| ArgValue::Literal(Value::Number(number)))
            .ok_or_else(|| CodegenError::Parse(format!("invalid float default {number}")))?,
        GqlValue::String(value) => ArgValue::Literal(Value::String(value.clone())),
        GqlValue::Enum(name) => ArgValue::Enum(name.clone()),
        GqlValue::List(items) => ArgValue::List(
            items
                .iter()
                .map(literal_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        GqlValue::Object(fields) => ArgValue::Object(
            fields
                .iter()
                .map(|(name, value)| Ok((name.clone(), literal_value(value)?)))
                .collect::<Result<Vec<_>, CodegenError>>()?,
        ),
        GqlValue::Variable(name) => {
            return Err(CodegenError::Parse(format!(
                "variable `${name}` cannot be a default value"
            )))
        }
    };
    Ok(value)
}

fn canonical_literal(value: &GqlValue<'_, String>) -> Result<String, CodegenError> {
    literal_value(value)?
        .to_canonical_literal()
        .ok_or_else(|| CodegenError::Parse("default value cannot be rendered".to_string()))
}

/// canonicalize a default value as reported by introspection (graphql text)
pub fn canonical_default(raw: &str) -> Result<String, CodegenError> {
    let source = format!("{{f(v:{raw})}}");
    let document = gql_query::parse_query::<String>(&source)
        .map_err(|err| CodegenError::Parse(format!("invalid default value {raw:?}: {err}")))?;

    let value = document.definitions.iter().find_map(|definition| {
        let gql_query::Definition::Operation(gql_query::OperationDefinition::SelectionSet(set)) =
            definition
        else {
            return None;
        };
        set.items.iter().find_map(|selection| match selection {
            gql_query::Selection::Field(field) => field.arguments.first().map(|(_, value)| value),
            _ => None,
        })
    });

    match value {
        Some(value) => canonical_literal(value),
        None => Err(CodegenError::Parse(format!("invalid default value {raw:?}"))),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionSchema {
    query_type: Option<IntrospectionName>,
    types: Vec<IntrospectionType>,
}

#[derive(Deserialize)]
struct IntrospectionName {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionType {
    kind: String,
    name: Option<String>,
    description: Option<String>,
    fields: Option<Vec<IntrospectionField>>,
    input_fields: Option<Vec<IntrospectionInputValue>>,
    enum_values: Option<Vec<IntrospectionEnumValue>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionField {
    name: String,
    description: Option<String>,
    #[serde(default)]
    args: Vec<IntrospectionInputValue>,
    #[serde(rename = "type")]
    ty: IntrospectionTypeRef,
    #[serde(default)]
    is_deprecated: bool,
    deprecation_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionInputValue {
    name: String,
    description: Option<String>,
    #[serde(rename = "type")]
    ty: IntrospectionTypeRef,
    default_value: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionEnumValue {
    name: String,
    description: Option<String>,
    #[serde(default)]
    is_deprecated: bool,
    deprecation_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntrospectionTypeRef {
    kind: String,
    name: Option<String>,
    of_type: Option<Box<IntrospectionTypeRef>>,
}

fn introspection_deprecation(is_deprecated: bool, reason: Option<String>) -> Option<String> {
    is_deprecated.then(|| reason.unwrap_or_else(|| DEFAULT_DEPRECATION.to_string()))
}

impl IntrospectionType {
    fn into_named(self) -> Result<NamedType, CodegenError> {
        let name = self
            .name
            .ok_or_else(|| CodegenError::Introspection("type without a name".to_string()))?;
        let kind = match self.kind.as_str() {
            "SCALAR" => TypeKind::Scalar,
            "OBJECT" => TypeKind::Object,
            "INTERFACE" => TypeKind::Interface,
            "UNION" => TypeKind::Union,
            "ENUM" => TypeKind::Enum,
            "INPUT_OBJECT" => TypeKind::InputObject,
            other => {
                return Err(CodegenError::Introspection(format!(
                    "unknown kind `{other}` for type `{name}`"
                )))
            }
        };

        let mut named = NamedType::new(name, kind, self.description);
        named.fields = self
            .fields
            .unwrap_or_default()
            .into_iter()
            .map(|field| {
                Ok(FieldDef {
                    name: field.name,
                    description: field.description,
                    args: input_values(field.args)?,
                    ty: field.ty.into_type_ref()?,
                    deprecation: introspection_deprecation(
                        field.is_deprecated,
                        field.deprecation_reason,
                    ),
                })
            })
            .collect::<Result<_, CodegenError>>()?;
        named.input_fields = input_values(self.input_fields.unwrap_or_default())?;
        named.enum_values = self
            .enum_values
            .unwrap_or_default()
            .into_iter()
            .map(|value| EnumValueDef {
                name: value.name,
                description: value.description,
                deprecation: introspection_deprecation(
                    value.is_deprecated,
                    value.deprecation_reason,
                ),
            })
            .collect();
        Ok(named)
    }
}

fn input_values(values: Vec<IntrospectionInputValue>) -> Result<Vec<InputValueDef>, CodegenError> {
    values
        .into_iter()
        .map(|value| {
            let default_value = match value.default_value.as_deref() {
                Some(raw) => Some(canonical_default(raw)?),
                None => None,
            };
            Ok(InputValueDef {
                name: value.name,
                description: value.description,
                ty: value.ty.into_type_ref()?,
                default_value,
            })
        })
        .collect()
}

impl IntrospectionTypeRef {
    fn into_type_ref(self) -> Result<TypeRef, CodegenError> {
        match self.kind.as_str() {
            "NON_NULL" | "LIST" => {
                let inner = self.of_type.ok_or_else(|| {
                    CodegenError::Introspection(format!("`{}` type without `ofType`", self.kind))
                })?;
                let inner = Box::new(inner.into_type_ref()?);
                Ok(if self.kind == "LIST" {
                    TypeRef::List(inner)
                } else {
                    TypeRef::NonNull(inner)
                })
            }
            _ => self
                .name
                .map(TypeRef::Named)
                .ok_or_else(|| CodegenError::Introspection("named type without a name".to_string())),
        }
    }
}
