//! conversions between rust values and query arguments / responses

use crate::error::{Error, Result};
use crate::querybuilder::{Arg, ArgValue, Context};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// deserialize a json value into `T`
pub fn from_json<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// a type a leaf selection can be converted into
pub trait FromResponse: Sized {
    /// whether a null response is a valid value of this type
    const NULLABLE: bool = false;

    fn from_response(value: Value, ctx: &Context) -> Result<Self>;
}

macro_rules! deserialize_response {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromResponse for $ty {
                fn from_response(value: Value, _ctx: &Context) -> Result<Self> {
                    from_json(value)
                }
            }
        )*
    };
}

deserialize_response!(String, bool, i32, i64, u32, u64, f64);

impl FromResponse for Value {
    const NULLABLE: bool = true;

    fn from_response(value: Value, _ctx: &Context) -> Result<Self> {
        Ok(value)
    }
}

/// the response is discarded; used where only the side effect matters
impl FromResponse for () {
    const NULLABLE: bool = true;

    fn from_response(_value: Value, _ctx: &Context) -> Result<Self> {
        Ok(())
    }
}

impl<T: FromResponse> FromResponse for Option<T> {
    const NULLABLE: bool = true;

    fn from_response(value: Value, ctx: &Context) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_response(value, ctx).map(Some)
    }
}

impl<T: FromResponse> FromResponse for Vec<T> {
    fn from_response(value: Value, ctx: &Context) -> Result<Self> {
        let Value::Array(items) = value else {
            return Err(Error::protocol(
                format!("expected a list at `{}`", ctx.path()),
                value.to_string(),
            ));
        };
        items
            .into_iter()
            .map(|item| {
                if item.is_null() && !T::NULLABLE {
                    return Err(Error::InvalidQuery(format!(
                        "required list element of `{}` got a null response",
                        ctx.path()
                    )));
                }
                T::from_response(item, ctx)
            })
            .collect()
    }
}

/// a value that can be passed as a field argument
pub trait IntoArg {
    fn into_arg(self) -> ArgValue;
}

impl IntoArg for ArgValue {
    fn into_arg(self) -> ArgValue {
        self
    }
}

impl IntoArg for Value {
    fn into_arg(self) -> ArgValue {
        ArgValue::Literal(self)
    }
}

impl IntoArg for String {
    fn into_arg(self) -> ArgValue {
        ArgValue::Literal(Value::String(self))
    }
}

impl IntoArg for &str {
    fn into_arg(self) -> ArgValue {
        ArgValue::Literal(Value::String(self.to_string()))
    }
}

macro_rules! json_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoArg for $ty {
                fn into_arg(self) -> ArgValue {
                    ArgValue::Literal(Value::from(self))
                }
            }
        )*
    };
}

json_arg!(bool, i32, i64, u32, u64, f64);

/// `None` leaves the argument unset; use [`ArgValue::null`] for an explicit null
impl<T: IntoArg> IntoArg for Option<T> {
    fn into_arg(self) -> ArgValue {
        match self {
            Some(value) => value.into_arg(),
            None => ArgValue::Unset,
        }
    }
}

impl<T: IntoArg> IntoArg for Vec<T> {
    fn into_arg(self) -> ArgValue {
        ArgValue::List(self.into_iter().map(IntoArg::into_arg).collect())
    }
}

/// field of the query root that loads an object back from its id
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdLoader {
    /// graphql type declaring the loader field
    pub type_name: &'static str,
    pub field_name: &'static str,
}

/// a generated object type
pub trait ObjectType: Sized {
    const TYPE_NAME: &'static str;
    const ID_LOADER: Option<IdLoader> = None;

    fn from_parts(ctx: Context, prefetched: Option<Prefetched>) -> Self;

    fn context(&self) -> &Context;

    fn from_context(ctx: Context) -> Self {
        Self::from_parts(ctx, None)
    }
}

/// something that can stand in for the id of an `O`
///
/// objects (owned or borrowed) resolve lazily through their `id` field when
/// the query runs; generated id scalars pass through as-is.
pub trait IntoId<O: ObjectType> {
    fn into_id(self) -> ArgValue;
}

impl<O: ObjectType> IntoId<O> for O {
    fn into_id(self) -> ArgValue {
        ArgValue::lazy(O::TYPE_NAME, self.context().clone())
    }
}

impl<O: ObjectType> IntoId<O> for &O {
    fn into_id(self) -> ArgValue {
        ArgValue::lazy(O::TYPE_NAME, self.context().clone())
    }
}

/// an owned id argument for an `O`, concrete or still lazy
///
/// used where a parameter has to be a concrete type, e.g. in option structs.
pub struct IdArg<O> {
    value: ArgValue,
    marker: PhantomData<fn() -> O>,
}

impl<O: ObjectType> IdArg<O> {
    pub fn new(id: impl IntoId<O>) -> Self {
        Self {
            value: id.into_id(),
            marker: PhantomData,
        }
    }
}

impl<O> IntoArg for IdArg<O> {
    fn into_arg(self) -> ArgValue {
        self.value
    }
}

impl<O> Clone for IdArg<O> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            marker: PhantomData,
        }
    }
}

impl<O> fmt::Debug for IdArg<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IdArg").field(&self.value).finish()
    }
}

/// leaf values delivered together with a list element
#[derive(Clone, Debug, Default)]
pub struct Prefetched(Arc<Map<String, Value>>);

impl Prefetched {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(Arc::new(fields))
    }

    /// prefetched value of `name`, or none if it was not part of the fan-out
    pub fn field<T: FromResponse>(&self, name: &str, ctx: &Context) -> Option<Result<T>> {
        let value = self.0.get(name)?.clone();
        if value.is_null() && !T::NULLABLE {
            return Some(Err(Error::InvalidQuery(format!(
                "required field `{name}` got a null response"
            ))));
        }
        Some(T::from_response(value, ctx))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// build an object from one element of a list response
///
/// an element carrying an `id` is re-rooted at the type's id loader so later
/// chaining addresses that exact object; otherwise it keeps the list context.
pub fn object_from_response<O: ObjectType>(value: Value, ctx: &Context) -> Result<O> {
    let fields = match value {
        Value::Object(fields) => fields,
        Value::Null => Map::new(),
        other => {
            return Err(Error::protocol(
                format!("expected an object of type {}", O::TYPE_NAME),
                other.to_string(),
            ))
        }
    };

    let id = fields.get("id").and_then(Value::as_str).map(str::to_string);
    let ctx = match (id, O::ID_LOADER) {
        (Some(id), Some(loader)) => ctx.root().select(
            loader.type_name,
            loader.field_name,
            vec![Arg::new("id", ArgValue::Literal(Value::String(id)))],
        ),
        _ => ctx.clone(),
    };

    let prefetched = (!fields.is_empty()).then(|| Prefetched::new(fields));
    Ok(O::from_parts(ctx, prefetched))
}
