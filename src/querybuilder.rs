//! query builder
//!
//! every generated method call appends a [`Selection`] to an immutable
//! chain held by a [`Context`]. nothing is sent until a leaf method calls
//! [`Context::execute`]; at that point object arguments are resolved to ids
//! (concurrently), the chain is folded into one query document, sent, and
//! the response is walked back along the same field path.
//!
//! chains share their prefix through `Arc` parent links, so forking a
//! context never affects the context it was forked from.

use crate::connection::Connection;
use crate::convert::FromResponse;
use crate::error::{Error, QueryError, Result};
use crate::graphql::GraphQlRequest;
use futures::future::{self, BoxFuture, FutureExt, TryFutureExt};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// value of a field argument
#[derive(Clone, Debug)]
pub enum ArgValue {
    /// not provided; the argument is left out of the query
    Unset,
    /// json scalar, list, or object rendered as a graphql literal
    Literal(Value),
    /// enum value rendered bare
    Enum(String),
    List(Vec<ArgValue>),
    /// input object; unset fields are skipped
    Object(Vec<(String, ArgValue)>),
    /// unexecuted object, replaced by its `id` before the query is sent
    Lazy(LazyObject),
}

/// an object argument that still has to be resolved to its id
#[derive(Clone, Debug)]
pub struct LazyObject {
    type_name: String,
    context: Context,
}

impl ArgValue {
    /// explicit graphql `null`
    pub fn null() -> Self {
        ArgValue::Literal(Value::Null)
    }

    /// object argument resolved through its `id` field at execution time
    pub fn lazy(type_name: impl Into<String>, context: Context) -> Self {
        ArgValue::Lazy(LazyObject {
            type_name: type_name.into(),
            context,
        })
    }

    /// true if the value (or anything nested in it) still needs an id lookup
    pub fn is_lazy(&self) -> bool {
        match self {
            ArgValue::Lazy(_) => true,
            ArgValue::List(items) => items.iter().any(ArgValue::is_lazy),
            ArgValue::Object(fields) => fields.iter().any(|(_, value)| value.is_lazy()),
            _ => false,
        }
    }

    /// compact graphql literal for this value, none if it is still lazy
    pub fn to_literal(&self) -> Option<String> {
        let mut out = String::new();
        self.write_literal(&mut out, false)?;
        Some(out)
    }

    /// literal used to compare against schema defaults
    ///
    /// object fields are sorted by name and integral numbers lose their
    /// fraction, so `{b:1.0,a:"x"}` and `{a:"x",b:1}` compare equal.
    pub fn to_canonical_literal(&self) -> Option<String> {
        let mut out = String::new();
        self.write_literal(&mut out, true)?;
        Some(out)
    }

    fn write_literal(&self, out: &mut String, canonical: bool) -> Option<()> {
        match self {
            ArgValue::Unset => out.push_str("null"),
            ArgValue::Literal(value) => write_json_literal(value, out, canonical),
            ArgValue::Enum(name) => out.push_str(name),
            ArgValue::List(items) => {
                out.push('[');
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    item.write_literal(out, canonical)?;
                }
                out.push(']');
            }
            ArgValue::Object(fields) => {
                let mut fields: Vec<&(String, ArgValue)> = fields
                    .iter()
                    .filter(|(_, value)| !matches!(value, ArgValue::Unset))
                    .collect();
                if canonical {
                    fields.sort_by(|a, b| a.0.cmp(&b.0));
                }
                out.push('{');
                for (idx, (name, value)) in fields.into_iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    out.push_str(name);
                    out.push(':');
                    value.write_literal(out, canonical)?;
                }
                out.push('}');
            }
            ArgValue::Lazy(_) => return None,
        }
        Some(())
    }
}

fn write_json_literal(value: &Value, out: &mut String, canonical: bool) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_json_literal(item, out, canonical);
            }
            out.push(']');
        }
        // serde_json maps iterate in key order
        Value::Object(fields) => {
            out.push('{');
            for (idx, (name, value)) in fields.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(name);
                out.push(':');
                write_json_literal(value, out, canonical);
            }
            out.push('}');
        }
        Value::Number(number) if canonical => match integral(number) {
            Some(int) => out.push_str(&int.to_string()),
            None => out.push_str(&number.to_string()),
        },
        // json string escapes are valid graphql string escapes
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// integer value of a number without a fractional part
fn integral(number: &serde_json::Number) -> Option<i64> {
    if let Some(int) = number.as_i64() {
        return Some(int);
    }
    let float = number.as_f64()?;
    let in_range = float.fract() == 0.0 && float.abs() < 9_007_199_254_740_992.0;
    in_range.then_some(float as i64)
}

/// a named field argument
#[derive(Clone, Debug)]
pub struct Arg {
    name: String,
    value: ArgValue,
    default: Option<String>,
}

impl Arg {
    pub fn new(name: impl Into<String>, value: ArgValue) -> Self {
        Self {
            name: name.into(),
            value,
            default: None,
        }
    }

    /// schema default as a canonical literal (see
    /// [`ArgValue::to_canonical_literal`]); an equal value is left out of
    /// the query
    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &ArgValue {
        &self.value
    }

    fn with_value(&self, value: ArgValue) -> Self {
        Self {
            name: self.name.clone(),
            value,
            default: self.default.clone(),
        }
    }

    fn render(&self) -> Result<Option<String>> {
        if matches!(self.value, ArgValue::Unset) {
            return Ok(None);
        }
        let unresolved =
            || Error::InvalidQuery(format!("argument `{}` was not resolved", self.name));
        if let Some(default) = &self.default {
            let canonical = self.value.to_canonical_literal().ok_or_else(unresolved)?;
            if *default == canonical {
                return Ok(None);
            }
        }
        let literal = self.value.to_literal().ok_or_else(unresolved)?;
        Ok(Some(format!("{}:{}", self.name, literal)))
    }
}

/// fixed sub-selection attached to a list-returning field
#[derive(Clone, Debug)]
struct FanOut {
    type_name: String,
    fields: Vec<String>,
}

/// one selected field in a chain
#[derive(Debug)]
pub struct Selection {
    type_name: String,
    field_name: String,
    args: Vec<Arg>,
    fan_out: Option<FanOut>,
    parent: Option<Arc<Selection>>,
}

impl Selection {
    /// graphql type declaring the field
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// sub-fields pre-selected on a list of objects
    pub fn fan_out(&self) -> &[String] {
        self.fan_out
            .as_ref()
            .map(|fan_out| fan_out.fields.as_slice())
            .unwrap_or_default()
    }

    /// graphql type of the elements selected by [`Selection::fan_out`]
    pub fn fan_out_type(&self) -> Option<&str> {
        self.fan_out
            .as_ref()
            .map(|fan_out| fan_out.type_name.as_str())
    }
}

/// selection chain plus the connection that executes it
#[derive(Clone)]
pub struct Context {
    connection: Connection,
    tail: Option<Arc<Selection>>,
}

impl Context {
    /// empty context at the query root
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            tail: None,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// empty context on the same connection
    pub fn root(&self) -> Self {
        Self::new(self.connection.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.tail.is_none()
    }

    /// new context with one more field selected
    pub fn select(&self, type_name: &str, field_name: &str, args: Vec<Arg>) -> Self {
        Self {
            connection: self.connection.clone(),
            tail: Some(Arc::new(Selection {
                type_name: type_name.to_string(),
                field_name: field_name.to_string(),
                args,
                fan_out: None,
                parent: self.tail.clone(),
            })),
        }
    }

    /// new context whose last selection selects `fields` of `type_name`
    /// instead of a single child. an empty context is returned unchanged.
    pub fn select_multiple(&self, type_name: &str, fields: &[&str]) -> Self {
        let Some(last) = &self.tail else {
            return self.clone();
        };
        Self {
            connection: self.connection.clone(),
            tail: Some(Arc::new(Selection {
                type_name: last.type_name.clone(),
                field_name: last.field_name.clone(),
                args: last.args.clone(),
                fan_out: Some(FanOut {
                    type_name: type_name.to_string(),
                    fields: fields.iter().map(|field| field.to_string()).collect(),
                }),
                parent: last.parent.clone(),
            })),
        }
    }

    /// selections from the root to the tail
    pub fn selections(&self) -> Vec<Arc<Selection>> {
        let mut selections = Vec::new();
        let mut next = self.tail.clone();
        while let Some(selection) = next {
            next = selection.parent.clone();
            selections.push(selection);
        }
        selections.reverse();
        selections
    }

    /// dotted field path, for diagnostics
    pub fn path(&self) -> String {
        self.selections()
            .iter()
            .map(|selection| selection.field_name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// resolve object arguments and render the query document
    pub async fn build_query(&self) -> Result<String> {
        let selections = self.non_empty_selections()?;
        let args = resolve_selections(&selections).await?;
        render_query(&selections, &args)
    }

    /// run the chain and convert the result
    ///
    /// fails with [`Error::InvalidQuery`] on an empty chain or when a
    /// non-nullable `T` gets a null response.
    pub async fn execute<T: FromResponse>(&self) -> Result<T> {
        let selections = self.non_empty_selections()?;
        let args = resolve_selections(&selections).await?;
        let query = render_query(&selections, &args)?;

        tracing::debug!(%query, "executing query");
        let response = self
            .connection
            .send(GraphQlRequest::new(query.clone()))
            .await?;
        if response.has_errors() {
            return Err(QueryError::new(response.errors, query).into());
        }

        unpack(response.data.unwrap_or(Value::Null), &selections, self)
    }

    fn non_empty_selections(&self) -> Result<Vec<Arc<Selection>>> {
        let selections = self.selections();
        if selections.is_empty() {
            return Err(Error::InvalidQuery(
                "cannot execute an empty selection".to_string(),
            ));
        }
        Ok(selections)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("path", &self.path())
            .finish_non_exhaustive()
    }
}

/// resolve every lazy argument in the chain, all at once
async fn resolve_selections(selections: &[Arc<Selection>]) -> Result<Vec<Vec<Arg>>> {
    let pending = selections
        .iter()
        .flat_map(|selection| selection.args.iter())
        .filter(|arg| arg.value.is_lazy())
        .count();
    if pending > 0 {
        tracing::debug!(pending, "resolving object arguments");
    }

    future::try_join_all(selections.iter().map(|selection| {
        future::try_join_all(
            selection
                .args
                .iter()
                .map(|arg| resolve(arg.value.clone()).map_ok(|value| arg.with_value(value))),
        )
    }))
    .await
}

fn resolve(value: ArgValue) -> BoxFuture<'static, Result<ArgValue>> {
    match value {
        ArgValue::Lazy(object) => async move {
            let query = object.context.select(&object.type_name, "id", Vec::new());
            let id: String = query.execute().await?;
            Ok::<_, Error>(ArgValue::Literal(Value::String(id)))
        }
        .boxed(),
        ArgValue::List(items) => future::try_join_all(items.into_iter().map(resolve))
            .map_ok(ArgValue::List)
            .boxed(),
        ArgValue::Object(fields) => future::try_join_all(
            fields
                .into_iter()
                .map(|(name, value)| resolve(value).map_ok(move |value| (name, value))),
        )
        .map_ok(ArgValue::Object)
        .boxed(),
        value => future::ready(Ok(value)).boxed(),
    }
}

/// fold the chain, tail first, into a single query document
fn render_query(selections: &[Arc<Selection>], args: &[Vec<Arg>]) -> Result<String> {
    let mut body = String::new();
    for (selection, args) in selections.iter().zip(args).rev() {
        let mut field = selection.field_name.clone();

        let mut rendered = Vec::new();
        for arg in args {
            if let Some(arg) = arg.render()? {
                rendered.push(arg);
            }
        }
        if !rendered.is_empty() {
            field.push('(');
            field.push_str(&rendered.join(","));
            field.push(')');
        }

        let mut children: Vec<&str> = selection.fan_out().iter().map(String::as_str).collect();
        if !body.is_empty() {
            children.push(&body);
        }
        if !children.is_empty() {
            field.push('{');
            field.push_str(&children.join(" "));
            field.push('}');
        }

        body = field;
    }
    Ok(format!("query{{{body}}}"))
}

/// walk the response along the selected field names
fn unpack<T: FromResponse>(data: Value, selections: &[Arc<Selection>], ctx: &Context) -> Result<T> {
    let mut value = data;
    for selection in selections {
        value = match value {
            Value::Object(mut fields) => fields.remove(&selection.field_name).unwrap_or(Value::Null),
            Value::Null => break,
            other => {
                return Err(Error::protocol(
                    format!(
                        "expected an object while reading `{}`",
                        selection.field_name
                    ),
                    other.to_string(),
                ))
            }
        };
    }

    if value.is_null() && !T::NULLABLE {
        return Err(Error::InvalidQuery(format!(
            "required field `{}` got a null response",
            ctx.path()
        )));
    }
    T::from_response(value, ctx)
}
