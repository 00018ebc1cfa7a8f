//! rust source rendering

use super::naming;
use super::schema::{FieldDef, InputValueDef, NamedType, Schema, TypeKind, TypeRef};
use super::CodegenError;
use std::collections::{BTreeMap, BTreeSet};

pub(crate) const HEADER: &str = "// Code generated by chainql-codegen. DO NOT EDIT.\n";

/// how an object field is exposed
enum FieldShape {
    /// scalar or enum, executes the chain
    Leaf,
    /// returns the id of its own type; executes, then keeps chaining
    ConvertId,
    /// list of objects, executes with a fixed fan-out of leaf fields
    ObjectList(String),
    /// single object, extends the chain
    Object(String),
}

pub(crate) struct Renderer<'a> {
    schema: &'a Schema,
    /// object types returned inside lists, with the fields selected per element
    fan_outs: BTreeMap<String, Vec<String>>,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(schema: &'a Schema) -> Result<Self, CodegenError> {
        schema.query_root()?;
        let mut renderer = Self {
            schema,
            fan_outs: BTreeMap::new(),
        };
        renderer.validate()?;
        renderer.fan_outs = renderer.collect_fan_outs();
        Ok(renderer)
    }

    fn validate(&self) -> Result<(), CodegenError> {
        for ty in self.schema.user_types() {
            for field in &ty.fields {
                if self.schema.kind_of(field.ty.named()).is_none() {
                    return Err(CodegenError::UnknownType {
                        type_name: field.ty.named().to_string(),
                        location: format!("{}.{}", ty.name, field.name),
                    });
                }
                for arg in &field.args {
                    self.validate_input(arg, &format!("{}.{}({})", ty.name, field.name, arg.name))?;
                }
            }
            for input in &ty.input_fields {
                self.validate_input(input, &format!("{}.{}", ty.name, input.name))?;
            }
        }
        Ok(())
    }

    fn validate_input(&self, value: &InputValueDef, location: &str) -> Result<(), CodegenError> {
        let name = value.ty.named();
        match self.schema.kind_of(name) {
            Some(TypeKind::Scalar | TypeKind::Enum | TypeKind::InputObject) => Ok(()),
            Some(kind) => Err(CodegenError::InvalidInput {
                type_name: name.to_string(),
                kind: kind.as_str(),
                location: location.to_string(),
            }),
            None => Err(CodegenError::UnknownType {
                type_name: name.to_string(),
                location: location.to_string(),
            }),
        }
    }

    fn collect_fan_outs(&self) -> BTreeMap<String, Vec<String>> {
        let mut listed = BTreeSet::new();
        for ty in self.schema.user_types() {
            for field in &ty.fields {
                if let Some(FieldShape::ObjectList(name)) = self.shape(ty, field) {
                    listed.insert(name);
                }
            }
        }

        listed
            .into_iter()
            .filter_map(|name| {
                let ty = self.schema.get(&name)?;
                let fields: Vec<String> = sorted_fields(ty)
                    .into_iter()
                    .filter(|field| self.is_prefetchable(ty, field))
                    .map(|field| field.name.clone())
                    .collect();
                Some((name, fields))
            })
            .collect()
    }

    /// plain leaf attributes that can ride along when the type is listed
    fn is_prefetchable(&self, owner: &NamedType, field: &FieldDef) -> bool {
        field.args.is_empty()
            && field.deprecation.is_none()
            && matches!(self.shape(owner, field), Some(FieldShape::Leaf))
    }

    /// whether an input object can derive `PartialEq`
    ///
    /// id fields, directly or through nested inputs, hold possibly
    /// unresolved objects, which have no equality.
    fn input_comparable(&self, name: &str, visiting: &mut BTreeSet<String>) -> bool {
        let Some(ty) = self.schema.get(name) else {
            return true;
        };
        if !visiting.insert(name.to_string()) {
            return true;
        }
        let comparable = ty.input_fields.iter().all(|field| {
            let named = field.ty.named();
            if self.schema.id_target(named).is_some() {
                return false;
            }
            match self.schema.kind_of(named) {
                Some(TypeKind::InputObject) => self.input_comparable(named, visiting),
                _ => true,
            }
        });
        visiting.remove(name);
        comparable
    }

    fn shape(&self, owner: &NamedType, field: &FieldDef) -> Option<FieldShape> {
        let named = field.ty.named();
        match self.schema.kind_of(named)? {
            TypeKind::Scalar | TypeKind::Enum => {
                let converts = field.name != "id"
                    && !field.ty.is_list()
                    && self.schema.id_target(named) == Some(owner.name.as_str());
                Some(if converts {
                    FieldShape::ConvertId
                } else {
                    FieldShape::Leaf
                })
            }
            TypeKind::Object if field.ty.is_list() => Some(FieldShape::ObjectList(named.to_string())),
            TypeKind::Object => Some(FieldShape::Object(named.to_string())),
            TypeKind::Union | TypeKind::Interface | TypeKind::InputObject => None,
        }
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(HEADER);

        let mut groups: BTreeMap<TypeKind, Vec<&NamedType>> = BTreeMap::new();
        for ty in self.schema.user_types() {
            groups.entry(ty.kind).or_default().push(ty);
        }

        for ty in groups.get(&TypeKind::Scalar).into_iter().flatten() {
            self.render_scalar(&mut out, ty);
        }
        for ty in groups.get(&TypeKind::Enum).into_iter().flatten() {
            self.render_enum(&mut out, ty);
        }
        for ty in groups.get(&TypeKind::InputObject).into_iter().flatten() {
            self.render_input(&mut out, ty);
        }
        for ty in groups.get(&TypeKind::Object).into_iter().flatten() {
            self.render_object(&mut out, ty);
        }

        out
    }

    fn rust_name(&self, graphql_name: &str) -> String {
        if graphql_name == self.schema.query_type {
            "Client".to_string()
        } else {
            naming::type_name(graphql_name)
        }
    }

    fn render_scalar(&self, out: &mut String, ty: &NamedType) {
        let name = self.rust_name(&ty.name);

        out.push('\n');
        push_docs(out, "", ty.description.as_deref());
        out.push_str("#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]\n");
        out.push_str("#[serde(transparent)]\n");
        out.push_str(&format!("pub struct {name}(pub String);\n\n"));

        out.push_str(&format!("impl {name} {{\n"));
        out.push_str("    pub fn as_str(&self) -> &str {\n");
        out.push_str("        &self.0\n");
        out.push_str("    }\n");
        out.push_str("}\n\n");

        out.push_str(&format!("impl From<String> for {name} {{\n"));
        out.push_str("    fn from(value: String) -> Self {\n");
        out.push_str("        Self(value)\n");
        out.push_str("    }\n");
        out.push_str("}\n\n");

        out.push_str(&format!("impl chainql::IntoArg for {name} {{\n"));
        out.push_str("    fn into_arg(self) -> chainql::ArgValue {\n");
        out.push_str("        chainql::IntoArg::into_arg(self.0)\n");
        out.push_str("    }\n");
        out.push_str("}\n\n");

        render_from_json(out, &name);

        if let Some(target) = self.schema.id_target(&ty.name) {
            let target = self.rust_name(target);
            out.push('\n');
            out.push_str(&format!("impl chainql::IntoId<{target}> for {name} {{\n"));
            out.push_str("    fn into_id(self) -> chainql::ArgValue {\n");
            out.push_str("        chainql::IntoArg::into_arg(self.0)\n");
            out.push_str("    }\n");
            out.push_str("}\n");
        }
    }

    fn render_enum(&self, out: &mut String, ty: &NamedType) {
        let name = self.rust_name(&ty.name);
        let mut values: Vec<_> = ty.enum_values.iter().collect();
        values.sort_by(|a, b| a.name.cmp(&b.name));

        out.push('\n');
        push_docs(out, "", ty.description.as_deref());
        out.push_str("#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]\n");
        out.push_str(&format!("pub enum {name} {{\n"));
        for value in &values {
            push_docs(out, "    ", value.description.as_deref());
            if let Some(reason) = &value.deprecation {
                push_docs(out, "    ", Some(&format!("deprecated: {}", naming::rewrite_backticks(reason))));
            }
            out.push_str(&format!("    #[serde(rename = \"{}\")]\n", value.name));
            out.push_str(&format!("    {},\n", naming::variant_name(&value.name)));
        }
        out.push_str("}\n\n");

        out.push_str(&format!("impl {name} {{\n"));
        out.push_str("    pub fn as_str(&self) -> &'static str {\n");
        out.push_str("        match self {\n");
        for value in &values {
            out.push_str(&format!(
                "            {name}::{} => \"{}\",\n",
                naming::variant_name(&value.name),
                value.name
            ));
        }
        out.push_str("        }\n");
        out.push_str("    }\n");
        out.push_str("}\n\n");

        out.push_str(&format!("impl chainql::IntoArg for {name} {{\n"));
        out.push_str("    fn into_arg(self) -> chainql::ArgValue {\n");
        out.push_str("        chainql::ArgValue::Enum(self.as_str().to_string())\n");
        out.push_str("    }\n");
        out.push_str("}\n\n");

        render_from_json(out, &name);
    }

    fn render_input(&self, out: &mut String, ty: &NamedType) {
        let name = self.rust_name(&ty.name);
        let mut fields: Vec<&InputValueDef> = ty.input_fields.iter().collect();
        fields.sort_by(|a, b| (!a.is_required(), &a.name).cmp(&(!b.is_required(), &b.name)));
        let all_optional = fields.iter().all(|field| !field.is_required());
        let comparable = self.input_comparable(&ty.name, &mut BTreeSet::new());

        let mut derives = vec!["Clone", "Debug"];
        if all_optional {
            derives.push("Default");
        }
        if comparable {
            derives.push("PartialEq");
        }

        out.push('\n');
        push_docs(out, "", ty.description.as_deref());
        out.push_str(&format!("#[derive({})]\n", derives.join(", ")));
        out.push_str(&format!("pub struct {name} {{\n"));
        for field in &fields {
            push_docs(out, "    ", field.description.as_deref());
            let rust_type = if field.is_required() {
                self.concrete_nonnull(&field.ty, true)
            } else {
                format!("Option<{}>", self.concrete_nonnull(field.ty.nullable(), true))
            };
            out.push_str(&format!(
                "    pub {}: {rust_type},\n",
                naming::field_name(&field.name)
            ));
        }
        out.push_str("}\n\n");

        out.push_str(&format!("impl chainql::IntoArg for {name} {{\n"));
        out.push_str("    fn into_arg(self) -> chainql::ArgValue {\n");
        out.push_str("        chainql::ArgValue::Object(vec![\n");
        for field in &fields {
            out.push_str(&format!(
                "            (\"{}\".to_string(), chainql::IntoArg::into_arg(self.{})),\n",
                field.name,
                naming::field_name(&field.name)
            ));
        }
        out.push_str("        ])\n");
        out.push_str("    }\n");
        out.push_str("}\n");
    }

    fn render_object(&self, out: &mut String, ty: &NamedType) {
        let name = self.rust_name(&ty.name);
        let prefetched = self
            .fan_outs
            .get(&ty.name)
            .is_some_and(|fields| !fields.is_empty());

        out.push('\n');
        push_docs(out, "", ty.description.as_deref());
        out.push_str("#[derive(Clone, Debug)]\n");
        out.push_str(&format!("pub struct {name} {{\n"));
        out.push_str("    ctx: chainql::Context,\n");
        if prefetched {
            out.push_str("    prefetched: Option<chainql::Prefetched>,\n");
        }
        out.push_str("}\n\n");

        out.push_str(&format!("impl chainql::ObjectType for {name} {{\n"));
        out.push_str(&format!("    const TYPE_NAME: &'static str = \"{}\";\n", ty.name));
        if let Some(loader) = self.schema.id_loader(&ty.name) {
            out.push_str(&format!(
                "    const ID_LOADER: Option<chainql::IdLoader> = Some(chainql::IdLoader {{\n        type_name: \"{}\",\n        field_name: \"{loader}\",\n    }});\n",
                self.schema.query_type
            ));
        }
        out.push('\n');
        if prefetched {
            out.push_str("    fn from_parts(ctx: chainql::Context, prefetched: Option<chainql::Prefetched>) -> Self {\n");
            out.push_str("        Self { ctx, prefetched }\n");
        } else {
            out.push_str("    fn from_parts(ctx: chainql::Context, _prefetched: Option<chainql::Prefetched>) -> Self {\n");
            out.push_str("        Self { ctx }\n");
        }
        out.push_str("    }\n\n");
        out.push_str("    fn context(&self) -> &chainql::Context {\n");
        out.push_str("        &self.ctx\n");
        out.push_str("    }\n");
        out.push_str("}\n\n");

        out.push_str(&format!("impl chainql::FromResponse for {name} {{\n"));
        out.push_str("    fn from_response(value: serde_json::Value, ctx: &chainql::Context) -> chainql::Result<Self> {\n");
        out.push_str("        chainql::object_from_response(value, ctx)\n");
        out.push_str("    }\n");
        out.push_str("}\n\n");

        let is_root = ty.name == self.schema.query_type;
        let self_chaining = ty.fields.iter().any(|field| {
            field.ty.is_non_null() && !field.ty.is_list() && field.ty.named() == ty.name
        });

        // helper methods keep their names; colliding fields get a `_` suffix
        let mut taken = BTreeSet::new();
        if is_root {
            taken.extend(["new".to_string(), "shared".to_string()]);
        }
        if self_chaining {
            taken.insert("with".to_string());
        }

        let mut selected = Vec::new();
        for field in sorted_fields(ty) {
            let Some(shape) = self.shape(ty, field) else {
                tracing::debug!(
                    type_name = %ty.name,
                    field = %field.name,
                    "skipping field returning an abstract type"
                );
                continue;
            };
            let method = claim_name(&mut taken, naming::field_name(&field.name));
            selected.push((field, shape, method));
        }

        let mut opts_structs = String::new();
        let mut methods = Vec::new();
        for (field, shape, method) in selected {
            let opts_method = field.args.iter().any(|arg| !arg.is_required()).then(|| {
                claim_name(&mut taken, format!("{}_opts", method.trim_end_matches('_')))
            });
            methods.push(self.render_field(
                &mut opts_structs,
                ty,
                field,
                shape,
                &method,
                opts_method.as_deref(),
            ));
        }

        out.push_str(&format!("impl {name} {{\n"));
        let mut first = true;
        let mut push_item = |out: &mut String, item: &str| {
            if !first {
                out.push('\n');
            }
            first = false;
            out.push_str(item);
        };

        if is_root {
            let mut item = String::new();
            item.push_str("    /// client over `connection`\n");
            item.push_str("    pub fn new(connection: chainql::Connection) -> Self {\n");
            item.push_str("        <Self as chainql::ObjectType>::from_context(chainql::Context::new(connection))\n");
            item.push_str("    }\n\n");
            item.push_str("    /// client over the process-wide shared connection\n");
            item.push_str("    pub fn shared() -> chainql::Result<Self> {\n");
            item.push_str("        Ok(Self::new(chainql::shared::connection()?))\n");
            item.push_str("    }\n");
            push_item(out, &item);
        }

        if self_chaining {
            let mut item = String::new();
            item.push_str("    /// apply `f` to this value, for reusable chain steps\n");
            item.push_str("    pub fn with<F: FnOnce(Self) -> Self>(self, f: F) -> Self {\n");
            item.push_str("        f(self)\n");
            item.push_str("    }\n");
            push_item(out, &item);
        }

        for method in &methods {
            push_item(out, method);
        }
        out.push_str("}\n");
        out.push_str(&opts_structs);
    }

    fn render_field(
        &self,
        opts_structs: &mut String,
        owner: &NamedType,
        field: &FieldDef,
        shape: FieldShape,
        method: &str,
        opts_method: Option<&str>,
    ) -> String {
        let owner_name = self.rust_name(&owner.name);
        let return_named = field.ty.named();

        let required: Vec<&InputValueDef> = field.args.iter().filter(|arg| arg.is_required()).collect();
        let mut optional: Vec<&InputValueDef> =
            field.args.iter().filter(|arg| !arg.is_required()).collect();
        optional.sort_by(|a, b| a.name.cmp(&b.name));
        let opts_name = format!("{owner_name}{}Opts", naming::pascal(&field.name));

        // `id` arguments loading the field's own type keep the literal id type
        let converts_id = |arg: &InputValueDef| {
            !(arg.name == "id" && self.schema.id_target(arg.ty.named()) == Some(return_named))
        };

        let mut params = Vec::new();
        let mut forward = Vec::new();
        let mut args = Vec::new();
        for arg in &required {
            let param = param_name(&arg.name);
            let id_ok = converts_id(arg);
            params.push(format!("{param}: {}", self.positional_type(&arg.ty, id_ok)));
            forward.push(param.clone());
            args.push(format!(
                "chainql::Arg::new(\"{}\", {})",
                arg.name,
                self.positional_conversion(&arg.ty, &param, id_ok)
            ));
        }
        for arg in &optional {
            let mut rendered = format!(
                "chainql::Arg::new(\"{}\", chainql::IntoArg::into_arg(opts.{}))",
                arg.name,
                naming::field_name(&arg.name)
            );
            if let Some(default) = &arg.default_value {
                rendered.push_str(&format!(".with_default({default:?})"));
            }
            args.push(rendered);
        }

        let args_expr = if args.is_empty() {
            "Vec::new()".to_string()
        } else {
            let mut expr = String::from("vec![\n");
            for arg in &args {
                expr.push_str(&format!("                {arg},\n"));
            }
            expr.push_str("            ]");
            expr
        };
        let select = format!(
            "self.ctx.select(\n            \"{}\",\n            \"{}\",\n            {args_expr},\n        )",
            owner.name, field.name
        );

        let (is_async, return_type, body) = match shape {
            FieldShape::Object(target) => {
                let target = self.rust_name(&target);
                let body = format!(
                    "        <{target} as chainql::ObjectType>::from_context({select})\n"
                );
                (false, target, body)
            }
            FieldShape::ObjectList(target) => {
                let fan_out = self
                    .fan_outs
                    .get(&target)
                    .filter(|fields| !fields.is_empty())
                    .map(|fields| {
                        fields
                            .iter()
                            .map(|field| format!("\"{field}\""))
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_else(|| "\"__typename\"".to_string());
                let body = format!(
                    "        {select}\n        .select_multiple(\"{target}\", &[{fan_out}])\n        .execute()\n        .await\n"
                );
                (true, self.output_type(&field.ty), body)
            }
            FieldShape::Leaf => {
                let rust_type = self.output_type(&field.ty);
                let mut body = String::new();
                let slotted = field.args.is_empty()
                    && self
                        .fan_outs
                        .get(&owner.name)
                        .is_some_and(|fields| fields.contains(&field.name));
                if slotted {
                    body.push_str(&format!(
                        "        if let Some(value) = self\n            .prefetched\n            .as_ref()\n            .and_then(|prefetched| prefetched.field::<{rust_type}>(\"{}\", &self.ctx))\n        {{\n            return value;\n        }}\n",
                        field.name
                    ));
                }
                body.push_str(&format!("        {select}\n        .execute()\n        .await\n"));
                (true, rust_type, body)
            }
            FieldShape::ConvertId => {
                let id_type = self.output_type(&field.ty);
                let loader = self.schema.id_loader(&owner.name);
                let binding = if loader.is_some() { "id" } else { "_id" };
                let mut body = format!(
                    "        let {binding}: {id_type} = {select}\n        .execute()\n        .await?;\n"
                );
                match loader {
                    Some(loader) => {
                        let reload = format!(
                            "<{owner_name} as chainql::ObjectType>::from_context(self.ctx.root().select(\n            \"{}\",\n            \"{loader}\",\n            vec![chainql::Arg::new(\"id\", chainql::IntoArg::into_arg(id))],\n        ))",
                            self.schema.query_type
                        );
                        if field.ty.is_non_null() {
                            body.push_str(&format!("        Ok({reload})\n"));
                        } else {
                            body.push_str("        Ok(match id {\n");
                            body.push_str(&format!("            Some(id) => {reload},\n"));
                            body.push_str("            None => self.clone(),\n");
                            body.push_str("        })\n");
                        }
                    }
                    None => body.push_str("        Ok(self.clone())\n"),
                }
                (true, owner_name.clone(), body)
            }
        };

        let asyncness = if is_async { "async " } else { "" };
        let awaiting = if is_async { ".await" } else { "" };
        let return_sig = if is_async {
            format!("chainql::Result<{return_type}>")
        } else {
            return_type
        };
        let deprecated = field
            .deprecation
            .as_ref()
            .map(|reason| format!("    #[deprecated(note = {:?})]\n", naming::rewrite_backticks(reason)));

        let mut out = String::new();
        let param_list = |extra: Option<String>| {
            let mut all = vec!["&self".to_string()];
            all.extend(params.iter().cloned());
            all.extend(extra);
            all.join(", ")
        };

        let Some(opts_method) = opts_method else {
            push_docs(&mut out, "    ", field.description.as_deref());
            if let Some(deprecated) = &deprecated {
                out.push_str(deprecated);
            }
            out.push_str(&format!(
                "    pub {asyncness}fn {method}({}) -> {return_sig} {{\n{body}    }}\n",
                param_list(None)
            ));
            return out;
        };

        push_docs(&mut out, "    ", field.description.as_deref());
        if let Some(deprecated) = &deprecated {
            out.push_str(deprecated);
            out.push_str("    #[allow(deprecated)]\n");
        }
        forward.push(format!("{opts_name}::default()"));
        out.push_str(&format!(
            "    pub {asyncness}fn {method}({}) -> {return_sig} {{\n        self.{opts_method}({}){awaiting}\n    }}\n\n",
            param_list(None),
            forward.join(", ")
        ));
        out.push_str(&format!(
            "    /// [`{owner_name}::{method}`] with optional arguments\n"
        ));
        if let Some(deprecated) = &deprecated {
            out.push_str(deprecated);
        }
        out.push_str(&format!(
            "    pub {asyncness}fn {opts_method}({}) -> {return_sig} {{\n{body}    }}\n",
            param_list(Some(format!("opts: {opts_name}")))
        ));

        opts_structs.push('\n');
        opts_structs.push_str(&format!(
            "/// optional arguments for [`{owner_name}::{opts_method}`]\n"
        ));
        opts_structs.push_str("#[derive(Clone, Debug, Default)]\n");
        opts_structs.push_str(&format!("pub struct {opts_name} {{\n"));
        for arg in &optional {
            push_docs(opts_structs, "    ", arg.description.as_deref());
            opts_structs.push_str(&format!(
                "    pub {}: Option<{}>,\n",
                naming::field_name(&arg.name),
                self.concrete_nonnull(arg.ty.nullable(), converts_id(arg))
            ));
        }
        opts_structs.push_str("}\n");

        out
    }

    fn named_type(&self, name: &str) -> String {
        match name {
            "String" | "ID" => "String".to_string(),
            "Int" => "i64".to_string(),
            "Float" => "f64".to_string(),
            "Boolean" => "bool".to_string(),
            other => self.rust_name(other),
        }
    }

    fn output_type(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::NonNull(inner) => self.output_type_nonnull(inner),
            other => format!("Option<{}>", self.output_type_nonnull(other)),
        }
    }

    fn output_type_nonnull(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::NonNull(inner) => self.output_type_nonnull(inner),
            TypeRef::List(inner) => format!("Vec<{}>", self.output_type(inner)),
            TypeRef::Named(name) => self.named_type(name),
        }
    }

    /// id scalar target as a rust type, if ids should be accepted lazily
    fn id_object(&self, name: &str, id_ok: bool) -> Option<String> {
        if !id_ok {
            return None;
        }
        self.schema.id_target(name).map(|target| self.rust_name(target))
    }

    /// owned type for struct fields and nullable list elements
    fn concrete(&self, ty: &TypeRef, id_ok: bool) -> String {
        match ty {
            TypeRef::NonNull(inner) => self.concrete_nonnull(inner, id_ok),
            other => format!("Option<{}>", self.concrete_nonnull(other, id_ok)),
        }
    }

    fn concrete_nonnull(&self, ty: &TypeRef, id_ok: bool) -> String {
        match ty {
            TypeRef::NonNull(inner) => self.concrete_nonnull(inner, id_ok),
            TypeRef::List(inner) => format!("Vec<{}>", self.concrete(inner, id_ok)),
            TypeRef::Named(name) => match self.id_object(name, id_ok) {
                Some(target) => format!("chainql::IdArg<{target}>"),
                None => self.named_type(name),
            },
        }
    }

    /// parameter type for a required argument
    fn positional_type(&self, ty: &TypeRef, id_ok: bool) -> String {
        match ty {
            TypeRef::NonNull(inner) => self.positional_type(inner, id_ok),
            TypeRef::List(inner) if inner.is_non_null() => format!(
                "impl IntoIterator<Item = {}>",
                self.positional_type(inner, id_ok)
            ),
            TypeRef::List(inner) => format!(
                "impl IntoIterator<Item = {}>",
                self.concrete(inner, id_ok)
            ),
            TypeRef::Named(name) => match (name.as_str(), self.id_object(name, id_ok)) {
                (_, Some(target)) => format!("impl chainql::IntoId<{target}>"),
                ("String" | "ID", None) => "impl Into<String>".to_string(),
                (other, None) => self.named_type(other),
            },
        }
    }

    /// expression converting parameter `var` into an argument value
    fn positional_conversion(&self, ty: &TypeRef, var: &str, id_ok: bool) -> String {
        match ty {
            TypeRef::NonNull(inner) => self.positional_conversion(inner, var, id_ok),
            TypeRef::List(inner) if inner.is_non_null() => format!(
                "chainql::ArgValue::List({var}.into_iter().map(|item| {}).collect())",
                self.positional_conversion(inner, "item", id_ok)
            ),
            TypeRef::List(_) => format!(
                "chainql::ArgValue::List({var}.into_iter().map(chainql::IntoArg::into_arg).collect())"
            ),
            TypeRef::Named(name) => match (name.as_str(), self.id_object(name, id_ok)) {
                (_, Some(target)) => format!("chainql::IntoId::<{target}>::into_id({var})"),
                ("String" | "ID", None) => {
                    format!("chainql::IntoArg::into_arg(Into::<String>::into({var}))")
                }
                (_, None) => format!("chainql::IntoArg::into_arg({var})"),
            },
        }
    }
}

fn sorted_fields(ty: &NamedType) -> Vec<&FieldDef> {
    let mut fields: Vec<&FieldDef> = ty.fields.iter().collect();
    fields.sort_by(|a, b| a.name.cmp(&b.name));
    fields
}

/// `name`, or `name` with `_` appended until it is not taken yet
fn claim_name(taken: &mut BTreeSet<String>, name: String) -> String {
    let mut name = name;
    while !taken.insert(name.clone()) {
        name.push('_');
    }
    name
}

fn param_name(name: &str) -> String {
    let param = naming::field_name(name);
    if param == "opts" {
        "opts_".to_string()
    } else {
        param
    }
}

fn render_from_json(out: &mut String, name: &str) {
    out.push_str(&format!("impl chainql::FromResponse for {name} {{\n"));
    out.push_str("    fn from_response(value: serde_json::Value, _ctx: &chainql::Context) -> chainql::Result<Self> {\n");
    out.push_str("        chainql::from_json(value)\n");
    out.push_str("    }\n");
    out.push_str("}\n");
}

/// schema description as `///` lines
///
/// leading indentation is dropped so nothing renders as a code block, and
/// bare fences are marked as text so they never become doctests.
fn push_docs(out: &mut String, indent: &str, text: Option<&str>) {
    let Some(text) = text.map(str::trim).filter(|text| !text.is_empty()) else {
        return;
    };
    let mut in_fence = false;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            out.push_str(&format!("{indent}///\n"));
            continue;
        }
        if let Some(info) = line.strip_prefix("```") {
            let line = if !in_fence && info.trim().is_empty() {
                "```text"
            } else {
                line
            };
            in_fence = !in_fence;
            out.push_str(&format!("{indent}/// {line}\n"));
            continue;
        }
        out.push_str(&format!("{indent}/// {line}\n"));
    }
}
