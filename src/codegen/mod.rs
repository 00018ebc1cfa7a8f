//! typed client generator
//!
//! turns a graphql schema into one rust module:
//! - a `#[serde(transparent)]` newtype per custom scalar
//! - an enum per schema enum
//! - a struct per input object
//! - a chainable struct per object type, the query root rendered as `Client`
//!
//! the output carries no inner attributes so it can be `include!`d from a
//! build script.

pub mod naming;
mod render;
pub mod schema;

pub use schema::{
    EnumValueDef, FieldDef, InputValueDef, NamedType, Schema, TypeKind, TypeRef, BUILTIN_SCALARS,
};

use thiserror::Error;

/// errors raised while loading a schema or generating a client
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("failed to parse schema: {0}")]
    Parse(String),
    #[error("invalid introspection result: {0}")]
    Introspection(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("schema has no query type `{0}`")]
    MissingQueryType(String),
    #[error("{kind} `{type_name}` cannot be used as an input ({location})")]
    InvalidInput {
        type_name: String,
        kind: &'static str,
        location: String,
    },
    #[error("unknown type `{type_name}` ({location})")]
    UnknownType { type_name: String, location: String },
}

/// render the client module for `schema`
pub fn generate(schema: &Schema) -> Result<String, CodegenError> {
    Ok(render::Renderer::new(schema)?.render())
}

/// parse sdl or introspection json and render the client module
pub fn generate_from_str(text: &str) -> Result<String, CodegenError> {
    generate(&Schema::parse(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        type Query {
          container(id: ContainerID): Container!
          directory(id: DirectoryID): Directory!
          loadContainerFromID(id: ContainerID!): Container!
          version: String!
          node: Node
        }

        "An OCI container."
        type Container {
          id: ContainerID!
          from(address: String!): Container!
          withExec(args: [String!]!, skipEntrypoint: Boolean = false, redirectStdout: String): Container!
          withDirectory(path: String!, directory: DirectoryID!, exclude: [String!]): Container!
          withExposedPort(port: Int!, protocol: NetworkProtocol = TCP): Container!
          exposedPorts: [Port!]!
          stdout: String!
          sync: ContainerID!
          exitCode: Int @deprecated(reason: "Use `withExec` and `stdout` instead.")
          rootfs: Directory!
        }

        type Directory {
          id: DirectoryID!
          entries(path: String): [String!]!
          sync: DirectoryID!
        }

        type Port {
          port: Int!
          protocol: NetworkProtocol!
          description: String
          sync: PortID!
        }

        interface Node { id: ID! }

        enum NetworkProtocol { UDP TCP }
        input BuildArg { value: String!, name: String!, note: String }
        input MountSpec { path: String!, source: DirectoryID!, cache: CacheSpec }
        input CacheSpec { volume: String! }
        scalar ContainerID
        scalar DirectoryID
        scalar PortID
        scalar Platform
    "#;

    fn generated() -> String {
        generate_from_str(SCHEMA).unwrap()
    }

    #[test]
    fn test_header_and_no_inner_attributes() {
        let out = generated();
        assert!(out.starts_with("// Code generated by chainql-codegen. DO NOT EDIT.\n"));
        assert!(!out.contains("#!["));
    }

    #[test]
    fn test_types_grouped_by_kind_then_name() {
        let out = generated();
        let positions: Vec<usize> = [
            "pub struct ContainerId(",
            "pub struct DirectoryId(",
            "pub struct Platform(",
            "pub enum NetworkProtocol",
            "pub struct BuildArg",
            "pub struct Container {",
            "pub struct Directory {",
            "pub struct Port {",
            // the query root sorts under its schema name
            "pub struct Client {",
        ]
        .iter()
        .map(|needle| out.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
        .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_enum_values_sorted_and_renamed() {
        let out = generated();
        let tcp = out.find("#[serde(rename = \"TCP\")]").unwrap();
        let udp = out.find("#[serde(rename = \"UDP\")]").unwrap();
        assert!(tcp < udp);
        assert!(out.contains("NetworkProtocol::Tcp => \"TCP\","));
    }

    #[test]
    fn test_input_fields_required_first() {
        let out = generated();
        let name = out.find("    pub name: String,").unwrap();
        let value = out.find("    pub value: String,").unwrap();
        let note = out.find("    pub note: Option<String>,").unwrap();
        assert!(name < value && value < note);
        assert!(out.contains("(\"note\".to_string(), chainql::IntoArg::into_arg(self.note)),"));
    }

    #[test]
    fn test_id_scalars_accept_objects() {
        let out = generated();
        assert!(out.contains("impl chainql::IntoId<Container> for ContainerId {"));
        assert!(!out.contains("impl chainql::IntoId<Platform>"));
        assert!(out.contains("directory: impl chainql::IntoId<Directory>"));
        assert!(out.contains("chainql::IntoId::<Directory>::into_id(directory)"));
        // loading by id keeps the literal id type
        assert!(out.contains("pub id: Option<ContainerId>,"));
    }

    #[test]
    fn test_input_id_fields_accept_objects() {
        let out = generated();
        assert!(out.contains("    pub source: chainql::IdArg<Directory>,"));
        assert!(out.contains("#[derive(Clone, Debug)]\npub struct MountSpec {"));
        assert!(out.contains("#[derive(Clone, Debug, PartialEq)]\npub struct BuildArg {"));
        assert!(out.contains("#[derive(Clone, Debug, PartialEq)]\npub struct CacheSpec {"));
    }

    #[test]
    fn test_colliding_method_names_get_suffix() {
        let schema = r#"
            type Query {
              new: String!
              shared(flag: Boolean): String!
              item(limit: Int): Item!
              itemOpts: String!
            }
            type Item {
              with: String!
              next: Item!
            }
        "#;
        let out = generate_from_str(schema).unwrap();
        assert!(out.contains("pub fn new(connection: chainql::Connection) -> Self {"));
        assert!(out.contains("pub fn shared() -> chainql::Result<Self> {"));
        assert!(out.contains("pub async fn new_(&self) -> chainql::Result<String> {"));
        assert!(out.contains("pub async fn shared_(&self) -> chainql::Result<String> {"));
        assert!(out.contains("pub async fn shared_opts(&self, opts: ClientSharedOpts)"));
        assert!(out.contains("pub async fn item_opts(&self) -> chainql::Result<String> {"));
        assert!(out.contains("pub fn item_opts_(&self, opts: ClientItemOpts) -> Item {"));
        assert!(out.contains("self.item_opts_(ClientItemOpts::default())"));
        assert!(out.contains("pub fn with<F: FnOnce(Self) -> Self>(self, f: F) -> Self {"));
        assert!(out.contains("pub async fn with_(&self) -> chainql::Result<String> {"));
    }

    #[test]
    fn test_optional_arguments_use_opts_struct() {
        let out = generated();
        assert!(out.contains(
            "pub fn with_exec(&self, args: impl IntoIterator<Item = impl Into<String>>) -> Container {"
        ));
        assert!(out.contains("self.with_exec_opts(args, ContainerWithExecOpts::default())"));
        assert!(out.contains("pub struct ContainerWithExecOpts {"));
        assert!(out.contains("    pub redirect_stdout: Option<String>,"));
        assert!(out.contains("    pub skip_entrypoint: Option<bool>,"));
        assert!(out.contains(".with_default(\"false\")"));
        assert!(out.contains(".with_default(\"TCP\")"));
        assert!(out.contains("pub protocol: Option<NetworkProtocol>,"));
    }

    #[test]
    fn test_leaf_and_builder_methods() {
        let out = generated();
        assert!(out.contains("pub fn from(&self, address: impl Into<String>) -> Container {"));
        assert!(out.contains("pub async fn stdout(&self) -> chainql::Result<String> {"));
        assert!(out.contains("pub async fn version(&self) -> chainql::Result<String> {"));
        assert!(out.contains("pub fn rootfs(&self) -> Directory {"));
        assert!(out.contains("pub fn with<F: FnOnce(Self) -> Self>(self, f: F) -> Self {"));
        // fields returning abstract types are skipped
        assert!(!out.contains("fn node("));
    }

    #[test]
    fn test_sync_converts_back_to_object() {
        let out = generated();
        assert!(out.contains("pub async fn sync(&self) -> chainql::Result<Container> {"));
        assert!(out.contains("\"loadContainerFromID\""));
        // no loader: execute for the side effect and keep the chain
        assert!(out.contains("pub async fn sync(&self) -> chainql::Result<Directory> {"));
        assert!(out.contains("let _id: DirectoryId ="));
    }

    #[test]
    fn test_object_lists_fan_out() {
        let out = generated();
        assert!(out.contains("pub async fn exposed_ports(&self) -> chainql::Result<Vec<Port>> {"));
        assert!(out.contains(".select_multiple(\"Port\", &[\"description\", \"port\", \"protocol\"])"));
        assert!(out.contains("prefetched: Option<chainql::Prefetched>,"));
        assert!(out.contains("prefetched.field::<i64>(\"port\", &self.ctx)"));
        assert!(out.contains("prefetched.field::<Option<String>>(\"description\", &self.ctx)"));
    }

    #[test]
    fn test_deprecated_note_uses_rust_names() {
        let out = generated();
        assert!(out.contains(
            "#[deprecated(note = \"Use `with_exec` and `stdout` instead.\")]"
        ));
    }

    #[test]
    fn test_client_root() {
        let out = generated();
        assert!(out.contains("pub fn new(connection: chainql::Connection) -> Self {"));
        assert!(out.contains("pub fn shared() -> chainql::Result<Self> {"));
        assert!(out.contains("const TYPE_NAME: &'static str = \"Query\";"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(generated(), generated());
    }

    #[test]
    fn test_union_in_input_position_is_rejected() {
        let schema = r#"
            type Query { search(filter: Filter): String }
            type A { a: String }
            type B { b: String }
            union Filter = A | B
        "#;
        let err = generate_from_str(schema).unwrap_err();
        assert!(matches!(
            err,
            CodegenError::InvalidInput { ref type_name, kind: "union", .. } if type_name == "Filter"
        ));
    }

    #[test]
    fn test_unknown_and_missing_types() {
        let err = generate_from_str("type Query { a: Missing }").unwrap_err();
        assert!(matches!(err, CodegenError::UnknownType { .. }));

        let err = generate_from_str("type Other { a: String }").unwrap_err();
        assert!(matches!(err, CodegenError::MissingQueryType(_)));
    }
}
