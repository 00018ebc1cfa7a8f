use chainql::transport::from_fn;
use chainql::{
    Connection, Error, FromResponse, GraphQlRequest, GraphQlResponse, IdArg, IntoArg, ObjectType,
};
use chainql_test_client::*;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// connection answering each query with `handler(query)`, recording queries
fn backend<F>(handler: F) -> (Connection, Arc<Mutex<Vec<String>>>)
where
    F: Fn(&str) -> Value + Send + Sync + 'static,
{
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let connection = Connection::with_transport(from_fn(move |request: GraphQlRequest| {
        log.lock().unwrap().push(request.query.clone());
        let data = handler(&request.query);
        async move { Ok(GraphQlResponse::from_data(data)) }
    }));
    (connection, seen)
}

fn errors(body: Value) -> Connection {
    Connection::with_transport(from_fn(move |_request| {
        let body = body.clone();
        async move {
            let response: GraphQlResponse<Value> = serde_json::from_value(body).unwrap();
            Ok(response)
        }
    }))
}

async fn query_of<O: ObjectType>(object: &O) -> String {
    object.context().build_query().await.unwrap()
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_chain_executes_as_one_nested_query() {
    let (connection, seen) = backend(|_| {
        json!({"container": {"from": {"withExec": {"stdout": "hi\n"}}}})
    });
    let client = Client::new(connection);

    let stdout = client
        .container()
        .from("alpine")
        .with_exec(["echo", "hi"])
        .stdout()
        .await
        .unwrap();

    assert_eq!(stdout, "hi\n");
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["query{container{from(address:\"alpine\"){withExec(args:[\"echo\",\"hi\"]){stdout}}}}"]
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_sync_executes_and_keeps_chaining() {
    let (connection, seen) = backend(|query| {
        if query.starts_with("query{loadContainerFromID") {
            json!({"loadContainerFromID": {"stdout": "done"}})
        } else {
            json!({"container": {"from": {"sync": "ctr-1"}}})
        }
    });
    let client = Client::new(connection);

    let synced: Container = client.container().from("alpine").sync().await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(
        query_of(&synced).await,
        "query{loadContainerFromID(id:\"ctr-1\")}"
    );

    assert_eq!(synced.stdout().await.unwrap(), "done");
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        [
            "query{container{from(address:\"alpine\"){sync}}}",
            "query{loadContainerFromID(id:\"ctr-1\"){stdout}}",
        ]
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_sync_surfaces_exec_errors() {
    let client = Client::new(errors(json!({
        "errors": [{
            "message": "boom",
            "extensions": {
                "_type": "EXEC_ERROR",
                "cmd": ["false"],
                "exitCode": 1,
                "stdout": "",
                "stderr": "boom"
            }
        }]
    })));

    let err = client
        .container()
        .from("alpine")
        .with_exec(["false"])
        .sync()
        .await
        .unwrap_err();

    let query_err = err.as_query_error().expect("query error");
    let exec = query_err.exec().expect("exec error");
    assert_eq!(exec.exit_code, 1);
    assert_eq!(exec.stderr, "boom");
    assert!(query_err.query.contains("withExec(args:[\"false\"])"));
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_required_leaf_null_is_an_error() {
    let (connection, _) = backend(|_| json!({"container": {"stdout": null}}));
    let client = Client::new(connection);

    let err = client.container().stdout().await.unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(msg) if msg.contains("null response")));
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_nullable_leaf_null_is_none() {
    let (connection, seen) = backend(|_| json!({"container": {"label": null}}));
    let client = Client::new(connection);

    let label = client.container().label("com.example.owner").await.unwrap();
    assert_eq!(label, None);
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["query{container{label(name:\"com.example.owner\")}}"]
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_forks_do_not_affect_each_other() {
    let (connection, _) = backend(|_| json!({}));
    let client = Client::new(connection);

    let base = client.container().from("alpine");
    let echo = base.with_exec(["echo", "a"]);
    let env = base.with_env_variable("A", "1");

    assert_eq!(
        query_of(&base).await,
        "query{container{from(address:\"alpine\")}}"
    );
    assert_eq!(
        query_of(&echo).await,
        "query{container{from(address:\"alpine\"){withExec(args:[\"echo\",\"a\"])}}}"
    );
    assert_eq!(
        query_of(&env).await,
        "query{container{from(address:\"alpine\"){withEnvVariable(name:\"A\",value:\"1\")}}}"
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_with_applies_reusable_steps() {
    let (connection, _) = backend(|_| json!({}));
    let client = Client::new(connection);
    let with_env = |container: Container| container.with_env_variable("CI", "true");

    let container = client.container().with(with_env);
    assert_eq!(
        query_of(&container).await,
        "query{container{withEnvVariable(name:\"CI\",value:\"true\")}}"
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_default_arguments_are_omitted() {
    let (connection, _) = backend(|_| json!({}));
    let client = Client::new(connection);
    let container = client.container();

    let tcp = container.with_exposed_port_opts(
        8080,
        ContainerWithExposedPortOpts {
            protocol: Some(NetworkProtocol::Tcp),
            ..Default::default()
        },
    );
    assert_eq!(
        query_of(&tcp).await,
        query_of(&container.with_exposed_port(8080)).await
    );
    assert_eq!(
        query_of(&tcp).await,
        "query{container{withExposedPort(port:8080)}}"
    );

    let udp = container.with_exposed_port_opts(
        53,
        ContainerWithExposedPortOpts {
            protocol: Some(NetworkProtocol::Udp),
            description: Some("dns".to_string()),
        },
    );
    assert_eq!(
        query_of(&udp).await,
        "query{container{withExposedPort(port:53,description:\"dns\",protocol:UDP)}}"
    );

    let skip = container.with_exec_opts(
        ["true"],
        ContainerWithExecOpts {
            skip_entrypoint: Some(false),
            ..Default::default()
        },
    );
    assert_eq!(
        query_of(&skip).await,
        "query{container{withExec(args:[\"true\"])}}"
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_scalars_and_enums_convert_both_ways() {
    let (connection, seen) = backend(|query| {
        if query == "query{container{platform}}" {
            json!({"container": {"platform": "linux/arm64"}})
        } else {
            json!({"container": {"exposedPorts": [
                {"id": "port-1", "port": 53, "protocol": "UDP", "description": null}
            ]}})
        }
    });
    let client = Client::new(connection);

    let platform = client.container().platform().await.unwrap();
    assert_eq!(platform, Platform("linux/arm64".to_string()));

    let pinned = client.container_opts(ClientContainerOpts {
        platform: Some(platform.clone()),
        ..Default::default()
    });
    assert_eq!(
        query_of(&pinned).await,
        "query{container(platform:\"linux/arm64\")}"
    );

    let ports = client.container().exposed_ports().await.unwrap();
    assert_eq!(ports[0].protocol().await.unwrap(), NetworkProtocol::Udp);
    assert_eq!(NetworkProtocol::Udp.as_str(), "UDP");
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_object_lists_prefetch_leaf_fields() {
    let (connection, seen) = backend(|query| {
        if query.starts_with("query{container{exposedPorts") {
            json!({"container": {"exposedPorts": [
                {"id": "port-1", "port": 80, "protocol": "TCP", "description": "http"},
                {"id": "port-2", "port": 53, "protocol": "UDP", "description": null}
            ]}})
        } else {
            json!({"container": {"envVariables": [
                {"name": "PATH", "value": "/bin"}
            ]}})
        }
    });
    let client = Client::new(connection);

    let ports = client.container().exposed_ports().await.unwrap();
    assert_eq!(ports.len(), 2);
    assert_eq!(ports[0].port().await.unwrap(), 80);
    assert_eq!(ports[0].description().await.unwrap().as_deref(), Some("http"));
    assert_eq!(ports[1].description().await.unwrap(), None);
    assert_eq!(
        query_of(&ports[1]).await,
        "query{loadPortFromID(id:\"port-2\")}"
    );

    let vars = client.container().env_variables().await.unwrap();
    assert_eq!(vars[0].name().await.unwrap(), "PATH");
    assert_eq!(vars[0].value().await.unwrap(), "/bin");

    assert_eq!(
        seen.lock().unwrap().as_slice(),
        [
            "query{container{exposedPorts{description id port protocol}}}",
            "query{container{envVariables{name value}}}",
        ]
    );
}

fn directory_backend(query: &str) -> Value {
    if let Some(rest) = query.strip_prefix("query{host{directory(path:\"") {
        let path = rest.split('"').next().unwrap_or_default();
        return json!({"host": {"directory": {"id": format!("dir-{path}")}}});
    }
    json!({})
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_object_arguments_resolve_to_ids() {
    let (connection, seen) = backend(directory_backend);
    let client = Client::new(connection);
    let src = client.host().directory("src");

    let lazy = client.container().with_directory("/src", &src);
    let concrete = client
        .container()
        .with_directory("/src", DirectoryId("dir-src".to_string()));

    assert_eq!(query_of(&lazy).await, query_of(&concrete).await);
    assert_eq!(
        query_of(&concrete).await,
        "query{container{withDirectory(path:\"/src\",directory:\"dir-src\")}}"
    );
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["query{host{directory(path:\"src\"){id}}}"]
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_input_objects_and_list_defaults() {
    let (connection, _) = backend(directory_backend);
    let client = Client::new(connection);
    let context = client.host().directory("app");

    let plain = client.container().build(&context);
    assert_eq!(
        query_of(&plain).await,
        "query{container{build(context:\"dir-app\")}}"
    );

    let empty = client.container().build_opts(
        &context,
        ContainerBuildOpts {
            build_args: Some(Vec::new()),
        },
    );
    assert_eq!(query_of(&empty).await, query_of(&plain).await);

    let with_args = client.container().build_opts(
        &context,
        ContainerBuildOpts {
            build_args: Some(vec![BuildArg {
                name: "VERSION".to_string(),
                value: "1.2".to_string(),
            }]),
        },
    );
    assert_eq!(
        query_of(&with_args).await,
        "query{container{build(context:\"dir-app\",buildArgs:[{name:\"VERSION\",value:\"1.2\"}])}}"
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_object_arguments_resolve_concurrently() {
    let delay = Duration::from_millis(200);
    let connection = Connection::with_transport(from_fn(move |request: GraphQlRequest| async move {
        let data = directory_backend(&request.query);
        if data != json!({}) {
            tokio::time::sleep(delay).await;
            return Ok(GraphQlResponse::from_data(data));
        }
        Ok(GraphQlResponse::from_data(json!({
            "container": {"withDirectory": {"withDirectory": {"build": {"withDirectory": {"stdout": "ok"}}}}}
        })))
    }));
    let client = Client::new(connection);
    let host = client.host();

    let started = Instant::now();
    let stdout = client
        .container()
        .with_directory("/a", host.directory("a"))
        .with_directory("/b", host.directory("b"))
        .build(host.directory("c"))
        .with_directory("/d", host.directory("d"))
        .stdout()
        .await
        .unwrap();

    assert_eq!(stdout, "ok");
    assert!(
        started.elapsed() < delay * 3,
        "resolution took {:?}",
        started.elapsed()
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_loading_by_id_keeps_literal_type() {
    let (connection, _) = backend(|_| json!({}));
    let client = Client::new(connection);

    let loaded = client.load_container_from_id(ContainerId("ctr-9".to_string()));
    assert_eq!(
        query_of(&loaded).await,
        "query{loadContainerFromID(id:\"ctr-9\")}"
    );

    let by_id = client.container_opts(ClientContainerOpts {
        id: Some(ContainerId("ctr-9".to_string())),
        ..Default::default()
    });
    assert_eq!(query_of(&by_id).await, "query{container(id:\"ctr-9\")}");
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
#[allow(deprecated)]
async fn test_deprecated_fields_still_work() {
    let (connection, _) = backend(|_| json!({"container": {"exitCode": 0}}));
    let client = Client::new(connection);
    assert_eq!(client.container().exit_code().await.unwrap(), Some(0));
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_input_objects_accept_unexecuted_objects() {
    let (connection, seen) = backend(directory_backend);
    let client = Client::new(connection);
    let src = client.host().directory("src");

    let mounted = client.container().with_mounts([MountSpec {
        path: "/src".to_string(),
        source: IdArg::new(&src),
    }]);
    assert_eq!(
        query_of(&mounted).await,
        "query{container{withMounts(mounts:[{path:\"/src\",source:\"dir-src\"}])}}"
    );
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["query{host{directory(path:\"src\"){id}}}"]
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_input_object_and_float_defaults_are_omitted() {
    let (connection, _) = backend(|_| json!({}));
    let client = Client::new(connection);
    let container = client.container();

    let defaults = container.with_resources_opts(ContainerWithResourcesOpts {
        cpu_share: Some(1.0),
        limits: Some(ResourceLimits {
            memory: "1g".to_string(),
            cpus: Some(2.0),
        }),
    });
    assert_eq!(
        query_of(&defaults).await,
        "query{container{withResources}}"
    );
    assert_eq!(
        query_of(&defaults).await,
        query_of(&container.with_resources()).await
    );

    let custom = container.with_resources_opts(ContainerWithResourcesOpts {
        cpu_share: Some(0.5),
        limits: Some(ResourceLimits {
            memory: "2g".to_string(),
            cpus: None,
        }),
    });
    assert_eq!(
        query_of(&custom).await,
        "query{container{withResources(cpuShare:0.5,limits:{memory:\"2g\"})}}"
    );
}

/// argument literal read back as a response value
fn round_trip<T: IntoArg + FromResponse + Clone>(client: &Client, value: &T) -> T {
    let literal = value.clone().into_arg().to_literal().unwrap();
    let wire: Value = serde_json::from_str(&literal).unwrap();
    T::from_response(wire, client.context()).unwrap()
}

#[test]
fn test_generated_scalars_round_trip() {
    let (connection, _) = backend(|_| json!({}));
    let client = Client::new(connection);

    let platform = Platform("linux/arm64".to_string());
    assert_eq!(round_trip(&client, &platform), platform);
    let id = ContainerId("ctr \"quoted\"".to_string());
    assert_eq!(round_trip(&client, &id), id);
    for share in [0.5, 1.0, 1e-9] {
        assert_eq!(round_trip(&client, &share), share);
    }
}
