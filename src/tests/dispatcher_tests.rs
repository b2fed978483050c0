//! Dispatch policy tests: validation before invocation, error classes,
//! notification silence and instrumentation.

#[cfg(test)]
mod tests {
    use crate::{
        config::ServerConfig,
        content_types::{ResourceContents, ToolResult},
        error::{ErrorKind, McpError},
        framework::{
            handler::{resource_handler, template_handler, tool_handler},
            MethodHandler,
        },
        instrumentation::InstrumentationEvent,
        peer::PeerState,
        tests::{echo_dispatcher, notification, request, test_config, TestContext},
        types::{ResourceDefinition, ResourceTemplateDefinition, ToolDefinition},
    };
    use serde_json::{json, Value};
    use std::sync::{atomic::Ordering, Arc, Mutex};

    fn recorded_events() -> (Arc<Mutex<Vec<InstrumentationEvent>>>, ServerConfig<TestContext>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let config = test_config().with_instrumentation(move |event: &InstrumentationEvent| {
            sink.lock().unwrap().push(event.clone());
        });
        (events, config)
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let dispatcher = echo_dispatcher(test_config());
        let peer = PeerState::new(None);

        let response = dispatcher
            .dispatch(
                request(1, "tools/call", json!({"name": "echo", "arguments": {"msg": "hi"}})),
                &peer,
            )
            .await
            .unwrap();

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["content"], json!([{"type": "text", "text": "hi"}]));
        assert!(response["result"].get("isError").is_none());
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_handler() {
        let dispatcher = echo_dispatcher(test_config());
        let peer = PeerState::new(None);

        let response = dispatcher
            .dispatch(
                request(2, "tools/call", json!({"name": "echo", "arguments": {}})),
                &peer,
            )
            .await
            .unwrap();

        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["error"]["data"]["kind"], "invalid_arguments");
        assert_eq!(response["error"]["data"]["errors"][0]["path"], "msg");
        assert_eq!(dispatcher.context().echo_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_reported_per_field() {
        let dispatcher = echo_dispatcher(test_config());
        let peer = PeerState::new(None);

        let response = dispatcher
            .dispatch(
                request(3, "tools/call", json!({"name": "echo", "arguments": {"msg": 5}})),
                &peer,
            )
            .await
            .unwrap();

        assert_eq!(response["error"]["data"]["kind"], "invalid_arguments");
        assert_eq!(dispatcher.context().echo_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_can_be_disabled() {
        let dispatcher = echo_dispatcher(test_config().with_argument_validation(false));
        let peer = PeerState::new(None);

        let response = dispatcher
            .dispatch(
                request(4, "tools/call", json!({"name": "echo", "arguments": {}})),
                &peer,
            )
            .await
            .unwrap();

        assert!(response.get("result").is_some());
        assert_eq!(dispatcher.context().echo_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_capability_error() {
        let dispatcher = echo_dispatcher(test_config());
        let response = dispatcher
            .dispatch(
                request(5, "tools/call", json!({"name": "nope", "arguments": {}})),
                &PeerState::new(None),
            )
            .await
            .unwrap();

        assert_eq!(response["error"]["code"], -32002);
        assert_eq!(response["error"]["data"]["kind"], "capability_not_found");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dispatcher = echo_dispatcher(test_config());
        let response = dispatcher
            .dispatch(request(6, "tools/frobnicate", json!({})), &PeerState::new(None))
            .await
            .unwrap();

        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["error"]["data"]["kind"], "method_not_found");
    }

    #[tokio::test]
    async fn test_handler_failure_is_reported_and_hidden() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let seen = reports.clone();
        let dispatcher = echo_dispatcher(test_config().with_exception_reporter(
            move |err: &anyhow::Error, _ctx: &TestContext| {
                seen.lock().unwrap().push(err.to_string());
            },
        ));
        dispatcher
            .registry()
            .register_tool(
                ToolDefinition::new("fail", "Always fails", json!({"type": "object"})),
                tool_handler(|_args: Value, _ctx, _notif| async move {
                    Err::<ToolResult, _>(anyhow::anyhow!("secret connection string"))
                }),
            )
            .unwrap();

        let response = dispatcher
            .dispatch(
                request(7, "tools/call", json!({"name": "fail", "arguments": {}})),
                &PeerState::new(None),
            )
            .await
            .unwrap();

        assert_eq!(response["error"]["code"], -32603);
        assert_eq!(response["error"]["data"]["kind"], "handler_error");
        assert!(!response.to_string().contains("secret"));
        assert_eq!(reports.lock().unwrap().as_slice(), ["secret connection string"]);
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let reports = Arc::new(Mutex::new(0usize));
        let seen = reports.clone();
        let dispatcher = echo_dispatcher(test_config().with_exception_reporter(
            move |_err: &anyhow::Error, _ctx: &TestContext| {
                *seen.lock().unwrap() += 1;
            },
        ));
        dispatcher
            .registry()
            .register_tool(
                ToolDefinition::new("boom", "Panics", json!({"type": "object"})),
                tool_handler(|_args: Value, _ctx, _notif| async move {
                    if true {
                        panic!("boom");
                    }
                    Ok(ToolResult::text("unreachable"))
                }),
            )
            .unwrap();

        let peer = PeerState::new(None);
        let response = dispatcher
            .dispatch(request(8, "tools/call", json!({"name": "boom"})), &peer)
            .await
            .unwrap();
        assert_eq!(response["error"]["data"]["kind"], "handler_error");
        assert_eq!(*reports.lock().unwrap(), 1);

        // The dispatcher keeps working afterwards
        let ping = dispatcher.dispatch(request(9, "ping", json!({})), &peer).await.unwrap();
        assert_eq!(ping["result"], json!({}));
    }

    #[tokio::test]
    async fn test_panicking_reporter_is_contained() {
        let dispatcher = echo_dispatcher(test_config().with_exception_reporter(
            |_err: &anyhow::Error, _ctx: &TestContext| panic!("reporter bug"),
        ));
        dispatcher
            .registry()
            .register_tool(
                ToolDefinition::new("fail", "Always fails", json!({"type": "object"})),
                tool_handler(|_args: Value, _ctx, _notif| async move {
                    Err::<ToolResult, _>(anyhow::anyhow!("nope"))
                }),
            )
            .unwrap();

        let response = dispatcher
            .dispatch(request(10, "tools/call", json!({"name": "fail"})), &PeerState::new(None))
            .await
            .unwrap();
        assert_eq!(response["error"]["data"]["kind"], "handler_error");
    }

    #[tokio::test]
    async fn test_protocol_errors_from_handlers_are_reported_generically() {
        let reported = Arc::new(Mutex::new(Vec::new()));
        let seen = reported.clone();
        let dispatcher = echo_dispatcher(test_config().with_exception_reporter(
            move |err: &anyhow::Error, _ctx: &TestContext| {
                seen.lock().unwrap().push(err.to_string());
            },
        ));
        dispatcher
            .registry()
            .register_tool(
                ToolDefinition::new("lookup", "Raises a protocol error", json!({"type": "object"})),
                tool_handler(|_args: Value, _ctx, _notif| async move {
                    Err::<ToolResult, _>(McpError::UnknownMethod("secret/internal".into()).into())
                }),
            )
            .unwrap();

        let response = dispatcher
            .dispatch(request(11, "tools/call", json!({"name": "lookup"})), &PeerState::new(None))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32603);
        assert_eq!(response["error"]["data"]["kind"], "handler_error");
        assert!(!response.to_string().contains("secret/internal"));
        assert_eq!(
            *reported.lock().unwrap(),
            vec!["Method not found: secret/internal".to_string()]
        );
    }

    #[tokio::test]
    async fn test_malformed_notification_gets_no_response() {
        let (events, config) = recorded_events();
        let dispatcher = echo_dispatcher(config);
        let malformed = json!({"jsonrpc": "2.0", "method": "notifications/initialized", "params": [1]});

        assert!(dispatcher.dispatch(malformed, &PeerState::new(None)).await.is_none());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].method, "notifications/initialized");
        assert_eq!(events[0].error_kind, Some(ErrorKind::InvalidParams));
    }

    #[tokio::test]
    async fn test_notifications_never_get_a_response() {
        let reports = Arc::new(Mutex::new(0usize));
        let seen = reports.clone();
        let dispatcher = echo_dispatcher(test_config().with_exception_reporter(
            move |_err: &anyhow::Error, _ctx: &TestContext| {
                *seen.lock().unwrap() += 1;
            },
        ));
        let peer = PeerState::new(None);

        // A failing request without an id
        dispatcher
            .define_method(
                "notifications/custom",
                MethodHandler::notification(|_params, _ctx, _notif| async move {
                    Err(anyhow::anyhow!("handler exploded"))
                }),
            )
            .unwrap();
        assert!(dispatcher
            .dispatch(notification("notifications/custom", json!({})), &peer)
            .await
            .is_none());
        assert_eq!(*reports.lock().unwrap(), 1);

        // Unknown methods and invalid arguments stay silent too
        assert!(dispatcher
            .dispatch(notification("does/not/exist", json!({})), &peer)
            .await
            .is_none());
        assert!(dispatcher
            .dispatch(notification("tools/call", json!({"name": "echo", "arguments": {}})), &peer)
            .await
            .is_none());
        assert_eq!(dispatcher.context().echo_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_initialized_notification_marks_peer() {
        let dispatcher = echo_dispatcher(test_config());
        let peer = PeerState::new(None);
        assert!(dispatcher
            .dispatch(notification("notifications/initialized", json!({})), &peer)
            .await
            .is_none());
        assert!(peer.is_initialized());
    }

    #[tokio::test]
    async fn test_instrumentation_fires_once_per_request() {
        let (events, config) = recorded_events();
        let dispatcher = echo_dispatcher(config);
        let peer = PeerState::new(Some("session-1".into()));

        dispatcher
            .dispatch(request(1, "tools/call", json!({"name": "echo", "arguments": {"msg": "a"}})), &peer)
            .await;
        dispatcher
            .dispatch(request(2, "tools/call", json!({"name": "echo", "arguments": {}})), &peer)
            .await;
        dispatcher.dispatch(request(3, "nope", json!({})), &peer).await;
        dispatcher.dispatch_bytes(b"{not json", &peer).await;
        dispatcher.dispatch(notification("notifications/initialized", json!({})), &peer).await;

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 5);

        assert_eq!(events[0].method, "tools/call");
        assert_eq!(events[0].capability.as_deref(), Some("echo"));
        assert_eq!(events[0].session_id.as_deref(), Some("session-1"));
        assert!(!events[0].is_error());

        assert_eq!(events[1].error_kind, Some(ErrorKind::InvalidArguments));
        assert_eq!(events[2].error_kind, Some(ErrorKind::MethodNotFound));
        assert_eq!(events[3].error_kind, Some(ErrorKind::ParseError));
        assert_eq!(events[4].method, "notifications/initialized");
        assert!(events[4].request_id.is_none());
    }

    #[tokio::test]
    async fn test_panicking_instrumentation_is_contained() {
        let dispatcher = echo_dispatcher(
            test_config().with_instrumentation(|_event: &InstrumentationEvent| panic!("observer bug")),
        );
        let response = dispatcher
            .dispatch(request(1, "ping", json!({})), &PeerState::new(None))
            .await
            .unwrap();
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn test_tools_list_is_ordered_and_idempotent() {
        let dispatcher = echo_dispatcher(test_config());
        for name in ["zulu", "alpha"] {
            dispatcher
                .registry()
                .register_tool(
                    ToolDefinition::new(name, "noop", json!({"type": "object"})),
                    tool_handler(|_args: Value, _ctx, _notif| async move { Ok(ToolResult::text("")) }),
                )
                .unwrap();
        }
        let peer = PeerState::new(None);

        let first = dispatcher.dispatch(request(1, "tools/list", json!({})), &peer).await.unwrap();
        let second = dispatcher.dispatch(request(1, "tools/list", json!({})), &peer).await.unwrap();

        let names: Vec<&str> = first["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["echo", "zulu", "alpha"]);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_duplicate_registration_leaves_registry_untouched() {
        let dispatcher = echo_dispatcher(test_config());
        let err = dispatcher
            .registry()
            .register_tool(
                ToolDefinition::new("echo", "Impostor", json!({"type": "object"})),
                tool_handler(|_args: Value, _ctx, _notif| async move { Ok(ToolResult::text("")) }),
            )
            .unwrap_err();
        assert!(matches!(err, McpError::DuplicateName { .. }));

        let tools = dispatcher.registry().list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].description.as_deref(), Some("Echo a message"));
    }

    #[tokio::test]
    async fn test_custom_method_and_override() {
        let dispatcher = echo_dispatcher(test_config());
        dispatcher
            .define_method(
                "custom/sum",
                MethodHandler::request(|params: Value, _ctx, _notif| async move {
                    let a = params["a"].as_i64().unwrap_or_default();
                    let b = params["b"].as_i64().unwrap_or_default();
                    Ok(json!({ "sum": a + b }))
                }),
            )
            .unwrap();
        dispatcher
            .define_method(
                "ping",
                MethodHandler::request(|_params, _ctx, _notif| async move { Ok(json!({"pong": true})) }),
            )
            .unwrap();

        let peer = PeerState::new(None);
        let sum = dispatcher
            .dispatch(request(1, "custom/sum", json!({"a": 2, "b": 3})), &peer)
            .await
            .unwrap();
        assert_eq!(sum["result"]["sum"], 5);

        let ping = dispatcher.dispatch(request(2, "ping", json!({})), &peer).await.unwrap();
        assert_eq!(ping["result"]["pong"], true);
    }

    #[tokio::test]
    async fn test_define_method_rejects_duplicates_and_wrong_shape() {
        let dispatcher = echo_dispatcher(test_config());
        let handler = || MethodHandler::request(|_params, _ctx, _notif| async move { Ok(json!({})) });

        dispatcher.define_method("custom/once", handler()).unwrap();
        assert!(matches!(
            dispatcher.define_method("custom/once", handler()),
            Err(McpError::MethodAlreadyDefined(_))
        ));
        assert!(matches!(
            dispatcher.define_method("notifications/custom", handler()),
            Err(McpError::MethodShapeMismatch { .. })
        ));
        assert!(matches!(
            dispatcher.define_method(
                "custom/value",
                MethodHandler::notification(|_params, _ctx, _notif| async move { Ok(()) })
            ),
            Err(McpError::MethodShapeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_notification_method_called_with_id_is_invalid() {
        let dispatcher = echo_dispatcher(test_config());
        let response = dispatcher
            .dispatch(request(1, "notifications/initialized", json!({})), &PeerState::new(None))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_resource_read_prefers_exact_then_template() {
        let dispatcher = echo_dispatcher(test_config());
        let registry = dispatcher.registry();
        registry
            .register_resource_template(
                ResourceTemplateDefinition::new("memo://{topic}", "memo"),
                template_handler(|uri: String, vars, _ctx, _notif| async move {
                    Ok(vec![ResourceContents::text(uri, format!("template:{}", vars["topic"]))])
                }),
            )
            .unwrap();
        registry
            .register_resource(
                ResourceDefinition::new("memo://pinned", "pinned"),
                resource_handler(|uri: String, _ctx, _notif| async move {
                    Ok(vec![ResourceContents::text(uri, "exact")])
                }),
            )
            .unwrap();
        let peer = PeerState::new(None);

        let exact = dispatcher
            .dispatch(request(1, "resources/read", json!({"uri": "memo://pinned"})), &peer)
            .await
            .unwrap();
        assert_eq!(exact["result"]["contents"][0]["text"], "exact");

        let templated = dispatcher
            .dispatch(request(2, "resources/read", json!({"uri": "memo://rust"})), &peer)
            .await
            .unwrap();
        assert_eq!(templated["result"]["contents"][0]["text"], "template:rust");

        let missing = dispatcher
            .dispatch(request(3, "resources/read", json!({"uri": "file:///etc"})), &peer)
            .await
            .unwrap();
        assert_eq!(missing["error"]["data"]["kind"], "capability_not_found");
    }

    #[tokio::test]
    async fn test_missing_params_are_invalid_params() {
        let dispatcher = echo_dispatcher(test_config());
        let response = dispatcher
            .dispatch(request(1, "tools/call", json!({})), &PeerState::new(None))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["error"]["data"]["kind"], "invalid_params");
    }
}
