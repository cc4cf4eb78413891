//! Golden tests - fixture-based tests that lock expected behavior
//!
//! These tests use JSON fixtures to verify that tool schemas and dispatcher
//! responses stay byte-for-byte stable. Any change in behavior will cause
//! these tests to fail, signaling a potential breaking change for clients.
//!
//! Run with: cargo test --test golden_tests

use serde::Deserialize;
use serde_json::Value;
use std::fs;

fn read_fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
}

// ============================================================================
// TOOL SCHEMA GOLDEN TESTS
// ============================================================================

mod schema_golden {
    use super::*;
    use pretty_assertions::assert_eq;
    use workflow_mcp::registry::{Annotation, ParamDecl, ToolFn, ToolRegistry};

    #[derive(Debug, Deserialize)]
    struct ParamCase {
        name: String,
        annotation: Option<String>,
        default: Option<Value>,
    }

    #[derive(Debug, Deserialize)]
    struct ToolCase {
        name: String,
        doc: String,
        params: Vec<ParamCase>,
    }

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        tool: ToolCase,
        expected: Value,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    fn annotation(declared: Option<&str>) -> Annotation {
        match declared {
            None => Annotation::Untyped,
            Some("str") => Annotation::Str,
            Some("int") => Annotation::Integer,
            Some("float") => Annotation::Float,
            Some("bool") => Annotation::Boolean,
            Some(other) => Annotation::Other(other.to_string()),
        }
    }

    fn build(case: ToolCase) -> ToolFn {
        let mut tool = ToolFn::blocking(case.name, |_, _| Ok(Value::Null)).doc(case.doc);
        for param in case.params {
            let mut decl = ParamDecl::new(param.name, annotation(param.annotation.as_deref()));
            if let Some(default) = param.default {
                decl = decl.with_default(default);
            }
            tool = tool.with_param(decl);
        }
        tool
    }

    #[test]
    fn test_tool_schema_golden() {
        let fixture: Fixture = serde_json::from_str(&read_fixture("tool_schemas.json"))
            .expect("Failed to parse fixture JSON");

        for case in fixture.test_cases {
            let mut registry = ToolRegistry::new();
            registry.register(build(case.tool), None, None);
            let schemas = registry.list();
            let actual = serde_json::to_value(&schemas[0]).unwrap();

            assert_eq!(actual, case.expected, "Case '{}'", case.name);
            // property order is part of the contract
            assert_eq!(
                serde_json::to_string(&actual["input_schema"]["properties"]).unwrap(),
                serde_json::to_string(&case.expected["input_schema"]["properties"]).unwrap(),
                "Case '{}': property order",
                case.name
            );
        }
    }
}

// ============================================================================
// DISPATCHER GOLDEN TESTS
// ============================================================================

mod dispatch_golden {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map};
    use std::sync::Arc;
    use workflow_mcp::mcp::Dispatcher;
    use workflow_mcp::workflow::{workflow_registry, ResponseMode, WorkflowInvoker};
    use workflow_mcp::{CallContext, ServerSettings};

    /// Answers every run with `<app_id>:<query>`
    struct EchoWorkflow;

    #[async_trait]
    impl WorkflowInvoker for EchoWorkflow {
        async fn invoke(
            &self,
            app_id: &str,
            inputs: Map<String, Value>,
            _mode: ResponseMode,
        ) -> workflow_mcp::Result<Value> {
            let query = inputs.get("query").and_then(Value::as_str).unwrap_or("");
            Ok(json!({"data": {"outputs": {"output": format!("{}:{}", app_id, query)}}}))
        }
    }

    #[derive(Debug, Deserialize)]
    struct TestCase {
        name: String,
        app_id: Option<String>,
        request: Value,
        status: u16,
        response: Value,
    }

    #[derive(Debug, Deserialize)]
    struct Fixture {
        test_cases: Vec<TestCase>,
    }

    #[tokio::test]
    async fn test_rpc_exchanges_golden() {
        let fixture: Fixture = serde_json::from_str(&read_fixture("rpc_exchanges.json"))
            .expect("Failed to parse fixture JSON");

        let invoker: Arc<dyn WorkflowInvoker> = Arc::new(EchoWorkflow);
        let dispatcher = Dispatcher::new(
            Arc::new(workflow_registry(Arc::clone(&invoker))),
            Arc::new(ServerSettings::default()),
            invoker,
        );

        for case in fixture.test_cases {
            let ctx = CallContext::new(case.app_id.clone());
            let body = serde_json::to_vec(&case.request).unwrap();
            let outcome = dispatcher.handle_post(&body, &ctx).await;

            assert_eq!(outcome.status.as_u16(), case.status, "Case '{}'", case.name);
            assert_eq!(outcome.body, case.response, "Case '{}'", case.name);
        }
    }
}
