//! Property-based tests for workflow-mcp
//!
//! These tests verify invariants that must hold for all inputs:
//! - Doc scanning never panics and only returns trimmed, non-empty text
//! - The registry holds exactly one entry per distinct name
//! - Schema inference follows the declared annotation
//! - Tool failures always come back as data
//!
//! Run with: cargo test --test property_tests

use proptest::prelude::*;

// ============================================================================
// DOC SCANNING TESTS
// ============================================================================

mod doc_tests {
    use super::*;
    use workflow_mcp::registry::describe_from_doc;

    proptest! {
        /// Invariant: describe_from_doc never panics on any input
        #[test]
        fn never_panics(doc in "\\PC*", param in "\\PC{0,20}") {
            let _ = describe_from_doc(&doc, &param);
        }

        /// Invariant: a found description is trimmed and non-empty
        #[test]
        fn output_trimmed(doc in "[a-z :\\n\\t]{0,200}", param in "[a-z]{1,8}") {
            if let Some(text) = describe_from_doc(&doc, &param) {
                prop_assert!(!text.is_empty());
                prop_assert_eq!(text.trim(), text.as_str());
            }
        }

        /// Invariant: a `param: text` line is always found
        #[test]
        fn finds_declared_line(
            param in "[a-z_]{1,12}",
            text in "[A-Za-z0-9][A-Za-z0-9 ]{0,30}[A-Za-z0-9]",
            indent in "[ \\t]{0,4}",
            spaced in any::<bool>(),
        ) {
            let sep = if spaced { " :" } else { ":" };
            let doc = format!("Summary line.\n{}{}{} {}\n", indent, param, sep, text);
            prop_assert_eq!(describe_from_doc(&doc, &param), Some(text));
        }
    }
}

// ============================================================================
// REGISTRY TESTS
// ============================================================================

mod registry_tests {
    use super::*;
    use serde_json::Value;
    use std::collections::HashSet;
    use workflow_mcp::registry::{ToolFn, ToolRegistry};

    proptest! {
        /// Invariant: list() length equals the number of distinct names
        #[test]
        fn one_entry_per_name(names in prop::collection::vec("[a-d]{1,2}", 0..40)) {
            let mut registry = ToolRegistry::new();
            for name in &names {
                registry.register(ToolFn::blocking(name.clone(), |_, _| Ok(Value::Null)), None, None);
            }
            let distinct: HashSet<&String> = names.iter().collect();
            prop_assert_eq!(registry.list().len(), distinct.len());
        }

        /// Invariant: listing order is first-registration order
        #[test]
        fn order_is_first_registration(names in prop::collection::vec("[a-f]", 0..30)) {
            let mut registry = ToolRegistry::new();
            let mut expected: Vec<String> = Vec::new();
            for name in &names {
                registry.register(ToolFn::blocking(name.clone(), |_, _| Ok(Value::Null)), None, None);
                if !expected.contains(name) {
                    expected.push(name.clone());
                }
            }
            let listed: Vec<String> = registry.list().into_iter().map(|s| s.name).collect();
            prop_assert_eq!(listed, expected);
        }
    }
}

// ============================================================================
// SCHEMA INFERENCE TESTS
// ============================================================================

mod schema_tests {
    use super::*;
    use serde_json::{json, Value};
    use workflow_mcp::registry::{Annotation, ParamDecl, ToolDef, ToolFn};

    fn annotation_strategy() -> impl Strategy<Value = Annotation> {
        prop_oneof![
            Just(Annotation::Untyped),
            Just(Annotation::Str),
            Just(Annotation::Integer),
            Just(Annotation::Float),
            Just(Annotation::Boolean),
            "[a-z]{1,8}".prop_map(Annotation::Other),
        ]
    }

    proptest! {
        /// Invariant: schema type follows the annotation; defaulted params are optional
        #[test]
        fn type_and_required_follow_declaration(
            params in prop::collection::vec((annotation_strategy(), any::<bool>()), 1..8)
        ) {
            let mut tool = ToolFn::blocking("t", |_, _| Ok(Value::Null));
            for (i, (annotation, has_default)) in params.iter().enumerate() {
                let mut decl = ParamDecl::new(format!("p{}", i), annotation.clone());
                if *has_default {
                    decl = decl.with_default(json!(0));
                }
                tool = tool.with_param(decl);
            }
            let def = ToolDef::new(tool, None, None);
            let schema = &def.schema().input_schema;

            for (i, (annotation, has_default)) in params.iter().enumerate() {
                let name = format!("p{}", i);
                let expected = match annotation {
                    Annotation::Integer | Annotation::Float => "number",
                    Annotation::Boolean => "boolean",
                    _ => "string",
                };
                prop_assert_eq!(&schema.properties[&name]["type"], &json!(expected));
                prop_assert_eq!(schema.required.contains(&name), !has_default);
            }
        }
    }
}

// ============================================================================
// EXECUTION TESTS
// ============================================================================

mod execution_tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use workflow_mcp::registry::{Arguments, ToolDef, ToolFn};
    use workflow_mcp::CallContext;

    proptest! {
        /// Invariant: a failing tool yields `Error: <message>` and never escapes
        #[test]
        fn failures_become_data(message in "[a-zA-Z0-9 ]{1,40}") {
            let msg = message.clone();
            let def = ToolDef::new(
                ToolFn::blocking("fail", move |_, _| Err(anyhow!(msg.clone()))),
                None,
                None,
            );
            let out = def.execute_blocking(Arguments::new(), &CallContext::default());
            prop_assert!(out.is_error());
            prop_assert_eq!(out.output, json!(format!("Error: {}", message)));
        }
    }
}
