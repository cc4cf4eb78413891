//! Tool definitions: declared signatures, capability schemas and execution

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::bridge::{self, panic_message};
use crate::types::CallContext;

/// Named arguments passed to a tool
pub type Arguments = Map<String, Value>;

type BlockingFn = dyn Fn(&CallContext, Arguments) -> anyhow::Result<Value> + Send + Sync;
type AsyncFn = dyn Fn(CallContext, Arguments) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync;

/// JSON type emitted for a parameter in the input schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

/// Type annotation declared on a parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Untyped,
    Str,
    Integer,
    Float,
    Boolean,
    /// Any other declared type; surfaces as a string
    Other(String),
}

impl Annotation {
    pub fn json_type(&self) -> ParamType {
        match self {
            Annotation::Integer | Annotation::Float => ParamType::Number,
            Annotation::Boolean => ParamType::Boolean,
            Annotation::Untyped | Annotation::Str | Annotation::Other(_) => ParamType::String,
        }
    }
}

/// One declared parameter of a tool callable
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub annotation: Annotation,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, annotation: Annotation) -> Self {
        Self {
            name: name.into(),
            annotation,
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Clone)]
enum Callable {
    Blocking(Arc<BlockingFn>),
    Async(Arc<AsyncFn>),
}

/// A callable together with its statically declared signature
///
/// ```
/// use serde_json::json;
/// use workflow_mcp::registry::{Annotation, ToolFn};
///
/// let add = ToolFn::blocking("add", |_ctx, args| {
///     let a = args["a"].as_f64().unwrap_or(0.0);
///     let b = args["b"].as_f64().unwrap_or(0.0);
///     Ok(json!(a + b))
/// })
/// .doc("Add two numbers.\n\na: first operand\nb: second operand")
/// .param("a", Annotation::Float)
/// .param_with_default("b", Annotation::Float, json!(0));
/// assert_eq!(add.name(), "add");
/// ```
#[derive(Clone)]
pub struct ToolFn {
    name: String,
    doc: String,
    params: Vec<ParamDecl>,
    callable: Callable,
}

impl ToolFn {
    /// Wrap a synchronous callable
    pub fn blocking<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&CallContext, Arguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            doc: String::new(),
            params: Vec::new(),
            callable: Callable::Blocking(Arc::new(f)),
        }
    }

    /// Wrap a callable that returns a suspended computation
    pub fn asynchronous<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(CallContext, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let f: Arc<AsyncFn> =
            Arc::new(move |ctx: CallContext, args: Arguments| f(ctx, args).boxed());
        Self {
            name: name.into(),
            doc: String::new(),
            params: Vec::new(),
            callable: Callable::Async(f),
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn param(self, name: impl Into<String>, annotation: Annotation) -> Self {
        self.with_param(ParamDecl::new(name, annotation))
    }

    pub fn param_with_default(
        self,
        name: impl Into<String>,
        annotation: Annotation,
        default: Value,
    ) -> Self {
        self.with_param(ParamDecl::new(name, annotation).with_default(default))
    }

    pub fn with_param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ToolFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolFn")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("async", &matches!(self.callable, Callable::Async(_)))
            .finish()
    }
}

/// Property entry of an input schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Keyed by parameter name, in declaration order
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: Value,
}

impl Default for OutputSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: serde_json::json!({"output": {"type": "string"}}),
        }
    }
}

/// Capability descriptor advertised for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
    pub output_schema: OutputSchema,
}

/// Result of running a tool: always `{"output": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub output: Value,
}

impl ToolOutput {
    pub const ERROR_PREFIX: &'static str = "Error: ";

    pub fn new(output: Value) -> Self {
        Self { output }
    }

    /// Failure rendered as data
    pub fn error(message: impl fmt::Display) -> Self {
        Self {
            output: Value::String(format!("{}{}", Self::ERROR_PREFIX, message)),
        }
    }

    pub fn is_error(&self) -> bool {
        self.output
            .as_str()
            .is_some_and(|s| s.starts_with(Self::ERROR_PREFIX))
    }

    pub fn into_value(self) -> Value {
        serde_json::json!({ "output": self.output })
    }
}

/// Resolved parameter of a registered tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolParam {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: Option<String>,
    default: Option<Value>,
}

/// A registered tool: immutable after construction
pub struct ToolDef {
    name: String,
    description: String,
    params: Vec<ToolParam>,
    schema: ToolSchema,
    callable: Callable,
}

impl ToolDef {
    /// Build a definition, falling back to the callable's declared name and documentation
    pub fn new(tool: ToolFn, name: Option<&str>, description: Option<&str>) -> Self {
        let ToolFn {
            name: declared_name,
            doc,
            params,
            callable,
        } = tool;

        let name = name.map(String::from).unwrap_or(declared_name);
        let description = description
            .map(String::from)
            .unwrap_or_else(|| doc.trim().to_string());

        let params: Vec<ToolParam> = params
            .into_iter()
            .map(|decl| ToolParam {
                param_type: decl.annotation.json_type(),
                required: decl.default.is_none(),
                description: decl
                    .description
                    .or_else(|| describe_from_doc(&doc, &decl.name)),
                default: decl.default,
                name: decl.name,
            })
            .collect();

        let schema = build_schema(&name, &description, &params);

        Self {
            name,
            description,
            params,
            schema,
            callable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn params(&self) -> &[ToolParam] {
        &self.params
    }

    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    /// Run the tool, bounded by `timeout`
    ///
    /// Blocking callables run on the runtime's blocking pool, async ones are
    /// awaited in place. Every failure comes back as `{"output": "Error: ..."}`.
    pub async fn execute(
        &self,
        arguments: Arguments,
        ctx: &CallContext,
        timeout: Duration,
    ) -> ToolOutput {
        let args = match self.bind_arguments(arguments) {
            Ok(args) => args,
            Err(e) => return self.failed(e),
        };

        let run = match &self.callable {
            Callable::Blocking(f) => {
                let f = Arc::clone(f);
                let ctx = ctx.clone();
                async move {
                    match tokio::task::spawn_blocking(move || f(&ctx, args)).await {
                        Ok(result) => result,
                        Err(e) if e.is_panic() => Err(anyhow!(panic_message(&*e.into_panic()))),
                        Err(e) => Err(anyhow!("tool task failed: {}", e)),
                    }
                }
                .boxed()
            }
            Callable::Async(f) => guarded_future(f, ctx.clone(), args),
        };

        match tokio::time::timeout(timeout, run).await {
            Ok(Ok(value)) => ToolOutput::new(value),
            Ok(Err(e)) => self.failed(e),
            Err(_) => self.failed(anyhow!("timed out after {}s", timeout.as_secs_f64())),
        }
    }

    /// Run the tool from synchronous code, bridging async callables onto a runtime
    pub fn execute_blocking(&self, arguments: Arguments, ctx: &CallContext) -> ToolOutput {
        let args = match self.bind_arguments(arguments) {
            Ok(args) => args,
            Err(e) => return self.failed(e),
        };

        let result = match &self.callable {
            Callable::Blocking(f) => panic::catch_unwind(AssertUnwindSafe(|| f(ctx, args)))
                .unwrap_or_else(|payload| Err(anyhow!(panic_message(&*payload)))),
            Callable::Async(f) => {
                bridge::run_to_completion(guarded_future(f, ctx.clone(), args)).and_then(|r| r)
            }
        };

        match result {
            Ok(value) => ToolOutput::new(value),
            Err(e) => self.failed(e),
        }
    }

    /// Fill declared defaults and reject arguments the signature cannot take
    fn bind_arguments(&self, mut arguments: Arguments) -> anyhow::Result<Arguments> {
        if let Some(unknown) = arguments
            .keys()
            .find(|key| !self.params.iter().any(|p| &p.name == *key))
        {
            return Err(anyhow!("unexpected argument '{}'", unknown));
        }

        for param in &self.params {
            if arguments.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    arguments.insert(param.name.clone(), default.clone());
                }
                None => return Err(anyhow!("missing required argument '{}'", param.name)),
            }
        }

        Ok(arguments)
    }

    fn failed(&self, error: anyhow::Error) -> ToolOutput {
        tracing::warn!(tool = %self.name, "tool execution failed: {:#}", error);
        ToolOutput::error(format!("{:#}", error))
    }
}

impl fmt::Debug for ToolDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Call an async callable, turning panics (at call time or while polled) into errors
fn guarded_future(
    f: &Arc<AsyncFn>,
    ctx: CallContext,
    args: Arguments,
) -> BoxFuture<'static, anyhow::Result<Value>> {
    match panic::catch_unwind(AssertUnwindSafe(|| f(ctx, args))) {
        Ok(fut) => AssertUnwindSafe(fut)
            .catch_unwind()
            .map(|result| result.unwrap_or_else(|payload| Err(anyhow!(panic_message(&*payload)))))
            .boxed(),
        Err(payload) => futures::future::ready(Err(anyhow!(panic_message(&*payload)))).boxed(),
    }
}

/// Description for `param` from a doc line of the form `param: text` or `param : text`
pub fn describe_from_doc(doc: &str, param: &str) -> Option<String> {
    doc.lines().map(str::trim_start).find_map(|line| {
        let rest = line.strip_prefix(param)?;
        let rest = rest.strip_prefix(':').or_else(|| rest.strip_prefix(" :"))?;
        let text = rest.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

fn build_schema(name: &str, description: &str, params: &[ToolParam]) -> ToolSchema {
    let mut properties = Map::new();
    for param in params {
        let property = PropertySchema {
            param_type: param.param_type,
            description: param.description.clone(),
        };
        // PropertySchema only holds an enum and a string
        let value = serde_json::to_value(property).unwrap_or(Value::Null);
        properties.insert(param.name.clone(), value);
    }

    ToolSchema {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: InputSchema {
            schema_type: "object".to_string(),
            properties,
            required: params
                .iter()
                .filter(|p| p.required)
                .map(|p| p.name.clone())
                .collect(),
        },
        output_schema: OutputSchema::default(),
    }
}
