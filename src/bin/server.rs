//! Workflow MCP Server
//!
//! Run with: workflow-mcp-server [serve|list-tools|call]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use workflow_mcp::realtime::{AppState, McpHttpServer};
use workflow_mcp::registry::Arguments;
use workflow_mcp::workflow::{workflow_registry, HttpWorkflowClient, WorkflowInvoker};
use workflow_mcp::ServerSettings;

#[derive(Parser, Debug)]
#[command(name = "workflow-mcp-server")]
#[command(about = "Serve a workflow application as MCP tools", version)]
struct Args {
    /// Address to bind
    #[arg(long, env = "WORKFLOW_MCP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "WORKFLOW_MCP_PORT", default_value = "8080")]
    port: u16,

    /// Workflow application exposed by this server
    #[arg(long, env = "WORKFLOW_MCP_APP_ID")]
    app_id: Option<String>,

    /// Name reported by initialize
    #[arg(long, env = "WORKFLOW_MCP_SERVER_NAME")]
    server_name: Option<String>,

    /// Description reported by initialize
    #[arg(long, env = "WORKFLOW_MCP_SERVER_DESCRIPTION")]
    server_description: Option<String>,

    #[arg(long, env = "WORKFLOW_MCP_SERVER_SOURCE")]
    server_source: Option<String>,

    /// Bearer token required from clients (unset = no auth)
    #[arg(long, env = "WORKFLOW_MCP_API_KEY")]
    api_key: Option<String>,

    /// Base URL of the workflow service
    #[arg(
        long,
        env = "WORKFLOW_MCP_WORKFLOW_URL",
        default_value = "http://localhost/v1"
    )]
    workflow_url: String,

    /// API key for the workflow service
    #[arg(long, env = "WORKFLOW_MCP_WORKFLOW_API_KEY")]
    workflow_api_key: Option<String>,

    /// End-user id reported to the workflow service
    #[arg(long, env = "WORKFLOW_MCP_WORKFLOW_USER", default_value = "workflow-mcp")]
    workflow_user: String,

    /// Upper bound on one tool call, in seconds
    #[arg(long, env = "WORKFLOW_MCP_TOOL_TIMEOUT", default_value = "120")]
    tool_timeout_secs: u64,

    /// Heartbeats sent per notification stream
    #[arg(long, env = "WORKFLOW_MCP_HEARTBEAT_COUNT", default_value = "20")]
    heartbeat_count: usize,

    /// Milliseconds between heartbeats
    #[arg(long, env = "WORKFLOW_MCP_HEARTBEAT_INTERVAL_MS", default_value = "15000")]
    heartbeat_interval_ms: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "WORKFLOW_MCP_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print the tool schemas as JSON
    ListTools,
    /// Call one tool and print its output
    Call {
        /// Tool name
        name: String,
        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

impl Args {
    fn settings(&self) -> ServerSettings {
        ServerSettings {
            app_id: self.app_id.clone(),
            server_name: self.server_name.clone(),
            server_description: self.server_description.clone(),
            server_source: self.server_source.clone(),
            api_key: self.api_key.clone(),
            workflow_base_url: self.workflow_url.clone(),
            workflow_api_key: self.workflow_api_key.clone(),
            workflow_user: self.workflow_user.clone(),
            tool_timeout_secs: self.tool_timeout_secs,
            heartbeat_count: self.heartbeat_count,
            heartbeat_interval_ms: self.heartbeat_interval_ms,
        }
    }
}

fn init_tracing(json: bool) {
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::from_default_env());
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let settings = args.settings();
    settings.validate()?;
    let invoker: Arc<dyn WorkflowInvoker> = Arc::new(
        HttpWorkflowClient::with_timeout(
            settings.workflow_base_url.clone(),
            settings.workflow_api_key.clone(),
            settings.workflow_user.clone(),
            Duration::from_secs(settings.tool_timeout_secs),
        )
        .context("Failed to build workflow client")?,
    );
    let registry = workflow_registry(Arc::clone(&invoker));

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let addr = McpHttpServer::bind_address(&args.host, args.port)?;
            if settings.resolved_app_id().is_none() {
                tracing::warn!("No app_id configured; list_tools and workflow calls will fail");
            }

            let state = AppState::new(settings, registry, invoker);
            let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
            rt.block_on(McpHttpServer::new(state, addr).start())?;
        }
        Command::ListTools => {
            let tools = registry.get().list();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        Command::Call { name, args: raw } => {
            let arguments: Arguments = match serde_json::from_str::<Value>(&raw)
                .context("--args must be valid JSON")?
            {
                Value::Object(map) => map,
                _ => anyhow::bail!("--args must be a JSON object"),
            };
            let output = registry
                .get()
                .execute_by_name_blocking(&name, arguments, &settings.call_context())?;
            println!("{}", serde_json::to_string_pretty(&output.into_value())?);
        }
    }

    Ok(())
}
