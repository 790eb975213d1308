use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strandcore::{ExecutionEvent, NodeConfig, WorkflowSchema};
use strandruntime::{NodeRegistry, Workflow};

#[derive(Parser)]
#[command(name = "strand")]
#[command(about = "Strand workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow schema file
    Run {
        /// Path to schema JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Input event as a JSON string
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow schema file
    Validate {
        /// Path to schema JSON file
        file: PathBuf,
    },

    /// List available node names
    Nodes,

    /// Create an example workflow schema
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            verbose,
        } => {
            init_logging(verbose);
            run_workflow(file, input).await?;
        }
        Commands::Validate { file } => validate_workflow(file)?,
        Commands::Nodes => list_nodes(),
        Commands::Init { output } => create_example_schema(output)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn standard_registry() -> NodeRegistry<serde_json::Value> {
    let mut registry = NodeRegistry::new();
    strandnodes::register_all(&mut registry);
    registry
}

fn load_schema(file: &Path) -> Result<WorkflowSchema> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let schema =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;
    Ok(schema)
}

async fn run_workflow(file: PathBuf, input: Option<String>) -> Result<()> {
    println!("🚀 Loading schema from: {}", file.display());
    let schema = load_schema(&file)?;
    println!(
        "📋 Workflow: {} ({} declared nodes, start: {})",
        schema.name,
        schema.nodes.len(),
        schema.start
    );
    println!();

    let event: serde_json::Value = match input {
        Some(raw) => serde_json::from_str(&raw).context("parsing --input")?,
        None => serde_json::json!({}),
    };

    let workflow = Workflow::new(schema, Arc::new(standard_registry()))?;

    let mut events = workflow.subscribe();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::RunStarted { .. } => println!("▶️  Run started"),
                ExecutionEvent::NodeStarted { node, .. } => println!("  ⚡ {}", node),
                ExecutionEvent::NodeCompleted {
                    node,
                    record,
                    duration_ms,
                    ..
                } => {
                    if let Some(error) = record.error {
                        println!("  ⚠️  {} recorded error in {}ms: {}", node, duration_ms, error);
                    } else {
                        println!("  ✅ {} completed in {}ms", node, duration_ms);
                    }
                }
                ExecutionEvent::RouteSelected { router, target, .. } => match target {
                    Some(target) => println!("  🔀 {} → {}", router, target),
                    None => println!("  🔀 {} → (end)", router),
                },
                ExecutionEvent::NodeFailed { node, error, .. } => {
                    println!("  ❌ {} failed: {}", node, error)
                }
                ExecutionEvent::RunCompleted {
                    success,
                    duration_ms,
                    ..
                } => {
                    if success {
                        println!("✨ Run completed in {}ms", duration_ms);
                    } else {
                        println!("💥 Run failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let result = workflow.run(event).await;

    // Let the listener drain buffered events before tearing it down.
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    let ctx = result?;
    println!();
    println!("📤 Final context:");
    for (name, record) in &ctx.nodes {
        println!("   {}: {}", name, serde_json::to_string(record)?);
    }
    if !ctx.metadata.is_empty() {
        println!("   metadata: {}", serde_json::to_string(&ctx.metadata)?);
    }

    Ok(())
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating schema: {}", file.display());
    let schema = load_schema(&file)?;
    let name = schema.name.clone();
    let workflow = Workflow::new(schema, Arc::new(standard_registry()))?;

    println!("✅ Schema is valid:");
    println!("   Name: {}", name);
    println!("   Plan: {} nodes", workflow.plan().len());
    Ok(())
}

fn list_nodes() {
    println!("📦 Available nodes:");
    for name in standard_registry().node_names() {
        println!("  • {}", name);
    }
}

fn create_example_schema(output: PathBuf) -> Result<()> {
    let schema = WorkflowSchema::new("example-fetch", "transform.extract")
        .with_description("Extracts the event, fetches event.url, logs the result")
        .with_node(
            NodeConfig::new("transform.extract")
                .connects_to("http.fetch")
                .with_description("Copy the input event into the context"),
        )
        .with_node(NodeConfig::new("http.fetch").connects_to("debug.log"))
        .with_node(NodeConfig::new("debug.log").end());

    std::fs::write(&output, serde_json::to_string_pretty(&schema)?)?;

    println!("✨ Created example schema: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  strand run --file {} --input '{{\"url\": \"https://api.github.com/zen\"}}'",
        output.display()
    );
    Ok(())
}
