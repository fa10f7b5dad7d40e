use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use arcflow_rs::adk::model::Model;
use arcflow_rs::arcflow::config::Settings;
use arcflow_rs::arcflow::workflow::builder::Builder;
use arcflow_rs::arcflow::workflow::state::DevState;

const ENV_HELP: &str = "Environment: OPENROUTER_API_KEY, OPENROUTER_MODEL, OPENROUTER_BASE_URL, \
ARCFLOW_MAX_STEPS, ARCFLOW_MAX_REPAIRS. A .env file in the working directory is loaded first, \
but it never overrides variables already set in the process environment.";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run the developer workflow against a repository",
    long_about = None,
    after_help = ENV_HELP
)]
struct Args {
    /// Repository root the workflow operates on
    #[arg(long)]
    repo: String,

    /// Service entry point, e.g. `app.main:app` or a full start command
    #[arg(long)]
    service: Option<String>,

    /// The request to work on
    #[arg(long)]
    request: String,

    /// Settings file (defaults to ./arcflow.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the engine step budget
    #[arg(long)]
    max_steps: Option<usize>,

    /// Print every executed step alongside the final state
    #[arg(long)]
    trace: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(max_steps) = args.max_steps {
        settings.engine.max_steps = max_steps;
    }

    let model = settings.build_model()?;
    log::info!("Using model: {}", model.model_name());
    let model: Arc<dyn Model> = Arc::new(model);

    let workflow = Builder::new(model, settings)
        .build()
        .context("building the developer workflow")?;
    let initial = DevState::new(args.repo, args.request).with_service_entry(args.service);

    let output = if args.trace {
        let execution = workflow.invoke_with_trace(initial).await?;
        json!({
            "run_id": execution.run_id,
            "started_at": execution.started_at,
            "steps": execution.steps,
            "trace": execution.visited(),
            "state": execution.state,
        })
    } else {
        serde_json::to_value(workflow.invoke(initial).await?)?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_help_states_env_precedence() {
        let help = Args::command().render_help().to_string();
        assert!(help.contains("OPENROUTER_API_KEY"));
        assert!(help.contains(".env"));
        assert!(help.contains("overrides"));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "arcflow", "--repo", ".", "--request", "add a health check", "--max-steps", "40",
        ])
        .unwrap();
        assert_eq!(args.max_steps, Some(40));
        assert!(!args.trace);
    }
}
