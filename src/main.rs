use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use debug_master::backend::{Backend, HttpBackend};
use debug_master::banner;
use debug_master::challenge::{Challenge, ChallengeStore};
use debug_master::config::AppConfig;
use debug_master::errors::{ClientError, Result};
use debug_master::report;
use debug_master::session::{OneShotOutcome, SubmitOutcome};
use debug_master::workspace::Workspace;

/// Terminal client for Debug Master challenges
#[derive(Parser)]
#[command(author, version, about)]
struct Opt {
    /// Challenge file; overrides DEBUG_MASTER_CHALLENGES
    #[arg(long, global = true)]
    challenges: Option<PathBuf>,

    #[command(subcommand)]
    sub: SubOpt,
}

#[derive(Subcommand)]
enum SubOpt {
    /// Check that the services are up
    Health,
    #[command(flatten)]
    Challenge(ChallengeOpt),
}

#[derive(Subcommand)]
enum ChallengeOpt {
    /// List available challenges
    List,
    /// Show a challenge's instructions
    Show { id: String },
    /// Run a solution against the challenge's test cases
    Run {
        id: String,
        #[arg(long)]
        code: PathBuf,
    },
    /// Run a solution and submit it if every test passes
    Submit {
        id: String,
        #[arg(long)]
        code: PathBuf,
    },
    /// Ask the AI assistant for code to debug
    Generate {
        id: String,
        #[arg(long)]
        prompt: String,
        /// Write the generated code here instead of printing it
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run a solution, then ask for a hint about it
    Hint {
        id: String,
        #[arg(long)]
        code: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    banner::print_banner();

    // A missing .env is fine; the environment may already carry the settings.
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let opt = Opt::parse();
    match exec(opt).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn exec(opt: Opt) -> Result<ExitCode> {
    let mut config = AppConfig::from_env()?;
    if let Some(path) = opt.challenges {
        config.challenges_path = path;
    }

    let backend = Arc::new(HttpBackend::new(config.clone())?);

    match opt.sub {
        SubOpt::Health => health(&backend, &config).await,
        SubOpt::Challenge(sub) => exec_challenge(sub, backend, &config).await,
    }
}

async fn health(backend: &HttpBackend, config: &AppConfig) -> Result<ExitCode> {
    match backend.health().await {
        Ok(true) => {
            println!("✅ {} is up", config.api_base);
            Ok(ExitCode::SUCCESS)
        }
        Ok(false) => {
            println!("⚠️  {} answered but is not healthy", config.api_base);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            println!("❌ {} is not answering: {}", config.api_base, e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn exec_challenge(
    sub: ChallengeOpt,
    backend: Arc<HttpBackend>,
    config: &AppConfig,
) -> Result<ExitCode> {
    let store = Arc::new(ChallengeStore::load(&config.challenges_path)?);
    let mut workspace = Workspace::new(Arc::clone(&store), backend, config);

    match sub {
        ChallengeOpt::List => {
            for challenge in store.iter() {
                let title = challenge.title.as_deref().unwrap_or("");
                println!("• {:<20} {}", challenge.id, title);
            }
            Ok(ExitCode::SUCCESS)
        }
        ChallengeOpt::Show { id } => {
            let Some(challenge) = open(&mut workspace, &store, &id) else {
                return Ok(ExitCode::FAILURE);
            };
            println!("{}", report::format_challenge(challenge));
            Ok(ExitCode::SUCCESS)
        }
        ChallengeOpt::Run { id, code } => {
            if open(&mut workspace, &store, &id).is_none() {
                return Ok(ExitCode::FAILURE);
            }
            workspace.set_code(read_code(&code)?);
            if run(&workspace).await {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        ChallengeOpt::Submit { id, code } => {
            if open(&mut workspace, &store, &id).is_none() {
                return Ok(ExitCode::FAILURE);
            }
            workspace.set_code(read_code(&code)?);
            run(&workspace).await;
            match workspace.submit() {
                SubmitOutcome::Accepted => {
                    println!("{}", report::SUBMIT_SUCCESS);
                    Ok(ExitCode::SUCCESS)
                }
                SubmitOutcome::Rejected => {
                    println!("{}", report::SUBMIT_BLOCKED);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        ChallengeOpt::Generate { id, prompt, out } => {
            if open(&mut workspace, &store, &id).is_none() {
                return Ok(ExitCode::FAILURE);
            }
            workspace.set_prompt(prompt);
            println!("🪄 Generating code...");
            match workspace.generate().await? {
                OneShotOutcome::Delivered(code) => {
                    match out {
                        Some(path) => {
                            std::fs::write(&path, &code)?;
                            println!("✅ Code written to {}", path.display());
                        }
                        None => println!("\n{}", code),
                    }
                    Ok(ExitCode::SUCCESS)
                }
                OneShotOutcome::Failed(message) => {
                    println!("⚠️  Code generation failed: {}", message);
                    println!("   Change the prompt and try again.");
                    Ok(ExitCode::FAILURE)
                }
                OneShotOutcome::Empty => {
                    println!("ℹ️  The generator returned no code.");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        ChallengeOpt::Hint { id, code } => {
            if open(&mut workspace, &store, &id).is_none() {
                return Ok(ExitCode::FAILURE);
            }
            workspace.set_code(read_code(&code)?);
            run(&workspace).await;
            println!("💡 Asking for a hint...");
            match workspace.request_hint().await? {
                Some(OneShotOutcome::Delivered(hint)) => {
                    println!("\n💡 Hint\n{}", hint);
                    Ok(ExitCode::SUCCESS)
                }
                Some(OneShotOutcome::Failed(message)) => {
                    println!("⚠️  {}", message);
                    Ok(ExitCode::FAILURE)
                }
                Some(OneShotOutcome::Empty) | None => {
                    println!("ℹ️  No hint this time.");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

/// Selects `id`, or lists what exists when it is unknown.
fn open<'a, B: Backend>(
    workspace: &'a mut Workspace<B>,
    store: &ChallengeStore,
    id: &str,
) -> Option<&'a Challenge> {
    match workspace.open(id) {
        Ok(challenge) => Some(challenge),
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("Available challenges:");
            for id in store.ids() {
                eprintln!("  • {}", id);
            }
            None
        }
    }
}

fn read_code(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        ClientError::Config(format!("cannot read code from {}: {}", path.display(), e))
    })
}

/// Runs the workspace code and prints the results; true when every test passed.
async fn run<B: Backend>(workspace: &Workspace<B>) -> bool {
    let submitted = workspace.challenge().map(|c| c.test_cases.len()).unwrap_or(0);
    println!("🧪 Running {} test cases...", submitted);
    match workspace.run().await {
        Some(run) => {
            println!("{}", report::format_run(&run, submitted));
            run.passed()
        }
        None => false,
    }
}
