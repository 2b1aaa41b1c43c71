//! bddtrack CLI - Manual BDD test tracking for Gherkin feature files.

use bddtrack::action_log::{self, ActionLog};
use bddtrack::cli::{
    Cli, Commands, ConfigCommands, FeatureCommands, ProjectCommands, ReportCommands, RunCommands,
    SystemCommands,
};
use bddtrack::commands::run::Target;
use bddtrack::commands::{self, Output, Store, parse_environment_opt, parse_outcome};
use bddtrack::config::{
    ConfigOverrides, OutputFormat, ResolvedConfig, config_dir, load_config, resolve_config,
};
use bddtrack::ids::UuidGenerator;
use bddtrack::models::Environment;
use bddtrack::storage::{BackendType, ProjectStore, get_data_dir, open_backend};
use bddtrack::{Error, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "BDT_LOG";

/// Paths and settings shared by every command.
struct Context {
    data_dir: PathBuf,
    config_dir: PathBuf,
    overrides: ConfigOverrides,
    config: ResolvedConfig,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self> {
        let data_dir = get_data_dir(cli.data_dir.as_deref())?;
        let config_dir = config_dir()?;
        let file = load_config(&config_dir)?;

        let overrides = overrides(cli)?;
        let config = resolve_config(&file, &overrides)?;
        Ok(Self {
            data_dir,
            config_dir,
            overrides,
            config,
        })
    }

    fn open_store(&self) -> Result<Store> {
        let backend = open_backend(self.config.backend.value, &self.data_dir)?;
        Ok(ProjectStore::new(backend, Arc::new(UuidGenerator)))
    }

    /// Environment argument, or the configured default.
    fn environment(&self, arg: Option<&str>) -> Result<Environment> {
        Ok(parse_environment_opt(arg)?.unwrap_or(self.config.default_environment.value))
    }
}

fn overrides(cli: &Cli) -> Result<ConfigOverrides> {
    let mut overrides = ConfigOverrides::new();
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    if let Some(backend) = &cli.backend {
        let backend = BackendType::parse(backend)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown backend: {}", backend)))?;
        overrides = overrides.with_backend(backend);
    }
    Ok(overrides)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let context = match Context::load(&cli) {
        Ok(context) => context,
        Err(e) => exit_with_error(&e, cli.human_readable),
    };
    let human = context.config.is_human();

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    let start = Instant::now();
    let result = run_command(cli.command, &context, human);
    let duration = start.elapsed().as_millis() as u64;

    if context.config.action_log.value {
        let (success, error) = match &result {
            Ok(_) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        let entry = ActionLog::new(&cmd_name, &args_json, success, error, duration);
        action_log::log_action(&context.data_dir, &entry);
    }

    if let Err(e) = result {
        exit_with_error(&e, human);
    }
}

fn exit_with_error(error: &Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", error);
    } else {
        eprintln!("{}", serde_json::json!({ "error": error.to_string() }));
    }
    process::exit(1);
}

fn run_command(command: Commands, ctx: &Context, human: bool) -> Result<()> {
    match command {
        Commands::Project { command } => {
            let mut store = ctx.open_store()?;
            match command {
                ProjectCommands::Create { name, description } => {
                    let result = commands::project::project_create(&mut store, &name, description.as_deref())?;
                    output(&result, human);
                }
                ProjectCommands::List => {
                    let result = commands::project::project_list(&store)?;
                    output(&result, human);
                }
                ProjectCommands::Show { project } => {
                    let result = commands::project::project_show(&store, &project)?;
                    output(&result, human);
                }
                ProjectCommands::Delete { project } => {
                    let result = commands::project::project_delete(&mut store, &project)?;
                    output(&result, human);
                }
                ProjectCommands::Export { project, output: path } => {
                    let result = commands::project::project_export(&store, &project, path.as_deref())?;
                    output(&result, human);
                }
                ProjectCommands::Import { file } => {
                    let result = commands::project::project_import(&mut store, &file)?;
                    output(&result, human);
                }
            }
        }

        Commands::Feature { command } => {
            let mut store = ctx.open_store()?;
            match command {
                FeatureCommands::Upload { project, file } => {
                    let result = commands::feature::feature_upload(&mut store, &project, &file)?;
                    output(&result, human);
                }
                FeatureCommands::List { project } => {
                    let result = commands::feature::feature_list(&store, &project)?;
                    output(&result, human);
                }
                FeatureCommands::Show { project, feature } => {
                    let result = commands::feature::feature_show(&store, &project, &feature)?;
                    output(&result, human);
                }
            }
        }

        Commands::Run { command } => {
            let mut store = ctx.open_store()?;
            run_subcommand(&mut store, command, ctx, human)?;
        }

        Commands::Report { command } => {
            let store = ctx.open_store()?;
            match command {
                ReportCommands::History {
                    project,
                    feature,
                    environment,
                } => {
                    let environment = parse_environment_opt(environment.as_deref())?;
                    let result = commands::report::report_history(&store, &project, &feature, environment)?;
                    output(&result, human);
                }
                ReportCommands::Compare {
                    project,
                    feature,
                    environment,
                    before,
                    after,
                } => {
                    let environment = ctx.environment(environment.as_deref())?;
                    let result = commands::report::report_compare(
                        &store,
                        &project,
                        &feature,
                        environment,
                        &before,
                        &after,
                    )?;
                    output(&result, human);
                }
            }
        }

        Commands::Docs { project, feature, run } => {
            let store = ctx.open_store()?;
            let result = commands::report::docs_render(&store, &project, &feature, run.as_deref())?;
            output(&result, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => {
                let result = commands::config::config_get(&ctx.config_dir, &key)?;
                output(&result, human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config::config_set(&ctx.config_dir, &key, &value)?;
                output(&result, human);
            }
            ConfigCommands::List => {
                let result = commands::config::config_list(&ctx.config_dir, &ctx.overrides)?;
                output(&result, human);
            }
        },

        Commands::System { command } => match command {
            SystemCommands::Info => {
                let store = ctx.open_store()?;
                let result = commands::system::system_info(&store, &ctx.data_dir, &ctx.config_dir, &ctx.config)?;
                output(&result, human);
            }
            SystemCommands::Compact => {
                let result = commands::system::system_compact(&ctx.data_dir, ctx.config.backend.value)?;
                output(&result, human);
            }
            SystemCommands::Actions { limit } => {
                let result = commands::system::system_actions(&ctx.data_dir, limit)?;
                output(&result, human);
            }
        },
    }
    Ok(())
}

fn run_subcommand(store: &mut Store, command: RunCommands, ctx: &Context, human: bool) -> Result<()> {
    match command {
        RunCommands::Start {
            project,
            feature,
            environment,
            version,
        } => {
            let environment = ctx.environment(environment.as_deref())?;
            let result = commands::run::run_start(store, &project, &feature, environment, &version)?;
            output(&result, human);
        }
        RunCommands::Open {
            project,
            feature,
            environment,
            version,
        } => {
            let environment = ctx.environment(environment.as_deref())?;
            let result = commands::run::run_open(store, &project, &feature, environment, &version)?;
            output(&result, human);
        }
        RunCommands::List {
            project,
            feature,
            environment,
        } => {
            let environment = parse_environment_opt(environment.as_deref())?;
            let result = commands::run::run_list(&*store, &project, feature.as_deref(), environment)?;
            output(&result, human);
        }
        RunCommands::Show { project, run, status } => {
            let status = status.as_deref().map(parse_outcome).transpose()?;
            let result = commands::run::run_show(&*store, &project, &run, status)?;
            output(&result, human);
        }
        RunCommands::Step {
            project,
            run,
            step,
            outcome,
        } => {
            let result = commands::run::run_step(store, &project, &run, &step, parse_outcome(&outcome)?)?;
            output(&result, human);
        }
        RunCommands::Scenario {
            project,
            run,
            scenario,
            outcome,
        } => {
            let result =
                commands::run::run_scenario(store, &project, &run, &scenario, parse_outcome(&outcome)?)?;
            output(&result, human);
        }
        RunCommands::Bulk {
            project,
            run,
            outcome,
            scenarios,
        } => {
            let result = commands::run::run_bulk(store, &project, &run, &scenarios, parse_outcome(&outcome)?)?;
            output(&result, human);
        }
        RunCommands::Note {
            project,
            run,
            step,
            scenario,
            text,
        } => {
            let target = Target::from_args(step.as_deref(), scenario.as_deref())?;
            let result = commands::run::run_note(store, &project, &run, target, &text)?;
            output(&result, human);
        }
        RunCommands::Attach {
            project,
            run,
            step,
            scenario,
            file,
            mime,
        } => {
            let target = Target::from_args(step.as_deref(), scenario.as_deref())?;
            let result = commands::run::run_attach(store, &project, &run, target, &file, mime.as_deref())?;
            output(&result, human);
        }
        RunCommands::Complete { project, run } => {
            let result = commands::run::run_complete(store, &project, &run)?;
            output(&result, human);
        }
        RunCommands::Reset { project, run } => {
            let result = commands::run::run_reset(store, &project, &run)?;
            output(&result, human);
        }
        RunCommands::ResetFeature { project, feature } => {
            let result = commands::run::run_reset_feature(store, &project, &feature)?;
            output(&result, human);
        }
        RunCommands::ResetAll { project } => {
            let result = commands::run::run_reset_all(store, &project)?;
            output(&result, human);
        }
    }
    Ok(())
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Command name and arguments for the action log.
fn serialize_command(command: &Commands) -> (String, serde_json::Value) {
    use serde_json::json;

    match command {
        Commands::Project { command } => match command {
            ProjectCommands::Create { name, description } => (
                "project create".to_string(),
                json!({ "name": name, "description": description }),
            ),
            ProjectCommands::List => ("project list".to_string(), json!({})),
            ProjectCommands::Show { project } => {
                ("project show".to_string(), json!({ "project": project }))
            }
            ProjectCommands::Delete { project } => {
                ("project delete".to_string(), json!({ "project": project }))
            }
            ProjectCommands::Export { project, output } => (
                "project export".to_string(),
                json!({ "project": project, "output": output }),
            ),
            ProjectCommands::Import { file } => {
                ("project import".to_string(), json!({ "file": file }))
            }
        },

        Commands::Feature { command } => match command {
            FeatureCommands::Upload { project, file } => (
                "feature upload".to_string(),
                json!({ "project": project, "file": file }),
            ),
            FeatureCommands::List { project } => {
                ("feature list".to_string(), json!({ "project": project }))
            }
            FeatureCommands::Show { project, feature } => (
                "feature show".to_string(),
                json!({ "project": project, "feature": feature }),
            ),
        },

        Commands::Run { command } => match command {
            RunCommands::Start {
                project,
                feature,
                environment,
                version,
            } => (
                "run start".to_string(),
                json!({ "project": project, "feature": feature, "environment": environment, "version": version }),
            ),
            RunCommands::Open {
                project,
                feature,
                environment,
                version,
            } => (
                "run open".to_string(),
                json!({ "project": project, "feature": feature, "environment": environment, "version": version }),
            ),
            RunCommands::List {
                project,
                feature,
                environment,
            } => (
                "run list".to_string(),
                json!({ "project": project, "feature": feature, "environment": environment }),
            ),
            RunCommands::Show { project, run, status } => (
                "run show".to_string(),
                json!({ "project": project, "run": run, "status": status }),
            ),
            RunCommands::Step {
                project,
                run,
                step,
                outcome,
            } => (
                "run step".to_string(),
                json!({ "project": project, "run": run, "step": step, "outcome": outcome }),
            ),
            RunCommands::Scenario {
                project,
                run,
                scenario,
                outcome,
            } => (
                "run scenario".to_string(),
                json!({ "project": project, "run": run, "scenario": scenario, "outcome": outcome }),
            ),
            RunCommands::Bulk {
                project,
                run,
                outcome,
                scenarios,
            } => (
                "run bulk".to_string(),
                json!({ "project": project, "run": run, "outcome": outcome, "scenarios": scenarios }),
            ),
            RunCommands::Note {
                project,
                run,
                step,
                scenario,
                text,
            } => (
                "run note".to_string(),
                json!({ "project": project, "run": run, "step": step, "scenario": scenario, "text": text }),
            ),
            RunCommands::Attach {
                project,
                run,
                step,
                scenario,
                file,
                mime,
            } => (
                "run attach".to_string(),
                json!({
                    "project": project,
                    "run": run,
                    "step": step,
                    "scenario": scenario,
                    "file": file,
                    "mime": mime,
                }),
            ),
            RunCommands::Complete { project, run } => (
                "run complete".to_string(),
                json!({ "project": project, "run": run }),
            ),
            RunCommands::Reset { project, run } => (
                "run reset".to_string(),
                json!({ "project": project, "run": run }),
            ),
            RunCommands::ResetFeature { project, feature } => (
                "run reset-feature".to_string(),
                json!({ "project": project, "feature": feature }),
            ),
            RunCommands::ResetAll { project } => {
                ("run reset-all".to_string(), json!({ "project": project }))
            }
        },

        Commands::Report { command } => match command {
            ReportCommands::History {
                project,
                feature,
                environment,
            } => (
                "report history".to_string(),
                json!({ "project": project, "feature": feature, "environment": environment }),
            ),
            ReportCommands::Compare {
                project,
                feature,
                environment,
                before,
                after,
            } => (
                "report compare".to_string(),
                json!({
                    "project": project,
                    "feature": feature,
                    "environment": environment,
                    "before": before,
                    "after": after,
                }),
            ),
        },

        Commands::Docs { project, feature, run } => (
            "docs".to_string(),
            json!({ "project": project, "feature": feature, "run": run }),
        ),

        Commands::Config { command } => match command {
            ConfigCommands::Get { key } => ("config get".to_string(), json!({ "key": key })),
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                json!({ "key": key, "value": value }),
            ),
            ConfigCommands::List => ("config list".to_string(), json!({})),
        },

        Commands::System { command } => match command {
            SystemCommands::Info => ("system info".to_string(), json!({})),
            SystemCommands::Compact => ("system compact".to_string(), json!({})),
            SystemCommands::Actions { limit } => {
                ("system actions".to_string(), json!({ "limit": limit }))
            }
        },
    }
}
