use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use codecheck_core::{CodecheckConfig, OutputFormat};
use codecheck_lint::LintOptions;
use codecheck_review::{ConfiguredModel, ReviewPipeline, SuggestionModel};
use codecheck_telegram::{Bot, TelegramClient};

const CONFIG_FILE: &str = ".codecheck.toml";

#[derive(Parser)]
#[command(
    name = "codecheck",
    version,
    about = "Telegram bot that style-checks Python uploads",
    long_about = "codecheck answers Python files and zip archives sent to a Telegram bot with a\n\
                   PEP8 style report and model-generated review suggestions.\n\n\
                   Examples:\n  \
                     codecheck run                     Start the bot (reads TELEGRAM_TOKEN)\n  \
                     codecheck check main.py           Print the report for a local file\n  \
                     codecheck check project.zip -o report.txt\n  \
                     codecheck doctor                  Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .codecheck.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  The report exactly as the bot attaches it (default)\n  \
                         json  Machine-readable JSON with camelCase keys"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Telegram bot
    #[command(long_about = "Run the Telegram bot.\n\n\
        Long-polls the Bot API and answers every uploaded file or archive with a\n\
        report.txt attachment. Stops on Ctrl-C.\n\n\
        Examples:\n  TELEGRAM_TOKEN=123:abc codecheck run\n  codecheck run --no-suggestions")]
    Run {
        /// Bot token (overrides [telegram] token)
        #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Send style reports only, without model suggestions
        #[arg(long)]
        no_suggestions: bool,
    },
    /// Build the report for a local file or zip archive
    #[command(long_about = "Build the report for a local file or zip archive.\n\n\
        Runs the same pipeline the bot runs on uploads. Paths ending in .zip are\n\
        processed as archives; anything else as a single Python file.\n\n\
        Examples:\n  codecheck check main.py\n  codecheck check project.zip --no-suggestions\n  \
        codecheck check main.py --output report.txt")]
    Check {
        /// File or zip archive to check
        path: PathBuf,

        /// Write the report to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Skip the suggestion model
        #[arg(long)]
        no_suggestions: bool,
    },
    /// Create a default .codecheck.toml configuration file
    #[command(long_about = "Create a default .codecheck.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .codecheck.toml already exists.")]
    Init,
    /// Check your codecheck setup and environment
    #[command(long_about = "Check your codecheck setup and environment.\n\n\
        Runs diagnostics for the config file, bot token, model provider and API key.\n\
        Use --format json for machine-readable output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mcodecheck\x1b[0m v{version}: PEP8 reports for Python uploads\n");
        println!("Quick start:");
        println!("  \x1b[36mcodecheck init\x1b[0m            Create a .codecheck.toml config file");
        println!("  \x1b[36mcodecheck run\x1b[0m             Start the Telegram bot");
        println!("  \x1b[36mcodecheck check main.py\x1b[0m   Report on a local file\n");
    } else {
        println!("codecheck v{version}: PEP8 reports for Python uploads\n");
        println!("Quick start:");
        println!("  codecheck init            Create a .codecheck.toml config file");
        println!("  codecheck run             Start the Telegram bot");
        println!("  codecheck check main.py   Report on a local file\n");
    }

    println!("Run 'codecheck <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "codecheck=debug"
    } else {
        "codecheck=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<CodecheckConfig> {
    match path {
        Some(path) => CodecheckConfig::from_file(path)
            .wrap_err_with(|| format!("loading {}", path.display())),
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                Ok(CodecheckConfig::from_file(default_path)?)
            } else {
                Ok(CodecheckConfig::default())
            }
        }
    }
}

fn build_pipeline(config: &CodecheckConfig, suggestions: bool) -> Result<ReviewPipeline<ConfiguredModel>> {
    let model = ConfiguredModel::from_config(&config.model)?;
    let pipeline = ReviewPipeline::new(
        model,
        LintOptions::from_config(&config.lint),
        config.report.clone(),
    );
    Ok(if suggestions {
        pipeline
    } else {
        pipeline.without_suggestions()
    })
}

fn spinner(message: &'static str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

fn run_doctor(config: &CodecheckConfig, format: OutputFormat, use_color: bool) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Config file
    if Path::new(CONFIG_FILE).exists() {
        checks.push(CheckResult::pass("config_file", format!("{CONFIG_FILE} found")));
    } else {
        checks.push(CheckResult::info(
            "config_file",
            format!("{CONFIG_FILE} not found, using defaults"),
        ));
    }

    // 2. Bot token
    match config.bot_token() {
        Ok(_) => checks.push(CheckResult::pass("telegram_token", "bot token configured")),
        Err(_) => checks.push(CheckResult::fail(
            "telegram_token",
            "TELEGRAM_TOKEN not set",
            "export TELEGRAM_TOKEN=... or set token under [telegram]",
        )),
    }
    checks.push(CheckResult::info(
        "telegram_api",
        format!(
            "{} (poll timeout {}s)",
            config.telegram.api_base, config.telegram.poll_timeout_secs
        ),
    ));

    // 3. Model provider + API key
    let model = &config.model;
    match ConfiguredModel::from_config(model) {
        Ok(_) => checks.push(CheckResult::pass(
            "model_provider",
            format!("{} (model: {})", model.provider, model.model),
        )),
        Err(e) => checks.push(CheckResult::fail(
            "model_provider",
            e.to_string(),
            "set provider = \"huggingface\" or \"openai\" under [model]",
        )),
    }
    let key_env = model.api_key_env();
    if model.resolved_api_key().is_some() {
        checks.push(CheckResult::pass("model_api_key", format!("{key_env} set")));
    } else {
        checks.push(CheckResult::fail(
            "model_api_key",
            format!("{key_env} not set"),
            format!("export {key_env}=... or set api_key under [model]"),
        ));
    }

    // 4. Style checker
    checks.push(CheckResult::info(
        "lint",
        format!(
            "max line length {}, ignoring {}",
            config.lint.max_line_length,
            config.lint.ignore.join(",")
        ),
    ));

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Text => {
            let version = env!("CARGO_PKG_VERSION");
            println!("codecheck v{version}: environment check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<20} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# codecheck configuration

[telegram]
# token = "123456:ABC..."          # or export TELEGRAM_TOKEN
# api_base = "https://api.telegram.org"
# poll_timeout_secs = 30
# retry_delay_secs = 5

[model]
# provider = "huggingface"         # or "openai"
# model = "Salesforce/codet5-base"
# api_key = "..."                  # or export HF_TOKEN / OPENAI_API_KEY
# base_url = "https://api-inference.huggingface.co"
# max_input_tokens = 512
# max_output_tokens = 512
# timeout_secs = 120

[lint]
# max_line_length = 79
# select = []
# ignore = ["E121", "E123", "E126", "E226", "E24", "E704", "W503", "W504"]

[report]
# file_name = "report.txt"
# archive_suggestions = false   # model suggestions for archive entries too
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Run {
            token,
            no_suggestions,
        }) => {
            let mut config = load_config(cli.config.as_deref())?;
            if token.is_some() {
                config.telegram.token = token;
            }
            let token = config.bot_token()?;
            let client = TelegramClient::new(&token, &config.telegram)?;
            let pipeline = build_pipeline(&config, !no_suggestions)?;
            tracing::info!(
                model = pipeline.model().name(),
                suggestions = !no_suggestions,
                "starting bot"
            );
            Bot::new(client, pipeline, config.telegram.clone()).run().await;
        }
        Some(Command::Check {
            path,
            output,
            no_suggestions,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let bytes = std::fs::read(&path)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let pipeline = build_pipeline(&config, !no_suggestions)?;

            let spinner = if no_suggestions {
                None
            } else {
                spinner("Requesting model suggestions...")
            };
            let report = pipeline
                .review_upload(&file_name, &bytes)
                .await
                .inspect_err(|_| {
                    if let Some(pb) = &spinner {
                        pb.finish_with_message("Failed");
                    }
                })?;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            let rendered = match cli.format {
                OutputFormat::Json => serde_json::to_string_pretty(&report).into_diagnostic()?,
                OutputFormat::Text => report.content.clone(),
            };
            match output {
                Some(out) => {
                    std::fs::write(&out, &rendered)
                        .into_diagnostic()
                        .wrap_err_with(|| format!("writing {}", out.display()))?;
                    eprintln!("Report written to {}", out.display());
                }
                None => println!("{rendered}"),
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor) => {
            let config = load_config(cli.config.as_deref())?;
            run_doctor(&config, cli.format, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "codecheck", &mut std::io::stdout());
        }
    }

    Ok(())
}
