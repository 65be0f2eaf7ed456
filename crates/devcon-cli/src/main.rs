use std::fs;
use std::io::{BufWriter, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use devcon_cli::{demo, init_tracing, Shell, ShellConfig, StdConsole, TraceEmitter, Value};
use devcon_parse::parse_str;

#[derive(Parser, Debug)]
#[command(name = "devcon")]
#[command(about = "devcon: developer-console expression language")]
struct Cli {
    #[command(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Common {
    /// Nested function calls allowed before evaluation fails
    #[arg(long, global = true)]
    max_call_depth: Option<u32>,

    /// JSON file with shell settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a source file against the demo host world
    Eval {
        /// Path to console source
        file: Option<PathBuf>,

        /// Evaluate this source text instead of a file
        #[arg(long, conflicts_with = "file")]
        expr: Option<String>,

        /// Write a JSONL trace of host calls to this file
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Interactive console on stdin/stdout
    Repl {
        /// JSON object whose entries become global bindings
        #[arg(long)]
        globals: Option<PathBuf>,
    },

    /// Parse a source file and dump the AST
    Parse {
        /// Path to console source
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
}

#[derive(ValueEnum, Clone, Debug)]
enum Format {
    Pretty,
    Json,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli.common)?;

    match cli.command {
        Commands::Eval { file, expr, trace } => cmd_eval(config, file, expr, trace),
        Commands::Repl { globals } => cmd_repl(config, globals),
        Commands::Parse { file, format } => cmd_parse(&file, format, config.max_source_size),
    }
}

fn load_config(common: &Common) -> Result<ShellConfig> {
    let mut config = match &common.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            ShellConfig::from_json(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ShellConfig::default(),
    };
    if let Some(depth) = common.max_call_depth {
        config.max_call_depth = depth;
    }
    Ok(config)
}

fn read_source(path: &Path, limit: usize) -> Result<String> {
    let src =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if src.len() > limit {
        bail!(
            "source file {} is {} bytes, limit is {}",
            path.display(),
            src.len(),
            limit
        );
    }
    Ok(src)
}

/// Bind `player` the way the game does before the first command.
fn bind_player(shell: &Shell) -> Result<()> {
    let player = demo::spawn_player(shell.host(), "player").map_err(|e| anyhow!("{e}"))?;
    shell.set_global("player", player);
    Ok(())
}

fn cmd_eval(
    config: ShellConfig,
    file: Option<PathBuf>,
    expr: Option<String>,
    trace: Option<PathBuf>,
) -> Result<()> {
    let src = match (file, expr) {
        (_, Some(src)) => src,
        (Some(path), None) => read_source(&path, config.max_source_size)?,
        (None, None) => bail!("nothing to evaluate: pass a file or --expr"),
    };

    let mut shell = Shell::with_host(StdConsole::new(), demo::registry(), config);
    if let Some(path) = &trace {
        let file = fs::File::create(path)
            .with_context(|| format!("creating trace {}", path.display()))?;
        shell = shell.with_tracer(TraceEmitter::new(Box::new(BufWriter::new(file)))?);
    }
    bind_player(&shell)?;

    let result = shell.eval(&src);
    shell.finish(result.is_ok())?;
    let value = result.map_err(|e| anyhow!("{e}"))?;
    if !matches!(value, Value::Null) {
        println!("{value}");
    }
    if let Some(path) = trace {
        eprintln!("Trace written to {}", path.display());
    }
    Ok(())
}

fn cmd_repl(config: ShellConfig, globals: Option<PathBuf>) -> Result<()> {
    let console = if std::io::stdin().is_terminal() {
        StdConsole::interactive("> ").context("starting the line editor")?
    } else {
        StdConsole::new()
    };
    let mut shell = Shell::with_host(console, demo::registry(), config);
    bind_player(&shell)?;
    if let Some(path) = globals {
        seed_globals(&shell, &path)?;
    }

    let failures = shell.run();
    shell.finish(failures == 0)?;
    Ok(())
}

/// Install the entries of a JSON object file as global bindings.
fn seed_globals(shell: &Shell, path: &Path) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading globals {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing globals {}", path.display()))?;
    let serde_json::Value::Object(entries) = json else {
        bail!("globals file {} must hold a JSON object", path.display());
    };
    for (name, v) in entries {
        let value = json_to_value(&v).with_context(|| format!("global `{name}`"))?;
        shell.set_global(&name, value);
    }
    Ok(())
}

fn json_to_value(v: &serde_json::Value) -> Result<Value> {
    use serde_json::Value as J;
    Ok(match v {
        J::Null => Value::Null,
        J::Bool(b) => Value::Bool(*b),
        J::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => match i32::try_from(i) {
                Ok(small) => Value::Int(small),
                Err(_) => Value::Long(i),
            },
            (None, Some(f)) => Value::Float(f),
            (None, None) => bail!("number {n} is out of range"),
        },
        J::String(s) => Value::Str(s.clone()),
        J::Array(items) => Value::list(items.iter().map(json_to_value).collect::<Result<_>>()?),
        J::Object(_) => bail!("nested objects have no console representation"),
    })
}

fn cmd_parse(file: &Path, format: Format, limit: usize) -> Result<()> {
    let src = read_source(file, limit)?;
    let program = parse_str(&src)
        .with_context(|| format!("parsing {}", file.display()))?;

    match format {
        Format::Pretty => println!("{:#?}", program),
        Format::Json => println!("{}", serde_json::to_string_pretty(&program)?),
    }
    Ok(())
}
