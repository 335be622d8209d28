use std::sync::Arc;

use facet::Facet;
use figue as args;
use pyframe::capture::sim::{CodeObject, SimInterpreter};
use tracing::info;

const DEFAULT_DEPTH: u32 = 4;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    /// Number of nested calls to build before capturing.
    #[facet(args::named, default)]
    depth: Option<u32>,
    /// Summary lines to keep; negative keeps all.
    #[facet(args::named, default)]
    keep: Option<i64>,
    /// Do not echo the diagnostic render to stdout.
    #[facet(args::named, default)]
    quiet: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = parse_cli()?;
    let config = pyframe::init().map_err(|e| e.to_string())?;
    pyframe::init_logging(&config.log_filter);

    let depth = cli.depth.unwrap_or(DEFAULT_DEPTH);
    let keep = cli.keep.unwrap_or(pyframe::DEFAULT_KEEP);
    let verbose = if cli.quiet { 0 } else { pyframe::DEFAULT_VERBOSE };

    let interp = SimInterpreter::new();
    let script = Script::new(depth);
    info!(depth, keep, "running simulated call chain");

    let (diagnostic, summary) = interp.call(Arc::clone(&script.entry), 12, || {
        script.descend(&interp, 0, || {
            (
                pyframe::render_diagnostic(&interp, verbose),
                pyframe::render_summary(&interp, keep),
            )
        })
    });

    if cli.quiet {
        info!(bytes = diagnostic.len(), "diagnostic render suppressed");
    }
    println!("--- summary (keep={keep}) ---");
    for line in summary {
        println!("{line}");
    }
    Ok(())
}

/// Code objects for a small recursive program:
/// `<module>` calls `handle` which recurses through `step` `depth` times.
struct Script {
    entry: Arc<CodeObject>,
    handle: Arc<CodeObject>,
    step: Arc<CodeObject>,
    depth: u32,
}

impl Script {
    fn new(depth: u32) -> Self {
        Self {
            entry: Arc::new(CodeObject::new("demo/main.py", "<module>", 1)),
            handle: Arc::new(CodeObject::new("demo/server.py", "handle", 20)),
            step: Arc::new(CodeObject::new("demo/steps.py", "step", 5)),
            depth,
        }
    }

    fn descend<R>(&self, interp: &SimInterpreter, level: u32, at_bottom: impl FnOnce() -> R) -> R {
        if level == 0 {
            return interp.call(Arc::clone(&self.handle), 23, || {
                self.descend(interp, 1, at_bottom)
            });
        }
        if level > self.depth {
            return at_bottom();
        }
        interp.call(Arc::clone(&self.step), 7 + level % 3, || {
            self.descend(interp, level + 1, at_bottom)
        })
    }
}

fn parse_cli() -> Result<Cli, String> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("pyframe-demo")
                .description("Capture and render a simulated interpreter call stack")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();
    let cli = args::Driver::new(figue_config)
        .run()
        .into_result()
        .map_err(|e| e.to_string())?;
    Ok(cli.value)
}
