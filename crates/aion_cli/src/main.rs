//! `aion-verilog`: parse and elaborate a synthesizable-subset Verilog-2005
//! design into a flattened netlist.

mod blif;

use std::path::PathBuf;
use std::process::ExitCode;

use aion_common::{Ident, Interner};
use aion_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use aion_elaborate::{elaborate_design, ModuleRegistry};
use aion_ir::Netlist;
use aion_source::SourceDb;
use aion_verilog_parser::{lex, VerilogParser};
use clap::Parser;

/// Parses and elaborates a synthesizable-subset Verilog-2005 design into a
/// flattened netlist.
#[derive(Debug, Parser)]
#[command(name = "aion-verilog", version, about)]
struct Cli {
    /// Path to the Verilog source file to compile.
    file: PathBuf,

    /// Name of the top-level module to elaborate.
    ///
    /// Defaults to `top` in `aion.toml` next to the source file, or the
    /// last module declared in the source file if neither is given.
    #[arg(long)]
    top: Option<String>,

    /// Print the parsed AST as JSON before elaborating.
    #[arg(long)]
    verbose: bool,

    /// Write a best-effort BLIF netlist to this path.
    #[arg(long, value_name = "PATH")]
    emit_blif: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let interner = Interner::new();
    let mut source_db = SourceDb::new();
    let sink = DiagnosticSink::new();

    let file_id = source_db.load_file(&cli.file)?;
    let source = source_db.get_file(file_id).content.clone();

    let tokens = lex(&source, file_id, &sink);
    let mut parser = VerilogParser::new(tokens, &source, file_id, &interner, &sink);
    let parsed = parser.parse_source_file();

    if cli.verbose {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    }

    let top = resolve_top(cli, &interner);
    let files = [parsed];
    let registry = ModuleRegistry::from_parsed_design(&files, &interner, &sink);
    let netlist = elaborate_design(top, &registry, &interner, &source_db, &sink);

    render_diagnostics(&sink, &source_db);

    let Some(netlist) = netlist else {
        return Ok(false);
    };

    print_summary(&netlist, &interner);

    if let Some(path) = &cli.emit_blif {
        blif::write_blif(&netlist, &interner, path)?;
    }

    Ok(!sink.has_errors())
}

/// Resolves the top module name, preferring `--top`, then `aion.toml`'s
/// `project.top`, and leaving the choice to `elaborate_design`'s own
/// "last module declared" default otherwise.
fn resolve_top(cli: &Cli, interner: &Interner) -> Option<Ident> {
    if let Some(name) = &cli.top {
        return Some(interner.get_or_intern(name));
    }
    let project_dir = cli.file.parent().unwrap_or_else(|| std::path::Path::new("."));
    aion_config::load_config(project_dir)
        .ok()
        .and_then(|cfg| cfg.project.top)
        .map(|name| interner.get_or_intern(&name))
}

fn render_diagnostics(sink: &DiagnosticSink, source_db: &SourceDb) {
    let renderer = TerminalRenderer::new(true, 100);
    for diag in sink.diagnostics() {
        eprint!("{}", renderer.render(&diag, source_db));
    }
}

fn print_summary(netlist: &Netlist, interner: &Interner) {
    println!(
        "module `{}`: {} cells, {} nets",
        interner.resolve(netlist.top_name),
        netlist.cells.len(),
        netlist.nets.len(),
    );
}
