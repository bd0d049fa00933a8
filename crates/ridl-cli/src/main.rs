//! ridl - interface compiler driver
//!
//! Loads one or more parsed AST documents, runs the semantic passes,
//! and writes the selected output families. Any resolution or
//! structural failure aborts the whole run with a nonzero exit status;
//! no partial output is trustworthy after one.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use termcolor::{ColorChoice, StandardStream};

use ridl_ast::{Document, NodeArena, NodeKind};
use ridl_gen::{Backend, EmitConfig};
use ridl_meta::MetaOptions;
use ridl_sema::{Diagnostics, SemaOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Family {
    /// C++ pure-interface headers
    Header,
    /// C++ messenger proxy and dispatch headers
    Messenger,
    /// C++ static-dispatch bridge templates
    Bridge,
    /// Java interfaces
    Java,
}

impl Family {
    fn backend(self) -> Backend {
        match self {
            Family::Header => Backend::Header,
            Family::Messenger => Backend::Messenger,
            Family::Bridge => Backend::Bridge,
            Family::Java => Backend::Java,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "ridl", about = "Interface compiler and code generator", version)]
struct Options {
    /// Parsed AST documents (JSON) of the unit being compiled
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Documents included by the unit; their declarations resolve but
    /// are never re-emitted
    #[arg(short = 'I', long = "include")]
    includes: Vec<PathBuf>,

    /// Output families to generate
    #[arg(short = 'e', long = "emit", value_enum, default_values_t = [Family::Header])]
    emit: Vec<Family>,

    /// Output directory root; one subdirectory per family
    #[arg(short = 'o', long = "output", default_value = "out")]
    output: PathBuf,

    /// C++ type used for the IDL string type
    #[arg(long = "string-type", default_value = "std::string")]
    string_type: String,

    /// Concrete class substituted for the universal base object
    #[arg(long = "object-type", default_value = "Object")]
    object_type: String,

    /// Qualified IDL name of the universal base object
    #[arg(long = "base-object", default_value = "Object")]
    base_object: String,

    /// Default namespace prefix for generated names
    #[arg(long = "default-prefix", default_value = "::")]
    default_prefix: String,

    /// Fold every mixin into the dispatch surface, not only
    /// supplemental ones
    #[arg(long = "import-implements")]
    import_implements: bool,

    /// Suppress throw() specifications for raises lists
    #[arg(long = "no-exceptions")]
    no_exceptions: bool,

    /// Indent unit for generated sources
    #[arg(long = "indent", default_value = "    ")]
    indent: String,

    /// Dump the resolved tree to stdout and exit
    #[arg(long = "dump-tree")]
    dump_tree: bool,
}

fn main() -> ExitCode {
    let options = Options::parse();
    let mut diags = Diagnostics::new();
    match run(&options, &mut diags) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            match error.downcast_ref::<ridl_sema::SemaError>() {
                Some(sema) => diags.emit_error(sema),
                None => eprintln!("ridl: {error:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(options: &Options, diags: &mut Diagnostics) -> Result<()> {
    let sema_opts = SemaOptions {
        base_object: options.base_object.clone(),
        default_prefix: options.default_prefix.clone(),
        import_implements: options.import_implements,
    };

    let mut arena = NodeArena::new();
    let mut sources = Vec::new();
    for path in &options.includes {
        sources.push(load(&mut arena, diags, path, 2)?);
    }
    for path in &options.inputs {
        sources.push(load(&mut arena, diags, path, 1)?);
    }

    ridl_sema::run_passes(&mut arena, &sema_opts, diags)?;

    if options.dump_tree {
        dump(&arena, arena.root(), 0);
        return Ok(());
    }

    let meta_opts = MetaOptions {
        object_type: options.object_type.clone(),
        base_object: options.base_object.clone(),
    };
    let tables = ridl_meta::synthesize(&arena, &meta_opts)?;
    for collision in &tables.collisions {
        eprintln!("warning: {collision}");
    }

    for &source in &sources {
        ridl_gen::forward::splice(&mut arena, &sema_opts, source)?;
    }

    let cfg = EmitConfig {
        string_type: options.string_type.clone(),
        object_type: options.object_type.clone(),
        base_object: options.base_object.clone(),
        default_prefix: options.default_prefix.clone(),
        use_exceptions: !options.no_exceptions,
        indent: options.indent.clone(),
    };

    for family in dedup(&options.emit) {
        let artifacts =
            ridl_gen::emit_all(&arena, &sema_opts, &tables, &cfg, &[family.backend()])?;
        let family_dir = options.output.join(match family {
            Family::Header => "header",
            Family::Messenger => "messenger",
            Family::Bridge => "bridge",
            Family::Java => "java",
        });
        for artifact in artifacts {
            let path = family_dir.join(&artifact.path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(&path, artifact.contents)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{}", path.display());
        }
    }

    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    diags
        .emit_warnings(&mut stderr)
        .context("emitting warnings")?;
    Ok(())
}

fn dedup(families: &[Family]) -> Vec<Family> {
    let mut out = Vec::new();
    for &family in families {
        if !out.contains(&family) {
            out.push(family);
        }
    }
    out
}

fn load(
    arena: &mut NodeArena,
    diags: &mut Diagnostics,
    path: &Path,
    rank: u32,
) -> Result<ridl_ast::FileId> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let document: Document = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    let file = diags.add_file(
        document.source.clone(),
        document.text.clone().unwrap_or_default(),
    );
    document
        .lower(arena, file, rank)
        .with_context(|| format!("lowering {}", path.display()))?;
    Ok(file)
}

fn dump(arena: &NodeArena, node: ridl_ast::NodeId, depth: usize) {
    let indent = "  ".repeat(depth);
    let kind = match &arena.node(node).kind {
        NodeKind::Module(_) => "module",
        NodeKind::Interface(_) => {
            if arena.is_leaf(node) {
                "interface (forward)"
            } else {
                "interface"
            }
        }
        NodeKind::Exception(_) => "exception",
        NodeKind::Implements(_) => "implements",
        NodeKind::ScopedName => "scoped-name",
        NodeKind::Type => "type",
        NodeKind::NativeType => "native",
        NodeKind::Sequence(_) => "sequence",
        NodeKind::Array(_) => "array",
        NodeKind::Member(data) => {
            if data.is_typedef {
                "typedef"
            } else {
                "member"
            }
        }
        NodeKind::Attribute(_) => "attribute",
        NodeKind::Const(_) => "const",
        NodeKind::Op(_) => "operation",
        NodeKind::Param(_) => "parameter",
        NodeKind::BinaryExpr => "binary",
        NodeKind::UnaryExpr => "unary",
        NodeKind::Literal => "literal",
    };
    println!("{indent}{kind} {}", arena.name(node));
    for &child in arena.children(node) {
        dump(arena, child, depth + 1);
    }
    if let Some(data) = arena.interface(node) {
        if let Some(ctor) = data.constructor {
            dump(arena, ctor, depth + 1);
        }
    }
}
