#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "lin: multi-parent hierarchies with a closure table",
    long_about = None
)]
struct Cli {
    /// Enable debug logging for lineage crates.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format; overrides `--json` and `LINEAGE_FORMAT`.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Store path; defaults to `[store].path` from `.lineage/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }

    fn store_options(&self) -> cmd::StoreOptions {
        cmd::StoreOptions {
            db: self.db.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a lineage project",
        long_about = "Write .lineage/config.toml and create the hierarchy store.",
        after_help = "EXAMPLES:\n    # Initialize with the default collection\n    lin init\n\n    # Name the collection and let roots keep parents\n    lin init --collection tags --allow-root-and-parent"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Nodes",
        about = "Create nodes",
        long_about = "Create one node per name. Each starts as a root unless --parent or --plinko places it.",
        after_help = "EXAMPLES:\n    # Create two roots\n    lin add walrus ivory\n\n    # Create a child of node 1\n    lin add \"walrus ivory\" --parent 1\n\n    # Place by name under the root named hemp\n    lin add \"hemp fibre\" \"hemp fibre rope\" --plinko hemp"
    )]
    Add(cmd::nodes::AddArgs),

    #[command(
        next_help_heading = "Nodes",
        about = "Delete a node",
        long_about = "Detach a node from its parents and children, then delete it. Orphaned children become roots.",
        after_help = "EXAMPLES:\n    # Delete by id\n    lin rm 4\n\n    # Delete by unique name\n    lin rm \"walrus ivory\""
    )]
    Rm(cmd::nodes::RmArgs),

    #[command(
        next_help_heading = "Nodes",
        about = "Rename a node",
        after_help = "EXAMPLES:\n    lin rename 4 \"walrus tusk ivory\""
    )]
    Rename(cmd::nodes::RenameArgs),

    #[command(
        next_help_heading = "Links",
        about = "Link a parent to a child",
        long_about = "Add a parent → child link and every ancestor/descendant row it implies. `root` as the parent marks the child as a root.",
        after_help = "EXAMPLES:\n    # Link by id\n    lin link 1 4\n\n    # Link by name\n    lin link walrus \"walrus ivory\"\n\n    # Mark node 4 as a root\n    lin link root 4"
    )]
    Link(cmd::link::LinkArgs),

    #[command(
        next_help_heading = "Links",
        about = "Remove a parent → child link",
        long_about = "Remove one link and repair the closure rows of everything around it. A child left without parents becomes a root.",
        after_help = "EXAMPLES:\n    lin unlink 1 4\n\n    # Drop the root marker of a node that also has a parent\n    lin unlink root 4"
    )]
    Unlink(cmd::link::LinkArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one node",
        long_about = "Show a node with its parents, children, ancestors and descendants.",
        after_help = "EXAMPLES:\n    lin show 4\n\n    # Emit machine-readable output\n    lin show walrus --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(next_help_heading = "Read", about = "List root nodes")]
    Roots,

    #[command(next_help_heading = "Read", about = "List nodes without children")]
    Leaves,

    #[command(
        next_help_heading = "Read",
        about = "Print the hierarchy",
        long_about = "Print every parentless node with its descendants. A node with several parents appears under each one.",
        after_help = "EXAMPLES:\n    lin tree\n\n    # Nested JSON\n    lin tree --json"
    )]
    Tree,

    #[command(
        next_help_heading = "Classify",
        about = "Place a node under a root by name",
        long_about = "Link the candidate under the nodes of the root's subtree whose names share the most words with it. A parent's words must all appear in the candidate's name.",
        after_help = "EXAMPLES:\n    lin plinko hemp \"hemp fibre rope\""
    )]
    Plinko(cmd::classify::PlinkoArgs),

    #[command(
        next_help_heading = "Classify",
        about = "Arrange nodes by name",
        long_about = "Group nodes by word count; the shortest names become roots and longer names are placed under them.",
        after_help = "EXAMPLES:\n    # Arrange the whole collection from scratch\n    lin reorganize --reset\n\n    # Arrange a few nodes, keeping existing links\n    lin reorganize walrus \"walrus ivory\""
    )]
    Reorganize(cmd::classify::ReorganizeArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Check the closure table",
        long_about = "Recompute the closure from the links and report every mismatch. Exits non-zero when any is found.",
        after_help = "EXAMPLES:\n    lin verify\n\n    lin verify --json"
    )]
    Verify,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("LINEAGE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "lineage=debug,lin=debug,info"
        } else {
            "lineage=info,lin=info,warn"
        })
    });

    let format = env::var("LINEAGE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output; logs go to stderr.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_root = env::current_dir()?;
    let output = cli.output_mode();
    let store = cli.store_options();
    debug!(?output, root = %project_root.display(), "lin starting");

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, &store, output, &project_root),
        Commands::Add(args) => cmd::nodes::run_add(args, &store, output, &project_root),
        Commands::Rm(args) => cmd::nodes::run_rm(args, &store, output, &project_root),
        Commands::Rename(args) => cmd::nodes::run_rename(args, &store, output, &project_root),
        Commands::Link(args) => cmd::link::run_link(args, &store, output, &project_root),
        Commands::Unlink(args) => cmd::link::run_unlink(args, &store, output, &project_root),
        Commands::Show(args) => cmd::show::run_show(args, &store, output, &project_root),
        Commands::Roots => cmd::list::run_roots(&store, output, &project_root),
        Commands::Leaves => cmd::list::run_leaves(&store, output, &project_root),
        Commands::Tree => cmd::tree::run_tree(&store, output, &project_root),
        Commands::Plinko(args) => cmd::classify::run_plinko(args, &store, output, &project_root),
        Commands::Reorganize(args) => {
            cmd::classify::run_reorganize(args, &store, output, &project_root)
        }
        Commands::Verify => cmd::verify::run_verify(&store, output, &project_root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_before_and_after_subcommand() {
        let cli = Cli::parse_from(["lin", "--json", "roots"]);
        assert!(cli.json);
        let cli = Cli::parse_from(["lin", "roots", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn format_flag_overrides_json() {
        let cli = Cli::parse_from(["lin", "--json", "--format", "text", "tree"]);
        assert_eq!(cli.output_mode(), OutputMode::Text);
    }

    #[test]
    fn db_flag_is_global() {
        let cli = Cli::parse_from(["lin", "verify", "--db", "/tmp/x.db"]);
        assert_eq!(cli.store_options().db, Some(PathBuf::from("/tmp/x.db")));
    }

    #[test]
    fn link_accepts_root_keyword() {
        let cli = Cli::parse_from(["lin", "link", "root", "7"]);
        let Commands::Link(args) = cli.command else {
            panic!("expected link");
        };
        assert_eq!(args.parent, cmd::ROOT_KEYWORD);
        assert_eq!(args.child, "7");
    }

    #[test]
    fn add_requires_a_name() {
        assert!(Cli::try_parse_from(["lin", "add"]).is_err());
        assert!(Cli::try_parse_from(["lin", "add", "a", "--parent", "1", "--plinko", "2"]).is_err());
    }

    #[test]
    fn reorganize_takes_optional_nodes() {
        let cli = Cli::parse_from(["lin", "reorganize", "--reset"]);
        let Commands::Reorganize(args) = cli.command else {
            panic!("expected reorganize");
        };
        assert!(args.reset);
        assert!(args.nodes.is_empty());
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["lin", "init"],
            vec!["lin", "add", "x"],
            vec!["lin", "rm", "x"],
            vec!["lin", "rename", "x", "y"],
            vec!["lin", "link", "x", "y"],
            vec!["lin", "unlink", "x", "y"],
            vec!["lin", "show", "x"],
            vec!["lin", "roots"],
            vec!["lin", "leaves"],
            vec!["lin", "tree"],
            vec!["lin", "plinko", "x", "y"],
            vec!["lin", "reorganize"],
            vec!["lin", "verify"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "Failed to parse {args:?}: {:?}", result.err());
        }
    }
}
