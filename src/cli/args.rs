//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// IP address management: schema-constrained IPv4 allocation trees
#[derive(Parser, Debug)]
#[command(name = "ipam")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short = 'd', long = "debug", action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file layered over the global config
    #[arg(long, global = true, env = "IPAM_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides store_dir from config)
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub store: Option<PathBuf>,

    /// Use an ephemeral in-memory store
    #[arg(long, global = true, conflicts_with = "store")]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage schema templates
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Manage domains
    Domain {
        #[command(subcommand)]
        command: DomainCommands,
    },

    /// Allocate, inspect and change nodes of a domain
    Node {
        #[command(subcommand)]
        command: NodeCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// List schema names
    List,
    /// Show the levels of a schema
    Get { name: String },
    /// Create a schema, optionally with its levels
    Create { name: String, levels: Vec<String> },
    /// Replace the levels of a schema
    Set {
        name: String,
        #[arg(required = true)]
        levels: Vec<String>,
    },
    /// Delete a schema
    Delete { name: String },
    /// Replace the whole registry from a JSON record
    Load {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum DomainCommands {
    /// List domain names
    List,
    /// Print the stored document
    Show { name: String },
    /// Print the domain as a tree
    Tree { name: String },
    /// Create an empty domain bound to a schema
    New {
        name: String,
        #[arg(short, long)]
        schema: String,
    },
    /// Create or update a domain from a JSON document
    Import {
        name: String,
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Delete a domain
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
pub enum NodeCommands {
    /// Allocate a node
    Add {
        domain: String,
        /// Schema level type
        kind: String,
        name: String,
        /// Parent path, e.g. Australia/Brisbane (default: domain root)
        #[arg(short, long)]
        parent: Option<String>,
        /// CIDR block (default: whole address space)
        #[arg(short, long, default_value = "")]
        network: String,
        /// Validate only
        #[arg(long)]
        dry_run: bool,
    },
    /// Find nodes by type and optional name
    Find {
        domain: String,
        kind: String,
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Rename a node or change its network
    Set {
        domain: String,
        path: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short = 'N', long)]
        network: Option<String>,
        /// Validate only
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove a node and its subtree
    Rm {
        domain: String,
        path: String,
        #[arg(short, long)]
        force: bool,
    },
    /// Deepest node containing a network
    Search { domain: String, network: String },
    /// Free blocks inside a node
    Available {
        domain: String,
        /// Node path (default: domain root)
        path: Option<String>,
        /// List blocks of exactly this prefix length
        #[arg(short, long)]
        prefix: Option<u8>,
        /// Maximum number of blocks with --prefix (default: available_limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Print an annotated config template
    Template,
    /// Show the global config file location
    Path,
}
