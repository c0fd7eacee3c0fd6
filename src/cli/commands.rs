use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::cli::args::{
    Cli, Commands, ConfigCommands, DomainCommands, NodeCommands, SchemaCommands,
};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{
    check_levels, DomainError, DomainTree, Network, NodeId, NodePatch, SetOutcome,
    TreeNodeConvert,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Some(Commands::Config { command }) => _config(cli, command),
        Some(Commands::Schema { command }) => _schema(&container(cli)?, command),
        Some(Commands::Domain { command }) => _domain(&container(cli)?, command),
        Some(Commands::Node { command }) => _node(&container(cli)?, command),
        None => Ok(()),
    }
}

fn settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(store) = &cli.store {
        settings.store_dir = store.clone();
    }
    Ok(settings)
}

fn container(cli: &Cli) -> CliResult<ServiceContainer> {
    let settings = settings(cli)?;
    let container = if cli.memory {
        ServiceContainer::in_memory(settings)?
    } else {
        debug!("Using store {}", settings.store_dir.display());
        ServiceContainer::new(settings)?
    };
    Ok(container)
}

fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| InfraError::io(format!("read {}", path.display()), e).into())
}

fn load_domain(c: &ServiceContainer, name: &str) -> CliResult<DomainTree> {
    c.domains()
        .load(name)?
        .ok_or_else(|| ApplicationError::NotFound(format!("domain '{}'", name)).into())
}

fn resolve(tree: &DomainTree, path: &str) -> CliResult<NodeId> {
    tree.find_path(path)
        .ok_or_else(|| DomainError::NodeNotFound(path.to_string()).into())
}

#[instrument(skip(cli))]
fn _config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings(cli)?.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => match global_config_path() {
            Some(path) => output::info(&path.display()),
            None => output::warning("no config directory on this platform"),
        },
    }
    Ok(())
}

#[instrument(skip(c))]
fn _schema(c: &ServiceContainer, command: &SchemaCommands) -> CliResult<()> {
    let schemas = c.schemas();
    match command {
        SchemaCommands::List => {
            for name in schemas.names() {
                output::info(&name);
            }
        }
        SchemaCommands::Get { name } => {
            if !schemas.contains(name) {
                return Err(ApplicationError::NotFound(format!("schema '{}'", name)).into());
            }
            output::info(&schemas.get_levels(name).iter().join(" > "));
        }
        SchemaCommands::Create { name, levels } => {
            check_levels(levels).map_err(|source| ApplicationError::InvalidLevels {
                name: name.clone(),
                source,
            })?;
            schemas.create(name)?;
            if !levels.is_empty() {
                schemas.replace_levels(name, levels.clone())?;
            }
            output::success(&format!("Created schema {}", name));
        }
        SchemaCommands::Set { name, levels } => {
            schemas.replace_levels(name, levels.clone())?;
            output::success(&format!("{}: {}", name, levels.iter().join(" > ")));
        }
        SchemaCommands::Delete { name } => match schemas.delete(name)? {
            Some(levels) => output::success(&format!(
                "Deleted schema {} ({})",
                name,
                levels.iter().join(" > ")
            )),
            None => output::warning(&format!("schema '{}' does not exist", name)),
        },
        SchemaCommands::Load { file } => {
            schemas.load_record(&read_file(file)?)?;
            output::success(&format!("Loaded {} schema(s)", schemas.names().len()));
        }
    }
    Ok(())
}

#[instrument(skip(c))]
fn _domain(c: &ServiceContainer, command: &DomainCommands) -> CliResult<()> {
    let domains = c.domains();
    match command {
        DomainCommands::List => {
            for name in domains.names()? {
                output::info(&name);
            }
        }
        DomainCommands::Show { name } => {
            let bytes = domains
                .fetch(name)?
                .ok_or_else(|| ApplicationError::NotFound(format!("domain '{}'", name)))?;
            output::info(&String::from_utf8_lossy(&bytes));
        }
        DomainCommands::Tree { name } => {
            let tree = load_domain(c, name)?;
            output::info(&tree.to_tree_string());
        }
        DomainCommands::New { name, schema } => {
            let mut tree = domains.create(name, schema)?;
            let version = domains.save(&mut tree)?;
            output::success(&format!("Created domain {} (version {})", name, version));
        }
        DomainCommands::Import { name, file } => {
            let tree = domains.import(name, &read_file(file)?)?;
            output::success(&format!(
                "Imported domain {}: {} node(s), version {}",
                name,
                tree.len() - 1,
                tree.version()
            ));
        }
        DomainCommands::Delete { name } => match domains.delete(name)? {
            Some(_) => output::success(&format!("Deleted domain {}", name)),
            None => output::warning(&format!("domain '{}' does not exist", name)),
        },
    }
    Ok(())
}

#[instrument(skip(c))]
fn _node(c: &ServiceContainer, command: &NodeCommands) -> CliResult<()> {
    match command {
        NodeCommands::Add {
            domain,
            kind,
            name,
            parent,
            network,
            dry_run,
        } => {
            let mut tree = load_domain(c, domain)?;
            let parent = parent.as_deref().map(|p| resolve(&tree, p)).transpose()?;
            if *dry_run {
                tree.check_add(kind, parent, name, network)?;
                output::success(&format!("{} {} can be added", kind, name));
                return Ok(());
            }
            let id = tree.add_node(kind, parent, name, network)?;
            let version = c.domains().save(&mut tree)?;
            output::success(&format!(
                "Added {} {} (version {})",
                tree.path_of(id)?,
                tree.node(id)?.network,
                version
            ));
        }
        NodeCommands::Find { domain, kind, name } => {
            let tree = load_domain(c, domain)?;
            for id in tree.get_node(kind, name.as_deref()) {
                let data = tree.node(id)?;
                output::allocation(&tree.path_of(id)?, &data.kind, &data.network);
            }
        }
        NodeCommands::Set {
            domain,
            path,
            name,
            network,
            dry_run,
        } => {
            let patch = NodePatch {
                name: name.clone(),
                network: network.clone(),
            };
            if patch.is_empty() {
                return Err(CliError::Usage("nothing to change, use --name or --network".into()));
            }
            let mut tree = load_domain(c, domain)?;
            let id = resolve(&tree, path)?;
            let outcome = if *dry_run {
                tree.check_set(id, &patch)?
            } else {
                tree.set_node(id, &patch)?
            };
            if let SetOutcome::Rejected(reason) = outcome {
                return Err(CliError::Rejected(reason));
            }
            if *dry_run {
                output::success(&format!("{} can be changed", path));
                return Ok(());
            }
            let version = c.domains().save(&mut tree)?;
            output::success(&format!("Updated {} (version {})", tree.path_of(id)?, version));
        }
        NodeCommands::Rm {
            domain,
            path,
            force,
        } => {
            let mut tree = load_domain(c, domain)?;
            let id = resolve(&tree, path)?;
            let removed = tree.remove_node(id, *force)?;
            let version = c.domains().save(&mut tree)?;
            output::success(&format!(
                "Removed {} node(s) at {} (version {})",
                removed, path, version
            ));
        }
        NodeCommands::Search { domain, network } => {
            let tree = load_domain(c, domain)?;
            let id = tree.search_by_network(Network::parse(network)?, None)?;
            let data = tree.node(id)?;
            output::allocation(&tree.path_of(id)?, &data.kind, &data.network);
        }
        NodeCommands::Available {
            domain,
            path,
            prefix,
            limit,
        } => {
            let tree = load_domain(c, domain)?;
            let id = match path {
                Some(path) => resolve(&tree, path)?,
                None => tree.root(),
            };
            let limit = limit.unwrap_or(c.settings.available_limit);
            let free = tree.available_networks(id, *prefix, limit)?;
            output::header(&format!("{} free in {}", free.len(), tree.node(id)?.network));
            for block in free {
                output::detail(&block);
            }
        }
    }
    Ok(())
}
