//! dvid CLI - Command-line interface for versioned data-store servers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dvid_client::{ClientConfig, Server};

mod commands;
mod logging;

/// dvid - Versioned data-store client
#[derive(Parser, Debug)]
#[command(name = "dvid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API base URL (overrides the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format (pretty or json)
    #[arg(long, default_value = "pretty", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Commit, branch and inspect nodes
    Node {
        #[command(subcommand)]
        command: NodeCommands,
    },

    /// Create and delete datasets
    Dataset {
        #[command(subcommand)]
        command: DatasetCommands,
    },

    /// Read and write key-value datasets
    Kv {
        #[command(subcommand)]
        command: KvCommands,
    },

    /// List dataset types supported by the server
    Types,

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
enum RepoCommands {
    /// Create a repository and print its uuid
    Create {
        /// Repository alias
        alias: String,
        /// Repository description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List repositories
    List,
}

#[derive(Subcommand, Debug)]
enum NodeCommands {
    /// Commit a node
    Commit {
        /// Repository uuid
        repo: String,
        /// Node uuid (may be abbreviated)
        uuid: String,
        /// Commit note
        #[arg(short, long)]
        note: String,
        /// Commit log line (repeatable)
        #[arg(short, long)]
        log: Vec<String>,
    },

    /// Branch off a node and print the child uuid
    Branch {
        /// Repository uuid
        repo: String,
        /// Node uuid (may be abbreviated)
        uuid: String,
        /// Branch note
        #[arg(short, long)]
        note: String,
    },

    /// Print the parent of a node
    Parent {
        /// Repository uuid
        repo: String,
        /// Node uuid (may be abbreviated)
        uuid: String,
    },
}

#[derive(Subcommand, Debug)]
enum DatasetCommands {
    /// Create a dataset
    Create {
        /// Repository uuid
        repo: String,
        /// Node to create through (defaults to the root node)
        #[arg(long)]
        node: Option<String>,
        /// Dataset name
        name: String,
        /// Dataset type name
        type_name: String,
        /// Datasets to sync with, comma separated
        #[arg(short, long, value_delimiter = ',')]
        sync: Vec<String>,
    },

    /// Create a group of mutually synced datasets
    SyncGroup {
        /// Repository uuid
        repo: String,
        /// Datasets as name:type (at least two)
        #[arg(required = true, num_args = 2..)]
        datasets: Vec<String>,
    },

    /// Delete a dataset and print the status code
    Delete {
        /// Repository uuid
        repo: String,
        /// Dataset name
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum KvCommands {
    /// Print the value stored under a key
    Get {
        /// Repository uuid
        repo: String,
        /// Node uuid
        uuid: String,
        /// Dataset name
        dataset: String,
        /// Key
        key: String,
    },

    /// Store a value under a key
    Put {
        /// Repository uuid
        repo: String,
        /// Node uuid
        uuid: String,
        /// Dataset name
        dataset: String,
        /// Key
        key: String,
        /// Value
        value: String,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let config = match &cli.config {
        Some(path) => ClientConfig::from_yaml_file(path)?,
        None => ClientConfig::default(),
    };
    Ok(match &cli.api_url {
        Some(url) => config.with_api_url(url.clone()),
        None => config,
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    logging::init_logging(log_level, logging::LogFormat::parse(&cli.log_format));

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let server = Server::with_config(&config)?;
    tracing::debug!(api_url = %server.api_url(), "Using server");

    match cli.command {
        Commands::Repo { command } => match command {
            RepoCommands::Create { alias, description } => {
                commands::repo_create(&server, &alias, &description).await
            }
            RepoCommands::List => commands::repo_list(&server).await,
        },
        Commands::Node { command } => match command {
            NodeCommands::Commit {
                repo,
                uuid,
                note,
                log,
            } => commands::node_commit(&server.open_repository(repo).node(uuid), &note, &log).await,
            NodeCommands::Branch { repo, uuid, note } => {
                commands::node_branch(&server.open_repository(repo).node(uuid), &note).await
            }
            NodeCommands::Parent { repo, uuid } => {
                commands::node_parent(&server.open_repository(repo).node(uuid)).await
            }
        },
        Commands::Dataset { command } => match command {
            DatasetCommands::Create {
                repo,
                node,
                name,
                type_name,
                sync,
            } => {
                let repo = server.open_repository(repo);
                let node = node.map_or_else(|| repo.root_node(), |uuid| repo.node(uuid));
                commands::dataset_create(&node, &name, &type_name, &sync).await
            }
            DatasetCommands::SyncGroup { repo, datasets } => {
                commands::dataset_sync_group(&server.open_repository(repo).root_node(), &datasets)
                    .await
            }
            DatasetCommands::Delete { repo, name } => {
                commands::dataset_delete(&server.open_repository(repo).root_node(), &name).await
            }
        },
        Commands::Kv { command } => match command {
            KvCommands::Get {
                repo,
                uuid,
                dataset,
                key,
            } => {
                let node = server.open_repository(repo).node(uuid);
                commands::kv_get(&node, &dataset, &key).await
            }
            KvCommands::Put {
                repo,
                uuid,
                dataset,
                key,
                value,
            } => {
                let node = server.open_repository(repo).node(uuid);
                commands::kv_put(&node, &dataset, &key, value).await
            }
        },
        Commands::Types => commands::types(&server).await,
        Commands::Version => {
            println!("dvid {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_sync_list() {
        let cli = Cli::try_parse_from([
            "dvid", "dataset", "create", "abcd", "labels", "labelblk", "--sync", "bodies,other",
        ])
        .unwrap();

        match cli.command {
            Commands::Dataset {
                command: DatasetCommands::Create { sync, .. },
            } => assert_eq!(sync, vec!["bodies", "other"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_sync_group_needs_two_datasets() {
        let result = Cli::try_parse_from(["dvid", "dataset", "sync-group", "abcd", "a:keyvalue"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_api_url_flag_overrides_default() {
        let cli =
            Cli::try_parse_from(["dvid", "--api-url", "http://emdata:9000/api", "repo", "list"])
                .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.api_url, "http://emdata:9000/api");
    }
}
