//! CLI command implementations.

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use dvid_client::{DataInstance, KeyValue, Node, Parent, Server};

/// Create a repository and print its uuid.
pub async fn repo_create(server: &Server, alias: &str, description: &str) -> Result<()> {
    let repo = server
        .create_repository(alias, description)
        .await
        .with_context(|| format!("failed to create repository '{alias}'"))?;
    println!("{}", repo.uuid());
    Ok(())
}

/// List repositories, one per line.
pub async fn repo_list(server: &Server) -> Result<()> {
    let repos = server.list_repositories().await?;
    if repos.is_empty() {
        println!("No repositories.");
        return Ok(());
    }
    for repo in repos {
        println!("{}\t{}\t{}", repo.uuid, repo.alias, repo.description);
    }
    Ok(())
}

/// Commit a node.
pub async fn node_commit(node: &Node, note: &str, log: &[String]) -> Result<()> {
    node.commit(note, log)
        .await
        .with_context(|| format!("failed to commit node {}", node.uuid()))?;
    println!("Committed {}", node.uuid());
    Ok(())
}

/// Branch off a node and print the child uuid.
pub async fn node_branch(node: &Node, note: &str) -> Result<()> {
    let child = node
        .branch(note)
        .await
        .with_context(|| format!("failed to branch node {}", node.uuid()))?;
    println!("{}", child.uuid());
    Ok(())
}

/// Print a node's parent.
pub async fn node_parent(node: &Node) -> Result<()> {
    match node.parent().await? {
        Parent::Node(parent) => println!("{}", parent.uuid()),
        Parent::Root => println!("{} is the root node", node.uuid()),
        Parent::Unknown => bail!("node {} not found in repository graph", node.uuid()),
    }
    Ok(())
}

/// Create a dataset.
pub async fn dataset_create(node: &Node, name: &str, type_name: &str, sync: &[String]) -> Result<()> {
    let dataset = node
        .create_dataset(name, type_name, sync)
        .await
        .with_context(|| format!("failed to create dataset '{name}'"))?;
    println!("Created {} ({})", dataset.name(), dataset.kind());
    Ok(())
}

/// Parse `name:type` pairs.
fn parse_pairs(specs: &[String]) -> Result<Vec<(String, String)>> {
    specs
        .iter()
        .map(|spec| match spec.split_once(':') {
            Some((name, type_name)) if !name.is_empty() && !type_name.is_empty() => {
                Ok((name.to_string(), type_name.to_string()))
            }
            _ => bail!("expected name:type, got '{spec}'"),
        })
        .collect()
}

/// Create a group of mutually synced datasets.
pub async fn dataset_sync_group(node: &Node, specs: &[String]) -> Result<()> {
    let pairs = parse_pairs(specs)?;
    let datasets = node.create_mutually_synced_datasets(&pairs[..]).await?;
    for dataset in datasets {
        println!("Created {} ({})", dataset.name(), dataset.kind());
    }
    Ok(())
}

/// Delete a dataset and print the status code.
pub async fn dataset_delete(node: &Node, name: &str) -> Result<()> {
    let status = node.delete_dataset(name).await?;
    println!("{status}");
    if !(200..300).contains(&status) {
        bail!("server answered {status} when deleting '{name}'");
    }
    Ok(())
}

/// Print the value stored under a key.
pub async fn kv_get(node: &Node, dataset: &str, key: &str) -> Result<()> {
    let kv = KeyValue::new(node.clone(), dataset);
    let value = kv.get(key).await?;
    println!("{}", String::from_utf8_lossy(&value));
    Ok(())
}

/// Store a value under a key.
pub async fn kv_put(node: &Node, dataset: &str, key: &str, value: String) -> Result<()> {
    let kv = KeyValue::new(node.clone(), dataset);
    kv.put(key, Bytes::from(value)).await?;
    println!("Stored {key}");
    Ok(())
}

/// List dataset types supported by the server.
pub async fn types(server: &Server) -> Result<()> {
    for type_name in server.server_types().await? {
        println!("{type_name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs(&["a:keyvalue".to_string(), "b:labelblk".to_string()]).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "keyvalue".to_string()),
                ("b".to_string(), "labelblk".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_pairs_rejects_missing_type() {
        assert!(parse_pairs(&["a".to_string()]).is_err());
        assert!(parse_pairs(&["a:".to_string()]).is_err());
    }
}
