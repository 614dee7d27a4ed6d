use std::path::PathBuf;

use anyhow::{bail, Context};
use colored::Colorize;
use hss_server::{init_logging, HssServer, ServerConfig};
use hss_store::{ContentDigest, EntryKind, ListEntry, Metadata};
use tracing_subscriber::EnvFilter;

use crate::cli::*;
use crate::client::HssClient;
use crate::shell;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        command => {
            init_client_logging(cli.verbose);
            let client = HssClient::new(&cli.server)?;
            run_client_command(&client, command).await
        }
    }
}

async fn run_client_command(client: &HssClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Serve(_) => bail!("`serve` does not talk to a remote server"),
        Command::Ls(args) => cmd_ls(client, args).await,
        Command::Mkdir(args) => cmd_mkdir(client, args).await,
        Command::Rmdir(args) => {
            client.delete_directory(&args.path).await?;
            println!("{} Deleted directory {}", "✓".green().bold(), args.path.bold());
            Ok(())
        }
        Command::Stat(args) => cmd_stat(client, args).await,
        Command::Put(args) => cmd_put(client, args).await,
        Command::Get(args) => cmd_get(client, args).await,
        Command::Head(args) => cmd_head(client, args).await,
        Command::Rm(args) => {
            client.delete_file(&args.path).await?;
            println!("{} Deleted {}", "✓".green().bold(), args.path.bold());
            Ok(())
        }
        Command::Shell => shell::run(client).await,
    }
}

fn init_client_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(root) = args.root {
        config.store.root = root;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.console.is_some() {
        config.console_addr = args.console;
    }

    // Held until the server stops so buffered file logs are flushed.
    let _log_guard = init_logging(&config.logging)?;
    let server = HssServer::new(config)?;
    server.serve().await?;
    Ok(())
}

async fn cmd_ls(client: &HssClient, args: LsArgs) -> anyhow::Result<()> {
    let entries = client.list(&args.path).await?;
    print_listing(&entries, args.long);
    Ok(())
}

pub(crate) fn print_listing(entries: &[ListEntry], long: bool) {
    let mut sorted: Vec<&ListEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    for entry in sorted {
        println!("{}", format_entry(entry, long));
    }
}

fn format_entry(entry: &ListEntry, long: bool) -> String {
    let name = match entry.kind {
        EntryKind::Directory => format!("{}/", entry.name).blue().bold().to_string(),
        EntryKind::File => entry.name.clone(),
    };
    if !long {
        return name;
    }
    let modified = entry
        .last_modified
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into());
    format!("- {:<9} {:>12} {} {}", entry.kind.to_string(), entry.size, modified, name)
}

async fn cmd_mkdir(client: &HssClient, args: MkdirArgs) -> anyhow::Result<()> {
    let metadata: Metadata = args.meta.into_iter().collect();
    let record = client.create_directory(&args.path, &metadata).await?;
    println!("{} Created directory {}", "✓".green().bold(), record.path.bold());
    Ok(())
}

async fn cmd_stat(client: &HssClient, args: PathArgs) -> anyhow::Result<()> {
    let record = client.directory_info(&args.path).await?;
    println!("{}  {}", "Path:".bold(), record.path);
    println!("{}  {}", "Created:".bold(), record.created.to_rfc3339());
    println!("{}  {}", "Size:".bold(), record.size);
    println!("{}  {}", "Files:".bold(), record.files_count);
    print_metadata(&record.metadata);
    Ok(())
}

async fn cmd_put(client: &HssClient, args: PutArgs) -> anyhow::Result<()> {
    let data = tokio::fs::read(&args.local)
        .await
        .with_context(|| format!("reading {}", args.local.display()))?;
    let local = ContentDigest::of(&data);
    let part_size = args
        .part_size
        .map(usize::try_from)
        .transpose()
        .context("part size does not fit in memory")?;
    let metadata: Metadata = args.meta.into_iter().collect();

    let record = client.upload(&args.remote, data, &metadata, part_size).await?;
    if let Some(md5) = &record.md5 {
        if *md5 != local.md5 {
            bail!("digest mismatch for {}: sent {}, stored {}", record.key, local.md5, md5);
        }
    }
    println!(
        "{} Uploaded {} ({} bytes, md5 {})",
        "✓".green().bold(),
        record.key.bold(),
        record.size,
        local.md5.cyan()
    );
    Ok(())
}

async fn cmd_get(client: &HssClient, args: GetArgs) -> anyhow::Result<()> {
    let destination = match args.local {
        Some(path) => path,
        None => default_destination(&args.remote)?,
    };
    let (data, md5) = client.download(&args.remote).await?;
    if let Some(expected) = md5 {
        let actual = ContentDigest::of(&data).md5;
        if actual != expected {
            bail!("digest mismatch for {}: expected {expected}, received {actual}", args.remote);
        }
    }
    tokio::fs::write(&destination, &data)
        .await
        .with_context(|| format!("writing {}", destination.display()))?;
    println!(
        "{} Downloaded {} to {} ({} bytes)",
        "✓".green().bold(),
        args.remote.bold(),
        destination.display(),
        data.len()
    );
    Ok(())
}

fn default_destination(remote: &str) -> anyhow::Result<PathBuf> {
    match remote.rsplit('/').find(|s| !s.is_empty()) {
        Some(name) => Ok(PathBuf::from(name)),
        None => bail!("cannot derive a local file name from `{remote}`"),
    }
}

async fn cmd_head(client: &HssClient, args: PathArgs) -> anyhow::Result<()> {
    let head = client.head_file(&args.path).await?;
    println!("{}  {}", "Size:".bold(), head.size);
    println!("{}  {}", "MD5:".bold(), head.md5.as_deref().unwrap_or("-"));
    print_metadata(&head.metadata);
    Ok(())
}

fn print_metadata(metadata: &Metadata) {
    if metadata.is_empty() {
        return;
    }
    println!("{}", "Metadata:".bold());
    for (key, value) in metadata {
        println!("  {} = {}", key.yellow(), value);
    }
}
