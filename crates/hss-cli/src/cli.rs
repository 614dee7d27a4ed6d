use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hss",
    about = "HSS: hierarchical storage service",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Server used by client commands
    #[arg(long, global = true, default_value = "http://localhost:9000")]
    pub server: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HSS server
    Serve(ServeArgs),
    /// List a directory
    Ls(LsArgs),
    /// Create a directory (and any missing parents)
    Mkdir(MkdirArgs),
    /// Recursively delete a directory
    Rmdir(PathArgs),
    /// Show directory information
    Stat(PathArgs),
    /// Upload a local file
    Put(PutArgs),
    /// Download a file
    Get(GetArgs),
    /// Show file size, digest and metadata
    Head(PathArgs),
    /// Delete a file
    Rm(PathArgs),
    /// Interactive shell
    Shell,
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Store root, overrides the configuration file
    #[arg(long)]
    pub root: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Management console address
    #[arg(long)]
    pub console: Option<SocketAddr>,
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(default_value = "/")]
    pub path: String,
    /// Long listing
    #[arg(short = 'l', long = "long")]
    pub long: bool,
}

#[derive(Args)]
pub struct PathArgs {
    pub path: String,
}

#[derive(Args)]
pub struct MkdirArgs {
    pub path: String,
    /// Metadata entry, repeatable
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
    pub meta: Vec<(String, String)>,
}

#[derive(Args)]
pub struct PutArgs {
    pub local: PathBuf,
    pub remote: String,
    /// Metadata entry, repeatable
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
    pub meta: Vec<(String, String)>,
    /// Upload as a multipart body with parts of this many bytes
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub part_size: Option<u64>,
}

#[derive(Args)]
pub struct GetArgs {
    pub remote: String,
    /// Destination, defaults to the remote file name
    pub local: Option<PathBuf>,
}

fn parse_meta(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from([
            "hss", "serve", "--root", "/data", "--bind", "0.0.0.0:8080", "--console", "127.0.0.1:8081",
        ])
        .unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.root, Some(PathBuf::from("/data")));
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
            assert_eq!(args.console.map(|a| a.port()), Some(8081));
            assert!(args.config.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve_rejects_bad_address() {
        assert!(Cli::try_parse_from(["hss", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_ls_defaults_to_root() {
        let cli = Cli::try_parse_from(["hss", "ls"]).unwrap();
        if let Command::Ls(args) = cli.command {
            assert_eq!(args.path, "/");
            assert!(!args.long);
        } else { panic!("wrong command"); }
        assert_eq!(cli.server, "http://localhost:9000");
    }

    #[test]
    fn parse_ls_long() {
        let cli = Cli::try_parse_from(["hss", "ls", "-l", "docs"]).unwrap();
        if let Command::Ls(args) = cli.command {
            assert!(args.long);
            assert_eq!(args.path, "docs");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_mkdir_with_metadata() {
        let cli = Cli::try_parse_from([
            "hss", "mkdir", "docs", "--meta", "team=storage", "--meta", "tier=a=b",
        ])
        .unwrap();
        if let Command::Mkdir(args) = cli.command {
            assert_eq!(args.path, "docs");
            assert_eq!(
                args.meta,
                vec![
                    ("team".to_string(), "storage".to_string()),
                    ("tier".to_string(), "a=b".to_string()),
                ]
            );
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_meta_requires_key() {
        assert!(Cli::try_parse_from(["hss", "mkdir", "d", "--meta", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["hss", "mkdir", "d", "--meta", "=v"]).is_err());
    }

    #[test]
    fn parse_put() {
        let cli = Cli::try_parse_from([
            "hss", "put", "./a.txt", "docs/a.txt", "--part-size", "1024",
        ])
        .unwrap();
        if let Command::Put(args) = cli.command {
            assert_eq!(args.local, PathBuf::from("./a.txt"));
            assert_eq!(args.remote, "docs/a.txt");
            assert_eq!(args.part_size, Some(1024));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_put_rejects_zero_part_size() {
        assert!(Cli::try_parse_from(["hss", "put", "a", "b", "--part-size", "0"]).is_err());
    }

    #[test]
    fn parse_get() {
        let cli = Cli::try_parse_from(["hss", "get", "docs/a.txt"]).unwrap();
        if let Command::Get(args) = cli.command {
            assert_eq!(args.remote, "docs/a.txt");
            assert!(args.local.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_simple_path_commands() {
        for (name, check) in [
            ("rmdir", (|c: &Command| matches!(c, Command::Rmdir(_))) as fn(&Command) -> bool),
            ("stat", |c| matches!(c, Command::Stat(_))),
            ("head", |c| matches!(c, Command::Head(_))),
            ("rm", |c| matches!(c, Command::Rm(_))),
        ] {
            let cli = Cli::try_parse_from(["hss", name, "x"]).unwrap();
            assert!(check(&cli.command), "{name}");
        }
    }

    #[test]
    fn parse_global_server() {
        let cli = Cli::try_parse_from(["hss", "shell", "--server", "http://10.0.0.5:9000"]).unwrap();
        assert!(matches!(cli.command, Command::Shell));
        assert_eq!(cli.server, "http://10.0.0.5:9000");
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["hss", "--verbose", "ls"]).unwrap();
        assert!(cli.verbose);
    }
}
