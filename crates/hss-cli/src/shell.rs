//! Interactive prompt for browsing a store.

use std::io::Write;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::HssClient;
use crate::commands::print_listing;

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Ls { path: Option<String>, long: bool },
    Cd(String),
    Pwd,
    Rmdir(String),
    Help,
    Exit,
    Empty,
}

fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(ShellCommand::Empty);
    };
    let args: Vec<&str> = words.collect();
    match name {
        "ls" => {
            let long = args.contains(&"-l");
            let mut paths = args.iter().filter(|a| **a != "-l");
            let path = paths.next().map(|p| p.to_string());
            if paths.next().is_some() {
                return Err("usage: ls [-l] [dir]".into());
            }
            Ok(ShellCommand::Ls { path, long })
        }
        "cd" => match args.as_slice() {
            [] => Ok(ShellCommand::Cd("/".into())),
            [dir] => Ok(ShellCommand::Cd(dir.to_string())),
            _ => Err("usage: cd [dir]".into()),
        },
        "rmdir" => match args.as_slice() {
            [dir] => Ok(ShellCommand::Rmdir(dir.to_string())),
            _ => Err("usage: rmdir <dir>".into()),
        },
        "pwd" => Ok(ShellCommand::Pwd),
        "help" | "?" => Ok(ShellCommand::Help),
        "exit" | "quit" => Ok(ShellCommand::Exit),
        other => Err(format!("unknown command: {other}")),
    }
}

/// Resolve `arg` against the working directory.
///
/// `.` and `..` are handled here so the server only ever sees plain
/// segments; `..` at the root stays at the root.
fn join(cwd: &str, arg: &str) -> String {
    let mut segments: Vec<&str> = if arg.starts_with('/') {
        Vec::new()
    } else {
        cwd.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in arg.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

const HELP: &str = "\
commands:
  ls [-l] [dir]   list a directory
  cd [dir]        change directory
  pwd             print the working directory
  rmdir <dir>     delete a directory and its contents
  exit            leave the shell";

pub async fn run(client: &HssClient) -> anyhow::Result<()> {
    let mut cwd = String::from("/");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", format!("hss:{cwd}>").cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            return Ok(());
        };
        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message.red());
                continue;
            }
        };

        let result = match command {
            ShellCommand::Empty => Ok(()),
            ShellCommand::Exit => return Ok(()),
            ShellCommand::Help => {
                println!("{HELP}");
                Ok(())
            }
            ShellCommand::Pwd => {
                println!("{cwd}");
                Ok(())
            }
            ShellCommand::Ls { path, long } => {
                let target = join(&cwd, path.as_deref().unwrap_or("."));
                client
                    .list(&target)
                    .await
                    .map(|entries| print_listing(&entries, long))
            }
            ShellCommand::Cd(dir) => {
                let target = join(&cwd, &dir);
                match client.directory_exists(&target).await {
                    Ok(true) => {
                        cwd = target;
                        Ok(())
                    }
                    Ok(false) => Err(anyhow::anyhow!("no such directory: {target}")),
                    Err(e) => Err(e),
                }
            }
            ShellCommand::Rmdir(dir) => {
                let target = join(&cwd, &dir);
                client.delete_directory(&target).await
            }
        };
        if let Err(e) = result {
            eprintln!("{} {e:#}", "error:".red().bold());
        }
    }
}
