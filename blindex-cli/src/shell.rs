//! Interactive shell: `add <email>`, `search <email>`, `exit`.

use std::io::Write;

use anyhow::Result;
use blindex_store::ProfileService;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::commands;

/// A parsed shell line.
#[derive(Debug, PartialEq, Eq)]
enum ShellCommand<'a> {
    Add(&'a str),
    Search { email: &'a str, reveal: bool },
    Exit,
}

fn parse(line: &str) -> Result<ShellCommand<'_>, &'static str> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Err("Please provide a valid command!");
    };
    let args: Vec<&str> = words.collect();

    match (command, args.as_slice()) {
        ("add", [email]) => Ok(ShellCommand::Add(*email)),
        ("search", [email]) => Ok(ShellCommand::Search { email: *email, reveal: false }),
        ("search", [email, "--reveal"]) => Ok(ShellCommand::Search { email: *email, reveal: true }),
        ("exit" | "quit", []) => Ok(ShellCommand::Exit),
        ("add" | "search", _) => Err("Usage: add <email> | search <email> [--reveal]"),
        _ => Err("Invalid argument!"),
    }
}

/// Runs the read-eval loop until `exit` or end of input.
///
/// Failed commands print a message and the loop continues.
pub async fn run<R, W>(service: &ProfileService, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "Simple Shell")?;
    writeln!(out, "---------------------")?;

    let mut lines = input.lines();
    loop {
        write!(out, "-> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        let result = match parse(&line) {
            Ok(ShellCommand::Exit) => break,
            Ok(ShellCommand::Add(email)) => commands::add(service, email, out).await,
            Ok(ShellCommand::Search { email, reveal }) => {
                commands::search(service, email, reveal, out).await
            }
            Err(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "shell command failed");
            writeln!(out, "Error: {e:#}")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use blindex::key_provider::MemoryKeyProvider;
    use blindex::keys::KeyAlgorithm;
    use blindex::provision::{Keyring, ProvisionMode};
    use blindex_store::MemoryRecordStore;

    #[test]
    fn test_parse() {
        assert_eq!(parse("add a@b.c"), Ok(ShellCommand::Add("a@b.c")));
        assert_eq!(
            parse("  search   a@b.c "),
            Ok(ShellCommand::Search { email: "a@b.c", reveal: false })
        );
        assert_eq!(
            parse("search a@b.c --reveal"),
            Ok(ShellCommand::Search { email: "a@b.c", reveal: true })
        );
        assert_eq!(parse("exit"), Ok(ShellCommand::Exit));
        assert!(parse("").is_err());
        assert!(parse("add").is_err());
        assert!(parse("drop table").is_err());
    }

    #[tokio::test]
    async fn test_session() {
        let mode = ProvisionMode::Bootstrap { aead_algorithm: KeyAlgorithm::Aes256Gcm };
        let keyring = Keyring::provision(&MemoryKeyProvider::new(), mode).unwrap();
        let service = ProfileService::new(keyring, Arc::new(MemoryRecordStore::new()));

        let input: &[u8] = b"add alice@example.com\nbogus\n\
            search alice@example.com\nsearch bob@example.com\n\
            exit\nadd never@example.com\n";
        let mut out = Vec::new();
        run(&service, input, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Simple Shell\n"));
        assert!(text.contains("Added profile 1"));
        assert!(text.contains("Invalid argument!"));
        assert!(text.contains("Profile 1 ("));
        assert!(text.contains("No matching profile"));
        assert!(!text.contains("Added profile 2"));
    }

    #[tokio::test]
    async fn test_end_of_input_stops() {
        let mode = ProvisionMode::Bootstrap { aead_algorithm: KeyAlgorithm::Aes256Gcm };
        let keyring = Keyring::provision(&MemoryKeyProvider::new(), mode).unwrap();
        let service = ProfileService::new(keyring, Arc::new(MemoryRecordStore::new()));

        let mut out = Vec::new();
        run(&service, &b"add alice@example.com"[..], &mut out).await.unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Added profile 1"));
    }
}
