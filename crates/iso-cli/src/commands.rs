//! # Store Subcommands
//!
//! One handler per operation. Handlers write their output to the given
//! writer and return the process exit code on success.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use iso_store::IsolatedStore;

use crate::options::StoreOptions;

/// Operations on the selected store.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a directory and any missing parents.
    Mkdir { path: String },

    /// Delete an empty directory.
    Rmdir { path: String },

    /// Delete a file. A missing file is not an error.
    Rm { path: String },

    /// Create an empty file, or truncate an existing one.
    Touch { path: String },

    /// Replace a file's content with TEXT, a host file, or stdin.
    Write {
        path: String,
        /// Content to write.
        #[arg(conflicts_with = "from")]
        text: Option<String>,
        /// Read the content from this host file.
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Print a file's content.
    Cat { path: String },

    /// Copy a file.
    Cp {
        source: String,
        destination: String,
        /// Replace an existing destination.
        #[arg(long, short)]
        force: bool,
    },

    /// Move a file or directory.
    Mv { source: String, destination: String },

    /// List entries matching PATTERN. Directories carry a trailing `/`.
    Ls {
        #[arg(default_value = "*")]
        pattern: String,
        /// Only directories.
        #[arg(long, conflicts_with = "files")]
        dirs: bool,
        /// Only files.
        #[arg(long)]
        files: bool,
    },

    /// Exit 0 if PATH exists, 1 otherwise.
    Exists { path: String },

    /// Show the store's scope, root and quota.
    Info {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
        /// Raise the quota to this many bytes first.
        #[arg(long)]
        grow_to: Option<u64>,
    },

    /// Delete the whole store.
    RemoveStore,
}

/// Open the store selected by `opts` and run `command` against it.
pub fn run(opts: &StoreOptions, command: &Command, out: &mut dyn Write) -> Result<u8> {
    let store = opts.open()?;
    tracing::debug!(scope = %store.scope_id(), root = %store.root().path().display(), "store opened");
    let code = run_on(&store, command, out)?;
    store.close();
    Ok(code)
}

/// Run `command` against an already open store.
pub fn run_on(store: &IsolatedStore, command: &Command, out: &mut dyn Write) -> Result<u8> {
    match command {
        Command::Mkdir { path } => {
            store
                .create_directory(path)
                .with_context(|| format!("mkdir {path}"))?;
        }
        Command::Rmdir { path } => {
            store
                .delete_directory(path)
                .with_context(|| format!("rmdir {path}"))?;
        }
        Command::Rm { path } => {
            store.delete_file(path).with_context(|| format!("rm {path}"))?;
        }
        Command::Touch { path } => {
            store.create_file(path).with_context(|| format!("touch {path}"))?;
        }
        Command::Write { path, text, from } => {
            let data = match (text, from) {
                (Some(text), _) => text.clone().into_bytes(),
                (None, Some(file)) => std::fs::read(file)
                    .with_context(|| format!("reading {}", file.display()))?,
                (None, None) => {
                    let mut buf = Vec::new();
                    std::io::stdin()
                        .read_to_end(&mut buf)
                        .context("reading stdin")?;
                    buf
                }
            };
            store
                .write_file(path, &data)
                .with_context(|| format!("write {path}"))?;
            tracing::info!(path = %path, bytes = data.len(), "wrote file");
        }
        Command::Cat { path } => {
            let data = store.read_file(path).with_context(|| format!("cat {path}"))?;
            out.write_all(&data)?;
        }
        Command::Cp {
            source,
            destination,
            force,
        } => {
            store
                .copy_file(source, destination, *force)
                .with_context(|| format!("cp {source} {destination}"))?;
        }
        Command::Mv {
            source,
            destination,
        } => {
            let moved = if store.directory_exists(source)? {
                store.move_directory(source, destination)
            } else {
                store.move_file(source, destination)
            };
            moved.with_context(|| format!("mv {source} {destination}"))?;
        }
        Command::Ls {
            pattern,
            dirs,
            files,
        } => {
            if !*files {
                for name in store.directory_names(pattern)? {
                    writeln!(out, "{name}/")?;
                }
            }
            if !*dirs {
                for name in store.file_names(pattern)? {
                    writeln!(out, "{name}")?;
                }
            }
        }
        Command::Exists { path } => {
            let found = store.file_exists(path)? || store.directory_exists(path)?;
            return Ok(if found { 0 } else { 1 });
        }
        Command::Info { json, grow_to } => {
            if let Some(bytes) = grow_to {
                store
                    .increase_quota_to(*bytes)
                    .with_context(|| format!("raising quota to {bytes}"))?;
            }
            write_info(store, *json, out)?;
        }
        Command::RemoveStore => {
            let root = store.root().path().display().to_string();
            store.remove().context("removing store")?;
            writeln!(out, "removed {root}")?;
        }
    }
    Ok(0)
}

fn write_info(store: &IsolatedStore, json: bool, out: &mut dyn Write) -> Result<()> {
    let quota = store.quota()?;
    let used = store.used_size()?;
    let available = store.available_free_space()?;
    if json {
        let value = serde_json::json!({
            "scope": store.scope().to_string(),
            "scope_id": store.scope_id(),
            "root": store.root().path(),
            "state": store.state().to_string(),
            "quota": quota,
            "used": used,
            "available": available,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    } else {
        writeln!(out, "scope:     {}", store.scope())?;
        writeln!(out, "scope id:  {}", store.scope_id())?;
        writeln!(out, "root:      {}", store.root().path().display())?;
        writeln!(out, "state:     {}", store.state())?;
        writeln!(out, "quota:     {quota}")?;
        writeln!(out, "used:      {used}")?;
        writeln!(out, "available: {available}")?;
    }
    Ok(())
}
