//! Read-only commands: ls, cat, info, history

use colored::Colorize;
use std::io::Write;
use vault_fs::{DirEntry, Metadata};

use crate::context::Context;
use crate::error::Result;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Run the ls command
pub fn run_ls(ctx: &Context, path: &str, json: bool) -> Result<()> {
    let repo = ctx.open_read_only()?;
    let entries = repo.read_dir(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

fn format_entry(entry: &DirEntry) -> String {
    let modified = entry.metadata.modified.format(TIME_FORMAT);
    if entry.metadata.is_dir() {
        format!(
            "{:>10}  {}  {}",
            "-",
            modified,
            format!("{}/", entry.name).blue().bold()
        )
    } else {
        format!("{:>10}  {}  {}", entry.metadata.len, modified, entry.name)
    }
}

/// Run the cat command
pub fn run_cat(ctx: &Context, path: &str) -> Result<()> {
    let repo = ctx.open_read_only()?;
    let content = repo.read_all(path)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&content)?;
    stdout.flush()?;
    Ok(())
}

/// Run the info command
pub fn run_info(ctx: &Context, path: &str, json: bool) -> Result<()> {
    let repo = ctx.open_read_only()?;
    let meta = repo.metadata(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    } else {
        print_metadata(path, &meta);
    }
    Ok(())
}

fn print_metadata(path: &str, meta: &Metadata) {
    let kind = if meta.is_dir() { "directory" } else { "file" };
    println!("{}", path.bold());
    println!("  {:<10} {}", "type:".dimmed(), kind);
    if meta.is_file() {
        println!("  {:<10} {} bytes", "size:".dimmed(), meta.len);
        println!("  {:<10} {}", "version:".dimmed(), meta.curr_version);
    }
    println!("  {:<10} {}", "created:".dimmed(), meta.created.format(TIME_FORMAT));
    println!("  {:<10} {}", "modified:".dimmed(), meta.modified.format(TIME_FORMAT));
}

/// Run the history command
pub fn run_history(ctx: &Context, path: &str) -> Result<()> {
    let repo = ctx.open_read_only()?;
    let current = repo.metadata(path)?.curr_version;
    let versions = repo.history(path)?;

    println!("{}", "Retained versions".bold());
    for info in versions {
        let marker = if info.version == current {
            "*".green().bold()
        } else {
            " ".normal()
        };
        println!(
            "{} v{:<4} {:>10}  {}  {}",
            marker,
            info.version,
            info.len,
            info.created.format(TIME_FORMAT),
            info.checksum.dimmed()
        );
    }
    Ok(())
}
