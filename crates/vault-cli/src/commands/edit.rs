//! Mutating commands: mkdir, put, rm, mv, cp

use colored::Colorize;
use std::fs;
use std::path::Path;

use crate::context::Context;
use crate::error::{CliError, Result};

/// Run the mkdir command
pub fn run_mkdir(ctx: &Context, path: &str, parents: bool) -> Result<()> {
    let repo = ctx.open_writable()?;
    if parents {
        repo.create_dir_all(path)?;
    } else {
        repo.create_dir(path)?;
    }
    println!("{} {}", "Created".green(), path);
    Ok(())
}

/// Run the put command
pub fn run_put(ctx: &Context, src: &Path, dest: &str) -> Result<()> {
    let content = fs::read(src).map_err(|e| {
        CliError::user(format!("cannot read {}: {}", src.display(), e))
    })?;
    let repo = ctx.open_writable()?;
    repo.write_all(dest, &content)?;

    let version = repo.metadata(dest)?.curr_version;
    println!(
        "{} {} bytes to {} (v{})",
        "Wrote".green(),
        content.len(),
        dest,
        version
    );
    Ok(())
}

/// Run the rm command
pub fn run_rm(ctx: &Context, path: &str, recursive: bool) -> Result<()> {
    let repo = ctx.open_writable()?;
    if recursive {
        repo.remove_tree(path)?;
    } else {
        repo.remove(path)?;
    }
    println!("{} {}", "Removed".green(), path);
    Ok(())
}

/// Run the mv command
pub fn run_mv(ctx: &Context, src: &str, dst: &str, overwrite: bool) -> Result<()> {
    let repo = ctx.open_writable()?;
    repo.rename(src, dst, overwrite)?;
    println!("{} {} -> {}", "Moved".green(), src, dst);
    Ok(())
}

/// Run the cp command
pub fn run_cp(ctx: &Context, src: &str, dst: &str, overwrite: bool) -> Result<()> {
    let repo = ctx.open_writable()?;
    repo.copy(src, dst, overwrite)?;
    println!("{} {} -> {}", "Copied".green(), src, dst);
    Ok(())
}
