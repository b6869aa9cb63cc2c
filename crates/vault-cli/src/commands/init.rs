//! Repository initialization

use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Run the init command
pub fn run_init(ctx: &Context, force: bool) -> Result<()> {
    let repo = ctx.create(force)?;
    let info = repo.info();
    repo.close();

    println!(
        "{} vault at {} (keeping {} versions per file)",
        "Initialized".green().bold(),
        info.uri.cyan(),
        info.version_limit
    );
    Ok(())
}
