//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vault - an encrypted, versioned virtual filesystem
#[derive(Parser, Debug)]
#[command(name = "vault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Repository URI, e.g. file:///srv/vault or mem://scratch
    #[arg(long, global = true, env = "VAULT_URI")]
    pub uri: Option<String>,

    /// Repository passphrase
    #[arg(long, global = true, env = "VAULT_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Opener config file (.toml or .json)
    #[arg(long, global = true, env = "VAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Initialize a new repository
    ///
    /// Examples:
    ///   vault --uri file:///srv/vault init
    ///   vault init --force     # Replace an existing repository
    Init {
        /// Replace an existing repository
        #[arg(long)]
        force: bool,
    },

    /// List a directory
    Ls {
        /// Directory to list
        #[arg(default_value = "/")]
        path: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Create a directory
    Mkdir {
        /// Directory to create
        path: String,

        /// Create missing parents, succeed if it already exists
        #[arg(short, long)]
        parents: bool,
    },

    /// Copy a local file into the repository
    Put {
        /// Local file to read
        src: PathBuf,

        /// Destination path inside the repository
        dest: String,
    },

    /// Print a file to stdout
    Cat {
        /// File to print
        path: String,
    },

    /// Remove a file or an empty directory
    Rm {
        /// Path to remove
        path: String,

        /// Remove a directory and everything below it
        #[arg(short, long)]
        recursive: bool,
    },

    /// Move or rename an entry
    Mv {
        src: String,
        dst: String,

        /// Replace an existing file or empty directory at the destination
        #[arg(long)]
        overwrite: bool,
    },

    /// Copy a file
    Cp {
        src: String,
        dst: String,

        /// Replace an existing file at the destination
        #[arg(long)]
        overwrite: bool,
    },

    /// Show metadata of an entry
    Info {
        /// Path to describe
        path: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List the retained versions of a file
    History {
        /// File to inspect
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "vault",
            "ls",
            "/docs",
            "--uri",
            "mem://x",
            "--passphrase",
            "pw",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.uri.as_deref(), Some("mem://x"));
        assert_eq!(cli.passphrase.as_deref(), Some("pw"));
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Commands::Ls {
                path: "/docs".into(),
                json: false
            }
        );
    }

    #[test]
    fn ls_defaults_to_root() {
        let cli = Cli::try_parse_from(["vault", "ls"]).unwrap();
        assert!(matches!(cli.command, Commands::Ls { path, .. } if path == "/"));
    }

    #[test]
    fn mv_takes_overwrite() {
        let cli = Cli::try_parse_from(["vault", "mv", "/a", "/b", "--overwrite"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Mv {
                src: "/a".into(),
                dst: "/b".into(),
                overwrite: true
            }
        );
    }
}
