//! adb-reader
//!
//! Command line front end for the bridge library.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use bridge::config::{default_config_path, Config};
use bridge::{logging, Android, FileRecord};
use clap::{Parser, Subcommand};
use tracing::info;

/// adb-reader - inspect and transfer files on Android devices through adb.
#[derive(Parser, Debug)]
#[command(name = "adb-reader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory containing the adb executable
    #[arg(long, global = true, value_name = "DIR")]
    pub adb_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List serials of connected devices
    Devices,

    /// Show identity properties of a device
    Info {
        /// Device serial
        id: String,

        /// Also report storage usage
        #[arg(long)]
        storage: bool,
    },

    /// List media files under a device folder
    Ls {
        /// Device serial
        id: String,

        /// Device folder
        path: String,

        /// Keep directory order instead of newest first
        #[arg(long)]
        no_time_sort: bool,

        /// Do not descend into sub folders
        #[arg(long)]
        flat: bool,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// List media files directly inside a device folder
    Names {
        /// Device serial
        id: String,

        /// Device folder
        path: String,
    },

    /// List sub folders of a device folder
    Folders {
        /// Device serial
        id: String,

        /// Device folder
        path: String,
    },

    /// Check whether a device path exists
    Exists {
        /// Device serial
        id: String,

        /// Device path
        path: String,

        /// Check with `ls` instead of changing into the folder
        #[arg(long)]
        file: bool,
    },

    /// Print the MD5 digest of a device file
    Md5 {
        /// Device serial
        id: String,

        /// Device file
        path: String,
    },

    /// Copy a device file or folder to the host
    Pull {
        /// Device serial
        id: String,

        /// Device path
        remote: String,

        /// Host destination
        local: PathBuf,

        /// Pull a whole folder
        #[arg(long)]
        folder: bool,
    },

    /// Copy a host file or folder into a device folder
    Push {
        /// Device serial
        id: String,

        /// Host source
        local: PathBuf,

        /// Device folder
        remote: String,
    },

    /// Create a device folder and its parents
    Mkdir {
        /// Device serial
        id: String,

        /// Device folder
        path: String,
    },

    /// Remove a device file
    Rm {
        /// Device serial
        id: String,

        /// Device file
        path: String,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Write it to the configuration file instead
        #[arg(long)]
        write: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let overrides = config.apply_env_overrides();
    if let Some(dir) = &cli.adb_dir {
        config.bridge.adb_dir = dir.clone();
    }
    if cli.verbose {
        config.logging.log_level = "debug".to_string();
    }
    config.validate()?;

    let _guard = logging::init(&config.logging.log_level, config.logging.log_file.as_deref())?;
    for (variable, value) in &overrides {
        info!("Overriding from environment: {}={}", variable, value);
    }

    let adb = Android::from_config(&config);
    run(&adb, &config, cli.config, cli.command)
}

fn run(
    adb: &Android,
    config: &Config,
    config_path: Option<PathBuf>,
    command: Commands,
) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Devices => {
            for id in adb.devices().context("Failed to list devices")? {
                println!("{}", id);
            }
        }
        Commands::Info { id, storage } => {
            let device = adb
                .device(&id)
                .with_context(|| format!("Failed to query device {}", id))?
                .with_context(|| {
                    format!("Device {} did not report manufacturer and model", id)
                })?;
            let device = if storage {
                adb.storage(&device).context("Failed to query storage")?
            } else {
                device
            };
            println!("{}", device);
        }
        Commands::Ls {
            id,
            path,
            no_time_sort,
            flat,
            json,
        } => {
            let records = adb
                .files(&id, &path, !no_time_sort, !flat)
                .with_context(|| format!("Failed to list {}", path))?;
            print_records(&records, json)?;
        }
        Commands::Names { id, path } => {
            for name in adb
                .filenames(&id, &path)
                .with_context(|| format!("Failed to list {}", path))?
            {
                println!("{}", name);
            }
        }
        Commands::Folders { id, path } => {
            for folder in adb
                .folders(&id, &path)
                .with_context(|| format!("Failed to list folders of {}", path))?
            {
                println!("{}", folder);
            }
        }
        Commands::Exists { id, path, file } => {
            let found = if file {
                adb.exists_file(&id, &path)?
            } else {
                adb.exists(&id, &path)?
            };
            println!("{}", found);
            if !found {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Md5 { id, path } => {
            let digest = adb
                .md5(&id, &path)?
                .with_context(|| format!("md5sum printed no digest for {}", path))?;
            println!("{}", digest);
        }
        Commands::Pull {
            id,
            remote,
            local,
            folder,
        } => {
            if folder {
                println!("{}", adb.pull_folder(&id, &remote, &local)?);
            } else if !adb.pull_file(&id, &remote, &local)? {
                anyhow::bail!("adb did not confirm pulling {}", remote);
            }
        }
        Commands::Push { id, local, remote } => {
            println!("{}", adb.push(&id, &local, &remote)?);
        }
        Commands::Mkdir { id, path } => {
            adb.mkdir(&id, &path)?;
        }
        Commands::Rm { id, path } => {
            if !adb.delete_file(&id, &path)? {
                anyhow::bail!("Failed to remove {}", path);
            }
        }
        Commands::Config { write: false } => {
            print!("{}", config.to_toml()?);
        }
        Commands::Config { write: true } => {
            let path = config_path.unwrap_or_else(default_config_path);
            config.save(&path)?;
            println!("{}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_records(records: &[FileRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    for record in records {
        println!(
            "{:>12}  {}  {}",
            record.size,
            record.modified.format("%Y-%m-%d %H:%M"),
            record.path()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ls_defaults() {
        let cli = Cli::try_parse_from(["adb-reader", "ls", "ABC123", "/sdcard/DCIM"]).unwrap();
        match cli.command {
            Commands::Ls {
                id,
                path,
                no_time_sort,
                flat,
                json,
            } => {
                assert_eq!(id, "ABC123");
                assert_eq!(path, "/sdcard/DCIM");
                assert!(!no_time_sort && !flat && !json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "adb-reader",
            "devices",
            "--adb-dir",
            "/opt/platform-tools",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.adb_dir, Some(PathBuf::from("/opt/platform-tools")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Devices));
    }

    #[test]
    fn test_parse_pull_folder() {
        let cli =
            Cli::try_parse_from(["adb-reader", "pull", "A", "/sdcard/DCIM", "out", "--folder"])
                .unwrap();
        assert!(matches!(cli.command, Commands::Pull { folder: true, .. }));
    }

    #[test]
    fn test_parse_config_command() {
        let cli = Cli::try_parse_from(["adb-reader", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { write: false }));

        let cli = Cli::try_parse_from(["adb-reader", "config", "--write", "-c", "/tmp/a.toml"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Config { write: true }));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/a.toml")));
    }

    #[test]
    fn test_missing_arguments_rejected() {
        assert!(Cli::try_parse_from(["adb-reader", "rm", "A"]).is_err());
        assert!(Cli::try_parse_from(["adb-reader"]).is_err());
    }
}
