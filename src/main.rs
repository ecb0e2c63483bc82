use anyhow::Result;
use clap::Parser;
use mitt_install::commands;
use mitt_install::config::{Config, resolve_bin_dir};
use mitt_install::platform::HostPlatform;
use mitt_install::runtime::RealRuntime;
use std::path::PathBuf;

/// mitt-install - verified installer for the mitt CLI
///
/// Picks the release asset for this machine, checks its SHA-256 digest
/// against the bundled formula, and installs the `mitt` binary.
///
/// Examples:
///   mitt-install install                  # Latest release into ~/.local/bin
///   mitt-install install --version 0.4.0
///   mitt-install resolve --os linux --arch x86_64
#[derive(Parser, Debug)]
#[command(author, version = env!("MITT_INSTALL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Formula file to use instead of the bundled one
    #[arg(long, value_name = "PATH", global = true)]
    pub formula: Option<PathBuf>,

    /// Download attempts before giving up (default 3)
    #[arg(long, value_name = "N", global = true)]
    pub retries: Option<usize>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download, verify, and install mitt
    Install(InstallArgs),

    /// Print the asset URL and digest that would be installed
    Resolve(ResolveArgs),

    /// List the versions in the formula
    List,

    /// Show information about the latest release
    Info,

    /// Smoke-test an installed mitt binary
    Test(BinDirArgs),

    /// Remove an installed mitt binary
    Uninstall(BinDirArgs),
}

#[derive(clap::Args, Debug)]
pub struct PlatformArgs {
    /// Operating system to resolve for (defaults to this host)
    #[arg(long, value_name = "OS")]
    pub os: Option<String>,

    /// CPU architecture to resolve for (defaults to this host)
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,
}

impl PlatformArgs {
    fn host(&self) -> HostPlatform {
        HostPlatform::detect_with_overrides(self.os.clone(), self.arch.clone())
    }
}

#[derive(clap::Args, Debug)]
pub struct BinDirArgs {
    /// Directory holding the mitt binary (defaults to ~/.local/bin)
    #[arg(long, value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Version to install (defaults to the latest)
    #[arg(long, short = 'v', value_name = "VERSION")]
    pub version: Option<String>,

    #[command(flatten)]
    pub bin: BinDirArgs,

    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Skip running `mitt --help` after installing
    #[arg(long)]
    pub skip_test: bool,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Version to resolve (defaults to the latest)
    #[arg(long, short = 'v', value_name = "VERSION")]
    pub version: Option<String>,

    #[command(flatten)]
    pub platform: PlatformArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    let config = Config::new(&runtime, cli.formula.as_deref(), cli.retries)?;

    match cli.command {
        Commands::Install(args) => {
            let bin_dir = resolve_bin_dir(&runtime, args.bin.bin_dir)?;
            let host = args.platform.host();
            commands::install(runtime, &config, bin_dir, args.version, host, args.skip_test)
                .await?;
        }
        Commands::Resolve(args) => {
            let host = args.platform.host();
            print!("{}", commands::resolve(&config, args.version.as_deref(), &host)?);
        }
        Commands::List => print!("{}", commands::list(&config)),
        Commands::Info => print!("{}", commands::info(&config)?),
        Commands::Test(args) => {
            let bin_dir = resolve_bin_dir(&runtime, args.bin_dir)?;
            let installed = commands::test(&runtime, &config, &bin_dir)?;
            println!("{} passed its self-test", installed.path.display());
        }
        Commands::Uninstall(args) => {
            let bin_dir = resolve_bin_dir(&runtime, args.bin_dir)?;
            if commands::uninstall(&runtime, &config, &bin_dir)? {
                println!("Removed {}", bin_dir.join(&config.formula.name).display());
            } else {
                println!("{} is not installed in {}", config.formula.name, bin_dir.display());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_install_parsing() {
        let cli = Cli::try_parse_from(["mitt-install", "install"]).unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.version, None);
                assert_eq!(args.bin.bin_dir, None);
                assert!(!args.skip_test);
            }
            _ => panic!("Expected Install command"),
        }
        assert_eq!(cli.formula, None);
        assert_eq!(cli.retries, None);
    }

    #[test]
    fn test_cli_install_with_options() {
        let cli = Cli::try_parse_from([
            "mitt-install",
            "install",
            "--version",
            "0.4.0",
            "--bin-dir",
            "/tmp/bin",
            "--os",
            "linux",
            "--arch",
            "x86_64",
            "--skip-test",
        ])
        .unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.version.as_deref(), Some("0.4.0"));
                assert_eq!(args.bin.bin_dir, Some(PathBuf::from("/tmp/bin")));
                assert_eq!(args.platform.os.as_deref(), Some("linux"));
                assert_eq!(args.platform.arch.as_deref(), Some("x86_64"));
                assert!(args.skip_test);
            }
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_cli_resolve_overrides_host() {
        let cli =
            Cli::try_parse_from(["mitt-install", "resolve", "--os", "macos", "--arch", "arm64"])
                .unwrap();
        match cli.command {
            Commands::Resolve(args) => {
                let host = args.platform.host();
                assert_eq!(host.os, "macos");
                assert_eq!(host.arch, "arm64");
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_cli_global_options_parsing() {
        let cli = Cli::try_parse_from([
            "mitt-install",
            "--formula",
            "/etc/mitt.json",
            "list",
            "--retries",
            "5",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::List));
        assert_eq!(cli.formula, Some(PathBuf::from("/etc/mitt.json")));
        assert_eq!(cli.retries, Some(5));
    }

    #[test]
    fn test_cli_uninstall_bin_dir() {
        let cli =
            Cli::try_parse_from(["mitt-install", "uninstall", "--bin-dir", "/opt/bin"]).unwrap();
        match cli.command {
            Commands::Uninstall(args) => {
                assert_eq!(args.bin_dir, Some(PathBuf::from("/opt/bin")));
            }
            _ => panic!("Expected Uninstall command"),
        }
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["mitt-install"]).is_err());
    }

    #[test]
    fn test_cli_rejects_bad_retries() {
        assert!(Cli::try_parse_from(["mitt-install", "--retries", "many", "list"]).is_err());
    }
}
