#[cfg(feature = "cli")]
use crate::error::Result;
#[cfg(feature = "cli")]
use crate::types::{
    CertRole, ClassifyPolicy, Options, OutputPaths, Target, TlsOptions, DEFAULT_PORT,
};
#[cfg(feature = "cli")]
use clap::builder::NonEmptyStringValueParser;
#[cfg(feature = "cli")]
use clap::{ArgAction, Parser};
#[cfg(feature = "cli")]
use colored::Colorize;
#[cfg(feature = "cli")]
use std::ffi::OsString;
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::time::Duration;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "getcerts")]
#[command(
    version,
    about = "Fetch a remote TLS certificate chain and write the leaf and \
             intermediate certificates as PEM",
    long_about = None
)]
pub struct Cli {
    #[arg(
        long,
        value_parser = NonEmptyStringValueParser::new(),
        help = "Domain used for the TLS handshake (SNI)"
    )]
    pub domain: String,

    #[arg(
        long,
        value_parser = NonEmptyStringValueParser::new(),
        help = "Output file for the leaf certificate(s)"
    )]
    pub leaf: String,

    #[arg(
        long,
        value_parser = NonEmptyStringValueParser::new(),
        help = "Output file for the intermediate certificate(s)"
    )]
    pub intermediate: String,

    #[arg(long, help = "IP address of the target host (SNI still uses --domain)")]
    pub ip: Option<String>,

    #[arg(long, default_value_t = DEFAULT_PORT, help = "TCP port of the target host")]
    pub port: u16,

    #[arg(
        long = "insecure-skip-verify",
        alias = "insecureSkipVerify",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = clap::value_parser!(bool),
        help = "Accept any certificate the peer presents (dangerous)"
    )]
    pub insecure_skip_verify: bool,

    #[arg(
        long,
        value_name = "DN",
        value_parser = NonEmptyStringValueParser::new(),
        help = "Require exactly a leaf for --domain and a CA with this subject \
                (e.g. \"CN=R3,O=Let's Encrypt,C=US\")"
    )]
    pub expected_issuer: Option<String>,

    #[arg(
        long = "ca-file",
        value_name = "PATH",
        help = "Extra PEM trust anchors (repeatable)"
    )]
    pub ca_files: Vec<PathBuf>,

    #[arg(
        long,
        default_value = "10",
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Connect and handshake timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(short, long, help = "Enable debug logging")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl Cli {
    pub fn into_options(self) -> Options {
        let mut target = Target::new(self.domain).with_port(self.port);
        if let Some(ip) = self.ip.filter(|ip| !ip.is_empty()) {
            target = target.with_ip(ip);
        }

        let tls = TlsOptions {
            insecure_skip_verify: self.insecure_skip_verify,
            ca_files: self.ca_files,
            timeout: Duration::from_secs(self.timeout),
        };

        let policy = match self.expected_issuer {
            Some(expected_issuer) => ClassifyPolicy::SubjectMatch { expected_issuer },
            None => ClassifyPolicy::CaFlag,
        };

        Options::new(target, OutputPaths::new(self.leaf, self.intermediate))
            .with_tls(tls)
            .with_policy(policy)
    }
}

/// Resolves options from an argument list (including the program name).
#[cfg(feature = "cli")]
pub fn parse_options<I, T>(args: I) -> Result<Options>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Ok(Cli::try_parse_from(args)?.into_options())
}

#[cfg(feature = "cli")]
pub fn run_cli() -> Result<()> {
    let cli = Cli::try_parse()?;
    init_logging(cli.verbose);
    let options = cli.into_options();

    let summary = crate::run(&options)?;

    println!(
        "{}",
        format!(
            "Fetched {} certificate(s) from {}",
            summary.total(),
            options.target.domain
        )
        .green()
        .bold()
    );
    for role in CertRole::ALL {
        println!(
            "  {}: {} ({})",
            role.title().cyan(),
            options.outputs.path_for(role).display(),
            summary.count(role)
        );
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
