// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    clap::{Arg, ArgMatches, Command},
    dpkg_metadata::{
        deb::{is_deb_file, resolve_control_bytes},
        error::DpkgError,
        package_record::PackageRecord,
        scanner::{PackageScanner, PackageScannerConfig},
        status::{filter_by_name, StatusDatabase, DEFAULT_STATUS_PATH},
    },
    log::{info, LevelFilter},
    std::{io::Write, path::Path},
    thiserror::Error,
};

const LIST_ABOUT: &str = "\
List installed packages.

Reads the dpkg status database and prints one line per package with its
status, name, version, architecture, and short description.

If a pattern is given, only packages whose name contains the pattern are
printed. Matching is a plain substring test.

The first column holds the desired action and the current state of the
package, as printed by `dpkg -l`. e.g. `ii` is a package that should be
installed and is installed. `rc` is a removed package whose configuration
files remain.
";

const SCANPACKAGES_ABOUT: &str = "\
Build a Packages index from a directory tree of .deb files.

Every file under the binary path whose name ends in `.<type>` is read. With
`--arch`, only names ending in `_all.<type>` or `_<arch>.<type>` are read.
The `control` file of each package becomes an entry of the index, with
`Filename`, `Size` and content digest fields added.

When multiple files define the same package, only the newest version is
kept. With `--multiversion`, one entry is kept per distinct version.

Files that can't be read as packages are skipped with a warning.

The index is written to stdout.

# YAML Configuration

A YAML file can define the scan with the following keys:

root_dir (required) (string)
   Directory to scan.

architecture (optional) (string)
   Architecture to filter on.

package_type (optional) (string)
   Filename extension of packages. Defaults to `deb`.

checksums (optional) (list[string])
   Digests to emit. Any of `md5`, `sha1`, `sha256`. Defaults to all.

multiversion (optional) (bool)
   Whether to keep every version of a package.

Arguments given on the command line take precedence over the file.
";

#[derive(Debug, Error)]
pub enum RdpkgError {
    #[error("argument parsing error: {0}")]
    Clap(#[from] clap::Error),

    #[error("{0}")]
    Dpkg(#[from] DpkgError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("invalid sub-command: {0}")]
    InvalidSubCommand(String),

    #[error("{0} is not a valid .deb file")]
    NotDebFile(String),
}

pub type Result<T> = std::result::Result<T, RdpkgError>;

fn new_command() -> Command<'static> {
    let app = Command::new("Debian package metadata tool")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect Debian packages and build Packages indices")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        );

    let app = app.subcommand(
        Command::new("info")
            .about("Print the control file of a .deb")
            .arg(
                Arg::new("path")
                    .required(true)
                    .allow_invalid_utf8(true)
                    .help("Path to a .deb file"),
            ),
    );

    let app = app.subcommand(
        Command::new("list")
            .about("List installed packages")
            .long_about(LIST_ABOUT)
            .arg(
                Arg::new("status-file")
                    .long("status-file")
                    .takes_value(true)
                    .allow_invalid_utf8(true)
                    .default_value(DEFAULT_STATUS_PATH)
                    .help("Path to the dpkg status database"),
            )
            .arg(Arg::new("pattern").help("Only list packages whose name contains this")),
    );

    app.subcommand(
        Command::new("scanpackages")
            .about("Build a Packages index from a directory of .deb files")
            .long_about(SCANPACKAGES_ABOUT)
            .arg(
                Arg::new("type")
                    .long("type")
                    .short('t')
                    .takes_value(true)
                    .help("Filename extension of packages to scan [default: deb]"),
            )
            .arg(
                Arg::new("arch")
                    .long("arch")
                    .short('a')
                    .takes_value(true)
                    .help("Only scan packages for this architecture and `all`"),
            )
            .arg(
                Arg::new("hash")
                    .long("hash")
                    .takes_value(true)
                    .help("Comma delimited digests to emit [default: md5,sha1,sha256]"),
            )
            .arg(
                Arg::new("multiversion")
                    .long("multiversion")
                    .short('m')
                    .help("Keep every version of a package instead of only the newest"),
            )
            .arg(
                Arg::new("config")
                    .long("config")
                    .takes_value(true)
                    .allow_invalid_utf8(true)
                    .help("Path to a YAML file defining the scan"),
            )
            .arg(
                Arg::new("binary-path")
                    .required_unless_present("config")
                    .allow_invalid_utf8(true)
                    .help("Directory to scan"),
            ),
    )
}

fn init_logging(matches: &ArgMatches) {
    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();
}

pub fn run_cli() -> Result<()> {
    let matches = new_command().get_matches();

    init_logging(&matches);

    match matches.subcommand() {
        Some(("info", args)) => command_info(args),
        Some(("list", args)) => command_list(args),
        Some(("scanpackages", args)) => command_scanpackages(args),
        Some((command, _)) => Err(RdpkgError::InvalidSubCommand(command.to_string())),
        None => {
            new_command().print_help()?;
            Ok(())
        }
    }
}

fn command_info(args: &ArgMatches) -> Result<()> {
    let path = args
        .value_of_os("path")
        .expect("path argument is required");

    let control = read_control(Path::new(path))?;

    std::io::stdout().lock().write_all(&control)?;

    Ok(())
}

/// Read the raw `control` file of the .deb at `path`.
fn read_control(path: &Path) -> Result<Vec<u8>> {
    if !is_deb_file(path) {
        return Err(RdpkgError::NotDebFile(format!("{}", path.display())));
    }

    let fh = std::fs::File::open(path)?;

    Ok(resolve_control_bytes(std::io::BufReader::new(fh))?)
}

fn command_list(args: &ArgMatches) -> Result<()> {
    let db = StatusDatabase::new(
        args.value_of_os("status-file")
            .expect("status-file argument has default"),
    );

    let records = db.packages()?;
    info!(
        "{} packages in {}",
        records.len(),
        db.path().display()
    );

    let selected = if let Some(pattern) = args.value_of("pattern") {
        filter_by_name(&records, pattern).collect::<Vec<_>>()
    } else {
        records.iter().collect::<Vec<_>>()
    };

    print!("{}", format_package_table(&selected));

    Ok(())
}

/// Render records in the format of `dpkg -l`.
fn format_package_table(records: &[&PackageRecord]) -> String {
    let rows = records
        .iter()
        .map(|record| {
            [
                record
                    .status_abbreviation()
                    .unwrap_or_else(|| "un".to_string()),
                record.package().unwrap_or("").to_string(),
                record.version_str().unwrap_or("").to_string(),
                record.architecture().unwrap_or("").to_string(),
                record.short_description().unwrap_or("").to_string(),
            ]
        })
        .collect::<Vec<_>>();

    let width = |column: usize, title: &str| {
        rows.iter()
            .map(|row| row[column].chars().count())
            .chain(std::iter::once(title.len()))
            .max()
            .unwrap_or(0)
    };
    let name_width = width(1, "Name");
    let version_width = width(2, "Version");
    let arch_width = width(3, "Architecture");
    let description_width = width(4, "Description");

    let mut res = String::new();
    res.push_str("Desired=Unknown/Install/Remove/Purge/Hold\n");
    res.push_str(
        "| Status=Not/Inst/Conf-files/Unpacked/halF-conf/Half-inst/trig-aWait/Trig-pend\n",
    );
    res.push_str("|/ Err?=(none)/Reinst-required (Status,Err: uppercase=bad)\n");
    res.push_str(&format!(
        "||/ {:<nw$} {:<vw$} {:<aw$} Description\n",
        "Name",
        "Version",
        "Architecture",
        nw = name_width,
        vw = version_width,
        aw = arch_width,
    ));
    res.push_str(&format!(
        "+++-{}-{}-{}-{}\n",
        "=".repeat(name_width),
        "=".repeat(version_width),
        "=".repeat(arch_width),
        "=".repeat(description_width),
    ));

    for [status, name, version, arch, description] in &rows {
        let line = format!(
            "{:<3} {:<nw$} {:<vw$} {:<aw$} {}",
            status,
            name,
            version,
            arch,
            description,
            nw = name_width,
            vw = version_width,
            aw = arch_width,
        );
        res.push_str(line.trim_end());
        res.push('\n');
    }

    res
}

/// Resolve the scan configuration from arguments and an optional YAML file.
fn scanner_config(args: &ArgMatches) -> Result<PackageScannerConfig> {
    let mut config = if let Some(path) = args.value_of_os("config") {
        let f = std::fs::File::open(path)?;
        serde_yaml::from_reader(f)?
    } else {
        PackageScannerConfig::new(
            args.value_of_os("binary-path")
                .expect("binary-path is required without config"),
        )
    };

    if let Some(path) = args.value_of_os("binary-path") {
        config.root_dir = path.into();
    }
    if let Some(package_type) = args.value_of("type") {
        config.package_type = package_type.to_string();
    }
    if let Some(arch) = args.value_of("arch") {
        config.architecture = Some(arch.to_string());
    }
    if let Some(hashes) = args.value_of("hash") {
        config.checksums = hashes
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
            .collect();
    }
    if args.is_present("multiversion") {
        config.multiversion = true;
    }

    Ok(config)
}

fn command_scanpackages(args: &ArgMatches) -> Result<()> {
    let config = scanner_config(args)?;
    info!("scanning {}", config.root_dir.display());

    let scanner = PackageScanner::new(config)?;
    let index = scanner.scan_index()?;
    info!("wrote {} entries", index.len());

    let mut stdout = std::io::stdout().lock();
    index.write(&mut stdout)?;
    stdout.flush()?;

    Ok(())
}
