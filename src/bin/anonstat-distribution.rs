//! Print the frequency distribution of one attribute of a delimited table.

use std::path::PathBuf;
use std::sync::Arc;

use anonstat::config::{self, AppSettings};
use anonstat::data::{DataTable, Hierarchy};
use anonstat::logging;
use anonstat::statistics::{DistributionTableView, TableStatus};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    let settings = load_settings(options.config.as_ref())?;

    let text = read(&options.data)?;
    let table = DataTable::from_delimited(&text, options.delimiter).map_err(|err| err.to_string())?;
    let hierarchy = match &options.hierarchy {
        Some(path) => Some(
            Hierarchy::from_delimited(&read(path)?, options.delimiter)
                .map_err(|err| err.to_string())?,
        ),
        None => None,
    };

    let mut view = DistributionTableView::new(settings.analysis);
    if options.hide_suppressed {
        view.set_hide_suppressed(true);
    }
    view.update(Arc::new(table), &options.attribute, hierarchy)
        .map_err(|err| err.to_string())?;
    view.wait();

    let snapshot = view.snapshot();
    if snapshot.status != TableStatus::Done {
        return Err(format!("No distribution available ({:?})", snapshot.status));
    }
    println!("{} ({} records)", options.attribute, snapshot.records);
    for row in &snapshot.rows {
        println!("{:<24} {:>8}", row.value, row.percentage);
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    data: PathBuf,
    attribute: String,
    hierarchy: Option<PathBuf>,
    delimiter: char,
    hide_suppressed: bool,
    config: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut data: Option<PathBuf> = None;
    let mut attribute: Option<String> = None;
    let mut hierarchy: Option<PathBuf> = None;
    let mut delimiter = ';';
    let mut hide_suppressed = false;
    let mut config: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                data = Some(PathBuf::from(value));
            }
            "--attribute" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--attribute requires a value".to_string())?;
                attribute = Some(value.clone());
            }
            "--hierarchy" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--hierarchy requires a value".to_string())?;
                hierarchy = Some(PathBuf::from(value));
            }
            "--delimiter" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--delimiter requires a value".to_string())?;
                delimiter = parse_delimiter(value)?;
            }
            "--hide-suppressed" => hide_suppressed = true,
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                config = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        data: data.ok_or_else(|| format!("--data is required\n\n{}", help_text()))?,
        attribute: attribute.ok_or_else(|| format!("--attribute is required\n\n{}", help_text()))?,
        hierarchy,
        delimiter,
        hide_suppressed,
        config,
    })
}

fn parse_delimiter(value: &str) -> Result<char, String> {
    match value {
        "\\t" | "tab" => Ok('\t'),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(format!("Invalid --delimiter value: {value}")),
            }
        }
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<AppSettings, String> {
    match path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())
}

fn read(path: &PathBuf) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|err| format!("Failed to read {}: {err}", path.display()))
}

fn help_text() -> String {
    [
        "Usage: anonstat-distribution --data <file> --attribute <name> [options]",
        "",
        "Options:",
        "  --hierarchy <file>   Generalization hierarchy defining value order",
        "  --delimiter <char>   Cell delimiter (default ';', 'tab' for tabs)",
        "  --hide-suppressed    Omit the '*' suppression marker",
        "  --config <file>      Settings file (default: app config.toml)",
    ]
    .join("\n")
}
