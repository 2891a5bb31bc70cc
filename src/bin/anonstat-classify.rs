//! Train and score a classifier on an anonymized table against a ZeroR baseline.

use std::path::PathBuf;
use std::sync::{Arc, mpsc};

use anonstat::analysis::AnalysisManager;
use anonstat::classification::{
    ClassificationAnalysis, ClassificationSchema, ClassificationSummary, FeatureMetadata,
    TrainingMode,
};
use anonstat::config;
use anonstat::data::{DataHandle, DataTable};
use anonstat::logging;
use anonstat::ml::metrics::precision_recall_by_class;

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
    let mut settings = match &options.config {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    if let Some(mode) = options.training_mode {
        settings.classification.training_mode = mode;
    }
    if let Some(epochs) = options.epochs {
        settings.classification.epochs = epochs.max(1);
    }

    let output: Arc<dyn DataHandle> = Arc::new(load_table(&options.output, options.delimiter)?);
    let input: Arc<dyn DataHandle> = match &options.input {
        Some(path) => Arc::new(load_table(path, options.delimiter)?),
        None => Arc::clone(&output),
    };
    let schema = ClassificationSchema::from_handle(
        output.as_ref(),
        &options.class_attribute,
        options.features.clone(),
    )
    .map_err(|err| err.to_string())?;

    let (tx, rx) = mpsc::channel::<Result<ClassificationSummary, String>>();
    let failed = tx.clone();
    let task = ClassificationAnalysis::new(
        Arc::new(schema),
        settings.classification.clone(),
        input,
        output,
    )
    .into_task()
    .with_settings(&settings.analysis)
    .on_finish(move |summary| {
        let _ = tx.send(Ok(summary));
    })
    .on_error(move |err| {
        let _ = failed.send(Err(err.to_string()));
    });

    let mut manager = AnalysisManager::new();
    manager.start(task).map_err(|err| err.to_string())?;
    manager.wait();
    let summary = rx
        .try_recv()
        .map_err(|_| "Classification produced no result".to_string())??;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &ClassificationSummary) {
    println!("rows: {}  labeled: {}", summary.rows, summary.labeled);
    println!("accuracy: {:.4}", summary.accuracy);
    println!("baseline accuracy: {:.4}", summary.baseline_accuracy);
    for (idx, stats) in precision_recall_by_class(&summary.confusion).iter().enumerate() {
        println!(
            "class {:>2} {:<16}  precision={:.3}  recall={:.3}  support={}",
            idx, summary.classes[idx], stats.precision, stats.recall, stats.support
        );
    }
    println!("confusion matrix (rows=true, cols=pred):");
    let cm = &summary.confusion;
    for truth in 0..cm.n_classes {
        let mut row = String::new();
        for pred in 0..cm.n_classes {
            row.push_str(&format!("{:6}", cm.get(truth, pred)));
        }
        println!("{row}");
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    output: PathBuf,
    input: Option<PathBuf>,
    class_attribute: String,
    features: Vec<FeatureMetadata>,
    delimiter: char,
    training_mode: Option<TrainingMode>,
    epochs: Option<usize>,
    config: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut output: Option<PathBuf> = None;
    let mut input: Option<PathBuf> = None;
    let mut class_attribute: Option<String> = None;
    let mut features = Vec::new();
    let mut delimiter = ';';
    let mut training_mode = None;
    let mut epochs = None;
    let mut config: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                output = Some(PathBuf::from(value));
            }
            "--input" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--input requires a value".to_string())?;
                input = Some(PathBuf::from(value));
            }
            "--class" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--class requires a value".to_string())?;
                class_attribute = Some(value.clone());
            }
            "--feature" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--feature requires a value".to_string())?;
                features.push(parse_feature(value)?);
            }
            "--delimiter" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--delimiter requires a value".to_string())?;
                delimiter = match value.as_str() {
                    "tab" | "\\t" => '\t',
                    other if other.chars().count() == 1 => other.chars().next().unwrap_or(';'),
                    other => return Err(format!("Invalid --delimiter value: {other}")),
                };
            }
            "--offline" => training_mode = Some(TrainingMode::Offline),
            "--online" => training_mode = Some(TrainingMode::Online),
            "--epochs" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--epochs requires a value".to_string())?;
                epochs = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --epochs value: {value}"))?,
                );
            }
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
        output: output.ok_or_else(|| format!("--data is required\n\n{}", help_text()))?,
        input,
        class_attribute: class_attribute
            .ok_or_else(|| format!("--class is required\n\n{}", help_text()))?,
        features,
        delimiter,
        training_mode,
        epochs,
        config,
    })
}

/// `name`, `name:numeric` or `name:micro`.
fn parse_feature(value: &str) -> Result<FeatureMetadata, String> {
    match value.rsplit_once(':') {
        Some((name, "numeric")) => Ok(FeatureMetadata::numeric(name)),
        Some((name, "micro")) => Ok(FeatureMetadata::microaggregated(name)),
        Some((_, kind)) => Err(format!("Unknown feature kind {kind:?} in {value}")),
        None => Ok(FeatureMetadata::categorical(value)),
    }
}

fn load_table(path: &PathBuf, delimiter: char) -> Result<DataTable, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
    DataTable::from_delimited(&text, delimiter).map_err(|err| err.to_string())
}

fn help_text() -> String {
    [
        "Usage: anonstat-classify --data <file> --class <name> [--feature <name>[:numeric|:micro]]...",
        "",
        "Options:",
        "  --input <file>       Unaggregated table for microaggregated features",
        "  --delimiter <char>   Cell delimiter (default ';', 'tab' for tabs)",
        "  --online | --offline Override the configured training mode",
        "  --epochs <n>         Passes over buffered examples in offline mode",
        "  --config <file>      Settings file (default: app config.toml)",
    ]
    .join("\n")
}
