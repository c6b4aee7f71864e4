use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Local;
use log::error;

use datforge::{
    dat_files_in, latest_local_version, ActionRegistry, DatIngest, ForgeError, ForgeResult,
    IngestOptions, SqlBuilder,
};

const USER_AGENT: &str = concat!("datforge/", env!("CARGO_PKG_VERSION"));

const TOSEC_CATEGORIES: [&str; 3] = ["TOSEC", "TOSEC-ISO", "TOSEC-PIX"];

fn main() -> ExitCode {
    env_logger::init();

    let start_time = Local::now();
    println!();
    println!("Starting at: {}", start_time.format("%Y-%m-%d %H:%M:%S"));
    println!("{}", USER_AGENT);
    println!();

    let exit_code = match run(env::args().skip(1)) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            println!("{}", e);
            -1
        }
    };

    let end_time = Local::now();
    let seconds = (end_time - start_time).num_milliseconds() as f64 / 1000.0;
    println!();
    println!(
        "Finished at: {}, Seconds taken: {:.1}",
        end_time.format("%Y-%m-%d %H:%M:%S"),
        seconds
    );
    println!();

    if exit_code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(args: impl Iterator<Item = String>) -> ForgeResult<i32> {
    let mut parameters = parse_parameters(args)?;

    if !parameters.contains_key("DIRECTORY") {
        let current = env::current_dir()?;
        parameters.insert("DIRECTORY".to_string(), current.display().to_string());
    }
    if !parameters.contains_key("VERSION") {
        parameters.insert("VERSION".to_string(), "0".to_string());
    }

    let data = parameters.get("DATA").cloned().ok_or_else(usage)?;
    let action = parameters.get("ACTION").cloned().ok_or_else(usage)?;

    let mut registry = ActionRegistry::new();
    registry.register("TOSEC", "Load", tosec_load);

    registry.dispatch(&data, &action, &parameters)
}

fn usage() -> ForgeError {
    ForgeError::InvalidOperation {
        operation: "Usage".to_string(),
        reason: "DATA and ACTION parameters are required".to_string(),
        suggestion: "Example: datforge DATA=TOSEC ACTION=load DIRECTORY=/data VERSION=0"
            .to_string(),
    }
}

fn parse_parameters(
    args: impl Iterator<Item = String>,
) -> ForgeResult<HashMap<String, String>> {
    let mut parameters = HashMap::new();
    for arg in args {
        let index = arg.find('=').ok_or_else(|| ForgeError::InvalidOperation {
            operation: "Parse Arguments".to_string(),
            reason: format!("Bad argument format expecting KEY=VALUE : '{}'", arg),
            suggestion: "Quote values containing spaces".to_string(),
        })?;
        parameters.insert(arg[..index].to_uppercase(), arg[index + 1..].to_string());
    }
    Ok(parameters)
}

fn required_parameters(
    parameters: &HashMap<String, String>,
    action: &str,
    names: &[&str],
) -> ForgeResult<()> {
    for name in names {
        if !parameters.contains_key(*name) {
            return Err(ForgeError::InvalidOperation {
                operation: action.to_string(),
                reason: format!("The action \"{}\" requires the parameters \"{}\"", action, names.join(", ")),
                suggestion: "Pass them as KEY=VALUE arguments".to_string(),
            });
        }
    }
    Ok(())
}

/// Fold every datfile of the local TOSEC version into one model, then write
/// the SQL script and the provenance report next to it.
fn tosec_load(parameters: &HashMap<String, String>) -> ForgeResult<i32> {
    required_parameters(parameters, "Load", &["DIRECTORY", "VERSION"])?;

    let root_directory = PathBuf::from(&parameters["DIRECTORY"]).join("TOSEC");
    let mut version = parameters["VERSION"].clone();
    if version == "0" {
        version = latest_local_version(&root_directory)?;
    }
    let version_directory = root_directory.join(&version);

    let mut ingest = DatIngest::new(IngestOptions::default());

    for category in TOSEC_CATEGORIES {
        let category_directory = version_directory.join(category);
        for filename in dat_files_in(&category_directory)? {
            ingest.ingest_file(category, &filename)?;
        }
    }

    println!("Loaded {} datfiles from version {}", ingest.files_loaded(), version);

    let (model, report) = ingest.into_parts();
    model.validate()?;

    let sql_path = version_directory.join("TOSEC.sql");
    let mut builder = SqlBuilder::with_capacity(1024 * 1024);
    builder.script(&model);
    fs::write(&sql_path, builder.build())?;
    println!("Wrote {}", sql_path.display());

    let report_path = version_directory.join("TOSEC-report.json");
    write_report(&report.to_json(), &report_path)?;
    println!("Wrote {}", report_path.display());

    Ok(0)
}

fn write_report(report: &serde_json::Value, path: &Path) -> ForgeResult<()> {
    let text = serde_json::to_string_pretty(report)
        .map_err(|e| ForgeError::Custom(format!("Report serialization failed: {}", e)))?;
    fs::write(path, text)?;
    Ok(())
}
