pub mod batch;
pub mod calculate;
pub mod schema;
pub mod share;
pub mod states;

use crate::scenario::{self, LabelledScenario};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read scenarios from a JSON or CSV file (or stdin with "-").
///
/// Files ending in `.csv` are read as CSV, other files as JSON. Stdin is
/// sniffed: input starting with `{` is JSON, anything else CSV.
pub fn read_scenarios(path: &Path) -> anyhow::Result<Vec<LabelledScenario>> {
    let scenarios = if path.as_os_str() == "-" {
        read_from_stdin()?
    } else {
        read_from_file(path)?
    };
    for labelled in &scenarios {
        labelled.scenario.validate()?;
    }
    Ok(scenarios)
}

fn read_from_file(path: &Path) -> anyhow::Result<Vec<LabelledScenario>> {
    log::debug!("Reading scenarios from {}", path.display());
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let reader = BufReader::new(File::open(path)?);
    if is_csv {
        Ok(scenario::read_scenarios_csv(reader)?)
    } else {
        Ok(scenario::read_scenarios_json(reader)?)
    }
}

fn read_from_stdin() -> anyhow::Result<Vec<LabelledScenario>> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.iter().all(|b| b.is_ascii_whitespace()) {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    let is_json = buffer
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');
    let cursor = io::Cursor::new(buffer);
    if is_json {
        Ok(scenario::read_scenarios_json(cursor)?)
    } else {
        Ok(scenario::read_scenarios_csv(cursor)?)
    }
}
