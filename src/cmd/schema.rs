//! Schema command - print expected input formats

use crate::scenario::{Scenario, ScenarioRecord};
use crate::tax::QsbsReport;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for a scenario
    JsonSchema,
    /// JSON Schema for a calculation report
    ReportSchema,
    /// CSV header row with column names
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(Scenario);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::ReportSchema => {
                let schema = schema_for!(QsbsReport);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => {
                let names: Vec<_> = ScenarioRecord::csv_columns()
                    .iter()
                    .map(|c| c.name)
                    .collect();
                println!("{}", names.join(","));
            }
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
        Ok(())
    }

    fn print_csv_fields(&self) {
        println!("CSV Input Format");
        println!("================");
        println!();
        for column in ScenarioRecord::csv_columns() {
            let req = if column.required { "required" } else { "optional" };
            println!("{:24} ({:8})  {}", column.name, req, column.description);
        }
        println!();
        println!("Dates are YYYY-MM-DD; amounts are US dollars.");
    }
}
