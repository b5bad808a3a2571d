//! States command - the QSBS conformity table

use crate::money::format_rate;
use crate::tax::{all_states, lookup_state, Conformity, StateConformityEntry};
use clap::{Args, ValueEnum};
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct StatesCommand {
    /// Show a single state (e.g. CA)
    code: Option<String>,

    /// Only list states with this conformity status
    #[arg(short, long, value_enum)]
    conformity: Option<ConformityArg>,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConformityArg {
    Full,
    #[value(name = "none")]
    NonConforming,
    NoIncomeTax,
}

impl From<ConformityArg> for Conformity {
    fn from(arg: ConformityArg) -> Self {
        match arg {
            ConformityArg::Full => Conformity::Full,
            ConformityArg::NonConforming => Conformity::NonConforming,
            ConformityArg::NoIncomeTax => Conformity::NoIncomeTax,
        }
    }
}

#[derive(Debug, Clone, Tabled)]
struct StateRow {
    #[tabled(rename = "Code")]
    code: &'static str,
    #[tabled(rename = "State")]
    name: &'static str,
    #[tabled(rename = "QSBS Conformity")]
    conformity: &'static str,
    #[tabled(rename = "Top Rate")]
    top_rate: String,
}

impl From<&StateConformityEntry> for StateRow {
    fn from(entry: &StateConformityEntry) -> Self {
        StateRow {
            code: entry.code,
            name: entry.name,
            conformity: entry.conformity.display(),
            top_rate: format_rate(entry.top_rate),
        }
    }
}

impl StatesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let states = self.selected()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&states)?);
            return Ok(());
        }

        if states.is_empty() {
            println!("No states match the filter");
            return Ok(());
        }

        let rows: Vec<StateRow> = states.iter().map(|s| StateRow::from(*s)).collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
            .to_string();
        println!();
        println!("STATE QSBS CONFORMITY");
        println!();
        println!("{}", table);
        Ok(())
    }

    fn selected(&self) -> anyhow::Result<Vec<&'static StateConformityEntry>> {
        if let Some(ref code) = self.code {
            return match lookup_state(code) {
                Some(state) => Ok(vec![state]),
                None => anyhow::bail!("Unknown state code '{}'", code),
            };
        }
        let filter: Option<Conformity> = self.conformity.map(Into::into);
        Ok(all_states()
            .iter()
            .filter(|s| filter.map_or(true, |c| s.conformity == c))
            .collect())
    }
}
