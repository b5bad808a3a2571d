//! Share command - encode scenarios into URL tokens and back

use crate::cmd::read_scenarios;
use crate::share;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ShareCommand {
    #[command(subcommand)]
    action: ShareAction,
}

#[derive(Subcommand, Debug)]
enum ShareAction {
    /// Print a share token for each scenario in a file
    Encode {
        /// JSON or CSV scenario file ("-" for stdin)
        #[arg(default_value = "-")]
        file: PathBuf,

        /// Prefix tokens with this URL, e.g. https://example.com/calculator
        #[arg(long)]
        url: Option<String>,
    },
    /// Print the scenario a token describes, as JSON
    Decode {
        /// Token, with or without a leading '?'
        token: String,
    },
}

impl ShareCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match &self.action {
            ShareAction::Encode { file, url } => {
                for labelled in read_scenarios(file)? {
                    let token = share::encode(&labelled.scenario);
                    match url {
                        Some(url) => println!("{}?{}", url.trim_end_matches('?'), token),
                        None => println!("{}", token),
                    }
                }
                Ok(())
            }
            ShareAction::Decode { token } => {
                // accept a full URL as well as a bare token
                let token = token.rsplit_once('?').map_or(token.as_str(), |(_, t)| t);
                let scenario = share::decode(token)?;
                log::debug!("Decoded share token into {:?}", scenario.stock_type);
                println!("{}", serde_json::to_string_pretty(&scenario)?);
                Ok(())
            }
        }
    }
}
