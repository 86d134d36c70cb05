mod check;
mod download;
mod registry;
mod run;

use clap::{Args, Parser, Subcommand};

use crate::config::WatchConfig;
use crate::detect::Selection;
use crate::fetch::ContentFetcher;
use crate::registry::Registry;

/// Watch remote resources and download only the ones whose content changed
#[derive(Debug, Parser)]
#[command(name = "resource-watch", version)]
pub struct Cli {
    #[command(flatten)]
    pub select: SelectArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check resources for changes and record the change set
    Check,
    /// Download the resources in the last recorded change set
    Download,
    /// Check, then download whatever changed (default)
    Run,
    /// Summarise the registry
    Registry,
}

#[derive(Debug, Clone, Default, Args)]
pub struct SelectArgs {
    /// Also check disabled resources
    #[arg(long, global = true, env = "WATCH_CHECK_ALL")]
    pub all: bool,

    /// Check only these ids (comma separated)
    #[arg(long, global = true, env = "WATCH_IDS", value_delimiter = ',')]
    pub ids: Vec<String>,
}

impl SelectArgs {
    pub fn selection(&self) -> Selection {
        let ids: Vec<String> = self
            .ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if !ids.is_empty() {
            Selection::Ids(ids)
        } else if self.all {
            Selection::All
        } else {
            Selection::Enabled
        }
    }
}

/// Everything a command needs for one invocation.
pub struct AppState {
    pub config: WatchConfig,
    pub registry: Registry,
    pub fetcher: ContentFetcher,
}

pub async fn dispatch(state: &AppState, cli: Cli) -> anyhow::Result<()> {
    let selection = cli.select.selection();
    match cli.command.unwrap_or(Command::Run) {
        Command::Check => check::check(state, &selection).await.map(|_| ()),
        Command::Download => download::download(state, None).await.map(|_| ()),
        Command::Run => run::run(state, &selection).await,
        Command::Registry => registry::registry(state),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_precedence() {
        assert_eq!(SelectArgs::default().selection(), Selection::Enabled);

        let all = SelectArgs {
            all: true,
            ids: vec![],
        };
        assert_eq!(all.selection(), Selection::All);

        let ids = SelectArgs {
            all: true,
            ids: vec![" a ".to_string(), "".to_string(), "b".to_string()],
        };
        assert_eq!(
            ids.selection(),
            Selection::Ids(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_cli_parses_ids() {
        let cli = Cli::parse_from(["resource-watch", "check", "--ids", "a,b"]);
        assert!(matches!(cli.command, Some(Command::Check)));
        assert_eq!(cli.select.ids, vec!["a", "b"]);
    }
}
