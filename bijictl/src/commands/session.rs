//! An interactive map session that reads commands from stdin
use crate::output::{self, OutputFormat, rows::IndexedRow};
use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use libbiji::{
    app::MapApp,
    backend::Backend,
    location::{Coordinate, Location},
    map::{HeadlessMap, MapEvent, MapOptions},
    search,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// One line typed into an interactive session
#[derive(Parser, Debug)]
#[command(multicall = true)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub(crate) enum SessionCommand {
    #[command(about = "List all locations", visible_alias = "ls")]
    List,
    #[command(about = "List locations with the given text in the name or description")]
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    #[command(about = "Select location n and fly to it")]
    Select { n: usize },
    #[command(about = "Select a coordinate and fly to it")]
    Goto {
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
    },
    #[command(about = "Clear the selection")]
    Clear,
    #[command(about = "Open the popup of location n")]
    Open { n: usize },
    #[command(about = "Close the popup of location n")]
    Close { n: usize },
    #[command(about = "Re-fetch all locations")]
    Refresh,
    #[command(about = "End the session", visible_aliases = ["exit", "q"])]
    Quit,
}

impl SessionCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub(crate) fn parse(line: &str) -> Result<Option<Self>, clap::Error> {
        let words = line.split_whitespace().collect::<Vec<_>>();
        if words.is_empty() {
            return Ok(None);
        }
        SessionLine::try_parse_from(words).map(|line| Some(line.command))
    }
}

/// Number `shown` by its position in `all`. A row that is no longer in the
/// list has no number to show and is skipped.
fn numbered(all: &[Location], shown: &[&Location]) -> Vec<IndexedRow> {
    shown
        .iter()
        .filter_map(|l| {
            let index = all.iter().position(|a| a.id == l.id)?;
            Some(IndexedRow::new(index, l))
        })
        .collect()
}

struct Session {
    app: MapApp,
    map: HeadlessMap,
}

impl Session {
    fn nth(&self, n: usize) -> Result<Location> {
        let locations = self.app.store().snapshot().locations;
        n.checked_sub(1)
            .and_then(|i| locations.get(i).cloned())
            .ok_or_else(|| anyhow!("No location number {n}, there are {}", locations.len()))
    }

    fn popup_event(&self, n: usize, open: bool) -> Result<()> {
        let location = self.nth(n)?;
        let id = self
            .map
            .marker_for_location(&location.id)
            .ok_or_else(|| anyhow!("Location {n} is not on the map yet"))?;
        let event = match open {
            true => MapEvent::PopupOpened(id),
            false => MapEvent::PopupClosed(id),
        };
        self.app
            .map_events()
            .send(event)
            .map_err(|_| anyhow!("The map is no longer running"))
    }

    fn print(&self, locations: &[&Location]) -> Result<()> {
        let all = self.app.store().snapshot().locations;
        let rows = numbered(&all, locations);
        println!("{}", output::format_records(&rows, OutputFormat::Table)?);
        Ok(())
    }

    /// Run one command. Returns false when the session should end.
    async fn execute(&self, command: SessionCommand) -> Result<bool> {
        debug!(?command, "executing session command");
        match command {
            SessionCommand::List => {
                let state = self.app.store().snapshot();
                self.print(&state.locations.iter().collect::<Vec<_>>())?;
                if let Some(error) = state.error {
                    println!("Last error: {error}");
                }
            }
            SessionCommand::Search { query } => {
                let state = self.app.store().snapshot();
                self.print(&search::search(&state.locations, &query.join(" ")))?;
            }
            SessionCommand::Select { n } => {
                let location = self.nth(n)?;
                self.app.selection().set(Some(location.coordinate()))?;
            }
            SessionCommand::Goto {
                longitude,
                latitude,
            } => {
                let coordinate = Coordinate::new(longitude, latitude);
                coordinate.validate()?;
                self.app.selection().set(Some(coordinate))?;
            }
            SessionCommand::Clear => self.app.selection().clear()?,
            SessionCommand::Open { n } => self.popup_event(n, true)?,
            SessionCommand::Close { n } => self.popup_event(n, false)?,
            SessionCommand::Refresh => {
                self.app.store().fetch_all().await?;
                println!(
                    "{} locations",
                    self.app.store().snapshot().locations.len()
                );
            }
            SessionCommand::Quit => return Ok(false),
        }
        Ok(true)
    }
}

/// Mount a map application on `backend` and run commands from stdin until
/// the user quits, stdin is closed, or Ctrl-C is pressed
pub(crate) async fn run(backend: Arc<dyn Backend>, options: &MapOptions) -> Result<()> {
    let map = HeadlessMap::with_echo();
    let app = MapApp::mount(backend, Box::new(map.clone()), options)?;
    let mut state = app.store().subscribe();
    let loaded = state
        .wait_for(|s| !s.loading)
        .await
        .map(|s| s.locations.len())?;
    println!("{loaded} locations loaded, type 'help' for a list of commands");

    let session = Session { app, map };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        match SessionCommand::parse(&line) {
            Ok(Some(command)) => match session.execute(command).await {
                Ok(true) => (),
                Ok(false) => break,
                Err(e) => println!("{e}"),
            },
            Ok(None) => (),
            Err(e) => println!("{e}"),
        }
    }
    session.app.unmount().await;
    println!("Session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, error::ErrorKind};

    fn parsed(line: &str) -> Option<SessionCommand> {
        SessionCommand::parse(line).expect("failed to parse")
    }

    fn error_kind(line: &str) -> ErrorKind {
        SessionCommand::parse(line)
            .expect_err("parsed an invalid line")
            .kind()
    }

    #[test]
    fn test_session_line() {
        SessionLine::command().debug_assert();
    }

    #[test]
    fn test_parse() {
        assert_eq!(parsed("   "), None);
        assert_eq!(parsed("ls"), Some(SessionCommand::List));
        assert_eq!(
            parsed("search  cafe   tugu"),
            Some(SessionCommand::Search {
                query: vec!["cafe".into(), "tugu".into()]
            })
        );
        assert_eq!(parsed("select 3"), Some(SessionCommand::Select { n: 3 }));
        assert_eq!(
            parsed("goto 106.8456 -6.2088"),
            Some(SessionCommand::Goto {
                longitude: 106.8456,
                latitude: -6.2088
            })
        );
        assert_eq!(parsed("q"), Some(SessionCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(SessionCommand::parse("fly").is_err());
        assert_eq!(error_kind("help"), ErrorKind::DisplayHelp);
        assert_eq!(error_kind("search"), ErrorKind::MissingRequiredArgument);
        assert_eq!(error_kind("goto 106.8"), ErrorKind::MissingRequiredArgument);
        assert_eq!(error_kind("open x"), ErrorKind::ValueValidation);
        assert!(SessionCommand::parse("select -1").is_err());
    }

    #[test]
    fn test_numbered_skips_missing_rows() {
        let location = |id: &str, name: &str| Location {
            id: id.into(),
            name: name.into(),
            description: "".into(),
            latitude: -6.2,
            longitude: 106.8,
            created_by: "ani".into(),
            created_at: time::OffsetDateTime::UNIX_EPOCH,
        };
        let a = location("a", "cafe");
        let b = location("b", "museum");
        let gone = location("c", "pasar");
        let all = vec![a.clone(), b.clone()];

        let rows = numbered(&all, &[&b, &gone]);
        assert_eq!(rows.len(), 1);
        let row = serde_json::to_value(&rows[0]).expect("failed to serialize");
        assert_eq!(row["index"], 2);
        assert_eq!(row["name"], "museum");
    }
}
