//! Interactive session. Searches run as background tasks and may overlap; the
//! session's tickets decide which response ends up on screen.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use colored::Colorize;
use fhirview_core::age::today_utc;
use fhirview_core::grid::{Column, SortDirection, SortSpec};
use fhirview_core::query::PatientQuery;
use fhirview_core::{Outcome, SearchForm, Session, normalize_bundle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use crate::cli::OutputFormat;
use crate::client::FhirClient;
use crate::output::{print_detail, print_error, print_grid};

const HELP: &str = "\
Commands:
  all                                   fetch every patient
  range [from] [to]                     birthdate range (default ge1960-01-01 le1965-01-01)
  search [name=<name>] [birthdate=<yyyy-MM-dd>]
  sort [column] [asc|desc]              sort rows; no column clears sorting
  filter [text]                         keep rows containing text; no text clears
  expand <id|row>                       show the raw resource of a row
  show                                  redraw the table
  help                                  this message
  quit                                  leave (waits for running searches)";

#[derive(Debug, PartialEq)]
pub enum ShellCommand {
    Fetch(PatientQuery),
    Sort(Option<SortSpec>),
    Filter(String),
    Expand(String),
    Show,
    Help,
    Quit,
    Nothing,
}

pub fn parse_command(line: &str) -> Result<ShellCommand> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match word.to_lowercase().as_str() {
        "" => ShellCommand::Nothing,
        "all" | "list" => ShellCommand::Fetch(PatientQuery::All),
        "range" => {
            if args.len() > 2 {
                anyhow::bail!("Usage: range [from] [to]");
            }
            ShellCommand::Fetch(PatientQuery::birth_range(
                args.first().copied(),
                args.get(1).copied(),
            ))
        }
        "search" => ShellCommand::Fetch(parse_search(&args)?.submit()?),
        "sort" => match args.as_slice() {
            [] => ShellCommand::Sort(None),
            [column] => ShellCommand::Sort(Some(SortSpec {
                column: column.parse::<Column>()?,
                direction: SortDirection::Asc,
            })),
            [column, direction] => ShellCommand::Sort(Some(SortSpec {
                column: column.parse::<Column>()?,
                direction: direction.parse::<SortDirection>()?,
            })),
            _ => anyhow::bail!("Usage: sort [column] [asc|desc]"),
        },
        "filter" => ShellCommand::Filter(rest.to_string()),
        "expand" => match args.as_slice() {
            [key] => ShellCommand::Expand(key.to_string()),
            _ => anyhow::bail!("Usage: expand <id|row>"),
        },
        "show" => ShellCommand::Show,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => anyhow::bail!("Unknown command: {other}. Type `help` for commands"),
    };
    Ok(command)
}

/// `name=John Smith birthdate=1960-01-01`: words without `=` continue the previous value.
fn parse_search(args: &[&str]) -> Result<SearchForm> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) => pairs.push((key.to_lowercase(), value.to_string())),
            None => match pairs.last_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(arg);
                }
                None => anyhow::bail!("Expected key=value, got \"{arg}\""),
            },
        }
    }

    let mut form = SearchForm::default();
    for (key, value) in pairs {
        match key.as_str() {
            "name" => form.name = value,
            "birthdate" => form.birth_date = value,
            other => anyhow::bail!("Unknown search field: {other}. Valid: name, birthdate"),
        }
    }
    Ok(form)
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

fn render(session: &Session, format: OutputFormat) {
    if let Err(e) = print_grid(session.grid(), session.response_time(), format) {
        print_error(&format!("{e:#}"));
    }
}

fn spawn_fetch(
    tasks: &mut JoinSet<()>,
    client: &FhirClient,
    session: &Arc<Mutex<Session>>,
    query: PatientQuery,
    format: OutputFormat,
) {
    let ticket = lock(session).begin();
    tracing::debug!(ticket = ticket.sequence(), %query, "search started");
    let client = client.clone();
    let session = Arc::clone(session);

    tasks.spawn(async move {
        let result = async {
            let fetched = client.fetch(&query).await?;
            let records = normalize_bundle(&fetched.bundle, today_utc());
            Ok::<_, anyhow::Error>((records, fetched.elapsed))
        }
        .await;

        let mut session = lock(&session);
        match result {
            Ok((records, elapsed)) => match session.apply(ticket, records, elapsed) {
                Outcome::Applied => render(&session, format),
                Outcome::Stale => {
                    tracing::info!(ticket = ticket.sequence(), %query, "newer results already shown; dropping response");
                }
            },
            Err(e) => {
                session.fail(ticket);
                print_error(&format!("{query}: {e:#}"));
            }
        }
    });
}

fn execute(
    command: ShellCommand,
    tasks: &mut JoinSet<()>,
    client: &FhirClient,
    session: &Arc<Mutex<Session>>,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ShellCommand::Fetch(query) => spawn_fetch(tasks, client, session, query, format),
        ShellCommand::Sort(sort) => {
            let mut session = lock(session);
            session.grid_mut().set_sort(sort);
            render(&session, format);
        }
        ShellCommand::Filter(filter) => {
            let mut session = lock(session);
            session.grid_mut().set_filter(filter);
            render(&session, format);
        }
        ShellCommand::Expand(key) => {
            let session = lock(session);
            print_detail(session.grid().expand(&key)?)?;
        }
        ShellCommand::Show => {
            let session = lock(session);
            if session.is_searching() {
                println!("{}", "Searching…".yellow());
            }
            render(&session, format);
        }
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Quit | ShellCommand::Nothing => {}
    }
    Ok(())
}

pub async fn run(client: &FhirClient, format: OutputFormat) -> Result<()> {
    let session = Arc::new(Mutex::new(Session::new()));
    let mut tasks = JoinSet::new();

    println!(
        "Connected to {}. Type {} for commands.",
        client.base_url().cyan(),
        "help".cyan()
    );
    spawn_fetch(&mut tasks, client, &session, PatientQuery::All, format);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        while let Some(done) = tasks.try_join_next() {
            if let Err(e) = done {
                tracing::warn!(error = %e, "search task ended abnormally");
            }
        }

        match parse_command(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => {
                if let Err(e) = execute(command, &mut tasks, client, &session, format) {
                    print_error(&format!("{e:#}"));
                }
            }
            Err(e) => print_error(&format!("{e:#}")),
        }
    }

    while let Some(done) = tasks.join_next().await {
        if let Err(e) = done {
            tracing::warn!(error = %e, "search task ended abnormally");
        }
    }
    Ok(())
}
