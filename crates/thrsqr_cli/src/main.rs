//! ThrSqr command-line front end.
//!
//! # Responsibility
//! - Load configuration, initialize logging and open the single event store.
//! - Map subcommands onto core use-cases and print their results.
//!
//! # Invariants
//! - Participant identity is always passed explicitly (`--participant`).
//! - All date formatting happens here; core only returns UTC instants.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use thrsqr_core::db::{open_db, open_db_in_memory};
use thrsqr_core::{
    default_log_level, init_logging, init_stderr_logging, next_occurrence, previous_occurrence,
    resolve_event_path, CoreConfig, EventDetails, EventId, EventService, LedgerService,
    ParticipantId, RecurrenceDescriptor, RespondRequest, SqliteEventStore, TimeOfDay,
};

/// Weekly-recurring event RSVP tool
#[derive(Parser, Debug)]
#[command(name = "thrsqr")]
#[command(about = "Create weekly events and track who is there or square", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database file; overrides `db_path` from the config
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Evaluate as of this RFC 3339 instant instead of the system clock
    #[arg(long, value_name = "RFC3339")]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new weekly event
    Create(EventArgs),
    /// Replace title, info and schedule of an event
    Edit {
        /// Event id or `<slug>/<id>` path
        event: String,
        #[command(flatten)]
        details: EventArgs,
    },
    /// Show an event with its current responses
    Show {
        /// Event id or `<slug>/<id>` path
        event: String,
    },
    /// Record or update a response
    Respond {
        /// Event id or `<slug>/<id>` path
        event: String,
        /// Name shown next to the response
        #[arg(long)]
        name: String,
        /// Respond "not attending" instead of "attending"
        #[arg(long)]
        square: bool,
        #[arg(long)]
        comment: Option<String>,
        /// Identity from an earlier response
        #[arg(long)]
        participant: Option<ParticipantId>,
    },
    /// Remove a participant's response
    Remove {
        /// Event id or `<slug>/<id>` path
        event: String,
        participant: ParticipantId,
    },
    /// Print previous and next occurrence for a schedule
    Occurrences(ScheduleArgs),
}

#[derive(Args, Debug)]
struct EventArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    info: String,
    #[command(flatten)]
    schedule: ScheduleArgs,
}

#[derive(Args, Debug)]
struct ScheduleArgs {
    /// Day of week, 0 = Sunday .. 6 = Saturday
    #[arg(long)]
    day: u32,
    /// Local start time, `HH:MM` (24h)
    #[arg(long, value_parser = parse_time)]
    time: TimeOfDay,
    /// Offset of the local time from UTC, in minutes
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    utc_offset: i32,
}

impl ScheduleArgs {
    fn recurrence(&self) -> RecurrenceDescriptor {
        RecurrenceDescriptor::new(self.day, self.time, self.utc_offset)
    }
}

impl EventArgs {
    fn details(&self) -> EventDetails {
        EventDetails {
            title: self.title.clone(),
            info: self.info.clone(),
            recurrence: self.schedule.recurrence(),
        }
    }
}

fn parse_time(value: &str) -> Result<TimeOfDay, String> {
    TimeOfDay::parse(value).ok_or_else(|| format!("expected HH:MM, got `{value}`"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.db_path = Some(db.clone());
    }

    let level = config
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    match &config.log_dir {
        Some(dir) => init_logging(&level, dir),
        None => init_stderr_logging(&level),
    }
    .map_err(|err| anyhow!(err))?;

    log::info!(
        "event=cli_start module=cli status=ok version={}",
        env!("CARGO_PKG_VERSION")
    );

    let now = cli.now.unwrap_or_else(Utc::now);
    run(&cli.command, &config, now)
}

fn run(command: &Command, config: &CoreConfig, now: DateTime<Utc>) -> Result<()> {
    let conn = match &config.db_path {
        Some(path) => open_db(path).with_context(|| format!("opening {}", path.display()))?,
        None => open_db_in_memory()?,
    };
    let grace_window = config.grace_window();
    let events = EventService::new(SqliteEventStore::try_new(&conn)?, grace_window);
    let ledger = LedgerService::new(SqliteEventStore::try_new(&conn)?, grace_window);

    match command {
        Command::Create(args) => {
            let created = events.create_event(&args.details(), now)?;
            println!("event:  {}", created.event.event_id);
            println!("share:  /event/{}", created.share_path());
        }
        Command::Edit { event, details } => {
            let edited = events.edit_event(event_id(event)?, &details.details())?;
            println!("updated {} ({})", edited.event_id, edited.title);
        }
        Command::Show { event } => {
            let view = events.view_event(event_id(event)?, now)?;
            let local_offset = chrono::FixedOffset::east_opt(
                view.event.recurrence.utc_offset_minutes * 60,
            )
            .ok_or_else(|| anyhow!("stored utc offset out of range"))?;
            println!("{}", view.event.title);
            if !view.event.info.is_empty() {
                println!("{}", view.event.info);
            }
            println!(
                "next:   {}",
                view.next_occurrence
                    .with_timezone(&local_offset)
                    .format("%A %-d %B %Y, %H:%M")
            );
            println!("there:  {}  square: {}", view.tally.going, view.tally.not_going);
            for response in &view.responses {
                let mark = if response.attending { "+" } else { "-" };
                match &response.comment {
                    Some(comment) => println!("  {mark} {} ({comment})", response.display_name),
                    None => println!("  {mark} {}", response.display_name),
                }
            }
        }
        Command::Respond {
            event,
            name,
            square,
            comment,
            participant,
        } => {
            let change = ledger.respond(
                &RespondRequest {
                    event_id: event_id(event)?,
                    participant_id: *participant,
                    display_name: name.clone(),
                    attending: !square,
                    comment: comment.clone(),
                },
                now,
            )?;
            println!("participant: {}", change.participant_id);
            println!("{}", change.notice.to_json()?);
        }
        Command::Remove { event, participant } => {
            let change = ledger.withdraw(event_id(event)?, *participant, now)?;
            println!("{}", change.notice.to_json()?);
        }
        Command::Occurrences(schedule) => {
            let recurrence = schedule.recurrence();
            println!("previous: {}", previous_occurrence(now, &recurrence)?.to_rfc3339());
            println!("next:     {}", next_occurrence(now, &recurrence)?.to_rfc3339());
        }
    }

    Ok(())
}

fn event_id(path: &str) -> Result<EventId> {
    resolve_event_path(path).ok_or_else(|| anyhow!("no event id in `{path}`"))
}
