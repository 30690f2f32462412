//! Line-oriented session over one engine.
//!
//! Each input line is one command. Unnumbered players entering the field
//! switch the session into a number prompt until a valid number is typed
//! or the prompt is cancelled. State is saved after every command.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use qb_core::driver::{drive_clock, DriveStop, ImmediateScheduler, IntervalScheduler};
use qb_core::engine::{BenchMove, FieldMove, PendingNumber, RotationEngine};
use qb_core::roster::PlayerId;
use qb_core::save::{SaveManager, StateStore};
use qb_core::time_source::format_timestamp;
use qb_core::{handle_request_json, ClockPhase, RotationError};
use tracing::{debug, warn};

pub const HELP: &str = "\
commands:
  field <id> [number]   move a player to the field
  bench <id>            move a player to the bench
  goal <id>             score a goal
  start | pause         control the clock
  tick [n]              advance n seconds at once (default 1)
  run [n]               drive the clock until the quarter ends (or n ticks)
  ack                   continue to the next quarter
  undo                  undo the last action
  new                   start a new game
  team <name>           set the team name
  status                show the board
  json <request>        send a raw JSON API request
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Field { player_id: PlayerId, number: Option<u32> },
    Bench(PlayerId),
    Goal(PlayerId),
    Start,
    Pause,
    Tick(u32),
    Run(Option<u32>),
    Ack,
    Undo,
    New,
    Team(String),
    Status,
    Json(String),
    Help,
    Quit,
}

impl SessionCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "field" | "f" => {
                let mut args = rest.split_whitespace();
                let player_id = parse_id(args.next())?;
                let number = match args.next() {
                    Some(raw) => Some(raw.parse::<u32>().with_context(|| format!("bad number {:?}", raw))?),
                    None => None,
                };
                SessionCommand::Field { player_id, number }
            }
            "bench" | "b" => SessionCommand::Bench(parse_id(first(rest))?),
            "goal" | "g" => SessionCommand::Goal(parse_id(first(rest))?),
            "start" => SessionCommand::Start,
            "pause" => SessionCommand::Pause,
            "tick" | "t" => SessionCommand::Tick(parse_count(first(rest))?.unwrap_or(1)),
            "run" => SessionCommand::Run(parse_count(first(rest))?),
            "ack" | "next" => SessionCommand::Ack,
            "undo" | "u" => SessionCommand::Undo,
            "new" => SessionCommand::New,
            "team" => SessionCommand::Team(rest.to_string()),
            "status" | "s" => SessionCommand::Status,
            "json" => SessionCommand::Json(rest.to_string()),
            "help" | "?" => SessionCommand::Help,
            "quit" | "exit" | "q" => SessionCommand::Quit,
            other => bail!("unknown command {:?} (try \"help\")", other),
        };
        Ok(command)
    }
}

fn first(rest: &str) -> Option<&str> {
    rest.split_whitespace().next()
}

fn parse_id(raw: Option<&str>) -> Result<PlayerId> {
    let raw = raw.context("missing player id")?;
    raw.parse().with_context(|| format!("bad player id {:?}", raw))
}

fn parse_count(raw: Option<&str>) -> Result<Option<u32>> {
    raw.map(|raw| raw.parse().with_context(|| format!("bad count {:?}", raw))).transpose()
}

pub struct Session<S: StateStore> {
    engine: RotationEngine,
    saves: SaveManager<S>,
    realtime: bool,
    awaiting: Option<PendingNumber>,
}

impl<S: StateStore> Session<S> {
    pub fn new(engine: RotationEngine, saves: SaveManager<S>, realtime: bool) -> Self {
        Self { engine, saves, realtime, awaiting: None }
    }

    pub fn engine(&self) -> &RotationEngine {
        &self.engine
    }

    /// Process lines until end of input or `quit`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if !self.handle_line(&line, out)? {
                break;
            }
        }
        Ok(())
    }

    /// Returns `false` once the session should end.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<bool> {
        if let Some(pending) = self.awaiting {
            if matches!(SessionCommand::parse(line), Ok(SessionCommand::Quit)) {
                self.engine.cancel_number(pending);
                self.awaiting = None;
                self.save();
                return Ok(false);
            }
            self.answer_prompt(pending, line.trim(), out)?;
            self.flush_notifications(out)?;
            self.save();
            return Ok(true);
        }

        let command = match SessionCommand::parse(line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(out, "error: {:#}", err)?;
                return Ok(true);
            }
        };
        debug!(?command, "session command");

        if command == SessionCommand::Quit {
            return Ok(false);
        }
        if let Err(err) = self.execute(command, out) {
            match err.downcast_ref::<RotationError>() {
                Some(rejection) if rejection.is_advisory() => writeln!(out, "note: {}", rejection)?,
                _ => writeln!(out, "error: {:#}", err)?,
            }
        }
        self.flush_notifications(out)?;
        self.save();
        Ok(true)
    }

    fn execute<W: Write>(&mut self, command: SessionCommand, out: &mut W) -> Result<()> {
        match command {
            SessionCommand::Field { player_id, number: Some(number) } => {
                let moved = self.engine.move_to_field_numbered(player_id, number)?;
                self.report_field_move(moved, out)?;
            }
            SessionCommand::Field { player_id, number: None } => {
                let moved = self.engine.move_to_field(player_id)?;
                self.report_field_move(moved, out)?;
            }
            SessionCommand::Bench(player_id) => {
                let BenchMove { player_id, .. } = self.engine.move_to_bench(player_id)?;
                writeln!(out, "player {} benched", player_id)?;
            }
            SessionCommand::Goal(player_id) => match self.engine.score_goal(player_id)? {
                Some(goal) => {
                    let fire = if goal.on_fire { " (on fire)" } else { "" };
                    writeln!(out, "goal! {} total{}, team {}", goal.goals, fire, self.engine.team_score())?;
                }
                None => writeln!(out, "goal not counted: clock stopped or player benched")?,
            },
            SessionCommand::Start => {
                if !self.engine.start_clock()? {
                    writeln!(out, "clock already running")?;
                }
            }
            SessionCommand::Pause => {
                if !self.engine.pause_clock() {
                    writeln!(out, "clock is not running")?;
                }
            }
            SessionCommand::Tick(count) => {
                let summary = drive_clock(&mut self.engine, &mut ImmediateScheduler::default(), Some(count));
                writeln!(out, "{} tick(s), clock {}", summary.ticks, self.engine.clock().display())?;
            }
            SessionCommand::Run(budget) => {
                let summary = if self.realtime {
                    drive_clock(&mut self.engine, &mut IntervalScheduler::default(), budget)
                } else {
                    drive_clock(&mut self.engine, &mut ImmediateScheduler::default(), budget)
                };
                if summary.stop == DriveStop::NotRunning && summary.ticks == 0 {
                    writeln!(out, "clock is not running")?;
                } else {
                    writeln!(out, "{} tick(s), clock {}", summary.ticks, self.engine.clock().display())?;
                }
            }
            SessionCommand::Ack => {
                let quarter = self.engine.acknowledge_quarter_end()?;
                writeln!(out, "quarter {} ready", quarter)?;
            }
            SessionCommand::Undo => {
                self.engine.undo()?;
                self.awaiting = None;
                writeln!(out, "undone")?;
            }
            SessionCommand::New => {
                self.engine.new_game();
                self.awaiting = None;
                writeln!(out, "new game")?;
            }
            SessionCommand::Team(name) => {
                if name.is_empty() {
                    bail!("team name cannot be empty");
                }
                self.engine.set_team_name(name);
            }
            SessionCommand::Status => write_status(&self.engine, out)?,
            SessionCommand::Json(request) => {
                let response = handle_request_json(&mut self.engine, &request);
                // a raw request may open or resolve a number prompt
                self.awaiting = self.engine.pending_number();
                writeln!(out, "{}", pretty_json(&response))?;
            }
            SessionCommand::Help => writeln!(out, "{}", HELP)?,
            SessionCommand::Quit => {}
        }
        Ok(())
    }

    fn report_field_move<W: Write>(&mut self, moved: FieldMove, out: &mut W) -> Result<()> {
        match moved {
            FieldMove::Moved { player_id, number, .. } => {
                writeln!(out, "player {} on the field as #{}", player_id, number)?;
            }
            FieldMove::NumberRequired(pending) => {
                self.awaiting = Some(pending);
                writeln!(out, "number for player {} (or \"cancel\"):", pending.player_id)?;
            }
        }
        Ok(())
    }

    fn answer_prompt<W: Write>(&mut self, pending: PendingNumber, answer: &str, out: &mut W) -> Result<()> {
        if answer.eq_ignore_ascii_case("cancel") {
            self.engine.cancel_number(pending);
            self.awaiting = None;
            writeln!(out, "cancelled")?;
            return Ok(());
        }

        match self.engine.commit_number(pending, answer) {
            Ok(moved) => {
                self.awaiting = None;
                self.report_field_move(moved, out)
            }
            Err(err) => {
                // token stays live on bad input; drop the prompt if it no longer is
                if self.engine.pending_number() != Some(pending) {
                    self.awaiting = None;
                    writeln!(out, "error: {}", err)?;
                } else {
                    writeln!(out, "error: {}. number for player {} (or \"cancel\"):", err, pending.player_id)?;
                }
                Ok(())
            }
        }
    }

    fn flush_notifications<W: Write>(&mut self, out: &mut W) -> Result<()> {
        for notification in self.engine.take_notifications() {
            // rejections already printed their error
            if notification.is_rejection() {
                continue;
            }
            if let Some(prompt) = notification.prompt() {
                writeln!(out, "> {}", prompt)?;
            }
        }
        Ok(())
    }

    fn save(&mut self) {
        if let Err(err) = self.saves.save(&self.engine) {
            warn!(%err, "could not save game");
        }
    }
}

pub fn write_status<W: Write>(engine: &RotationEngine, out: &mut W) -> Result<()> {
    let clock = engine.clock();
    let phase = match clock.phase() {
        ClockPhase::Running => "running",
        ClockPhase::Stopped => "stopped",
        ClockPhase::QuarterComplete => "quarter over",
    };
    let team = if engine.team_name().is_empty() { "Team" } else { engine.team_name() };
    writeln!(out, "{} {} | Q{} {} {}", team, engine.team_score(), clock.quarter(), clock.display(), phase)?;

    for (heading, on_field) in [("field", true), ("bench", false)] {
        writeln!(out, "{}:", heading)?;
        for player in engine.players().iter().filter(|p| p.on_field == on_field) {
            let mut flags = String::new();
            if engine.is_fatigued(player.id) {
                flags.push_str(" tired");
            }
            if player.on_fire {
                flags.push_str(" on-fire");
            }
            writeln!(
                out,
                "  [{}] {:<14} goals {:>2}  played {:>8}{}",
                player.id,
                player.display_name(),
                player.goals,
                player.time_on_field_display(),
                flags
            )?;
        }
    }

    let board = engine.leaderboard();
    writeln!(
        out,
        "most time: {} ({}s) | most goals: {} ({})",
        board.most_time_on_field.name,
        board.most_time_on_field.value,
        board.most_goals.name,
        board.most_goals.value
    )?;
    for entry in engine.activity_log().entries().take(5) {
        writeln!(out, "  - {} {}", format_timestamp(entry.timestamp), entry.message)?;
    }
    Ok(())
}

/// Run one JSON request against the saved game and persist the result.
pub fn run_json_request<S: StateStore>(
    engine: &mut RotationEngine,
    saves: &mut SaveManager<S>,
    request: &str,
) -> Result<String> {
    let response = handle_request_json(engine, request);
    saves.save(engine).context("saving game")?;
    Ok(pretty_json(&response))
}

/// Indent a JSON response for the terminal; anything unparseable passes through.
pub fn pretty_json(raw: &str) -> String {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| raw.to_string())
}
