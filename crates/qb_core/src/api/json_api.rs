// Rotation engine JSON API
//
// One request carries one command; every response carries the full state
// view plus the notifications the command produced, so a front end can
// re-render from a single reply.
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::activity_log::ActivityEntry;
use crate::clock::{ClockPhase, MatchState};
use crate::driver::{drive_clock, DriveStop, ImmediateScheduler};
use crate::engine::{
    BenchMove, FieldMove, GoalOutcome, Notification, PendingNumber, RotationEngine, Suggestion,
};
use crate::roster::{Leaderboard, PlayerId};
use crate::save::PersistedState;
use crate::tracker::FatigueLevel;
use crate::SCHEMA_VERSION;

/// Command request from a front end.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub schema_version: u8,
    pub command: Command,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Numbered players move at once; unnumbered ones get a token back.
    MoveToField { player_id: PlayerId },

    /// Resolve a `NumberRequired` token with the typed number.
    CommitNumber { player_id: PlayerId, token: u64, number: String },

    CancelNumber { player_id: PlayerId, token: u64 },

    /// Single-step entry when the number is already known.
    MoveToFieldNumbered { player_id: PlayerId, number: u32 },

    MoveToBench { player_id: PlayerId },

    ScoreGoal { player_id: PlayerId },

    StartClock,

    PauseClock,

    /// Deliver up to `count` ticks (default 1). Stops early at quarter end.
    Tick {
        #[serde(default)]
        count: Option<u32>,
    },

    AcknowledgeQuarterEnd,

    Undo,

    NewGame,

    SetTeamName { name: String },

    /// No mutation; just the state view.
    GetState,

    /// Persisted shape for the external store.
    Serialize,

    /// Untyped so a malformed blob reaches the engine's fallback.
    Restore { state: serde_json::Value },
}

/// Response to a front end.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub schema_version: u8,
    pub success: bool,
    /// Absent for malformed requests.
    pub state: Option<StateView>,
    pub notifications: Vec<NotificationView>,
    pub result: Option<CommandResult>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CommandResult {
    Moved { player_id: PlayerId, number: u32, ready_to_start: bool },
    NumberRequired { player_id: PlayerId, token: u64 },
    NumberCancelled { was_pending: bool },
    Benched { player_id: PlayerId, suggestion: Option<Suggestion> },
    Goal { counted: bool, goals: Option<u32>, on_fire: bool },
    /// `changed: false` when the clock was already in the requested state.
    Clock { changed: bool },
    Ticked { ticks: u32, quarter_ended: Option<u32> },
    QuarterAdvanced { quarter: u32 },
    Done,
    Persisted { state: PersistedState },
    Restored { adopted: bool },
}

/// A notification plus the prompt text a dialog would show for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub prompt: Option<String>,
}

impl From<Notification> for NotificationView {
    fn from(notification: Notification) -> Self {
        let prompt = notification.prompt();
        Self { notification, prompt }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub number: Option<u32>,
    pub display_name: String,
    pub on_field: bool,
    pub goals: u32,
    pub total_time_on_field: u32,
    pub time_on_field_display: String,
    pub fatigue: u32,
    pub fatigue_level: FatigueLevel,
    pub fatigue_ratio: f32,
    pub is_fatigued: bool,
    pub on_fire: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateView {
    pub team_name: String,
    pub team_score: u32,
    #[serde(rename = "match")]
    pub match_state: MatchState,
    pub clock_display: String,
    pub quarter_pending: bool,
    pub players: Vec<PlayerView>,
    pub leaderboard: Leaderboard,
    pub activity_log: Vec<ActivityEntry>,
    pub can_undo: bool,
    pub pending_number: Option<PendingNumber>,
}

impl StateView {
    pub fn from_engine(engine: &RotationEngine) -> Self {
        let players = engine
            .players()
            .iter()
            .map(|p| PlayerView {
                id: p.id,
                number: p.number,
                display_name: p.display_name(),
                on_field: p.on_field,
                goals: p.goals,
                total_time_on_field: p.total_time_on_field,
                time_on_field_display: p.time_on_field_display(),
                fatigue: p.fatigue,
                fatigue_level: engine.fatigue_level(p.id).unwrap_or(FatigueLevel::Fresh),
                fatigue_ratio: engine.fatigue_ratio(p.id).unwrap_or(0.0),
                is_fatigued: engine.is_fatigued(p.id),
                on_fire: p.on_fire,
            })
            .collect();

        Self {
            team_name: engine.team_name().to_string(),
            team_score: engine.team_score(),
            match_state: engine.match_state(),
            clock_display: engine.clock().display(),
            quarter_pending: engine.clock().phase() == ClockPhase::QuarterComplete,
            players,
            leaderboard: engine.leaderboard(),
            activity_log: engine.activity_log().to_vec(),
            can_undo: engine.history_len() > 0,
            pending_number: engine.pending_number(),
        }
    }
}

/// Apply one JSON command to the engine and describe the outcome as JSON.
///
/// Never fails: malformed requests and rejected commands come back with
/// `success: false` and an `error_message`.
pub fn handle_request_json(engine: &mut RotationEngine, request_json: &str) -> String {
    let response = match parse_request(request_json) {
        Ok(request) => execute(engine, request.command),
        Err(message) => {
            warn!("Rejected API request: {}", message);
            CommandResponse {
                schema_version: SCHEMA_VERSION,
                success: false,
                state: None,
                notifications: Vec::new(),
                result: None,
                error_message: Some(message),
            }
        }
    };

    serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(
            r#"{{"schema_version":{},"success":false,"error_message":"Serialization failed: {}"}}"#,
            SCHEMA_VERSION,
            e.to_string().replace('"', "'")
        )
    })
}

fn parse_request(request_json: &str) -> Result<CommandRequest, String> {
    let request: CommandRequest =
        serde_json::from_str(request_json).map_err(|e| format!("Invalid JSON request: {}", e))?;

    if request.schema_version != SCHEMA_VERSION {
        return Err(format!("Unsupported schema version: {}", request.schema_version));
    }
    Ok(request)
}

fn execute(engine: &mut RotationEngine, command: Command) -> CommandResponse {
    debug!(?command, "Processing API command");

    let outcome = match command {
        Command::MoveToField { player_id } => engine.move_to_field(player_id).map(field_result),

        Command::CommitNumber { player_id, token, number } => engine
            .commit_number(PendingNumber { player_id, token }, &number)
            .map(field_result),

        Command::CancelNumber { player_id, token } => {
            let was_pending = engine.cancel_number(PendingNumber { player_id, token });
            Ok(CommandResult::NumberCancelled { was_pending })
        }

        Command::MoveToFieldNumbered { player_id, number } => {
            engine.move_to_field_numbered(player_id, number).map(field_result)
        }

        Command::MoveToBench { player_id } => {
            engine.move_to_bench(player_id).map(|BenchMove { player_id, suggestion }| {
                CommandResult::Benched { player_id, suggestion }
            })
        }

        Command::ScoreGoal { player_id } => engine.score_goal(player_id).map(goal_result),

        Command::StartClock => engine.start_clock().map(|changed| CommandResult::Clock { changed }),

        Command::PauseClock => Ok(CommandResult::Clock { changed: engine.pause_clock() }),

        Command::Tick { count } => {
            let summary =
                drive_clock(engine, &mut ImmediateScheduler::default(), Some(count.unwrap_or(1)));
            let quarter_ended = match summary.stop {
                DriveStop::QuarterEnded { quarter } => Some(quarter),
                _ => None,
            };
            Ok(CommandResult::Ticked { ticks: summary.ticks, quarter_ended })
        }

        Command::AcknowledgeQuarterEnd => engine
            .acknowledge_quarter_end()
            .map(|quarter| CommandResult::QuarterAdvanced { quarter }),

        Command::Undo => engine.undo().map(|()| CommandResult::Done),

        Command::NewGame => {
            engine.new_game();
            Ok(CommandResult::Done)
        }

        Command::SetTeamName { name } => {
            engine.set_team_name(name);
            Ok(CommandResult::Done)
        }

        Command::GetState => Ok(CommandResult::Done),

        Command::Serialize => Ok(CommandResult::Persisted { state: engine.serialize() }),

        Command::Restore { state } => {
            let adopted = match serde_json::from_value::<PersistedState>(state) {
                Ok(state) => engine.restore(state),
                Err(err) => {
                    warn!(%err, "Unparseable restore payload, starting fresh");
                    engine.reset_to_initial();
                    false
                }
            };
            if !adopted {
                info!("Restore request fell back to a fresh game");
            }
            Ok(CommandResult::Restored { adopted })
        }
    };

    let notifications = engine.take_notifications().into_iter().map(Into::into).collect();
    let state = Some(StateView::from_engine(engine));

    match outcome {
        Ok(result) => CommandResponse {
            schema_version: SCHEMA_VERSION,
            success: true,
            state,
            notifications,
            result: Some(result),
            error_message: None,
        },
        Err(err) => CommandResponse {
            schema_version: SCHEMA_VERSION,
            // advisory no-ops (empty history, nothing to acknowledge) still report failure
            success: false,
            state,
            notifications,
            result: None,
            error_message: Some(err.to_string()),
        },
    }
}

fn field_result(moved: FieldMove) -> CommandResult {
    match moved {
        FieldMove::Moved { player_id, number, ready_to_start } => {
            CommandResult::Moved { player_id, number, ready_to_start }
        }
        FieldMove::NumberRequired(PendingNumber { player_id, token }) => {
            CommandResult::NumberRequired { player_id, token }
        }
    }
}

fn goal_result(outcome: Option<GoalOutcome>) -> CommandResult {
    match outcome {
        Some(goal) => {
            CommandResult::Goal { counted: true, goals: Some(goal.goals), on_fire: goal.on_fire }
        }
        None => CommandResult::Goal { counted: false, goals: None, on_fire: false },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::time_source::ManualTime;
    use serde_json::{json, Value};

    fn engine() -> RotationEngine {
        RotationEngine::with_time_source(EngineConfig::default(), ManualTime::starting_at(0))
    }

    fn send(engine: &mut RotationEngine, command: Value) -> Value {
        let request = json!({ "schema_version": 1, "command": command });
        let response = handle_request_json(engine, &request.to_string());
        serde_json::from_str(&response).unwrap()
    }

    #[test]
    fn test_two_phase_field_entry() {
        let mut engine = engine();

        let response = send(&mut engine, json!({ "type": "MoveToField", "player_id": 3 }));
        assert_eq!(response["success"], true);
        assert_eq!(response["result"]["type"], "NumberRequired");
        let token = response["result"]["token"].as_u64().unwrap();
        assert_eq!(response["state"]["pending_number"]["player_id"], 3);

        let response = send(
            &mut engine,
            json!({ "type": "CommitNumber", "player_id": 3, "token": token, "number": "x" }),
        );
        assert_eq!(response["success"], false);
        assert_eq!(response["notifications"][0]["type"], "InvalidNumber");
        assert!(response["notifications"][0]["prompt"].as_str().unwrap().contains("Invalid number"));

        let response = send(
            &mut engine,
            json!({ "type": "CommitNumber", "player_id": 3, "token": token, "number": "11" }),
        );
        assert_eq!(response["success"], true);
        assert_eq!(response["result"]["type"], "Moved");
        assert_eq!(response["result"]["number"], 11);
        assert_eq!(response["state"]["players"][2]["display_name"], "Player No. 11");
        assert_eq!(response["state"]["activity_log"][0]["message"], "Player #11 moved to the field.");
    }

    #[test]
    fn test_full_field_start_and_tick() {
        let mut engine = engine();
        for id in 1..=4 {
            let response = send(
                &mut engine,
                json!({ "type": "MoveToFieldNumbered", "player_id": id, "number": id + 20 }),
            );
            assert_eq!(response["success"], true);
        }

        let response = send(&mut engine, json!({ "type": "StartClock" }));
        assert_eq!(response["result"], json!({ "type": "Clock", "changed": true }));
        assert_eq!(response["state"]["match"]["running"], true);

        let response = send(&mut engine, json!({ "type": "Tick", "count": 90 }));
        assert_eq!(response["result"]["ticks"], 90);
        assert_eq!(response["state"]["clock_display"], "08:30");
        assert_eq!(response["state"]["players"][0]["is_fatigued"], true);
        assert_eq!(response["state"]["players"][0]["fatigue_level"], "Severe");

        let response = send(&mut engine, json!({ "type": "Tick", "count": 1000 }));
        assert_eq!(response["result"]["ticks"], 510);
        assert_eq!(response["result"]["quarter_ended"], 1);
        assert_eq!(response["state"]["quarter_pending"], true);
        assert_eq!(response["notifications"][0]["type"], "QuarterEnded");

        let response = send(&mut engine, json!({ "type": "AcknowledgeQuarterEnd" }));
        assert_eq!(response["result"]["quarter"], 2);
        assert_eq!(response["state"]["match"]["quarterTimer"], 600);
    }

    #[test]
    fn test_rejections_report_errors() {
        let mut engine = engine();

        let response = send(&mut engine, json!({ "type": "StartClock" }));
        assert_eq!(response["success"], false);
        assert!(response["error_message"].as_str().unwrap().contains("exactly 4"));

        let response = send(&mut engine, json!({ "type": "Undo" }));
        assert_eq!(response["success"], false);
        assert_eq!(response["notifications"][0]["type"], "HistoryEmpty");
        assert_eq!(response["state"]["can_undo"], false);
    }

    #[test]
    fn test_goal_while_stopped_is_not_counted() {
        let mut engine = engine();
        send(&mut engine, json!({ "type": "MoveToFieldNumbered", "player_id": 1, "number": 9 }));
        let response = send(&mut engine, json!({ "type": "ScoreGoal", "player_id": 1 }));
        assert_eq!(response["success"], true);
        assert_eq!(response["result"]["counted"], false);
        assert_eq!(response["state"]["team_score"], 0);
    }

    #[test]
    fn test_serialize_and_restore_commands() {
        let mut engine = engine();
        send(&mut engine, json!({ "type": "SetTeamName", "name": "Otters" }));
        send(&mut engine, json!({ "type": "MoveToFieldNumbered", "player_id": 2, "number": 5 }));

        let response = send(&mut engine, json!({ "type": "Serialize" }));
        let state = response["result"]["state"].clone();
        assert_eq!(state["teamName"], "Otters");

        let mut other = self::engine();
        let response = send(&mut other, json!({ "type": "Restore", "state": state }));
        assert_eq!(response["result"]["adopted"], true);
        assert_eq!(response["state"]["team_name"], "Otters");
        assert_eq!(response["state"]["players"][1]["on_field"], true);
    }

    #[test]
    fn test_restore_malformed_state_falls_back() {
        let mut engine = engine();
        send(&mut engine, json!({ "type": "SetTeamName", "name": "Otters" }));
        send(&mut engine, json!({ "type": "MoveToFieldNumbered", "player_id": 1, "number": 4 }));
        assert_eq!(engine.registry().on_field_count(), 1);

        let response = send(
            &mut engine,
            json!({ "type": "Restore", "state": { "players": "oops", "quarter": 1 } }),
        );
        assert_eq!(response["success"], true);
        assert_eq!(response["result"], json!({ "type": "Restored", "adopted": false }));
        assert_eq!(engine.registry().on_field_count(), 0);
        assert_eq!(engine.team_name(), "");
        assert_eq!(response["state"]["activity_log"], json!([]));
    }

    #[test]
    fn test_malformed_requests() {
        let mut engine = engine();

        let response: Value =
            serde_json::from_str(&handle_request_json(&mut engine, "not json")).unwrap();
        assert_eq!(response["success"], false);
        assert!(response["error_message"].as_str().unwrap().starts_with("Invalid JSON request"));
        assert_eq!(response["state"], Value::Null);

        let request = json!({ "schema_version": 9, "command": { "type": "GetState" } });
        let response: Value =
            serde_json::from_str(&handle_request_json(&mut engine, &request.to_string())).unwrap();
        assert_eq!(response["error_message"], "Unsupported schema version: 9");
    }
}
