//! Per-player stats as CSV.

use crate::models::{PlayerStatus, SessionSnapshot};
use serde::Serialize;

#[derive(Serialize)]
struct StatsRow<'a> {
    player_id: String,
    name: &'a str,
    status: &'static str,
    court: Option<u32>,
    completed_rounds: u32,
    in_progress: bool,
    equipment_usage: f64,
}

/// One row per player, in snapshot order (queue first, then courts).
pub fn stats_csv(snapshot: &SessionSnapshot) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for p in &snapshot.players {
        let (status, court) = match p.status {
            PlayerStatus::Queued { .. } => ("queued", None),
            PlayerStatus::Playing { court_id } => ("playing", Some(court_id)),
        };
        writer.serialize(StatsRow {
            player_id: p.id.to_string(),
            name: &p.name,
            status,
            court,
            completed_rounds: p.stats.completed_rounds,
            in_progress: p.stats.in_progress,
            equipment_usage: p.stats.equipment_usage,
        })?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
