// Draft board CSV export.
//
// One row per consensus ranking in board order. The value and projection
// columns only appear when the pipeline actually produced them, so a plain
// consensus export stays compact.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::models::ConsensusRanking;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to create file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Writer-based core (private, enables testing without temp files)
// ---------------------------------------------------------------------------

fn write_board<W: Write>(wtr: W, board: &[ConsensusRanking]) -> Result<(), csv::Error> {
    let has_value = board.iter().any(|c| c.value.is_some());
    let has_points = board.iter().any(|c| c.projected_points.is_some());

    let mut writer = csv::Writer::from_writer(wtr);

    let mut header = vec!["Rank", "Tier", "Player", "Position", "Team", "Bye", "Pos Rank"];
    if has_value {
        header.push("Value");
    }
    if has_points {
        header.push("Proj Pts");
    }
    header.extend(["Avg Rank", "Min Rank", "Max Rank", "Std Dev", "Sources", "Notes"]);
    writer.write_record(&header)?;

    for (i, entry) in board.iter().enumerate() {
        let position = entry.player.position.display_str();
        let pos_rank = entry
            .position_rank
            .map(|r| format!("{position}{r}"))
            .unwrap_or_default();
        let bye = entry
            .player
            .bye_week
            .map(|b| b.to_string())
            .unwrap_or_default();

        let mut sources: Vec<(&String, &u32)> = entry.sources.iter().collect();
        sources.sort();
        let sources_str = sources
            .iter()
            .map(|(source, rank)| format!("{source}:{rank}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut row = vec![
            (i + 1).to_string(),
            entry.tier.to_string(),
            entry.player.name.clone(),
            position.to_string(),
            entry.player.team.abbr().to_string(),
            bye,
            pos_rank,
        ];
        if has_value {
            row.push(entry.value.map(|v| format!("{v:.1}")).unwrap_or_default());
        }
        if has_points {
            row.push(
                entry
                    .projected_points
                    .map(|p| format!("{p:.0}"))
                    .unwrap_or_default(),
            );
        }
        row.push(format!("{:.1}", entry.consensus_rank));
        row.push(entry.min_rank.to_string());
        row.push(entry.max_rank.to_string());
        row.push(format!("{:.1}", entry.std_deviation));
        row.push(sources_str);
        row.push(entry.notes.clone().unwrap_or_default());

        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Public path-based exporter
// ---------------------------------------------------------------------------

/// Write the board to a CSV file, creating parent directories as needed.
pub fn export_draft_board(path: &Path, board: &[ConsensusRanking]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    let file = std::fs::File::create(path).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write_board(file, board).map_err(|e| ExportError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    info!("exported {} rankings to {}", board.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
