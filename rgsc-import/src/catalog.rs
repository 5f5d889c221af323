//! Chart and song resolution
//!
//! Resolves a submission's chart identity to a stored chart, then the chart
//! to its song. A missing chart is a submission problem; a chart whose song
//! is missing is a catalog problem and is logged at error level.

use crate::db::charts;
use rgsc_common::db::{Chart, Song};
use rgsc_common::{Error, Game, Playtype, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use std::path::Path;
use tracing::{error, info};

/// How a submission identifies its chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "matchType", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChartLookup {
    ChartId { chart_id: String },
    InGameId { in_game_id: i64, difficulty: String },
    SongId { song_id: i64, difficulty: String },
    SongTitle { title: String, difficulty: String },
}

impl fmt::Display for ChartLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartLookup::ChartId { chart_id } => write!(f, "chartID {}", chart_id),
            ChartLookup::InGameId {
                in_game_id,
                difficulty,
            } => write!(f, "inGameID {} ({})", in_game_id, difficulty),
            ChartLookup::SongId {
                song_id,
                difficulty,
            } => write!(f, "songID {} ({})", song_id, difficulty),
            ChartLookup::SongTitle { title, difficulty } => {
                write!(f, "title {:?} ({})", title, difficulty)
            }
        }
    }
}

/// Counts from a seed load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedCounts {
    pub songs: usize,
    pub charts: usize,
}

/// Read access to the song/chart catalog
#[derive(Debug, Clone)]
pub struct ChartCatalog {
    db: SqlitePool,
}

impl ChartCatalog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Resolve a chart identity within one game/playtype
    pub async fn resolve_chart(
        &self,
        game: Game,
        playtype: Playtype,
        lookup: &ChartLookup,
    ) -> Result<Chart> {
        let chart = match lookup {
            ChartLookup::ChartId { chart_id } => charts::get_chart(&self.db, chart_id)
                .await?
                .filter(|c| c.game == game && c.playtype == playtype),
            ChartLookup::InGameId {
                in_game_id,
                difficulty,
            } => {
                charts::find_chart_by_in_game_id(&self.db, game, playtype, *in_game_id, difficulty)
                    .await?
            }
            ChartLookup::SongId {
                song_id,
                difficulty,
            } => charts::find_chart_by_song(&self.db, game, playtype, *song_id, difficulty).await?,
            ChartLookup::SongTitle { title, difficulty } => {
                charts::find_chart_by_title(&self.db, game, playtype, title, difficulty).await?
            }
        };

        chart.ok_or_else(|| {
            Error::ChartNotFound(format!(
                "Could not find chart with {} on {}:{}",
                lookup, game, playtype
            ))
        })
    }

    /// Resolve the song a chart belongs to
    pub async fn resolve_song(&self, chart: &Chart) -> Result<Song> {
        match charts::get_song(&self.db, chart.game, chart.song_id).await? {
            Some(song) => Ok(song),
            None => {
                error!(
                    chart_id = %chart.chart_id,
                    song_id = chart.song_id,
                    game = %chart.game,
                    "Song-Chart Desync: chart references a missing song"
                );
                Err(Error::SongChartDesync {
                    chart_id: chart.chart_id.clone(),
                    song_id: chart.song_id,
                })
            }
        }
    }

    pub async fn chart(&self, chart_id: &str) -> Result<Option<Chart>> {
        charts::get_chart(&self.db, chart_id).await
    }

    pub async fn add_song(&self, song: &Song) -> Result<()> {
        charts::upsert_song(&self.db, song).await
    }

    pub async fn add_chart(&self, chart: &Chart) -> Result<()> {
        charts::upsert_chart(&self.db, chart).await
    }

    /// Load `songs-<game>.json` and `charts-<game>.json` files from a directory
    ///
    /// Missing files are skipped; existing rows with the same keys are replaced.
    pub async fn load_seeds(&self, dir: &Path) -> Result<SeedCounts> {
        let mut counts = SeedCounts::default();

        for game in Game::ALL {
            let songs_path = dir.join(format!("songs-{}.json", game));
            if let Some(songs) = read_seed_file::<Song>(&songs_path).await? {
                for song in &songs {
                    self.add_song(song).await?;
                }
                counts.songs += songs.len();
            }

            let charts_path = dir.join(format!("charts-{}.json", game));
            if let Some(charts) = read_seed_file::<Chart>(&charts_path).await? {
                for chart in &charts {
                    self.add_chart(chart).await?;
                }
                counts.charts += charts.len();
            }
        }

        info!(
            songs = counts.songs,
            charts = counts.charts,
            "Loaded catalog seeds from {}",
            dir.display()
        );
        Ok(counts)
    }
}

async fn read_seed_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("Seed file {}: {}", path.display(), e)))
}
