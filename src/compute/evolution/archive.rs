//! Champion archive for storing and exporting the best controllers.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::schema::{CandidateSnapshot, GameConfig, Genome, NetworkConfig};

/// Archive errors.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("No output directory set")]
    NoOutputDir,
    #[error("Champion {0} not found")]
    NotFound(u64),
    #[error("Archive I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid champion file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Bounded archive of the fittest candidates seen during a run.
#[derive(Debug)]
pub struct ChampionArchive {
    /// Stored champions indexed by candidate ID.
    champions: HashMap<u64, ArchivedChampion>,
    /// Topology the genomes decode with.
    network: NetworkConfig,
    /// Game the champions were trained in.
    game: GameConfig,
    /// Output directory for saving champions.
    output_dir: Option<PathBuf>,
    /// Maximum archive size.
    max_size: usize,
}

/// An archived champion.
#[derive(Debug, Clone)]
pub struct ArchivedChampion {
    pub snapshot: CandidateSnapshot,
    /// File path if saved.
    pub saved_path: Option<PathBuf>,
}

impl ChampionArchive {
    /// Create a new archive.
    pub fn new(max_size: usize, network: NetworkConfig, game: GameConfig) -> Self {
        Self {
            champions: HashMap::new(),
            network,
            game,
            output_dir: None,
            max_size,
        }
    }

    /// Set output directory for saving champions.
    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> io::Result<Self> {
        let path = dir.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        self.output_dir = Some(path);
        Ok(self)
    }

    /// Set the output directory on an existing archive.
    pub fn set_output_dir<P: AsRef<Path>>(&mut self, dir: P) -> io::Result<()> {
        let path = dir.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        self.output_dir = Some(path);
        Ok(())
    }

    /// Add a champion. When full, the weakest entry is evicted if the newcomer
    /// beats it.
    ///
    /// A candidate already stored (an elite scored again on a new course)
    /// replaces its entry, so the archive always holds the latest fitness.
    pub fn add(&mut self, snapshot: CandidateSnapshot) -> Option<u64> {
        if self.max_size == 0 {
            return None;
        }
        if let Some(entry) = self.champions.get_mut(&snapshot.id) {
            let id = snapshot.id;
            entry.snapshot = snapshot;
            entry.saved_path = None;
            return Some(id);
        }

        if self.champions.len() >= self.max_size
            && let Some((&weakest, entry)) = self
                .champions
                .iter()
                .min_by(|a, b| a.1.snapshot.fitness.total_cmp(&b.1.snapshot.fitness))
        {
            if snapshot.fitness <= entry.snapshot.fitness {
                return None;
            }
            self.champions.remove(&weakest);
        }

        let id = snapshot.id;
        self.champions.insert(
            id,
            ArchivedChampion {
                snapshot,
                saved_path: None,
            },
        );
        Some(id)
    }

    /// Get a champion by ID.
    pub fn get(&self, id: u64) -> Option<&ArchivedChampion> {
        self.champions.get(&id)
    }

    /// Get top N champions by fitness.
    pub fn top_n(&self, n: usize) -> Vec<&ArchivedChampion> {
        let mut champions: Vec<_> = self.champions.values().collect();
        champions.sort_by(|a, b| b.snapshot.fitness.total_cmp(&a.snapshot.fitness));
        champions.into_iter().take(n).collect()
    }

    /// Fittest champion.
    pub fn best(&self) -> Option<&ArchivedChampion> {
        self.top_n(1).into_iter().next()
    }

    /// Export record for a champion.
    pub fn export(&self, id: u64) -> Option<ChampionExport> {
        self.champions.get(&id).map(|entry| ChampionExport {
            genome: entry.snapshot.genome.clone(),
            network: self.network.clone(),
            game: self.game.clone(),
            metadata: ChampionMetadata {
                id,
                fitness: entry.snapshot.fitness,
                generation: entry.snapshot.generation,
                parents: entry.snapshot.parents.clone(),
            },
        })
    }

    /// Save a champion to disk.
    pub fn save_champion(&mut self, id: u64) -> Result<PathBuf, ArchiveError> {
        let output_dir = self.output_dir.as_ref().ok_or(ArchiveError::NoOutputDir)?;
        let export = self.export(id).ok_or(ArchiveError::NotFound(id))?;

        let filename = format!(
            "champion_{}_gen{}_fit{:.3}.json",
            id, export.metadata.generation, export.metadata.fitness
        );
        let path = output_dir.join(filename);

        let json = serde_json::to_string_pretty(&export)?;
        fs::write(&path, json)?;
        log::debug!("saved champion {} to {}", id, path.display());

        if let Some(entry) = self.champions.get_mut(&id) {
            entry.saved_path = Some(path.clone());
        }
        Ok(path)
    }

    /// Save all champions to disk, best first.
    pub fn save_all(&mut self) -> Result<Vec<PathBuf>, ArchiveError> {
        let ids: Vec<u64> = self
            .top_n(self.champions.len())
            .iter()
            .map(|entry| entry.snapshot.id)
            .collect();

        ids.into_iter().map(|id| self.save_champion(id)).collect()
    }

    /// Champions best first.
    pub fn snapshots(&self) -> Vec<CandidateSnapshot> {
        self.top_n(self.champions.len())
            .into_iter()
            .map(|entry| entry.snapshot.clone())
            .collect()
    }

    /// Get archive size.
    pub fn len(&self) -> usize {
        self.champions.len()
    }

    /// Check if archive is empty.
    pub fn is_empty(&self) -> bool {
        self.champions.is_empty()
    }

}

/// Exported champion format: everything needed to replay the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChampionExport {
    pub genome: Genome,
    /// Topology the genome decodes with.
    pub network: NetworkConfig,
    /// Game the champion was trained in.
    pub game: GameConfig,
    pub metadata: ChampionMetadata,
}

/// Champion metadata for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChampionMetadata {
    pub id: u64,
    pub fitness: f32,
    /// Generation the champion was created in.
    pub generation: usize,
    pub parents: Vec<u64>,
}

/// Load a champion export from file.
pub fn load_champion<P: AsRef<Path>>(path: P) -> Result<ChampionExport, ArchiveError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load every champion file in a directory, best first.
///
/// Files that are not champion exports are skipped.
pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<ChampionExport>, ArchiveError> {
    let mut champions = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_none_or(|e| e != "json") {
            continue;
        }
        match load_champion(&path) {
            Ok(export) => champions.push(export),
            Err(e) => log::warn!("skipping {}: {}", path.display(), e),
        }
    }

    champions.sort_by(|a, b| b.metadata.fitness.total_cmp(&a.metadata.fitness));
    Ok(champions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_snapshot(id: u64, fitness: f32) -> CandidateSnapshot {
        CandidateSnapshot {
            id,
            fitness,
            genome: Genome::new(vec![id as f32; 4]),
            generation: 0,
            parents: Vec::new(),
        }
    }

    fn archive(max_size: usize) -> ChampionArchive {
        ChampionArchive::new(max_size, NetworkConfig::default(), GameConfig::default())
    }

    #[test]
    fn test_archive_add() {
        let mut archive = archive(10);

        assert_eq!(archive.add(test_snapshot(1, 0.5)), Some(1));
        assert_eq!(archive.add(test_snapshot(2, 0.7)), Some(2));

        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn test_rescored_champion_replaces_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = archive(2).with_output_dir(dir.path()).unwrap();
        archive.add(test_snapshot(1, 0.5));
        archive.add(test_snapshot(2, 0.7));
        archive.save_champion(2).unwrap();

        // Full archive: the same id updates in place without evicting.
        assert_eq!(archive.add(test_snapshot(2, 0.2)), Some(2));
        assert_eq!(archive.len(), 2);
        assert!(archive.get(1).is_some());

        let entry = archive.get(2).unwrap();
        assert_eq!(entry.snapshot.fitness, 0.2);
        assert!(entry.saved_path.is_none());
        assert_eq!(archive.best().unwrap().snapshot.id, 1);
        assert_eq!(archive.export(2).unwrap().metadata.fitness, 0.2);
    }

    #[test]
    fn test_archive_capacity() {
        let mut archive = archive(2);

        archive.add(test_snapshot(1, 0.3));
        archive.add(test_snapshot(2, 0.5));

        // Adding higher fitness should evict lowest
        archive.add(test_snapshot(3, 0.7));
        assert_eq!(archive.len(), 2);
        assert!(archive.get(1).is_none());
        assert!(archive.get(3).is_some());

        // Weaker than everything stored
        assert_eq!(archive.add(test_snapshot(4, 0.1)), None);
    }

    #[test]
    fn test_top_n() {
        let mut archive = archive(10);

        archive.add(test_snapshot(1, 0.3));
        archive.add(test_snapshot(2, 0.7));
        archive.add(test_snapshot(3, 0.5));

        let top2 = archive.top_n(2);
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[0].snapshot.id, 2);
        assert_eq!(top2[1].snapshot.id, 3);
        assert_eq!(archive.best().unwrap().snapshot.id, 2);
    }

    #[test]
    fn test_save_requires_output_dir() {
        let mut archive = archive(10);
        archive.add(test_snapshot(1, 0.3));
        assert!(matches!(
            archive.save_champion(1),
            Err(ArchiveError::NoOutputDir)
        ));
    }

    #[test]
    fn test_save_and_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = archive(10).with_output_dir(dir.path()).unwrap();
        archive.add(test_snapshot(1, 3.0));
        archive.add(test_snapshot(2, 8.0));

        let paths = archive.save_all().unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(archive.get(2).unwrap().saved_path.as_ref(), Some(&paths[0]));
        fs::write(dir.path().join("notes.json"), "not a champion").unwrap();

        let loaded = load_from_dir(dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].metadata.id, 2);
        assert_eq!(loaded[0].genome, Genome::new(vec![2.0; 4]));
        assert_eq!(loaded[0].network, NetworkConfig::default());

        let single = load_champion(&paths[1]).unwrap();
        assert_eq!(single.metadata.id, 1);
    }

    #[test]
    fn test_missing_champion() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = archive(10).with_output_dir(dir.path()).unwrap();
        assert!(matches!(
            archive.save_champion(9),
            Err(ArchiveError::NotFound(9))
        ));
    }
}
