//! Test helpers that write packaged layers to a scratch directory.

use super::*;
use corridor_core::test_support::{crossroads, stepped_parcels};
use corridor_data::package_layer;
use tempfile::TempDir;

#[derive(Debug)]
pub(super) struct LayerFiles {
    _dir: TempDir,
    root: Utf8PathBuf,
    parcels: Utf8PathBuf,
    roads: Utf8PathBuf,
}

impl LayerFiles {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root =
            Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir path");
        let parcels = root.join("parcels.zip");
        let roads = root.join("roads.zip");
        let parcel_bytes = package_layer(&stepped_parcels(), "parcels").expect("package parcels");
        let road_bytes = package_layer(&crossroads(), "roads").expect("package roads");
        corridor_fs::write_file(&parcels, &parcel_bytes).expect("write parcels");
        corridor_fs::write_file(&roads, &road_bytes).expect("write roads");
        Self {
            _dir: dir,
            root,
            parcels,
            roads,
        }
    }

    pub(super) fn parcels(&self) -> &Utf8Path {
        &self.parcels
    }

    pub(super) fn roads(&self) -> &Utf8Path {
        &self.roads
    }

    pub(super) fn output_dir(&self) -> Utf8PathBuf {
        self.root.join("results")
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }
}

pub(super) fn config_for(files: &LayerFiles, distance: u32, compare: &[u32]) -> AnalyseConfig {
    AnalyseConfig {
        parcels: files.parcels().to_path_buf(),
        roads: files.roads().to_path_buf(),
        distances: BufferDistances::from_selection(distance, compare),
        output_dir: files.output_dir(),
    }
}
