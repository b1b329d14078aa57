//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the extraction core and an
//! external system. Implementations live in `src/adapters/`.

pub mod earth_engine;

pub use earth_engine::{DownloadRequest, DriveExportRequest, EarthEngine, ExportTask};
