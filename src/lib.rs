pub mod core;
pub mod compression;
pub mod storage;
pub mod ingest;
pub mod query;
pub mod service;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{DayPresence, EntityKey, Kind, LanguageView, TrendEntry, ALL_LANGUAGES};
pub use crate::query::engine::QueryEngine;
pub use crate::query::types::{Query, QueryOutput};
pub use crate::service::trend_service::{TrendService, WindowRequest};

/*
┌──────────────────────────────────── TRENDLENS DATA FLOW ─────────────────────────────────────┐
│                                                                                              │
│  archive/<kind>/<YYYY>/<date>/<list>.json                                                    │
│        │  ingest::archive_reader        (parse, rank = list position)                        │
│        ▼                                                                                     │
│  ingest::builder::build_kind ─────────► columnar/<kind>/year=Y/<table>.seg                    │
│        │                                 manifest.json                                       │
│        ▼                                                                                     │
│  ingest::rollup::rollup_kind ─────────► rollups/<kind>/year=Y/<table>.seg                     │
│                                          (stamped with the columnar checksum)                │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────────── QUERY LAYER ────────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────┐   miss   ┌──────────────────────────┐                            │
│  │ service::TrendService  │ ───────► │ query::QueryEngine        │                            │
│  │ • manifest validation  │          │ • entries: EntrySource    │ ─► ColumnarStore           │
│  │ • cache: ResultCache   │ ◄─────── │ • rollups: PresenceSource │ ─► RollupStore             │
│  │ • prewarm: PrewarmPool │   set    │   (fallback on failure)   │                            │
│  └────────────────────────┘          └──────────────────────────┘                            │
│              │                                    ▲                                          │
│              └── neighbouring days ──► worker threads (crossbeam bounded queue)              │
│                                                                                              │
│  Both stores reduce to per-(date, entity) observations; query::aggregate ranks them.         │
└──────────────────────────────────────────────────────────────────────────────────────────────┘
*/
