/// Display form of a session date: "14/03/2022"
pub(crate) const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// Volume roots and ids used when no config names any
pub(crate) const DEFAULT_VOLUMES: &[(&str, u32)] = &[
    ("C:/", 61),
    ("Y:/", 62),
    ("X:/", 63),
    ("W:/", 64),
    ("V:/", 65),
    ("U:/", 66),
    ("T:/", 67),
];

/// Log locations relative to a volume root, most common first
pub(crate) const DEFAULT_LOG_CANDIDATES: &[&str] = &[
    "!shu_fd/das/RECORDS.LOG",
    "!shu_fd/das/RECORDS",
    "!shu_fd/das/RECORD.LOG",
    "!shu_fd/RECORDS.LOG",
    "shu_fd/das/RECORDS.LOG",
    "shu_fd/das/RECORDS",
    "shu_fd/das/RECORD.LOG",
];

/// Artifact directory under a volume root
pub(crate) const DEFAULT_ARTIFACT_DIR: &str = "!shu_fd/das";

/// Root the recorder writes into base paths
pub(crate) const DEFAULT_RECORDED_ROOTS: &[&str] = &["D:/"];
