//! Worksheet layouts and the SQLite schema backing them

/// SQL schema for the worksheet database
pub const SCHEMA_SQL: &str = r#"
-- One header row per worksheet
CREATE TABLE IF NOT EXISTS sheet_headers (
    sheet TEXT PRIMARY KEY,
    header_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Data rows, ordered by insertion
CREATE TABLE IF NOT EXISTS sheet_rows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sheet TEXT NOT NULL REFERENCES sheet_headers(sheet),
    cells_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sheet_rows_sheet ON sheet_rows(sheet, id);
"#;

pub const QUIZZES_SHEET: &str = "quizzes";

/// `content` holds the question list as JSON
pub const QUIZ_COLUMNS: [&str; 4] = ["quiz_id", "document_id", "content", "created_at"];

pub const RESULTS_SHEET: &str = "results";

/// `answers` holds the per-question records as JSON
pub const RESULT_COLUMNS: [&str; 9] = [
    "result_id",
    "quiz_id",
    "document_id",
    "filename",
    "username",
    "score",
    "answers",
    "started_at",
    "completed_at",
];

/// Position of `name` in `columns`
pub fn column_index(columns: &[&str], name: &str) -> Option<usize> {
    columns.iter().position(|c| *c == name)
}
