use tracing::warn;

use crate::db;

/// Category under which browser-style local storage keys are kept.
pub(crate) const LOCAL_CATEGORY: &str = "local";

/// Read a JSON value from local storage. Absent and malformed values both
/// come back as `Value::Null`; a malformed value is logged.
pub(crate) fn read_local_json(db: &db::DbState, key: &str) -> Result<serde_json::Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    let raw = db::get_setting(&conn, LOCAL_CATEGORY, key);
    if let Some(raw) = raw {
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => warn!(key, error = %e, "local storage value is not valid JSON, ignoring"),
        }
    }
    Ok(serde_json::Value::Null)
}

pub(crate) fn read_local_json_array(
    db: &db::DbState,
    key: &str,
) -> Result<Vec<serde_json::Value>, String> {
    let parsed = read_local_json(db, key)?;
    Ok(parsed.as_array().cloned().unwrap_or_default())
}

pub(crate) fn read_local_json_object(
    db: &db::DbState,
    key: &str,
) -> Result<serde_json::Map<String, serde_json::Value>, String> {
    let parsed = read_local_json(db, key)?;
    Ok(parsed.as_object().cloned().unwrap_or_default())
}

pub(crate) fn write_local_json(
    db: &db::DbState,
    key: &str,
    value: &serde_json::Value,
) -> Result<(), String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    db::set_setting(&conn, LOCAL_CATEGORY, key, &value.to_string())
}

pub(crate) fn delete_local_json(db: &db::DbState, key: &str) -> Result<(), String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    db::delete_setting(&conn, LOCAL_CATEGORY, key)
}
