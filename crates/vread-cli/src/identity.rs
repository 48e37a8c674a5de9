// Local reader id used when --user is not given.
// Format: "reader-<uuid>"

use std::fs;
use std::io::Write;
use std::path::Path;

use uuid::Uuid;
use vread_core::UserId;

const READER_ID_FILE: &str = "reader_id.txt";
const READER_ID_PREFIX: &str = "reader-";

/// Resolve the user for a command: the explicit id, or this machine's
/// local reader id.
pub fn resolve(user: Option<String>) -> Result<UserId, Box<dyn std::error::Error>> {
    match user {
        Some(id) => Ok(UserId::new(id)?),
        None => {
            let dir = vread_core::storage::data_dir()?;
            get_or_create_reader_id_at(&dir)
        }
    }
}

/// Read `reader_id.txt` under `dir`, creating it with a fresh id if absent.
pub fn get_or_create_reader_id_at(dir: &Path) -> Result<UserId, Box<dyn std::error::Error>> {
    let path = dir.join(READER_ID_FILE);

    if path.exists() {
        let content = fs::read_to_string(&path)?;
        let reader_id = content.trim();
        if !reader_id.starts_with(READER_ID_PREFIX) {
            return Err(format!("invalid reader id in {}: {reader_id}", path.display()).into());
        }
        return Ok(UserId::new(reader_id)?);
    }

    let reader_id = format!("{READER_ID_PREFIX}{}", Uuid::new_v4());
    fs::create_dir_all(dir)?;
    let mut file = fs::File::create(&path)?;
    writeln!(file, "{reader_id}")?;
    tracing::info!(%reader_id, "created local reader id");

    Ok(UserId::new(reader_id)?)
}
