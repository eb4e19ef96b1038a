use std::{fs::File, io::Read, path::Path};

use tracing::info;

use crate::{errors::LoadError, orders::RawOrderRow};

/// Reads a broker order-history export from `path`.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<RawOrderRow>, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = read_rows(file)?;
    info!("parsed {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Reads export rows from any reader. Headers are matched by name, so column
/// order does not matter and unknown columns are ignored.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawOrderRow>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    reader
        .deserialize::<RawOrderRow>()
        .map(|record| record.map_err(LoadError::from))
        .collect()
}
