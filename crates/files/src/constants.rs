/// Name of the metadata snapshot file inside the data directory.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Appended to the snapshot path while a new snapshot is being written.
pub const SNAPSHOT_TEMP_SUFFIX: &str = ".tmp";
