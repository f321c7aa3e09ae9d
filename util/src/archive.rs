//! Struct archiving functionality
//!
//! To add archiving functionality to a struct implement the `Archived` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::Path;
use std::fs::{File, OpenOptions};
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    writer: Writer<File>
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a timestamped csv.
///
/// To implement this trait, the struct shall have one `Archiver` member per
/// archive file, setup in the struct's `new` function.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut session_path = session.arch_root.clone();
        session_path.push(path);

        Self::from_file_path(session_path)
    }

    /// Create a new archiver writing to the given file, which is truncated.
    pub fn from_file_path<P: AsRef<Path>>(
        path: P
    ) -> Result<Self, Box<dyn std::error::Error>> {
        // Create the parent directory if needed
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Create the file if it does not exist
        std::fs::File::create(path.as_ref())?;

        // Open the file in append mode
        let file = OpenOptions::new()
            .append(true).open(path.as_ref())?;

        let w = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer: w
        })
    }

    /// Serialise a record into the archive.
    ///
    /// The record must be a flat struct, the header row is taken from the
    /// field names of the first record written.
    pub fn serialise<T: Serialize>(
        &mut self, record: T
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.writer.serialize(record)?;
        self.writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        time_s: f64,
        heading_rad: f64,
    }

    #[test]
    fn test_archiver_writes_header_and_rows() {
        let mut path = std::env::temp_dir();
        path.push(format!("swerve_util_archive_test_{}", std::process::id()));
        path.push("sample.csv");

        let mut arch = Archiver::from_file_path(&path).unwrap();
        arch.serialise(Sample { time_s: 0.0, heading_rad: 1.5 }).unwrap();
        arch.serialise(Sample { time_s: 0.02, heading_rad: -0.5 }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["time_s,heading_rad", "0.0,1.5", "0.02,-0.5"]);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
