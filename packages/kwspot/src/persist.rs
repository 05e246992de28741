//! CBOR persistence shared by model parameters and keyword files.
//!
//! Both resources are plain serde structs; implementing the marker traits
//! below is enough to get file and buffer round-trips.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use ciborium::{de, ser};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/* --------------------------------------------------------------------- */
/*  Error type                                                           */

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cbor: {0}")]
    Cbor(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

fn write_cbor<W: Write, T: Serialize + ?Sized>(w: W, val: &T) -> PersistResult<()> {
    ser::into_writer(val, w).map_err(|e| PersistError::Cbor(e.to_string()))
}
fn read_cbor<R: Read, T: DeserializeOwned>(r: R) -> PersistResult<T> {
    de::from_reader(r).map_err(|e| PersistError::Cbor(e.to_string()))
}

/* --------------------------------------------------------------------- */
/*  Traits                                                               */

/// Serialize a resource to CBOR, on disk or in memory.
pub trait CborSave: Serialize {
    /// Atomically write CBOR to `path`.
    /// Uses “`<file>.tmp` → rename” on the same filesystem.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> PersistResult<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");

        {
            let f = File::create(&tmp)?;
            let mut bw = BufWriter::new(f);
            write_cbor(&mut bw, self)?;
            bw.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Serialize into an in-memory CBOR buffer.
    fn save_to_buffer(&self) -> PersistResult<Vec<u8>> {
        let mut buf = Vec::new();
        write_cbor(&mut buf, self)?;
        Ok(buf)
    }
}

/// Deserialize a resource produced by [`CborSave`].
pub trait CborLoad: DeserializeOwned + Sized {
    fn load_from_file<P: AsRef<Path>>(path: P) -> PersistResult<Self> {
        let f = File::open(path)?;
        read_cbor(BufReader::new(f))
    }

    fn load_from_buffer(buf: &[u8]) -> PersistResult<Self> {
        read_cbor(buf)
    }
}
