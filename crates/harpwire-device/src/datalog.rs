//! On-disk capture of device traffic.
//!
//! A data log is a directory holding one `device.json` metadata description
//! plus one raw binary file per register, named after the register and
//! containing its frames in wire format, appended in arrival order.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use harpwire_frame::{encode_frame, Frame};
use harpwire_registers::{register_map, resolve, DEVICE_NAME, WHO_AM_I};
use tracing::debug;

use crate::error::{DeviceError, Result};

const METADATA_FILE: &str = "device.json";

/// Appends device frames to per-register binary files.
pub struct DeviceDataWriter {
    dir: PathBuf,
    files: HashMap<u8, BufWriter<File>>,
    buf: BytesMut,
}

impl DeviceDataWriter {
    /// Open a data log in `dir`, writing the metadata description.
    ///
    /// Fails with [`DeviceError::MetadataExists`] when `dir` already holds a
    /// `device.json`; use [`create_overwrite`](Self::create_overwrite) to
    /// replace an old capture.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir.as_ref(), false)
    }

    /// Open a data log in `dir`, replacing any previous metadata.
    pub fn create_overwrite(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir.as_ref(), true)
    }

    fn open(dir: &Path, overwrite: bool) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let metadata_path = dir.join(METADATA_FILE);
        if !overwrite && metadata_path.exists() {
            return Err(DeviceError::MetadataExists(metadata_path));
        }

        let metadata = device_metadata();
        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|err| DeviceError::Io(err.into()))?;
        std::fs::write(&metadata_path, json)?;
        debug!(path = %metadata_path.display(), "device metadata written");

        Ok(Self {
            dir: dir.to_path_buf(),
            files: HashMap::new(),
            buf: BytesMut::new(),
        })
    }

    /// Append one frame to its register's binary file.
    pub fn record(&mut self, frame: &Frame) -> Result<()> {
        let descriptor = resolve(frame.address)?;
        self.buf.clear();
        encode_frame(frame, &mut self.buf)?;

        let file = match self.files.entry(frame.address) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let path = self.dir.join(format!("{}.bin", descriptor.name));
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                entry.insert(BufWriter::new(file))
            }
        };
        file.write_all(&self.buf)?;
        Ok(())
    }

    /// Flush and close every register file.
    pub fn close(mut self) -> Result<()> {
        for (_, file) in self.files.drain() {
            file.into_inner()
                .map_err(|err| DeviceError::Io(err.into_error()))?
                .sync_all()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DeviceDataWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceDataWriter")
            .field("dir", &self.dir)
            .field("open_files", &self.files.len())
            .finish_non_exhaustive()
    }
}

fn device_metadata() -> serde_json::Value {
    let registers: Vec<serde_json::Value> = register_map()
        .iter()
        .map(|reg| {
            serde_json::json!({
                "address": reg.address,
                "name": reg.name,
                "type": reg.payload_type.to_string(),
                "length": reg.len,
                "access": reg.access.to_string(),
            })
        })
        .collect();
    serde_json::json!({
        "device": DEVICE_NAME,
        "whoAmI": WHO_AM_I,
        "registers": registers,
    })
}
