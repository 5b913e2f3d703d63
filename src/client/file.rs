//! Volume and file handles
//!
//! File data is striped RAID0-style: object `n` covers bytes
//! `[n * stripe_size, (n + 1) * stripe_size)` and is stored on
//! `replicas[n % replicas.len()]`.

use crate::catalog::FileRecord;
use crate::client::rpc::RpcClient;
use crate::common::{validate_path, Error, Result};
use crate::storage::ObjectInfo;
use bytes::Bytes;

pub struct Volume {
    name: String,
    catalog_address: String,
    rpc: RpcClient,
}

impl Volume {
    pub(crate) fn new(name: String, catalog_address: String, rpc: RpcClient) -> Self {
        Self {
            name,
            catalog_address,
            rpc,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catalog_address(&self) -> &str {
        &self.catalog_address
    }

    /// Storage devices the catalog knows for this volume
    pub async fn storage_devices(&self) -> Result<Vec<String>> {
        self.rpc.storage_devices(&self.catalog_address).await
    }

    /// Open `path`, creating an empty file if `create` is set and it does not exist
    pub async fn open(&self, path: &str, create: bool) -> Result<FileHandle> {
        validate_path(path)?;
        let record = self
            .rpc
            .open_file(&self.catalog_address, path, create)
            .await?;
        Ok(FileHandle {
            record,
            catalog_address: self.catalog_address.clone(),
            rpc: self.rpc.clone(),
        })
    }
}

pub struct FileHandle {
    record: FileRecord,
    catalog_address: String,
    rpc: RpcClient,
}

impl FileHandle {
    /// Metadata as of the last catalog round trip
    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    pub fn file_id(&self) -> &str {
        &self.record.file_id
    }

    /// Refresh metadata from the catalog
    pub async fn stat(&mut self) -> Result<&FileRecord> {
        self.record = self
            .rpc
            .get_file(&self.catalog_address, &self.record.file_id)
            .await?;
        Ok(&self.record)
    }

    /// Storage device holding object `object_no`
    pub fn device_for(&self, object_no: u64) -> Result<&str> {
        let replicas = &self.record.replicas;
        if replicas.is_empty() {
            return Err(Error::NoStorageDevices);
        }
        let idx = (object_no % replicas.len() as u64) as usize;
        Ok(&replicas[idx])
    }

    fn stripe_size(&self) -> Result<u64> {
        match self.record.stripe_size {
            0 => Err(Error::Internal(format!(
                "file {} has no stripe size",
                self.record.file_id
            ))),
            size => Ok(size),
        }
    }

    /// Write `data` at `offset`, growing the file as needed
    pub async fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let stripe = self.stripe_size()?;
        let end = offset.checked_add(data.len() as u64).ok_or_else(|| {
            Error::InvalidRange(format!(
                "{} bytes at offset {} run past the largest file size",
                data.len(),
                offset
            ))
        })?;
        let file_id = self.record.file_id.clone();

        let mut written = 0usize;
        while written < data.len() {
            let pos = offset + written as u64;
            let object_no = pos / stripe;
            let in_object = (pos % stripe) as usize;
            let chunk = (stripe as usize - in_object).min(data.len() - written);
            let device = self.device_for(object_no)?.to_string();

            // Whole objects are overwritten; partial ones are read-modify-written
            let mut object = if in_object == 0 && chunk == stripe as usize {
                Vec::with_capacity(chunk)
            } else {
                self.rpc
                    .read_object(&device, &file_id, object_no)
                    .await?
                    .map(|b| b.to_vec())
                    .unwrap_or_default()
            };
            let end = in_object + chunk;
            if object.len() < end {
                object.resize(end, 0);
            }
            object[in_object..end].copy_from_slice(&data[written..written + chunk]);

            self.rpc
                .write_object(&device, &file_id, object_no, Bytes::from(object))
                .await?;
            written += chunk;
        }

        self.record = self
            .rpc
            .set_file_size(&self.catalog_address, &file_id, end, false)
            .await?;
        tracing::trace!("Wrote {} bytes to {} at {}", written, self.record.path, offset);
        Ok(written)
    }

    /// Read up to `len` bytes at `offset`. Holes read as zeros; reads stop at end of file.
    pub async fn read(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let size = self.stat().await?.size;
        if offset >= size || len == 0 {
            return Ok(Vec::new());
        }
        let stripe = self.stripe_size()?;
        let end = size.min(offset.saturating_add(len as u64));

        let mut out = Vec::with_capacity((end - offset) as usize);
        let mut pos = offset;
        while pos < end {
            let object_no = pos / stripe;
            let in_object = (pos % stripe) as usize;
            let chunk = (stripe - in_object as u64).min(end - pos) as usize;
            let device = self.device_for(object_no)?;

            let mut piece = vec![0u8; chunk];
            if let Some(object) = self
                .rpc
                .read_object(device, &self.record.file_id, object_no)
                .await?
            {
                if object.len() > in_object {
                    let available = (object.len() - in_object).min(chunk);
                    piece[..available].copy_from_slice(&object[in_object..in_object + available]);
                }
            }
            out.extend_from_slice(&piece);
            pos += chunk as u64;
        }
        Ok(out)
    }

    /// Set the file size to `size`, dropping data past it on every device
    pub async fn truncate(&mut self, size: u64) -> Result<()> {
        let stripe = self.stripe_size()?;
        self.record = self
            .rpc
            .set_file_size(&self.catalog_address, &self.record.file_id, size, true)
            .await?;

        for device in &self.record.replicas {
            let resp = self
                .rpc
                .truncate(device, &self.record.file_id, size, stripe)
                .await?;
            tracing::trace!(
                "{} dropped {} object(s) of {}",
                device,
                resp.objects_removed,
                self.record.path
            );
        }
        Ok(())
    }

    /// Size and checksum of object `object_no` as stored on its device
    pub async fn object_checksum(&self, object_no: u64) -> Result<ObjectInfo> {
        let device = self.device_for(object_no)?;
        self.rpc
            .object_info(device, &self.record.file_id, object_no)
            .await
    }
}
