//! An in-memory storage backend implementing every controller.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::TryStreamExt;
use md5::{Digest, Md5};

use s3gate_http::controller::{
    CompleteMultipartResult, DeleteObjectResult, GetObjectResult, ListBucketsResult,
    ListMultipartRequest, ListMultipartResult, ListObjectVersionsRequest,
    ListObjectVersionsResult, ListObjectsRequest, ListObjectsResult, ListPartsRequest,
    ListPartsResult, ObjectContent, PutObjectResult,
};
use s3gate_http::{
    BucketController, MultipartController, ObjectController, RequestBody, RequestContext,
    ServiceController,
};
use s3gate_model::error::S3Error;
use s3gate_model::types::{
    Bucket, CompletedPart, DeleteMarkerEntry, Object, ObjectVersion, Owner, Part, Upload,
    VersioningStatus,
};

/// Owner reported for every bucket, object and upload.
pub const OWNER: &str = "s3gate";

/// Smallest size of any part but the last.
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

const NULL_VERSION: &str = "null";

#[derive(Debug, Clone)]
struct StoredVersion {
    version_id: String,
    data: Bytes,
    etag: String,
    modified: DateTime<Utc>,
    delete_marker: bool,
}

#[derive(Debug)]
struct BucketState {
    created: DateTime<Utc>,
    versioning: VersioningStatus,
    /// Versions per key, oldest first.
    objects: BTreeMap<String, Vec<StoredVersion>>,
}

impl BucketState {
    fn new() -> Self {
        Self {
            created: Utc::now(),
            versioning: VersioningStatus::Unversioned,
            objects: BTreeMap::new(),
        }
    }

    /// Append a new version of `key`, returning the version ID to report.
    ///
    /// Outside of an enabled bucket the `null` version is replaced.
    fn store(&mut self, key: &str, data: Bytes, etag: String, delete_marker: bool) -> Option<String> {
        let version_id = if self.versioning == VersioningStatus::Enabled {
            uuid::Uuid::new_v4().simple().to_string()
        } else {
            NULL_VERSION.to_owned()
        };

        let versions = self.objects.entry(key.to_owned()).or_default();
        if version_id == NULL_VERSION {
            versions.retain(|v| v.version_id != NULL_VERSION);
        }
        versions.push(StoredVersion {
            version_id: version_id.clone(),
            data,
            etag,
            modified: Utc::now(),
            delete_marker,
        });

        (self.versioning != VersioningStatus::Unversioned).then_some(version_id)
    }
}

#[derive(Debug, Clone)]
struct StoredPart {
    data: Bytes,
    etag: String,
    modified: DateTime<Utc>,
}

#[derive(Debug)]
struct UploadState {
    bucket: String,
    key: String,
    initiated: DateTime<Utc>,
    parts: BTreeMap<u32, StoredPart>,
}

/// Buckets, object versions and multipart uploads held in [`DashMap`]s.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: DashMap<String, BucketState>,
    uploads: DashMap<String, UploadState>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a bucket.
    #[must_use]
    pub fn with_bucket(self, name: &str) -> Self {
        self.buckets.insert(name.to_owned(), BucketState::new());
        self
    }

    /// The current content of `key`, unless it is missing or deleted.
    #[must_use]
    pub fn object_data(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let state = self.buckets.get(bucket)?;
        let latest = state.objects.get(key)?.last()?;
        (!latest.delete_marker).then(|| latest.data.clone())
    }

    /// Number of uploads in progress.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.uploads.len()
    }

    fn require_bucket(&self, bucket: &str) -> Result<(), S3Error> {
        if self.buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(S3Error::no_such_bucket())
        }
    }

    fn require_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), S3Error> {
        match self.uploads.get(upload_id) {
            Some(upload) if upload.bucket == bucket && upload.key == key => Ok(()),
            _ => Err(S3Error::no_such_upload()),
        }
    }
}

fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

async fn read_body(body: &mut RequestBody) -> Result<Bytes, S3Error> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.try_next().await.map_err(S3Error::internal)? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// The prefix `key` rolls up into, if any.
fn common_prefix(key: &str, prefix: &str, delimiter: Option<&str>) -> Option<String> {
    let delimiter = delimiter.filter(|d| !d.is_empty())?;
    let rest = &key[prefix.len()..];
    rest.find(delimiter)
        .map(|idx| format!("{prefix}{}", &rest[..idx + delimiter.len()]))
}

fn owner() -> Option<Owner> {
    Some(Owner::named(OWNER))
}

#[async_trait]
impl ServiceController for MemoryStore {
    async fn list_buckets(&self, _ctx: &RequestContext) -> Result<ListBucketsResult, S3Error> {
        let mut buckets: Vec<Bucket> = self
            .buckets
            .iter()
            .map(|entry| Bucket {
                name: entry.key().clone(),
                creation_date: entry.created,
            })
            .collect();
        buckets.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ListBucketsResult {
            owner: Owner::named(OWNER),
            buckets,
        })
    }
}

#[async_trait]
impl BucketController for MemoryStore {
    async fn get_location(&self, _ctx: &RequestContext, bucket: &str) -> Result<String, S3Error> {
        self.require_bucket(bucket)?;
        Ok(String::new())
    }

    async fn list_objects(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        request: ListObjectsRequest,
    ) -> Result<ListObjectsResult, S3Error> {
        let state = self.buckets.get(bucket).ok_or_else(S3Error::no_such_bucket)?;
        let mut result = ListObjectsResult::default();
        let mut count = 0;

        for (key, versions) in &state.objects {
            if key.as_str() <= request.marker.as_str() || !key.starts_with(&request.prefix) {
                continue;
            }
            let Some(latest) = versions.last().filter(|v| !v.delete_marker) else {
                continue;
            };

            let rolled_up = common_prefix(key, &request.prefix, request.delimiter.as_deref());
            if let Some(prefix) = &rolled_up {
                if prefix.as_str() <= request.marker.as_str()
                    || result.common_prefixes.last() == Some(prefix)
                {
                    continue;
                }
            }

            if count == request.max_keys {
                result.is_truncated = true;
                break;
            }
            count += 1;

            match rolled_up {
                Some(prefix) => result.common_prefixes.push(prefix),
                None => result.contents.push(Object {
                    key: key.clone(),
                    last_modified: latest.modified,
                    etag: latest.etag.clone(),
                    size: latest.data.len() as u64,
                    storage_class: String::new(),
                    owner: owner(),
                }),
            }
        }

        Ok(result)
    }

    async fn list_object_versions(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        request: ListObjectVersionsRequest,
    ) -> Result<ListObjectVersionsResult, S3Error> {
        let state = self.buckets.get(bucket).ok_or_else(S3Error::no_such_bucket)?;
        let mut result = ListObjectVersionsResult::default();
        let mut count = 0;
        let mut last: Option<(String, String)> = None;

        'keys: for (key, versions) in &state.objects {
            if !key.starts_with(&request.prefix) || key.as_str() < request.key_marker.as_str() {
                continue;
            }
            let resume_after = if key == &request.key_marker {
                if request.version_id_marker.is_empty() {
                    continue;
                }
                Some(request.version_id_marker.as_str())
            } else {
                None
            };

            if let Some(prefix) = common_prefix(key, &request.prefix, request.delimiter.as_deref()) {
                if result.common_prefixes.last() != Some(&prefix) {
                    if count == request.max_keys {
                        result.is_truncated = true;
                        break;
                    }
                    count += 1;
                    result.common_prefixes.push(prefix);
                }
                continue;
            }

            let newest = versions.len().saturating_sub(1);
            let mut skipping = resume_after.is_some();
            for (idx, version) in versions.iter().enumerate().rev() {
                if skipping {
                    skipping = Some(version.version_id.as_str()) != resume_after;
                    continue;
                }
                if count == request.max_keys {
                    result.is_truncated = true;
                    break 'keys;
                }
                count += 1;

                if version.delete_marker {
                    result.delete_markers.push(DeleteMarkerEntry {
                        key: key.clone(),
                        version_id: version.version_id.clone(),
                        is_latest: idx == newest,
                        last_modified: version.modified,
                        owner: owner(),
                    });
                } else {
                    result.versions.push(ObjectVersion {
                        key: key.clone(),
                        version_id: version.version_id.clone(),
                        is_latest: idx == newest,
                        last_modified: version.modified,
                        etag: version.etag.clone(),
                        size: version.data.len() as u64,
                        storage_class: String::new(),
                        owner: owner(),
                    });
                }
                last = Some((key.clone(), version.version_id.clone()));
            }
        }

        if result.is_truncated {
            if let Some((key, version)) = last {
                result.next_key_marker = Some(key);
                result.next_version_id_marker = Some(version);
            }
        }
        Ok(result)
    }

    async fn create_bucket(&self, _ctx: &RequestContext, bucket: &str) -> Result<(), S3Error> {
        match self.buckets.entry(bucket.to_owned()) {
            Entry::Occupied(_) => Err(S3Error::bucket_already_owned_by_you()),
            Entry::Vacant(entry) => {
                entry.insert(BucketState::new());
                Ok(())
            }
        }
    }

    async fn delete_bucket(&self, _ctx: &RequestContext, bucket: &str) -> Result<(), S3Error> {
        let has_objects = {
            let state = self.buckets.get(bucket).ok_or_else(S3Error::no_such_bucket)?;
            state.objects.values().any(|versions| !versions.is_empty())
        };
        if has_objects {
            return Err(S3Error::bucket_not_empty());
        }
        self.buckets.remove(bucket);
        Ok(())
    }

    async fn get_versioning(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
    ) -> Result<VersioningStatus, S3Error> {
        let state = self.buckets.get(bucket).ok_or_else(S3Error::no_such_bucket)?;
        Ok(state.versioning)
    }

    async fn set_versioning(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        status: VersioningStatus,
    ) -> Result<(), S3Error> {
        let mut state = self
            .buckets
            .get_mut(bucket)
            .ok_or_else(S3Error::no_such_bucket)?;
        state.versioning = status;
        Ok(())
    }
}

#[async_trait]
impl ObjectController for MemoryStore {
    async fn get_object(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        version: Option<&str>,
    ) -> Result<GetObjectResult, S3Error> {
        let state = self.buckets.get(bucket).ok_or_else(S3Error::no_such_bucket)?;
        let versions = state.objects.get(key).ok_or_else(S3Error::no_such_key)?;
        let found = match version {
            Some(id) => versions
                .iter()
                .find(|v| v.version_id == id)
                .ok_or_else(S3Error::no_such_version)?,
            None => versions.last().ok_or_else(S3Error::no_such_key)?,
        };

        let content = if found.delete_marker {
            ObjectContent::default()
        } else {
            ObjectContent::from_bytes(found.data.clone())
        };
        Ok(GetObjectResult {
            etag: found.etag.clone(),
            version: (state.versioning != VersioningStatus::Unversioned)
                .then(|| found.version_id.clone()),
            delete_marker: found.delete_marker,
            mod_time: Some(found.modified),
            content,
        })
    }

    async fn put_object(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        body: &mut RequestBody,
    ) -> Result<PutObjectResult, S3Error> {
        self.require_bucket(bucket)?;
        let data = read_body(body).await?;
        let etag = md5_hex(&data);

        let mut state = self
            .buckets
            .get_mut(bucket)
            .ok_or_else(S3Error::no_such_bucket)?;
        let version = state.store(key, data, etag.clone(), false);
        Ok(PutObjectResult { etag, version })
    }

    async fn delete_object(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        version: Option<&str>,
    ) -> Result<DeleteObjectResult, S3Error> {
        let mut state = self
            .buckets
            .get_mut(bucket)
            .ok_or_else(S3Error::no_such_bucket)?;

        match version {
            Some(id) => {
                let versions = state
                    .objects
                    .get_mut(key)
                    .ok_or_else(S3Error::no_such_version)?;
                let pos = versions
                    .iter()
                    .position(|v| v.version_id == id)
                    .ok_or_else(S3Error::no_such_version)?;
                let removed = versions.remove(pos);
                let now_empty = versions.is_empty();
                if now_empty {
                    state.objects.remove(key);
                }
                Ok(DeleteObjectResult {
                    version: Some(removed.version_id),
                    delete_marker: removed.delete_marker,
                })
            }
            None if state.versioning == VersioningStatus::Unversioned => state
                .objects
                .remove(key)
                .map(|_| DeleteObjectResult::default())
                .ok_or_else(S3Error::no_such_key),
            None => {
                let version = state.store(key, Bytes::new(), String::new(), true);
                Ok(DeleteObjectResult {
                    version,
                    delete_marker: true,
                })
            }
        }
    }
}

#[async_trait]
impl MultipartController for MemoryStore {
    async fn list_multipart(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        request: ListMultipartRequest,
    ) -> Result<ListMultipartResult, S3Error> {
        self.require_bucket(bucket)?;

        let mut uploads: Vec<Upload> = self
            .uploads
            .iter()
            .filter(|entry| entry.bucket == bucket)
            .map(|entry| Upload {
                key: entry.key.clone(),
                upload_id: entry.key().clone(),
                initiator: owner(),
                owner: owner(),
                storage_class: String::new(),
                initiated: entry.initiated,
            })
            .filter(|upload| {
                request.key_marker.is_empty()
                    || upload.key > request.key_marker
                    || (upload.key == request.key_marker
                        && !request.upload_id_marker.is_empty()
                        && upload.upload_id > request.upload_id_marker)
            })
            .collect();
        uploads.sort_by(|a, b| (&a.key, &a.upload_id).cmp(&(&b.key, &b.upload_id)));

        let limit = request.max_uploads as usize;
        let is_truncated = uploads.len() > limit;
        uploads.truncate(limit);
        Ok(ListMultipartResult {
            is_truncated,
            uploads,
        })
    }

    async fn init_multipart(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<String, S3Error> {
        self.require_bucket(bucket)?;
        let upload_id = uuid::Uuid::new_v4().simple().to_string();
        self.uploads.insert(
            upload_id.clone(),
            UploadState {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                initiated: Utc::now(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn abort_multipart(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), S3Error> {
        self.require_upload(bucket, key, upload_id)?;
        self.uploads.remove(upload_id);
        Ok(())
    }

    async fn complete_multipart(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<CompleteMultipartResult, S3Error> {
        self.require_bucket(bucket)?;

        let (data, etag) = {
            let upload = match self.uploads.get(upload_id) {
                Some(upload) if upload.bucket == bucket && upload.key == key => upload,
                _ => return Err(S3Error::no_such_upload()),
            };

            let mut data = BytesMut::new();
            let mut digests = Vec::with_capacity(parts.len() * 16);
            for (idx, completed) in parts.iter().enumerate() {
                let part = upload
                    .parts
                    .get(&completed.part_number)
                    .filter(|p| p.etag == completed.etag)
                    .ok_or_else(S3Error::invalid_part)?;
                if idx + 1 < parts.len() && part.data.len() < MIN_PART_SIZE {
                    return Err(S3Error::entity_too_small());
                }
                data.extend_from_slice(&part.data);
                digests.extend(hex::decode(&part.etag).map_err(S3Error::internal)?);
            }
            (data.freeze(), format!("{}-{}", md5_hex(&digests), parts.len()))
        };

        self.uploads.remove(upload_id);
        let mut state = self
            .buckets
            .get_mut(bucket)
            .ok_or_else(S3Error::no_such_bucket)?;
        let version = state.store(key, data, etag.clone(), false);

        let host = ctx.header("host").unwrap_or("localhost");
        Ok(CompleteMultipartResult {
            location: format!("http://{host}/{bucket}/{key}"),
            etag,
            version,
        })
    }

    async fn list_multipart_chunks(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        request: ListPartsRequest,
    ) -> Result<ListPartsResult, S3Error> {
        let upload = match self.uploads.get(upload_id) {
            Some(upload) if upload.bucket == bucket && upload.key == key => upload,
            _ => return Err(S3Error::no_such_upload()),
        };

        let mut parts: Vec<Part> = upload
            .parts
            .range(request.part_number_marker + 1..)
            .map(|(number, part)| Part {
                part_number: *number,
                last_modified: part.modified,
                etag: part.etag.clone(),
                size: part.data.len() as u64,
            })
            .collect();

        let limit = request.max_parts as usize;
        let is_truncated = parts.len() > limit;
        parts.truncate(limit);
        Ok(ListPartsResult {
            initiator: owner(),
            owner: owner(),
            storage_class: String::new(),
            is_truncated,
            parts,
        })
    }

    async fn upload_multipart_chunk(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: &mut RequestBody,
    ) -> Result<String, S3Error> {
        self.require_upload(bucket, key, upload_id)?;
        let data = read_body(body).await?;
        let etag = md5_hex(&data);

        let mut upload = self
            .uploads
            .get_mut(upload_id)
            .ok_or_else(S3Error::no_such_upload)?;
        upload.parts.insert(
            part_number,
            StoredPart {
                data,
                etag: etag.clone(),
                modified: Utc::now(),
            },
        );
        Ok(etag)
    }

    async fn delete_multipart_chunk(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<(), S3Error> {
        self.require_upload(bucket, key, upload_id)?;
        if let Some(mut upload) = self.uploads.get_mut(upload_id) {
            upload.parts.remove(&part_number);
        }
        Ok(())
    }
}
