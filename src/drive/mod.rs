//! Remote folder resolution and file upload against the Drive v3 API.

pub mod auth;

use crate::error::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const CSV_MIME: &str = "text/csv";

/// A folder on the storage backend, identified by an opaque id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolder {
    pub id: String,
    pub title: String,
}

/// The slice of the storage backend this tool needs. Listing is read-only;
/// the other two mutate remote state.
pub trait DriveStore {
    /// Child folders of `parent_id` whose title matches exactly, trashed
    /// items excluded, in provider-returned order.
    async fn find_folders(&self, parent_id: &str, title: &str) -> Result<Vec<RemoteFolder>>;

    async fn create_folder(&self, parent_id: &str, title: &str) -> Result<()>;

    async fn upload_csv(&self, folder_id: &str, file_name: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Return the id of the `title` folder under `parent_id`, creating it if
/// absent. Lookup-then-create, verified by a second lookup; at most one
/// create is ever issued. The first listed match wins when several exist.
pub async fn resolve_or_create<D: DriveStore>(
    store: &D,
    parent_id: &str,
    title: &str,
) -> Result<String> {
    if let Some(folder) = store.find_folders(parent_id, title).await?.into_iter().next() {
        debug!(id = %folder.id, title, "folder already present");
        return Ok(folder.id);
    }

    store.create_folder(parent_id, title).await?;
    info!(parent_id, title, "created folder");

    match store.find_folders(parent_id, title).await?.into_iter().next() {
        Some(folder) => Ok(folder.id),
        None => Err(Error::DirectoryCreation {
            parent_id: parent_id.to_string(),
            title: title.to_string(),
        }),
    }
}

pub struct DriveClient {
    http: Client,
    access_token: String,
}

impl DriveClient {
    /// Load credentials, run the token exchange, and return a ready client.
    pub async fn authenticate(http: Client, creds: &auth::Credentials) -> Result<Self> {
        let access_token = auth::exchange(&http, creds).await?;
        info!("storage session established");
        Ok(Self { http, access_token })
    }
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Deserialize)]
struct FileEntry {
    id: String,
    name: String,
}

impl DriveStore for DriveClient {
    async fn find_folders(&self, parent_id: &str, title: &str) -> Result<Vec<RemoteFolder>> {
        let query = format!(
            "'{}' in parents and name = '{}' and mimeType = '{}' and trashed = false",
            parent_id,
            title.replace('\'', "\\'"),
            FOLDER_MIME,
        );
        let list: FileList = self
            .http
            .get(FILES_URL)
            .bearer_auth(&self.access_token)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(list
            .files
            .into_iter()
            .map(|f| RemoteFolder {
                id: f.id,
                title: f.name,
            })
            .collect())
    }

    async fn create_folder(&self, parent_id: &str, title: &str) -> Result<()> {
        self.http
            .post(FILES_URL)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "name": title,
                "mimeType": FOLDER_MIME,
                "parents": [parent_id],
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn upload_csv(&self, folder_id: &str, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        // Create the entry first, then push the bytes against its id; avoids
        // hand-rolling a multipart/related body.
        let created: FileEntry = self
            .http
            .post(FILES_URL)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "name": file_name,
                "mimeType": CSV_MIME,
                "parents": [folder_id],
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let size = bytes.len();
        self.http
            .patch(format!("{UPLOAD_URL}/{}", created.id))
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, CSV_MIME)
            .body(bytes)
            .send()
            .await?
            .error_for_status()?;

        info!(file_name, folder_id, bytes = size, "uploaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory stand-in for the storage backend.
    struct FakeDrive {
        state: Mutex<FakeState>,
    }

    struct FakeState {
        folders: Vec<(String, RemoteFolder)>,
        create_calls: usize,
        /// When false, create_folder succeeds but leaves no folder behind.
        create_takes_effect: bool,
    }

    impl FakeDrive {
        fn new() -> Self {
            Self {
                state: Mutex::new(FakeState {
                    folders: Vec::new(),
                    create_calls: 0,
                    create_takes_effect: true,
                }),
            }
        }

        fn broken() -> Self {
            let fake = Self::new();
            fake.state.lock().unwrap().create_takes_effect = false;
            fake
        }

        fn create_calls(&self) -> usize {
            self.state.lock().unwrap().create_calls
        }
    }

    impl DriveStore for FakeDrive {
        async fn find_folders(&self, parent_id: &str, title: &str) -> Result<Vec<RemoteFolder>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .folders
                .iter()
                .filter(|(parent, f)| parent == parent_id && f.title == title)
                .map(|(_, f)| f.clone())
                .collect())
        }

        async fn create_folder(&self, parent_id: &str, title: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.create_calls += 1;
            if state.create_takes_effect {
                let id = format!("id-{}", state.create_calls);
                state.folders.push((
                    parent_id.to_string(),
                    RemoteFolder {
                        id,
                        title: title.to_string(),
                    },
                ));
            }
            Ok(())
        }

        async fn upload_csv(&self, _: &str, _: &str, _: Vec<u8>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn resolve_twice_creates_once() {
        let drive = FakeDrive::new();
        let first = resolve_or_create(&drive, "root", "X").await.unwrap();
        let second = resolve_or_create(&drive, "root", "X").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(drive.create_calls(), 1);
    }

    #[tokio::test]
    async fn verification_failure_is_fatal_without_retry() {
        let drive = FakeDrive::broken();
        let err = resolve_or_create(&drive, "root", "X").await.unwrap_err();
        assert!(matches!(err, Error::DirectoryCreation { .. }));
        assert_eq!(drive.create_calls(), 1);
    }

    #[tokio::test]
    async fn first_listed_match_wins() {
        let drive = FakeDrive::new();
        {
            let mut state = drive.state.lock().unwrap();
            for id in ["dup-a", "dup-b"] {
                state.folders.push((
                    "root".to_string(),
                    RemoteFolder {
                        id: id.to_string(),
                        title: "X".to_string(),
                    },
                ));
            }
        }
        let id = resolve_or_create(&drive, "root", "X").await.unwrap();
        assert_eq!(id, "dup-a");
        assert_eq!(drive.create_calls(), 0);
    }

    #[tokio::test]
    async fn distinct_parents_do_not_collide() {
        let drive = FakeDrive::new();
        let a = resolve_or_create(&drive, "root-a", "X").await.unwrap();
        let b = resolve_or_create(&drive, "root-b", "X").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(drive.create_calls(), 2);
    }
}
