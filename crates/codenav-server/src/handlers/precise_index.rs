//! Resolver for one precise index: an upload, an index job, or both.

use std::sync::Arc;

use codenav_domain::pagination::logical_state;
use codenav_domain::{
    CommitHandle, DomainResult, LocationCache, PathEntry, PreciseIndexRow, Prefetcher,
    RepositoryHandle, Source,
};
use codenav_storage::{Index, RepoId, Upload};

/// A page of precise index resolvers.
#[derive(Debug)]
pub struct PreciseIndexConnection {
    pub nodes: Vec<PreciseIndexResolver>,
    pub total_count: usize,
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Cursor to pass as `after` for the next page.
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug)]
enum Subject {
    Upload(Arc<Upload>),
    Index(Arc<Index>),
}

/// Field resolver over a single upload or index row.
///
/// An upload produced by an index job and the index job that produced it
/// describe the same precise index; each side reaches the other through the
/// shared prefetcher.
#[derive(Debug)]
pub struct PreciseIndexResolver {
    subject: Subject,
    locations: Arc<LocationCache>,
    prefetcher: Arc<Prefetcher>,
}

impl PreciseIndexResolver {
    /// Marks the row's counterpart on the prefetcher so it joins the next batch.
    pub(crate) fn new(
        row: PreciseIndexRow,
        locations: Arc<LocationCache>,
        prefetcher: Arc<Prefetcher>,
    ) -> Self {
        let subject = match row {
            PreciseIndexRow::Upload(upload) => {
                if let Some(index_id) = upload.associated_index_id {
                    prefetcher.mark_index(index_id);
                }
                Subject::Upload(Arc::new(upload))
            }
            PreciseIndexRow::Index(index) => {
                if let Some(upload_id) = index.associated_upload_id {
                    prefetcher.mark_upload(upload_id);
                }
                Subject::Index(Arc::new(index))
            }
        };
        Self {
            subject,
            locations,
            prefetcher,
        }
    }

    pub fn source(&self) -> Source {
        match self.subject {
            Subject::Upload(_) => Source::Upload,
            Subject::Index(_) => Source::Index,
        }
    }

    /// `upload:<id>` or `index:<id>`.
    pub fn id(&self) -> String {
        match &self.subject {
            Subject::Upload(upload) => format!("upload:{}", upload.id),
            Subject::Index(index) => format!("index:{}", index.id),
        }
    }

    /// Logical state name, or `None` for a backing state with no mapping.
    pub fn state(&self) -> Option<&'static str> {
        match &self.subject {
            Subject::Upload(upload) => logical_state(Source::Upload, &upload.state),
            Subject::Index(index) => logical_state(Source::Index, &index.state),
        }
    }

    pub fn indexer(&self) -> &str {
        match &self.subject {
            Subject::Upload(upload) => &upload.indexer,
            Subject::Index(index) => &index.indexer,
        }
    }

    fn repository_id(&self) -> RepoId {
        match &self.subject {
            Subject::Upload(upload) => upload.repository_id,
            Subject::Index(index) => index.repository_id,
        }
    }

    fn commit_oid(&self) -> &str {
        match &self.subject {
            Subject::Upload(upload) => &upload.commit,
            Subject::Index(index) => &index.commit,
        }
    }

    fn input_root(&self) -> &str {
        match &self.subject {
            Subject::Upload(upload) => &upload.root,
            Subject::Index(index) => &index.root,
        }
    }

    /// The upload side: the row itself, or the upload its index job produced.
    pub async fn upload(&self) -> DomainResult<Option<Arc<Upload>>> {
        match &self.subject {
            Subject::Upload(upload) => Ok(Some(Arc::clone(upload))),
            Subject::Index(index) => match index.associated_upload_id {
                Some(id) => self.prefetcher.get_upload_by_id(id).await,
                None => Ok(None),
            },
        }
    }

    /// The index side: the row itself, or the index job that produced the upload.
    pub async fn index(&self) -> DomainResult<Option<Arc<Index>>> {
        match &self.subject {
            Subject::Index(index) => Ok(Some(Arc::clone(index))),
            Subject::Upload(upload) => match upload.associated_index_id {
                Some(id) => self.prefetcher.get_index_by_id(id).await,
                None => Ok(None),
            },
        }
    }

    pub async fn repository(&self) -> DomainResult<Option<Arc<RepositoryHandle>>> {
        self.locations.repository(self.repository_id()).await
    }

    /// The indexed commit, `None` once the repository or commit is gone.
    pub async fn commit(&self) -> DomainResult<Option<Arc<CommitHandle>>> {
        self.locations
            .commit(self.repository_id(), self.commit_oid())
            .await
    }

    /// The directory the indexer ran in.
    pub async fn root(&self) -> DomainResult<Option<Arc<PathEntry>>> {
        self.locations
            .path(self.repository_id(), self.commit_oid(), self.input_root(), true)
            .await
    }
}
