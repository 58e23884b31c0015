//! Opaque native handles and their release dispatch.
//!
//! A [`Handle`] is an already-acquired, externally owned resource (a
//! directory connection, a search result, a stream). [`HandleResource`]
//! guards one handle and releases it on exit using the action that the
//! static [`release_table`] associates with the handle's kind tag.

use core::fmt;
use std::sync::{Arc, LazyLock};

use downcast_rs::{DowncastSync, impl_downcast};
use hashbrown::HashMap;

use super::ScopedResource;
use crate::error::BoxError;

/// Kind tag reported by stream handles; released according to their metadata.
const STREAM_KIND: &str = "stream";

// ─────────────────────────────────────────────────────────────────────────────
// Release
// ─────────────────────────────────────────────────────────────────────────────

/// How a handle of a given kind is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Release {
    /// Pass the handle to the named native function (e.g. `ldap_close`).
    Function(&'static str),
    /// Invoke the named method on the handle object itself (e.g. `free`).
    Method(&'static str),
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Release::Function(name) => write!(f, "{name}(handle)"),
            Release::Method(name) => write!(f, "handle->{name}()"),
        }
    }
}

/// Kind tag → release action. `None` means the handle needs no release,
/// usually because a parent handle owns it.
const RELEASE_ACTIONS: &[(&str, Option<Release>)] = &[
    ("ldap link", Some(Release::Function("ldap_close"))),
    ("ldap result", Some(Release::Function("ldap_free_result"))),
    ("ldap result entry", None),
    ("socket", Some(Release::Function("fclose"))),
    ("sockets file descriptor set", Some(Release::Function("close"))),
    ("sockets i/o vector", None),
    ("curl", Some(Release::Function("curl_close"))),
    ("ftp", Some(Release::Function("ftp_close"))),
    ("bzip2", Some(Release::Function("bzclose"))),
    ("zlib", Some(Release::Function("gzclose"))),
    ("zlib.deflate", None),
    ("zlib.inflate", None),
    ("dba", Some(Release::Function("dba_close"))),
    ("dba persistent", None),
    ("imap", Some(Release::Function("imap_close"))),
    ("mysql link", Some(Release::Function("mysql_close"))),
    ("mysql link persistent", None),
    ("mysql result", Some(Release::Function("mysql_free_result"))),
    ("pgsql link", Some(Release::Function("pg_close"))),
    ("pgsql link persistent", None),
    ("pgsql result", Some(Release::Function("pg_free_result"))),
    ("pgsql large object", Some(Release::Function("pg_lo_close"))),
    ("pgsql string", None),
    ("odbc link", Some(Release::Function("odbc_close"))),
    ("odbc link persistent", None),
    ("odbc result", Some(Release::Function("odbc_free_result"))),
    ("oci8 connection", Some(Release::Function("oci_close"))),
    ("oci8 statement", Some(Release::Function("oci_free_statement"))),
    ("oci8 collection", Some(Release::Method("free"))),
    ("oci8 lob", Some(Release::Method("free"))),
    ("OpenSSL key", Some(Release::Function("openssl_free_key"))),
    ("OpenSSL X.509", Some(Release::Function("openssl_x509_free"))),
    ("shmop", Some(Release::Function("shmop_close"))),
    ("sysvsem", Some(Release::Function("sem_release"))),
    ("sysvshm", Some(Release::Function("shm_detach"))),
    ("xml", Some(Release::Function("xml_parser_free"))),
    ("gd", Some(Release::Function("imagedestroy"))),
    ("gd font", None),
    ("GMP integer", None),
    ("xpath context", None),
    ("xpath object", None),
];

static RELEASE_TABLE: LazyLock<HashMap<&'static str, Option<Release>>> =
    LazyLock::new(|| RELEASE_ACTIONS.iter().copied().collect());

/// Returns the static, read-only release table.
///
/// Kinds missing from the table are treated as needing no release.
#[must_use]
pub fn release_table() -> &'static HashMap<&'static str, Option<Release>> {
    &RELEASE_TABLE
}

// ─────────────────────────────────────────────────────────────────────────────
// RawHandle / Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Live introspection data reported by a handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleMetadata {
    /// For stream handles: `"dir"` for directory streams, `"STDIO"` for files.
    pub stream_type: Option<String>,
}

/// A native handle owned by an external library.
///
/// Implementors report the current kind tag and perform release actions on
/// request. Once closed, [`kind`](Self::kind) must return `None`.
pub trait RawHandle: DowncastSync {
    /// Returns the runtime kind tag, or `None` if the handle is no longer live.
    fn kind(&self) -> Option<&str>;

    /// Returns live metadata about the handle.
    fn metadata(&self) -> HandleMetadata {
        HandleMetadata::default()
    }

    /// Performs `action` on this handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the native release call fails.
    fn release(&self, action: Release) -> Result<(), BoxError>;
}

impl_downcast!(sync RawHandle);

/// Shared reference to a [`RawHandle`].
#[derive(Clone)]
pub struct Handle {
    raw: Arc<dyn RawHandle>,
}

impl Handle {
    /// Wraps a native handle.
    #[must_use]
    pub fn new(raw: impl RawHandle) -> Self {
        Self { raw: Arc::new(raw) }
    }

    /// Wraps an already shared native handle.
    #[must_use]
    pub fn from_arc(raw: Arc<dyn RawHandle>) -> Self {
        Self { raw }
    }

    /// Returns the runtime kind tag, or `None` once the handle is closed.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.raw.kind()
    }

    /// Returns `true` while the handle is live.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.raw.kind().is_some()
    }

    /// Returns live metadata about the handle.
    #[must_use]
    pub fn metadata(&self) -> HandleMetadata {
        self.raw.metadata()
    }

    /// Returns the underlying native handle.
    #[must_use]
    pub fn raw(&self) -> &Arc<dyn RawHandle> {
        &self.raw
    }

    /// Downcasts the native handle to a concrete type.
    #[must_use]
    pub fn downcast_ref<T: RawHandle>(&self) -> Option<&T> {
        self.raw.downcast_ref::<T>()
    }

    /// Returns `true` if both handles refer to the same native handle.
    #[must_use]
    pub fn same_handle(&self, other: &Handle) -> bool {
        core::ptr::addr_eq(Arc::as_ptr(&self.raw), Arc::as_ptr(&other.raw))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &self.kind())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HandleResource
// ─────────────────────────────────────────────────────────────────────────────

/// A [`ScopedResource`] that releases a [`Handle`] on exit.
///
/// The handle is already acquired when wrapped, so `enter` only hands it
/// out. `exit` releases it at most once and never suppresses errors.
///
/// # Example
///
/// ```
/// use tether_context::error::BoxError;
/// use tether_context::scope::{Handle, HandleResource, RawHandle, Release, ScopedResource};
///
/// struct Link;
///
/// impl RawHandle for Link {
///     fn kind(&self) -> Option<&str> {
///         Some("ldap link")
///     }
///
///     fn release(&self, _action: Release) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
///
/// let resource = HandleResource::new(Handle::new(Link));
/// assert_eq!(resource.release_action(), Some(Release::Function("ldap_close")));
/// ```
#[derive(Debug)]
pub struct HandleResource {
    handle: Handle,
    released: bool,
}

impl HandleResource {
    /// Guards `handle`.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            released: false,
        }
    }

    /// Returns the guarded handle.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns the action that will release the handle, if any.
    ///
    /// Stream handles are released with `closedir` or `fclose` depending on
    /// whether their metadata reports a directory stream.
    #[must_use]
    pub fn release_action(&self) -> Option<Release> {
        let kind = self.handle.kind()?;
        if kind == STREAM_KIND {
            return Some(stream_release(&self.handle.metadata()));
        }
        match release_table().get(kind) {
            Some(action) => *action,
            None => {
                tracing::debug!(kind, "no release action registered for handle kind");
                None
            }
        }
    }
}

fn stream_release(metadata: &HandleMetadata) -> Release {
    match metadata.stream_type.as_deref() {
        Some("dir") => Release::Function("closedir"),
        _ => Release::Function("fclose"),
    }
}

impl ScopedResource for HandleResource {
    type Entered = Handle;

    fn enter(&mut self) -> Result<Handle, BoxError> {
        Ok(self.handle.clone())
    }

    fn exit(&mut self, _pending: Option<&BoxError>) -> Result<bool, BoxError> {
        if self.released || !self.handle.is_live() {
            return Ok(false);
        }
        let Some(action) = self.release_action() else {
            return Ok(false);
        };

        self.released = true;
        tracing::trace!(kind = ?self.handle.kind(), %action, "releasing handle");
        self.handle.raw().release(action)?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};
    use parking_lot::Mutex;

    struct FakeHandle {
        kind: &'static str,
        open: AtomicBool,
        stream_type: Option<String>,
        released: Mutex<Vec<Release>>,
    }

    impl FakeHandle {
        fn new(kind: &'static str) -> Self {
            Self {
                kind,
                open: AtomicBool::new(true),
                stream_type: None,
                released: Mutex::new(Vec::new()),
            }
        }
    }

    impl RawHandle for FakeHandle {
        fn kind(&self) -> Option<&str> {
            self.open.load(Ordering::SeqCst).then_some(self.kind)
        }

        fn metadata(&self) -> HandleMetadata {
            HandleMetadata {
                stream_type: self.stream_type.clone(),
            }
        }

        fn release(&self, action: Release) -> Result<(), BoxError> {
            self.released.lock().push(action);
            self.open.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fake(kind: &'static str) -> (Arc<FakeHandle>, HandleResource) {
        let raw = Arc::new(FakeHandle::new(kind));
        let handle = Handle::from_arc(raw.clone());
        (raw, HandleResource::new(handle))
    }

    #[test]
    fn release_table_lookup() {
        let (_, link) = fake("ldap link");
        assert_eq!(link.release_action(), Some(Release::Function("ldap_close")));

        let (_, entry) = fake("ldap result entry");
        assert_eq!(entry.release_action(), None);

        let (_, lob) = fake("oci8 lob");
        assert_eq!(lob.release_action(), Some(Release::Method("free")));
    }

    #[test]
    fn unknown_kind_releases_nothing() {
        let (raw, mut resource) = fake("mystery");
        assert_eq!(resource.release_action(), None);

        resource.enter().unwrap();
        assert!(!resource.exit(None).unwrap());
        assert!(raw.released.lock().is_empty());
    }

    #[test]
    fn stream_release_depends_on_metadata() {
        let dir = HandleMetadata {
            stream_type: Some("dir".into()),
        };
        let file = HandleMetadata {
            stream_type: Some("STDIO".into()),
        };
        assert_eq!(stream_release(&dir), Release::Function("closedir"));
        assert_eq!(stream_release(&file), Release::Function("fclose"));
        assert_eq!(
            stream_release(&HandleMetadata::default()),
            Release::Function("fclose")
        );
    }

    #[test]
    fn exit_releases_once() {
        let (raw, mut resource) = fake("ldap link");

        let handle = resource.enter().unwrap();
        assert!(handle.same_handle(resource.handle()));

        assert!(!resource.exit(None).unwrap());
        assert!(!resource.exit(None).unwrap());
        assert_eq!(
            raw.released.lock().as_slice(),
            &[Release::Function("ldap_close")]
        );
    }

    #[test]
    fn exit_closes_directory_and_file_streams() {
        for (stream_type, expected) in [
            (Some("dir"), Release::Function("closedir")),
            (Some("STDIO"), Release::Function("fclose")),
            (None, Release::Function("fclose")),
        ] {
            let mut raw = FakeHandle::new(STREAM_KIND);
            raw.stream_type = stream_type.map(String::from);
            let raw = Arc::new(raw);
            let mut resource = HandleResource::new(Handle::from_arc(raw.clone()));

            resource.enter().unwrap();
            assert!(!resource.exit(None).unwrap());
            assert_eq!(raw.released.lock().as_slice(), &[expected]);
        }
    }

    #[test]
    fn exit_invokes_release_method() {
        let (raw, mut resource) = fake("oci8 lob");

        resource.enter().unwrap();
        assert!(!resource.exit(None).unwrap());
        assert_eq!(raw.released.lock().as_slice(), &[Release::Method("free")]);
        assert!(!resource.handle().is_live());
    }

    #[test]
    fn exit_skips_closed_handle() {
        let (raw, mut resource) = fake("ldap link");
        raw.open.store(false, Ordering::SeqCst);

        assert!(!resource.exit(None).unwrap());
        assert!(raw.released.lock().is_empty());
    }

    #[test]
    fn exit_never_suppresses_pending_error() {
        let (_, mut resource) = fake("ldap link");
        let pending: BoxError = "search failed".into();
        assert!(!resource.exit(Some(&pending)).unwrap());
    }

    #[test]
    fn handle_downcasts_to_native_type() {
        let handle = Handle::new(FakeHandle::new("ldap link"));
        assert!(handle.downcast_ref::<FakeHandle>().is_some());
        assert!(format!("{handle:?}").contains("ldap link"));
    }
}
