//! Tests for classification: precedence, fallback and handle release through the executor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tether_context::prelude::*;

// ─────────────────────────────────────────────────────────────────────────
// Test Types
// ─────────────────────────────────────────────────────────────────────────

/// A connection descriptor with no resource semantics of its own.
struct Conn(&'static str);

/// A resource built from a [`Conn`] by a registered classifier.
struct Session {
    uri: &'static str,
}

impl ScopedResource for Session {
    type Entered = String;

    fn enter(&mut self) -> Result<String, BoxError> {
        Ok(format!("session:{}", self.uri))
    }

    fn exit(&mut self, _pending: Option<&BoxError>) -> Result<bool, BoxError> {
        Ok(false)
    }
}

struct LdapLink {
    open: AtomicBool,
    releases: AtomicUsize,
}

impl LdapLink {
    fn new(open: bool) -> Arc<Self> {
        Arc::new(Self {
            open: AtomicBool::new(open),
            releases: AtomicUsize::new(0),
        })
    }
}

impl RawHandle for LdapLink {
    fn kind(&self) -> Option<&str> {
        self.open.load(Ordering::SeqCst).then_some("ldap link")
    }

    fn release(&self, action: Release) -> Result<(), BoxError> {
        assert_eq!(action, Release::Function("ldap_close"));
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn session_classifier() -> ClassClassifier {
    ClassClassifier::new().with::<Conn, _, _>(|conn| Session { uri: conn.0 })
}

// ─────────────────────────────────────────────────────────────────────────
// Precedence
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn registered_type_is_classified_only_while_pushed() {
    ClassifierStack::global().reset();
    let mut classifier = session_classifier();

    classifier.enter().unwrap();
    let resource = get_scoped_resource(Value::plain(Conn("ldap://a")));
    assert!(resource.is::<Session>());

    classifier.exit(None).unwrap();
    let resource = get_scoped_resource(Value::plain(Conn("ldap://a")));
    assert!(resource.is::<ValueWrapper<Box<dyn core::any::Any + Send>>>());
}

#[test]
fn classifier_entered_through_run_with_applies_inside_callback() {
    ClassifierStack::global().reset();

    let result = run_with([Value::resource(session_classifier())], |_| {
        let mut resource = get_scoped_resource(Value::plain(Conn("ldap://b")));
        assert!(resource.is::<Session>());
        let entered = resource.enter()?;
        Ok(*entered.downcast::<String>().map_err(|_| "not a session")?)
    });

    assert_eq!(result.unwrap().as_deref(), Some("session:ldap://b"));
    assert!(ClassifierStack::global().is_empty());
    let resource = get_scoped_resource(Value::plain(Conn("ldap://b")));
    assert!(!resource.is::<Session>());
}

#[test]
fn nested_classifiers_resolve_top_down() {
    ClassifierStack::global().reset();
    let mut outer = session_classifier();
    let mut inner = ClassClassifier::new().with::<Conn, _, _>(|_| ValueWrapper::new("inner"));

    outer.enter().unwrap();
    inner.enter().unwrap();
    assert!(!get_scoped_resource(Value::plain(Conn(""))).is::<Session>());

    inner.exit(None).unwrap();
    assert!(get_scoped_resource(Value::plain(Conn(""))).is::<Session>());

    outer.exit(None).unwrap();
}

#[test]
fn classifier_scope_and_local_stack_are_interchangeable() {
    ClassifierStack::global().reset();
    let mut local = ClassifierStack::new();
    local.push(session_classifier());

    run_scoped((local,), |(count,)| {
        assert_eq!(count, 1);
        assert!(get_scoped_resource(Value::plain(Conn(""))).is::<Session>());
        Ok(())
    })
    .unwrap();

    run_scoped((ClassifierScope::new(session_classifier()),), |_| {
        assert!(get_scoped_resource(Value::plain(Conn(""))).is::<Session>());
        Ok(())
    })
    .unwrap();

    assert!(ClassifierStack::global().is_empty());
}

#[test]
fn builders_may_use_the_stack() {
    ClassifierStack::global().reset();
    let mut classifier = ClassClassifier::new().with::<Conn, _, _>(|conn| {
        // Classify the inner value with whatever is currently installed.
        ValueWrapper::new(get_scoped_resource(Value::plain(conn.0)))
    });

    classifier.enter().unwrap();
    let resource = get_scoped_resource(Value::plain(Conn("ldap://c")));
    assert!(resource.is::<ValueWrapper<BoxedResource>>());
    classifier.exit(None).unwrap();
}

// ─────────────────────────────────────────────────────────────────────────
// Default classification
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn wrapped_resources_pass_through_unchanged() {
    let resource: BoxedResource = Box::new(Session { uri: "ldap://d" });
    let address = core::ptr::from_ref(&*resource).cast::<()>();

    let resolved = DefaultClassifier::instance().resolve(Value::Resource(resource));
    assert_eq!(core::ptr::from_ref(&*resolved).cast::<()>(), address);
    assert!(resolved.is::<Session>());
}

#[test]
fn boxed_resource_values_resolve_to_the_inner_resource() {
    ClassifierStack::global().reset();
    let boxed: BoxedResource = Box::new(Session { uri: "ldap://e" });

    let mut resource = get_scoped_resource(Value::resource(boxed));
    assert!(resource.is::<Session>());
    assert!(resource.resource_name().ends_with("Session"));

    let entered = resource.enter().unwrap();
    assert_eq!(entered.downcast_ref::<String>().unwrap(), "session:ldap://e");
}

#[test]
fn live_handle_is_released_after_callback() {
    ClassifierStack::global().reset();
    let link = LdapLink::new(true);

    let result = run_with([Value::handle(Handle::from_arc(link.clone()))], |mut args| {
        let handle: Handle = args.take(0)?;
        assert_eq!(handle.kind(), Some("ldap link"));
        Ok(())
    });

    assert_eq!(result.unwrap(), Some(()));
    assert_eq!(link.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn closed_handle_is_not_released() {
    let link = LdapLink::new(false);
    let mut resource = HandleResource::new(Handle::from_arc(link.clone()));

    resource.enter().unwrap();
    assert!(!resource.exit(None).unwrap());
    assert_eq!(link.releases.load(Ordering::SeqCst), 0);
}

#[test]
fn handle_released_on_error_path_without_suppressing() {
    ClassifierStack::global().reset();
    let link = LdapLink::new(true);

    let err = run_with([Value::handle(Handle::from_arc(link.clone()))], |_| {
        Err::<(), BoxError>("search failed".into())
    })
    .unwrap_err();

    assert_eq!(err.to_string(), "search failed");
    assert_eq!(link.releases.load(Ordering::SeqCst), 1);
}
