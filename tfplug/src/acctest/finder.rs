//! Remote existence checks
//!
//! A `RemoteFinder` looks an object up directly in the remote service,
//! bypassing the resource's own read, so checks observe what actually
//! exists. Finders carry their own client handle.

use super::check::{resource, BoxCheck, Capture, StateCheck};
use super::error::AcctestError;
use super::state::TestState;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Snapshot of a remote object
pub trait RemoteObject: Clone + Send + Sync + 'static {
    /// Human readable kind used in failure messages ("FSx OpenZFS Volume")
    const KIND: &'static str;

    /// Stable remote identity
    fn identity(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum FindError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Remote(String),
}

#[async_trait]
pub trait RemoteFinder: Send + Sync + 'static {
    type Object: RemoteObject;

    /// Resource type whose state entries this finder understands
    fn resource_type(&self) -> &str;

    async fn find(&self, id: &str) -> Result<Self::Object, FindError>;
}

struct ExistsCheck<F: RemoteFinder> {
    finder: Arc<F>,
    name: String,
    capture: Capture<F::Object>,
}

#[async_trait]
impl<F: RemoteFinder> StateCheck for ExistsCheck<F> {
    async fn check(&self, state: &TestState) -> Result<(), AcctestError> {
        let rs = resource(state, &self.name)?;
        if rs.id.is_empty() {
            return Err(AcctestError::check(format!(
                "{}: no {} ID is set",
                self.name,
                <F::Object as RemoteObject>::KIND
            )));
        }
        match self.finder.find(&rs.id).await {
            Ok(object) => {
                debug!(resource = %self.name, id = %rs.id, "remote object exists");
                self.capture.set(object).await;
                Ok(())
            }
            Err(e) => Err(AcctestError::check(format!(
                "{}: {} ({}): {}",
                self.name,
                <F::Object as RemoteObject>::KIND,
                rs.id,
                e
            ))),
        }
    }
}

/// The resource's remote object exists; its snapshot goes into `capture`
pub fn check_exists<F: RemoteFinder>(
    finder: Arc<F>,
    name: &str,
    capture: &Capture<F::Object>,
) -> BoxCheck {
    Box::new(ExistsCheck {
        finder,
        name: name.to_string(),
        capture: capture.clone(),
    })
}

struct DestroyCheck<F: RemoteFinder> {
    finder: Arc<F>,
}

#[async_trait]
impl<F: RemoteFinder> StateCheck for DestroyCheck<F> {
    async fn check(&self, state: &TestState) -> Result<(), AcctestError> {
        for rs in state.resources_of_type(self.finder.resource_type()) {
            match self.finder.find(&rs.id).await {
                Err(FindError::NotFound(_)) => continue,
                Err(FindError::Remote(message)) => {
                    return Err(AcctestError::check(format!(
                        "{}: checking {} ({}): {}",
                        rs.address(),
                        <F::Object as RemoteObject>::KIND,
                        rs.id,
                        message
                    )))
                }
                Ok(_) => {
                    return Err(AcctestError::check(format!(
                        "{} ({}) still exists",
                        <F::Object as RemoteObject>::KIND,
                        rs.id
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Every resource of the finder's type recorded in state is gone remotely
pub fn check_destroy<F: RemoteFinder>(finder: Arc<F>) -> BoxCheck {
    Box::new(DestroyCheck { finder })
}

struct IdentityCheck<T: RemoteObject> {
    before: Capture<T>,
    after: Capture<T>,
    expect_same: bool,
}

#[async_trait]
impl<T: RemoteObject> StateCheck for IdentityCheck<T> {
    async fn check(&self, _state: &TestState) -> Result<(), AcctestError> {
        let (Some(before), Some(after)) = (self.before.get().await, self.after.get().await) else {
            return Err(AcctestError::check(format!(
                "{} identity comparison needs both snapshots captured",
                T::KIND
            )));
        };
        let same = before.identity() == after.identity();
        match (same, self.expect_same) {
            (true, true) | (false, false) => Ok(()),
            (false, true) => Err(AcctestError::check(format!(
                "{} ({}) recreated",
                T::KIND,
                before.identity()
            ))),
            (true, false) => Err(AcctestError::check(format!(
                "{} ({}) not recreated",
                T::KIND,
                before.identity()
            ))),
        }
    }
}

/// Both snapshots name the same remote object
pub fn check_not_recreated<T: RemoteObject>(before: &Capture<T>, after: &Capture<T>) -> BoxCheck {
    Box::new(IdentityCheck {
        before: before.clone(),
        after: after.clone(),
        expect_same: true,
    })
}

/// The second snapshot is a different remote object than the first
pub fn check_recreated<T: RemoteObject>(before: &Capture<T>, after: &Capture<T>) -> BoxCheck {
    Box::new(IdentityCheck {
        before: before.clone(),
        after: after.clone(),
        expect_same: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acctest::state::ResourceState;
    use crate::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
    use crate::types::{Dynamic, DynamicValue};
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Clone, Debug)]
    struct Widget {
        id: String,
    }

    impl RemoteObject for Widget {
        const KIND: &'static str = "Widget";

        fn identity(&self) -> &str {
            &self.id
        }
    }

    #[derive(Default)]
    struct FakeFinder {
        objects: Mutex<HashMap<String, Result<(), String>>>,
    }

    #[async_trait]
    impl RemoteFinder for FakeFinder {
        type Object = Widget;

        fn resource_type(&self) -> &str {
            "test_widget"
        }

        async fn find(&self, id: &str) -> Result<Widget, FindError> {
            match self.objects.lock().await.get(id) {
                Some(Ok(())) => Ok(Widget { id: id.to_string() }),
                Some(Err(e)) => Err(FindError::Remote(e.clone())),
                None => Err(FindError::NotFound(format!("{} not found", id))),
            }
        }
    }

    fn state_with(ids: &[&str]) -> TestState {
        let schema = SchemaBuilder::new()
            .attribute(AttributeBuilder::new("id", AttributeType::String).computed().build())
            .build();
        let mut state = TestState::default();
        for (i, id) in ids.iter().enumerate() {
            state.insert(ResourceState::new(
                "test_widget",
                &format!("w{}", i),
                DynamicValue::new(Dynamic::object([("id", Dynamic::from(*id))])),
                &schema.block,
            ));
        }
        state
    }

    #[tokio::test]
    async fn exists_captures_snapshot() {
        let finder = Arc::new(FakeFinder::default());
        finder.objects.lock().await.insert("w-1".into(), Ok(()));
        let capture = Capture::new();

        check_exists(finder.clone(), "test_widget.w0", &capture)
            .check(&state_with(&["w-1"]))
            .await
            .unwrap();
        assert_eq!(capture.get().await.unwrap().id, "w-1");

        let err = check_exists(finder, "test_widget.w0", &capture)
            .check(&state_with(&["w-2"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Widget (w-2)"));
    }

    #[tokio::test]
    async fn destroy_distinguishes_not_found_from_errors() {
        let finder = Arc::new(FakeFinder::default());
        let state = state_with(&["w-1", "w-2"]);
        assert!(check_destroy(finder.clone()).check(&state).await.is_ok());

        finder.objects.lock().await.insert("w-2".into(), Ok(()));
        let err = check_destroy(finder.clone()).check(&state).await.unwrap_err();
        assert_eq!(err.to_string(), "Widget (w-2) still exists");

        finder
            .objects
            .lock()
            .await
            .insert("w-2".into(), Err("access denied".into()));
        let err = check_destroy(finder).check(&state).await.unwrap_err();
        assert!(err.to_string().contains("access denied"));
    }

    #[tokio::test]
    async fn identity_comparators() {
        let first = Capture::new();
        let same = Capture::new();
        let other = Capture::new();
        first.set(Widget { id: "w-1".into() }).await;
        same.set(Widget { id: "w-1".into() }).await;
        other.set(Widget { id: "w-9".into() }).await;
        let state = TestState::default();

        assert!(check_not_recreated(&first, &same).check(&state).await.is_ok());
        assert_eq!(
            check_not_recreated(&first, &other)
                .check(&state)
                .await
                .unwrap_err()
                .to_string(),
            "Widget (w-1) recreated"
        );
        assert!(check_recreated(&first, &other).check(&state).await.is_ok());
        assert_eq!(
            check_recreated(&first, &same)
                .check(&state)
                .await
                .unwrap_err()
                .to_string(),
            "Widget (w-1) not recreated"
        );
        assert!(check_recreated(&first, &Capture::new()).check(&state).await.is_err());
    }
}
