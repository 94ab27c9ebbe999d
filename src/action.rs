//! Remote action invocation.
//!
//! [`ActionInvoker`] turns an [`ActionTarget`] into a call on an
//! [`ActionClient`]. It never panics and never lets a client error escape:
//! every outcome is an [`ActionOutcome`] or an [`ActionError`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Field names checked, in order, for an action's identifier in a
/// `get_actions()` listing. The first present string or number wins.
pub const ACTION_ID_FIELDS: [&str; 4] = ["id", "actionId", "guid", "_id"];

/// Which remote action to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTarget {
    /// Run the action with this identifier directly.
    Id(String),
    /// Look the action up by name (case-insensitive) before running it.
    Name(String),
}

impl ActionTarget {
    /// Picks a target from optional id and name settings.
    ///
    /// Blank values count as absent. A non-blank id wins over a name.
    pub fn from_parts(id: Option<&str>, name: Option<&str>) -> Option<Self> {
        let non_blank = |v: Option<&str>| v.map(str::trim).filter(|v| !v.is_empty());
        if let Some(id) = non_blank(id) {
            return Some(Self::Id(id.to_string()));
        }
        non_blank(name).map(|name| Self::Name(name.to_string()))
    }
}

/// Why an invocation did not run an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// There is no connected remote client.
    #[error("no-client: no remote client connection is available")]
    NoClient,
    /// Neither an id nor a name was configured.
    #[error("no-action-specified: neither an action id nor a name was given")]
    NoActionSpecified,
    /// The action list has no entry with this name.
    #[error("not-found: no action named {0:?}")]
    NotFound(String),
    /// The client reported a failure.
    #[error("invoked-but-failed: {0}")]
    Failed(String),
}

/// A successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    /// Identifier of the action that ran.
    pub action_id: String,
    /// Whatever the remote side answered.
    pub response: Value,
}

/// Capabilities the invoker needs from a remote control server.
#[async_trait]
pub trait ActionClient: Send + Sync {
    /// Runs the action with the given identifier.
    async fn do_action(&self, id: &str) -> anyhow::Result<Value>;

    /// Lists the available actions, either as `{ "actions": [...] }` or as a
    /// bare array.
    async fn get_actions(&self) -> anyhow::Result<Value>;

    /// Whether the connection is currently usable.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Entries of an action listing, whichever of the two shapes it came in.
pub fn action_entries(listing: &Value) -> &[Value] {
    let list = listing.get("actions").unwrap_or(listing);
    list.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// Name of an action entry. A bare string entry is its own name.
pub fn action_name(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(name) => Some(name.as_str()),
        _ => entry.get("name").and_then(Value::as_str),
    }
}

/// Identifier of an action entry, following [`ACTION_ID_FIELDS`].
pub fn resolve_action_id(entry: &Value) -> Option<String> {
    ACTION_ID_FIELDS.iter().find_map(|field| match entry.get(field)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    })
}

/// Finds the entry whose name matches `name`, ignoring case.
pub fn find_action<'a>(listing: &'a Value, name: &str) -> Option<&'a Value> {
    let wanted = name.to_lowercase();
    action_entries(listing)
        .iter()
        .find(|entry| action_name(entry).is_some_and(|n| n.to_lowercase() == wanted))
}

/// Runs remote actions through an optional client.
#[derive(Clone, Default)]
pub struct ActionInvoker {
    client: Option<Arc<dyn ActionClient>>,
}

impl std::fmt::Debug for ActionInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionInvoker")
            .field("has_client", &self.client.is_some())
            .finish()
    }
}

impl ActionInvoker {
    /// Invoker backed by `client`.
    pub fn new(client: Arc<dyn ActionClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Invoker with no client; every invocation with a target fails with
    /// [`ActionError::NoClient`].
    pub fn disconnected() -> Self {
        Self { client: None }
    }

    /// Whether a client is attached and reports itself connected.
    pub fn has_client(&self) -> bool {
        self.client.as_ref().is_some_and(|c| c.is_connected())
    }

    /// Resolves `target` and runs the action.
    ///
    /// # Errors
    ///
    /// - [`ActionError::NoActionSpecified`] when `target` is `None`
    /// - [`ActionError::NoClient`] when no connected client is available
    /// - [`ActionError::NotFound`] when a name does not match any action
    /// - [`ActionError::Failed`] for anything the client reports
    pub async fn invoke(&self, target: Option<&ActionTarget>) -> Result<ActionOutcome, ActionError> {
        let target = target.ok_or(ActionError::NoActionSpecified)?;
        let client = match &self.client {
            Some(client) if client.is_connected() => client,
            _ => return Err(ActionError::NoClient),
        };

        let action_id = match target {
            ActionTarget::Id(id) => id.clone(),
            ActionTarget::Name(name) => {
                let listing = client
                    .get_actions()
                    .await
                    .map_err(|err| ActionError::Failed(format!("{err:#}")))?;
                let entry = find_action(&listing, name)
                    .ok_or_else(|| ActionError::NotFound(name.clone()))?;
                resolve_action_id(entry).ok_or_else(|| {
                    ActionError::Failed(format!("action {name:?} has no identifier"))
                })?
            }
        };

        let response = client
            .do_action(&action_id)
            .await
            .map_err(|err| ActionError::Failed(format!("{err:#}")))?;
        Ok(ActionOutcome {
            action_id,
            response,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every call and answers from a fixed listing.
    #[derive(Default)]
    pub(crate) struct RecordingClient {
        pub listing: Value,
        pub fail_actions: bool,
        pub disconnected: bool,
        pub invoked: Mutex<Vec<String>>,
    }

    impl RecordingClient {
        pub fn with_listing(listing: Value) -> Self {
            Self {
                listing,
                ..Self::default()
            }
        }

        pub fn invoked(&self) -> Vec<String> {
            self.invoked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ActionClient for RecordingClient {
        async fn do_action(&self, id: &str) -> anyhow::Result<Value> {
            self.invoked.lock().unwrap().push(id.to_string());
            if self.fail_actions {
                anyhow::bail!("server said no");
            }
            Ok(json!({ "status": "ok" }))
        }

        async fn get_actions(&self) -> anyhow::Result<Value> {
            Ok(self.listing.clone())
        }

        fn is_connected(&self) -> bool {
            !self.disconnected
        }
    }

    fn invoker(client: RecordingClient) -> (ActionInvoker, Arc<RecordingClient>) {
        let client = Arc::new(client);
        (ActionInvoker::new(client.clone()), client)
    }

    #[test]
    fn test_target_from_parts() {
        assert_eq!(
            ActionTarget::from_parts(Some("abc"), Some("Scene")),
            Some(ActionTarget::Id("abc".into()))
        );
        assert_eq!(
            ActionTarget::from_parts(Some("  "), Some("Scene")),
            Some(ActionTarget::Name("Scene".into()))
        );
        assert_eq!(ActionTarget::from_parts(None, Some("")), None);
        assert_eq!(ActionTarget::from_parts(None, None), None);
    }

    #[test]
    fn test_resolve_id_priority() {
        assert_eq!(
            resolve_action_id(&json!({ "id": "a", "actionId": "b" })),
            Some("a".into())
        );
        assert_eq!(
            resolve_action_id(&json!({ "guid": "g", "_id": "u" })),
            Some("g".into())
        );
        assert_eq!(resolve_action_id(&json!({ "id": "", "_id": 7 })), Some("7".into()));
        assert_eq!(resolve_action_id(&json!({ "name": "x" })), None);
    }

    #[test]
    fn test_entries_accept_both_shapes() {
        let wrapped = json!({ "actions": [{ "name": "A" }], "count": 1 });
        let bare = json!([{ "name": "A" }, "B"]);
        assert_eq!(action_entries(&wrapped).len(), 1);
        assert_eq!(action_entries(&bare).len(), 2);
        assert!(action_entries(&json!({ "status": "ok" })).is_empty());
        assert_eq!(action_name(&json!("B")), Some("B"));
    }

    #[tokio::test]
    async fn test_no_target_is_no_action_specified() {
        let (invoker, client) = invoker(RecordingClient::default());
        assert_eq!(invoker.invoke(None).await, Err(ActionError::NoActionSpecified));
        assert!(client.invoked().is_empty());

        let none = ActionInvoker::disconnected();
        assert_eq!(none.invoke(None).await, Err(ActionError::NoActionSpecified));
    }

    #[tokio::test]
    async fn test_no_client() {
        let target = ActionTarget::Id("x".into());
        let invoker = ActionInvoker::disconnected();
        assert!(!invoker.has_client());
        assert_eq!(invoker.invoke(Some(&target)).await, Err(ActionError::NoClient));
    }

    #[tokio::test]
    async fn test_disconnected_client_is_no_client() {
        let (invoker, client) = invoker(RecordingClient {
            disconnected: true,
            ..RecordingClient::default()
        });
        let target = ActionTarget::Id("x".into());
        assert_eq!(invoker.invoke(Some(&target)).await, Err(ActionError::NoClient));
        assert!(client.invoked().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_by_id() {
        let (invoker, client) = invoker(RecordingClient::default());
        let outcome = invoker
            .invoke(Some(&ActionTarget::Id("abc".into())))
            .await
            .unwrap();
        assert_eq!(outcome.action_id, "abc");
        assert_eq!(client.invoked(), vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn test_name_lookup_is_case_insensitive() {
        let (invoker, client) = invoker(RecordingClient::with_listing(json!({
            "actions": [
                { "name": "Scene1", "id": "zzz" },
                { "name": "Scene2", "id": "abc" },
            ]
        })));
        let outcome = invoker
            .invoke(Some(&ActionTarget::Name("scene2".into())))
            .await
            .unwrap();
        assert_eq!(outcome.action_id, "abc");
        assert_eq!(client.invoked(), vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn test_name_not_found() {
        let (invoker, client) = invoker(RecordingClient::with_listing(json!([
            { "name": "Scene1", "id": "zzz" }
        ])));
        assert_eq!(
            invoker.invoke(Some(&ActionTarget::Name("Scene3".into()))).await,
            Err(ActionError::NotFound("Scene3".into()))
        );
        assert!(client.invoked().is_empty());
    }

    #[tokio::test]
    async fn test_match_without_identifier_fails() {
        let (invoker, _client) = invoker(RecordingClient::with_listing(json!(["Scene1"])));
        let result = invoker.invoke(Some(&ActionTarget::Name("scene1".into()))).await;
        assert!(matches!(result, Err(ActionError::Failed(_))));
    }

    #[tokio::test]
    async fn test_client_failure_is_caught() {
        let (invoker, client) = invoker(RecordingClient {
            fail_actions: true,
            ..RecordingClient::default()
        });
        let result = invoker.invoke(Some(&ActionTarget::Id("abc".into()))).await;
        assert_eq!(result, Err(ActionError::Failed("server said no".into())));
        assert_eq!(client.invoked().len(), 1);
    }
}
