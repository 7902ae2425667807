//! The audited-mutation gateway.
//!
//! Every operation runs the same shape: authorize, bind, open an audit
//! session, call the store once, close the session, classify. Nothing in
//! here knows which resource kind it is serving.

use std::marker::PhantomData;
use std::sync::Arc;

use provctl_core::authz::Authorizer;
use provctl_core::error::{ProvError, ProvResult};
use provctl_core::models::audit::{AuditEvent, CreateAuditEvent, Owner, Target};
use provctl_core::models::permission::{Action, Capability};
use provctl_core::models::resource::{Resource, ResourceKind};
use provctl_core::models::token::Token;
use provctl_core::repository::{
    AuditEventFilter, AuditEventRepository, Pagination, ResourceStore,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::audit::Auditor;
use crate::classify::Reply;
use crate::form::FormInput;

fn authorize<A: Authorizer>(authz: &A, token: &Token, capability: Capability) -> ProvResult<()> {
    if authz.check(token, &capability.scheme()) {
        Ok(())
    } else {
        debug!(subject = %token.subject, capability = %capability, "Permission denied");
        Err(ProvError::Unauthorized)
    }
}

/// Create-or-update, list and delete for one resource kind.
pub struct ResourceGateway<R, S, E, A> {
    store: Arc<S>,
    auditor: Auditor<E>,
    authz: A,
    _kind: PhantomData<fn() -> R>,
}

impl<R, S, E, A> ResourceGateway<R, S, E, A>
where
    R: Resource,
    S: ResourceStore<R> + 'static,
    E: AuditEventRepository + 'static,
    A: Authorizer,
{
    pub fn new(store: Arc<S>, events: Arc<E>, authz: A) -> Self {
        Self {
            store,
            auditor: Auditor::new(events),
            authz,
            _kind: PhantomData,
        }
    }

    fn audit_input(
        &self,
        token: &Token,
        name: &str,
        action: Action,
        input: &FormInput,
    ) -> CreateAuditEvent {
        CreateAuditEvent {
            target: Target {
                kind: R::KIND,
                value: name.to_string(),
            },
            kind: Capability::new(R::KIND, action).scheme(),
            owner: Owner::from(token),
            custom_data: input.custom_data(),
            allowed: Capability::new(R::KIND, Action::ReadEvents).scheme(),
        }
    }

    /// Bind a urlencoded `body` into a descriptor and save it, replacing
    /// any descriptor with the same name.
    pub async fn create_or_update(&self, token: &Token, body: &[u8]) -> Reply<()> {
        if let Err(e) = authorize(&self.authz, token, Capability::new(R::KIND, Action::Update)) {
            return Reply::failed(e);
        }
        let bound = FormInput::parse(body)
            .map_err(ProvError::from)
            .and_then(|input| input.bind::<R>().map(|resource| (input, resource)));
        let (input, resource) = match bound {
            Ok(bound) => bound,
            Err(e) => return Reply::failed(e),
        };

        let name = resource.name().to_string();
        let event = self.audit_input(token, &name, Action::Update, &input);
        let store = Arc::clone(&self.store);
        let result = self
            .auditor
            .audited(event, async move { store.save(resource).await })
            .await;

        if let Err(e) = &result {
            warn!(kind = %R::KIND, name = %name, error = %e, "Save failed");
        }
        result.into()
    }

    pub async fn list(&self, token: &Token) -> Reply<Vec<R>> {
        if let Err(e) = authorize(&self.authz, token, Capability::new(R::KIND, Action::Read)) {
            return Reply::failed(e);
        }
        let result = self.store.list_all().await;
        if let Err(e) = &result {
            warn!(kind = %R::KIND, error = %e, "List failed");
        }
        Reply::collection(result)
    }

    /// Delete the descriptor called `name`. The urlencoded `query` is
    /// recorded as the event's input snapshot.
    pub async fn delete(&self, token: &Token, name: &str, query: &[u8]) -> Reply<()> {
        if let Err(e) = authorize(&self.authz, token, Capability::new(R::KIND, Action::Delete)) {
            return Reply::failed(e);
        }
        // The query is only an input snapshot; an undecodable one is
        // recorded as empty.
        let query = FormInput::parse(query).unwrap_or_else(|e| {
            debug!(kind = %R::KIND, name = %name, error = %e, "Delete query not recorded");
            FormInput::default()
        });

        let event = self.audit_input(token, name, Action::Delete, &query);
        let store = Arc::clone(&self.store);
        let target = name.to_string();
        let result = self
            .auditor
            .audited(event, async move { store.delete(&target).await })
            .await;

        match &result {
            Err(ProvError::NotFound { .. }) => {
                debug!(kind = %R::KIND, name = %name, "Delete of missing descriptor")
            }
            Err(e) => warn!(kind = %R::KIND, name = %name, error = %e, "Delete failed"),
            Ok(()) => {}
        }
        result.into()
    }
}

/// Filter accepted by [`EventGateway::list`], bound from a query string.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventQuery {
    pub target_kind: Option<String>,
    pub target_name: Option<String>,
    pub kind: Option<String>,
    pub running: Option<bool>,
    pub offset: u64,
    pub limit: u64,
}

impl Default for EventQuery {
    fn default() -> Self {
        let page = Pagination::default();
        Self {
            target_kind: None,
            target_name: None,
            kind: None,
            running: None,
            offset: page.offset,
            limit: page.limit,
        }
    }
}

impl EventQuery {
    fn into_parts(self) -> ProvResult<(AuditEventFilter, Pagination)> {
        let target_kind = self
            .target_kind
            .map(|kind| {
                ResourceKind::parse(&kind).ok_or_else(|| {
                    ProvError::InvalidInput(format!("unknown resource kind: {kind}"))
                })
            })
            .transpose()?;
        Ok((
            AuditEventFilter {
                target_kind,
                target_value: self.target_name,
                kind: self.kind,
                running: self.running,
            },
            Pagination {
                offset: self.offset,
                limit: self.limit,
            },
        ))
    }
}

/// Read access to the audit trail. Each event is visible only to callers
/// holding its `allowed` scheme.
pub struct EventGateway<E, A> {
    events: Arc<E>,
    authz: A,
}

impl<E: AuditEventRepository, A: Authorizer> EventGateway<E, A> {
    pub fn new(events: Arc<E>, authz: A) -> Self {
        Self { events, authz }
    }

    /// Events matching the urlencoded `query`, newest first.
    pub async fn list(&self, token: &Token, query: &[u8]) -> Reply<Vec<AuditEvent>> {
        let parts = FormInput::parse(query)
            .and_then(|input| input.deserialize::<EventQuery>())
            .map_err(ProvError::from)
            .and_then(EventQuery::into_parts);
        let (filter, pagination) = match parts {
            Ok(parts) => parts,
            Err(e) => return Reply::failed(e),
        };

        let result = self.events.list(filter, pagination).await.map(|page| {
            page.items
                .into_iter()
                .filter(|event| self.authz.check(token, &event.allowed))
                .collect::<Vec<_>>()
        });
        if let Err(e) = &result {
            warn!(error = %e, "Event listing failed");
        }
        Reply::collection(result)
    }
}
