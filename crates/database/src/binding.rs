//! Parameter-resolver bindings.
//!
//! A view layer usually derives query parameters from some context (props,
//! route state). `QueryBinding` keeps one live subscription in step with that
//! context: the resolver maps a context to `Params`, and the subscription is
//! rebound only when the resolved parameters actually differ.

use rivulet_query::{ExecError, Params, QueryDescriptor};
use rivulet_reactive::{SubscriptionHandle, SubscriptionManager};
use std::sync::Arc;

type Resolver<C> = Box<dyn Fn(&C) -> Params + Send + Sync>;

/// A select bound to a context through a resolver function.
pub struct QueryBinding<C> {
    manager: Arc<SubscriptionManager>,
    descriptor: Arc<QueryDescriptor>,
    resolver: Resolver<C>,
    handle: Option<SubscriptionHandle>,
}

impl<C> QueryBinding<C> {
    pub(crate) fn new<F>(
        manager: Arc<SubscriptionManager>,
        descriptor: Arc<QueryDescriptor>,
        resolver: F,
    ) -> Self
    where
        F: Fn(&C) -> Params + Send + Sync + 'static,
    {
        Self {
            manager,
            descriptor,
            resolver: Box::new(resolver),
            handle: None,
        }
    }

    /// Subscribes with parameters resolved from `ctx`, replacing any earlier subscription.
    pub fn attach(&mut self, ctx: &C) -> Result<&SubscriptionHandle, ExecError> {
        let params = (self.resolver)(ctx);
        let handle = self.manager.subscribe(self.descriptor.clone(), params)?;
        Ok(self.handle.insert(handle))
    }

    /// Re-resolves parameters from `ctx`.
    ///
    /// Returns true if the subscription was (re)created or rebound. Attaches
    /// first if not attached yet.
    pub fn update(&mut self, ctx: &C) -> Result<bool, ExecError> {
        if let Some(handle) = &self.handle {
            let params = (self.resolver)(ctx);
            if params == handle.params() {
                return Ok(false);
            }
            handle.rebind(params)?;
            return Ok(true);
        }
        self.attach(ctx)?;
        Ok(true)
    }

    /// Returns the live subscription, if attached.
    pub fn handle(&self) -> Option<&SubscriptionHandle> {
        self.handle.as_ref()
    }

    pub fn descriptor(&self) -> &Arc<QueryDescriptor> {
        &self.descriptor
    }

    /// Drops the subscription.
    pub fn detach(&mut self) {
        self.handle = None;
    }
}
