use std::sync::Arc;

use crate::resolver::Resolver;
use crate::upstream::SearchBackend;

/// Shared handler state: one resolver for the process lifetime.
///
/// The resolver is read-only after startup; each request draws its own budget
/// and trace from it, so cloning the state per connection is cheap.
pub struct HandlerState<B: SearchBackend + 'static> {
    pub resolver: Arc<Resolver<B>>,
}

// Manual impl: `B` itself need not be `Clone` behind the `Arc`.
impl<B: SearchBackend + 'static> Clone for HandlerState<B> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
        }
    }
}

impl<B: SearchBackend + 'static> HandlerState<B> {
    pub fn new(resolver: Arc<Resolver<B>>) -> Self {
        Self { resolver }
    }
}
