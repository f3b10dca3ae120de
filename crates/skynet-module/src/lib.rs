//! Resolves a module name to a loadable [`ServiceModule`]. Real
//! deployments register their own service modules into a [`Registry`]
//! the same way [`EchoModule`] registers itself here as the builtin
//! reference implementation the launch/echo scenarios exercise.

use std::sync::Arc;

use dashmap::DashMap;
use skynet_process::{
    context_send, CallbackAction, Context, ModuleLoader, Payload, SendData, ServiceInstance,
    ServiceModule,
};

pub struct Registry {
    modules: DashMap<String, Arc<dyn ServiceModule>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            modules: DashMap::new(),
        }
    }

    pub fn register(&self, name: impl Into<String>, module: Arc<dyn ServiceModule>) {
        self.modules.insert(name.into(), module);
    }

    /// A registry pre-populated with the modules every deployment gets
    /// for free.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("echo", Arc::new(EchoModule) as Arc<dyn ServiceModule>);
        registry
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for Registry {
    fn query(&self, name: &str) -> Option<Arc<dyn ServiceModule>> {
        self.modules.get(name).map(|entry| entry.value().clone())
    }
}

/// Sends every byte payload it receives straight back to its sender on
/// the same session, so a launcher can confirm round-trip delivery
/// without writing a bespoke service for it. On init it also sends
/// itself a greeting, the same way the reference `echo` service in the
/// original does, so a launcher sees a live reply before it has sent
/// echo anything at all.
pub struct EchoModule;

struct EchoInstance;

impl ServiceInstance for EchoInstance {
    fn init(self: Box<Self>, ctx: &Arc<Context>, _args: &str) -> anyhow::Result<()> {
        let handle = ctx.handle();
        ctx.set_callback(Box::new(move |ctx, source, session, payload| {
            let bytes = match payload {
                Payload::Bytes(bytes) => bytes,
                Payload::Multicast(_) => return CallbackAction::Taken,
            };
            log::debug!("echo({handle:08x}) replying {} byte(s) to {source:08x}", bytes.len());
            if let Some(kernel) = ctx.kernel() {
                skynet_process::send(&kernel, handle, source, session, SendData::Owned(bytes));
            }
            CallbackAction::Taken
        }));

        let session = ctx.next_session();
        context_send(ctx, handle, session, SendData::Owned(b"hello".to_vec()));
        Ok(())
    }
}

impl ServiceModule for EchoModule {
    fn create(&self) -> anyhow::Result<Box<dyn ServiceInstance>> {
        Ok(Box::new(EchoInstance))
    }
}
