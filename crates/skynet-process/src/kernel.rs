//! The runtime's single shared state: the handle registry, the global
//! ready-queue, and every collaborator trait object the core depends on.
//!
//! A [`Kernel`] is always held behind an `Arc`; contexts hold a `Weak`
//! back-reference to it so the `Kernel -> Context -> Kernel` cycle never
//! keeps either side alive past its natural lifetime.

use std::sync::Arc;

use anyhow::Context as _;
use skynet_handle::HandleMap;

use crate::collaborators::{
    Clock, EnvMap, ErrorSink, GroupRegistry, Harbor, MessageSink, Multicast, ModuleLoader,
};
use crate::context::Context;
use crate::mailbox::Mailbox;
use crate::message::Message;
use crate::queue::GlobalQueue;
use crate::Handle;

pub struct Kernel {
    handles: HandleMap<Arc<Context>>,
    ready: GlobalQueue,
    module_loader: Arc<dyn ModuleLoader>,
    timer: Arc<dyn crate::collaborators::Timer>,
    harbor: Arc<dyn Harbor>,
    multicast: Arc<dyn Multicast>,
    groups: Arc<dyn GroupRegistry>,
    env: Arc<dyn EnvMap>,
    errors: Arc<dyn ErrorSink>,
    clock: Arc<dyn Clock>,
    start_time: u64,
}

impl Kernel {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        local_harbor: u8,
        module_loader: Arc<dyn ModuleLoader>,
        timer: Arc<dyn crate::collaborators::Timer>,
        harbor: Arc<dyn Harbor>,
        multicast: Arc<dyn Multicast>,
        groups: Arc<dyn GroupRegistry>,
        env: Arc<dyn EnvMap>,
        errors: Arc<dyn ErrorSink>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let start_time = clock.now_seconds();
        Arc::new(Self {
            handles: HandleMap::new(local_harbor),
            ready: GlobalQueue::new(),
            module_loader,
            timer,
            harbor,
            multicast,
            groups,
            env,
            errors,
            clock,
            start_time,
        })
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn local_harbor(&self) -> u8 {
        self.handles.local_harbor()
    }

    pub fn grab(&self, handle: Handle) -> Option<Arc<Context>> {
        self.handles.grab(handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.handles.contains(handle)
    }

    /// Retires `handle` and drains (discards, with a log line) any
    /// messages still sitting in its mailbox.
    pub fn retire(&self, handle: Handle) -> Option<Arc<Context>> {
        let ctx = self.handles.retire(handle)?;
        let dropped = ctx.mailbox().drain();
        if dropped > 0 {
            self.errors.log(
                Some(handle),
                &format!("context retired with {dropped} undelivered message(s)"),
            );
        }
        Some(ctx)
    }

    pub fn bind_name(&self, name: String, handle: Handle) -> bool {
        self.handles.bind_name(name, handle)
    }

    pub fn find_name(&self, name: &str) -> Option<Handle> {
        self.handles.find_name(name)
    }

    pub fn is_remote(&self, handle: Handle) -> bool {
        self.handles.is_remote(handle)
    }

    pub fn ready_queue(&self) -> &GlobalQueue {
        &self.ready
    }

    pub fn module_loader(&self) -> &Arc<dyn ModuleLoader> {
        &self.module_loader
    }

    pub fn timer(&self) -> &Arc<dyn crate::collaborators::Timer> {
        &self.timer
    }

    pub fn harbor(&self) -> &Arc<dyn Harbor> {
        &self.harbor
    }

    pub fn multicast(&self) -> &Arc<dyn Multicast> {
        &self.multicast
    }

    pub fn groups(&self) -> &Arc<dyn GroupRegistry> {
        &self.groups
    }

    pub fn env(&self) -> &Arc<dyn EnvMap> {
        &self.env
    }

    pub fn errors(&self) -> &Arc<dyn ErrorSink> {
        &self.errors
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Loads `module_name`, creates an instance, registers a context for
    /// it, and runs the instance's `init`. On failure the freshly
    /// allocated handle is retired again so it never leaks as a
    /// zombie entry in the registry.
    pub fn context_new(
        self: &Arc<Self>,
        module_name: &str,
        args: &str,
    ) -> anyhow::Result<Arc<Context>> {
        let module = self
            .module_loader
            .query(module_name)
            .ok_or_else(|| anyhow::anyhow!("unknown module: {module_name}"))?;
        let instance = module
            .create()
            .with_context(|| format!("failed to create instance of module {module_name}"))?;

        let kernel_weak = Arc::downgrade(self);
        let handle = self.handles.register_with(|handle| {
            Arc::new(Context::new(
                handle,
                kernel_weak.clone(),
                Arc::new(Mailbox::new(handle)),
            ))
        });
        let ctx = self.handles.grab(handle).expect("just registered above");

        if let Err(err) = instance.init(&ctx, args) {
            self.handles.retire(handle);
            self.errors.log(
                None,
                &format!("launch failed for module {module_name}: {err:#}"),
            );
            return Err(err);
        }
        ctx.mark_initialized();
        // Force the mailbox onto the ready-queue even if init sent nothing,
        // so a bootstrap self-message queued during init is dispatched.
        ctx.mailbox().force_ready();
        self.ready.push(ctx.mailbox().clone());
        Ok(ctx)
    }
}

impl MessageSink for Kernel {
    fn push(&self, handle: Handle, message: Message) -> bool {
        match self.handles.grab(handle) {
            Some(ctx) => {
                let mailbox = ctx.mailbox().clone();
                if mailbox.push(message) {
                    self.ready.push(mailbox);
                }
                true
            }
            None => false,
        }
    }
}
