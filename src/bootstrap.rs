//! Wires every collaborator crate into a [`Kernel`] and, if configured,
//! launches the bootstrap service.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use skynet_process::Kernel;

use crate::config::Config;

struct WallClock;

impl skynet_process::Clock for WallClock {
    fn now_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

pub fn build_kernel(config: &Config) -> Arc<Kernel> {
    let modules = Arc::new(skynet_module::Registry::with_builtins());
    let timer = skynet_timer::TimerWheel::start();
    let harbor = Arc::new(skynet_harbor::LocalHarbor::new());
    let multicast = Arc::new(skynet_multicast::MulticastHub::new());
    let groups = Arc::new(skynet_group::GroupMap::new());
    let env = Arc::new(skynet_env::EnvTable::with_entries(config.env.clone()));
    let errors = Arc::new(skynet_error::LogErrorSink::new());

    Kernel::new(
        config.harbor,
        modules,
        timer,
        harbor,
        multicast,
        groups,
        env,
        errors,
        Arc::new(WallClock),
    )
}

/// Launches `config.bootstrap` ("module args...") if one was configured.
pub fn launch_bootstrap(kernel: &Arc<Kernel>, config: &Config) -> anyhow::Result<()> {
    let Some(spec) = &config.bootstrap else {
        return Ok(());
    };
    let mut parts = spec.splitn(2, ' ');
    let module = parts.next().unwrap_or_default();
    let args = parts.next().unwrap_or_default();

    kernel
        .context_new(module, args)
        .with_context(|| format!("failed to launch bootstrap service '{module}'"))?;
    log::info!("launched bootstrap service '{module}'");
    Ok(())
}
