//! Hook chains and the explicit super-call bridge
//!
//! Chains are resolved once at instantiation, base to derived. Invoking link
//! `i` never invokes link `i - 1` implicitly; the hook body must call its
//! [`SuperRef`] for the base link to fire at all.

use std::sync::Arc;

use crate::component::class::{ClassChain, ComponentOptions};
use crate::component::instance::Instance;
use crate::core::phase::{Phase, PhaseMap};

/// A user-supplied lifecycle hook.
///
/// Hooks receive the live instance and a bound reference to the next-less-
/// derived hook in their chain. User errors travel as `anyhow::Error`; the
/// engine wraps them into [`crate::LifecycleError`] at the phase boundary.
pub type Hook =
    Arc<dyn Fn(&mut Instance, &SuperRef<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Explicit handle to the next-less-derived hook in a chain.
///
/// Captured at invocation time so that calling the base hook is an auditable
/// action rather than implicit inheritance traversal.
pub struct SuperRef<'a> {
    chain: &'a [Hook],
    index: usize,
}

impl SuperRef<'_> {
    /// Invoke the base-class counterpart of the current hook, synchronously.
    ///
    /// Control returns only after the base link (and anything it calls in
    /// turn) has completed. Calling this with no base link is a no-op, not an
    /// error.
    pub fn call(&self, instance: &mut Instance) -> anyhow::Result<()> {
        if self.index == 0 {
            return Ok(());
        }
        invoke_link(self.chain, self.index - 1, instance)
    }

    /// Whether a base link exists for the current hook.
    pub fn exists(&self) -> bool {
        self.index > 0
    }
}

fn invoke_link(chain: &[Hook], index: usize, instance: &mut Instance) -> anyhow::Result<()> {
    let hook = Arc::clone(&chain[index]);
    let sup = SuperRef { chain, index };
    hook(instance, &sup)
}

/// Invoke the most-derived link of `chain` on `instance`.
///
/// An empty chain is a no-op.
pub(crate) fn invoke_chain(chain: &[Hook], instance: &mut Instance) -> anyhow::Result<()> {
    if chain.is_empty() {
        return Ok(());
    }
    invoke_link(chain, chain.len() - 1, instance)
}

/// Per-instance storage of the effective hook chain for each phase.
///
/// The instance-level options bag contributes the most-derived link for every
/// phase except CONSTRUCT, which is resolved from class links only.
#[derive(Clone, Default)]
pub struct HookRegistry {
    chains: PhaseMap<Vec<Hook>>,
}

impl HookRegistry {
    /// Resolve the hook chains for one instance. Pure; happens once, at
    /// instantiation.
    pub fn resolve(chain: &ClassChain, options: &ComponentOptions) -> Self {
        let mut chains: PhaseMap<Vec<Hook>> = PhaseMap::default();
        for class in chain.links() {
            for phase in Phase::ALL {
                if let Some(hook) = &class.options().hooks[phase] {
                    chains[phase].push(Arc::clone(hook));
                }
            }
        }
        for phase in Phase::ALL {
            // CONSTRUCT belongs to class definitions; a terminal options bag
            // never contributes a link for it.
            if phase == Phase::Construct {
                continue;
            }
            if let Some(hook) = &options.hooks[phase] {
                chains[phase].push(Arc::clone(hook));
            }
        }
        Self { chains }
    }

    /// The resolved chain for `phase`, base to derived.
    pub fn chain(&self, phase: Phase) -> &[Hook] {
        &self.chains[phase]
    }

    /// Whether any link exists for `phase`.
    pub fn has(&self, phase: Phase) -> bool {
        !self.chains[phase].is_empty()
    }
}
