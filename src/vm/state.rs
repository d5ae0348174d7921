//! VM state tracking
//!
//! Both markers are RAII guards: the previous state comes back when the
//! guard drops, including when a callback unwinds.

use crate::context::Context;

/// What the engine is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VmState {
    /// Collecting garbage
    Gc,
    /// Running embedder native code
    External,
    /// Engine-internal work outside the other states
    #[default]
    Other,
}

/// Sets the context's VM state for the guard's lifetime
pub struct VmStateScope<'c> {
    context: &'c Context,
    previous: VmState,
}

impl<'c> VmStateScope<'c> {
    pub fn new(context: &'c Context, state: VmState) -> Self {
        let previous = context.vm_state_cell().replace(state);
        VmStateScope { context, previous }
    }

    /// State that will be restored on drop
    pub fn previous(&self) -> VmState {
        self.previous
    }
}

impl Drop for VmStateScope<'_> {
    fn drop(&mut self) {
        self.context.vm_state_cell().set(self.previous);
    }
}

/// Records the address of the native callback being run
///
/// Scopes nest: the innermost callback's address is visible until its
/// scope ends, then the enclosing one's is again.
pub struct ExternalCallbackScope<'c> {
    context: &'c Context,
    previous: Option<usize>,
}

impl<'c> ExternalCallbackScope<'c> {
    pub fn new(context: &'c Context, callback: usize) -> Self {
        let previous = context.external_callback_cell().replace(Some(callback));
        ExternalCallbackScope { context, previous }
    }
}

impl Drop for ExternalCallbackScope<'_> {
    fn drop(&mut self) {
        self.context.external_callback_cell().set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_state_scopes_nest() {
        let ctx = Context::new(8 * 1024);
        assert_eq!(ctx.vm_state(), VmState::Other);
        {
            let gc = VmStateScope::new(&ctx, VmState::Gc);
            assert_eq!(gc.previous(), VmState::Other);
            {
                let _ext = VmStateScope::new(&ctx, VmState::External);
                assert_eq!(ctx.vm_state(), VmState::External);
            }
            assert_eq!(ctx.vm_state(), VmState::Gc);
        }
        assert_eq!(ctx.vm_state(), VmState::Other);
    }

    #[test]
    fn test_external_callback_scope_restores_outer_address() {
        let ctx = Context::new(8 * 1024);
        assert_eq!(ctx.external_callback(), None);
        {
            let _outer = ExternalCallbackScope::new(&ctx, 0x1000);
            {
                let _inner = ExternalCallbackScope::new(&ctx, 0x2000);
                assert_eq!(ctx.external_callback(), Some(0x2000));
            }
            assert_eq!(ctx.external_callback(), Some(0x1000));
        }
        assert_eq!(ctx.external_callback(), None);
    }

    #[test]
    fn test_state_restored_on_unwind() {
        let ctx = Context::new(8 * 1024);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _state = VmStateScope::new(&ctx, VmState::External);
            let _callback = ExternalCallbackScope::new(&ctx, 0x42);
            panic!("callback failed");
        }));
        assert!(result.is_err());
        assert_eq!(ctx.vm_state(), VmState::Other);
        assert_eq!(ctx.external_callback(), None);
    }
}
