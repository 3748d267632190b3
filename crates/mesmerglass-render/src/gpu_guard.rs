//! GPU context safety guard (§4.5).
//!
//! `wgpu` already serializes all GPU work behind `Device`/`Queue` handles —
//! there is no implicit thread-local GL context to fight the way a literal
//! `make_current`/restore-previous-context dance would. The invariant §4.5
//! actually cares about is: a validation failure partway through a frame
//! must never reach the presentation call. `GpuGuard` realizes that by
//! binding the surface current up front and only calling `swap_buffers` if
//! the caller's render closure returns `Ok`.

use mesmerglass_core::interfaces::DisplaySurface;

/// Scopes a render pass against one [`DisplaySurface`]: binds it current on
/// construction, and only presents the frame if the render closure given to
/// [`GpuGuard::render`] succeeds.
pub struct GpuGuard<'a, S: DisplaySurface + ?Sized> {
    surface: &'a mut S,
}

impl<'a, S: DisplaySurface + ?Sized> GpuGuard<'a, S> {
    /// Bind `surface` current and open a guarded render scope.
    pub fn enter(surface: &'a mut S) -> Self {
        surface.make_current();
        Self { surface }
    }

    /// Run `f` against the bound surface. `swap_buffers` is called only if
    /// `f` returns `Ok`; an `Err` propagates without presenting, so a
    /// validation failure never leaks a draw call past the guard.
    pub fn render<F, E>(self, f: F) -> Result<(), E>
    where
        F: FnOnce(&mut S) -> Result<(), E>,
    {
        let result = f(self.surface);
        if result.is_ok() {
            self.surface.swap_buffers();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CallLog(Arc<Mutex<Vec<&'static str>>>);

    struct RecordingSurface {
        log: CallLog,
    }

    impl DisplaySurface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            (1920, 1080)
        }
        fn refresh_rate(&self) -> f32 {
            60.0
        }
        fn make_current(&mut self) {
            self.log.0.lock().push("make_current");
        }
        fn swap_buffers(&mut self) {
            self.log.0.lock().push("swap_buffers");
        }
    }

    #[test]
    fn successful_render_calls_make_current_then_swap_buffers() {
        let log = CallLog::default();
        let mut surface = RecordingSurface { log: log.clone() };

        let guard = GpuGuard::enter(&mut surface);
        let result: Result<(), &'static str> = guard.render(|s| {
            log.0.lock().push("draw");
            let _ = s.size();
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(*log.0.lock(), vec!["make_current", "draw", "swap_buffers"]);
    }

    #[test]
    fn failed_render_never_calls_swap_buffers() {
        let log = CallLog::default();
        let mut surface = RecordingSurface { log: log.clone() };

        let guard = GpuGuard::enter(&mut surface);
        let result: Result<(), &'static str> = guard.render(|_s| {
            log.0.lock().push("draw");
            Err("validation failure")
        });

        assert_eq!(result, Err("validation failure"));
        assert_eq!(*log.0.lock(), vec!["make_current", "draw"]);
    }

    #[test]
    fn early_return_via_question_mark_still_never_presents() {
        fn render_with_fallible_step(
            surface: &mut RecordingSurface,
            log: &CallLog,
            should_fail: bool,
        ) -> Result<(), &'static str> {
            let guard = GpuGuard::enter(surface);
            guard.render(|_s| {
                if should_fail {
                    return Err("bad uniform");
                }
                log.0.lock().push("draw");
                Ok(())
            })
        }

        let log = CallLog::default();
        let mut surface = RecordingSurface { log: log.clone() };
        let result = render_with_fallible_step(&mut surface, &log, true);

        assert!(result.is_err());
        assert_eq!(*log.0.lock(), vec!["make_current"]);
    }
}
