//! GPU queries: timers, occlusion and primitive counters.

use std::time::Duration;

use super::driver::{Driver, QueryHandle, QueryTarget};
use crate::error::GlError;

/// A one-shot query object.
#[derive(Debug)]
pub struct Query {
    handle: QueryHandle,
    target: QueryTarget,
}

impl Query {
    /// Create a query for `target`.
    ///
    /// # Errors
    ///
    /// [`GlError::ResourceCreation`] if the driver cannot create the object.
    pub fn new(gl: &dyn Driver, target: QueryTarget) -> Result<Self, GlError> {
        let handle = gl.create_query().map_err(GlError::ResourceCreation)?;
        Ok(Self { handle, target })
    }

    /// Create a query for `target` and run `f` inside it. Returns the
    /// closure's value and the query result.
    ///
    /// # Errors
    ///
    /// [`GlError::ResourceCreation`] if the query cannot be created.
    pub fn measure<R>(
        gl: &dyn Driver,
        target: QueryTarget,
        f: impl FnOnce() -> R,
    ) -> Result<(R, u64), GlError> {
        Ok(Self::new(gl, target)?.run(gl, f))
    }

    /// Run `f` between begin and end of the query, then block until the
    /// result is available. The query object is deleted afterwards.
    ///
    /// The wait is a busy poll without timeout.
    pub fn run<R>(self, gl: &dyn Driver, f: impl FnOnce() -> R) -> (R, u64) {
        gl.begin_query(self.target, self.handle);
        let result = f();
        gl.end_query(self.target);

        while !gl.query_result_available(self.handle) {
            std::hint::spin_loop();
        }
        let value = gl.query_result(self.handle);
        gl.delete_query(self.handle);
        (result, value)
    }

    /// Driver handle.
    #[must_use]
    pub const fn handle(&self) -> QueryHandle {
        self.handle
    }
}

/// GPU time spent on the commands issued by `f`.
///
/// # Errors
///
/// [`GlError::ResourceCreation`] if the query cannot be created.
pub fn gpu_time<R>(
    gl: &dyn Driver,
    f: impl FnOnce() -> R,
) -> Result<(R, Duration), GlError> {
    let (result, nanos) = Query::measure(gl, QueryTarget::TimeElapsed, f)?;
    Ok((result, Duration::from_nanos(nanos)))
}
