mod executor;
mod redirect;
mod restricted;
#[cfg(unix)]
mod posix;
pub mod builtin;

pub use executor::{ExecError, ExecStatus, Executor, JobControl};
pub use restricted::RestrictedJobControl;
#[cfg(unix)]
pub use posix::PosixJobControl;

/// The back end for the current platform.
#[cfg(unix)]
pub fn platform_job_control() -> Box<dyn JobControl> {
    Box::new(PosixJobControl::new())
}

#[cfg(not(unix))]
pub fn platform_job_control() -> Box<dyn JobControl> {
    Box::new(RestrictedJobControl::new())
}
