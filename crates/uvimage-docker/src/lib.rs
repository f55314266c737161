pub mod client;
pub mod docker;
pub mod executor;

pub use client::{BuildRequest, CheckResult, DockerClient, DoctorReport};
pub use docker::DockerError;
pub use executor::{CommandOutput, DEFAULT_PROGRAM, DockerExecutor, RealExecutor};
