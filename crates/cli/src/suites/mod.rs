//! Built-in scenario suites
//!
//! These encode the black-box acceptance tests for the volume plugin: they
//! shell out to `docker`, `rbd`, `mount` and friends on the host under test
//! and assert on their textual output. They are registered by the CLI and
//! are not exercised by the crate's own unit tests.

pub mod ceph;
pub mod docker;
pub mod nfs;

use voltest_core::prelude::*;

/// Image used for throwaway client containers
pub const CLIENT_IMAGE: &str = "debian:latest";

/// Build `docker run -t [args...] <image> <cmd...>`
pub fn docker_run<I, S>(args: I, cmd: &[&str]) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut command = Command::new("docker");
    command.arg("run").arg("-t");
    command.args(args);
    command.arg(CLIENT_IMAGE);
    command.args(cmd);
    command
}

/// Spec for a container the volume plugin creates implicitly on first use:
/// nothing to create up front, but the backing image must be removed
pub fn implicit_rbd_volume(image: &str) -> ResourceSpec {
    ResourceSpec::new(
        ResourceKind::BlockImage,
        image,
        Command::builder("rbd").arg("rm").arg(image).build(),
    )
}

/// Spec for an RBD image created up front with `rbd create`
pub fn rbd_image(image: &str, size: &str) -> ResourceSpec {
    implicit_rbd_volume(image).create_with(
        Command::builder("rbd")
            .arg("create")
            .arg(format!("--size={size}"))
            .arg(image)
            .build(),
    )
}

/// Spec for mapping an RBD image to a host device node
///
/// The identity is the device path printed by `rbd map`.
pub fn rbd_mapping(image: &str) -> ResourceSpec {
    ResourceSpec::new(
        ResourceKind::MappedDevice,
        image,
        Command::builder("rbd").arg("unmap").arg(image).build(),
    )
    .create_with(Command::builder("rbd").arg("map").arg(image).build())
    .identity_from_output()
}

/// Spec for a detached server container removed with `docker rm -f`
pub fn server_container(name: &str, run_args: &[String]) -> ResourceSpec {
    let mut create = Command::new("docker");
    create
        .arg("run")
        .arg("-d")
        .arg(format!("--name={name}"))
        .args(run_args);
    ResourceSpec::new(ResourceKind::Container, name, {
        Command::builder("docker").arg("rm").arg("-f").arg(name).build()
    })
    .create_with(create)
}
