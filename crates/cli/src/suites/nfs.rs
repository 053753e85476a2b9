//! NFS-backed volume scenarios
//!
//! An NFS server container on the routed network exports a host directory;
//! clients reach it through the plugin's `host:path:nfs` volume syntax.
//! Addresses are fixed (the export allow-lists depend on them), so this
//! suite does not support parallel scenarios against one host.

use voltest_core::prelude::*;

use super::{docker_run, implicit_rbd_volume, server_container};

const SERVER_IMAGE: &str = "mauri/nfs-server";
const SERVER_IP: &str = "10.1.1.233";
const EXPORT_SPEC: &str = "10.1.1.233:///data";

/// Register the nfs suite
pub fn register(suite: &mut SuiteRegistry) -> Result<()> {
    suite.register(Scenario::new("nfs: volume write visible to export", |ctx| {
        Box::pin(async move {
            start_server(ctx, "10.0.0.0/8").await?;
            let volume = nfs_volume("/foo");
            let out = ctx
                .run(docker_run(
                    ["--net=routed", "--ip=192.168.2.2", volume.as_str()],
                    &["/bin/sh", "-c", "touch /foo/tmp-file-2; ls /foo"],
                ))
                .await?;
            assert::contains(&out, "tmp-file-2")
        })
    }))?;

    suite.register(Scenario::new("nfs: export denies unlisted client", |ctx| {
        Box::pin(async move {
            // Only 10.1.1.232/32 is allowed to mount, but the plugin mounts
            // from the host address, so even a client claiming that IP must
            // be refused.
            start_server(ctx, "10.1.1.232/32").await?;
            let volume = nfs_volume("/foo");
            let out = ctx
                .run_unchecked(docker_run(
                    ["--net=routed", "--ip=10.1.1.232", volume.as_str()],
                    &["/bin/sh", "-c", "ls"],
                ))
                .await?;
            assert::expect_failure(&out)
        })
    }))?;

    suite.register(Scenario::new("nfs: mounted after ceph volume", |ctx| {
        Box::pin(async move {
            let image = ctx.scoped_name("docker-test-volume")?;
            ctx.acquire(implicit_rbd_volume(&image)).await?;
            ctx.run(docker_run(
                [format!("-v{image}:/foo:ceph")],
                &["/bin/bash", "-c", "mkdir -p /foo/dir && echo dog > /foo/dogs"],
            ))
            .await?;
            ctx.run(Command::builder("touch").arg("/tmp/test-docker-file").build())
                .await?;
            start_server(ctx, "10.0.0.0/8").await?;

            let nested = [
                format!("-v{image}:/foo:ceph"),
                nfs_volume("/foo/nfs"),
            ];
            let inner = ctx
                .run(docker_run(nested.clone(), &["ls", "-l", "/foo/nfs"]))
                .await?;
            // The exported host file is visible through the nested mount.
            assert::contains(&inner, "test-docker-file")?;

            let outer = ctx.run(docker_run(nested, &["ls", "-l", "/foo"])).await?;
            // Both the nfs mountpoint and the ceph-backed file are present.
            assert::contains(&outer, "nfs")?;
            assert::contains(&outer, "dogs")
        })
    }))?;

    suite.register(Scenario::new("nfs: ownership preserved", |ctx| {
        Box::pin(async move {
            let uid = "510";
            ctx.run(Command::shell(format!(
                "touch /tmp/test-docker-file && chown {uid} /tmp/test-docker-file"
            )))
            .await?;
            start_server(ctx, "10.0.0.0/8").await?;
            let volume = nfs_volume("/foo");
            let out = ctx
                .run(docker_run(
                    ["--net=routed", "--ip=192.168.2.2", volume.as_str()],
                    &["ls", "-l", "/foo/test-docker-file"],
                ))
                .await?;
            assert::contains(&out, uid)
        })
    }))?;

    suite.register(Scenario::new(
        "nfs: removing client cleans host mount",
        |ctx| {
            Box::pin(async move {
                start_server(ctx, "10.0.0.0/8").await?;
                let client = ctx.scoped_name("test-docker-nfs-client")?;
                let client_id = ctx
                    .acquire(server_container(
                        &client,
                        &[
                            "--net=routed".into(),
                            "--ip=10.1.1.234".into(),
                            nfs_volume("/foo"),
                            "debian".into(),
                            "sleep".into(),
                            "100".into(),
                        ],
                    ))
                    .await?;

                let while_running = ctx.run(Command::new("mount")).await?;
                assert::mounted(&while_running, EXPORT_SPEC)?;

                ctx.release(&client_id).await?;

                // A lingering 10.1.1.233:///data2 entry would not fool this:
                // the source check is full-token equality.
                let after = ctx.run(Command::new("mount")).await?;
                assert::not_mounted(&after, EXPORT_SPEC)
            })
        },
    ))?;

    Ok(())
}

/// Export `/tmp` from a server container allowing `export_to` clients
async fn start_server(ctx: &mut ScenarioContext<'_>, export_to: &str) -> Result<String> {
    let name = ctx.scoped_name("test-docker-nfs-server")?;
    ctx.acquire(server_container(
        &name,
        &[
            "--privileged".into(),
            "--net=routed".into(),
            format!("--ip-address={SERVER_IP}"),
            "-v".into(),
            "/tmp:/data".into(),
            SERVER_IMAGE.into(),
            format!("{export_to}:/data"),
        ],
    ))
    .await
}

/// Volume flag mounting the export at `target` via the nfs plugin
fn nfs_volume(target: &str) -> String {
    format!("-v{SERVER_IP}///data:{target}:nfs,rw")
}
