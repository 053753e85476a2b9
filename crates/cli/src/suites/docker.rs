//! Routed-network docker scenarios
//!
//! Exercise the routed network driver: static IP assignment, the default
//! route inside the container, container-to-container traffic, and ingress
//! allow-list filtering.

use voltest_core::prelude::*;

use super::{docker_run, server_container};

const NETCAT_IMAGE: &str = "mauri/ubuntu-netcat";

/// Register the docker suite
pub fn register(suite: &mut SuiteRegistry) -> Result<()> {
    suite.register(Scenario::new("docker: plain run", |ctx| {
        Box::pin(async move {
            let out = ctx.run(docker_run::<_, &str>([], &["ls"])).await?;
            assert::contains(&out, "bin")
        })
    }))?;

    suite.register(Scenario::new("docker: routed ip default route", |ctx| {
        Box::pin(async move {
            let out = ctx
                .run(docker_run(
                    ["--net=routed", "--ip-address=10.1.2.3"],
                    &["ip", "route"],
                ))
                .await?;
            assert::contains(&out, "default dev eth0  scope link")
        })
    }))?;

    suite.register(Scenario::new(
        "docker: ip assignment accepts both flag spellings",
        |ctx| {
            Box::pin(async move {
                for flag in ["--ip-address=10.1.2.3", "--ip=10.1.2.3"] {
                    let out = ctx
                        .run(docker_run(
                            ["--net=routed", flag],
                            &["ip", "addr", "show", "dev", "eth0"],
                        ))
                        .await?;
                    assert::contains(&out, "inet 10.1.2.3/32 scope global eth0")?;
                }
                Ok(())
            })
        },
    ))?;

    suite.register(Scenario::new("docker: container communication", |ctx| {
        Box::pin(async move {
            let server = ctx.scoped_name("test-docker-server")?;
            ctx.acquire(server_container(
                &server,
                &[
                    "--net=routed".into(),
                    "--ip=10.1.1.1".into(),
                    NETCAT_IMAGE.into(),
                    "/bin/sh".into(),
                    "-c".into(),
                    "echo foobarzaa |nc -l -q 0 -p 9999".into(),
                ],
            ))
            .await?;

            let out = ctx
                .run(docker_run_netcat("10.1.1.2", "nc 10.1.1.1 9999"))
                .await?;
            assert::contains(&out, "foobarzaa")
        })
    }))?;

    suite.register(Scenario::new("docker: ingress allow-list", |ctx| {
        Box::pin(async move {
            let server = ctx.scoped_name("test-docker-ingress-server")?;
            ctx.acquire(server_container(
                &server,
                &[
                    "--net=routed".into(),
                    "--ip=10.1.1.1".into(),
                    "--label".into(),
                    "io.docker.network.endpoint.ingressAllowed=10.1.1.3".into(),
                    NETCAT_IMAGE.into(),
                    "/bin/sh".into(),
                    "-c".into(),
                    "echo foobarzaa |nc -l -q 0 -p 9999".into(),
                ],
            ))
            .await?;

            // The client outside the allow-list is refused; `|| true` keeps
            // the container exit clean so we can assert on the message.
            let denied = ctx
                .run(docker_run_netcat("10.1.1.2", "nc 10.1.1.1 9999 || true"))
                .await?;
            assert::contains(&denied, "Connection refused")?;

            let allowed = ctx
                .run(docker_run_netcat("10.1.1.3", "nc 10.1.1.1 9999"))
                .await?;
            assert::contains(&allowed, "foobarzaa")
        })
    }))?;

    Ok(())
}

fn docker_run_netcat(ip: &str, script: &str) -> Command {
    Command::builder("docker")
        .arg("run")
        .arg("-t")
        .arg("--net=routed")
        .arg(format!("--ip={ip}"))
        .arg(NETCAT_IMAGE)
        .args(["/bin/sh", "-c", script])
        .build()
}
