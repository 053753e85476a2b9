//! Ceph/RBD-backed volume scenarios
//!
//! Every scenario is registered twice: once against the default pool (bare
//! image name) and once against a named pool (`rbd/...` qualified name).
//! Parametrization, not inheritance: the bodies read the base image name
//! from the scenario's parameter bundle.

use voltest_core::prelude::*;

use super::{docker_run, implicit_rbd_volume, rbd_image, rbd_mapping};

const IMAGE_PARAM: &str = "image";

/// Register the ceph suite for both pool variants
pub fn register(suite: &mut SuiteRegistry) -> Result<()> {
    for (variant, base) in [
        ("default pool", "docker-test-volume"),
        ("named pool", "rbd/docker-test-volume"),
    ] {
        let params = ScenarioParams::new().with(IMAGE_PARAM, base);

        suite.register(
            Scenario::new(format!("ceph: volume auto-created ({variant})"), |ctx| {
                Box::pin(auto_created(ctx))
            })
            .with_params(params.clone()),
        )?;
        suite.register(
            Scenario::new(
                format!("ceph: existing image formatted on first use ({variant})"),
                |ctx| Box::pin(formats_existing_image(ctx)),
            )
            .with_params(params.clone()),
        )?;
        suite.register(
            Scenario::new(
                format!("ceph: formatted image not re-initialized ({variant})"),
                |ctx| Box::pin(preserves_existing_filesystem(ctx)),
            )
            .with_params(params.clone()),
        )?;
        suite.register(
            Scenario::new(format!("ceph: auto-resize ({variant})"), |ctx| {
                Box::pin(auto_resize(ctx))
            })
            .with_params(params.clone()),
        )?;
        suite.register(
            Scenario::new(format!("ceph: luks volume ({variant})"), |ctx| {
                Box::pin(luks_volume(ctx))
            })
            .with_params(params),
        )?;
    }
    Ok(())
}

fn image_name(ctx: &ScenarioContext<'_>) -> Result<String> {
    let base = ctx.param(IMAGE_PARAM)?.to_string();
    ctx.scoped_name(&base)
}

fn mount_volume(image: &str, target: &str, cmd: &[&str]) -> Command {
    docker_run([format!("-v{image}:{target}:ceph")], cmd)
}

/// A `docker run` against a nonexistent volume makes the plugin create and
/// format it; the fresh ext4 filesystem shows `lost+found`.
async fn auto_created(ctx: &mut ScenarioContext<'_>) -> Result<()> {
    let image = image_name(ctx)?;
    ctx.acquire(implicit_rbd_volume(&image)).await?;

    let listing = ctx
        .run(mount_volume(&image, "/bar", &["ls", "-l", "/bar"]))
        .await?;
    assert::contains(&listing, "lost+found")?;

    let volumes = ctx
        .run(Command::builder("docker").args(["volume", "ls"]).build())
        .await?;
    assert::contains(&volumes, &image)?;

    // The plugin must unmap the image once the container is gone.
    let mapped = ctx
        .run(Command::builder("rbd").arg("showmapped").build())
        .await?;
    assert::does_not_contain(&mapped, &image)
}

/// An image created out-of-band but never formatted gets a filesystem on
/// first use.
async fn formats_existing_image(ctx: &mut ScenarioContext<'_>) -> Result<()> {
    let image = image_name(ctx)?;
    ctx.acquire(rbd_image(&image, "1G")).await?;

    let listing = ctx
        .run(mount_volume(&image, "/bar", &["ls", "-l", "/bar"]))
        .await?;
    assert::contains(&listing, "lost+found")
}

/// An image that already carries a filesystem with data must not be
/// re-formatted by the plugin.
async fn preserves_existing_filesystem(ctx: &mut ScenarioContext<'_>) -> Result<()> {
    let image = image_name(ctx)?;
    ctx.acquire(rbd_image(&image, "1G")).await?;
    let device = ctx.acquire(rbd_mapping(&image)).await?;

    ctx.run(
        Command::builder("mkfs.ext4")
            .arg("-m0")
            .arg(&device)
            .build(),
    )
    .await?;

    let mountpoint = ctx
        .acquire(
            ResourceSpec::new(
                ResourceKind::Mount,
                format!("{image}-scratch"),
                Command::builder("rmdir").arg("{id}").build(),
            )
            .create_with(Command::builder("mktemp").arg("-d").build())
            .identity_from_output(),
        )
        .await?;
    let mount = ctx
        .acquire(
            ResourceSpec::new(
                ResourceKind::Mount,
                device.clone(),
                Command::builder("umount").arg(&device).build(),
            )
            .create_with(
                Command::builder("mount")
                    .arg(&device)
                    .arg(&mountpoint)
                    .build(),
            ),
        )
        .await?;
    ctx.run(
        Command::builder("touch")
            .arg(format!("{mountpoint}/testfile"))
            .build(),
    )
    .await?;

    // The plugin can only take over once the image is unmounted and
    // unmapped.
    ctx.release(&mount).await?;
    ctx.release(&device).await?;

    let listing = ctx
        .run(mount_volume(&image, "/bar", &["ls", "-l", "/bar"]))
        .await?;
    assert::contains(&listing, "testfile")
}

/// Growing the image grows the filesystem the container sees.
async fn auto_resize(ctx: &mut ScenarioContext<'_>) -> Result<()> {
    let image = image_name(ctx)?;
    ctx.acquire(rbd_image(&image, "1G")).await?;

    let df = mount_volume(&image, "/bar", &["df", "-h", "--output=size", "/bar"]);
    let before = ctx.run(df.clone()).await?;
    assert::contains_size(&before, "976M")?;

    ctx.run(
        Command::builder("rbd")
            .arg("resize")
            .arg("--size=2G")
            .arg(&image)
            .build(),
    )
    .await?;

    let after = ctx.run(df).await?;
    assert::contains_size(&after, "2.0G")
}

/// A LUKS-formatted image is transparently opened by the plugin; data
/// written through one container is readable from another, and no mapping
/// survives the containers.
async fn luks_volume(ctx: &mut ScenarioContext<'_>) -> Result<()> {
    let image = image_name(ctx)?;
    ctx.acquire(rbd_image(&image, "1G")).await?;
    let device = ctx.acquire(rbd_mapping(&image)).await?;

    // The passphrase is the volume name, matching the plugin's key lookup.
    ctx.run(Command::shell(format!(
        "echo '{image}' | cryptsetup luksFormat -q {device}"
    )))
    .await?;
    ctx.release(&device).await?;

    ctx.run(mount_volume(
        &image,
        "/foo",
        &["/bin/bash", "-c", "echo 'dog' > /foo/cat"],
    ))
    .await?;
    let read_back = ctx
        .run(mount_volume(&image, "/foo", &["cat", "/foo/cat"]))
        .await?;
    assert::contains(&read_back, "dog")?;

    let mapped = ctx
        .run(Command::builder("rbd").arg("showmapped").build())
        .await?;
    assert::does_not_contain(&mapped, &image)
}
