//! open a volume image and drive it from a command stream
use std::{
    io::{self, BufRead, Write},
    path::Path,
};

use log::{info, warn};

use crate::{
    fs::{FatFs, ImageDisk},
    mkfs::mkfs,
    shell::Shell,
};

/// open `image_path`, creating a `blocks` sized volume first when `create` is set
/// and the image is missing, then run the shell on stdin and stdout
pub fn mount<P>(image_path: P, create: bool, blocks: usize, prompt: bool) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let image_path = image_path.as_ref();
    if create && !image_path.exists() {
        mkfs(image_path, blocks)?;
    }
    let stdin = io::stdin();
    let stdout = io::stdout();
    mount_with(image_path, stdin.lock(), stdout.lock(), prompt)
}

/// like [mount] but reading commands from `input` and printing to `output`
pub fn mount_with<P, R, W>(image_path: P, input: R, output: W, prompt: bool) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    R: BufRead,
    W: Write,
{
    let fs = FatFs::new(ImageDisk::open(image_path.as_ref())?)?;
    if !fs.is_formatted()? {
        warn!("{:?} is not formatted, run `format` first", image_path.as_ref());
    }
    info!("shell started on {:?}", image_path.as_ref());
    let mut shell = Shell::new(fs, input, output).with_prompt(prompt);
    shell.run()?;
    Ok(())
}
