use clap::Parser;
use fatfs::cli_interface::FatFsCli;
/// a CLI interface to users to choose create our filesystem,
/// or open it and work on it from an interactive shell.
///
/// The latter reads commands until end of input or `quit`.
fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_nanos().init();
    let args = FatFsCli::parse();
    match args {
        FatFsCli::Mkfs(args) => {
            //create a new file system
            fatfs::mkfs::mkfs(args.image_file_path, args.blocks)?;
        }
        FatFsCli::Shell(args) => {
            //open it, formatting a fresh image first if asked to
            fatfs::mount::mount(
                args.image_file_path,
                args.create,
                args.blocks,
                !args.no_prompt,
            )?;
        }
    }
    Ok(())
}
