use clap::Parser;

/// blocks of a volume when none are asked for, as many as the table can address
pub const DEFAULT_BLOCKS: usize = 2048;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about)]
pub enum FatFsCli {
    /// create and format a new volume image
    Mkfs(MkfsArgs),
    /// open a volume image and run the interactive shell on it
    Shell(ShellArgs),
}
///make a new fs subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "make a new file system")]
pub struct MkfsArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// the number of 4 KiB blocks of the volume
    #[clap(short, long, default_value_t = DEFAULT_BLOCKS)]
    pub blocks: usize,
}

/// shell subcommand
#[derive(clap::Args, Debug, PartialEq)]
#[command(author, version, about = "run the shell on a file system")]
pub struct ShellArgs {
    /// the path of the file system image file
    #[clap(short = 'p', long)]
    pub image_file_path: String,
    /// create and format the image first if it does not exist
    #[clap(short, long)]
    pub create: bool,
    /// the number of blocks when the image is created
    #[clap(short, long, default_value_t = DEFAULT_BLOCKS)]
    pub blocks: usize,
    /// don't print a prompt, for piped input
    #[clap(long)]
    pub no_prompt: bool,
}
