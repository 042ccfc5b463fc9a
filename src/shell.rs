//! the line oriented command interpreter driving a volume
use std::io::{BufRead, Write};

use log::debug;

use crate::fs::{BlockStore, FatFs, Result, Session};

struct CommandSpec {
    name: &'static str,
    args: &'static str,
    min: usize,
    max: usize,
    about: &'static str,
}

const fn command(
    name: &'static str,
    args: &'static str,
    min: usize,
    max: usize,
    about: &'static str,
) -> CommandSpec {
    CommandSpec {
        name,
        args,
        min,
        max,
        about,
    }
}

const COMMANDS: &[CommandSpec] = &[
    command("format", "", 0, 0, "wipe the volume"),
    command("create", "<path>", 1, 1, "create a file, content ends with an empty line"),
    command("cat", "<path>", 1, 1, "print a file"),
    command("ls", "[path]", 0, 1, "list a directory"),
    command("cp", "<src> <dst>", 2, 2, "copy a file"),
    command("mv", "<src> <dst>", 2, 2, "rename or move a file"),
    command("rm", "<path>", 1, 1, "remove a file or an empty directory"),
    command("append", "<src> <dst>", 2, 2, "append src to the end of dst"),
    command("mkdir", "<path>", 1, 1, "create a directory"),
    command("cd", "[path]", 0, 1, "change the working directory"),
    command("pwd", "", 0, 0, "print the working directory"),
    command("chmod", "<rights> <path>", 2, 2, "set access rights, digits 1 to 7"),
    command("check", "", 0, 0, "check the volume for damage"),
    command("help", "", 0, 0, "show this text"),
    command("quit", "", 0, 0, "leave, same as exit"),
    command("exit", "", 0, 0, "leave, same as quit"),
];

enum Flow {
    Continue,
    Quit,
}

/// one interactive session over a volume
pub struct Shell<D: BlockStore, R: BufRead, W: Write> {
    fs: FatFs<D>,
    session: Session,
    input: R,
    output: W,
    prompt: bool,
}

impl<D: BlockStore, R: BufRead, W: Write> Shell<D, R, W> {
    pub fn new(fs: FatFs<D>, input: R, output: W) -> Self {
        Self {
            fs,
            session: Session::root(),
            input,
            output,
            prompt: true,
        }
    }

    /// print `<pwd>> ` before every command
    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn into_parts(self) -> (FatFs<D>, Session) {
        (self.fs, self.session)
    }

    /// read and run commands until end of input or `quit`,
    /// a failing command prints a diagnostic and the loop goes on
    pub fn run(&mut self) -> Result<()> {
        let mut line = String::new();
        loop {
            if self.prompt {
                write!(self.output, "{}> ", self.session.working_path())?;
                self.output.flush()?;
            }
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            match self.dispatch(&words) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => {
                    debug!("{:?} failed: {e}", words);
                    writeln!(self.output, "[ERROR] {e}")?;
                }
            }
        }
        self.fs.flush()
    }

    fn dispatch(&mut self, words: &[&str]) -> Result<Flow> {
        let (name, args) = (words[0], &words[1..]);
        let Some(spec) = COMMANDS.iter().find(|c| c.name == name) else {
            writeln!(self.output, "[ERROR] unknown command '{name}', try 'help'")?;
            return Ok(Flow::Continue);
        };
        if args.len() < spec.min || args.len() > spec.max {
            writeln!(self.output, "[ERROR] usage: {} {}", spec.name, spec.args)?;
            return Ok(Flow::Continue);
        }

        let fs = &mut self.fs;
        let session = &mut self.session;
        match name {
            "format" => fs.format(session)?,
            "create" => fs.create(session, args[0], &mut self.input)?,
            "cat" => {
                let data = fs.cat(session, args[0])?;
                self.output.write_all(&data)?;
                writeln!(self.output)?;
            }
            "ls" => {
                let records = fs.ls(session, args.first().copied())?;
                writeln!(self.output, "name\ttype\tsize\taccess")?;
                for record in records {
                    let size = if record.is_dir() {
                        "-".to_string()
                    } else {
                        record.size.to_string()
                    };
                    writeln!(
                        self.output,
                        "{}\t{}\t{}\t{}",
                        record.name(),
                        record.kind().label(),
                        size,
                        record.rights()
                    )?;
                }
            }
            "cp" => fs.cp(session, args[0], args[1])?,
            "mv" => fs.mv(session, args[0], args[1])?,
            "rm" => fs.rm(session, args[0])?,
            "append" => fs.append(session, args[0], args[1])?,
            "mkdir" => fs.mkdir(session, args[0])?,
            "cd" => fs.cd(session, args.first().copied().unwrap_or(""))?,
            "pwd" => writeln!(self.output, "{}", fs.pwd(session))?,
            "chmod" => fs.chmod(session, args[0], args[1])?,
            "check" => {
                let report = fs.check()?;
                for problem in &report.problems {
                    writeln!(self.output, "[PROBLEM] {problem}")?;
                }
                writeln!(self.output, "{}", report.summary())?;
            }
            "help" => {
                for c in COMMANDS {
                    let usage = format!("{} {}", c.name, c.args);
                    writeln!(self.output, "{:<24}{}", usage.trim_end(), c.about)?;
                }
            }
            "quit" | "exit" => return Ok(Flow::Quit),
            _ => {}
        }
        Ok(Flow::Continue)
    }
}
