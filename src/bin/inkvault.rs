use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use inkvault::{
    DocumentBuffer, DocumentFile, LineEnding, MemoryBuffer, PasswordPrompt, PasswordSession,
    ReaderPrompt,
    StderrSink, TerminalPrompt, file_ops, location, textnorm,
};

#[derive(Parser, Debug)]
#[command(
    name = "inkvault",
    version,
    about = "password-protected text document storage",
    disable_version_flag = true
)]
struct Cli {
    /// Read the password from stdin instead of from the terminal
    #[arg(long = "password-stdin", action = ArgAction::SetTrue, global = true)]
    password_stdin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decrypt a document and print its text
    Show {
        /// Path or file: URI of the document
        input: String,
    },
    /// Encrypt a plaintext file into a document
    Store {
        /// Path of the plaintext file to read (UTF-8)
        #[arg(short = 'i', long = "input")]
        input: String,
        /// Path or file: URI of the document to write
        #[arg(short = 'o', long = "output")]
        output: String,
        /// On-disk charset (default: UTF-8)
        #[arg(long = "charset")]
        charset: Option<String>,
        /// On-disk line-ending convention
        #[arg(long = "line-ending", value_enum, default_value = "lf")]
        line_ending: LineEndingArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LineEndingArg {
    Lf,
    Cr,
    Crlf,
}

impl From<LineEndingArg> for LineEnding {
    fn from(arg: LineEndingArg) -> Self {
        match arg {
            LineEndingArg::Lf => LineEnding::Lf,
            LineEndingArg::Cr => LineEnding::Cr,
            LineEndingArg::Crlf => LineEnding::CrLf,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let prompt: Box<dyn PasswordPrompt> = if cli.password_stdin {
        Box::new(ReaderPrompt::new(Box::new(std::io::stdin())))
    } else {
        Box::new(TerminalPrompt::new())
    };
    let mut session = PasswordSession::new(prompt);
    let sink = StderrSink;

    let ok = match cli.command {
        Commands::Show { input } => {
            let path = location::resolve_location(&input);
            let mut buffer = MemoryBuffer::new();
            match file_ops::open_into_buffer(&path, &mut session, &mut buffer, &sink) {
                Some(_) => {
                    print!("{}", buffer.text());
                    true
                }
                None => false,
            }
        }
        Commands::Store {
            input,
            output,
            charset,
            line_ending,
        } => {
            let text = match std::fs::read_to_string(&input) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("error: failed to read from {}: {}", input, e);
                    return ExitCode::FAILURE;
                }
            };
            let canonical = String::from_utf8(textnorm::normalize_to_lf(text.as_bytes()))
                .expect("LF normalization preserves UTF-8");

            let mut doc = DocumentFile::at(location::resolve_location(&output));
            if let Some(charset) = charset {
                doc = doc.with_charset(charset);
            }
            doc.line_ending = line_ending.into();

            let mut buffer = MemoryBuffer::with_text(canonical);
            file_ops::save_from_buffer(&mut buffer, &mut doc, &mut session, &sink)
        }
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
