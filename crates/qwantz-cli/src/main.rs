mod args;
mod terminal;
mod transcribe;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use qwantz::ParseOptions;
use qwantz::kit::Kit;

use crate::args::CliArguments;

fn main() -> ExitCode {
    let args = CliArguments::parse();
    let mut err = terminal::err(args.color);

    let kit = match Kit::load(&args.assets) {
        Ok(kit) => kit,
        Err(error) => {
            let _ = terminal::print_error(&mut err, "startup", &error);
            return ExitCode::FAILURE;
        }
    };

    let inputs = transcribe::collect_inputs(&args.inputs);
    if inputs.is_empty() {
        let _ = terminal::print_error(&mut err, "startup", &"no input images found");
        return ExitCode::FAILURE;
    }

    let options = ParseOptions { ignore_overrides: args.ignore_overrides };
    let outcomes = transcribe::transcribe_all(inputs, &kit, options);

    let mut failed = false;
    let mut out = std::io::stdout().lock();
    for outcome in outcomes {
        let source = outcome.path.display().to_string();
        if !args.quiet {
            for diagnostic in &outcome.diagnostics {
                let _ = terminal::print_diagnostic(&mut err, &source, diagnostic);
            }
        }
        match outcome.result {
            Ok(text) => {
                if let Some(dir) = &args.output_dir {
                    if let Err(error) = transcribe::write_output(dir, &outcome.path, &text)
                    {
                        let _ = terminal::print_error(&mut err, &source, &error);
                        failed = true;
                    }
                } else {
                    let _ = writeln!(out, "{text}");
                }
            }
            Err(error) => {
                let _ = terminal::print_error(&mut err, &source, &error);
                failed = true;
            }
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
