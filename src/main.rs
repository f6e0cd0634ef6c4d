use clap::Parser;
use sldbridge::cli::{self, exit_codes, Cli};

fn main() {
    // handle broken pipe gracefully (e.g., when piping to `head` or `jq` that exits early)
    reset_sigpipe();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() {
                exit_codes::INVALID_ARGS
            } else {
                exit_codes::SUCCESS
            };
            e.print().ok();
            std::process::exit(code);
        }
    };

    sldbridge::init_tracing(cli.verbose);

    let output_mode = cli.output_mode();
    if let Err(e) = cli::run(cli) {
        cli::report_error(output_mode, &e);
        std::process::exit(cli::exit_code_for(&e));
    }
}

/// reset SIGPIPE to default behavior (terminate process) instead of panicking
/// this is the standard Unix behavior for CLI tools
fn reset_sigpipe() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}
