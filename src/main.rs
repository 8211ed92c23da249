use clap::Parser;

use truth_reorg::cli::TruthReorgArgs;

fn main() {
    let args = TruthReorgArgs::parse();
    setup_logging(args.global_opts.verbosity);

    if let Err(e) = args.run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let file = record.file().unwrap_or("?");
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target} {file}:{line}] {message}")
            })
        }
    };
    builder.init();
}
