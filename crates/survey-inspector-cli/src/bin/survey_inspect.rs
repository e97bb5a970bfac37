fn main() {
    if let Err(err) = survey_inspector_cli::cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
