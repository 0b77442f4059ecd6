fn main() {
    if let Err(error) = folio::cli::run(std::env::args_os()) {
        log::error!("{error:#}");
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}
