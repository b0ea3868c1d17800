fn main() {
    if let Err(err) = rbackup::cli::run() {
        eprintln!("rbackup: {:#}", err);
        std::process::exit(1);
    }
}
