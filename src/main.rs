fn main() {
    if let Err(err) = vulcan::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
