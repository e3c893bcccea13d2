fn main() {
    if let Err(err) = timebox_lib::run() {
        eprintln!("timebox: {err:?}");
        std::process::exit(1);
    }
}
