fn main() {
    if let Err(err) = time_tracker_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
