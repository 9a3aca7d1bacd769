fn main() {
    if let Err(err) = marker_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
