fn main() {
    if let Err(err) = tabular_pipeline::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
